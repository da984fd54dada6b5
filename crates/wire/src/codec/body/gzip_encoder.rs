//! Gzip pseudo-framing writer.
//!
//! The body is sent as a deflate stream made of stored (uncompressed) blocks,
//! so no compressor is involved: each fragment gets a 5 byte envelope
//! `0x00, len (u16 LE), !len (u16 LE)` in front of its raw bytes. The 10 byte
//! gzip stream header is written once by the message encoder.

use tracing::trace;

use crate::buffer::{FrameAllocator, GZIP_ENVELOPE_LEN, Region};

/// Gzip member header: magic, deflate, no flags, fixed mtime, max compression, unknown OS.
pub const GZIP_HEADER: [u8; 10] = [0x1F, 0x8B, 0x08, 0x00, 0xF0, 0x6A, 0x40, 0x4E, 0x02, 0xFF];

/// Largest payload of one stored block.
const MAX_BLOCK_LEN: usize = u16::MAX as usize;

fn envelope(len: u16) -> [u8; GZIP_ENVELOPE_LEN] {
    let [lo, hi] = len.to_le_bytes();
    [0x00, lo, hi, !lo, !hi]
}

/// Prefixes `region` with stored-block envelopes.
///
/// Written into the leading margin when the region is exclusive and fits in
/// one block. Larger fragments are split into several blocks while copying.
/// An empty fragment is returned unchanged.
pub fn frame_gzip(mut region: Region) -> Region {
    let len = region.len();
    if len == 0 {
        return region;
    }

    if let Ok(block_len) = u16::try_from(len)
        && let Some(front) = region.grow_front(GZIP_ENVELOPE_LEN)
    {
        front.copy_from_slice(&envelope(block_len));
        trace!(len, "gzip envelope written in place");
        return region;
    }

    let blocks = len.div_ceil(MAX_BLOCK_LEN);
    trace!(len, blocks, "gzip envelopes written by copy");
    let mut framed = FrameAllocator::new().allocate(len + blocks * GZIP_ENVELOPE_LEN);
    if let Some(dst) = framed.as_mut_slice() {
        let mut offset = 0;
        for block in region.as_slice().chunks(MAX_BLOCK_LEN) {
            let block_len = u16::try_from(block.len()).unwrap_or(u16::MAX);
            dst[offset..offset + GZIP_ENVELOPE_LEN].copy_from_slice(&envelope(block_len));
            offset += GZIP_ENVELOPE_LEN;
            dst[offset..offset + block.len()].copy_from_slice(block);
            offset += block.len();
        }
    }
    framed
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use bytes::Bytes;
    use flate2::read::DeflateDecoder;

    use super::*;
    use crate::buffer::LEADING_RESERVE;

    /// A final empty stored block, closes the deflate stream.
    const FINAL_BLOCK: [u8; 5] = [0x01, 0x00, 0x00, 0xFF, 0xFF];

    fn inflate(stream: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        DeflateDecoder::new(stream).read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn envelope_layout() {
        assert_eq!(envelope(5), [0x00, 0x05, 0x00, 0xFA, 0xFF]);
        assert_eq!(envelope(0x1234), [0x00, 0x34, 0x12, 0xCB, 0xED]);
    }

    #[test]
    fn writes_into_leading_margin() {
        let region = FrameAllocator::new().allocate_from(b"hello");
        let framed = frame_gzip(region);

        assert_eq!(framed.as_slice(), b"\x00\x05\x00\xFA\xFFhello");
        assert_eq!(framed.leading_margin(), LEADING_RESERVE - GZIP_ENVELOPE_LEN);
    }

    #[test]
    fn copies_shared_regions() {
        let framed = frame_gzip(Region::shared(Bytes::from_static(b"abc")));
        assert_eq!(framed.as_slice(), b"\x00\x03\x00\xFC\xFFabc");
        assert!(!framed.is_shared());
    }

    #[test]
    fn empty_fragment_is_unchanged() {
        assert!(frame_gzip(Region::empty()).is_empty());
    }

    #[test]
    fn splits_large_fragments() {
        let data: Vec<u8> = (0..70000u32).map(|i| (i % 251) as u8).collect();
        let framed = frame_gzip(FrameAllocator::new().allocate_from(&data));
        assert_eq!(framed.len(), data.len() + 2 * GZIP_ENVELOPE_LEN);

        let mut stream = framed.as_slice().to_vec();
        stream.extend_from_slice(&FINAL_BLOCK);
        assert_eq!(inflate(&stream), data);
    }

    #[test]
    fn envelopes_form_a_deflate_stream() {
        let mut stream = Vec::new();
        for part in [&b"first "[..], b"second ", b"third"] {
            stream.extend_from_slice(frame_gzip(Region::copy_from_slice(part)).as_slice());
        }
        stream.extend_from_slice(&FINAL_BLOCK);
        assert_eq!(inflate(&stream), b"first second third");
    }
}
