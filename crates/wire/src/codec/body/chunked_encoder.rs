//! Chunked transfer coding writer.
//!
//! A fragment is framed as `hex(len) CRLF data CRLF`, the last fragment of a
//! body also carries the terminal `0 CRLF CRLF`. When the region is exclusive
//! and its margins are large enough the framing is written in place, otherwise
//! the fragment is copied once into an exactly-sized region.

use tracing::trace;

use crate::buffer::{FrameAllocator, Region};

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// `usize::MAX` in hex plus CRLF.
const MAX_CHUNK_HEADER: usize = 2 * size_of::<usize>() + 2;

const CHUNK_END: &[u8] = b"\r\n";
const LAST_CHUNK_END: &[u8] = b"\r\n0\r\n\r\n";
const LAST_CHUNK: &[u8] = b"0\r\n\r\n";

/// Writes `len` as uppercase hex followed by CRLF, returns the header length.
fn chunk_header(len: usize, dst: &mut [u8; MAX_CHUNK_HEADER]) -> usize {
    let digits = (usize::BITS - len.leading_zeros()).div_ceil(4).max(1) as usize;
    for (i, slot) in dst[..digits].iter_mut().enumerate() {
        let shift = 4 * (digits - 1 - i);
        *slot = HEX_DIGITS[(len >> shift) & 0xF];
    }
    dst[digits..digits + 2].copy_from_slice(b"\r\n");
    digits + 2
}

/// Frames `region` as one chunk, `last` appends the terminal chunk.
///
/// An empty fragment yields an empty region unless it is the last one, which
/// yields only the terminal chunk.
pub fn frame_chunk(mut region: Region, last: bool) -> Region {
    let len = region.len();
    if len == 0 {
        return if last { Region::from_static(LAST_CHUNK) } else { Region::empty() };
    }

    let mut header = [0u8; MAX_CHUNK_HEADER];
    let header_len = chunk_header(len, &mut header);
    let header = &header[..header_len];
    let trailer = if last { LAST_CHUNK_END } else { CHUNK_END };

    if region.can_grow(header.len(), trailer.len()) {
        if let Some(front) = region.grow_front(header.len()) {
            front.copy_from_slice(header);
        }
        if let Some(back) = region.grow_back(trailer.len()) {
            back.copy_from_slice(trailer);
        }
        trace!(len, last, "chunk framed in place");
        return region;
    }

    trace!(len, last, shared = region.is_shared(), "chunk framed by copy");
    let mut framed = FrameAllocator::new().allocate_exact(header.len() + len + trailer.len());
    if let Some(dst) = framed.as_mut_slice() {
        let (dst_header, rest) = dst.split_at_mut(header.len());
        let (dst_data, dst_trailer) = rest.split_at_mut(len);
        dst_header.copy_from_slice(header);
        dst_data.copy_from_slice(region.as_slice());
        dst_trailer.copy_from_slice(trailer);
    }
    framed
}
