//! Decoder for HTTP chunked transfer coding.
//!
//! This module decodes message bodies that use chunked transfer coding
//! as specified in [RFC 7230 Section 4.1](https://tools.ietf.org/html/rfc7230#section-4.1).
//!
//! Each chunk is delivered as one incomplete [`Content`] once all of its data
//! has arrived, so the fragments don't depend on how the input was sliced.
//! Chunks larger than [`DecoderConfig::max_body_fragment`] are cut into
//! fragments of that size, which bounds what is held back.
//! The zero-size chunk and its trailer section produce a final empty, complete
//! [`Content`].

use bytes::{Buf, BytesMut};
use tracing::trace;

use crate::codec::config::DecoderConfig;
use crate::codec::machine::{DecodingState, Step};
use crate::ensure;
use crate::protocol::{Content, ParseError};

/// Chunks larger than a signed 31-bit length are rejected.
const MAX_CHUNK_SIZE: u64 = i32::MAX as u64;

/// Trailer fields are skipped, this only bounds how many httparse looks at.
const MAX_TRAILERS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChunkedState {
    /// Read the chunk size in hex, `line` counts the bytes of the size line
    Size { size: u64, line: usize },
    /// Whitespace after the size
    SizeLws { size: u64, line: usize },
    /// Skip chunk extensions
    Extension { size: u64, line: usize },
    /// LF ending the size line
    SizeLf { size: u64 },
    /// Chunk data, delivered in fragments of at most `max_body_fragment` bytes
    Data { remaining: usize },
    DataCr,
    DataLf,
    /// Skip trailer fields up to the empty line
    Trailer,
}

impl ChunkedState {
    pub(crate) fn new() -> Self {
        ChunkedState::Size { size: 0, line: 0 }
    }
}

macro_rules! try_next_byte {
    ($src:ident, $pending:expr) => {{
        if $src.is_empty() {
            return Ok(Step::Pending($pending));
        }
        $src.get_u8()
    }};
}

impl DecodingState for ChunkedState {
    type Artifact = Content;
    type Context = DecoderConfig;

    fn step(self, src: &mut BytesMut, config: &mut DecoderConfig, out: &mut Vec<Content>) -> Result<Step<Self>, ParseError> {
        match self {
            ChunkedState::Size { size, line } => read_size(src, size, line, config),
            ChunkedState::SizeLws { size, line } => read_size_lws(src, size, line, config),
            ChunkedState::Extension { size, line } => read_extension(src, size, line, config),
            ChunkedState::SizeLf { size } => read_size_lf(src, size),
            ChunkedState::Data { remaining } => read_data(src, remaining, config, out),
            ChunkedState::DataCr => match try_next_byte!(src, self) {
                b'\r' => Ok(Step::Next(ChunkedState::DataLf)),
                _ => Err(ParseError::invalid_chunk("missing CRLF after chunk data")),
            },
            ChunkedState::DataLf => match try_next_byte!(src, self) {
                b'\n' => Ok(Step::Next(ChunkedState::new())),
                _ => Err(ParseError::invalid_chunk("missing CRLF after chunk data")),
            },
            ChunkedState::Trailer => read_trailer(src, config, out),
        }
    }
}

fn count_line(line: usize, config: &DecoderConfig) -> Result<usize, ParseError> {
    let line = line + 1;
    ensure!(line <= config.max_chunk_size_line(), ParseError::invalid_chunk("chunk size line too long"));
    Ok(line)
}

fn hex_value(b: u8) -> Option<u64> {
    match b {
        b'0'..=b'9' => Some(u64::from(b - b'0')),
        b'a'..=b'f' => Some(u64::from(b + 10 - b'a')),
        b'A'..=b'F' => Some(u64::from(b + 10 - b'A')),
        _ => None,
    }
}

/// Reads the size digit by digit.
///
/// A size line without any digit is rejected, so is a size above [`MAX_CHUNK_SIZE`].
fn read_size(src: &mut BytesMut, size: u64, line: usize, config: &DecoderConfig) -> Result<Step<ChunkedState>, ParseError> {
    let b = try_next_byte!(src, ChunkedState::Size { size, line });
    let line = count_line(line, config)?;

    if let Some(digit) = hex_value(b) {
        let size = size
            .checked_mul(16)
            .and_then(|size| size.checked_add(digit))
            .filter(|size| *size <= MAX_CHUNK_SIZE)
            .ok_or_else(|| ParseError::invalid_chunk("chunk size too large"))?;
        return Ok(Step::Next(ChunkedState::Size { size, line }));
    }

    ensure!(line > 1, ParseError::invalid_chunk("missing chunk size"));
    match b {
        b'\t' | b' ' => Ok(Step::Next(ChunkedState::SizeLws { size, line })),
        b';' => Ok(Step::Next(ChunkedState::Extension { size, line })),
        b'\r' => Ok(Step::Next(ChunkedState::SizeLf { size })),
        _ => Err(ParseError::invalid_chunk(format!("invalid byte 0x{b:02x} in chunk size"))),
    }
}

fn read_size_lws(src: &mut BytesMut, size: u64, line: usize, config: &DecoderConfig) -> Result<Step<ChunkedState>, ParseError> {
    let b = try_next_byte!(src, ChunkedState::SizeLws { size, line });
    let line = count_line(line, config)?;
    match b {
        // LWS can follow the chunk size, but no more digits can come
        b'\t' | b' ' => Ok(Step::Next(ChunkedState::SizeLws { size, line })),
        b';' => Ok(Step::Next(ChunkedState::Extension { size, line })),
        b'\r' => Ok(Step::Next(ChunkedState::SizeLf { size })),
        _ => Err(ParseError::invalid_chunk("invalid chunk size linear white space")),
    }
}

/// Extensions are ignored, they end at the next CRLF. A plain LF is rejected.
fn read_extension(src: &mut BytesMut, size: u64, line: usize, config: &DecoderConfig) -> Result<Step<ChunkedState>, ParseError> {
    let b = try_next_byte!(src, ChunkedState::Extension { size, line });
    let line = count_line(line, config)?;
    match b {
        b'\r' => Ok(Step::Next(ChunkedState::SizeLf { size })),
        b'\n' => Err(ParseError::invalid_chunk("chunk extension contains newline")),
        _ => Ok(Step::Next(ChunkedState::Extension { size, line })),
    }
}

fn read_size_lf(src: &mut BytesMut, size: u64) -> Result<Step<ChunkedState>, ParseError> {
    match try_next_byte!(src, ChunkedState::SizeLf { size }) {
        b'\n' if size == 0 => Ok(Step::Next(ChunkedState::Trailer)),
        b'\n' => {
            let remaining = usize::try_from(size).map_err(|_| ParseError::invalid_chunk("chunk size too large"))?;
            Ok(Step::Next(ChunkedState::Data { remaining }))
        }
        _ => Err(ParseError::invalid_chunk("invalid chunk size LF")),
    }
}

fn read_data(src: &mut BytesMut, remaining: usize, config: &DecoderConfig, out: &mut Vec<Content>) -> Result<Step<ChunkedState>, ParseError> {
    let fragment = remaining.min(config.max_body_fragment());
    if src.len() < fragment {
        return Ok(Step::Pending(ChunkedState::Data { remaining }));
    }

    let data = src.split_to(fragment).freeze();
    trace!(len = data.len(), remaining = remaining - fragment, "read chunked bytes");
    out.push(Content::incomplete(data));
    match remaining - fragment {
        0 => Ok(Step::Next(ChunkedState::DataCr)),
        remaining => Ok(Step::Next(ChunkedState::Data { remaining })),
    }
}

fn read_trailer(src: &mut BytesMut, config: &DecoderConfig, out: &mut Vec<Content>) -> Result<Step<ChunkedState>, ParseError> {
    let mut slots = [httparse::EMPTY_HEADER; MAX_TRAILERS];
    let parsed = match httparse::parse_headers(&src[..], &mut slots) {
        Ok(httparse::Status::Complete((len, _))) => Some(len),
        Ok(httparse::Status::Partial) => None,
        Err(e) => return Err(ParseError::invalid_chunk(format!("invalid trailer section: {e}"))),
    };

    let Some(len) = parsed else {
        ensure!(src.len() <= config.max_header_bytes(), ParseError::too_large_header(src.len(), config.max_header_bytes()));
        return Ok(Step::Pending(ChunkedState::Trailer));
    };

    src.advance(len);
    trace!("finished reading chunked data");
    out.push(Content::end());
    Ok(Step::Done)
}

#[cfg(test)]
mod tests {
    use std::task::Poll;

    use super::*;
    use crate::codec::config::MAX_BODY_FRAGMENT;
    use crate::codec::machine::StateMachine;

    fn decode(buffer: &mut BytesMut) -> Result<Poll<Vec<Content>>, ParseError> {
        let mut machine = StateMachine::new(ChunkedState::new());
        machine.run(buffer, &mut DecoderConfig::default())
    }

    fn decode_fragmented(input: &[u8], max_fragment: usize, step: usize) -> Vec<Content> {
        let mut machine = StateMachine::new(ChunkedState::new());
        let mut config = DecoderConfig::default().with_max_body_fragment(max_fragment);
        let mut buffer = BytesMut::new();
        let mut contents = Vec::new();
        for slice in input.chunks(step) {
            buffer.extend_from_slice(slice);
            match machine.run(&mut buffer, &mut config).unwrap() {
                Poll::Ready(done) => contents.extend(done),
                Poll::Pending => contents.extend(machine.drain()),
            }
        }
        contents
    }

    fn decode_all(input: &[u8]) -> Vec<Content> {
        match decode(&mut BytesMut::from(input)).unwrap() {
            Poll::Ready(contents) => contents,
            Poll::Pending => panic!("chunked body should be complete"),
        }
    }

    #[test]
    fn test_basic() {
        let contents = decode_all(b"10\r\n1234567890abcdef\r\n0\r\n\r\n");
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0].as_bytes(), b"1234567890abcdef");
        assert!(!contents[0].is_complete());
        assert!(contents[1].is_empty());
        assert!(contents[1].is_complete());
    }

    #[test]
    fn test_multiple_chunks() {
        let contents = decode_all(b"5\r\nhello\r\n7\r\n, world\r\n0\r\n\r\n");
        assert_eq!(contents[0].as_bytes(), b"hello");
        assert_eq!(contents[1].as_bytes(), b", world");
        assert!(contents[2].is_complete());
    }

    #[test]
    fn test_chunks_with_extensions() {
        let contents = decode_all(b"5;chunk-ext=value\r\nhello\r\n0 ;last\r\n\r\n");
        assert_eq!(contents[0].as_bytes(), b"hello");
        assert!(contents[1].is_complete());
    }

    #[test]
    fn test_chunks_with_trailers() {
        let mut buffer = BytesMut::from(&b"5\r\nhello\r\n0\r\nTrailer: value\r\nOther: x\r\n\r\nnext"[..]);
        let Poll::Ready(contents) = decode(&mut buffer).unwrap() else {
            panic!("chunked body should be complete");
        };
        assert_eq!(contents.len(), 2);
        assert_eq!(&buffer[..], b"next");
    }

    #[test]
    fn test_incomplete_chunk_waits_for_data() {
        let mut machine = StateMachine::new(ChunkedState::new());
        let mut config = DecoderConfig::default();
        let mut buffer = BytesMut::from(&b"5\r\nhel"[..]);

        assert!(machine.run(&mut buffer, &mut config).unwrap().is_pending());
        assert!(machine.artifacts().is_empty());

        buffer.extend_from_slice(b"lo\r\n0\r\n\r\n");
        let Poll::Ready(contents) = machine.run(&mut buffer, &mut config).unwrap() else {
            panic!("chunked body should be complete");
        };
        assert_eq!(contents[0].as_bytes(), b"hello");
        assert!(contents[1].is_complete());
    }

    #[test]
    fn test_invalid_chunk_size() {
        assert!(matches!(decode(&mut BytesMut::from(&b"xyz\r\n"[..])), Err(ParseError::InvalidChunk { .. })));
        assert!(matches!(decode(&mut BytesMut::from(&b"\r\n"[..])), Err(ParseError::InvalidChunk { .. })));
        assert!(matches!(decode(&mut BytesMut::from(&b"5\nhello"[..])), Err(ParseError::InvalidChunk { .. })));
    }

    #[test]
    fn test_chunk_size_limits() {
        assert!(matches!(decode(&mut BytesMut::from(&b"80000000\r\n"[..])), Err(ParseError::InvalidChunk { .. })));
        assert!(decode(&mut BytesMut::from(&b"7fffffff\r\n"[..])).unwrap().is_pending());

        let long_extension = format!("5;{}\r\n", "x".repeat(2048));
        assert!(matches!(decode(&mut BytesMut::from(long_extension.as_str())), Err(ParseError::InvalidChunk { .. })));
    }

    #[test]
    fn test_missing_crlf() {
        assert!(matches!(decode(&mut BytesMut::from(&b"5\r\nhelloBad"[..])), Err(ParseError::InvalidChunk { .. })));
    }

    #[test]
    fn test_large_chunk() {
        let size = 1024 * 1024;
        let mut data = Vec::with_capacity(size + 16);
        data.extend(format!("{size:x}\r\n").into_bytes());
        data.extend(vec![b'A'; size]);
        data.extend(b"\r\n0\r\n\r\n");

        let contents = decode_all(&data);
        assert_eq!(contents.len(), 5);
        for fragment in &contents[..4] {
            assert_eq!(fragment.len(), MAX_BODY_FRAGMENT);
            assert!(fragment.as_bytes().iter().all(|&b| b == b'A'));
        }
        assert!(contents[4].is_complete());
    }

    #[test]
    fn test_zero_size_chunk() {
        let contents = decode_all(b"0\r\n\r\n");
        assert_eq!(contents, vec![Content::end()]);
    }

    #[test]
    fn test_oversized_chunk_is_delivered_in_fragments() {
        let mut machine = StateMachine::new(ChunkedState::new());
        let mut config = DecoderConfig::default().with_max_body_fragment(4);
        let mut buffer = BytesMut::from(&b"a\r\nabcdef"[..]);

        assert!(machine.run(&mut buffer, &mut config).unwrap().is_pending());
        let held: Vec<Content> = machine.drain().collect();
        assert_eq!(held, vec![Content::incomplete("abcd")]);
        assert_eq!(&buffer[..], b"ef");

        buffer.extend_from_slice(b"ghij\r\n0\r\n\r\n");
        let Poll::Ready(contents) = machine.run(&mut buffer, &mut config).unwrap() else {
            panic!("chunked body should be complete");
        };
        assert_eq!(contents, vec![Content::incomplete("efgh"), Content::incomplete("ij"), Content::end()]);
    }

    #[test]
    fn test_huge_announced_chunk_holds_one_fragment_at_most() {
        let mut machine = StateMachine::new(ChunkedState::new());
        let mut config = DecoderConfig::default();
        let mut buffer = BytesMut::from(&b"100000\r\n"[..]);
        buffer.extend_from_slice(&vec![b'z'; 1_000_000]);

        assert!(machine.run(&mut buffer, &mut config).unwrap().is_pending());
        let delivered: usize = machine.drain().map(|content| content.len()).sum();
        assert!(buffer.len() < config.max_body_fragment());
        assert_eq!(delivered + buffer.len(), 1_000_000);
    }

    #[test]
    fn test_fragments_do_not_depend_on_slicing() {
        let mut input = b"2a\r\n".to_vec();
        input.extend((0..42u8).collect::<Vec<_>>());
        input.extend(b"\r\n3\r\nxyz\r\n0\r\n\r\n");

        let whole = decode_fragmented(&input, 16, input.len());
        assert_eq!(whole.iter().map(Content::len).collect::<Vec<_>>(), vec![16, 16, 10, 3, 0]);
        for step in [1, 2, 5, 17] {
            assert_eq!(decode_fragmented(&input, 16, step), whole, "step {step}");
        }
    }
}
