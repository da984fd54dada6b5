//! Decoder for bodies delimited by a `Content-Length` header.
//!
//! See [RFC 7230 Section 3.3.2](https://tools.ietf.org/html/rfc7230#section-3.3.2).
//! Only streamed bodies reach this decoder, short bodies are buffered whole
//! by the message decoder. Fragments have a fixed size, so they don't depend
//! on how the input was sliced.

use std::task::Poll;

use bytes::BytesMut;
use tracing::trace;

use crate::protocol::Content;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LengthDecoder {
    /// The number of bytes remaining to be read from the payload
    remaining: u64,
}

impl LengthDecoder {
    pub(crate) fn new(length: u64) -> Self {
        Self { remaining: length }
    }

    /// Forwards every full fragment of `max_fragment` bytes available in `src`.
    ///
    /// The last fragment carries what remains of the body and is the complete
    /// one, bytes past it are left in `src` for the next message.
    pub(crate) fn decode(&mut self, src: &mut BytesMut, max_fragment: usize, out: &mut Vec<Content>) -> Poll<()> {
        while self.remaining > 0 {
            let len = usize::try_from(self.remaining).map_or(max_fragment, |remaining| remaining.min(max_fragment));
            if src.len() < len {
                return Poll::Pending;
            }

            let bytes = src.split_to(len).freeze();
            self.remaining -= len as u64;
            trace!(len, remaining = self.remaining, "read content-length bytes");
            out.push(Content::new(bytes, self.remaining == 0));
        }
        Poll::Ready(())
    }
}
