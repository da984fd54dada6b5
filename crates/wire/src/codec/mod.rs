//! HTTP/1.x codec: incremental decoding and framed encoding.
//!
//! # Architecture
//!
//! - Decoding:
//!   - [`MessageDecoder`]: the per-direction decode graph, emitting
//!     [`HttpMessage`](crate::protocol::HttpMessage)s
//!   - `machine`: the generic state machine engine every graph runs on
//!   - start line and header block graphs via the `header` module
//!   - body framing via the `body` module
//!
//! - Encoding:
//!   - [`MessageEncoder`]: serializes heads and frames their content
//!   - [`frame_chunk`] / [`frame_gzip`]: content writers, framing in the
//!     margins reserved by [`FrameAllocator`](crate::buffer::FrameAllocator)
//!
//! Both sides also implement the `tokio_util` codec traits, so they plug into
//! `FramedRead` / `FramedWrite`.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use gateway_wire::codec::{MessageDecoder, MessageEncoder};
//! use gateway_wire::protocol::{Content, ResponseHead, TransferCoding};
//! use http::StatusCode;
//! use tokio_util::codec::{Decoder, Encoder};
//!
//! let mut encoder = MessageEncoder::new();
//! let mut wire = BytesMut::new();
//! let head = ResponseHead::new(StatusCode::OK)
//!     .with_transfer_coding(TransferCoding::Chunked)
//!     .with_content(Content::complete("hello"));
//! encoder.encode(head.into(), &mut wire).unwrap();
//! assert_eq!(&wire[..], b"HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n");
//!
//! let mut decoder = MessageDecoder::response();
//! let head = decoder.decode(&mut wire).unwrap().unwrap();
//! assert!(head.as_response().unwrap().is_chunked());
//! ```

mod body;
mod config;
mod header;
mod machine;
mod message_decoder;
mod message_encoder;

pub use body::{GZIP_HEADER, frame_chunk, frame_gzip};
pub use config::{
    DecoderConfig, MAX_BODY_FRAGMENT, MAX_CHUNK_SIZE_LINE, MAX_HEADER_BYTES, MAX_HEADERS, MAX_REQUEST_TARGET, STREAMING_THRESHOLD,
};
pub use message_decoder::{MessageDecoder, Role};
pub use message_encoder::MessageEncoder;
