//! An incremental HTTP/1.x wire engine for a WebSocket gateway
//!
//! This crate turns the bytes of a connection into HTTP messages and back. It
//! doesn't own sockets, routing or TLS: a gateway feeds it whatever bytes
//! arrive and receives heads and body fragments as soon as they can be framed.
//!
//! # Features
//!
//! - Resumable decoding: any delivery boundary, down to single bytes, yields
//!   the same messages
//! - Request and response decoding with pipelining, header folding,
//!   comma-separated header splitting and legacy cookie parsing
//! - Content-Length, chunked and close-delimited bodies, short bodies
//!   delivered with their head
//! - Byte passthrough after `101 Switching Protocols` or a tunnelled `CONNECT`
//! - Encoding with chunked framing and a gzip-compatible stored-block framing,
//!   written in place into margins reserved by the allocator
//! - Faults mapped to the status the peer should receive
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use gateway_wire::codec::{MessageDecoder, MessageEncoder};
//! use gateway_wire::protocol::{Content, HttpMessage};
//! use tokio_util::codec::Encoder;
//!
//! let mut decoder = MessageDecoder::response();
//! let mut input = BytesMut::from("HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nabcd\r\n0\r\n\r\n");
//!
//! let mut messages = Vec::new();
//! decoder.decode_into(&mut input, |message| messages.push(message)).unwrap();
//! assert_eq!(messages.len(), 3);
//! assert_eq!(messages[1], HttpMessage::Content(Content::incomplete("abcd")));
//! assert_eq!(messages[2], HttpMessage::Content(Content::end()));
//!
//! // and back to the wire
//! let mut encoder = MessageEncoder::new();
//! let mut output = BytesMut::new();
//! for message in messages {
//!     encoder.encode(message, &mut output).unwrap();
//! }
//! assert!(output.ends_with(b"4\r\nabcd\r\n0\r\n\r\n"));
//! ```
//!
//! # Architecture
//!
//! - [`buffer`]: byte regions with hidden margins and the frame-reserving allocator
//! - [`protocol`]: message, head, cookie and error types
//! - [`codec`]: the decode state graphs, the encoder and the content writers
//! - [`connection`]: async reader and writer adapters over `tokio` I/O
//!
//! # Error Handling
//!
//! - [`protocol::ParseError`]: decode faults, [`protocol::ParseError::status`]
//!   gives the reply status
//! - [`protocol::SendError`]: encode faults, raised before any byte is written
//! - [`protocol::HttpError`]: either of them
//!
//! A decode fault poisons its decoder: the connection must be closed.

pub mod buffer;
pub mod codec;
pub mod connection;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
