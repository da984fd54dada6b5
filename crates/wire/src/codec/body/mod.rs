//! Message body framing, both directions.
//!
//! # Decoders
//! - [`PayloadDecoder`]: streams Content-Length, chunked and close-delimited bodies
//! - `chunked_decoder`: the chunked transfer coding state graph
//!
//! # Writers
//! - [`frame_chunk`]: chunked transfer coding, in place when margins allow
//! - [`frame_gzip`]: stored-block envelopes of the gzip pseudo-framing
//! - `PayloadEncoder`: applies the writers a message's coding needs and keeps
//!   identity bodies within their declared length

mod chunked_decoder;
mod chunked_encoder;
mod gzip_encoder;
mod length_decoder;
mod length_encoder;
mod payload_decoder;
mod payload_encoder;

pub use chunked_encoder::frame_chunk;
pub use gzip_encoder::{GZIP_HEADER, frame_gzip};
pub(crate) use payload_decoder::{Framing, PayloadDecoder, request_framing, response_framing};
pub(crate) use payload_encoder::PayloadEncoder;
