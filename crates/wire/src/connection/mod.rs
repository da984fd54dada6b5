//! Async transport adapters.
//!
//! - [`MessageReader`]: reads a byte stream, decodes it and hands messages to
//!   a sink, ending with the stream or the first fault
//! - [`MessageWriter`]: encodes messages and writes the framed segments
//!
//! Each wraps one direction. A gateway typically holds a reader and a writer
//! per side of a proxied connection.

mod message_reader;
mod message_writer;

pub use message_reader::MessageReader;
pub use message_writer::MessageWriter;
