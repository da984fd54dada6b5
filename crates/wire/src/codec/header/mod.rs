//! Start line and header block processing.
//!
//! - `start_line`: request line and status line state graphs
//! - `header_decoder`: header field graph with folding, size and count limits,
//!   then the cookie and `Host` checks on the finished block
//! - `header_encoder`: renders a head's start line, headers and cookies

mod header_decoder;
mod header_encoder;
mod start_line;

pub(crate) use header_decoder::{CookieKind, HeaderState, check_host, finish_headers};
pub(crate) use header_encoder::{write_request_head, write_response_head};
pub(crate) use start_line::{RequestLineState, StatusLineState, finish_request_line, finish_status_line};
