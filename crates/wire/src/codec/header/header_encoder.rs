//! Serializes message heads: start line, header fields in encounter order,
//! then the synthesized cookie lines and the blank line.
//!
//! Framing headers (`Content-Length`, `Transfer-Encoding`) are decided by the
//! message encoder before the head gets here.

use std::io;
use std::io::Write;

use bytes::{BufMut, BytesMut};
use http::{HeaderMap, Version};
use tracing::error;

use crate::protocol::{RequestHead, ResponseHead, SendError};

/// Initial buffer size reserved for a head
const INIT_HEADER_SIZE: usize = 4 * 1024;

fn version_str(version: Version) -> Result<&'static str, SendError> {
    match version {
        Version::HTTP_11 => Ok("HTTP/1.1"),
        Version::HTTP_10 => Ok("HTTP/1.0"),
        version => {
            error!(http_version = ?version, "unsupported http version");
            Err(SendError::UnsupportedVersion { version })
        }
    }
}

pub(crate) fn write_request_head(head: &RequestHead, dst: &mut BytesMut) -> Result<(), SendError> {
    let version = version_str(head.version())?;

    dst.reserve(INIT_HEADER_SIZE);
    write!(FastWrite(dst), "{} {} {}\r\n", head.method(), head.request_target(), version)?;
    write_fields(head.headers(), dst);
    if let Some(cookie) = head.cookies().to_request_header() {
        write_field(dst, b"cookie", cookie.as_bytes());
    }
    dst.put_slice(b"\r\n");
    Ok(())
}

pub(crate) fn write_response_head(head: &ResponseHead, dst: &mut BytesMut) -> Result<(), SendError> {
    let version = version_str(head.version())?;

    dst.reserve(INIT_HEADER_SIZE);
    write!(FastWrite(dst), "{} {} {}\r\n", version, head.status().as_str(), head.reason_or_canonical())?;
    write_fields(head.headers(), dst);
    for cookie in head.cookies() {
        write_field(dst, b"set-cookie", cookie.to_set_cookie().as_bytes());
    }
    dst.put_slice(b"\r\n");
    Ok(())
}

fn write_fields(headers: &HeaderMap, dst: &mut BytesMut) {
    for (name, value) in headers {
        write_field(dst, name.as_ref(), value.as_bytes());
    }
}

fn write_field(dst: &mut BytesMut, name: &[u8], value: &[u8]) {
    dst.put_slice(name);
    dst.put_slice(b": ");
    dst.put_slice(value);
    dst.put_slice(b"\r\n");
}

/// Fast writer implementation for writing to BytesMut.
///
/// This is an optimization to avoid unnecessary bounds checking when writing
/// to the bytes buffer, since we've already reserved enough space.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
