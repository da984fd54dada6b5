//! Request line and status line states.
//!
//! Both graphs emit [`LineToken`]s, the message decoder folds them into a
//! head once the line is finished.

use std::ops::Range;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use http::{Method, StatusCode, Uri, Version};
use tracing::trace;

use crate::codec::config::DecoderConfig;
use crate::codec::machine::{DecodingState, Step};
use crate::protocol::ParseError;

/// `CONNECT` and `OPTIONS` are the longest methods accepted.
const MAX_METHOD_LEN: usize = 7;

/// `HTTP/x.y` plus CRLF, with some slack for multi-digit versions.
const MAX_VERSION_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LineToken {
    Method(Method),
    Target(Uri),
    Version(Version),
    Status(StatusCode),
    Reason(Option<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RequestLineState {
    /// Skip empty lines left over from a previous message
    Start,
    Method,
    Target { scanned: usize },
    Version,
}

impl DecodingState for RequestLineState {
    type Artifact = LineToken;
    type Context = DecoderConfig;

    fn step(self, src: &mut BytesMut, config: &mut DecoderConfig, out: &mut Vec<LineToken>) -> Result<Step<Self>, ParseError> {
        match self {
            RequestLineState::Start => read_start(src),
            RequestLineState::Method => read_method(src, out),
            RequestLineState::Target { scanned } => read_target(src, scanned, config.max_request_target(), out),
            RequestLineState::Version => read_request_version(src, out),
        }
    }
}

fn read_start(src: &mut BytesMut) -> Result<Step<RequestLineState>, ParseError> {
    while src.starts_with(b"\r\n") {
        src.advance(2);
    }

    match src.first() {
        None => Ok(Step::Pending(RequestLineState::Start)),
        Some(b'\r') if src.len() == 1 => Ok(Step::Pending(RequestLineState::Start)),
        Some(b) if b.is_ascii_uppercase() => Ok(Step::Next(RequestLineState::Method)),
        Some(b) => Err(ParseError::invalid_request_line(format!("request line can't start with byte 0x{b:02x}"))),
    }
}

fn read_method(src: &mut BytesMut, out: &mut Vec<LineToken>) -> Result<Step<RequestLineState>, ParseError> {
    let end = src.iter().take(MAX_METHOD_LEN + 1).position(|b| !b.is_ascii_uppercase());
    match end {
        None if src.len() > MAX_METHOD_LEN => {
            Err(ParseError::unsupported_method(String::from_utf8_lossy(&src[..=MAX_METHOD_LEN])))
        }
        None => Ok(Step::Pending(RequestLineState::Method)),
        Some(end) if src[end] == b' ' => {
            let token = src.split_to(end);
            src.advance(1);
            let method = parse_method(&token)?;
            trace!(%method, "read request method");
            out.push(LineToken::Method(method));
            Ok(Step::Next(RequestLineState::Target { scanned: 0 }))
        }
        Some(end) => Err(ParseError::invalid_request_line(format!("unexpected byte 0x{:02x} in method", src[end]))),
    }
}

fn parse_method(token: &[u8]) -> Result<Method, ParseError> {
    let method = match token {
        b"GET" => Method::GET,
        b"HEAD" => Method::HEAD,
        b"POST" => Method::POST,
        b"PUT" => Method::PUT,
        b"DELETE" => Method::DELETE,
        b"OPTIONS" => Method::OPTIONS,
        b"TRACE" => Method::TRACE,
        b"CONNECT" => Method::CONNECT,
        b"PATCH" => Method::PATCH,
        _ => return Err(ParseError::unsupported_method(String::from_utf8_lossy(token))),
    };
    Ok(method)
}

fn read_target(
    src: &mut BytesMut,
    scanned: usize,
    max: usize,
    out: &mut Vec<LineToken>,
) -> Result<Step<RequestLineState>, ParseError> {
    let found = src[scanned..].iter().position(|b| matches!(b, b' ' | b'\r' | b'\n'));
    let Some(offset) = found else {
        if src.len() > max {
            return Err(ParseError::uri_too_long(src.len(), max));
        }
        return Ok(Step::Pending(RequestLineState::Target { scanned: src.len() }));
    };

    let end = scanned + offset;
    if end > max {
        return Err(ParseError::uri_too_long(end, max));
    }
    if src[end] != b' ' {
        return Err(ParseError::invalid_request_line("missing http version"));
    }
    if end == 0 {
        return Err(ParseError::invalid_request_line("empty request target"));
    }

    let raw = src.split_to(end).freeze();
    src.advance(1);
    let uri = Uri::from_maybe_shared(collapse_slashes(raw)).map_err(ParseError::invalid_uri)?;
    trace!(%uri, "read request target");
    out.push(LineToken::Target(uri));
    Ok(Step::Next(RequestLineState::Version))
}

/// Collapses runs of `/` in the path component of a request target.
pub(crate) fn collapse_slashes(target: Bytes) -> Bytes {
    let range = path_range(&target);
    if !target[range.clone()].windows(2).any(|pair| pair == b"//") {
        return target;
    }

    let mut collapsed = BytesMut::with_capacity(target.len());
    collapsed.put_slice(&target[..range.start]);
    let mut previous = 0;
    for &b in &target[range.clone()] {
        if !(b == b'/' && previous == b'/') {
            collapsed.put_u8(b);
        }
        previous = b;
    }
    collapsed.put_slice(&target[range.end..]);
    collapsed.freeze()
}

/// Where the path lives in origin-form and absolute-form targets.
fn path_range(target: &[u8]) -> Range<usize> {
    let start = if target.first() == Some(&b'/') {
        0
    } else {
        let Some(scheme_end) = target.windows(3).position(|w| w == b"://") else {
            return 0..0;
        };
        let authority_start = scheme_end + 3;
        match target[authority_start..].iter().position(|b| matches!(b, b'/' | b'?' | b'#')) {
            Some(i) if target[authority_start + i] == b'/' => authority_start + i,
            _ => return 0..0,
        }
    };

    let end = target[start..].iter().position(|b| matches!(b, b'?' | b'#')).map_or(target.len(), |i| start + i);
    start..end
}

fn read_request_version(src: &mut BytesMut, out: &mut Vec<LineToken>) -> Result<Step<RequestLineState>, ParseError> {
    let Some(lf) = src.iter().take(MAX_VERSION_LEN).position(|b| *b == b'\n') else {
        if src.len() >= MAX_VERSION_LEN {
            return Err(ParseError::invalid_request_line("http version too long"));
        }
        return Ok(Step::Pending(RequestLineState::Version));
    };

    let line = src.split_to(lf + 1);
    let Some(token) = line.strip_suffix(b"\r\n") else {
        return Err(ParseError::invalid_request_line("request line must end with CRLF"));
    };
    let version = parse_version(token, ParseError::invalid_request_line::<String>)?;
    out.push(LineToken::Version(version));
    Ok(Step::Done)
}

/// Parses `HTTP/major.minor`, only major version 1 is supported.
///
/// Minor versions above 1 are read as HTTP/1.1.
fn parse_version(token: &[u8], malformed: fn(String) -> ParseError) -> Result<Version, ParseError> {
    let is_number = |part: &[u8]| !part.is_empty() && part.iter().all(u8::is_ascii_digit);
    let parts = token.strip_prefix(b"HTTP/").and_then(|rest| {
        let dot = rest.iter().position(|b| *b == b'.')?;
        Some((&rest[..dot], &rest[dot + 1..]))
    });

    match parts {
        Some((major, minor)) if is_number(major) && is_number(minor) => {
            if major != b"1" {
                return Err(ParseError::unsupported_version(String::from_utf8_lossy(token)));
            }
            if minor == b"0" { Ok(Version::HTTP_10) } else { Ok(Version::HTTP_11) }
        }
        _ => Err(malformed(format!("invalid http version {}", String::from_utf8_lossy(token)))),
    }
}

/// Builds `(method, target, version)` from a finished request line.
pub(crate) fn finish_request_line(tokens: Vec<LineToken>) -> Result<(Method, Uri, Version), ParseError> {
    match <[LineToken; 3]>::try_from(tokens) {
        Ok([LineToken::Method(method), LineToken::Target(uri), LineToken::Version(version)]) => Ok((method, uri, version)),
        _ => Err(ParseError::invalid_request_line("incomplete request line")),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatusLineState {
    Version,
    Status,
    Reason,
}

impl DecodingState for StatusLineState {
    type Artifact = LineToken;
    type Context = DecoderConfig;

    fn step(self, src: &mut BytesMut, config: &mut DecoderConfig, out: &mut Vec<LineToken>) -> Result<Step<Self>, ParseError> {
        match self {
            StatusLineState::Version => read_response_version(src, out),
            StatusLineState::Status => read_status(src, out),
            StatusLineState::Reason => read_reason(src, config.max_header_bytes(), out),
        }
    }
}

fn read_response_version(src: &mut BytesMut, out: &mut Vec<LineToken>) -> Result<Step<StatusLineState>, ParseError> {
    let Some(sp) = src.iter().take(MAX_VERSION_LEN).position(|b| *b == b' ') else {
        if src.len() >= MAX_VERSION_LEN {
            return Err(ParseError::invalid_status_line("http version too long"));
        }
        return Ok(Step::Pending(StatusLineState::Version));
    };

    let token = src.split_to(sp);
    src.advance(1);
    let version = parse_version(&token, ParseError::invalid_status_line::<String>)?;
    out.push(LineToken::Version(version));
    Ok(Step::Next(StatusLineState::Status))
}

fn read_status(src: &mut BytesMut, out: &mut Vec<LineToken>) -> Result<Step<StatusLineState>, ParseError> {
    if src.len() < 4 {
        return Ok(Step::Pending(StatusLineState::Status));
    }

    let code = &src[..3];
    if !code.iter().all(u8::is_ascii_digit) {
        return Err(ParseError::invalid_status_line(format!("status {} is not numeric", String::from_utf8_lossy(code))));
    }
    let status = StatusCode::from_bytes(code).map_err(ParseError::invalid_status_line)?;
    if status.canonical_reason().is_none() {
        return Err(ParseError::invalid_status_line(format!("unknown status {status}")));
    }

    match src[3] {
        b' ' => src.advance(4),
        b'\r' => src.advance(3),
        b => return Err(ParseError::invalid_status_line(format!("unexpected byte 0x{b:02x} after status"))),
    }
    trace!(%status, "read response status");
    out.push(LineToken::Status(status));
    Ok(Step::Next(StatusLineState::Reason))
}

fn read_reason(src: &mut BytesMut, max: usize, out: &mut Vec<LineToken>) -> Result<Step<StatusLineState>, ParseError> {
    let Some(lf) = src.iter().position(|b| *b == b'\n') else {
        if src.len() > max {
            return Err(ParseError::invalid_status_line("reason phrase too long"));
        }
        return Ok(Step::Pending(StatusLineState::Reason));
    };

    let line = src.split_to(lf + 1);
    let Some(reason) = line.strip_suffix(b"\r\n") else {
        return Err(ParseError::invalid_status_line("status line must end with CRLF"));
    };
    let reason = reason.trim_ascii();
    let reason = (!reason.is_empty()).then(|| String::from_utf8_lossy(reason).into_owned());
    out.push(LineToken::Reason(reason));
    Ok(Step::Done)
}

/// Builds `(version, status, reason)` from a finished status line.
pub(crate) fn finish_status_line(tokens: Vec<LineToken>) -> Result<(Version, StatusCode, Option<String>), ParseError> {
    match <[LineToken; 3]>::try_from(tokens) {
        Ok([LineToken::Version(version), LineToken::Status(status), LineToken::Reason(reason)]) => Ok((version, status, reason)),
        _ => Err(ParseError::invalid_status_line("incomplete status line")),
    }
}

#[cfg(test)]
mod tests {
    use std::task::Poll;

    use super::*;
    use crate::codec::machine::StateMachine;

    fn request_line(input: &str) -> Result<Poll<Vec<LineToken>>, ParseError> {
        let mut machine = StateMachine::new(RequestLineState::Start);
        machine.run(&mut BytesMut::from(input), &mut DecoderConfig::default())
    }

    fn status_line(input: &str) -> Result<Poll<Vec<LineToken>>, ParseError> {
        let mut machine = StateMachine::new(StatusLineState::Version);
        machine.run(&mut BytesMut::from(input), &mut DecoderConfig::default())
    }

    #[test]
    fn parses_request_line() {
        let Poll::Ready(tokens) = request_line("GET /index.html?a=1 HTTP/1.1\r\n").unwrap() else {
            panic!("line should be complete");
        };
        let (method, uri, version) = finish_request_line(tokens).unwrap();
        assert_eq!(method, Method::GET);
        assert_eq!(uri, "/index.html?a=1");
        assert_eq!(version, Version::HTTP_11);
    }

    #[test]
    fn skips_leading_empty_lines() {
        let Poll::Ready(tokens) = request_line("\r\n\r\nHEAD / HTTP/1.0\r\n").unwrap() else {
            panic!("line should be complete");
        };
        let (method, _, version) = finish_request_line(tokens).unwrap();
        assert_eq!(method, Method::HEAD);
        assert_eq!(version, Version::HTTP_10);
    }

    #[test]
    fn resumes_at_any_byte() {
        let input = b"PATCH /a//b HTTP/1.1\r\n";
        let mut machine = StateMachine::new(RequestLineState::Start);
        let mut config = DecoderConfig::default();
        let mut src = BytesMut::new();
        let mut result = Poll::Pending;
        for b in input {
            src.put_u8(*b);
            result = machine.run(&mut src, &mut config).unwrap();
        }
        let Poll::Ready(tokens) = result else {
            panic!("line should be complete");
        };
        let (method, uri, _) = finish_request_line(tokens).unwrap();
        assert_eq!(method, Method::PATCH);
        assert_eq!(uri, "/a/b");
    }

    #[test]
    fn lowercase_start_fails_fast() {
        assert!(matches!(request_line("get / HTTP/1.1\r\n"), Err(ParseError::InvalidRequestLine { .. })));
    }

    #[test]
    fn unknown_method_is_not_implemented() {
        assert!(matches!(request_line("BREW / HTTP/1.1\r\n"), Err(ParseError::UnsupportedMethod { .. })));
        assert!(matches!(request_line("PROPFINDX"), Err(ParseError::UnsupportedMethod { .. })));
    }

    #[test]
    fn unsupported_major_version() {
        assert!(matches!(request_line("GET / HTTP/2.0\r\n"), Err(ParseError::UnsupportedVersion { .. })));
        assert!(matches!(request_line("GET / HTTX/1.1\r\n"), Err(ParseError::InvalidRequestLine { .. })));
    }

    #[test]
    fn missing_version_is_rejected() {
        assert!(matches!(request_line("GET /\r\n"), Err(ParseError::InvalidRequestLine { .. })));
    }

    #[test]
    fn target_length_boundary() {
        let ok = format!("GET /{} HTTP/1.1\r\n", "a".repeat(8191));
        assert!(request_line(&ok).unwrap().is_ready());

        let too_long = format!("GET /{} HTTP/1.1\r\n", "a".repeat(8192));
        assert!(matches!(request_line(&too_long), Err(ParseError::UriTooLong { .. })));

        let pending_too_long = format!("GET /{}", "a".repeat(9000));
        assert!(matches!(request_line(&pending_too_long), Err(ParseError::UriTooLong { .. })));
    }

    #[test]
    fn collapses_slashes_in_path_only() {
        let collapse = |s: &'static str| collapse_slashes(Bytes::from_static(s.as_bytes()));
        assert_eq!(collapse("/a//b///c"), "/a/b/c");
        assert_eq!(collapse("//a"), "/a");
        assert_eq!(collapse("/a?next=//b"), "/a?next=//b");
        assert_eq!(collapse("http://host//x//y?q=//"), "http://host/x/y?q=//");
        assert_eq!(collapse("http://host?q=//"), "http://host?q=//");
        assert_eq!(collapse("example.com:443"), "example.com:443");
    }

    #[test]
    fn parses_status_line() {
        let Poll::Ready(tokens) = status_line("HTTP/1.1 404 Not Found\r\n").unwrap() else {
            panic!("line should be complete");
        };
        let (version, status, reason) = finish_status_line(tokens).unwrap();
        assert_eq!(version, Version::HTTP_11);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(reason.as_deref(), Some("Not Found"));
    }

    #[test]
    fn reason_may_be_empty() {
        for line in ["HTTP/1.0 200 \r\n", "HTTP/1.0 200\r\n"] {
            let Poll::Ready(tokens) = status_line(line).unwrap() else {
                panic!("line should be complete");
            };
            let (version, status, reason) = finish_status_line(tokens).unwrap();
            assert_eq!(version, Version::HTTP_10);
            assert_eq!(status, StatusCode::OK);
            assert_eq!(reason, None);
        }
    }

    #[test]
    fn status_outside_known_set_is_rejected() {
        assert!(matches!(status_line("HTTP/1.1 299 Custom\r\n"), Err(ParseError::InvalidStatusLine { .. })));
        assert!(matches!(status_line("HTTP/1.1 2x0 OK\r\n"), Err(ParseError::InvalidStatusLine { .. })));
        assert!(matches!(status_line("HTTP/3.0 200 OK\r\n"), Err(ParseError::UnsupportedVersion { .. })));
    }
}
