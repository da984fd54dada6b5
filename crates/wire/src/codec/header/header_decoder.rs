//! Header block states.
//!
//! The graph reads `name: value` lines until the empty line, joining obs-fold
//! continuation lines (starting with SP or HT) onto the previous value with a
//! single space. It emits one `(name, value)` field per logical line; the
//! comma-splitting, canonicalization and cookie extraction happen once the
//! block is finished, in [`finish_headers`].

use bytes::{Buf, BufMut, BytesMut};
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::{Uri, Version};
use tracing::{debug, trace};

use crate::codec::config::DecoderConfig;
use crate::codec::machine::{DecodingState, Step};
use crate::ensure;
use crate::protocol::header::{append_header, canonicalize};
use crate::protocol::{CookieJar, ParseError, parse_set_cookie};

pub(crate) type HeaderField = (HeaderName, HeaderValue);

#[derive(Debug)]
pub(crate) enum HeaderState {
    /// Expect a field name or the empty line ending the block
    Name { consumed: usize },
    Value { name: HeaderName, consumed: usize },
    /// A value was read, it may be continued on the next line
    Fold { name: HeaderName, value: BytesMut, consumed: usize },
}

impl HeaderState {
    pub(crate) fn new() -> Self {
        HeaderState::Name { consumed: 0 }
    }
}

impl DecodingState for HeaderState {
    type Artifact = HeaderField;
    type Context = DecoderConfig;

    fn step(self, src: &mut BytesMut, config: &mut DecoderConfig, out: &mut Vec<HeaderField>) -> Result<Step<Self>, ParseError> {
        match self {
            HeaderState::Name { consumed } => read_name(src, consumed, config),
            HeaderState::Value { name, consumed } => read_value(src, name, consumed, config),
            HeaderState::Fold { name, value, consumed } => read_fold(src, name, value, consumed, config, out),
        }
    }
}

#[inline]
fn is_lws(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

fn check_size(used: usize, config: &DecoderConfig) -> Result<(), ParseError> {
    ensure!(used <= config.max_header_bytes(), ParseError::too_large_header(used, config.max_header_bytes()));
    Ok(())
}

fn read_name(src: &mut BytesMut, consumed: usize, config: &DecoderConfig) -> Result<Step<HeaderState>, ParseError> {
    if src.starts_with(b"\r\n") {
        src.advance(2);
        trace!(header_bytes = consumed + 2, "finished reading header block");
        return Ok(Step::Done);
    }

    match src.first() {
        None => return Ok(Step::Pending(HeaderState::Name { consumed })),
        Some(b'\r') if src.len() == 1 => return Ok(Step::Pending(HeaderState::Name { consumed })),
        _ => {}
    }

    let Some(end) = src.iter().position(|b| matches!(b, b':' | b'\r' | b'\n')) else {
        check_size(consumed + src.len(), config)?;
        return Ok(Step::Pending(HeaderState::Name { consumed }));
    };
    ensure!(src[end] == b':', ParseError::invalid_header("header line without colon"));

    let raw = &src[..end];
    if raw.first().copied().is_some_and(is_lws) || raw.last().copied().is_some_and(is_lws) {
        return Err(ParseError::invalid_header(format!("whitespace around header name {:?}", String::from_utf8_lossy(raw))));
    }
    let name = HeaderName::from_bytes(raw)
        .map_err(|_| ParseError::invalid_header(format!("invalid header name {:?}", String::from_utf8_lossy(raw))))?;

    src.advance(end + 1);
    let consumed = consumed + end + 1;
    check_size(consumed, config)?;
    Ok(Step::Next(HeaderState::Value { name, consumed }))
}

/// Splits off the next CRLF terminated line without its line ending.
///
/// Returns `None` when no LF has arrived yet.
fn take_line(src: &mut BytesMut) -> Result<Option<(BytesMut, usize)>, ParseError> {
    let Some(lf) = src.iter().position(|b| *b == b'\n') else {
        return Ok(None);
    };
    ensure!(lf > 0 && src[lf - 1] == b'\r', ParseError::invalid_header("header line must end with CRLF"));

    let mut line = src.split_to(lf + 1);
    line.truncate(lf - 1);
    Ok(Some((trim(line), lf + 1)))
}

fn trim(mut bytes: BytesMut) -> BytesMut {
    let start = bytes.iter().position(|b| !is_lws(*b)).unwrap_or(bytes.len());
    bytes.advance(start);
    let end = bytes.iter().rposition(|b| !is_lws(*b)).map_or(0, |i| i + 1);
    bytes.truncate(end);
    bytes
}

fn read_value(src: &mut BytesMut, name: HeaderName, consumed: usize, config: &DecoderConfig) -> Result<Step<HeaderState>, ParseError> {
    let Some((value, len)) = take_line(src)? else {
        check_size(consumed + src.len(), config)?;
        return Ok(Step::Pending(HeaderState::Value { name, consumed }));
    };

    let consumed = consumed + len;
    check_size(consumed, config)?;
    Ok(Step::Next(HeaderState::Fold { name, value, consumed }))
}

fn read_fold(
    src: &mut BytesMut,
    name: HeaderName,
    mut value: BytesMut,
    consumed: usize,
    config: &DecoderConfig,
    out: &mut Vec<HeaderField>,
) -> Result<Step<HeaderState>, ParseError> {
    match src.first() {
        None => Ok(Step::Pending(HeaderState::Fold { name, value, consumed })),

        Some(b) if is_lws(*b) => {
            let Some((continuation, len)) = take_line(src)? else {
                check_size(consumed + src.len(), config)?;
                return Ok(Step::Pending(HeaderState::Fold { name, value, consumed }));
            };
            if !continuation.is_empty() {
                if !value.is_empty() {
                    value.put_u8(b' ');
                }
                value.extend_from_slice(&continuation);
            }
            let consumed = consumed + len;
            check_size(consumed, config)?;
            Ok(Step::Next(HeaderState::Fold { name, value, consumed }))
        }

        Some(_) => {
            ensure!(out.len() < config.max_headers(), ParseError::too_many_headers(config.max_headers()));
            let value = HeaderValue::from_maybe_shared(value.freeze())
                .map_err(|_| ParseError::invalid_header(format!("invalid value for header {name}")))?;
            out.push((name, value));
            Ok(Step::Next(HeaderState::Name { consumed }))
        }
    }
}

/// Which cookie grammar applies to a header block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CookieKind {
    /// `Cookie` lines with the `$Version`/`$Path`/`$Domain` grammar
    Request,
    /// One attributed `Set-Cookie` line per cookie
    Response,
}

/// Folds the fields of a finished block into a header map and a cookie jar.
///
/// Cookie lines are moved out of the map into the jar.
pub(crate) fn finish_headers(fields: Vec<HeaderField>, kind: CookieKind) -> Result<(HeaderMap, CookieJar), ParseError> {
    let mut headers = HeaderMap::with_capacity(fields.len());
    for (name, value) in fields {
        append_header(&mut headers, name, value)?;
    }
    canonicalize(&mut headers);

    let mut cookies = CookieJar::new();
    match kind {
        CookieKind::Request => {
            if let header::Entry::Occupied(entry) = headers.entry(header::COOKIE) {
                for value in entry.remove_entry_mult().1 {
                    match value.to_str() {
                        Ok(value) => cookies.parse_request_header(value),
                        Err(_) => debug!("skip non visible-ascii cookie header"),
                    }
                }
            }
        }
        CookieKind::Response => {
            if let header::Entry::Occupied(entry) = headers.entry(header::SET_COOKIE) {
                for value in entry.remove_entry_mult().1 {
                    match value.to_str().ok().and_then(parse_set_cookie) {
                        Some(cookie) => {
                            cookies.insert(cookie);
                        }
                        None => debug!(?value, "skip malformed set-cookie header"),
                    }
                }
            }
        }
    }
    Ok((headers, cookies))
}

/// HTTP/1.1 requests name their host, and an absolute-form target must agree with it.
pub(crate) fn check_host(uri: &Uri, version: Version, headers: &HeaderMap) -> Result<(), ParseError> {
    let host = headers.get(header::HOST);
    match (uri.authority(), host) {
        (None, None) if version == Version::HTTP_11 => Err(ParseError::invalid_host("missing host header")),
        (Some(authority), Some(host)) if uri.scheme().is_some() => {
            ensure!(
                authority.as_str().as_bytes().eq_ignore_ascii_case(host.as_bytes()),
                ParseError::invalid_host(format!("target authority {authority} disagrees with host {host:?}"))
            );
            Ok(())
        }
        _ => Ok(()),
    }
}
