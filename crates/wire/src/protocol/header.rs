//! Header helpers shared by the decoder and the encoder.
//!
//! Header fields are stored in an [`http::HeaderMap`], which already gives
//! case-insensitive names and multiple values per name. This module adds the
//! gateway's rules on top of it: which headers are comma-separated lists,
//! how `Host`/`Origin`/`Referer` are canonicalized, and how framing headers
//! are read.

use http::header::{self, Entry};
use http::uri::Authority;
use http::{HeaderMap, HeaderName, HeaderValue};

use crate::ensure;
use crate::protocol::ParseError;

/// Whether each comma-delimited token of `name` is stored as its own value.
pub fn is_comma_separated(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "accept"
            | "accept-charset"
            | "accept-encoding"
            | "accept-language"
            | "allow"
            | "cache-control"
            | "connection"
            | "content-encoding"
            | "content-language"
            | "expect"
            | "if-match"
            | "if-none-match"
            | "pragma"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
            | "vary"
            | "via"
            | "sec-websocket-extensions"
            | "sec-websocket-protocol"
            | "x-forwarded-for"
            | "x-forwarded-proto"
            | "x-forwarded-host"
            | "forwarded"
    )
}

/// Appends one decoded header line to `headers`.
///
/// Comma-separated headers are split and trimmed into several values, empty
/// list elements are dropped. Other headers keep the value as one entry.
pub fn append_header(headers: &mut HeaderMap, name: HeaderName, value: HeaderValue) -> Result<(), ParseError> {
    if !is_comma_separated(&name) {
        headers.append(name, value);
        return Ok(());
    }

    for token in value.as_bytes().split(|b| *b == b',') {
        let token = token.trim_ascii();
        if token.is_empty() {
            continue;
        }
        let value = HeaderValue::from_bytes(token).map_err(|e| ParseError::invalid_header(format!("{name}: {e}")))?;
        headers.append(name.clone(), value);
    }
    Ok(())
}

const NULL_ORIGIN: HeaderValue = HeaderValue::from_static("null");

/// Lower-cases the authority of `Host`, `Origin` and `Referer` values.
///
/// A malformed `Origin` becomes the literal `null` (RFC 6454 §6.1) instead of
/// failing the message. A malformed `Referer` is left untouched.
pub fn canonicalize(headers: &mut HeaderMap) {
    if let Entry::Occupied(mut entry) = headers.entry(header::HOST) {
        for value in entry.iter_mut() {
            *value = lowercase(value);
        }
    }

    if let Entry::Occupied(mut entry) = headers.entry(header::ORIGIN) {
        for value in entry.iter_mut() {
            *value = canonical_origin(value);
        }
    }

    if let Entry::Occupied(mut entry) = headers.entry(header::REFERER) {
        for value in entry.iter_mut() {
            if let Some(canonical) = canonical_referer(value) {
                *value = canonical;
            }
        }
    }
}

fn lowercase(value: &HeaderValue) -> HeaderValue {
    HeaderValue::from_bytes(&value.as_bytes().to_ascii_lowercase()).unwrap_or_else(|_| value.clone())
}

fn canonical_origin(value: &HeaderValue) -> HeaderValue {
    let Ok(origin) = value.to_str() else {
        return NULL_ORIGIN;
    };

    match split_absolute(origin) {
        Some((scheme, authority, "")) => HeaderValue::from_str(&format!("{scheme}://{authority}").to_ascii_lowercase()).unwrap_or(NULL_ORIGIN),
        _ => NULL_ORIGIN,
    }
}

fn canonical_referer(value: &HeaderValue) -> Option<HeaderValue> {
    let referer = value.to_str().ok()?;
    let (scheme, authority, rest) = split_absolute(referer)?;
    let prefix = format!("{scheme}://{authority}").to_ascii_lowercase();
    HeaderValue::from_str(&format!("{prefix}{rest}")).ok()
}

/// Splits `scheme://authority rest` where rest starts at the first `/`, `?` or `#`.
fn split_absolute(value: &str) -> Option<(&str, &str, &str)> {
    let (scheme, remain) = value.split_once("://")?;

    let mut scheme_chars = scheme.bytes();
    let valid_scheme = scheme_chars.next().is_some_and(|b| b.is_ascii_alphabetic())
        && scheme_chars.all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.'));
    if !valid_scheme {
        return None;
    }

    let authority_end = remain.find(['/', '?', '#']).unwrap_or(remain.len());
    let (authority, rest) = remain.split_at(authority_end);
    if authority.is_empty() || Authority::try_from(authority).is_err() {
        return None;
    }
    Some((scheme, authority, rest))
}

/// Whether a (comma-split) header carries `token`, compared case-insensitively.
pub fn has_token(headers: &HeaderMap, name: &HeaderName, token: &str) -> bool {
    headers
        .get_all(name)
        .iter()
        .flat_map(|value| value.as_bytes().split(|b| *b == b','))
        .any(|item| item.trim_ascii().eq_ignore_ascii_case(token.as_bytes()))
}

/// Checks if the Transfer-Encoding header indicates chunked encoding.
///
/// According to RFC 7230, chunked must be the last encoding if present.
pub fn is_chunked(headers: &HeaderMap) -> bool {
    const CHUNKED: &[u8] = b"chunked";
    headers
        .get_all(header::TRANSFER_ENCODING)
        .iter()
        .last()
        .and_then(|value| value.as_bytes().rsplit(|b| *b == b',').next())
        .is_some_and(|last| last.trim_ascii().eq_ignore_ascii_case(CHUNKED))
}

/// Reads the Content-Length header.
///
/// Values are plain decimal digits, signs are rejected. Duplicated values
/// are accepted only when they all agree.
pub fn content_length(headers: &HeaderMap) -> Result<Option<u64>, ParseError> {
    let mut length = None;
    for value in headers.get_all(header::CONTENT_LENGTH) {
        let str = value.to_str().map_err(|_| ParseError::invalid_content_length("value can't to_str"))?.trim();
        ensure!(
            !str.is_empty() && str.bytes().all(|b| b.is_ascii_digit()),
            ParseError::invalid_content_length(format!("value {str} is not a decimal length"))
        );
        let parsed = str.parse::<u64>().map_err(|_| ParseError::invalid_content_length(format!("value {str} is not u64")))?;

        match length {
            Some(previous) if previous != parsed => {
                return Err(ParseError::invalid_content_length(format!("conflicting values {previous} and {parsed}")));
            }
            _ => length = Some(parsed),
        }
    }
    Ok(length)
}
