//! Body framing selection and the body decoders behind it.
//!
//! Once a header block is finished, [`request_framing`] or
//! [`response_framing`] decides how the body is delimited. Streamed bodies
//! are then read by a [`PayloadDecoder`]:
//! - Content-Length bodies at or above the streaming threshold
//! - Chunked transfer coding
//! - Response bodies delimited by the connection close

use std::task::Poll;

use bytes::BytesMut;
use http::{Method, StatusCode, Version, header};
use tracing::trace;

use crate::codec::body::chunked_decoder::ChunkedState;
use crate::codec::body::length_decoder::LengthDecoder;
use crate::codec::config::DecoderConfig;
use crate::codec::machine::StateMachine;
use crate::ensure;
use crate::protocol::header::{content_length, has_token, is_chunked};
use crate::protocol::{Content, ParseError, RequestHead, ResponseHead};

/// How the body following a head is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Framing {
    /// The message has no body
    None,
    /// `Content-Length: 0`
    Empty,
    Length(u64),
    Chunked,
    /// The body runs until the peer closes the connection
    UntilClose,
    /// The connection switches protocol, everything after the head is opaque
    Upgrade,
}

/// A request whose `Transfer-Encoding` doesn't end in `chunked`, or that
/// also carries `Content-Length`, can't be delimited safely and is rejected.
pub(crate) fn request_framing(head: &RequestHead) -> Result<Framing, ParseError> {
    if head.method() == Method::HEAD {
        return Ok(Framing::None);
    }

    let headers = head.headers();
    if head.version() == Version::HTTP_11 && headers.contains_key(header::TRANSFER_ENCODING) {
        ensure!(is_chunked(headers), ParseError::invalid_header("request transfer-encoding must end with chunked"));
        ensure!(
            !headers.contains_key(header::CONTENT_LENGTH),
            ParseError::invalid_header("content-length can't be combined with transfer-encoding")
        );
        return Ok(Framing::Chunked);
    }
    Ok(declared_framing(head.version(), headers)?.unwrap_or(Framing::None))
}

/// `request_method` is the method of the request this response answers, when known.
pub(crate) fn response_framing(head: &ResponseHead, request_method: Option<&Method>) -> Result<Framing, ParseError> {
    let status = head.status();
    if status == StatusCode::SWITCHING_PROTOCOLS || (request_method == Some(&Method::CONNECT) && status.is_success()) {
        return Ok(Framing::Upgrade);
    }
    if request_method == Some(&Method::HEAD) || head.is_bodiless_status() {
        return Ok(Framing::None);
    }

    // a coding other than chunked last leaves the connection close as the only delimiter
    if head.version() == Version::HTTP_11 && head.headers().contains_key(header::TRANSFER_ENCODING) && !is_chunked(head.headers()) {
        return Ok(Framing::UntilClose);
    }
    if let Some(framing) = declared_framing(head.version(), head.headers())? {
        return Ok(framing);
    }
    if head.version() == Version::HTTP_10 || has_token(head.headers(), &header::CONNECTION, "close") {
        return Ok(Framing::UntilClose);
    }
    Ok(Framing::None)
}

/// Framing announced by the headers: chunked (HTTP/1.1 only) wins over `Content-Length`.
fn declared_framing(version: Version, headers: &http::HeaderMap) -> Result<Option<Framing>, ParseError> {
    if version == Version::HTTP_11 && is_chunked(headers) {
        return Ok(Some(Framing::Chunked));
    }
    let framing = match content_length(headers)? {
        Some(0) => Some(Framing::Empty),
        Some(length) => Some(Framing::Length(length)),
        None => None,
    };
    Ok(framing)
}

/// Reads a streamed body.
#[derive(Debug)]
pub(crate) struct PayloadDecoder {
    kind: Kind,
}

#[derive(Debug)]
enum Kind {
    /// Decode payload with a fixed content length
    Length(LengthDecoder),

    /// Decode payload using chunked transfer coding
    Chunked(StateMachine<ChunkedState>),

    /// Forward everything until the end of the stream
    UntilClose,
}

impl PayloadDecoder {
    pub(crate) fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthDecoder::new(size)) }
    }

    pub(crate) fn chunked() -> Self {
        Self { kind: Kind::Chunked(StateMachine::new(ChunkedState::new())) }
    }

    pub(crate) fn until_close() -> Self {
        Self { kind: Kind::UntilClose }
    }

    pub(crate) fn is_until_close(&self) -> bool {
        matches!(self.kind, Kind::UntilClose)
    }

    /// Pushes the body fragments available in `src`.
    ///
    /// Returns `Ready` once the complete fragment has been pushed. Fragments
    /// produced before a fault are still pushed.
    pub(crate) fn decode(&mut self, src: &mut BytesMut, config: &mut DecoderConfig, out: &mut Vec<Content>) -> Result<Poll<()>, ParseError> {
        match &mut self.kind {
            Kind::Length(decoder) => Ok(decoder.decode(src, config.max_body_fragment(), out)),
            Kind::Chunked(machine) => match machine.run(src, config) {
                Ok(Poll::Ready(contents)) => {
                    out.extend(contents);
                    Ok(Poll::Ready(()))
                }
                Ok(Poll::Pending) => {
                    machine.drain_into(out);
                    Ok(Poll::Pending)
                }
                Err(e) => {
                    machine.drain_into(out);
                    Err(e)
                }
            },
            Kind::UntilClose => {
                if !src.is_empty() {
                    trace!(len = src.len(), "forward close-delimited bytes");
                    out.push(Content::incomplete(src.split().freeze()));
                }
                Ok(Poll::Pending)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;

    use super::*;

    fn request(method: Method) -> RequestHead {
        RequestHead::new(method, "/".parse().unwrap())
    }

    #[test]
    fn request_framing_priorities() {
        let head = request(Method::POST).with_header(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        assert_eq!(request_framing(&head).unwrap(), Framing::Chunked);

        let head = request(Method::POST).with_header(header::CONTENT_LENGTH, HeaderValue::from_static("10"));
        assert_eq!(request_framing(&head).unwrap(), Framing::Length(10));

        let head = request(Method::POST).with_header(header::CONTENT_LENGTH, HeaderValue::from_static("0"));
        assert_eq!(request_framing(&head).unwrap(), Framing::Empty);

        let head = request(Method::HEAD).with_header(header::CONTENT_LENGTH, HeaderValue::from_static("10"));
        assert_eq!(request_framing(&head).unwrap(), Framing::None);

        let head = request(Method::POST).with_header(header::CONNECTION, HeaderValue::from_static("close"));
        assert_eq!(request_framing(&head).unwrap(), Framing::None);
    }

    #[test]
    fn ambiguous_request_framing_is_rejected() {
        let head = request(Method::POST)
            .with_header(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"))
            .with_header(header::CONTENT_LENGTH, HeaderValue::from_static("10"));
        assert!(matches!(request_framing(&head), Err(ParseError::InvalidHeader { .. })));

        let head = request(Method::POST).with_header(header::TRANSFER_ENCODING, HeaderValue::from_static("gzip"));
        let error = request_framing(&head).unwrap_err();
        assert_eq!(error.status(), Some(StatusCode::BAD_REQUEST));

        let head = request(Method::POST)
            .with_header(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"))
            .with_header(header::TRANSFER_ENCODING, HeaderValue::from_static("gzip"));
        assert!(matches!(request_framing(&head), Err(ParseError::InvalidHeader { .. })));
    }

    #[test]
    fn response_with_unchunked_coding_runs_until_close() {
        let head = ResponseHead::new(StatusCode::OK)
            .with_header(header::TRANSFER_ENCODING, HeaderValue::from_static("gzip"))
            .with_header(header::CONTENT_LENGTH, HeaderValue::from_static("5"));
        assert_eq!(response_framing(&head, Some(&Method::GET)).unwrap(), Framing::UntilClose);
    }

    #[test]
    fn chunked_is_ignored_for_http10() {
        let head = request(Method::POST)
            .with_version(Version::HTTP_10)
            .with_header(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        assert_eq!(request_framing(&head).unwrap(), Framing::None);
    }

    #[test]
    fn bad_content_length_is_a_fault() {
        let head = request(Method::POST).with_header(header::CONTENT_LENGTH, HeaderValue::from_static("ten"));
        assert!(matches!(request_framing(&head), Err(ParseError::InvalidContentLength { .. })));
    }

    #[test]
    fn response_framing_priorities() {
        let ok = || ResponseHead::new(StatusCode::OK);

        assert_eq!(response_framing(&ResponseHead::new(StatusCode::SWITCHING_PROTOCOLS), None).unwrap(), Framing::Upgrade);
        assert_eq!(response_framing(&ok(), Some(&Method::CONNECT)).unwrap(), Framing::Upgrade);
        assert_eq!(response_framing(&ResponseHead::new(StatusCode::NO_CONTENT), None).unwrap(), Framing::None);
        assert_eq!(response_framing(&ResponseHead::new(StatusCode::NOT_MODIFIED), None).unwrap(), Framing::None);

        let with_length = ok().with_header(header::CONTENT_LENGTH, HeaderValue::from_static("5"));
        assert_eq!(response_framing(&with_length, Some(&Method::HEAD)).unwrap(), Framing::None);
        assert_eq!(response_framing(&with_length, Some(&Method::GET)).unwrap(), Framing::Length(5));

        assert_eq!(response_framing(&ok(), None).unwrap(), Framing::None);
        assert_eq!(response_framing(&ok().with_version(Version::HTTP_10), None).unwrap(), Framing::UntilClose);
        let close = ok().with_header(header::CONNECTION, HeaderValue::from_static("close"));
        assert_eq!(response_framing(&close, None).unwrap(), Framing::UntilClose);
    }

    #[test]
    fn until_close_forwards_everything() {
        let mut decoder = PayloadDecoder::until_close();
        let mut out = Vec::new();
        let mut src = BytesMut::from("some bytes");

        assert!(decoder.decode(&mut src, &mut DecoderConfig::default(), &mut out).unwrap().is_pending());
        assert!(src.is_empty());
        assert_eq!(out, vec![Content::incomplete("some bytes")]);
        assert!(decoder.is_until_close());
    }

    #[test]
    fn chunked_fragments_flow_before_the_end() {
        let mut decoder = PayloadDecoder::chunked();
        let mut config = DecoderConfig::default();
        let mut out = Vec::new();

        let mut src = BytesMut::from("3\r\nabc\r\n");
        assert!(decoder.decode(&mut src, &mut config, &mut out).unwrap().is_pending());
        assert_eq!(out, vec![Content::incomplete("abc")]);

        let mut src = BytesMut::from("0\r\n\r\n");
        assert!(decoder.decode(&mut src, &mut config, &mut out).unwrap().is_ready());
        assert_eq!(out.last(), Some(&Content::end()));
    }
}
