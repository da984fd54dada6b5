//! HTTP message encoder.
//!
//! [`MessageEncoder`] serializes the [`HttpMessage`] stream of one connection
//! direction. A head opens a message, its content (if any) and the following
//! [`Content`] fragments are framed according to the head's
//! [`TransferCoding`], and the fragment marked complete closes it.
//!
//! Every check runs before any byte of the item is produced, so a rejected
//! item leaves the output untouched.

use bytes::{Bytes, BytesMut};
use http::header::{self, HeaderValue};
use http::{HeaderMap, Method, Version};
use tokio_util::codec::Encoder;
use tracing::{error, trace};

use crate::buffer::Region;
use crate::codec::body::{GZIP_HEADER, PayloadEncoder, frame_chunk};
use crate::codec::header::{write_request_head, write_response_head};
use crate::ensure;
use crate::protocol::header::{content_length, has_token, is_chunked};
use crate::protocol::{Content, HttpMessage, RequestHead, ResponseHead, SendError, TransferCoding};

const CHUNKED: HeaderValue = HeaderValue::from_static("chunked");

#[derive(Debug, Default)]
pub struct MessageEncoder {
    /// Framing of the body still being written, `None` between messages
    body: Option<PayloadEncoder>,
}

impl MessageEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the previous message has been written completely.
    pub fn is_idle(&self) -> bool {
        self.body.is_none()
    }

    /// Encodes `item` as wire segments appended to `frames`.
    ///
    /// The head is one segment, each framed content region another one, so
    /// they can be handed to a vectored write without copying the content.
    pub fn encode_frames(&mut self, item: HttpMessage, frames: &mut Vec<Bytes>) -> Result<(), SendError> {
        match item {
            HttpMessage::Request(head) => self.encode_request(head, frames),
            HttpMessage::Response(head) => self.encode_response(head, frames),
            HttpMessage::Content(content) => self.encode_content(content, frames),
        }
    }

    fn encode_request(&mut self, mut head: RequestHead, frames: &mut Vec<Bytes>) -> Result<(), SendError> {
        self.ensure_idle()?;
        let coding = effective_coding(head.transfer_coding(), head.headers());
        let content = head.take_content();
        let body = request_framing(&mut head, coding, content.as_ref())?;

        let mut dst = BytesMut::new();
        write_request_head(&head, &mut dst)?;
        trace!(method = %head.method(), ?coding, "encode request head");
        self.start_body(dst, body, coding, content, frames)
    }

    fn encode_response(&mut self, mut head: ResponseHead, frames: &mut Vec<Bytes>) -> Result<(), SendError> {
        self.ensure_idle()?;
        let coding = effective_coding(head.transfer_coding(), head.headers());
        let content = head.take_content();
        let body = response_framing(&mut head, coding, content.as_ref())?;

        let mut dst = BytesMut::new();
        write_response_head(&head, &mut dst)?;
        trace!(status = %head.status(), ?coding, "encode response head");
        self.start_body(dst, body, coding, content, frames)
    }

    fn encode_content(&mut self, content: Content, frames: &mut Vec<Bytes>) -> Result<(), SendError> {
        let Some(body) = &mut self.body else {
            error!("expect message head but receive content");
            return Err(SendError::invalid_body("content without an open message"));
        };

        body.check(&content)?;
        let complete = content.is_complete();
        body.encode(content, frames);
        if complete {
            self.body = None;
        }
        Ok(())
    }

    fn ensure_idle(&self) -> Result<(), SendError> {
        if self.body.is_some() {
            error!("expect content but receive message head");
            return Err(SendError::invalid_head("previous message body is still open"));
        }
        Ok(())
    }

    /// Emits the head segment and the content carried by the head, keeps the
    /// body open when that content is incomplete.
    fn start_body(
        &mut self,
        mut head: BytesMut,
        body: Option<PayloadEncoder>,
        coding: TransferCoding,
        content: Option<Content>,
        frames: &mut Vec<Bytes>,
    ) -> Result<(), SendError> {
        let (Some(mut body), Some(content)) = (body, content) else {
            frames.push(head.freeze());
            return Ok(());
        };

        body.check(&content)?;
        if coding.is_gzipped() {
            if body.is_chunked() {
                frames.push(head.freeze());
                frames.push(frame_chunk(Region::from_static(&GZIP_HEADER), false).freeze());
            } else {
                head.extend_from_slice(&GZIP_HEADER);
                frames.push(head.freeze());
            }
        } else {
            frames.push(head.freeze());
        }

        let complete = content.is_complete();
        body.encode(content, frames);
        if !complete {
            self.body = Some(body);
        }
        Ok(())
    }
}

impl Encoder<HttpMessage> for MessageEncoder {
    type Error = SendError;

    fn encode(&mut self, item: HttpMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let mut frames = Vec::new();
        self.encode_frames(item, &mut frames)?;

        dst.reserve(frames.iter().map(Bytes::len).sum());
        for frame in frames {
            dst.extend_from_slice(&frame);
        }
        Ok(())
    }
}

/// A `Transfer-Encoding: chunked` header frames the body even when the
/// coding decision says identity.
fn effective_coding(coding: TransferCoding, headers: &HeaderMap) -> TransferCoding {
    match coding {
        TransferCoding::Identity if is_chunked(headers) => TransferCoding::Chunked,
        TransferCoding::Gzip if is_chunked(headers) => TransferCoding::ChunkedGzip,
        coding => coding,
    }
}

/// Shared framing checks, then the framing headers a non-identity coding needs.
///
/// Returns the declared length for identity codings.
fn coded_framing(version: Version, headers: &mut HeaderMap, coding: TransferCoding) -> Result<Option<u64>, SendError> {
    let declared = content_length(headers).map_err(|e| SendError::invalid_head(e.to_string()))?;
    if coding.is_identity() {
        return Ok(declared);
    }

    ensure!(declared.is_none(), SendError::invalid_head(format!("content-length can't be combined with {coding:?} coding")));
    if coding.is_chunked() {
        ensure!(version == Version::HTTP_11, SendError::invalid_head("chunked transfer coding requires HTTP/1.1"));
        if !has_token(headers, &header::TRANSFER_ENCODING, "chunked") {
            headers.append(header::TRANSFER_ENCODING, CHUNKED);
        }
    }
    Ok(None)
}

fn body_encoder(coding: TransferCoding) -> PayloadEncoder {
    if coding.is_chunked() { PayloadEncoder::chunked(coding.is_gzipped()) } else { PayloadEncoder::raw(coding.is_gzipped()) }
}

/// Methods whose requests carry no content unless some is given.
fn is_bodiless_method(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD || method == Method::CONNECT
}

fn set_content_length(headers: &mut HeaderMap, length: u64) {
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
}

fn request_framing(
    head: &mut RequestHead,
    coding: TransferCoding,
    content: Option<&Content>,
) -> Result<Option<PayloadEncoder>, SendError> {
    let version = head.version();
    let declared = coded_framing(version, head.headers_mut(), coding)?;
    if !coding.is_identity() {
        return Ok(content.map(|_| body_encoder(coding)));
    }

    let method = head.method().clone();
    let encoder = match (declared, content) {
        (Some(length), Some(_)) => Some(PayloadEncoder::fix_length(length)),
        (Some(_), None) => None,
        (None, Some(content)) if content.is_complete() => {
            if !(content.is_empty() && is_bodiless_method(&method)) {
                set_content_length(head.headers_mut(), content.len() as u64);
            }
            Some(PayloadEncoder::fix_length(content.len() as u64))
        }
        (None, Some(_)) => {
            error!(%method, "request body has neither a length nor a chunked coding");
            return Err(SendError::invalid_body("request body of unknown length needs a content-length or chunked coding"));
        }
        (None, None) => {
            if !is_bodiless_method(&method) {
                set_content_length(head.headers_mut(), 0);
            }
            None
        }
    };
    Ok(encoder)
}

fn response_framing(
    head: &mut ResponseHead,
    coding: TransferCoding,
    content: Option<&Content>,
) -> Result<Option<PayloadEncoder>, SendError> {
    if head.is_bodiless_status() {
        ensure!(
            content.is_none_or(Content::is_empty),
            SendError::invalid_body(format!("status {} can't carry a body", head.status()))
        );
        return Ok(None);
    }

    let version = head.version();
    let declared = coded_framing(version, head.headers_mut(), coding)?;
    if !coding.is_identity() {
        return Ok(content.map(|_| body_encoder(coding)));
    }

    let encoder = match (declared, content) {
        (Some(length), Some(_)) => Some(PayloadEncoder::fix_length(length)),
        (Some(_), None) => None,
        (None, None) => {
            // an absent body is an empty one
            if !head.headers().contains_key(header::TRANSFER_ENCODING) {
                set_content_length(head.headers_mut(), 0);
            }
            None
        }
        (None, Some(content)) if content.is_complete() && !head.headers().contains_key(header::TRANSFER_ENCODING) => {
            set_content_length(head.headers_mut(), content.len() as u64);
            Some(PayloadEncoder::fix_length(content.len() as u64))
        }
        (None, Some(_)) => Some(PayloadEncoder::raw(false)),
    };
    Ok(encoder)
}
