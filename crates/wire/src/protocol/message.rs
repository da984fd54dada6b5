use http::{HeaderMap, Version, header};

use crate::buffer::Region;
use crate::protocol::header::has_token;
use crate::protocol::{RequestHead, ResponseHead};

/// One artifact of the wire engine.
///
/// A decoded connection direction is a sequence of start messages, each
/// optionally followed by [`Content`] fragments. A body is complete once a
/// fragment with [`Content::is_complete`] has been seen.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpMessage {
    Request(RequestHead),
    Response(ResponseHead),
    Content(Content),
}

impl HttpMessage {
    #[inline]
    pub fn is_request(&self) -> bool {
        matches!(self, HttpMessage::Request(_))
    }

    #[inline]
    pub fn is_response(&self) -> bool {
        matches!(self, HttpMessage::Response(_))
    }

    #[inline]
    pub fn is_content(&self) -> bool {
        matches!(self, HttpMessage::Content(_))
    }

    pub fn as_request(&self) -> Option<&RequestHead> {
        match self {
            HttpMessage::Request(head) => Some(head),
            _ => None,
        }
    }

    pub fn as_response(&self) -> Option<&ResponseHead> {
        match self {
            HttpMessage::Response(head) => Some(head),
            _ => None,
        }
    }

    pub fn as_content(&self) -> Option<&Content> {
        match self {
            HttpMessage::Content(content) => Some(content),
            _ => None,
        }
    }

    pub fn into_content(self) -> Option<Content> {
        match self {
            HttpMessage::Content(content) => Some(content),
            _ => None,
        }
    }

    /// Whether no further artifact belongs to the exchange this one is part of.
    ///
    /// True for start messages without a pending body and for the final
    /// content fragment.
    pub fn is_terminal(&self) -> bool {
        match self {
            HttpMessage::Request(head) => head.is_complete(),
            HttpMessage::Response(head) => head.is_complete(),
            HttpMessage::Content(content) => content.is_complete(),
        }
    }
}

impl From<RequestHead> for HttpMessage {
    fn from(head: RequestHead) -> Self {
        HttpMessage::Request(head)
    }
}

impl From<ResponseHead> for HttpMessage {
    fn from(head: ResponseHead) -> Self {
        HttpMessage::Response(head)
    }
}

impl From<Content> for HttpMessage {
    fn from(content: Content) -> Self {
        HttpMessage::Content(content)
    }
}

/// One body fragment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Content {
    region: Region,
    complete: bool,
}

impl Content {
    pub fn new<R: Into<Region>>(region: R, complete: bool) -> Self {
        Self { region: region.into(), complete }
    }

    /// The last fragment of a body.
    pub fn complete<R: Into<Region>>(region: R) -> Self {
        Self::new(region, true)
    }

    /// A fragment with more to follow.
    pub fn incomplete<R: Into<Region>>(region: R) -> Self {
        Self::new(region, false)
    }

    /// An empty final fragment, marks the end of a streamed body.
    pub fn end() -> Self {
        Self::complete(Region::empty())
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn set_complete(&mut self, complete: bool) {
        self.complete = complete;
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn region_mut(&mut self) -> &mut Region {
        &mut self.region
    }

    pub fn into_region(self) -> Region {
        self.region
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.region.as_slice()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.region.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.region.is_empty()
    }
}

/// How a message body is framed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferCoding {
    #[default]
    Identity,
    Chunked,
    /// The 5-byte gzip pseudo-envelope, delimited by the connection close
    Gzip,
    /// The gzip pseudo-envelope inside chunk framing
    ChunkedGzip,
}

impl TransferCoding {
    #[inline]
    pub fn is_identity(&self) -> bool {
        matches!(self, TransferCoding::Identity)
    }

    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, TransferCoding::Chunked | TransferCoding::ChunkedGzip)
    }

    #[inline]
    pub fn is_gzipped(&self) -> bool {
        matches!(self, TransferCoding::Gzip | TransferCoding::ChunkedGzip)
    }
}

/// Whether the connection should close after this message.
pub(crate) fn wants_close(version: Version, headers: &HeaderMap) -> bool {
    if has_token(headers, &header::CONNECTION, "close") {
        return true;
    }
    version == Version::HTTP_10 && !has_token(headers, &header::CONNECTION, "keep-alive")
}
