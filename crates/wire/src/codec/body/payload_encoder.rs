use bytes::Bytes;
use tracing::trace;

use crate::codec::body::chunked_encoder::frame_chunk;
use crate::codec::body::gzip_encoder::frame_gzip;
use crate::codec::body::length_encoder::LengthEncoder;
use crate::protocol::{Content, SendError};

/// Frames the body fragments of one outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PayloadEncoder {
    kind: Kind,
    gzip: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    /// content-length payload
    Length(LengthEncoder),

    /// transfer-encoding chunked payload
    Chunked,

    /// bytes written as they come, the body ends with the connection
    Raw,
}

impl PayloadEncoder {
    pub(crate) fn fix_length(length: u64) -> Self {
        Self { kind: Kind::Length(LengthEncoder::new(length)), gzip: false }
    }

    pub(crate) fn chunked(gzip: bool) -> Self {
        Self { kind: Kind::Chunked, gzip }
    }

    pub(crate) fn raw(gzip: bool) -> Self {
        Self { kind: Kind::Raw, gzip }
    }

    pub(crate) fn is_chunked(&self) -> bool {
        matches!(self.kind, Kind::Chunked)
    }

    /// Checks that `content` may be written next, without writing anything.
    pub(crate) fn check(&mut self, content: &Content) -> Result<(), SendError> {
        match &mut self.kind {
            Kind::Length(encoder) => encoder.check(content.len(), content.is_complete()),
            Kind::Chunked | Kind::Raw => Ok(()),
        }
    }

    /// Frames an already checked fragment and pushes the wire segments to `out`.
    pub(crate) fn encode(&self, content: Content, out: &mut Vec<Bytes>) {
        let complete = content.is_complete();
        let mut region = content.into_region();
        if self.gzip {
            region = frame_gzip(region);
        }
        if self.is_chunked() {
            region = frame_chunk(region, complete);
        }

        trace!(len = region.len(), complete, "encode body fragment");
        if !region.is_empty() {
            out.push(region.freeze());
        }
    }
}
