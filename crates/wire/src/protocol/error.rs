use http::StatusCode;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("decode error: {source}")]
    DecodeError {
        #[from]
        source: ParseError,
    },

    #[error("encode error: {source}")]
    EncodeError {
        #[from]
        source: SendError,
    },
}

/// Faults raised while decoding inbound bytes.
///
/// Every variant is terminal for the connection direction it was raised on:
/// subsequent bytes can't be resynchronized. [`ParseError::status`] tells the
/// collaborator which reply (if any) to send before closing.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("invalid request line: {reason}")]
    InvalidRequestLine { reason: String },

    #[error("unsupported http method: {method}")]
    UnsupportedMethod { method: String },

    #[error("request target too long, current: {current_size} exceed the limit {max_size}")]
    UriTooLong { current_size: usize, max_size: usize },

    #[error("invalid request target: {reason}")]
    InvalidUri { reason: String },

    #[error("unsupported http version: {version}")]
    UnsupportedVersion { version: String },

    #[error("invalid status line: {reason}")]
    InvalidStatusLine { reason: String },

    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid host: {reason}")]
    InvalidHost { reason: String },

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid chunked body: {reason}")]
    InvalidChunk { reason: String },

    #[error("stream ended while decoding {state}")]
    UnexpectedEof { state: &'static str },

    #[error("decoder already failed, no more input is accepted")]
    Poisoned,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn invalid_request_line<S: ToString>(str: S) -> Self {
        Self::InvalidRequestLine { reason: str.to_string() }
    }

    pub fn unsupported_method<S: ToString>(str: S) -> Self {
        Self::UnsupportedMethod { method: str.to_string() }
    }

    pub fn uri_too_long(current_size: usize, max_size: usize) -> Self {
        Self::UriTooLong { current_size, max_size }
    }

    pub fn invalid_uri<S: ToString>(str: S) -> Self {
        Self::InvalidUri { reason: str.to_string() }
    }

    pub fn unsupported_version<S: ToString>(str: S) -> Self {
        Self::UnsupportedVersion { version: str.to_string() }
    }

    pub fn invalid_status_line<S: ToString>(str: S) -> Self {
        Self::InvalidStatusLine { reason: str.to_string() }
    }

    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_host<S: ToString>(str: S) -> Self {
        Self::InvalidHost { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn invalid_chunk<S: ToString>(str: S) -> Self {
        Self::InvalidChunk { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    /// The status the peer should receive before the connection is closed.
    ///
    /// `None` means there is nobody to answer: faults on the response
    /// direction, truncated exchanges and transport errors.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::InvalidRequestLine { .. }
            | Self::InvalidUri { .. }
            | Self::InvalidHeader { .. }
            | Self::InvalidHost { .. }
            | Self::InvalidContentLength { .. }
            | Self::InvalidChunk { .. } => Some(StatusCode::BAD_REQUEST),
            Self::UnsupportedMethod { .. } => Some(StatusCode::NOT_IMPLEMENTED),
            Self::UriTooLong { .. } => Some(StatusCode::URI_TOO_LONG),
            Self::UnsupportedVersion { .. } => Some(StatusCode::HTTP_VERSION_NOT_SUPPORTED),
            Self::TooLargeHeader { .. } | Self::TooManyHeaders { .. } => Some(StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE),
            Self::InvalidStatusLine { .. } | Self::UnexpectedEof { .. } | Self::Poisoned | Self::Io { .. } => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid message head: {reason}")]
    InvalidHead { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("unsupported http version: {version:?}")]
    UnsupportedVersion { version: http::Version },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_head<S: ToString>(str: S) -> Self {
        Self::InvalidHead { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}
