/// Longest request-target accepted on a request line, in bytes.
pub const MAX_REQUEST_TARGET: usize = 8192;

/// Bodies with a `Content-Length` below this are delivered in one piece on the head.
pub const STREAMING_THRESHOLD: usize = 4096;

pub const MAX_HEADER_BYTES: usize = 64 * 1024;

pub const MAX_HEADERS: usize = 128;

/// Longest chunk-size line, extensions included.
pub const MAX_CHUNK_SIZE_LINE: usize = 1024;

/// Largest body fragment held back before it is delivered.
///
/// Streamed bodies and chunks above this size arrive in fragments of exactly
/// this size, the last one carrying the remainder.
pub const MAX_BODY_FRAGMENT: usize = 256 * 1024;

/// Limits and flags of a [`MessageDecoder`](crate::codec::MessageDecoder).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    max_request_target: usize,
    streaming_threshold: usize,
    max_header_bytes: usize,
    max_headers: usize,
    max_chunk_size_line: usize,
    max_body_fragment: usize,
    secure: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_request_target: MAX_REQUEST_TARGET,
            streaming_threshold: STREAMING_THRESHOLD,
            max_header_bytes: MAX_HEADER_BYTES,
            max_headers: MAX_HEADERS,
            max_chunk_size_line: MAX_CHUNK_SIZE_LINE,
            max_body_fragment: MAX_BODY_FRAGMENT,
            secure: false,
        }
    }
}

impl DecoderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_request_target(mut self, max: usize) -> Self {
        self.max_request_target = max;
        self
    }

    pub fn with_streaming_threshold(mut self, threshold: usize) -> Self {
        self.streaming_threshold = threshold;
        self
    }

    pub fn with_max_header_bytes(mut self, max: usize) -> Self {
        self.max_header_bytes = max;
        self
    }

    pub fn with_max_headers(mut self, max: usize) -> Self {
        self.max_headers = max;
        self
    }

    pub fn with_max_chunk_size_line(mut self, max: usize) -> Self {
        self.max_chunk_size_line = max;
        self
    }

    /// Fragments hold at least one byte, smaller values are raised to 1.
    pub fn with_max_body_fragment(mut self, max: usize) -> Self {
        self.max_body_fragment = max.max(1);
        self
    }

    /// Marks every decoded request as received over a secure transport.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn max_request_target(&self) -> usize {
        self.max_request_target
    }

    pub fn streaming_threshold(&self) -> usize {
        self.streaming_threshold
    }

    pub fn max_header_bytes(&self) -> usize {
        self.max_header_bytes
    }

    pub fn max_headers(&self) -> usize {
        self.max_headers
    }

    pub fn max_chunk_size_line(&self) -> usize {
        self.max_chunk_size_line
    }

    pub fn max_body_fragment(&self) -> usize {
        self.max_body_fragment
    }

    pub fn secure(&self) -> bool {
        self.secure
    }
}
