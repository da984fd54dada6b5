use tracing::warn;

use crate::ensure;
use crate::protocol::SendError;

/// Keeps an identity body within its declared `Content-Length`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LengthEncoder {
    remaining: u64,
}

impl LengthEncoder {
    pub(crate) fn new(length: u64) -> Self {
        Self { remaining: length }
    }

    /// Accounts for a fragment of `len` bytes, `complete` when it ends the body.
    ///
    /// Nothing is recorded when the fragment is rejected.
    pub(crate) fn check(&mut self, len: usize, complete: bool) -> Result<(), SendError> {
        let len = len as u64;
        if len > self.remaining {
            warn!(len, remaining = self.remaining, "body overruns its content-length");
            return Err(SendError::invalid_body(format!("{len} bytes exceed the remaining content-length {}", self.remaining)));
        }
        ensure!(
            !complete || len == self.remaining,
            SendError::invalid_body(format!("body ends {} bytes short of its content-length", self.remaining - len))
        );
        self.remaining -= len;
        Ok(())
    }
}
