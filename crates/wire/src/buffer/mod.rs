//! Buffer regions and the frame-reserving allocator.
//!
//! Outbound content lives in [`Region`]s. The [`FrameAllocator`] hands out
//! regions with hidden margins sized for the worst-case chunk header, gzip
//! envelope and chunk terminator, so the content writers in
//! [`codec`](crate::codec) can frame a fragment without copying it.

mod allocator;
mod region;

pub use allocator::{CHUNK_HEADER_RESERVE, FrameAllocator, GZIP_ENVELOPE_LEN, LEADING_RESERVE, TRAILING_RESERVE};
pub use region::{Ownership, Region};
