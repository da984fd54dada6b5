use bytes::BytesMut;
use tracing::trace;

use crate::buffer::Region;

/// Worst case chunk header: 8 hex digits for a 31-bit length plus CRLF.
pub const CHUNK_HEADER_RESERVE: usize = 10;

/// `0x00`, u16-LE length, u16-LE one's complement of the length.
pub const GZIP_ENVELOPE_LEN: usize = 5;

/// Leading margin reserved by [`FrameAllocator::allocate`].
pub const LEADING_RESERVE: usize = CHUNK_HEADER_RESERVE + GZIP_ENVELOPE_LEN;

/// Trailing margin reserved by [`FrameAllocator::allocate`]: CRLF after the
/// chunk data plus the terminal `0\r\n\r\n`.
pub const TRAILING_RESERVE: usize = 2 + 5;

/// Allocates outbound content regions with room for transfer-coding framing.
///
/// Content produced in a region from [`FrameAllocator::allocate`] can be
/// framed by the chunked and gzip writers without any copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameAllocator;

impl FrameAllocator {
    pub fn new() -> Self {
        Self
    }

    /// Allocates a zeroed, exclusive region whose visible window is exactly
    /// `capacity` bytes, with [`LEADING_RESERVE`] and [`TRAILING_RESERVE`]
    /// bytes hidden around it.
    pub fn allocate(&self, capacity: usize) -> Region {
        trace!(capacity, leading = LEADING_RESERVE, trailing = TRAILING_RESERVE, "allocate framed region");
        let storage = BytesMut::zeroed(LEADING_RESERVE + capacity + TRAILING_RESERVE);
        Region::with_margins(storage, LEADING_RESERVE, capacity)
    }

    /// Allocates a framed region and copies `data` into its window.
    pub fn allocate_from(&self, data: &[u8]) -> Region {
        let mut storage = BytesMut::zeroed(LEADING_RESERVE + data.len() + TRAILING_RESERVE);
        storage[LEADING_RESERVE..LEADING_RESERVE + data.len()].copy_from_slice(data);
        Region::with_margins(storage, LEADING_RESERVE, data.len())
    }

    /// Allocates an exclusive region of exactly `capacity` bytes, no margins.
    ///
    /// Writers use this for the single copy they make when a region can't be
    /// framed in place.
    pub fn allocate_exact(&self, capacity: usize) -> Region {
        Region::exclusive(BytesMut::zeroed(capacity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Ownership;

    #[test]
    fn reserves_framing_margins() {
        let region = FrameAllocator::new().allocate(100);
        assert_eq!(region.len(), 100);
        assert_eq!(region.leading_margin(), 15);
        assert_eq!(region.trailing_margin(), 7);
        assert_eq!(region.ownership(), Ownership::Exclusive);
        assert!(region.can_grow(LEADING_RESERVE, TRAILING_RESERVE));
    }

    #[test]
    fn window_is_writable() {
        let mut region = FrameAllocator::new().allocate(5);
        region.as_mut_slice().unwrap().copy_from_slice(b"hello");
        assert_eq!(region.as_slice(), b"hello");
    }

    #[test]
    fn allocate_from_copies_content() {
        let region = FrameAllocator::new().allocate_from(b"abc");
        assert_eq!(region.as_slice(), b"abc");
        assert_eq!(region.leading_margin(), LEADING_RESERVE);
    }

    #[test]
    fn exact_allocation_has_no_margin() {
        let region = FrameAllocator::new().allocate_exact(8);
        assert_eq!(region.len(), 8);
        assert_eq!(region.leading_margin(), 0);
        assert_eq!(region.trailing_margin(), 0);
    }
}
