//! A byte window over owned or shared storage.
//!
//! A [`Region`] exposes a window `[start, end)` of its storage. Bytes before
//! the window (the leading margin) and after it (the trailing margin) are
//! invisible to readers but can be claimed by a content writer through
//! [`Region::grow_front`] / [`Region::grow_back`], which lets chunk headers
//! and envelopes be written in place.
//!
//! Only [`Ownership::Exclusive`] regions can be grown. A shared region may be
//! read concurrently by several in-flight sends, so its storage is never
//! written after it has been shared.

use std::fmt;
use std::mem;

use bytes::{Buf, Bytes, BytesMut};

/// Whether a [`Region`] may be written in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The region is the only handle to its storage
    Exclusive,
    /// The storage may be read through other handles, it is immutable
    Shared,
}

enum Storage {
    Exclusive(BytesMut),
    Shared(Bytes),
}

pub struct Region {
    storage: Storage,
    start: usize,
    end: usize,
}

impl Region {
    /// Wraps an owned buffer, the whole buffer is visible and no margin is reserved.
    pub fn exclusive(buf: BytesMut) -> Self {
        let end = buf.len();
        Self { storage: Storage::Exclusive(buf), start: 0, end }
    }

    /// Wraps a shared buffer, the whole buffer is visible and no margin is reserved.
    pub fn shared(buf: Bytes) -> Self {
        let end = buf.len();
        Self { storage: Storage::Shared(buf), start: 0, end }
    }

    pub fn empty() -> Self {
        Self::shared(Bytes::new())
    }

    pub fn from_static(bytes: &'static [u8]) -> Self {
        Self::shared(Bytes::from_static(bytes))
    }

    pub fn copy_from_slice(data: &[u8]) -> Self {
        Self::exclusive(BytesMut::from(data))
    }

    /// Wraps `storage` with `leading` bytes hidden before a `len` bytes window.
    pub(crate) fn with_margins(storage: BytesMut, leading: usize, len: usize) -> Self {
        debug_assert!(leading + len <= storage.len(), "window must fit in storage");
        Self { storage: Storage::Exclusive(storage), start: leading, end: leading + len }
    }

    pub fn ownership(&self) -> Ownership {
        match self.storage {
            Storage::Exclusive(_) => Ownership::Exclusive,
            Storage::Shared(_) => Ownership::Shared,
        }
    }

    #[inline]
    pub fn is_shared(&self) -> bool {
        self.ownership() == Ownership::Shared
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Unused bytes before the window.
    #[inline]
    pub fn leading_margin(&self) -> usize {
        self.start
    }

    /// Unused bytes after the window.
    #[inline]
    pub fn trailing_margin(&self) -> usize {
        self.storage_len() - self.end
    }

    fn storage_len(&self) -> usize {
        match &self.storage {
            Storage::Exclusive(buf) => buf.len(),
            Storage::Shared(buf) => buf.len(),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        match &self.storage {
            Storage::Exclusive(buf) => &buf[self.start..self.end],
            Storage::Shared(buf) => &buf[self.start..self.end],
        }
    }

    /// Mutable access to the window, `None` for shared regions.
    pub fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        match &mut self.storage {
            Storage::Exclusive(buf) => Some(&mut buf[self.start..self.end]),
            Storage::Shared(_) => None,
        }
    }

    /// Whether `front` leading and `back` trailing bytes can be claimed in place.
    pub fn can_grow(&self, front: usize, back: usize) -> bool {
        !self.is_shared() && self.leading_margin() >= front && self.trailing_margin() >= back
    }

    /// Extends the window `n` bytes to the front and returns the claimed bytes.
    ///
    /// Returns `None` without touching the region when it is shared or the
    /// leading margin is too small.
    pub fn grow_front(&mut self, n: usize) -> Option<&mut [u8]> {
        match &mut self.storage {
            Storage::Exclusive(buf) if self.start >= n => {
                self.start -= n;
                Some(&mut buf[self.start..self.start + n])
            }
            _ => None,
        }
    }

    /// Extends the window `n` bytes to the back and returns the claimed bytes.
    pub fn grow_back(&mut self, n: usize) -> Option<&mut [u8]> {
        match &mut self.storage {
            Storage::Exclusive(buf) if buf.len() - self.end >= n => {
                let old_end = self.end;
                self.end += n;
                Some(&mut buf[old_end..self.end])
            }
            _ => None,
        }
    }

    /// Returns an independent cursor over the same storage, without copying.
    ///
    /// An exclusive region is frozen into shared storage first, so after this
    /// call both `self` and the returned region are [`Ownership::Shared`].
    pub fn duplicate(&mut self) -> Region {
        let bytes = self.share_storage();
        Self { storage: Storage::Shared(bytes), start: self.start, end: self.end }
    }

    /// Converts the region into a shared one, keeping the window and the margins.
    pub fn into_shared(mut self) -> Region {
        self.share_storage();
        self
    }

    fn share_storage(&mut self) -> Bytes {
        let storage = mem::replace(&mut self.storage, Storage::Shared(Bytes::new()));
        let bytes = match storage {
            Storage::Exclusive(buf) => buf.freeze(),
            Storage::Shared(buf) => buf,
        };
        self.storage = Storage::Shared(bytes.clone());
        bytes
    }

    /// The visible window as `Bytes`, zero-copy.
    pub fn freeze(self) -> Bytes {
        match self.storage {
            Storage::Exclusive(buf) => buf.freeze().slice(self.start..self.end),
            Storage::Shared(buf) => buf.slice(self.start..self.end),
        }
    }
}

impl Buf for Region {
    #[inline]
    fn remaining(&self) -> usize {
        self.len()
    }

    #[inline]
    fn chunk(&self) -> &[u8] {
        self.as_slice()
    }

    fn advance(&mut self, cnt: usize) {
        assert!(cnt <= self.len(), "cannot advance past the end of the region: {cnt} > {}", self.len());
        self.start += cnt;
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::empty()
    }
}

impl Clone for Region {
    /// Shared regions clone the handle, exclusive regions copy their storage.
    fn clone(&self) -> Self {
        let storage = match &self.storage {
            Storage::Exclusive(buf) => Storage::Exclusive(buf.clone()),
            Storage::Shared(buf) => Storage::Shared(buf.clone()),
        };
        Self { storage, start: self.start, end: self.end }
    }
}

impl PartialEq for Region {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for Region {}

impl AsRef<[u8]> for Region {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("ownership", &self.ownership())
            .field("bytes", &Bytes::copy_from_slice(self.as_slice()))
            .field("leading_margin", &self.leading_margin())
            .field("trailing_margin", &self.trailing_margin())
            .finish()
    }
}

impl From<Bytes> for Region {
    fn from(bytes: Bytes) -> Self {
        Self::shared(bytes)
    }
}

impl From<BytesMut> for Region {
    fn from(buf: BytesMut) -> Self {
        Self::exclusive(buf)
    }
}

impl From<&'static str> for Region {
    fn from(str: &'static str) -> Self {
        Self::from_static(str.as_bytes())
    }
}

impl From<Vec<u8>> for Region {
    fn from(vec: Vec<u8>) -> Self {
        Self::exclusive(BytesMut::from(&vec[..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reserved(leading: usize, content: &[u8], trailing: usize) -> Region {
        let mut storage = BytesMut::zeroed(leading + content.len() + trailing);
        storage[leading..leading + content.len()].copy_from_slice(content);
        Region::with_margins(storage, leading, content.len())
    }

    #[test]
    fn margins_are_hidden() {
        let region = reserved(3, b"abc", 2);
        assert_eq!(region.as_slice(), b"abc");
        assert_eq!(region.len(), 3);
        assert_eq!(region.leading_margin(), 3);
        assert_eq!(region.trailing_margin(), 2);
        assert_eq!(region.ownership(), Ownership::Exclusive);
    }

    #[test]
    fn grow_into_margins() {
        let mut region = reserved(3, b"abc", 2);
        region.grow_front(2).unwrap().copy_from_slice(b"<<");
        region.grow_back(2).unwrap().copy_from_slice(b">>");
        assert_eq!(region.as_slice(), b"<<abc>>");
        assert_eq!(region.leading_margin(), 1);
        assert_eq!(region.trailing_margin(), 0);

        assert!(region.grow_front(2).is_none());
        assert!(region.grow_back(1).is_none());
        assert_eq!(region.as_slice(), b"<<abc>>");
    }

    #[test]
    fn shared_regions_never_grow() {
        let mut region = reserved(3, b"abc", 2).into_shared();
        assert!(region.is_shared());
        assert_eq!(region.leading_margin(), 3);
        assert!(!region.can_grow(1, 0));
        assert!(region.grow_front(1).is_none());
        assert!(region.as_mut_slice().is_none());
    }

    #[test]
    fn duplicate_shares_storage_with_independent_cursor() {
        let mut region = reserved(2, b"hello", 2);
        let mut copy = region.duplicate();

        assert!(region.is_shared());
        assert!(copy.is_shared());
        assert_eq!(region.chunk().as_ptr(), copy.chunk().as_ptr());

        copy.advance(2);
        assert_eq!(copy.as_slice(), b"llo");
        assert_eq!(region.as_slice(), b"hello");
    }

    #[test]
    fn buf_cursor_consumes_window() {
        let mut region = Region::from("hello world");
        assert_eq!(region.remaining(), 11);
        region.advance(6);
        assert_eq!(region.chunk(), b"world");
        assert_eq!(region.freeze(), Bytes::from_static(b"world"));
    }

    #[test]
    fn freeze_keeps_only_the_window() {
        let region = reserved(4, b"data", 4);
        assert_eq!(&region.freeze()[..], b"data");
    }
}
