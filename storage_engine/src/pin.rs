//! Scoped pin guard: wraps a `common::api::PageGuard` so every acquisition
//! is released automatically, on every exit path, by the underlying
//! guard's own `Drop` impl.

use common::api::{PageGuard, PageId};
use std::ops::{Deref, DerefMut};

/// A pinned page. Dereferences to the page's raw bytes; dropping it unpins
/// the page via the buffer manager it was fetched from. The pin is flagged
/// dirty automatically the moment the page is borrowed mutably.
pub struct PinGuard {
    inner: Box<dyn PageGuard>,
}

impl PinGuard {
    pub fn new(inner: Box<dyn PageGuard>) -> Self {
        Self { inner }
    }

    pub fn page_id(&self) -> PageId {
        self.inner.page_id()
    }

    /// Forces the pending unpin to be flagged dirty even when the caller
    /// does not otherwise need mutable access to the bytes.
    pub fn mark_dirty(&mut self) {
        let _ = self.inner.deref_mut();
    }
}

impl Deref for PinGuard {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        &self.inner
    }
}

impl DerefMut for PinGuard {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.inner
    }
}
