
//! Defines the common API for all buffer pool manager implementations.
//!
//! The index engine in `storage_engine` is written against this trait alone;
//! it never opens a file descriptor or computes a disk offset itself. Any
//! type implementing `BufferPoolManager` may cache and evict pages however
//! it likes, as long as the pin/unpin contract documented below holds.
use std::ops::{Deref, DerefMut};


/// A unique identifier for a page in the database.
pub type PageId = usize;

/// A constant to represent an invalid page ID.
///
/// Page 0 is reserved by the paged file store and is never handed out by
/// `new_page`, so it doubles as the "end of sibling chain" sentinel.
pub const INVALID_PAGE_ID: PageId = 0;

/// The size of a single page in bytes.
pub const PAGE_SIZE: usize = 4096;

/// A specialized error type for buffer pool manager operations.
#[derive(Debug)]
pub enum BpmError {
    /// Returned when the pool is full and no pages can be evicted.
    NoFreeFrames,
    /// The requested page id was never allocated in this file.
    PageNotFound(PageId),
    /// Represents an I/O error from the disk manager.
    IoError(std::io::Error),
}

impl std::fmt::Display for BpmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BpmError::NoFreeFrames => write!(f, "buffer pool has no free frames to evict"),
            BpmError::PageNotFound(id) => write!(f, "page {id} not found"),
            BpmError::IoError(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for BpmError {}

/// A smart pointer representing a pinned page.
///
/// This guard provides mutable access to the page's byte data. When the guard
/// is dropped, it automatically informs the buffer pool manager to unpin the page,
/// allowing it to be considered for eviction.
pub trait PageGuard: Deref<Target = [u8]> + DerefMut {
    /// Returns the ID of the page being held.
    fn page_id(&self) -> PageId;
}

/// The main trait defining the behavior of a Buffer Pool Manager.
///
/// This trait is designed to be object-safe, so it can be used with
/// trait objects (`Arc<dyn BufferPoolManager>`).
pub trait BufferPoolManager: Send + Sync {
    /// Fetches a page from the buffer pool, reading from disk if necessary.
    ///
    /// This method pins the page and returns a `PageGuard`. The page remains
    /// pinned until the `PageGuard` is dropped. The guard owns everything it
    /// needs to unpin itself, so it is not tied to the lifetime of this
    /// borrow — callers may hold a guard across many other calls into the
    /// buffer pool manager (the index's range-scan cursor does exactly this).
    ///
    /// # Arguments
    /// * `page_id` - The ID of the page to fetch.
    fn fetch_page(&self, page_id: PageId) -> Result<Box<dyn PageGuard>, BpmError>;

    /// Creates a new page in the buffer pool.
    ///
    /// Finds an available frame, allocates a new page ID, and returns the
    /// pinned page as a `PageGuard`.
    fn new_page(&self) -> Result<Box<dyn PageGuard>, BpmError>;

    /// Unpins a page from the buffer pool.
    ///
    /// This is typically called by the `PageGuard`'s drop implementation,
    /// never directly by index code.
    ///
    /// # Arguments
    /// * `page_id` - The ID of the page to unpin.
    /// * `is_dirty` - Whether the page was mutated while pinned.
    fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> Result<(), BpmError>;

    /// Flushes a specific page to disk if it is dirty.
    ///
    /// # Arguments
    /// * `page_id` - The ID of the page to flush.
    fn flush_page(&self, page_id: PageId) -> Result<(), BpmError>;

    /// Flushes all dirty pages in the buffer pool to disk.
    fn flush_all_pages(&self) -> Result<(), BpmError>;

    /// True when the backing file held no pages before this manager opened
    /// it, i.e. a fresh paged file store rather than a reopened one.
    fn is_new_file(&self) -> bool;

    /// Number of pages currently pinned across all frames. Index code does
    /// not need this; it exists so tests can assert pin/unpin balance.
    fn pinned_count(&self) -> usize;
}
