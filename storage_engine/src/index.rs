//! The index handle: open-or-create, insert with split cascade, range scan
//! delegation, and lifecycle (flush on close).

use crate::error::IndexError;
use crate::metadata::IndexMetadata;
use crate::page;
use crate::pin::PinGuard;
use crate::scan::{Operator, ScanState};
use crate::traverse::find_leaf;
use common::api::BufferPoolManager;
use common::api::PageId;
use common::attr::AttrType;
use common::row_id::RowId;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Fixed by the index file layout: page 0 is reserved by the paged file
/// store, so the metadata record always lives at page 1.
pub const METADATA_PAGE_ID: PageId = 1;

/// An open secondary index over one integer attribute of a relation.
///
/// Every public operation runs to completion before another begins — there
/// is no concurrent or re-entrant access to a single `Index`, matching the
/// single-threaded, cooperative scheduling model this engine assumes.
pub struct Index {
    bpm: Arc<dyn BufferPoolManager>,
    metadata: IndexMetadata,
    scan: ScanState,
    closed: bool,
}

impl Index {
    /// Opens an existing index file, or creates a new one (an empty leaf
    /// root) if the buffer manager reports a fresh file. Returns the handle
    /// plus its external name, `"{relation_name}.{attr_byte_offset}"`.
    pub fn open(
        bpm: Arc<dyn BufferPoolManager>,
        relation_name: &str,
        attr_byte_offset: u32,
        attr_type: AttrType,
    ) -> Result<(Self, String), IndexError> {
        let metadata = if bpm.is_new_file() {
            Self::create(&*bpm, relation_name, attr_byte_offset, attr_type)?
        } else {
            Self::reopen(&*bpm, relation_name, attr_byte_offset, attr_type)?
        };

        let index_name = metadata.index_name();
        Ok((Self { bpm, metadata, scan: ScanState::new(), closed: false }, index_name))
    }

    fn create(
        bpm: &dyn BufferPoolManager,
        relation_name: &str,
        attr_byte_offset: u32,
        attr_type: AttrType,
    ) -> Result<IndexMetadata, IndexError> {
        // Page 1 (metadata) and page 2 (initial root) are allocated in
        // order, right after the paged file store's own page-0 reservation;
        // the metadata page must be allocated (not merely fetched) since
        // nothing has claimed it yet in a brand new file.
        let meta_guard = bpm.new_page()?;
        debug_assert_eq!(meta_guard.page_id(), METADATA_PAGE_ID, "metadata must be the first page allocated");
        drop(meta_guard);

        let root_guard = bpm.new_page()?;
        let root_page_no = root_guard.page_id();
        let mut root_guard = PinGuard::new(root_guard);
        page::leaf::init(&mut root_guard);
        drop(root_guard);

        let metadata =
            IndexMetadata { relation_name: relation_name.to_string(), attr_byte_offset, attr_type, root_page_no };
        Self::write_metadata(bpm, &metadata)?;
        info!(relation = relation_name, offset = attr_byte_offset, "created new index");
        Ok(metadata)
    }

    fn reopen(
        bpm: &dyn BufferPoolManager,
        relation_name: &str,
        attr_byte_offset: u32,
        attr_type: AttrType,
    ) -> Result<IndexMetadata, IndexError> {
        let meta_guard = PinGuard::new(bpm.fetch_page(METADATA_PAGE_ID)?);
        let stored = IndexMetadata::read(&meta_guard);
        drop(meta_guard);

        if stored.relation_name != relation_name
            || stored.attr_byte_offset != attr_byte_offset
            || stored.attr_type != attr_type
        {
            return Err(IndexError::BadIndexInfo);
        }

        info!(relation = relation_name, offset = attr_byte_offset, "reopened existing index");
        Ok(stored)
    }

    fn write_metadata(bpm: &dyn BufferPoolManager, metadata: &IndexMetadata) -> Result<(), IndexError> {
        let mut guard = PinGuard::new(bpm.fetch_page(METADATA_PAGE_ID)?);
        metadata.write(&mut guard);
        guard.mark_dirty();
        Ok(())
    }

    pub fn root_page_no(&self) -> PageId {
        self.metadata.root_page_no
    }

    pub fn index_name(&self) -> String {
        self.metadata.index_name()
    }

    /// True if the current root page is itself a leaf, i.e. the tree has
    /// never split. Exists for structural assertions in tests.
    pub fn is_root_leaf(&self) -> Result<bool, IndexError> {
        let guard = PinGuard::new(self.bpm.fetch_page(self.metadata.root_page_no)?);
        Ok(page::is_leaf(&guard))
    }

    /// Read-only access to the underlying buffer pool manager, for
    /// diagnostics and tests that want to walk the tree's page structure
    /// directly rather than through `insert`/scan.
    pub fn buffer_pool(&self) -> &dyn BufferPoolManager {
        &*self.bpm
    }

    /// Inserts `(key, rid)`. On return the tree contains the entry and
    /// every B+-tree invariant holds — sorted leaves, separated non-leaf
    /// subtrees, uniform leaf depth, an intact sibling chain.
    ///
    /// A full node is split before the new entry is written into whichever
    /// half it belongs on, rather than written in and then split; the two
    /// orders are equivalent and this one never needs a node to transiently
    /// hold more than its on-disk capacity.
    pub fn insert(&mut self, key: i32, rid: RowId) -> Result<(), IndexError> {
        trace!(key, "descending to leaf");
        let (leaf_id, path) = find_leaf(&*self.bpm, self.metadata.root_page_no, key)?;
        let mut leaf_guard = PinGuard::new(self.bpm.fetch_page(leaf_id)?);

        if page::leaf::length(&leaf_guard) < page::leaf::CAPACITY {
            page::leaf::insert(&mut leaf_guard, key, rid);
            debug!(key, "inserted without split");
            return Ok(());
        }

        let right_guard = self.bpm.new_page()?;
        let right_id = right_guard.page_id();
        let mut right_guard = PinGuard::new(right_guard);
        let mut promoted = page::leaf::split(&mut leaf_guard, &mut right_guard);

        page::leaf::set_right_sib(&mut right_guard, page::leaf::right_sib(&leaf_guard));
        page::leaf::set_right_sib(&mut leaf_guard, right_id);

        if key < promoted {
            page::leaf::insert(&mut leaf_guard, key, rid);
        } else {
            page::leaf::insert(&mut right_guard, key, rid);
            promoted = page::leaf::key_at(&right_guard, 0);
        }
        drop(leaf_guard);
        drop(right_guard);

        let mut right_child = right_id;

        for &ancestor_id in path.iter().rev() {
            let mut ancestor_guard = PinGuard::new(self.bpm.fetch_page(ancestor_id)?);

            if page::non_leaf::length(&ancestor_guard) < page::non_leaf::CAPACITY {
                page::non_leaf::insert(&mut ancestor_guard, promoted, right_child);
                debug!(key, ancestor = ancestor_id, "split cascade absorbed by ancestor");
                return Ok(());
            }

            let sibling_guard = self.bpm.new_page()?;
            let sibling_id = sibling_guard.page_id();
            let mut sibling_guard = PinGuard::new(sibling_guard);
            let lifted = page::non_leaf::split(&mut ancestor_guard, &mut sibling_guard);

            if promoted < lifted {
                page::non_leaf::insert(&mut ancestor_guard, promoted, right_child);
            } else {
                page::non_leaf::insert(&mut sibling_guard, promoted, right_child);
            }

            promoted = lifted;
            right_child = sibling_id;
            drop(ancestor_guard);
            drop(sibling_guard);
        }

        // Ascent exhausted the path with a pending promotion: grow a new
        // root over the old one. Covers both an ordinary non-leaf-root
        // overflow and the very first leaf-root split, where `path` is
        // empty to begin with.
        let new_root_guard = self.bpm.new_page()?;
        let new_root_id = new_root_guard.page_id();
        let mut new_root_guard = PinGuard::new(new_root_guard);
        page::non_leaf::init_root(&mut new_root_guard, promoted, self.metadata.root_page_no, right_child);
        drop(new_root_guard);

        self.metadata.root_page_no = new_root_id;
        Self::write_metadata(&*self.bpm, &self.metadata)?;
        debug!(key, new_root = new_root_id, "root promoted");
        Ok(())
    }

    pub fn start_scan(&mut self, low: i32, low_op: Operator, high: i32, high_op: Operator) -> Result<(), IndexError> {
        self.scan.start(&*self.bpm, self.metadata.root_page_no, low, low_op, high, high_op)
    }

    pub fn scan_next(&mut self) -> Result<RowId, IndexError> {
        self.scan.next(&*self.bpm)
    }

    pub fn end_scan(&mut self) -> Result<(), IndexError> {
        self.scan.end()
    }

    /// Flushes the file and marks the index closed. Ends an active scan
    /// first, per the lifecycle contract. Calling any operation after
    /// `close` is a programming error; none are exposed because `close`
    /// consumes the handle.
    pub fn close(mut self) -> Result<(), IndexError> {
        self.close_inner()
    }

    fn close_inner(&mut self) -> Result<(), IndexError> {
        if self.closed {
            return Ok(());
        }
        if self.scan.is_active() {
            self.scan.end()?;
        }
        self.bpm.flush_all_pages()?;
        self.closed = true;
        info!(index = %self.metadata.index_name(), "closed index");
        Ok(())
    }
}

impl Drop for Index {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.close_inner();
        }
    }
}
