use buffer_pool_manager::ClockBufferPoolManager;
use common::api::{BufferPoolManager, PageId, INVALID_PAGE_ID};
use common::attr::AttrType;
use common::disk_manager::DiskManager;
use common::row_id::RowId;
use std::path::Path;
use std::sync::Arc;
use storage_engine::pin::PinGuard;
use storage_engine::{page, Index};
use tempfile::NamedTempFile;

pub const RELATION: &str = "orders";
pub const ATTR_OFFSET: u32 = 0;

/// Installs a test-local `tracing` subscriber on first use so the
/// `trace!`/`debug!`/`info!` instrumentation in `index.rs`/`build.rs` shows
/// up under `cargo test -- --nocapture`. Safe to call from every test:
/// `try_init` is a no-op once a global subscriber is already set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().with_env_filter("trace").try_init();
}

pub fn new_bpm(pool_size: usize, path: &Path) -> Arc<dyn BufferPoolManager> {
    let disk_manager = Arc::new(DiskManager::new(path.to_str().unwrap()).unwrap());
    ClockBufferPoolManager::new(pool_size, disk_manager)
}

/// A fresh index backed by a throwaway file, plus the `NamedTempFile` the
/// caller must keep alive for as long as the index is open.
pub fn open_fresh(pool_size: usize) -> (Index, NamedTempFile) {
    init_tracing();
    let file = NamedTempFile::new().expect("create temp index file");
    let bpm = new_bpm(pool_size, file.path());
    let (index, _name) = Index::open(bpm, RELATION, ATTR_OFFSET, AttrType::Integer).expect("open fresh index");
    (index, file)
}

pub fn reopen(pool_size: usize, file: &NamedTempFile) -> Index {
    init_tracing();
    let bpm = new_bpm(pool_size, file.path());
    let (index, _name) = Index::open(bpm, RELATION, ATTR_OFFSET, AttrType::Integer).expect("reopen index");
    index
}

/// A `RowId` whose `page_no` equals `key`, so a scan's output can be
/// checked against the original keys without a side table.
pub fn rid_for(key: i32) -> RowId {
    RowId { page_no: key as usize, slot_no: 0 }
}

pub fn insert_all(index: &mut Index, keys: &[i32]) {
    for &key in keys {
        index.insert(key, rid_for(key)).expect("insert");
    }
}

pub fn drain(index: &mut Index) -> Vec<i32> {
    let mut keys = Vec::new();
    while let Ok(rid) = index.scan_next() {
        keys.push(rid.page_no as i32);
    }
    keys
}

struct Subtree {
    min: i32,
    max: i32,
    depth: usize,
    keys: Vec<i32>,
}

/// Walks every page reachable from `root`, asserting (in order): leaf keys
/// are strictly sorted, non-leaf separators correctly bound their left and
/// right subtrees, every leaf is at the same depth, and no node exceeds its
/// compile-time capacity. Returns the full key set in left-to-right leaf
/// order for the caller to compare against scan output or the sibling
/// chain.
pub fn validate_tree(bpm: &dyn BufferPoolManager, root: PageId) -> Vec<i32> {
    fn recurse(bpm: &dyn BufferPoolManager, page_id: PageId) -> Subtree {
        let guard = PinGuard::new(bpm.fetch_page(page_id).expect("fetch page during tree walk"));

        if page::is_leaf(&guard) {
            let len = page::leaf::length(&guard);
            assert!(len <= page::leaf::CAPACITY, "leaf {page_id} exceeds LEAF_CAPACITY");
            let keys: Vec<i32> = (0..len).map(|i| page::leaf::key_at(&guard, i)).collect();
            for pair in keys.windows(2) {
                assert!(pair[0] < pair[1], "leaf {page_id} keys out of order: {keys:?}");
            }
            let min = *keys.first().unwrap_or(&i32::MIN);
            let max = *keys.last().unwrap_or(&i32::MAX);
            Subtree { min, max, depth: 0, keys }
        } else {
            let len = page::non_leaf::length(&guard);
            assert!(len <= page::non_leaf::CAPACITY, "non-leaf {page_id} exceeds NODE_CAPACITY");
            let separators: Vec<i32> = (0..len).map(|i| page::non_leaf::key_at(&guard, i)).collect();
            let children: Vec<PageId> = (0..=len).map(|i| page::non_leaf::child_at(&guard, i)).collect();
            drop(guard);

            let child_subtrees: Vec<Subtree> = children.iter().map(|&c| recurse(bpm, c)).collect();

            for i in 0..len {
                assert!(
                    child_subtrees[i].max < separators[i],
                    "non-leaf {page_id}: left child of separator {} holds {} which is not smaller",
                    separators[i],
                    child_subtrees[i].max
                );
                assert!(
                    child_subtrees[i + 1].min >= separators[i],
                    "non-leaf {page_id}: right child of separator {} holds {} which is smaller",
                    separators[i],
                    child_subtrees[i + 1].min
                );
            }

            let depths: Vec<usize> = child_subtrees.iter().map(|s| s.depth).collect();
            assert!(depths.windows(2).all(|w| w[0] == w[1]), "non-leaf {page_id}: children at uneven depth");

            let min = child_subtrees.first().map(|s| s.min).unwrap_or(i32::MIN);
            let max = child_subtrees.last().map(|s| s.max).unwrap_or(i32::MAX);
            let depth = depths.first().map(|d| d + 1).unwrap_or(1);
            let keys = child_subtrees.into_iter().flat_map(|s| s.keys).collect();
            Subtree { min, max, depth, keys }
        }
    }

    recurse(bpm, root).keys
}

/// Descends `children[0]` from `root` until a leaf, the entry point for
/// walking the sibling chain from the left.
fn leftmost_leaf(bpm: &dyn BufferPoolManager, root: PageId) -> PageId {
    let mut current = root;
    loop {
        let guard = PinGuard::new(bpm.fetch_page(current).expect("fetch page while finding leftmost leaf"));
        if page::is_leaf(&guard) {
            return current;
        }
        let child = page::non_leaf::child_at(&guard, 0);
        drop(guard);
        current = child;
    }
}

/// Every key reachable by following `right_sib_page_no` from the leftmost
/// leaf to the sentinel, in order.
pub fn sibling_chain_keys(bpm: &dyn BufferPoolManager, root: PageId) -> Vec<i32> {
    let mut current = leftmost_leaf(bpm, root);
    let mut keys = Vec::new();

    loop {
        let guard = PinGuard::new(bpm.fetch_page(current).expect("fetch page while walking sibling chain"));
        for i in 0..page::leaf::length(&guard) {
            keys.push(page::leaf::key_at(&guard, i));
        }
        let next = page::leaf::right_sib(&guard);
        drop(guard);
        if next == INVALID_PAGE_ID {
            return keys;
        }
        current = next;
    }
}
