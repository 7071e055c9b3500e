//! Root-to-leaf descent, recording the non-leaf pages visited along the way.

use crate::page;
use crate::pin::PinGuard;
use common::api::{BpmError, BufferPoolManager, PageId};

/// Descends from `root_page_id` to the leaf that would contain `key`.
///
/// Returns the leaf's page id and the ordered list of non-leaf page ids
/// visited from root down to the leaf's parent (empty when the root is
/// itself a leaf). This path vector, not a parent pointer stored in the
/// node, is what a split cascade walks back up. The leaf is left unpinned
/// on return — callers re-pin it themselves once they know whether they
/// intend to read or mutate it.
///
/// At most one non-leaf page is pinned at a time: the current node is
/// unpinned before its child is fetched.
pub fn find_leaf(
    bpm: &dyn BufferPoolManager,
    root_page_id: PageId,
    key: i32,
) -> Result<(PageId, Vec<PageId>), BpmError> {
    let mut path = Vec::new();
    let mut current = root_page_id;

    loop {
        let guard = PinGuard::new(bpm.fetch_page(current)?);

        if page::is_leaf(&guard) {
            let leaf_id = guard.page_id();
            drop(guard);
            return Ok((leaf_id, path));
        }

        let child_index = page::non_leaf::child_index_for(&guard, key);
        let child = page::non_leaf::child_at(&guard, child_index);
        path.push(guard.page_id());
        current = child;
        // `guard` drops here, unpinning this non-leaf before `child` is pinned.
    }
}
