//! Clock (second-chance) buffer pool manager.

use common::api::{BpmError, BufferPoolManager, PageGuard, PageId, INVALID_PAGE_ID, PAGE_SIZE};
use common::disk_manager::DiskManager;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, Weak};

type FrameId = usize;

#[derive(Debug)]
struct Frame {
    page_id: PageId,
    pin_count: usize,
    is_dirty: bool,
    is_referenced: bool,
}

struct ClockState {
    frames: Vec<Frame>,
    frame_data: Vec<Box<[u8; PAGE_SIZE]>>,
    page_table: HashMap<PageId, FrameId>,
    free_list: Vec<FrameId>,
    clock_hand: usize,
    pool_size: usize,
}

impl ClockState {
    fn new(pool_size: usize) -> Self {
        let mut frames = Vec::with_capacity(pool_size);
        let mut frame_data = Vec::with_capacity(pool_size);
        let mut free_list = Vec::with_capacity(pool_size);

        for i in 0..pool_size {
            frames.push(Frame { page_id: INVALID_PAGE_ID, pin_count: 0, is_dirty: false, is_referenced: false });
            frame_data.push(Box::new([0u8; PAGE_SIZE]));
            free_list.push(i);
        }

        Self { frames, frame_data, page_table: HashMap::new(), free_list, clock_hand: 0, pool_size }
    }

    fn find_victim_frame(&mut self) -> Result<FrameId, BpmError> {
        if let Some(frame_id) = self.free_list.pop() {
            return Ok(frame_id);
        }

        for _ in 0..(2 * self.pool_size) {
            let frame_id = self.clock_hand;
            self.clock_hand = (self.clock_hand + 1) % self.pool_size;

            if self.frames[frame_id].pin_count != 0 {
                continue;
            }
            if self.frames[frame_id].is_referenced {
                self.frames[frame_id].is_referenced = false;
            } else {
                return Ok(frame_id);
            }
        }

        Err(BpmError::NoFreeFrames)
    }

    fn evict_if_needed(&mut self, disk_manager: &DiskManager, frame_id: FrameId) -> Result<(), BpmError> {
        if self.frames[frame_id].page_id != INVALID_PAGE_ID {
            if self.frames[frame_id].is_dirty {
                let old_page_id = self.frames[frame_id].page_id;
                disk_manager.write_page(old_page_id, &self.frame_data[frame_id][..]).map_err(BpmError::IoError)?;
            }
            self.page_table.remove(&self.frames[frame_id].page_id);
        }
        Ok(())
    }
}

/// Clock-replacement buffer pool manager over a fixed-size pool of frames.
///
/// Always constructed behind an `Arc` (see `new`): the guards handed out by
/// `fetch_page`/`new_page` keep themselves alive with a clone of that `Arc`
/// rather than a borrow, so a caller can hold one across many unrelated
/// calls into the manager — exactly what the index's range-scan cursor
/// needs to do while a leaf stays pinned across repeated `scan_next` calls.
pub struct ClockBufferPoolManager {
    self_handle: Weak<ClockBufferPoolManager>,
    disk_manager: Arc<DiskManager>,
    state: Mutex<ClockState>,
}

impl ClockBufferPoolManager {
    pub fn new(pool_size: usize, disk_manager: Arc<DiskManager>) -> Arc<Self> {
        Arc::new_cyclic(|self_handle| Self {
            self_handle: self_handle.clone(),
            disk_manager,
            state: Mutex::new(ClockState::new(pool_size)),
        })
    }

    fn handle(&self) -> Arc<ClockBufferPoolManager> {
        self.self_handle.upgrade().expect("ClockBufferPoolManager dropped while a guard outlived it")
    }

    fn unpin_with_data(&self, page_id: PageId, is_dirty: bool, data: Box<[u8; PAGE_SIZE]>) {
        let mut state = self.state.lock().unwrap();
        if let Some(&frame_id) = state.page_table.get(&page_id) {
            if state.frames[frame_id].pin_count > 0 {
                state.frames[frame_id].pin_count -= 1;
            }
            if is_dirty {
                state.frames[frame_id].is_dirty = true;
                state.frame_data[frame_id] = data;
            }
        }
    }
}

impl BufferPoolManager for ClockBufferPoolManager {
    fn fetch_page(&self, page_id: PageId) -> Result<Box<dyn PageGuard>, BpmError> {
        if page_id == INVALID_PAGE_ID || page_id >= self.disk_manager.allocated_upper_bound() {
            return Err(BpmError::PageNotFound(page_id));
        }

        let mut state = self.state.lock().unwrap();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            state.frames[frame_id].pin_count += 1;
            state.frames[frame_id].is_referenced = true;
            let data = state.frame_data[frame_id].clone();
            drop(state);
            return Ok(Box::new(ClockPageGuard { bpm: self.handle(), page_id, data, dirty: false }));
        }

        let frame_id = state.find_victim_frame()?;
        state.evict_if_needed(&self.disk_manager, frame_id)?;

        self.disk_manager.read_page(page_id, &mut state.frame_data[frame_id][..]).map_err(BpmError::IoError)?;
        state.page_table.insert(page_id, frame_id);
        state.frames[frame_id] = Frame { page_id, pin_count: 1, is_dirty: false, is_referenced: true };

        let data = state.frame_data[frame_id].clone();
        drop(state);
        Ok(Box::new(ClockPageGuard { bpm: self.handle(), page_id, data, dirty: false }))
    }

    fn new_page(&self) -> Result<Box<dyn PageGuard>, BpmError> {
        let mut state = self.state.lock().unwrap();

        let frame_id = state.find_victim_frame()?;
        state.evict_if_needed(&self.disk_manager, frame_id)?;

        let new_page_id = self.disk_manager.allocate_page();
        state.page_table.insert(new_page_id, frame_id);
        state.frames[frame_id] = Frame { page_id: new_page_id, pin_count: 1, is_dirty: true, is_referenced: true };
        state.frame_data[frame_id] = Box::new([0u8; PAGE_SIZE]);

        let data = state.frame_data[frame_id].clone();
        drop(state);
        Ok(Box::new(ClockPageGuard { bpm: self.handle(), page_id: new_page_id, data, dirty: true }))
    }

    fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> Result<(), BpmError> {
        // Pages pinned via fetch_page/new_page are unpinned by their guard's
        // Drop impl, which carries the mutated bytes. This entry point
        // exists for the trait's callers that hold a bare page id.
        let mut state = self.state.lock().unwrap();
        if let Some(&frame_id) = state.page_table.get(&page_id) {
            if state.frames[frame_id].pin_count > 0 {
                state.frames[frame_id].pin_count -= 1;
            }
            if is_dirty {
                state.frames[frame_id].is_dirty = true;
            }
            Ok(())
        } else {
            Err(BpmError::PageNotFound(page_id))
        }
    }

    fn flush_page(&self, page_id: PageId) -> Result<(), BpmError> {
        let mut state = self.state.lock().unwrap();
        if let Some(&frame_id) = state.page_table.get(&page_id) {
            if state.frames[frame_id].is_dirty {
                self.disk_manager.write_page(page_id, &state.frame_data[frame_id][..]).map_err(BpmError::IoError)?;
                state.frames[frame_id].is_dirty = false;
            }
        }
        Ok(())
    }

    fn flush_all_pages(&self) -> Result<(), BpmError> {
        let page_ids: Vec<PageId> = {
            let state = self.state.lock().unwrap();
            state.page_table.keys().copied().collect()
        };
        for page_id in page_ids {
            self.flush_page(page_id)?;
        }
        self.disk_manager.sync().map_err(BpmError::IoError)?;
        Ok(())
    }

    fn is_new_file(&self) -> bool {
        self.disk_manager.is_new()
    }

    fn pinned_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.frames.iter().map(|f| f.pin_count).sum()
    }
}

/// A pinned page handed out by `ClockBufferPoolManager`. Holds a private
/// copy of the frame's bytes and its own handle back to the manager, so it
/// can outlive the call that created it; `Drop` writes that copy back into
/// the frame table (if mutated) and decrements the frame's pin count.
pub struct ClockPageGuard {
    bpm: Arc<ClockBufferPoolManager>,
    page_id: PageId,
    data: Box<[u8; PAGE_SIZE]>,
    dirty: bool,
}

impl PageGuard for ClockPageGuard {
    fn page_id(&self) -> PageId {
        self.page_id
    }
}

impl Deref for ClockPageGuard {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        &self.data[..]
    }
}

impl DerefMut for ClockPageGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.dirty = true;
        &mut self.data[..]
    }
}

impl Drop for ClockPageGuard {
    fn drop(&mut self) {
        self.bpm.unpin_with_data(self.page_id, self.dirty, self.data.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn new_bpm(pool_size: usize) -> (Arc<ClockBufferPoolManager>, NamedTempFile) {
        let file = NamedTempFile::new().unwrap();
        let disk_manager = Arc::new(DiskManager::new(file.path().to_str().unwrap()).unwrap());
        (ClockBufferPoolManager::new(pool_size, disk_manager), file)
    }

    #[test]
    fn new_page_starts_at_one_because_page_zero_is_reserved() {
        let (bpm, _file) = new_bpm(4);
        let page = bpm.new_page().unwrap();
        assert_eq!(page.page_id(), 1);
    }

    #[test]
    fn fetch_after_unpin_sees_written_bytes() {
        let (bpm, _file) = new_bpm(4);
        let page_id = {
            let mut page = bpm.new_page().unwrap();
            page[0] = 42;
            page.page_id()
        };

        let fetched = bpm.fetch_page(page_id).unwrap();
        assert_eq!(fetched[0], 42);
    }

    #[test]
    fn pinned_page_blocks_eviction_when_pool_is_full() {
        let (bpm, _file) = new_bpm(2);
        let _pinned = bpm.new_page().unwrap();
        let _second = bpm.new_page().unwrap();
        assert!(matches!(bpm.new_page(), Err(BpmError::NoFreeFrames)));
    }

    #[test]
    fn fetching_an_unallocated_page_fails() {
        let (bpm, _file) = new_bpm(4);
        assert!(matches!(bpm.fetch_page(999), Err(BpmError::PageNotFound(999))));
    }

    #[test]
    fn pin_count_returns_to_zero_after_drop() {
        let (bpm, _file) = new_bpm(4);
        {
            let _page = bpm.new_page().unwrap();
            assert_eq!(bpm.pinned_count(), 1);
        }
        assert_eq!(bpm.pinned_count(), 0);
    }
}
