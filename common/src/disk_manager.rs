
//! The paged file store: raw positioned reads and writes against one file.
use super::api::{PageId, PAGE_SIZE};
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt; // Using positioned I/O for better concurrency
use std::sync::Mutex;

/// Manages reading and writing pages to a file on disk.
///
/// This implementation uses positioned I/O (`read_at`, `write_at`) to allow
/// multiple concurrent reads and writes without a global lock on the file.
/// Page 0 is reserved: a freshly created file has it zeroed out and
/// allocation starts from page 1.
#[derive(Debug)]
pub struct DiskManager {
    db_file: File, // No Mutex needed for I/O, only for allocating new pages
    next_page_id: Mutex<PageId>,
    is_new: bool,
}

impl DiskManager {
    /// Opens `db_file_path`, creating it if absent. Reports whether the file
    /// was created by this call via `is_new`.
    pub fn new(db_file_path: &str) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(db_file_path)?;
        let metadata = file.metadata()?;
        let is_new = metadata.len() == 0;

        let next_page_id = if is_new {
            // Reserve page 0 so the first real allocation is page 1.
            file.write_all_at(&[0u8; PAGE_SIZE], 0)?;
            1
        } else {
            (metadata.len() / PAGE_SIZE as u64) as PageId
        };

        Ok(Self {
            db_file: file,
            next_page_id: Mutex::new(next_page_id),
            is_new,
        })
    }

    /// True if this call to `new` created the file (rather than opening an
    /// existing one).
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Reads a page from the database file into the provided buffer using positioned I/O.
    pub fn read_page(&self, page_id: PageId, data: &mut [u8]) -> io::Result<()> {
        let offset = (page_id * PAGE_SIZE) as u64;
        self.db_file.read_exact_at(data, offset)
    }

    /// Writes a page from the buffer into the database file using positioned I/O.
    pub fn write_page(&self, page_id: PageId, data: &[u8]) -> io::Result<()> {
        let offset = (page_id * PAGE_SIZE) as u64;
        self.db_file.write_all_at(data, offset)
    }

    /// Allocates a new page ID, sequentially, never reusing page 0.
    pub fn allocate_page(&self) -> PageId {
        let mut next_page_id = self.next_page_id.lock().unwrap();
        let page_id = *next_page_id;
        *next_page_id += 1;
        page_id
    }

    /// Highest page id that has ever been allocated, plus one. Used by the
    /// buffer pool manager to reject fetches of pages that were never
    /// allocated (`BpmError::PageNotFound`).
    pub fn allocated_upper_bound(&self) -> PageId {
        *self.next_page_id.lock().unwrap()
    }

    /// Forces any buffered OS data for this file to durable storage.
    pub fn sync(&self) -> io::Result<()> {
        self.db_file.sync_all()
    }
}
