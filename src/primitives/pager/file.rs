use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use super::{check_page_id, check_page_len, validate_page_size, PageStore};
use crate::types::{PageId, Result, SombraError};

struct FileState {
    file: File,
    next_id: u32,
    dirty: BTreeSet<PageId>,
}

/// Page store backed by a single file; page `n` lives at byte `n * page_size`.
///
/// Page 0 is left zeroed so that id 0 can keep meaning "root" in parent fields.
pub struct FilePageStore {
    path: PathBuf,
    page_size: usize,
    state: Mutex<FileState>,
}

impl FilePageStore {
    /// Opens `path`, creating it when missing.
    pub fn open(path: impl AsRef<Path>, page_size: usize) -> Result<Self> {
        validate_page_size(page_size)?;
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        let len = file.metadata()?.len();
        if len % page_size as u64 != 0 {
            return Err(SombraError::Corruption(
                "file length is not a multiple of the page size",
            ));
        }
        let pages = len / page_size as u64;
        let next_id = u32::try_from(pages.max(1))
            .map_err(|_| SombraError::Corruption("file holds more pages than u32 ids"))?;
        if pages == 0 {
            file.set_len(page_size as u64)?;
        }
        debug!(path = %path.display(), page_size, next_id, "file_store.open");
        Ok(Self {
            path,
            page_size,
            state: Mutex::new(FileState {
                file,
                next_id,
                dirty: BTreeSet::new(),
            }),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of pages in the file, including the reserved page 0.
    pub fn page_count(&self) -> u32 {
        self.state.lock().next_id
    }

    /// Pages that changed in memory but have not been written yet.
    pub fn dirty_pages(&self) -> Vec<PageId> {
        self.state.lock().dirty.iter().copied().collect()
    }

    /// Flushes file data to stable storage.
    pub fn sync(&self) -> Result<()> {
        self.state.lock().file.sync_data()?;
        Ok(())
    }

    fn offset_of(&self, page: PageId) -> u64 {
        u64::from(page.0) * self.page_size as u64
    }
}

impl PageStore for FilePageStore {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn allocate_page(&self) -> Result<PageId> {
        let mut state = self.state.lock();
        let id = PageId(state.next_id);
        let next = state
            .next_id
            .checked_add(1)
            .ok_or(SombraError::Invalid("page id space exhausted"))?;
        state.file.set_len(u64::from(next) * self.page_size as u64)?;
        state.next_id = next;
        debug!(page = id.0, "file_store.allocate");
        Ok(id)
    }

    fn update_record(&self, page: PageId) -> Result<()> {
        check_page_id(page)?;
        self.state.lock().dirty.insert(page);
        Ok(())
    }

    fn write_page(&self, page: PageId, data: &[u8]) -> Result<()> {
        check_page_id(page)?;
        check_page_len(self.page_size, data)?;
        let offset = self.offset_of(page);
        let mut state = self.state.lock();
        if page.0 >= state.next_id {
            return Err(SombraError::Invalid("write to unallocated page"));
        }
        state.file.seek(SeekFrom::Start(offset))?;
        state.file.write_all(data)?;
        state.dirty.remove(&page);
        Ok(())
    }

    fn read_page(&self, page: PageId) -> Result<Vec<u8>> {
        check_page_id(page)?;
        let offset = self.offset_of(page);
        let mut state = self.state.lock();
        if page.0 >= state.next_id {
            return Err(SombraError::Invalid("read of unallocated page"));
        }
        let mut buf = vec![0u8; self.page_size];
        state.file.seek(SeekFrom::Start(offset))?;
        state.file.read_exact(&mut buf)?;
        Ok(buf)
    }
}
