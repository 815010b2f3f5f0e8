use std::collections::{BTreeSet, HashMap};

use parking_lot::Mutex;
use tracing::trace;

use super::{check_page_id, check_page_len, validate_page_size, PageStore};
use crate::types::{PageId, Result, SombraError};

/// Counters describing how a [`MemPageStore`] has been used.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MemStoreStats {
    /// Pages handed out by `allocate_page`.
    pub allocated: u64,
    /// `update_record` notifications received.
    pub updates: u64,
    /// Full page writes.
    pub writes: u64,
}

#[derive(Default)]
struct MemInner {
    pages: HashMap<PageId, Vec<u8>>,
    next_id: u32,
    dirty: BTreeSet<PageId>,
    stats: MemStoreStats,
}

/// Volatile page store keeping every page image in memory.
pub struct MemPageStore {
    page_size: usize,
    inner: Mutex<MemInner>,
}

impl MemPageStore {
    /// Creates an empty store with the given page size.
    pub fn new(page_size: usize) -> Result<Self> {
        validate_page_size(page_size)?;
        Ok(Self {
            page_size,
            inner: Mutex::new(MemInner {
                next_id: 1,
                ..MemInner::default()
            }),
        })
    }

    /// Pages that received `update_record` since their last `write_page`.
    pub fn dirty_pages(&self) -> Vec<PageId> {
        self.inner.lock().dirty.iter().copied().collect()
    }

    /// Returns true when a page image has been written for `page`.
    pub fn contains(&self, page: PageId) -> bool {
        self.inner.lock().pages.contains_key(&page)
    }

    /// Snapshot of usage counters.
    pub fn stats(&self) -> MemStoreStats {
        self.inner.lock().stats
    }
}

impl PageStore for MemPageStore {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn allocate_page(&self) -> Result<PageId> {
        let mut inner = self.inner.lock();
        let id = PageId(inner.next_id);
        inner.next_id = inner
            .next_id
            .checked_add(1)
            .ok_or(SombraError::Invalid("page id space exhausted"))?;
        inner.stats.allocated += 1;
        trace!(page = id.0, "mem_store.allocate");
        Ok(id)
    }

    fn update_record(&self, page: PageId) -> Result<()> {
        check_page_id(page)?;
        let mut inner = self.inner.lock();
        inner.dirty.insert(page);
        inner.stats.updates += 1;
        Ok(())
    }

    fn write_page(&self, page: PageId, data: &[u8]) -> Result<()> {
        check_page_id(page)?;
        check_page_len(self.page_size, data)?;
        let mut inner = self.inner.lock();
        if page.0 >= inner.next_id {
            return Err(SombraError::Invalid("write to unallocated page"));
        }
        inner.pages.insert(page, data.to_vec());
        inner.dirty.remove(&page);
        inner.stats.writes += 1;
        Ok(())
    }

    fn read_page(&self, page: PageId) -> Result<Vec<u8>> {
        check_page_id(page)?;
        let inner = self.inner.lock();
        if page.0 >= inner.next_id {
            return Err(SombraError::Invalid("read of unallocated page"));
        }
        Ok(inner
            .pages
            .get(&page)
            .cloned()
            .unwrap_or_else(|| vec![0u8; self.page_size]))
    }
}
