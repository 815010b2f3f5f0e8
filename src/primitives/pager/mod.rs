#![forbid(unsafe_code)]

//! Page store abstraction consumed by the leaf page layer.
//!
//! A store owns page allocation, the fixed page size and durable whole-page
//! reads and writes. Pages are addressed purely by [`PageId`]; id `0` is
//! never handed out because it doubles as the on-disk "no parent" sentinel.

mod file;
mod memory;

pub use file::FilePageStore;
pub use memory::{MemPageStore, MemStoreStats};

use crate::types::{PageId, Result, SombraError};

/// Smallest page size a store accepts.
pub const MIN_PAGE_SIZE: usize = 64;
/// Largest page size a store accepts; offsets are stored as `u16`.
pub const MAX_PAGE_SIZE: usize = 65_536;
/// Page size used when nothing else is configured.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Fixed-size page storage shared by every page of an index.
pub trait PageStore: Send + Sync + 'static {
    /// Returns the page size in bytes.
    fn page_size(&self) -> usize;

    /// Allocates a fresh page id.
    fn allocate_page(&self) -> Result<PageId>;

    /// Records that the in-memory image of `page` changed and must be written eventually.
    fn update_record(&self, page: PageId) -> Result<()>;

    /// Durably stores a full page image.
    fn write_page(&self, page: PageId, data: &[u8]) -> Result<()>;

    /// Reads a full page image.
    fn read_page(&self, page: PageId) -> Result<Vec<u8>>;

    /// Returns a zeroed buffer of exactly one page.
    fn create_buffer(&self) -> Vec<u8> {
        vec![0u8; self.page_size()]
    }
}

/// Validates a configured page size against the leaf layout limits.
pub fn validate_page_size(page_size: usize) -> Result<()> {
    if page_size < MIN_PAGE_SIZE {
        return Err(SombraError::Invalid("page size below minimum"));
    }
    if page_size > MAX_PAGE_SIZE {
        return Err(SombraError::Invalid("page size exceeds u16 offset range"));
    }
    Ok(())
}

fn check_page_len(page_size: usize, data: &[u8]) -> Result<()> {
    if data.len() != page_size {
        return Err(SombraError::Invalid("page buffer length differs from page size"));
    }
    Ok(())
}

fn check_page_id(page: PageId) -> Result<()> {
    if page.0 == PageId::ROOT_SENTINEL {
        return Err(SombraError::Invalid("page id 0 is reserved"));
    }
    Ok(())
}
