use std::sync::Arc;

use tracing::debug;

use super::codec::RowCodec;
use super::leaf::LeafPage;
use super::page::RowMode;
use super::stats::LeafStats;
use crate::primitives::pager::{validate_page_size, PageStore};
use crate::types::{PageId, Result, TableId};

/// Configuration knobs for an index's leaf pages.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IndexOptions {
    /// Reject rows whose (non-NULL) key already exists on the page
    pub unique: bool,
    /// Re-verify ordering and layout after every leaf mutation
    pub check_invariants: bool,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            unique: false,
            check_invariants: cfg!(debug_assertions),
        }
    }
}

impl IndexOptions {
    /// Sets whether keys must be unique.
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Sets whether invariants are re-checked after each mutation.
    pub fn check_invariants(mut self, enabled: bool) -> Self {
        self.check_invariants = enabled;
        self
    }
}

/// The index a family of leaf pages belongs to.
///
/// Bundles the row codec, the shared page store, options and statistics so
/// that every leaf of the index can reach them through one `Arc`.
pub struct BTreeIndex<C: RowCodec> {
    codec: C,
    store: Arc<dyn PageStore>,
    options: IndexOptions,
    stats: LeafStats,
}

impl<C: RowCodec> BTreeIndex<C> {
    /// Creates an index over `store` using `codec` for rows.
    pub fn new(codec: C, store: Arc<dyn PageStore>, options: IndexOptions) -> Result<Arc<Self>> {
        validate_page_size(store.page_size())?;
        debug!(
            table = codec.table_id().0,
            page_size = store.page_size(),
            unique = options.unique,
            "btree.index.open"
        );
        Ok(Arc::new(Self {
            codec,
            store,
            options,
            stats: LeafStats::default(),
        }))
    }

    /// Row codec of this index.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Page store holding this index's pages.
    pub fn store(&self) -> &dyn PageStore {
        self.store.as_ref()
    }

    /// Options the index was opened with.
    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    /// Statistics shared by all leaves of the index.
    pub fn stats(&self) -> &LeafStats {
        &self.stats
    }

    /// Table id stamped into every page.
    pub fn table_id(&self) -> TableId {
        self.codec.table_id()
    }

    /// Page size of the underlying store.
    pub fn page_size(&self) -> usize {
        self.store.page_size()
    }

    /// Serialized length of `row` in `mode`.
    pub fn row_size(&self, row: &C::Row, mode: RowMode) -> usize {
        self.codec.row_size(row, mode)
    }

    /// Allocates an empty root leaf.
    pub fn create_root_leaf(self: &Arc<Self>) -> Result<LeafPage<C>> {
        let id = self.store.allocate_page()?;
        let mut leaf = LeafPage::create(Arc::clone(self), id, None, RowMode::Full);
        leaf.write()?;
        Ok(leaf)
    }

    /// Reads the leaf stored at `id`.
    pub fn load_leaf(self: &Arc<Self>, id: PageId) -> Result<LeafPage<C>> {
        let data = self.store.read_page(id)?;
        LeafPage::read(Arc::clone(self), id, data)
    }
}
