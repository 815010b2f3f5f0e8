use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

/// Snapshot of leaf page statistics at a point in time.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafStatsSnapshot {
    /// Rows successfully added to a leaf
    pub rows_inserted: u64,
    /// Rows removed from a leaf (including rows moved out by splits)
    pub rows_removed: u64,
    /// Inserts answered with a split request
    pub split_signals: u64,
    /// Leaf splits performed
    pub splits: u64,
    /// Pages switched to position-only rows
    pub compactions: u64,
    /// Rows decoded lazily from page buffers
    pub rows_decoded: u64,
    /// Leaf pages parsed from the store
    pub pages_read: u64,
    /// Leaf pages serialized and handed to the store
    pub pages_written: u64,
}

/// Thread-safe statistics shared by every leaf of one index.
#[derive(Default)]
pub struct LeafStats {
    rows_inserted: AtomicU64,
    rows_removed: AtomicU64,
    split_signals: AtomicU64,
    splits: AtomicU64,
    compactions: AtomicU64,
    rows_decoded: AtomicU64,
    pages_read: AtomicU64,
    pages_written: AtomicU64,
}

impl LeafStats {
    /// Returns the number of rows added to leaves.
    pub fn rows_inserted(&self) -> u64 {
        self.rows_inserted.load(AtomicOrdering::Relaxed)
    }

    /// Returns the number of rows removed from leaves.
    pub fn rows_removed(&self) -> u64 {
        self.rows_removed.load(AtomicOrdering::Relaxed)
    }

    /// Returns the number of split requests handed back to callers.
    pub fn split_signals(&self) -> u64 {
        self.split_signals.load(AtomicOrdering::Relaxed)
    }

    /// Returns the number of completed splits.
    pub fn splits(&self) -> u64 {
        self.splits.load(AtomicOrdering::Relaxed)
    }

    /// Returns the number of full-to-position-only compactions.
    pub fn compactions(&self) -> u64 {
        self.compactions.load(AtomicOrdering::Relaxed)
    }

    /// Returns the number of lazily decoded rows.
    pub fn rows_decoded(&self) -> u64 {
        self.rows_decoded.load(AtomicOrdering::Relaxed)
    }

    /// Returns the number of leaf pages read.
    pub fn pages_read(&self) -> u64 {
        self.pages_read.load(AtomicOrdering::Relaxed)
    }

    /// Returns the number of leaf pages written.
    pub fn pages_written(&self) -> u64 {
        self.pages_written.load(AtomicOrdering::Relaxed)
    }

    pub(crate) fn inc_rows_inserted(&self) {
        self.rows_inserted.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_rows_removed(&self) {
        self.rows_removed.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_split_signals(&self) {
        self.split_signals.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_splits(&self) {
        self.splits.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_compactions(&self) {
        self.compactions.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn add_rows_decoded(&self, count: u64) {
        self.rows_decoded.fetch_add(count, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_pages_read(&self) {
        self.pages_read.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_pages_written(&self) {
        self.pages_written.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Creates a snapshot of all current statistics.
    pub fn snapshot(&self) -> LeafStatsSnapshot {
        LeafStatsSnapshot {
            rows_inserted: self.rows_inserted(),
            rows_removed: self.rows_removed(),
            split_signals: self.split_signals(),
            splits: self.splits(),
            compactions: self.compactions(),
            rows_decoded: self.rows_decoded(),
            pages_read: self.pages_read(),
            pages_written: self.pages_written(),
        }
    }

    /// Emits current statistics to the tracing infrastructure.
    pub fn emit_tracing(&self) {
        let snapshot = self.snapshot();
        tracing::info!(
            target: "sombra_btree_leaf::stats",
            rows_inserted = snapshot.rows_inserted,
            rows_removed = snapshot.rows_removed,
            split_signals = snapshot.split_signals,
            splits = snapshot.splits,
            compactions = snapshot.compactions,
            rows_decoded = snapshot.rows_decoded,
            pages_read = snapshot.pages_read,
            pages_written = snapshot.pages_written,
            "leaf stats snapshot"
        );
    }
}
