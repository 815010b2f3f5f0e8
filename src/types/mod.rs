#![forbid(unsafe_code)]
//! Shared identifiers and the crate-wide error type.

use std::fmt;

/// Identifier of a fixed-size page inside a [`crate::primitives::pager::PageStore`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct PageId(pub u32);

/// Identifier of the table (index) that owns a page.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct TableId(pub u32);

/// Location of the underlying table row an index row points at.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct RowPos(pub u64);

impl PageId {
    /// On-disk encoding of "no parent"; a leaf carrying it is the root.
    pub const ROOT_SENTINEL: u32 = 0;

    /// Decodes an on-disk parent field, mapping the sentinel to `None`.
    pub fn from_parent_field(raw: u32) -> Option<PageId> {
        if raw == Self::ROOT_SENTINEL {
            None
        } else {
            Some(PageId(raw))
        }
    }

    /// Encodes an optional parent into its on-disk field.
    pub fn to_parent_field(parent: Option<PageId>) -> u32 {
        parent.map(|p| p.0).unwrap_or(Self::ROOT_SENTINEL)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RowPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TableId {
    fn from(value: u32) -> Self {
        TableId(value)
    }
}

impl From<u64> for RowPos {
    fn from(value: u64) -> Self {
        RowPos(value)
    }
}

/// Errors surfaced by the leaf page layer and its collaborators.
#[derive(thiserror::Error, Debug)]
pub enum SombraError {
    /// Underlying page store I/O failed.
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    /// A page could not be decoded.
    #[error("corruption: {0}")]
    Corruption(&'static str),
    /// A page belongs to a different table than the one reading it.
    #[error("corruption: page {page} expected table {expected} got {found}")]
    TableMismatch {
        /// Page that was being read.
        page: PageId,
        /// Table id the caller expected.
        expected: TableId,
        /// Table id stored in the page.
        found: TableId,
    },
    /// A delete targeted a row that is not on the page.
    #[error("row not found when deleting from page {page}: {row}")]
    RowNotFound {
        /// Page searched.
        page: PageId,
        /// Rendering of the requested row.
        row: String,
    },
    /// An insert collided with an existing key.
    #[error("duplicate key on page {page}: {row}")]
    DuplicateKey {
        /// Page searched.
        page: PageId,
        /// Rendering of the rejected row.
        row: String,
    },
    /// A layout invariant was violated; the page must not be trusted.
    #[error("internal error: {0}")]
    Internal(&'static str),
    /// Caller supplied an invalid argument.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
    /// Configuration could not be loaded.
    #[error("config: {0}")]
    Config(String),
}

impl SombraError {
    /// Returns true for both structural corruption and table-id mismatches.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            SombraError::Corruption(_) | SombraError::TableMismatch { .. }
        )
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SombraError>;
