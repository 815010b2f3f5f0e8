use std::cmp::Ordering;
use std::fmt;

use super::page::RowMode;
use crate::types::{Result, RowPos, TableId};

/// Row serialization and ordering supplied by the index that owns the pages.
///
/// Leaf pages never look inside a row; every size, byte and comparison goes
/// through this trait.
pub trait RowCodec {
    /// In-memory row type.
    type Row: Clone + fmt::Debug;

    /// Table (index) id stamped into every page of this index.
    fn table_id(&self) -> TableId;

    /// Serialized length of `row` under `mode`.
    ///
    /// `PositionOnly` lengths must never exceed `Full` lengths.
    fn row_size(&self, row: &Self::Row, mode: RowMode) -> usize;

    /// Serializes `row` into `page` starting at `offset`.
    fn write_row(&self, page: &mut [u8], offset: usize, row: &Self::Row, mode: RowMode)
        -> Result<()>;

    /// Decodes the row stored at `offset`.
    fn read_row(&self, page: &[u8], offset: usize, mode: RowMode) -> Result<Self::Row>;

    /// Orders two rows by key only.
    fn compare_rows(&self, a: &Self::Row, b: &Self::Row) -> Ordering;

    /// Position of the table row; breaks ties between equal keys.
    fn row_pos(&self, row: &Self::Row) -> RowPos;

    /// Whether the key contains NULL, which exempts it from uniqueness checks.
    fn key_has_null(&self, row: &Self::Row) -> bool {
        let _ = row;
        false
    }
}
