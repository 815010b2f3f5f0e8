//! Byte-string index rows keyed by `(key, position)`.
//!
//! Full form: `pos:u64 | varint tag | key`, where `tag` is `0` for a NULL key
//! and `len + 1` otherwise. Position-only form: `pos:u64`; the key is looked
//! up again through a [`RowLookup`] when such a row is decoded.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::codec::RowCodec;
use super::key_cursor::KeyCursor;
use super::page::RowMode;
use crate::primitives::bytes::{be, var};
use crate::types::{Result, RowPos, SombraError, TableId};

const POS_LEN: usize = 8;

/// An index row: an optional (NULL-able) byte key and the table row position.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct IndexRow {
    /// Key bytes, `None` for SQL NULL.
    pub key: Option<Vec<u8>>,
    /// Position of the table row.
    pub pos: RowPos,
}

impl IndexRow {
    /// Row with a non-NULL key.
    pub fn new(key: impl Into<Vec<u8>>, pos: u64) -> Self {
        Self {
            key: Some(key.into()),
            pos: RowPos(pos),
        }
    }

    /// Row with a NULL key.
    pub fn null(pos: u64) -> Self {
        Self {
            key: None,
            pos: RowPos(pos),
        }
    }
}

impl fmt::Debug for IndexRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "({}, pos {})", String::from_utf8_lossy(key), self.pos),
            None => write!(f, "(NULL, pos {})", self.pos),
        }
    }
}

/// Resolves a row position back to the full index row.
pub trait RowLookup: Send + Sync {
    /// Returns the full row stored at `pos`.
    fn fetch(&self, pos: RowPos) -> Result<IndexRow>;
}

/// In-memory table of full rows addressed by position.
#[derive(Default)]
pub struct MemRowTable {
    rows: RwLock<HashMap<RowPos, Option<Vec<u8>>>>,
}

impl MemRowTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `row` so position-only pages can resolve it.
    pub fn insert(&self, row: &IndexRow) {
        self.rows.write().insert(row.pos, row.key.clone());
    }

    /// Forgets the row at `pos`.
    pub fn remove(&self, pos: RowPos) {
        self.rows.write().remove(&pos);
    }

    /// Number of rows held.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Returns true when the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

impl RowLookup for MemRowTable {
    fn fetch(&self, pos: RowPos) -> Result<IndexRow> {
        let rows = self.rows.read();
        let key = rows
            .get(&pos)
            .ok_or(SombraError::Corruption("position-only row missing from table"))?;
        Ok(IndexRow {
            key: key.clone(),
            pos,
        })
    }
}

/// [`RowCodec`] for [`IndexRow`] values.
pub struct KeyPosCodec {
    table: TableId,
    lookup: Arc<dyn RowLookup>,
}

impl KeyPosCodec {
    /// Creates a codec for `table` resolving compacted rows through `lookup`.
    pub fn new(table: TableId, lookup: Arc<dyn RowLookup>) -> Self {
        Self { table, lookup }
    }

    fn key_tag(row: &IndexRow) -> u64 {
        row.key.as_ref().map(|k| k.len() as u64 + 1).unwrap_or(0)
    }
}

impl RowCodec for KeyPosCodec {
    type Row = IndexRow;

    fn table_id(&self) -> TableId {
        self.table
    }

    fn row_size(&self, row: &IndexRow, mode: RowMode) -> usize {
        match mode {
            RowMode::PositionOnly => POS_LEN,
            RowMode::Full => {
                let key_len = row.key.as_ref().map(Vec::len).unwrap_or(0);
                POS_LEN + var::encoded_len_u64(Self::key_tag(row)) + key_len
            }
        }
    }

    fn write_row(&self, page: &mut [u8], offset: usize, row: &IndexRow, mode: RowMode) -> Result<()> {
        be::write_u64(page, offset, row.pos.0)?;
        if mode.is_position_only() {
            return Ok(());
        }
        let mut body = Vec::with_capacity(self.row_size(row, mode) - POS_LEN);
        var::encode_u64(Self::key_tag(row), &mut body);
        if let Some(key) = &row.key {
            body.extend_from_slice(key);
        }
        be::write_bytes(page, offset + POS_LEN, &body)
    }

    fn read_row(&self, page: &[u8], offset: usize, mode: RowMode) -> Result<IndexRow> {
        let mut cursor = KeyCursor::at(page, offset)?;
        let pos = RowPos(cursor.read_u64("row position truncated")?);
        if mode.is_position_only() {
            return self.lookup.fetch(pos);
        }
        let tag = cursor.read_var_u64("row key length truncated")?;
        let key = match tag {
            0 => None,
            n => {
                let len = usize::try_from(n - 1)
                    .map_err(|_| SombraError::Corruption("row key length exceeds usize"))?;
                Some(cursor.take(len)?.to_vec())
            }
        };
        Ok(IndexRow { key, pos })
    }

    fn compare_rows(&self, a: &IndexRow, b: &IndexRow) -> Ordering {
        a.key.cmp(&b.key)
    }

    fn row_pos(&self, row: &IndexRow) -> RowPos {
        row.pos
    }

    fn key_has_null(&self, row: &IndexRow) -> bool {
        row.key.is_none()
    }
}
