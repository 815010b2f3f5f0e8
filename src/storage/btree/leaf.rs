use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::codec::RowCodec;
use super::cursor::CursorSink;
use super::index::BTreeIndex;
use super::node::NodePages;
use super::page::{self, LeafHeader, RowMode, OFFSET_LENGTH, OFFSET_START};
use crate::types::{PageId, Result, SombraError};

/// Result of [`LeafPage::add_row_try`].
#[must_use]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InsertOutcome {
    /// The row was added to the page.
    Inserted,
    /// The page is full; split at this slot and retry the insert.
    SplitRequired(usize),
}

/// Result of [`LeafPage::remove`].
#[must_use]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RemoveOutcome<R> {
    /// The row was the only one on the page; the page was left untouched and
    /// the caller now owns reclaiming it.
    PageEmptied(R),
    /// The final slot was removed; carries the new last row for the parent separator.
    LastRowChanged(R),
    /// A middle row was removed; separators are unaffected.
    Unchanged,
}

/// In-memory image of one B-tree leaf page.
///
/// Rows pack downward from the end of the page while the header and offset
/// table grow upward from the start. Rows read from disk are decoded on
/// first access; every mutation decodes all of them first because it moves
/// offsets away from the bytes still sitting in `data`.
pub struct LeafPage<C: RowCodec> {
    index: Arc<BTreeIndex<C>>,
    id: PageId,
    parent: Option<PageId>,
    mode: RowMode,
    offsets: Vec<usize>,
    rows: Vec<Option<C::Row>>,
    start: usize,
    written: bool,
    data: Vec<u8>,
}

impl<C: RowCodec> LeafPage<C> {
    /// Creates an empty, dirty leaf for a freshly allocated page id.
    pub fn create(
        index: Arc<BTreeIndex<C>>,
        id: PageId,
        parent: Option<PageId>,
        mode: RowMode,
    ) -> Self {
        let data = index.store().create_buffer();
        Self {
            index,
            id,
            parent,
            mode,
            offsets: Vec::new(),
            rows: Vec::new(),
            start: OFFSET_START,
            written: false,
            data,
        }
    }

    /// Parses a persisted leaf. Rows stay encoded until first accessed.
    pub fn read(index: Arc<BTreeIndex<C>>, id: PageId, data: Vec<u8>) -> Result<Self> {
        if data.len() != index.page_size() {
            return Err(SombraError::Corruption(
                "page buffer length differs from page size",
            ));
        }
        let header = LeafHeader::parse(&data)?;
        let expected = index.table_id();
        if header.table != expected {
            return Err(SombraError::TableMismatch {
                page: id,
                expected,
                found: header.table,
            });
        }
        let offsets = page::read_offsets(&data, header.entry_count)?;
        let start = header.offsets_end();
        let mut upper = data.len();
        for &offset in &offsets {
            if offset < start || offset >= data.len() {
                return Err(SombraError::Corruption("row offset outside page data region"));
            }
            if offset > upper {
                return Err(SombraError::Corruption("row offsets not descending"));
            }
            upper = offset;
        }
        let rows = vec![None; offsets.len()];
        index.stats().inc_pages_read();
        debug!(
            page = id.0,
            entries = header.entry_count,
            position_only = header.mode.is_position_only(),
            "btree.leaf.read"
        );
        Ok(Self {
            start,
            parent: header.parent,
            mode: header.mode,
            index,
            id,
            offsets,
            rows,
            written: true,
            data,
        })
    }

    /// Page id of this leaf.
    pub fn id(&self) -> PageId {
        self.id
    }

    /// Parent node page, `None` for the root.
    pub fn parent(&self) -> Option<PageId> {
        self.parent
    }

    /// Re-parents the leaf after the node layer restructured.
    pub fn set_parent(&mut self, parent: Option<PageId>) {
        if self.parent != parent {
            self.parent = parent;
            self.written = false;
        }
    }

    /// Returns true when this leaf is the root of its index.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Row representation currently used by the page.
    pub fn mode(&self) -> RowMode {
        self.mode
    }

    /// Number of slots on the page.
    pub fn entry_count(&self) -> usize {
        self.offsets.len()
    }

    /// Rows stored below this page; for a leaf, its entry count.
    pub fn row_count(&self) -> usize {
        self.entry_count()
    }

    /// Bytes the page occupies in the store.
    pub fn byte_count(&self) -> usize {
        self.index.page_size()
    }

    /// Unused bytes between the offset table and the packed rows.
    pub fn free_space(&self) -> usize {
        self.last_offset().saturating_sub(self.start)
    }

    /// Offsets of every slot's serialized row.
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Returns true when the page changed since it was last written or read.
    pub fn is_dirty(&self) -> bool {
        !self.written
    }

    /// Raw page image as last serialized or read.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Row at `slot`, decoding it on first access.
    pub fn row(&mut self, slot: usize) -> Result<&C::Row> {
        if slot >= self.rows.len() {
            return Err(SombraError::Invalid("slot index out of range"));
        }
        if self.rows[slot].is_none() {
            let decoded = self.decode_row(slot)?;
            self.rows[slot] = Some(decoded);
        }
        self.rows[slot]
            .as_ref()
            .ok_or(SombraError::Internal("decoded row missing"))
    }

    /// Clones every row in slot order.
    pub fn collect_rows(&mut self) -> Result<Vec<C::Row>> {
        self.load_all_rows()?;
        self.rows
            .iter()
            .map(|row| {
                row.clone()
                    .ok_or(SombraError::Internal("row not loaded"))
            })
            .collect()
    }

    /// Tries to add `row`, compacting the page or asking for a split when it does not fit.
    pub fn add_row_try(&mut self, row: C::Row) -> Result<InsertOutcome> {
        self.load_all_rows()?;
        let index = Arc::clone(&self.index);
        let codec = index.codec();
        let slot = self.search(&row, false, true, true)?;
        let mut row_len = codec.row_size(&row, self.mode);
        if !self.fits(row_len) {
            if self.entry_count() > 1 {
                let split_point = self.entry_count() / 2;
                index.stats().inc_split_signals();
                debug!(
                    page = self.id.0,
                    entries = self.entry_count(),
                    split_point,
                    "btree.leaf.split_signal"
                );
                return Ok(InsertOutcome::SplitRequired(split_point));
            }
            self.compact()?;
            row_len = codec.row_size(&row, self.mode);
            if !self.fits(row_len) {
                return Err(SombraError::Internal(
                    "row does not fit after switching to position-only rows",
                ));
            }
        }
        let upper = if slot == 0 {
            index.page_size()
        } else {
            self.offsets[slot - 1]
        };
        for offset in &mut self.offsets[slot..] {
            *offset = offset
                .checked_sub(row_len)
                .ok_or(SombraError::Internal("row offset underflow on insert"))?;
        }
        let new_offset = upper
            .checked_sub(row_len)
            .ok_or(SombraError::Internal("row offset underflow on insert"))?;
        self.offsets.insert(slot, new_offset);
        self.rows.insert(slot, Some(row));
        self.start += OFFSET_LENGTH;
        self.written = false;
        self.check_invariants()?;
        index.store().update_record(self.id)?;
        index.stats().inc_rows_inserted();
        trace!(page = self.id.0, slot, row_len, "btree.leaf.insert");
        Ok(InsertOutcome::Inserted)
    }

    /// Moves rows `split_point..` into a new right-hand leaf with the same parent.
    ///
    /// The caller links the returned page into the parent and persists both pages.
    pub fn split(&mut self, split_point: usize) -> Result<LeafPage<C>> {
        if split_point == 0 || split_point >= self.entry_count() {
            return Err(SombraError::Invalid(
                "split point must leave rows on both pages",
            ));
        }
        let index = Arc::clone(&self.index);
        let new_id = index.store().allocate_page()?;
        let mut right = LeafPage::create(Arc::clone(&index), new_id, self.parent, self.mode);
        let moved = self.entry_count() - split_point;
        self.move_tail(split_point, &mut right)?;
        index.stats().inc_splits();
        debug!(
            page = self.id.0,
            new_page = new_id.0,
            split_point,
            moved,
            "btree.leaf.split"
        );
        Ok(right)
    }

    /// Moves every row from `split_point` to the end into `target`, preserving order.
    pub(crate) fn move_tail(&mut self, split_point: usize, target: &mut LeafPage<C>) -> Result<()> {
        self.load_all_rows()?;
        while self.entry_count() > split_point {
            let row = self.row(split_point)?.clone();
            match target.add_row_try(row)? {
                InsertOutcome::Inserted => {}
                InsertOutcome::SplitRequired(_) => {
                    return Err(SombraError::Internal(
                        "split target overflowed while moving rows",
                    ));
                }
            }
            self.remove_row(split_point)?;
        }
        Ok(())
    }

    /// Deletes the row matching both key and position.
    pub fn remove(&mut self, row: &C::Row) -> Result<RemoveOutcome<C::Row>> {
        let index = Arc::clone(&self.index);
        let codec = index.codec();
        let slot = self.search(row, false, false, true)?;
        let found = slot < self.entry_count() && {
            let existing = self.row(slot)?;
            codec.compare_rows(row, existing) == Ordering::Equal
                && codec.row_pos(row) == codec.row_pos(existing)
        };
        if !found {
            return Err(SombraError::RowNotFound {
                page: self.id,
                row: format!("{row:?}"),
            });
        }
        if self.entry_count() == 1 {
            let only = self.row(slot)?.clone();
            debug!(page = self.id.0, "btree.leaf.emptied");
            return Ok(RemoveOutcome::PageEmptied(only));
        }
        self.remove_row(slot)?;
        index.store().update_record(self.id)?;
        if slot == self.entry_count() {
            let last = self.row(slot - 1)?.clone();
            return Ok(RemoveOutcome::LastRowChanged(last));
        }
        Ok(RemoveOutcome::Unchanged)
    }

    /// Positions `cursor` on the first row `>= key` (or `> key` when `bigger`).
    ///
    /// A search running past the last row continues in the parent node; on the
    /// root it ends without touching the cursor.
    pub fn find(
        &mut self,
        nodes: &mut dyn NodePages<C::Row>,
        cursor: &mut dyn CursorSink,
        key: &C::Row,
        bigger: bool,
    ) -> Result<()> {
        let slot = self.search(key, bigger, false, false)?;
        if slot >= self.entry_count() {
            return match self.parent {
                None => Ok(()),
                Some(parent) => nodes.find(parent, cursor, key, bigger),
            };
        }
        cursor.set_current(Some(self.id), slot);
        Ok(())
    }

    /// Positions `cursor` on the last row of this page.
    pub fn last(&self, cursor: &mut dyn CursorSink) {
        match self.entry_count().checked_sub(1) {
            Some(slot) => cursor.set_current(Some(self.id), slot),
            None => cursor.set_current(None, 0),
        }
    }

    /// Moves `cursor` to the first row of the next leaf in key order.
    pub fn next_page(
        &self,
        nodes: &mut dyn NodePages<C::Row>,
        cursor: &mut dyn CursorSink,
    ) -> Result<()> {
        match self.parent {
            None => {
                cursor.set_current(None, 0);
                Ok(())
            }
            Some(parent) => nodes.next_page(parent, cursor, self.id),
        }
    }

    /// Moves `cursor` to the last row of the previous leaf in key order.
    pub fn previous_page(
        &self,
        nodes: &mut dyn NodePages<C::Row>,
        cursor: &mut dyn CursorSink,
    ) -> Result<()> {
        match self.parent {
            None => {
                cursor.set_current(None, 0);
                Ok(())
            }
            Some(parent) => nodes.previous_page(parent, cursor, self.id),
        }
    }

    /// Serializes the page if dirty and hands it to the page store.
    pub fn write(&mut self) -> Result<()> {
        if self.written {
            return Ok(());
        }
        self.serialize()?;
        let index = Arc::clone(&self.index);
        index.store().write_page(self.id, &self.data)?;
        self.written = true;
        index.stats().inc_pages_written();
        debug!(
            page = self.id.0,
            entries = self.entry_count(),
            position_only = self.mode.is_position_only(),
            "btree.leaf.write"
        );
        Ok(())
    }

    fn serialize(&mut self) -> Result<()> {
        self.load_all_rows()?;
        let index = Arc::clone(&self.index);
        let entry_count = u16::try_from(self.entry_count())
            .map_err(|_| SombraError::Internal("entry count exceeds u16"))?;
        self.data.fill(0);
        let header = LeafHeader {
            parent: self.parent,
            mode: self.mode,
            table: index.table_id(),
            entry_count,
        };
        header.encode(&mut self.data)?;
        page::write_offsets(&mut self.data, &self.offsets)?;
        for (slot, &offset) in self.offsets.iter().enumerate() {
            let row = self.rows[slot]
                .as_ref()
                .ok_or(SombraError::Internal("row not loaded before serialization"))?;
            index
                .codec()
                .write_row(&mut self.data, offset, row, self.mode)?;
        }
        Ok(())
    }

    /// Removes `slot` and reclaims its bytes. The page must keep at least one row.
    fn remove_row(&mut self, slot: usize) -> Result<C::Row> {
        self.load_all_rows()?;
        if slot >= self.entry_count() {
            return Err(SombraError::Invalid("slot index out of range"));
        }
        if self.entry_count() <= 1 {
            return Err(SombraError::Internal(
                "removing the only row would leave an empty leaf",
            ));
        }
        let (row_start, row_end) = page::slot_extent(&self.offsets, self.index.page_size(), slot)?;
        let row_len = row_end - row_start;
        for offset in &mut self.offsets[slot + 1..] {
            *offset += row_len;
        }
        self.offsets.remove(slot);
        let row = self
            .rows
            .remove(slot)
            .ok_or(SombraError::Internal("row not loaded before removal"))?;
        self.start -= OFFSET_LENGTH;
        self.written = false;
        self.check_invariants()?;
        self.index.stats().inc_rows_removed();
        trace!(page = self.id.0, slot, row_len, "btree.leaf.remove_row");
        Ok(row)
    }

    /// Switches to position-only rows and repacks every slot from the page end.
    fn compact(&mut self) -> Result<()> {
        let index = Arc::clone(&self.index);
        let was_full = self.mode == RowMode::Full;
        self.mode = RowMode::PositionOnly;
        let mut offset = index.page_size();
        for slot in 0..self.offsets.len() {
            let row = self.rows[slot]
                .as_ref()
                .ok_or(SombraError::Internal("row not loaded before compaction"))?;
            let len = index.codec().row_size(row, self.mode);
            offset = offset
                .checked_sub(len)
                .ok_or(SombraError::Internal("position-only row larger than page"))?;
            self.offsets[slot] = offset;
        }
        self.written = false;
        if was_full {
            index.stats().inc_compactions();
            warn!(
                page = self.id.0,
                table = index.table_id().0,
                entries = self.entry_count(),
                "btree.leaf.compact"
            );
        }
        Ok(())
    }

    /// Binary search returning the first slot whose row is not below `target`.
    ///
    /// With `bigger` equal keys count as below. With `compare_positions` equal
    /// keys are ordered by position, and an exact match returns its slot.
    fn search(
        &mut self,
        target: &C::Row,
        bigger: bool,
        add: bool,
        compare_positions: bool,
    ) -> Result<usize> {
        let index = Arc::clone(&self.index);
        let codec = index.codec();
        let mut lo = 0usize;
        let mut hi = self.entry_count();
        while lo < hi {
            let mid = (lo + hi) / 2;
            let (key_cmp, pos_cmp) = {
                let row = self.row(mid)?;
                (
                    codec.compare_rows(row, target),
                    codec.row_pos(row).cmp(&codec.row_pos(target)),
                )
            };
            let mut cmp = key_cmp;
            if cmp == Ordering::Equal {
                if add && index.options().unique && !codec.key_has_null(target) {
                    return Err(SombraError::DuplicateKey {
                        page: self.id,
                        row: format!("{target:?}"),
                    });
                }
                if compare_positions {
                    cmp = pos_cmp;
                    if cmp == Ordering::Equal {
                        if add {
                            return Err(SombraError::DuplicateKey {
                                page: self.id,
                                row: format!("{target:?}"),
                            });
                        }
                        return Ok(mid);
                    }
                }
            }
            if cmp == Ordering::Greater || (!bigger && cmp == Ordering::Equal) {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        Ok(lo)
    }

    fn decode_row(&self, slot: usize) -> Result<C::Row> {
        let offset = self.offsets[slot];
        if offset < self.start || offset >= self.data.len() {
            return Err(SombraError::Corruption("row offset outside page data region"));
        }
        let row = self.index.codec().read_row(&self.data, offset, self.mode)?;
        self.index.stats().add_rows_decoded(1);
        Ok(row)
    }

    fn load_all_rows(&mut self) -> Result<()> {
        for slot in 0..self.rows.len() {
            if self.rows[slot].is_none() {
                let decoded = self.decode_row(slot)?;
                self.rows[slot] = Some(decoded);
            }
        }
        Ok(())
    }

    fn last_offset(&self) -> usize {
        self.offsets
            .last()
            .copied()
            .unwrap_or_else(|| self.index.page_size())
    }

    fn fits(&self, row_len: usize) -> bool {
        self.last_offset() >= self.start + OFFSET_LENGTH + row_len
    }

    fn check_invariants(&self) -> Result<()> {
        if !self.index.options().check_invariants {
            return Ok(());
        }
        let codec = self.index.codec();
        if self.offsets.len() != self.rows.len() {
            return Err(SombraError::Internal("offset table and rows diverged"));
        }
        if self.start != OFFSET_START + self.offsets.len() * OFFSET_LENGTH {
            return Err(SombraError::Internal("start does not match offset table"));
        }
        let mut upper = self.index.page_size();
        let mut prev: Option<&C::Row> = None;
        for (slot, &offset) in self.offsets.iter().enumerate() {
            let row = self.rows[slot]
                .as_ref()
                .ok_or(SombraError::Internal("row not loaded"))?;
            if offset + codec.row_size(row, self.mode) > upper {
                return Err(SombraError::Internal("row bytes overlap a neighbour"));
            }
            upper = offset;
            if let Some(prev) = prev {
                let order = codec
                    .compare_rows(prev, row)
                    .then_with(|| codec.row_pos(prev).cmp(&codec.row_pos(row)));
                if order != Ordering::Less {
                    return Err(SombraError::Internal("rows out of order"));
                }
            }
            prev = Some(row);
        }
        if upper < self.start {
            return Err(SombraError::Internal("rows overlap the offset table"));
        }
        Ok(())
    }
}

impl<C: RowCodec> fmt::Display for LeafPage<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "page[{}] b-tree leaf table:{} entries:{}",
            self.id,
            self.index.table_id(),
            self.entry_count()
        )
    }
}
