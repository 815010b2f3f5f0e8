use crate::primitives::bytes::be;
use crate::types::{PageId, Result, SombraError, TableId};

/// Byte offset of the parent page id.
pub const PARENT_OFFSET: usize = 0;
/// Byte offset of the type byte.
pub const TYPE_OFFSET: usize = 4;
/// Byte offset of the owning table id.
pub const TABLE_OFFSET: usize = 5;
/// Byte offset of the entry count.
pub const COUNT_OFFSET: usize = 9;
/// First byte of the offset table; also the fixed header length.
pub const OFFSET_START: usize = 11;
/// Size in bytes of a single offset table entry.
pub const OFFSET_LENGTH: usize = 2;

/// Type byte flag marking a page that stores full rows.
pub const FLAG_FULL_ROWS: u8 = 0x80;
const TYPE_TAG_MASK: u8 = 0x7f;

/// Page type tag stored in the low bits of the type byte.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BTreePageKind {
    /// Leaf page holding index rows.
    Leaf = 4,
    /// Node page holding child routing entries.
    Node = 5,
}

impl BTreePageKind {
    /// Converts a tag value to a page kind.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            4 => Ok(Self::Leaf),
            5 => Ok(Self::Node),
            _ => Err(SombraError::Corruption("unknown btree page type")),
        }
    }

    /// Extracts the page kind from a full type byte.
    pub fn from_type_byte(byte: u8) -> Result<Self> {
        Self::from_u8(byte & TYPE_TAG_MASK)
    }
}

/// Serialized form used for every row of a page.
///
/// The only legal transition is `Full -> PositionOnly`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RowMode {
    /// Rows carry their complete key and position.
    Full,
    /// Rows carry only the position of the full row.
    PositionOnly,
}

impl RowMode {
    /// Decodes the mode from the type byte flag.
    pub fn from_type_byte(byte: u8) -> Self {
        if byte & FLAG_FULL_ROWS != 0 {
            RowMode::Full
        } else {
            RowMode::PositionOnly
        }
    }

    /// Returns true once the page has been compacted.
    pub fn is_position_only(self) -> bool {
        matches!(self, RowMode::PositionOnly)
    }

    /// Flag bits this mode contributes to the type byte.
    pub fn type_flag(self) -> u8 {
        match self {
            RowMode::Full => FLAG_FULL_ROWS,
            RowMode::PositionOnly => 0,
        }
    }
}

/// Builds the type byte for `kind` in `mode`.
pub fn type_byte(kind: BTreePageKind, mode: RowMode) -> u8 {
    kind as u8 | mode.type_flag()
}

/// Fixed header of a leaf page.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LeafHeader {
    /// Parent node page, `None` for the root.
    pub parent: Option<PageId>,
    /// Row representation used by every slot.
    pub mode: RowMode,
    /// Table (index) owning the page.
    pub table: TableId,
    /// Number of slots in the offset table.
    pub entry_count: u16,
}

impl LeafHeader {
    /// Decodes the header of a leaf page image.
    pub fn parse(page: &[u8]) -> Result<Self> {
        if page.len() < OFFSET_START {
            return Err(SombraError::Corruption("page shorter than leaf header"));
        }
        let type_byte = page[TYPE_OFFSET];
        if BTreePageKind::from_type_byte(type_byte)? != BTreePageKind::Leaf {
            return Err(SombraError::Corruption("page is not a btree leaf"));
        }
        let parent = PageId::from_parent_field(be::read_u32(page, PARENT_OFFSET)?);
        let table = TableId(be::read_u32(page, TABLE_OFFSET)?);
        let entry_count = be::read_u16(page, COUNT_OFFSET)?;
        let header = Self {
            parent,
            mode: RowMode::from_type_byte(type_byte),
            table,
            entry_count,
        };
        if header.offsets_end() > page.len() {
            return Err(SombraError::Corruption("offset table exceeds page"));
        }
        Ok(header)
    }

    /// Writes the header fields into `page`.
    pub fn encode(&self, page: &mut [u8]) -> Result<()> {
        be::write_u32(page, PARENT_OFFSET, PageId::to_parent_field(self.parent))?;
        let kind = type_byte(BTreePageKind::Leaf, self.mode);
        *page
            .get_mut(TYPE_OFFSET)
            .ok_or(SombraError::Invalid("page shorter than leaf header"))? = kind;
        be::write_u32(page, TABLE_OFFSET, self.table.0)?;
        be::write_u16(page, COUNT_OFFSET, self.entry_count)
    }

    /// End of the header plus offset table.
    pub fn offsets_end(&self) -> usize {
        OFFSET_START + self.entry_count as usize * OFFSET_LENGTH
    }
}

/// Reads the offset table following the header.
pub fn read_offsets(page: &[u8], entry_count: u16) -> Result<Vec<usize>> {
    (0..entry_count as usize)
        .map(|slot| {
            be::read_u16(page, OFFSET_START + slot * OFFSET_LENGTH).map(|value| value as usize)
        })
        .collect()
}

/// Writes the offset table following the header.
pub fn write_offsets(page: &mut [u8], offsets: &[usize]) -> Result<()> {
    for (slot, &offset) in offsets.iter().enumerate() {
        let raw =
            u16::try_from(offset).map_err(|_| SombraError::Internal("row offset exceeds u16"))?;
        be::write_u16(page, OFFSET_START + slot * OFFSET_LENGTH, raw)?;
    }
    Ok(())
}

/// Byte range `[start, end)` occupied by `slot`, derived from its neighbour's offset.
pub fn slot_extent(offsets: &[usize], page_size: usize, slot: usize) -> Result<(usize, usize)> {
    let start = *offsets
        .get(slot)
        .ok_or(SombraError::Invalid("slot index out of range"))?;
    let end = if slot == 0 {
        page_size
    } else {
        offsets[slot - 1]
    };
    if start > end || end > page_size {
        return Err(SombraError::Corruption("row extent inverted or past page end"));
    }
    Ok((start, end))
}
