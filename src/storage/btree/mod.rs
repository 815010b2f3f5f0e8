#![forbid(unsafe_code)]

//! Leaf pages of the disk-resident B-tree index.
//!
//! A leaf stores a sorted run of index rows inside one fixed-size page. It
//! grows by asking its caller to split it, compacts itself to position-only
//! rows as a last resort, and defers anything beyond its own key range to the
//! node layer through [`NodePages`].

mod codec;
/// Byte-string rows keyed by `(key, position)`.
pub mod codecs;
mod cursor;
mod index;
mod key_cursor;
mod leaf;
mod node;
/// On-page layout of leaf headers and offset tables.
pub mod page;
mod stats;

pub use codec::RowCodec;
pub use codecs::{IndexRow, KeyPosCodec, MemRowTable, RowLookup};
pub use cursor::{CursorSink, PageCursor};
pub use index::{BTreeIndex, IndexOptions};
pub use leaf::{InsertOutcome, LeafPage, RemoveOutcome};
pub use node::NodePages;
pub use page::RowMode;
pub use stats::{LeafStats, LeafStatsSnapshot};
