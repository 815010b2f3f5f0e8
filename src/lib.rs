//! Leaf pages of a disk-resident B-tree index.
//!
//! The crate is layered bottom-up: [`types`] holds identifiers and the error
//! type, [`primitives`] the byte helpers and page stores, [`storage`] the
//! leaf pages themselves and [`config`] the TOML configuration shared by the
//! library and the `sombra-leaf` binary.

#![warn(missing_docs)]

pub mod config;
pub mod primitives;
pub mod storage;
pub mod types;

pub use config::LeafConfig;
pub use storage::btree::{
    BTreeIndex, IndexOptions, InsertOutcome, LeafPage, RemoveOutcome, RowCodec, RowMode,
};
pub use types::{PageId, Result, RowPos, SombraError, TableId};
