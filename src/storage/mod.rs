//! Index storage built on top of the page store.

/// B-tree leaf pages and the collaborators they talk to.
pub mod btree;
