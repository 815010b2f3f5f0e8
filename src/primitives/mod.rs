//! Low-level primitives for building the storage engine.
//!
//! Includes byte utilities and the page store abstraction the B-tree pages
//! are persisted through.

/// Byte-level utilities and encoding/decoding.
pub mod bytes;

/// Page store trait plus in-memory and file-backed implementations.
pub mod pager;
