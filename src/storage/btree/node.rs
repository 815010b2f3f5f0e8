use super::cursor::CursorSink;
use crate::types::{PageId, Result};

/// Internal (routing) pages of the tree, addressed by page id.
///
/// Leaves never hold references to nodes; when a search or walk leaves the
/// key range of a leaf, the leaf hands its parent's id back through this
/// trait and the node layer continues from there.
pub trait NodePages<R> {
    /// Continues a search for `key` that ran past the end of a child of `node`.
    fn find(
        &mut self,
        node: PageId,
        cursor: &mut dyn CursorSink,
        key: &R,
        bigger: bool,
    ) -> Result<()>;

    /// Positions `cursor` on the first row of the leaf following `from`.
    fn next_page(&mut self, node: PageId, cursor: &mut dyn CursorSink, from: PageId)
        -> Result<()>;

    /// Positions `cursor` on the last row of the leaf preceding `from`.
    fn previous_page(
        &mut self,
        node: PageId,
        cursor: &mut dyn CursorSink,
        from: PageId,
    ) -> Result<()>;
}
