use crate::types::PageId;

/// Receiver of cursor positions chosen by leaf and node pages.
pub trait CursorSink {
    /// Moves the cursor to `slot` of `page`; `None` means the walk is exhausted.
    fn set_current(&mut self, page: Option<PageId>, slot: usize);
}

/// Plain (page, slot) cursor position.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PageCursor {
    page: Option<PageId>,
    slot: usize,
}

impl PageCursor {
    /// Cursor that has not been positioned yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Page the cursor points into, if any.
    pub fn page(&self) -> Option<PageId> {
        self.page
    }

    /// Slot within the current page.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Returns the position as a pair when the cursor is on a page.
    pub fn position(&self) -> Option<(PageId, usize)> {
        self.page.map(|page| (page, self.slot))
    }

    /// Returns true when no page is selected.
    pub fn is_exhausted(&self) -> bool {
        self.page.is_none()
    }
}

impl CursorSink for PageCursor {
    fn set_current(&mut self, page: Option<PageId>, slot: usize) {
        self.page = page;
        self.slot = slot;
    }
}
