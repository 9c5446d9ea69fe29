use crate::item::ItemKey;

/// Actions that a user or application can initiate on the list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListAction<Custom = ()> {
    /// Move selection to the previous row.
    SelectPrev,
    /// Move selection to the next row.
    SelectNext,
    /// Select the first row.
    SelectFirst,
    /// Select the last row.
    SelectLast,
    /// Scroll one viewport up and move selection with it.
    PageUp,
    /// Scroll one viewport down and move selection with it.
    PageDown,
    /// Execute (paste) the selected row.
    Execute,
    /// Execute the n-th row of the filtered view (1-based, `Ctrl+1..9`).
    ExecuteShortcut(u8),
    /// Request deleting the selected row (needs the backend).
    Delete,
    /// Cycle the content-type filter.
    CycleTypeFilter,
    /// Custom action forwarded to the caller without internal handling.
    Custom(Custom),
}

/// Result of handling an action or key event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListEvent<Custom = ()> {
    /// The action was handled internally and state was updated.
    Handled,
    /// The action was ignored (e.g., nothing selected / nothing to do).
    Unhandled,
    /// The row with this key should be pasted by the caller.
    Execute(ItemKey),
    /// The action is forwarded to the caller for handling.
    Action(ListAction<Custom>),
}
