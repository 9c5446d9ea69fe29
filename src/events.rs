use crate::filter::TypeFilter;

/// Notifications emitted by a list for other modules.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListNotice {
    /// The filtered view or its rows changed; keyboard navigation re-syncs.
    ListUpdated { len: usize, generation: u64 },
    /// Scrolling stopped for the settle delay.
    ScrollSettled { scroll_top: u32 },
    /// The type filter changed.
    FilterChanged { type_filter: TypeFilter },
    /// Non-blocking user-facing message (toast).
    Notification(String),
}

/// Events from outside the list that affect it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExternalEvent {
    /// The backend data changed; re-fetch the full snapshot.
    DataChanged,
    /// The global row-height preference changed.
    RowHeightChanged(u32),
    /// The list's tab became active.
    TabSwitched,
}
