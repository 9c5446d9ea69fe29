pub use crate::{
    AssetSource, AssetState, Backend, BackendError, ClipGlyphs, ClipItem, ClipListStyle,
    ClipListView, ContentType, ExternalEvent, FilterState, ItemKey, ListAction, ListConfig,
    ListEvent, ListKind, ListManager, ListNotice, ListRegistry, ListSnapshot, ListTab,
    ReorderOutcome, RowContext, RowLabelRenderer, ScrollPolicy, TypeFilter,
};

#[cfg(feature = "keymap")]
pub use crate::{KeymapProfile, ListKeyBindings};
