//! Virtualized clipboard-history list widget for ratatui.
//!
//! Only the rows inside the viewport (plus overscan) are materialized. Rows
//! are retained by item identity across renders, measured after their first
//! paint, and can be drag-reordered through a filtered view. Image rows load
//! their assets lazily through a bounded LRU-cached fetch queue.
//!
//! Feature flags:
//! - `keymap`: crossterm-based key bindings and `ListManager::handle_key*` helpers.

mod action;
mod backend;
mod config;
mod context;
mod debounce;
mod drag;
mod events;
mod filter;
mod glyphs;
mod height;
mod item;
#[cfg(feature = "keymap")]
mod keymap;
mod loader;
mod manager;
pub mod prelude;
mod registry;
mod render;
mod style;
mod widget;
mod window;

pub use action::{ListAction, ListEvent};
pub use backend::{Backend, BackendError, RetryPolicy, retry};
pub use config::ListConfig;
pub use context::RowContext;
pub use debounce::Debouncer;
pub use drag::{
    DragPhase, DragReorderResolver, DragSession, DropReport, ReorderPlan, Resolution, ResolveError,
    apply_move,
};
pub use events::{ExternalEvent, ListNotice};
pub use filter::{
    FilterPipeline, FilterState, FilteredView, ItemFilter, NoFilter, TypeFilter, contains_url,
    html_to_plain, matches_search, matches_type,
};
pub use glyphs::{ClipGlyphs, DefaultRowLabel, RowLabelRenderer, row_lines};
pub use height::HeightModel;
pub use item::{ClipItem, ContentType, FileEntry, ItemDataError, ItemKey, ListKind};
#[cfg(feature = "keymap")]
pub use keymap::{KeymapProfile, ListKeyBindings};
pub use loader::{AssetError, AssetLoader, AssetSource, AssetState, FetchRequest};
pub use manager::{ListManager, ListSnapshot, ReorderOutcome};
pub use registry::{ListRegistry, ListTab};
pub use render::{LineMeasure, NodeId, RenderDiff, Renderer, RowContent, RowMeasure, RowNode};
pub use style::{ClipListStyle, ScrollPolicy};
pub use widget::ClipListView;
pub use window::{RenderWindow, WindowCalculator};
