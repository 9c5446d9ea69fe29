use ratatui::style::Style;

use crate::loader::AssetState;

/// Per-row inputs handed to a [`RowLabelRenderer`](crate::RowLabelRenderer).
#[derive(Clone, Copy)]
pub struct RowContext<'a> {
    pub is_active: bool,
    pub is_dragged: bool,
    /// Load state of the row's image, if it has one.
    pub asset: Option<&'a AssetState>,
    /// Terminal rows allotted to this row.
    pub height: u16,
    pub badge_style: Style,
    pub muted_style: Style,
    pub error_style: Style,
}
