use std::time::Instant;

use ratatui::layout::Rect;
use ratatui::prelude::Buffer;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Scrollbar, ScrollbarOrientation, ScrollbarState, StatefulWidget, Widget};

use crate::context::RowContext;
use crate::glyphs::{ClipGlyphs, DefaultRowLabel, RowLabelRenderer};
use crate::manager::ListManager;
use crate::style::ClipListStyle;

/// Основной виджет списка: рисует только окно строк из [`ListManager`].
pub struct ClipListView<'a, L = DefaultRowLabel>
where
    L: RowLabelRenderer,
{
    label: &'a L,
    style: ClipListStyle<'a>,
    glyphs: ClipGlyphs<'a>,
}

impl<'a> ClipListView<'a, DefaultRowLabel> {
    pub const fn new(style: ClipListStyle<'a>) -> Self {
        Self {
            label: &DefaultRowLabel,
            style,
            glyphs: ClipGlyphs::unicode(),
        }
    }
}

impl<'a, L: RowLabelRenderer> ClipListView<'a, L> {
    #[must_use]
    pub const fn glyphs(mut self, glyphs: ClipGlyphs<'a>) -> Self {
        self.glyphs = glyphs;
        self
    }

    pub fn with_label<R: RowLabelRenderer>(self, label: &'a R) -> ClipListView<'a, R> {
        ClipListView {
            label,
            style: self.style,
            glyphs: self.glyphs,
        }
    }

    fn block(&self) -> Block<'a> {
        let mut block = Block::default().borders(self.style.borders);
        if let Some(title) = self.style.title.clone() {
            block = block.title(title);
        }
        block
            .style(self.style.block_style)
            .border_style(self.style.border_style)
    }

    #[inline]
    fn render_rows(&self, area: Rect, buf: &mut Buffer, state: &ListManager) {
        let scroll_top = state.scroll_top();
        let bottom = scroll_top.saturating_add(u32::from(area.height));
        let active = state.active_index();
        let dragged = state.dragged_node();
        let symbol_width = u16::try_from(self.style.highlight_symbol.chars().count()).unwrap_or(0);
        let blank = " ".repeat(usize::from(symbol_width));

        for (node, top, height) in state.layout() {
            let row_bottom = top.saturating_add(height);
            if row_bottom <= scroll_top || top >= bottom {
                continue;
            }
            let is_active = active == Some(node.original());
            let is_dragged = dragged == Some(node.id());
            let ctx = RowContext {
                is_active,
                is_dragged,
                asset: state.asset_state(node.id()),
                height: u16::try_from(height).unwrap_or(u16::MAX),
                badge_style: self.style.badge_style,
                muted_style: self.style.muted_style,
                error_style: self.style.error_style,
            };
            let lines = self.label.lines(node, &ctx, &self.glyphs);

            // Rows may be cut by either edge of the viewport.
            let first = scroll_top.saturating_sub(top);
            let last = height.min(bottom - top);
            let y0 = area.y + u16::try_from(top.saturating_sub(scroll_top)).unwrap_or(area.height);
            let visible = last.saturating_sub(first);
            let row_area = Rect {
                x: area.x,
                y: y0,
                width: area.width,
                height: u16::try_from(visible).unwrap_or(area.height),
            }
            .intersection(area);
            if is_active {
                buf.set_style(row_area, self.style.highlight_style);
            } else if is_dragged {
                buf.set_style(row_area, self.style.drag_style);
            }

            for (offset, line_idx) in (first..last).enumerate() {
                let y = y0 + u16::try_from(offset).unwrap_or(0);
                if y >= area.bottom() {
                    break;
                }
                let lead = if is_active && line_idx == 0 {
                    self.style.highlight_symbol
                } else {
                    blank.as_str()
                };
                buf.set_span(area.x, y, &Span::raw(lead), symbol_width);
                if let Some(line) = usize::try_from(line_idx).ok().and_then(|idx| lines.get(idx)) {
                    buf.set_line(
                        area.x + symbol_width,
                        y,
                        line,
                        area.width.saturating_sub(symbol_width),
                    );
                }
            }
        }
    }

    #[inline]
    fn render_empty(&self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        let line = Line::from(Span::styled(self.style.empty_text, self.style.muted_style));
        buf.set_line(area.x, area.y, &line, area.width);
    }

    #[inline]
    fn render_scrollbar(&self, area: Rect, buf: &mut Buffer, state: &ListManager, inner_height: u32) {
        let scroll_rows = state.total_height().saturating_sub(inner_height);
        let scroll_len = usize::try_from(scroll_rows).unwrap_or(usize::MAX).saturating_add(1);
        let position = usize::try_from(state.scroll_top())
            .unwrap_or(usize::MAX)
            .min(scroll_len.saturating_sub(1));
        let mut scrollbar_state = ScrollbarState::new(scroll_len)
            .position(position)
            .viewport_content_length(usize::try_from(inner_height).unwrap_or(0));
        Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .render(area, buf, &mut scrollbar_state);
    }
}

impl<L: RowLabelRenderer> StatefulWidget for ClipListView<'_, L> {
    type State = ListManager;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let block = self.block();
        let inner = block.inner(area);
        block.render(area, buf);

        let inner_height = u32::from(inner.height);
        state.sync_viewport(inner_height, Instant::now());
        state.prepare_frame();

        if state.view().is_empty() {
            self.render_empty(inner, buf);
            return;
        }

        let scrolls = self.style.show_scrollbar && state.total_height() > inner_height && inner.width > 1;
        let rows_area = if scrolls {
            Rect {
                width: inner.width - 1,
                ..inner
            }
        } else {
            inner
        };
        self.render_rows(rows_area, buf, state);

        if scrolls {
            let scrollbar_area = Rect {
                x: inner.right() - 1,
                width: 1,
                ..inner
            };
            self.render_scrollbar(scrollbar_area, buf, state, inner_height);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ListConfig;
    use crate::item::{ClipItem, ListKind};

    fn manager(count: usize) -> ListManager {
        let items = (0..count)
            .map(|i| ClipItem::text(format!("id{i}"), format!("entry {i}")))
            .collect();
        ListManager::with_items(ListKind::History, ListConfig::new().with_estimated_row_height(1), items)
    }

    fn row_text(buffer: &Buffer, y: u16) -> String {
        let area = buffer.area;
        (area.x..area.right())
            .map(|x| buffer[(x, y)].symbol())
            .collect::<String>()
    }

    #[test]
    fn render_smoke_with_scrollbar() {
        let mut state = manager(12);
        let widget = ClipListView::new(ClipListStyle::default());

        let area = Rect::new(0, 0, 20, 6);
        let mut buffer = Buffer::empty(area);

        widget.render(area, &mut buffer, &mut state);
        assert_eq!(state.viewport_height(), 4);
        assert!(row_text(&buffer, 1).contains("entry 0"));
    }

    #[test]
    fn empty_view_draws_placeholder() {
        let mut state = manager(0);
        let style = ClipListStyle::default().empty_text("no clips");
        let area = Rect::new(0, 0, 20, 4);
        let mut buffer = Buffer::empty(area);

        ClipListView::new(style).render(area, &mut buffer, &mut state);
        assert!(row_text(&buffer, 1).contains("no clips"));
    }

    #[test]
    fn only_scrolled_rows_are_drawn() {
        let mut state = manager(30);
        let area = Rect::new(0, 0, 24, 7);
        let mut buffer = Buffer::empty(area);
        ClipListView::new(ClipListStyle::default()).render(area, &mut buffer, &mut state);

        state.scroll_to(10, Instant::now());
        let mut buffer = Buffer::empty(area);
        ClipListView::new(ClipListStyle::default())
            .glyphs(ClipGlyphs::ascii())
            .render(area, &mut buffer, &mut state);

        assert!(row_text(&buffer, 1).contains("entry 10"));
        assert!(row_text(&buffer, 5).contains("entry 14"));
        assert!(state.rows().len() < 30);
    }

    #[test]
    fn titled_quick_text_shows_its_body() {
        let kind = ListKind::QuickTexts {
            group_order: Vec::new(),
        };
        let items = vec![ClipItem::text("q1", "hello body").with_title("Greeting")];
        let mut state = ListManager::with_items(kind, ListConfig::new().with_estimated_row_height(1), items);
        let area = Rect::new(0, 0, 24, 6);

        ClipListView::new(ClipListStyle::default()).render(area, &mut Buffer::empty(area), &mut state);
        let mut buffer = Buffer::empty(area);
        ClipListView::new(ClipListStyle::default()).render(area, &mut buffer, &mut state);

        assert_eq!(state.heights().height(0), 2);
        assert!(row_text(&buffer, 1).contains("Greeting"));
        assert!(row_text(&buffer, 2).contains("hello body"));
    }
}
