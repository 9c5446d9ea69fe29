use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::Borders;

/// Политика скролла при изменении выбранной строки.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ScrollPolicy {
    #[default]
    KeepInView,
    CenterOnSelect,
}

/// Визуальные настройки виджета списка.
#[derive(Clone)]
pub struct ClipListStyle<'a> {
    pub title: Option<Line<'a>>,
    pub block_style: Style,
    pub border_style: Style,
    pub highlight_style: Style,
    /// Стиль строки, которую сейчас перетаскивают.
    pub drag_style: Style,
    pub badge_style: Style,
    /// Второстепенный текст: статус загрузки, пустой список.
    pub muted_style: Style,
    pub error_style: Style,
    pub highlight_symbol: &'a str,
    pub empty_text: &'a str,
    pub borders: Borders,
    pub show_scrollbar: bool,
}

impl Default for ClipListStyle<'_> {
    fn default() -> Self {
        Self {
            title: None,
            block_style: Style::default(),
            border_style: Style::default(),
            highlight_style: Style::default().add_modifier(Modifier::REVERSED),
            drag_style: Style::default().add_modifier(Modifier::DIM),
            badge_style: Style::default().add_modifier(Modifier::BOLD),
            muted_style: Style::default().add_modifier(Modifier::DIM),
            error_style: Style::default().add_modifier(Modifier::ITALIC),
            highlight_symbol: ">> ",
            empty_text: "Nothing here yet",
            borders: Borders::ALL,
            show_scrollbar: true,
        }
    }
}

impl<'a> ClipListStyle<'a> {
    #[must_use]
    pub fn title(mut self, title: impl Into<Line<'a>>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub const fn borders(mut self, borders: Borders) -> Self {
        self.borders = borders;
        self
    }

    #[must_use]
    pub const fn highlight_style(mut self, style: Style) -> Self {
        self.highlight_style = style;
        self
    }

    #[must_use]
    pub const fn empty_text(mut self, text: &'a str) -> Self {
        self.empty_text = text;
        self
    }
}
