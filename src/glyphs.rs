use ratatui::text::{Line, Span};

use crate::context::RowContext;
use crate::item::ContentType;
use crate::loader::AssetState;
use crate::render::{RowContent, RowNode};

#[derive(Clone, Copy)]
pub struct ClipGlyphs<'a> {
    pub text: &'a str,
    pub link: &'a str,
    pub image: &'a str,
    pub file: &'a str,
    pub rich_text: &'a str,
    pub waiting: &'a str,
    pub loading: &'a str,
    pub failed: &'a str,
    pub invalid: &'a str,
    pub drag: &'a str,
    pub indent: &'a str,
}

impl ClipGlyphs<'static> {
    pub const fn unicode() -> Self {
        Self {
            text: "¶",
            link: "⛓",
            image: "▣",
            file: "▤",
            rich_text: "✎",
            waiting: "◌",
            loading: "…",
            failed: "✗",
            invalid: "⚠",
            drag: "⇅",
            indent: "  ",
        }
    }

    pub const fn ascii() -> Self {
        Self {
            text: "T",
            link: "@",
            image: "#",
            file: "F",
            rich_text: "R",
            waiting: ".",
            loading: "~",
            failed: "x",
            invalid: "!",
            drag: "=",
            indent: "  ",
        }
    }
}

impl<'a> ClipGlyphs<'a> {
    pub const fn badge(&self, content_type: ContentType) -> &'a str {
        match content_type {
            ContentType::Text => self.text,
            ContentType::Link => self.link,
            ContentType::Image => self.image,
            ContentType::File => self.file,
            ContentType::RichText => self.rich_text,
        }
    }
}

/// Produces the lines drawn for one materialized row.
pub trait RowLabelRenderer {
    fn lines<'a>(&'a self, node: &'a RowNode, ctx: &RowContext<'_>, glyphs: &ClipGlyphs<'a>) -> Vec<Line<'a>>;
}

/// Badge plus a content preview; the stock row look.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultRowLabel;

impl RowLabelRenderer for DefaultRowLabel {
    fn lines<'a>(&'a self, node: &'a RowNode, ctx: &RowContext<'_>, glyphs: &ClipGlyphs<'a>) -> Vec<Line<'a>> {
        row_lines(node, ctx, glyphs)
    }
}

pub fn row_lines<'a>(node: &'a RowNode, ctx: &RowContext<'_>, glyphs: &ClipGlyphs<'a>) -> Vec<Line<'a>> {
    let max = usize::from(ctx.height.max(1));
    let badge = if ctx.is_dragged {
        glyphs.drag
    } else {
        glyphs.badge(node.item().content_type)
    };
    let lead = |first: bool| {
        if first {
            Span::styled(badge, ctx.badge_style)
        } else {
            Span::raw(" ")
        }
    };

    let mut lines = Vec::with_capacity(max);
    if let Some(title) = node.item().title.as_deref() {
        lines.push(Line::from(vec![lead(true), Span::raw(" "), Span::raw(title)]));
    }

    match node.content() {
        RowContent::Text(text) | RowContent::Link(text) | RowContent::RichText(text) => {
            let take = max.saturating_sub(lines.len()).max(1);
            for line in text.lines().take(take) {
                let first = lines.is_empty();
                lines.push(Line::from(vec![lead(first), Span::raw(" "), Span::raw(line)]));
            }
            if lines.is_empty() {
                lines.push(Line::from(lead(true)));
            }
        }
        RowContent::Image { asset_id } => {
            let first = lines.is_empty();
            let status = match ctx.asset {
                Some(AssetState::Loaded(url)) => Span::raw(format!("{asset_id} ({} bytes)", url.len())),
                Some(AssetState::Failed(err)) => {
                    Span::styled(format!("{} {err}", glyphs.failed), ctx.error_style)
                }
                Some(AssetState::Loading) => {
                    Span::styled(format!("{} loading {asset_id}", glyphs.loading), ctx.muted_style)
                }
                Some(AssetState::Waiting) | None => {
                    Span::styled(format!("{} {asset_id}", glyphs.waiting), ctx.muted_style)
                }
            };
            lines.push(Line::from(vec![lead(first), Span::raw(" "), status]));
        }
        RowContent::Files(files) => {
            let room = max.saturating_sub(lines.len()).max(1);
            let hidden = files.len().saturating_sub(room);
            let shown = if hidden > 0 { room - 1 } else { room };
            for file in files.iter().take(shown) {
                let first = lines.is_empty();
                lines.push(Line::from(vec![lead(first), Span::raw(" "), Span::raw(file.name.as_str())]));
            }
            if hidden > 0 {
                let first = lines.is_empty();
                lines.push(Line::from(vec![
                    lead(first),
                    Span::styled(format!("{}+{} more", glyphs.indent, hidden + 1), ctx.muted_style),
                ]));
            }
            if lines.is_empty() {
                lines.push(Line::from(lead(true)));
            }
        }
        RowContent::Invalid(_) => {
            lines.clear();
            lines.push(Line::from(vec![
                Span::styled(glyphs.invalid, ctx.error_style),
                Span::styled(" data parse error", ctx.error_style),
            ]));
        }
    }
    lines.truncate(max);
    lines
}
