use std::sync::{Arc, LazyLock};

use regex::Regex;
use rustc_hash::{FxBuildHasher, FxHashMap};
use serde::{Deserialize, Serialize};

use crate::item::{ClipItem, ContentType, ListKind};

static URL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:https?://|ftp://|www\.)[^\s<>]+").ok());

static TAG_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^>]*>").ok());

/// Content-type filter selected by the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeFilter {
    #[default]
    All,
    Text,
    Link,
    Image,
    File,
    RichText,
}

impl TypeFilter {
    pub const ALL: [Self; 6] = [
        Self::All,
        Self::Text,
        Self::Link,
        Self::Image,
        Self::File,
        Self::RichText,
    ];

    /// Returns the next filter in cycling order.
    #[must_use]
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

/// Current type filter, search term and (for quick texts) selected group.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterState {
    pub type_filter: TypeFilter,
    pub search_term: String,
    /// `None` shows every group using the group-order override.
    pub group: Option<String>,
}

impl FilterState {
    pub fn new(type_filter: TypeFilter, search_term: impl Into<String>) -> Self {
        Self {
            type_filter,
            search_term: search_term.into(),
            group: None,
        }
    }

    /// Returns `true` if no filter narrows the collection.
    pub fn is_identity(&self) -> bool {
        self.type_filter == TypeFilter::All
            && self.search_term.trim().is_empty()
            && self.group.is_none()
    }
}

/// Visibility predicate over items (used to build a filtered view).
pub trait ItemFilter {
    /// Returns `true` if the item matches the filter criteria.
    fn is_match(&self, item: &ClipItem) -> bool;
}

impl<F> ItemFilter for F
where
    F: Fn(&ClipItem) -> bool,
{
    #[inline]
    fn is_match(&self, item: &ClipItem) -> bool {
        self(item)
    }
}

/// Filter that matches every item.
#[derive(Clone, Copy, Debug)]
pub struct NoFilter;

impl ItemFilter for NoFilter {
    #[inline]
    fn is_match(&self, _item: &ClipItem) -> bool {
        true
    }
}

impl ItemFilter for FilterState {
    fn is_match(&self, item: &ClipItem) -> bool {
        if let Some(group) = self.group.as_deref()
            && item.group_id.as_deref() != Some(group)
        {
            return false;
        }
        matches_type(item, self.type_filter) && matches_search(item, &self.search_term)
    }
}

/// Returns `true` if the text contains something that looks like a URL.
pub fn contains_url(text: &str) -> bool {
    URL_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(text))
}

/// Strips tags and the common entities from an HTML body.
pub fn html_to_plain(html: &str) -> String {
    let stripped = TAG_PATTERN
        .as_ref()
        .map_or_else(|| html.to_owned(), |pattern| pattern.replace_all(html, " ").into_owned());
    stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Type filter with the link and rich-text alias rules.
pub fn matches_type(item: &ClipItem, filter: TypeFilter) -> bool {
    match filter {
        TypeFilter::All => true,
        TypeFilter::Text => matches!(item.content_type, ContentType::Text | ContentType::RichText),
        TypeFilter::Link => {
            item.content_type == ContentType::Link
                || contains_url(&item.text)
                || item.file_list.as_deref().is_some_and(contains_url)
        }
        TypeFilter::Image => item.content_type == ContentType::Image,
        TypeFilter::File => item.content_type == ContentType::File,
        TypeFilter::RichText => item.content_type == ContentType::RichText,
    }
}

/// Case-insensitive search over content, title, file metadata and HTML text.
pub fn matches_search(item: &ClipItem, term: &str) -> bool {
    let term = term.trim();
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    let hit = |haystack: &str| haystack.to_lowercase().contains(&needle);

    if hit(&item.text) || item.title.as_deref().is_some_and(hit) {
        return true;
    }
    if item.content_type == ContentType::File
        && let Ok(files) = item.parse_files()
        && files
            .iter()
            .any(|file| hit(&format!("{} {} {}", file.name, file.path, file.kind)))
    {
        return true;
    }
    if item.content_type == ContentType::RichText
        && let Some(html) = item.html.as_deref()
    {
        return hit(&html_to_plain(html));
    }
    false
}

/// Ordered positions into the original collection that pass the filter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilteredView {
    indices: Vec<usize>,
    // Reverse lookup from original index to view position.
    positions: FxHashMap<usize, usize>,
}

impl FilteredView {
    pub fn from_indices(indices: Vec<usize>) -> Self {
        let mut positions = FxHashMap::with_capacity_and_hasher(indices.len(), FxBuildHasher);
        for (pos, original) in indices.iter().copied().enumerate() {
            positions.insert(original, pos);
        }
        Self { indices, positions }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Maps a view position to its original-collection index.
    #[inline]
    pub fn original(&self, pos: usize) -> Option<usize> {
        self.indices.get(pos).copied()
    }

    /// Maps an original-collection index to its view position.
    #[inline]
    pub fn position_of(&self, original: usize) -> Option<usize> {
        self.positions.get(&original).copied()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }
}

/// Derives the filtered view from the collection and filter state.
pub struct FilterPipeline;

impl FilterPipeline {
    /// Applies `filter` to `items`, keeping original order unless the list is
    /// a quick-text "all groups" view, which is ordered by group rank.
    pub fn apply<F: ItemFilter>(items: &[Arc<ClipItem>], filter: &F, kind: &ListKind) -> FilteredView {
        Self::apply_ordered(items, filter, kind, true)
    }

    pub fn apply_state(items: &[Arc<ClipItem>], state: &FilterState, kind: &ListKind) -> FilteredView {
        Self::apply_ordered(items, state, kind, state.group.is_none())
    }

    fn apply_ordered<F: ItemFilter>(
        items: &[Arc<ClipItem>],
        filter: &F,
        kind: &ListKind,
        group_override: bool,
    ) -> FilteredView {
        let mut indices: Vec<usize> = items
            .iter()
            .enumerate()
            .filter_map(|(idx, item)| filter.is_match(item).then_some(idx))
            .collect();

        if group_override && let ListKind::QuickTexts { group_order } = kind {
            let mut ranks: FxHashMap<&str, usize> =
                FxHashMap::with_capacity_and_hasher(group_order.len(), FxBuildHasher);
            for (rank, group) in group_order.iter().enumerate() {
                ranks.entry(group.as_str()).or_insert(rank);
            }
            let rank = |idx: &usize| {
                items[*idx]
                    .group_id
                    .as_deref()
                    .and_then(|group| ranks.get(group).copied())
                    .unwrap_or(group_order.len())
            };
            // Stable sort keeps intra-group order.
            indices.sort_by_key(rank);
        }

        FilteredView::from_indices(indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arcs(items: Vec<ClipItem>) -> Vec<Arc<ClipItem>> {
        items.into_iter().map(Arc::new).collect()
    }

    fn mixed() -> Vec<Arc<ClipItem>> {
        arcs((0..12)
            .map(|idx| {
                if [2, 5, 9].contains(&idx) {
                    ClipItem::image(format!("i{idx}"), format!("img-{idx}"))
                } else {
                    ClipItem::text(format!("t{idx}"), format!("note {idx}"))
                }
            })
            .collect())
    }

    #[test]
    fn identity_filter_yields_full_sequence() {
        let items = mixed();
        let view = FilterPipeline::apply_state(&items, &FilterState::default(), &ListKind::History);
        assert_eq!(view.as_slice(), (0..items.len()).collect::<Vec<_>>().as_slice());
    }

    #[test]
    fn image_filter_keeps_original_order() {
        let items = mixed();
        let state = FilterState::new(TypeFilter::Image, "");
        let view = FilterPipeline::apply_state(&items, &state, &ListKind::History);
        assert_eq!(view.as_slice(), &[2, 5, 9]);
        assert_eq!(view.position_of(5), Some(1));
        assert_eq!(view.original(2), Some(9));
    }

    #[test]
    fn link_filter_matches_embedded_urls() {
        let items = arcs(vec![
            ClipItem::text("a", "see https://example.com/docs for details"),
            ClipItem::text("b", "plain words"),
            ClipItem::text("c", "example.com").with_content_type(ContentType::Link),
            ClipItem::files("d", r#"[{"name":"x","path":"www.host.org/x","type":""}]"#),
        ]);
        let view = FilterPipeline::apply_state(
            &items,
            &FilterState::new(TypeFilter::Link, ""),
            &ListKind::History,
        );
        assert_eq!(view.as_slice(), &[0, 2, 3]);
    }

    #[test]
    fn text_filter_includes_rich_text() {
        let items = arcs(vec![
            ClipItem::rich_text("r", "bold", "<b>bold</b>"),
            ClipItem::image("i", "img"),
            ClipItem::text("t", "plain"),
        ]);
        let view = FilterPipeline::apply_state(
            &items,
            &FilterState::new(TypeFilter::Text, ""),
            &ListKind::History,
        );
        assert_eq!(view.as_slice(), &[0, 2]);
    }

    #[test]
    fn search_covers_title_files_and_html() {
        let items = arcs(vec![
            ClipItem::text("q", "body").with_title("Greeting Template"),
            ClipItem::files("f", r#"[{"name":"Report.pdf","path":"/docs","type":"application/pdf"}]"#),
            ClipItem::rich_text("r", "", "<p>Quarterly <em>Numbers</em></p>"),
            ClipItem::files("bad", "{oops"),
        ]);
        let search = |term: &str| {
            FilterPipeline::apply_state(&items, &FilterState::new(TypeFilter::All, term), &ListKind::History)
                .as_slice()
                .to_vec()
        };
        assert_eq!(search("greeting"), vec![0]);
        assert_eq!(search("REPORT"), vec![1]);
        assert_eq!(search("application/pdf"), vec![1]);
        assert_eq!(search("numbers"), vec![2]);
        assert!(search("oops").is_empty());
    }

    #[test]
    fn html_to_plain_strips_tags_and_entities() {
        assert_eq!(html_to_plain("<b>a</b>&amp;b").trim(), "a &b");
    }

    #[test]
    fn all_groups_view_orders_by_group_rank() {
        let items = arcs(vec![
            ClipItem::text("a1", "a1").with_group("a"),
            ClipItem::text("b1", "b1").with_group("b"),
            ClipItem::text("a2", "a2").with_group("a"),
            ClipItem::text("b2", "b2").with_group("b"),
            ClipItem::text("x", "x"),
        ]);
        let kind = ListKind::QuickTexts {
            group_order: vec!["b".into(), "a".into()],
        };
        let view = FilterPipeline::apply_state(&items, &FilterState::default(), &kind);
        assert_eq!(view.as_slice(), &[1, 3, 0, 2, 4]);

        let state = FilterState {
            group: Some("a".into()),
            ..FilterState::default()
        };
        let view = FilterPipeline::apply_state(&items, &state, &kind);
        assert_eq!(view.as_slice(), &[0, 2]);
    }

    #[test]
    fn repeated_group_in_order_keeps_first_rank() {
        let items = arcs(vec![
            ClipItem::text("c1", "c1").with_group("c"),
            ClipItem::text("a1", "a1").with_group("a"),
            ClipItem::text("z1", "z1").with_group("unknown"),
            ClipItem::text("b1", "b1").with_group("b"),
        ]);
        let kind = ListKind::QuickTexts {
            group_order: vec!["a".into(), "b".into(), "a".into(), "c".into()],
        };
        let view = FilterPipeline::apply_state(&items, &FilterState::default(), &kind);
        assert_eq!(view.as_slice(), &[1, 3, 0, 2]);
    }

    #[test]
    fn closures_act_as_filters() {
        let items = mixed();
        let view = FilterPipeline::apply(&items, &|item: &ClipItem| item.text.ends_with('1'), &ListKind::History);
        assert_eq!(view.as_slice(), &[1, 11]);
    }

    #[test]
    fn type_filter_cycles() {
        assert_eq!(TypeFilter::RichText.next(), TypeFilter::All);
        assert_eq!(TypeFilter::All.next(), TypeFilter::Text);
    }
}
