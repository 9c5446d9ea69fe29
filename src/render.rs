//! Retained row slots for the render window.
//!
//! The renderer keeps one [`RowNode`] per materialized position. Nodes whose
//! item is still inside the window survive a render untouched, so in-flight
//! drags and asset loads bound to them are not interrupted. Nodes leaving the
//! window are reported in [`RenderDiff::removed`] so their observers can be
//! released.

use std::sync::Arc;

use rustc_hash::{FxBuildHasher, FxHashMap};
use smallvec::SmallVec;

use crate::filter::{FilteredView, html_to_plain};
use crate::height::HeightModel;
use crate::item::{ClipItem, ContentType, FileEntry, ItemDataError, ItemKey};
use crate::window::RenderWindow;

/// Identity of a materialized row slot. Never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    #[cfg(test)]
    pub(crate) const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Display payload derived from an item when its row slot is created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RowContent {
    Text(String),
    Link(String),
    Image { asset_id: String },
    Files(Vec<FileEntry>),
    RichText(String),
    /// The item payload could not be decoded; only this row degrades.
    Invalid(ItemDataError),
}

impl RowContent {
    pub fn from_item(item: &ClipItem) -> Self {
        match item.content_type {
            ContentType::Text => Self::Text(item.text.clone()),
            ContentType::Link => Self::Link(item.text.clone()),
            ContentType::Image => Self::Image {
                asset_id: item.image_id.clone().unwrap_or_default(),
            },
            ContentType::File => match item.parse_files() {
                Ok(files) => Self::Files(files),
                Err(err) => Self::Invalid(err),
            },
            ContentType::RichText => Self::RichText(
                item.html
                    .as_deref()
                    .map_or_else(|| item.text.clone(), |html| html_to_plain(html).trim().to_owned()),
            ),
        }
    }
}

/// A materialized row.
#[derive(Clone, Debug)]
pub struct RowNode {
    pub(crate) id: NodeId,
    pub(crate) key: ItemKey,
    // Filtered-view position ("data-index").
    pub(crate) position: usize,
    pub(crate) original: usize,
    pub(crate) item: Arc<ClipItem>,
    pub(crate) content: RowContent,
}

impl RowNode {
    #[inline]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    pub const fn key(&self) -> &ItemKey {
        &self.key
    }

    /// Position of the row in the filtered view.
    #[inline]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Index of the row's item in the original collection.
    #[inline]
    pub const fn original(&self) -> usize {
        self.original
    }

    #[inline]
    pub fn item(&self) -> &ClipItem {
        &self.item
    }

    #[inline]
    pub const fn content(&self) -> &RowContent {
        &self.content
    }
}

/// Computes a row's height once it has been laid out.
pub trait RowMeasure {
    fn measure(&self, node: &RowNode) -> u32;
}

impl<F> RowMeasure for F
where
    F: Fn(&RowNode) -> u32,
{
    #[inline]
    fn measure(&self, node: &RowNode) -> u32 {
        self(node)
    }
}

/// Line-count based measurement for terminal rows.
#[derive(Clone, Copy, Debug)]
pub struct LineMeasure {
    pub max_preview_lines: u32,
    pub image_rows: u32,
}

impl RowMeasure for LineMeasure {
    fn measure(&self, node: &RowNode) -> u32 {
        let max = self.max_preview_lines.max(1);
        // Titled rows draw the title on a line of its own.
        let titled = node.item.title.is_some();
        let clamp = |count: usize| {
            u32::try_from(count + usize::from(titled))
                .unwrap_or(u32::MAX)
                .clamp(1, max)
        };
        match &node.content {
            RowContent::Text(text) | RowContent::Link(text) | RowContent::RichText(text) => {
                clamp(text.lines().count())
            }
            RowContent::Files(files) => clamp(files.len()),
            RowContent::Image { .. } => self.image_rows.max(1 + u32::from(titled)),
            RowContent::Invalid(_) => 1,
        }
    }
}

/// Changes applied by a single render pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderDiff {
    pub created: SmallVec<[NodeId; 16]>,
    pub removed: SmallVec<[NodeId; 16]>,
    /// Retained nodes whose position attributes changed.
    pub updated: usize,
    pub spacers_changed: bool,
}

impl RenderDiff {
    /// Returns `true` if the pass touched nothing.
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.removed.is_empty() && self.updated == 0 && !self.spacers_changed
    }
}

/// Reconciles row slots with the current window.
#[derive(Debug, Default)]
pub struct Renderer {
    nodes: Vec<RowNode>,
    window: RenderWindow,
    next_id: u64,
    pending_measure: SmallVec<[NodeId; 16]>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Materialized rows in display order.
    #[inline]
    pub fn nodes(&self) -> &[RowNode] {
        &self.nodes
    }

    #[inline]
    pub const fn window(&self) -> RenderWindow {
        self.window
    }

    pub fn node(&self, id: NodeId) -> Option<&RowNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Returns the row at a window-relative (visual) index.
    pub fn node_at_visual(&self, visual: usize) -> Option<&RowNode> {
        self.nodes.get(visual)
    }

    /// Returns the row that carries the given filtered-view position.
    pub fn node_at_position(&self, position: usize) -> Option<&RowNode> {
        self.nodes.iter().find(|node| node.position == position)
    }

    /// Nodes created but not yet measured.
    pub fn pending_measure(&self) -> &[NodeId] {
        &self.pending_measure
    }

    /// Drops every node, forcing the next render to rebuild all rows.
    pub fn clear(&mut self) -> SmallVec<[NodeId; 16]> {
        self.pending_measure.clear();
        self.window = RenderWindow::EMPTY;
        self.nodes.drain(..).map(|node| node.id).collect()
    }

    /// Queues every materialized row for measurement again. Used after the
    /// height model was reset under retained rows.
    pub fn invalidate_measurements(&mut self) {
        self.pending_measure.clear();
        self.pending_measure.extend(self.nodes.iter().map(|node| node.id));
    }

    /// Brings the row slots in line with `window`.
    pub fn render(
        &mut self,
        items: &[Arc<ClipItem>],
        view: &FilteredView,
        window: RenderWindow,
    ) -> RenderDiff {
        let mut diff = RenderDiff {
            spacers_changed: self.window.before != window.before || self.window.after != window.after,
            ..RenderDiff::default()
        };

        let mut removed: SmallVec<[NodeId; 16]> = SmallVec::new();
        let mut previous: FxHashMap<ItemKey, RowNode> =
            FxHashMap::with_capacity_and_hasher(self.nodes.len(), FxBuildHasher);
        for node in self.nodes.drain(..) {
            // Two items sharing a key cannot both keep their slot.
            if let Some(displaced) = previous.insert(node.key.clone(), node) {
                tracing::warn!(key = %displaced.key, "duplicate item key in render window");
                removed.push(displaced.id);
            }
        }

        let mut next = Vec::with_capacity(window.len());
        for position in window.range() {
            let Some(original) = view.original(position) else {
                break;
            };
            let Some(item) = items.get(original) else {
                break;
            };
            let retained = match previous.remove(&item.key) {
                Some(node) if Arc::ptr_eq(&node.item, item) || *node.item == **item => Some(node),
                Some(stale) => {
                    removed.push(stale.id);
                    None
                }
                None => None,
            };
            let node = match retained {
                Some(mut node) => {
                    if node.position != position || node.original != original {
                        node.position = position;
                        node.original = original;
                        diff.updated += 1;
                    }
                    node.item = Arc::clone(item);
                    node
                }
                None => {
                    let id = NodeId(self.next_id);
                    self.next_id += 1;
                    self.pending_measure.push(id);
                    diff.created.push(id);
                    RowNode {
                        id,
                        key: item.key.clone(),
                        position,
                        original,
                        item: Arc::clone(item),
                        content: RowContent::from_item(item),
                    }
                }
            };
            next.push(node);
        }

        removed.extend(previous.into_values().map(|node| node.id));
        removed.sort_unstable();
        self.pending_measure.retain(|id| !removed.contains(id));
        diff.removed = removed;

        self.nodes = next;
        self.window = window;
        diff
    }

    /// Feeds measured heights of freshly created rows back into the height
    /// model and resizes the spacers in place. Never reconciles rows.
    pub fn flush_measurements<M: RowMeasure>(&mut self, heights: &mut HeightModel, measure: &M) -> bool {
        if self.pending_measure.is_empty() {
            return false;
        }
        let mut changed = false;
        for id in std::mem::take(&mut self.pending_measure) {
            let Some(node) = self.nodes.iter().find(|node| node.id == id) else {
                continue;
            };
            changed |= heights.set_height(node.position, measure.measure(node)) != 0;
        }
        self.window.refresh_spacers(heights);
        changed
    }

    /// Rows with their absolute top offset and height.
    pub fn layout<'a>(&'a self, heights: &'a HeightModel) -> impl Iterator<Item = (&'a RowNode, u32, u32)> + 'a {
        let mut top = self.window.before;
        self.nodes.iter().map(move |node| {
            let height = heights.height(node.position);
            let row = (node, top, height);
            top = top.saturating_add(height);
            row
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterPipeline, FilterState};
    use crate::item::ListKind;
    use crate::window::WindowCalculator;

    fn items(count: usize) -> Vec<Arc<ClipItem>> {
        (0..count)
            .map(|idx| Arc::new(ClipItem::text(format!("k{idx}"), format!("line {idx}"))))
            .collect()
    }

    fn setup(count: usize) -> (Vec<Arc<ClipItem>>, FilteredView, HeightModel) {
        let items = items(count);
        let view = FilterPipeline::apply_state(&items, &FilterState::default(), &ListKind::History);
        let heights = HeightModel::new(view.len(), 1);
        (items, view, heights)
    }

    #[test]
    fn second_render_without_changes_is_noop() {
        let (items, view, heights) = setup(50);
        let mut calc = WindowCalculator::new(2);
        let mut renderer = Renderer::new();
        let window = calc.compute(&heights, 10, 5);

        let first = renderer.render(&items, &view, window);
        assert_eq!(first.created.len(), window.len());
        let second = renderer.render(&items, &view, window);
        assert!(second.is_noop());
    }

    #[test]
    fn scrolling_keeps_overlapping_nodes() {
        let (items, view, heights) = setup(50);
        let mut calc = WindowCalculator::new(0);
        let mut renderer = Renderer::new();

        renderer.render(&items, &view, calc.compute(&heights, 0, 10));
        let kept: Vec<_> = renderer.nodes()[3..].iter().map(RowNode::id).collect();

        let diff = renderer.render(&items, &view, calc.compute(&heights, 3, 10));
        assert_eq!(diff.created.len(), 3);
        assert_eq!(diff.removed.len(), 3);
        let now: Vec<_> = renderer.nodes()[..7].iter().map(RowNode::id).collect();
        assert_eq!(kept, now);
    }

    #[test]
    fn replaced_item_gets_fresh_node() {
        let (mut items, view, heights) = setup(5);
        let mut calc = WindowCalculator::new(0);
        let mut renderer = Renderer::new();
        let window = calc.compute(&heights, 0, 5);
        renderer.render(&items, &view, window);
        let old = renderer.nodes()[2].id();

        items[2] = Arc::new(ClipItem::text("k2", "edited"));
        let diff = renderer.render(&items, &view, window);
        assert_eq!(diff.removed.as_slice(), &[old]);
        assert_eq!(diff.created.len(), 1);
    }

    #[test]
    fn measurements_resize_spacers_without_reconcile() {
        let (items, view, mut heights) = setup(30);
        let mut calc = WindowCalculator::new(0);
        let mut renderer = Renderer::new();
        renderer.render(&items, &view, calc.compute(&heights, 0, 4));
        let before = renderer.nodes().iter().map(RowNode::id).collect::<Vec<_>>();

        let changed = renderer.flush_measurements(&mut heights, &|_: &RowNode| 3u32);
        assert!(changed);
        assert!(renderer.pending_measure().is_empty());
        assert_eq!(heights.total(), 4 * 3 + 26);
        assert_eq!(renderer.window().after, 26);
        let after = renderer.nodes().iter().map(RowNode::id).collect::<Vec<_>>();
        assert_eq!(before, after);
    }

    #[test]
    fn malformed_file_row_degrades_alone() {
        let items = vec![
            Arc::new(ClipItem::files("bad", "[{")),
            Arc::new(ClipItem::text("ok", "fine")),
        ];
        let view = FilterPipeline::apply_state(&items, &FilterState::default(), &ListKind::History);
        let heights = HeightModel::new(view.len(), 1);
        let mut renderer = Renderer::new();
        renderer.render(&items, &view, WindowCalculator::new(0).compute(&heights, 0, 5));
        assert!(matches!(renderer.nodes()[0].content(), RowContent::Invalid(_)));
        assert_eq!(renderer.nodes()[1].content(), &RowContent::Text("fine".into()));
    }

    #[test]
    fn line_measure_clamps_preview() {
        let measure = LineMeasure {
            max_preview_lines: 3,
            image_rows: 4,
        };
        let items = vec![
            Arc::new(ClipItem::text("a", "1\n2\n3\n4\n5")),
            Arc::new(ClipItem::image("b", "img")),
        ];
        let view = FilteredView::from_indices(vec![0, 1]);
        let mut renderer = Renderer::new();
        renderer.render(
            &items,
            &view,
            RenderWindow {
                start: 0,
                end: 2,
                before: 0,
                after: 0,
            },
        );
        assert_eq!(measure.measure(&renderer.nodes()[0]), 3);
        assert_eq!(measure.measure(&renderer.nodes()[1]), 4);
    }

    #[test]
    fn titled_row_reserves_a_title_line() {
        let measure = LineMeasure {
            max_preview_lines: 3,
            image_rows: 1,
        };
        let items = vec![
            Arc::new(ClipItem::text("q1", "hello body").with_title("Greeting")),
            Arc::new(ClipItem::text("q2", "a\nb\nc").with_title("Long")),
            Arc::new(ClipItem::image("q3", "img").with_title("Shot")),
        ];
        let view = FilteredView::from_indices(vec![0, 1, 2]);
        let mut renderer = Renderer::new();
        renderer.render(
            &items,
            &view,
            RenderWindow {
                start: 0,
                end: 3,
                before: 0,
                after: 0,
            },
        );
        assert_eq!(measure.measure(&renderer.nodes()[0]), 2);
        assert_eq!(measure.measure(&renderer.nodes()[1]), 3);
        assert_eq!(measure.measure(&renderer.nodes()[2]), 2);
    }

    #[test]
    fn duplicate_keys_release_displaced_rows() {
        let items = vec![
            Arc::new(ClipItem::text("same", "first")),
            Arc::new(ClipItem::text("same", "second")),
        ];
        let view = FilteredView::from_indices(vec![0, 1]);
        let window = RenderWindow {
            start: 0,
            end: 2,
            before: 0,
            after: 0,
        };
        let mut renderer = Renderer::new();
        let first = renderer.render(&items, &view, window);
        assert_eq!(first.created.len(), 2);

        let second = renderer.render(&items, &view, window);
        let live: Vec<NodeId> = renderer.nodes().iter().map(RowNode::id).collect();
        for id in first.created {
            assert!(live.contains(&id) || second.removed.contains(&id));
        }
    }
}
