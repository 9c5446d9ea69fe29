//! Drag-to-reorder resolution.
//!
//! A drop is reported in rendered-window terms: the order of row slots after
//! the dragged row was moved among its rendered siblings. The resolver never
//! trusts the raw window index; it reads the filtered-view position carried by
//! a non-dragged neighbour and offsets it by the drag direction, then maps the
//! result through the filtered view onto the original collection.
//!
//! Invariants:
//! 1. `Idle -> Dragging -> {Idle, Committing} -> Idle`.
//! 2. While not idle, clicks on rows are suppressed.
//! 3. A committed move is a pure permutation of the original collection.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::filter::FilteredView;
use crate::item::{ClipItem, ItemKey, ListKind};
use crate::render::{NodeId, RowNode};

/// Reorder state machine phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DragPhase {
    #[default]
    Idle,
    Dragging,
    /// A resolved move is being persisted.
    Committing,
}

/// Ephemeral state captured on drag start.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DragSession {
    pub node: NodeId,
    pub key: ItemKey,
    /// Filtered-view position read from the dragged row.
    pub source_position: usize,
    /// Filtered-view generation the drag started against.
    pub generation: u64,
}

/// Rendered row order after the drop, as `(node, filtered position)` pairs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DropReport {
    pub dragged: NodeId,
    /// Window-relative index of the dragged row at drop time, `None` if it
    /// was scrolled out of the window during the drag.
    pub old_visual: Option<usize>,
    pub new_visual: usize,
    pub order: SmallVec<[(NodeId, usize); 32]>,
}

impl DropReport {
    /// Builds the sibling order a sortable list produces when the dragged
    /// row is dropped at `to_visual` of the current window.
    ///
    /// The dragged row is found by identity, not by the index it had when
    /// the drag started, since the window may have moved since. A row that
    /// left the window is inserted at the drop point with its recorded
    /// position.
    pub fn from_rendered(nodes: &[RowNode], session: &DragSession, to_visual: usize) -> Self {
        let is_dragged = |node: &RowNode| node.id() == session.node || node.key() == &session.key;
        let old_visual = nodes.iter().position(is_dragged);
        let mut order: SmallVec<[(NodeId, usize); 32]> = nodes
            .iter()
            .filter(|node| !is_dragged(node))
            .map(|node| (node.id(), node.position()))
            .collect();
        let new_visual = to_visual.min(order.len());
        order.insert(new_visual, (session.node, session.source_position));
        Self {
            dragged: session.node,
            old_visual,
            new_visual,
            order,
        }
    }
}

/// A move expressed in filtered-view positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    NotDragging,
    DraggedNodeMissing { node: NodeId },
    /// The report describes a different row than the one being dragged.
    ForeignRow { expected: NodeId, found: NodeId },
    NoNeighbor,
    OutOfBounds { position: usize, len: usize },
    StaleView { started: u64, current: u64 },
    ItemMissing { key: ItemKey },
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotDragging => f.write_str("drop without an active drag"),
            Self::DraggedNodeMissing { node } => {
                write!(f, "dragged row {} not found in drop order", node.get())
            }
            Self::ForeignRow { expected, found } => write!(
                f,
                "drop reported row {} while row {} is dragged",
                found.get(),
                expected.get()
            ),
            Self::NoNeighbor => f.write_str("dropped row has no rendered neighbour"),
            Self::OutOfBounds { position, len } => {
                write!(f, "position {position} outside filtered view (len={len})")
            }
            Self::StaleView { started, current } => {
                write!(f, "filtered view changed during drag (started={started}, current={current})")
            }
            Self::ItemMissing { key } => write!(f, "item {key} no longer in collection"),
        }
    }
}

impl std::error::Error for ResolveError {}

/// Tracks a drag gesture and resolves drops.
#[derive(Clone, Debug, Default)]
pub struct DragReorderResolver {
    phase: DragPhase,
    session: Option<DragSession>,
}

impl DragReorderResolver {
    pub const fn new() -> Self {
        Self {
            phase: DragPhase::Idle,
            session: None,
        }
    }

    #[inline]
    pub const fn phase(&self) -> DragPhase {
        self.phase
    }

    /// Returns `true` while a drag is active or being committed.
    #[inline]
    pub const fn is_dragging(&self) -> bool {
        !matches!(self.phase, DragPhase::Idle)
    }

    pub const fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    /// Starts a drag on a rendered row.
    pub fn start(&mut self, node: &RowNode, generation: u64) {
        self.session = Some(DragSession {
            node: node.id(),
            key: node.key().clone(),
            source_position: node.position(),
            generation,
        });
        self.phase = DragPhase::Dragging;
    }

    /// Abandons the drag without a move.
    pub fn cancel(&mut self) {
        self.session = None;
        self.phase = DragPhase::Idle;
    }

    /// Marks the commit as finished.
    pub fn finish(&mut self) {
        self.cancel();
    }

    /// Resolves a drop into filtered-view positions.
    ///
    /// Returns `Ok(None)` if the row did not move; the resolver then returns
    /// to idle. A resolved move leaves the resolver in `Committing` until
    /// [`finish`](Self::finish) is called. Errors also return it to idle.
    pub fn end(
        &mut self,
        report: &DropReport,
        view_len: usize,
        generation: u64,
    ) -> Result<Option<Resolution>, ResolveError> {
        let result = self.resolve(report, view_len, generation);
        match result {
            Ok(Some(_)) => self.phase = DragPhase::Committing,
            Ok(None) | Err(_) => self.cancel(),
        }
        result
    }

    fn resolve(
        &self,
        report: &DropReport,
        view_len: usize,
        generation: u64,
    ) -> Result<Option<Resolution>, ResolveError> {
        let session = match (&self.phase, &self.session) {
            (DragPhase::Dragging, Some(session)) => session,
            _ => return Err(ResolveError::NotDragging),
        };
        if session.generation != generation {
            return Err(ResolveError::StaleView {
                started: session.generation,
                current: generation,
            });
        }
        let from = session.source_position;
        if from >= view_len {
            return Err(ResolveError::OutOfBounds {
                position: from,
                len: view_len,
            });
        }
        if report.dragged != session.node {
            return Err(ResolveError::ForeignRow {
                expected: session.node,
                found: report.dragged,
            });
        }
        if report.old_visual == Some(report.new_visual) {
            return Ok(None);
        }

        let idx = report
            .order
            .iter()
            .position(|(node, _)| *node == report.dragged)
            .ok_or(ResolveError::DraggedNodeMissing {
                node: report.dragged,
            })?;
        let prev = idx.checked_sub(1).and_then(|i| report.order.get(i)).map(|(_, p)| *p);
        let next = report.order.get(idx + 1).map(|(_, p)| *p);

        // Direction comes from the neighbours' positions; the visual indices
        // are meaningless once the window has moved.
        let moving_down = match (prev, next) {
            (Some(p), _) => p > from,
            (None, Some(q)) => q > from,
            (None, None) => return Err(ResolveError::NoNeighbor),
        };
        // After removing `from`, everything past it shifts up by one.
        let after_prev = |p: usize| if p < from { p + 1 } else { p };
        let before_next = |q: usize| if q > from { q - 1 } else { q };
        let to = match (moving_down, prev, next) {
            (true, Some(p), _) | (false, Some(p), None) => after_prev(p),
            (false, _, Some(q)) | (true, None, Some(q)) => before_next(q),
            (_, None, None) => return Err(ResolveError::NoNeighbor),
        };
        let to = to.min(view_len - 1);

        if to == from {
            return Ok(None);
        }
        Ok(Some(Resolution { from, to }))
    }
}

/// A move ready to be persisted and applied to the original collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReorderPlan {
    pub key: ItemKey,
    /// Item the dragged one is placed next to.
    pub anchor: ItemKey,
    pub place_after: bool,
    /// `Some` when the item changes group.
    pub target_group: Option<String>,
    /// Destination index within the item's scope: the whole collection for
    /// history, the destination group for quick texts.
    pub scope_index: usize,
}

impl ReorderPlan {
    #[inline]
    pub const fn is_cross_group(&self) -> bool {
        self.target_group.is_some()
    }

    /// Maps a resolution through the filtered view onto the collection.
    pub fn build(
        items: &[Arc<ClipItem>],
        view: &FilteredView,
        resolution: Resolution,
        kind: &ListKind,
    ) -> Result<Self, ResolveError> {
        let out_of_bounds = |position| ResolveError::OutOfBounds {
            position,
            len: view.len(),
        };
        let from = view
            .original(resolution.from)
            .ok_or_else(|| out_of_bounds(resolution.from))?;
        let to = view
            .original(resolution.to)
            .ok_or_else(|| out_of_bounds(resolution.to))?;
        let (Some(moved), Some(anchor)) = (items.get(from), items.get(to)) else {
            return Err(out_of_bounds(from.max(to)));
        };

        let target_group = (kind.is_grouped() && moved.group_id != anchor.group_id)
            .then(|| anchor.group_id.clone().unwrap_or_default());
        let mut plan = Self {
            key: moved.key.clone(),
            anchor: anchor.key.clone(),
            place_after: resolution.to > resolution.from,
            target_group,
            scope_index: 0,
        };

        let mut preview = items.to_vec();
        apply_move(&mut preview, &plan)?;
        plan.scope_index = scope_index(&preview, &plan.key, kind.is_grouped())
            .ok_or_else(|| ResolveError::ItemMissing {
                key: plan.key.clone(),
            })?;
        Ok(plan)
    }
}

/// Moves the planned item next to its anchor, looking both up by key.
pub fn apply_move(items: &mut Vec<Arc<ClipItem>>, plan: &ReorderPlan) -> Result<(), ResolveError> {
    let from = items
        .iter()
        .position(|item| item.key == plan.key)
        .ok_or_else(|| ResolveError::ItemMissing {
            key: plan.key.clone(),
        })?;
    if !items.iter().any(|item| item.key == plan.anchor) {
        return Err(ResolveError::ItemMissing {
            key: plan.anchor.clone(),
        });
    }
    let mut moved = items.remove(from);
    if let Some(group) = plan.target_group.as_ref() {
        let group = (!group.is_empty()).then(|| group.clone());
        moved = Arc::new(moved.regrouped(group));
    }
    // Anchor existence was checked before removal.
    let anchor = items
        .iter()
        .position(|item| item.key == plan.anchor)
        .unwrap_or(from.min(items.len()));
    let at = if plan.place_after { anchor + 1 } else { anchor };
    items.insert(at.min(items.len()), moved);
    Ok(())
}

fn scope_index(items: &[Arc<ClipItem>], key: &ItemKey, grouped: bool) -> Option<usize> {
    let idx = items.iter().position(|item| &item.key == key)?;
    if !grouped {
        return Some(idx);
    }
    let group = items[idx].group_id.as_deref();
    Some(
        items[..idx]
            .iter()
            .filter(|item| item.group_id.as_deref() == group)
            .count(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterPipeline, FilterState};
    use crate::height::HeightModel;
    use crate::render::Renderer;
    use crate::window::WindowCalculator;

    fn texts(count: usize) -> Vec<Arc<ClipItem>> {
        (0..count)
            .map(|idx| Arc::new(ClipItem::text(format!("k{idx}"), format!("item {idx}"))))
            .collect()
    }

    fn keys(items: &[Arc<ClipItem>]) -> Vec<String> {
        items.iter().map(|item| item.key.to_string()).collect()
    }

    fn rendered(items: &[Arc<ClipItem>], view: &FilteredView, scroll: u32, viewport: u32) -> Renderer {
        let mut renderer = Renderer::new();
        rerender(&mut renderer, items, view, scroll, viewport);
        renderer
    }

    fn rerender(renderer: &mut Renderer, items: &[Arc<ClipItem>], view: &FilteredView, scroll: u32, viewport: u32) {
        let heights = HeightModel::new(view.len(), 1);
        let window = WindowCalculator::new(0).compute(&heights, scroll, viewport);
        renderer.render(items, view, window);
    }

    fn drag(
        view: &FilteredView,
        renderer: &Renderer,
        from_visual: usize,
        to_visual: usize,
    ) -> Result<Option<Resolution>, ResolveError> {
        let mut resolver = DragReorderResolver::new();
        resolver.start(renderer.node_at_visual(from_visual).unwrap(), 1);
        assert!(resolver.is_dragging());
        let report = DropReport::from_rendered(renderer.nodes(), resolver.session().unwrap(), to_visual);
        resolver.end(&report, view.len(), 1)
    }

    #[test]
    fn drag_to_front_moves_single_item() {
        let mut items = texts(8);
        let view = FilteredView::from_indices((0..8).collect());
        let renderer = rendered(&items, &view, 0, 8);

        let resolution = drag(&view, &renderer, 3, 0).unwrap().unwrap();
        assert_eq!(resolution, Resolution { from: 3, to: 0 });

        let plan = ReorderPlan::build(&items, &view, resolution, &ListKind::History).unwrap();
        assert_eq!(plan.scope_index, 0);
        apply_move(&mut items, &plan).unwrap();
        assert_eq!(keys(&items), ["k3", "k0", "k1", "k2", "k4", "k5", "k6", "k7"]);
    }

    #[test]
    fn window_relative_index_is_translated() {
        let items = texts(100);
        let view = FilteredView::from_indices((0..100).collect());
        // Window starts at position 40.
        let renderer = rendered(&items, &view, 40, 10);
        assert_eq!(renderer.node_at_visual(0).unwrap().position(), 40);

        let down = drag(&view, &renderer, 1, 4).unwrap().unwrap();
        assert_eq!(down, Resolution { from: 41, to: 44 });
        let up = drag(&view, &renderer, 5, 2).unwrap().unwrap();
        assert_eq!(up, Resolution { from: 45, to: 42 });
    }

    #[test]
    fn filtered_move_places_item_relative_to_anchor() {
        let mut items = texts(10);
        let view = FilterPipeline::apply(
            &items,
            &|item: &ClipItem| item.text.ends_with(['1', '4', '7', '9']),
            &ListKind::History,
        );
        assert_eq!(view.as_slice(), &[1, 4, 7, 9]);
        let renderer = rendered(&items, &view, 0, 10);

        let resolution = drag(&view, &renderer, 0, 2).unwrap().unwrap();
        assert_eq!(resolution, Resolution { from: 0, to: 2 });
        let plan = ReorderPlan::build(&items, &view, resolution, &ListKind::History).unwrap();
        apply_move(&mut items, &plan).unwrap();
        assert_eq!(
            keys(&items),
            ["k0", "k2", "k3", "k4", "k5", "k6", "k7", "k1", "k8", "k9"]
        );
    }

    #[test]
    fn unchanged_drop_returns_to_idle() {
        let items = texts(4);
        let view = FilteredView::from_indices((0..4).collect());
        let renderer = rendered(&items, &view, 0, 4);
        let mut resolver = DragReorderResolver::new();
        resolver.start(renderer.node_at_visual(2).unwrap(), 7);
        let report = DropReport::from_rendered(renderer.nodes(), resolver.session().unwrap(), 2);
        assert_eq!(resolver.end(&report, 4, 7), Ok(None));
        assert_eq!(resolver.phase(), DragPhase::Idle);
    }

    #[test]
    fn stale_generation_aborts() {
        let items = texts(4);
        let view = FilteredView::from_indices((0..4).collect());
        let renderer = rendered(&items, &view, 0, 4);
        let mut resolver = DragReorderResolver::new();
        resolver.start(renderer.node_at_visual(0).unwrap(), 1);
        let report = DropReport::from_rendered(renderer.nodes(), resolver.session().unwrap(), 3);
        assert!(matches!(
            resolver.end(&report, 4, 2),
            Err(ResolveError::StaleView { .. })
        ));
        assert!(!resolver.is_dragging());
    }

    #[test]
    fn drop_without_drag_is_rejected() {
        let items = texts(3);
        let view = FilteredView::from_indices((0..3).collect());
        let renderer = rendered(&items, &view, 0, 3);
        let mut other = DragReorderResolver::new();
        other.start(renderer.node_at_visual(0).unwrap(), 0);
        let report = DropReport::from_rendered(renderer.nodes(), other.session().unwrap(), 2);
        let mut resolver = DragReorderResolver::new();
        assert_eq!(resolver.end(&report, 3, 0), Err(ResolveError::NotDragging));
    }

    #[test]
    fn drop_after_window_moved_uses_current_neighbours() {
        let items = texts(40);
        let view = FilteredView::from_indices((0..40).collect());
        let mut renderer = rendered(&items, &view, 0, 5);
        let mut resolver = DragReorderResolver::new();
        resolver.start(renderer.node_at_visual(2).unwrap(), 1);

        // The window scrolled to [10, 15); the dragged row is gone from it.
        rerender(&mut renderer, &items, &view, 10, 5);
        let report = DropReport::from_rendered(renderer.nodes(), resolver.session().unwrap(), 2);
        assert_eq!(report.old_visual, None);
        assert_eq!(
            report.order.iter().map(|(_, pos)| *pos).collect::<Vec<_>>(),
            [10, 11, 2, 12, 13, 14]
        );
        assert_eq!(resolver.end(&report, 40, 1), Ok(Some(Resolution { from: 2, to: 11 })));
    }

    #[test]
    fn dragged_row_is_found_by_identity_not_start_index() {
        let items = texts(40);
        let view = FilteredView::from_indices((0..40).collect());
        let mut renderer = rendered(&items, &view, 20, 10);
        let mut resolver = DragReorderResolver::new();
        resolver.start(renderer.node_at_visual(5).unwrap(), 1);

        // Same visual drop index as the start, but the row now sits at 3.
        rerender(&mut renderer, &items, &view, 22, 10);
        let report = DropReport::from_rendered(renderer.nodes(), resolver.session().unwrap(), 5);
        assert_eq!(report.old_visual, Some(3));
        assert_eq!(resolver.end(&report, 40, 1), Ok(Some(Resolution { from: 25, to: 27 })));
    }

    #[test]
    fn report_for_another_row_is_rejected() {
        let items = texts(6);
        let view = FilteredView::from_indices((0..6).collect());
        let renderer = rendered(&items, &view, 0, 6);
        let mut other = DragReorderResolver::new();
        other.start(renderer.node_at_visual(4).unwrap(), 1);
        let foreign = DropReport::from_rendered(renderer.nodes(), other.session().unwrap(), 0);

        let mut resolver = DragReorderResolver::new();
        resolver.start(renderer.node_at_visual(1).unwrap(), 1);
        assert!(matches!(
            resolver.end(&foreign, 6, 1),
            Err(ResolveError::ForeignRow { .. })
        ));
        assert!(!resolver.is_dragging());
    }

    #[test]
    fn cross_group_move_targets_anchor_group() {
        let mut items: Vec<Arc<ClipItem>> = vec![
            ClipItem::text("a1", "a1").with_group("a"),
            ClipItem::text("a2", "a2").with_group("a"),
            ClipItem::text("b1", "b1").with_group("b"),
            ClipItem::text("b2", "b2").with_group("b"),
        ]
        .into_iter()
        .map(Arc::new)
        .collect();
        let kind = ListKind::QuickTexts {
            group_order: vec!["a".into(), "b".into()],
        };
        let view = FilterPipeline::apply_state(&items, &FilterState::default(), &kind);

        // Drop a1 after b1.
        let plan = ReorderPlan::build(&items, &view, Resolution { from: 0, to: 2 }, &kind).unwrap();
        assert_eq!(plan.target_group.as_deref(), Some("b"));
        assert_eq!(plan.scope_index, 1);
        apply_move(&mut items, &plan).unwrap();
        assert_eq!(keys(&items), ["a2", "b1", "a1", "b2"]);
        assert_eq!(items[2].group_id.as_deref(), Some("b"));

        // Same-group move reports an index within the group.
        let view = FilterPipeline::apply_state(&items, &FilterState::default(), &kind);
        let plan = ReorderPlan::build(&items, &view, Resolution { from: 3, to: 1 }, &kind).unwrap();
        assert!(!plan.is_cross_group());
        assert_eq!(plan.scope_index, 0);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn committed_move_is_a_permutation(
                len in 2usize..40,
                mask in proptest::collection::vec(any::<bool>(), 40),
                from_seed in any::<usize>(),
                to_seed in any::<usize>(),
            ) {
                let mut items = texts(len);
                let indices: Vec<usize> = (0..len).filter(|idx| mask[*idx]).collect();
                prop_assume!(indices.len() >= 2);
                let view = FilteredView::from_indices(indices);
                let from = from_seed % view.len();
                let to = to_seed % view.len();
                prop_assume!(from != to);

                let before = keys(&items);
                let moved_key = before[view.original(from).unwrap()].clone();
                let plan = ReorderPlan::build(&items, &view, Resolution { from, to }, &ListKind::History).unwrap();
                apply_move(&mut items, &plan).unwrap();
                let after = keys(&items);

                let mut sorted_before = before.clone();
                let mut sorted_after = after.clone();
                sorted_before.sort();
                sorted_after.sort();
                prop_assert_eq!(sorted_before, sorted_after);

                let others_before: Vec<_> = before.iter().filter(|k| **k != moved_key).collect();
                let others_after: Vec<_> = after.iter().filter(|k| **k != moved_key).collect();
                prop_assert_eq!(others_before, others_after);

                // The item lands at the requested filtered position.
                let filtered: Vec<_> = view
                    .as_slice()
                    .iter()
                    .map(|idx| before[*idx].clone())
                    .collect();
                let new_filtered: Vec<_> = after.iter().filter(|k| filtered.contains(k)).cloned().collect();
                prop_assert_eq!(new_filtered.iter().position(|k| *k == moved_key), Some(to));
            }
        }
    }
}
