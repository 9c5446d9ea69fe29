use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tokio::sync::broadcast;

use crate::action::{ListAction, ListEvent};
use crate::backend::{Backend, BackendError, retry};
use crate::config::ListConfig;
use crate::debounce::Debouncer;
use crate::drag::{DragReorderResolver, DragSession, DropReport, ReorderPlan, ResolveError, apply_move};
use crate::events::{ExternalEvent, ListNotice};
use crate::filter::{FilterPipeline, FilterState, FilteredView, TypeFilter};
use crate::height::HeightModel;
use crate::item::{ClipItem, ItemKey, ListKind};
use crate::loader::{AssetLoader, AssetSource, AssetState};
use crate::render::{LineMeasure, NodeId, RenderDiff, Renderer, RowContent, RowNode};
use crate::style::ScrollPolicy;
use crate::window::{RenderWindow, WindowCalculator};

#[cfg(feature = "keymap")]
use crate::keymap::ListKeyBindings;
#[cfg(feature = "keymap")]
use crossterm::event::KeyEvent;

const NOTICE_CAPACITY: usize = 64;

/// Snapshot of per-list view state (filter, selection, scroll offset).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSnapshot {
    pub filter: FilterState,
    /// Key of the active item, remapped by identity on restore.
    pub active: Option<ItemKey>,
    pub scroll_top: u32,
}

/// Result of a finished drag gesture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// No drag was active.
    Ignored,
    /// The row was dropped where it started.
    Unchanged,
    /// The move was persisted and applied; positions are filtered-view positions.
    Moved { key: ItemKey, from: usize, to: usize },
    /// The drop could not be mapped onto the collection. A refresh was run.
    Aborted(ResolveError),
    /// The backend refused the move. A refresh was run.
    RolledBack(BackendError),
}

/// Owns one list: its items, the filtered view and everything needed to
/// draw a window of it.
///
/// All writes to the item collection go through this type. Filter changes
/// requested during a drag are held back and applied once the drag ends.
pub struct ListManager {
    kind: ListKind,
    config: ListConfig,
    items: Vec<Arc<ClipItem>>,
    filter: FilterState,
    pending_filter: Option<FilterState>,
    refresh_deferred: bool,
    view: FilteredView,
    // Bumped on every view rebuild; drags started on an older view are stale.
    generation: u64,
    heights: HeightModel,
    calculator: WindowCalculator,
    renderer: Renderer,
    measure: LineMeasure,
    resolver: DragReorderResolver,
    loader: AssetLoader,
    // Index into `items`, not into the view.
    active: Option<usize>,
    scroll_top: u32,
    viewport_height: u32,
    scroll_policy: ScrollPolicy,
    resize: Debouncer<u32>,
    settle: Debouncer<u32>,
    notices: broadcast::Sender<ListNotice>,
    #[cfg(feature = "keymap")]
    keymap: ListKeyBindings,
}

impl std::fmt::Debug for ListManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListManager")
            .field("kind", &self.kind)
            .field("items", &self.items.len())
            .field("filter", &self.filter)
            .field("view", &self.view.len())
            .field("generation", &self.generation)
            .field("active", &self.active)
            .field("scroll_top", &self.scroll_top)
            .field("viewport_height", &self.viewport_height)
            .finish_non_exhaustive()
    }
}

impl ListManager {
    /// Creates an empty list of the given kind.
    pub fn new(kind: ListKind, config: ListConfig) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            kind,
            config,
            items: Vec::new(),
            filter: FilterState::default(),
            pending_filter: None,
            refresh_deferred: false,
            view: FilteredView::default(),
            generation: 0,
            heights: HeightModel::new(0, config.estimated_row_height),
            calculator: WindowCalculator::new(config.overscan),
            renderer: Renderer::new(),
            measure: LineMeasure {
                max_preview_lines: config.max_preview_lines,
                image_rows: config.image_row_height,
            },
            resolver: DragReorderResolver::new(),
            loader: AssetLoader::new(config.asset_cache_capacity, config.max_concurrent_fetches),
            active: None,
            scroll_top: 0,
            viewport_height: 0,
            scroll_policy: ScrollPolicy::KeepInView,
            resize: Debouncer::new(config.resize_debounce()),
            settle: Debouncer::new(config.scroll_settle()),
            notices,
            #[cfg(feature = "keymap")]
            keymap: ListKeyBindings::new(),
        }
    }

    /// Creates a list pre-populated with `items`.
    pub fn with_items(kind: ListKind, config: ListConfig, items: Vec<ClipItem>) -> Self {
        let mut manager = Self::new(kind, config);
        manager.replace_all(items);
        manager
    }

    #[cfg(feature = "keymap")]
    /// Returns a mutable reference to the key binding set.
    pub const fn keymap_mut(&mut self) -> &mut ListKeyBindings {
        &mut self.keymap
    }

    #[inline]
    pub const fn kind(&self) -> &ListKind {
        &self.kind
    }

    #[inline]
    pub const fn config(&self) -> &ListConfig {
        &self.config
    }

    /// The original collection.
    #[inline]
    pub fn items(&self) -> &[Arc<ClipItem>] {
        &self.items
    }

    #[inline]
    pub const fn view(&self) -> &FilteredView {
        &self.view
    }

    /// The filter currently applied to the view.
    #[inline]
    pub const fn filter(&self) -> &FilterState {
        &self.filter
    }

    /// The filter that will be applied once the current drag ends.
    pub const fn pending_filter(&self) -> Option<&FilterState> {
        self.pending_filter.as_ref()
    }

    #[inline]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub const fn heights(&self) -> &HeightModel {
        &self.heights
    }

    #[inline]
    pub const fn window(&self) -> RenderWindow {
        self.renderer.window()
    }

    /// Materialized rows in display order.
    #[inline]
    pub fn rows(&self) -> &[RowNode] {
        self.renderer.nodes()
    }

    /// Rows with their absolute top offset and height.
    pub fn layout(&self) -> impl Iterator<Item = (&RowNode, u32, u32)> + '_ {
        self.renderer.layout(&self.heights)
    }

    #[inline]
    pub const fn loader(&self) -> &AssetLoader {
        &self.loader
    }

    /// Load state of the image bound to a row.
    pub fn asset_state(&self, node: NodeId) -> Option<&AssetState> {
        self.loader.state(node)
    }

    #[inline]
    pub const fn scroll_top(&self) -> u32 {
        self.scroll_top
    }

    #[inline]
    pub const fn viewport_height(&self) -> u32 {
        self.viewport_height
    }

    /// Total height of the filtered view in terminal rows.
    pub fn total_height(&self) -> u32 {
        self.heights.total()
    }

    pub const fn set_scroll_policy(&mut self, policy: ScrollPolicy) {
        self.scroll_policy = policy;
    }

    #[inline]
    pub const fn is_dragging(&self) -> bool {
        self.resolver.is_dragging()
    }

    /// Row slot being dragged, if any.
    pub fn dragged_node(&self) -> Option<NodeId> {
        self.resolver.session().map(|session| session.node)
    }

    /// Returns `true` if a backend refresh was requested during a drag.
    #[inline]
    pub const fn needs_refresh(&self) -> bool {
        self.refresh_deferred
    }

    /// Subscribes to list notices.
    pub fn subscribe(&self) -> broadcast::Receiver<ListNotice> {
        self.notices.subscribe()
    }

    /// Index of the active item in the original collection.
    #[inline]
    pub const fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active_item(&self) -> Option<&ClipItem> {
        self.active.and_then(|idx| self.items.get(idx)).map(Arc::as_ref)
    }

    /// Filtered-view position of the active item, if it passes the filter.
    pub fn selected_position(&self) -> Option<usize> {
        self.active.and_then(|idx| self.view.position_of(idx))
    }

    pub fn snapshot(&self) -> ListSnapshot {
        ListSnapshot {
            filter: self.requested_filter(),
            active: self.active_item().map(|item| item.key.clone()),
            scroll_top: self.scroll_top,
        }
    }

    /// Restores state from a previously captured snapshot.
    pub fn restore(&mut self, snapshot: ListSnapshot) {
        self.apply_filter(snapshot.filter);
        self.active = snapshot
            .active
            .and_then(|key| self.items.iter().position(|item| item.key == key));
        self.scroll_top = snapshot.scroll_top;
        self.clamp_scroll();
        self.render_now();
    }

    /// Replaces the whole collection, e.g. with a fresh backend snapshot.
    pub fn replace_all(&mut self, items: Vec<ClipItem>) {
        self.mutate(|current| {
            *current = items.into_iter().map(Arc::new).collect();
        });
    }

    /// Inserts items at the front (newest first).
    pub fn prepend(&mut self, items: Vec<ClipItem>) {
        self.mutate(|current| {
            current.splice(0..0, items.into_iter().map(Arc::new));
        });
    }

    pub fn append(&mut self, items: Vec<ClipItem>) {
        self.mutate(|current| current.extend(items.into_iter().map(Arc::new)));
    }

    pub fn clear(&mut self) {
        self.mutate(Vec::clear);
    }

    /// Removes an item locally. Returns `false` if the key is unknown.
    pub fn remove(&mut self, key: &ItemKey) -> bool {
        let Some(idx) = self.items.iter().position(|item| &item.key == key) else {
            return false;
        };
        self.mutate(|current| {
            current.remove(idx);
        });
        true
    }

    // Applies a collection change, keeping the active item by identity.
    fn mutate<F: FnOnce(&mut Vec<Arc<ClipItem>>)>(&mut self, change: F) {
        let active_key = self.active_item().map(|item| item.key.clone());
        change(&mut self.items);
        self.active = active_key.and_then(|key| self.items.iter().position(|item| item.key == key));
        self.rebuild_view();
    }

    /// Re-fetches the full snapshot with bounded retry.
    ///
    /// On final failure the last known items stay in place and a
    /// notification is emitted. Transient failures are silent. During a
    /// drag the refresh is deferred until the drag ends.
    pub async fn refresh<B: Backend>(&mut self, backend: &B) -> Result<(), BackendError> {
        if self.resolver.is_dragging() {
            tracing::debug!("refresh deferred while dragging");
            self.refresh_deferred = true;
            return Ok(());
        }
        self.refresh_deferred = false;
        match retry(self.config.retry_policy(), "fetch_all", || backend.fetch_all()).await {
            Ok(items) => {
                tracing::debug!(count = items.len(), "list refreshed");
                self.replace_all(items);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "refresh failed, keeping last known items");
                self.notify(ListNotice::Notification(format!("Failed to load list: {err}")));
                Err(err)
            }
        }
    }

    /// Runs a refresh that was deferred by a drag.
    pub async fn flush_deferred<B: Backend>(&mut self, backend: &B) -> Result<(), BackendError> {
        if self.refresh_deferred && !self.resolver.is_dragging() {
            return self.refresh(backend).await;
        }
        Ok(())
    }

    /// Deletes an item: removed locally first, then on the backend. A
    /// backend failure restores the backend's view with a refresh.
    pub async fn delete<B: Backend>(&mut self, backend: &B, key: &ItemKey) -> Result<(), BackendError> {
        if !self.remove(key) {
            return Err(BackendError::NotFound { key: key.clone() });
        }
        match retry(self.config.retry_policy(), "delete_item", || backend.delete_item(key)).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.notify(ListNotice::Notification(format!("Failed to delete item: {err}")));
                // The refresh reports its own failure.
                let _ = self.refresh(backend).await;
                Err(err)
            }
        }
    }

    /// Handles an event from outside the list.
    pub async fn handle_external<B: Backend>(&mut self, backend: &B, event: ExternalEvent) {
        match event {
            ExternalEvent::DataChanged => {
                let _ = self.refresh(backend).await;
            }
            ExternalEvent::RowHeightChanged(height) => self.set_estimated_row_height(height),
            ExternalEvent::TabSwitched => self.tab_switched(),
        }
    }

    /// Replaces the estimated row height, drops all measurements and
    /// rebuilds every row.
    pub fn set_estimated_row_height(&mut self, height: u32) {
        self.config.estimated_row_height = height;
        self.heights.set_estimate(height);
        self.heights.reset(self.view.len());
        self.rebuild_rows();
    }

    /// Resets scrolling and rows when the list's tab becomes active.
    pub fn tab_switched(&mut self) {
        self.scroll_top = 0;
        self.settle.take_now();
        self.rebuild_rows();
    }

    pub fn set_type_filter(&mut self, type_filter: TypeFilter) {
        let mut next = self.requested_filter();
        next.type_filter = type_filter;
        self.apply_filter(next);
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        let mut next = self.requested_filter();
        next.search_term = term.into();
        self.apply_filter(next);
    }

    /// Selects a quick-text group. `None` shows all groups.
    pub fn set_group(&mut self, group: Option<String>) {
        let mut next = self.requested_filter();
        next.group = group;
        self.apply_filter(next);
    }

    fn requested_filter(&self) -> FilterState {
        self.pending_filter.clone().unwrap_or_else(|| self.filter.clone())
    }

    fn apply_filter(&mut self, next: FilterState) {
        if self.resolver.is_dragging() {
            tracing::debug!(filter = ?next, "filter change deferred while dragging");
            self.pending_filter = Some(next);
            return;
        }
        let type_changed = next.type_filter != self.filter.type_filter;
        self.filter = next;
        self.scroll_top = 0;
        self.rebuild_view();
        if type_changed {
            self.notify(ListNotice::FilterChanged {
                type_filter: self.filter.type_filter,
            });
        }
    }

    fn apply_deferred_filter(&mut self) {
        if let Some(next) = self.pending_filter.take() {
            tracing::debug!(filter = ?next, "applying deferred filter");
            self.apply_filter(next);
        }
    }

    fn rebuild_view(&mut self) {
        self.view = FilterPipeline::apply_state(&self.items, &self.filter, &self.kind);
        self.generation += 1;
        self.heights.reset(self.view.len());
        self.renderer.invalidate_measurements();
        self.clamp_scroll();
        tracing::trace!(len = self.view.len(), generation = self.generation, "view rebuilt");
        self.render_now();
        self.notify(ListNotice::ListUpdated {
            len: self.view.len(),
            generation: self.generation,
        });
    }

    fn rebuild_rows(&mut self) {
        for id in self.renderer.clear() {
            self.loader.unobserve(id);
        }
        self.calculator.reset();
        self.clamp_scroll();
        self.render_now();
    }

    fn clamp_scroll(&mut self) {
        let max = WindowCalculator::max_scroll(&self.heights, self.viewport_height);
        if self.viewport_height > 0 && self.scroll_top > max {
            self.scroll_top = max;
        }
    }

    // Computes the window for the current scroll position and reconciles rows.
    fn render_now(&mut self) -> RenderDiff {
        let window = self
            .calculator
            .compute(&self.heights, self.scroll_top, self.viewport_height);
        let diff = self.renderer.render(&self.items, &self.view, window);
        for id in &diff.removed {
            self.loader.unobserve(*id);
        }
        for id in &diff.created {
            if let Some(node) = self.renderer.node(*id)
                && let RowContent::Image { asset_id } = node.content()
                && !asset_id.is_empty()
            {
                self.loader.observe(*id, asset_id.clone(), true);
            }
        }
        self.intersect_visible();
        diff
    }

    fn intersect_visible(&mut self) {
        let top = self.scroll_top;
        let bottom = top.saturating_add(self.viewport_height);
        let visible: SmallVec<[NodeId; 32]> = self
            .renderer
            .layout(&self.heights)
            .filter(|(_, row_top, height)| *row_top < bottom && row_top.saturating_add(*height) > top)
            .map(|(node, _, _)| node.id())
            .collect();
        for id in visible {
            self.loader.intersect(id);
        }
    }

    /// Prepares a paint: feeds measurements of rows created by the previous
    /// pass back into the height model, then recomputes the window.
    pub fn prepare_frame(&mut self) -> RenderDiff {
        if self.renderer.flush_measurements(&mut self.heights, &self.measure) {
            self.clamp_scroll();
        }
        self.render_now()
    }

    /// Scrolls to an absolute offset. Returns `true` if the offset changed.
    pub fn scroll_to(&mut self, scroll_top: u32, now: Instant) -> bool {
        let max = WindowCalculator::max_scroll(&self.heights, self.viewport_height);
        let scroll_top = scroll_top.min(max);
        if scroll_top == self.scroll_top {
            return false;
        }
        self.scroll_top = scroll_top;
        self.settle.queue(scroll_top, now);
        self.render_now();
        true
    }

    pub fn scroll_by(&mut self, delta: i32, now: Instant) -> bool {
        let target = self.scroll_top.saturating_add_signed(delta);
        self.scroll_to(target, now)
    }

    /// Applies a new viewport height.
    ///
    /// The first height is applied immediately; later changes are debounced.
    /// A zero height (hidden list) keeps the last good window.
    pub fn resize(&mut self, height: u32, now: Instant) {
        if height == 0 || self.viewport_height == 0 || self.calculator.last().is_none() {
            self.resize.take_now();
            self.apply_viewport(height);
        } else {
            self.resize.queue(height, now);
        }
    }

    /// Called on every paint with the drawable height.
    pub fn sync_viewport(&mut self, height: u32, now: Instant) {
        if height == self.viewport_height {
            self.resize.take_now();
            return;
        }
        if self.resize.pending() != Some(&height) {
            self.resize(height, now);
        }
    }

    fn apply_viewport(&mut self, height: u32) {
        if height == self.viewport_height {
            return;
        }
        tracing::trace!(height, "viewport resized");
        self.viewport_height = height;
        self.clamp_scroll();
        self.render_now();
    }

    /// Releases debounced work whose quiet period has passed.
    pub fn tick(&mut self, now: Instant) {
        if let Some(height) = self.resize.take_ready(now) {
            self.apply_viewport(height);
        }
        if let Some(scroll_top) = self.settle.take_ready(now) {
            self.notify(ListNotice::ScrollSettled { scroll_top });
        }
    }

    fn select_position(&mut self, position: usize) {
        self.active = self.view.original(position);
        self.ensure_selection_visible();
    }

    pub fn select_first(&mut self) {
        if !self.view.is_empty() {
            self.select_position(0);
        }
    }

    pub fn select_last(&mut self) {
        if let Some(last) = self.view.len().checked_sub(1) {
            self.select_position(last);
        }
    }

    /// Moves selection to the previous row of the view.
    pub fn select_prev(&mut self) {
        if self.view.is_empty() {
            self.active = None;
            return;
        }
        let position = self.selected_position().map_or(0, |pos| pos.saturating_sub(1));
        self.select_position(position);
    }

    /// Moves selection to the next row of the view.
    pub fn select_next(&mut self) {
        if self.view.is_empty() {
            self.active = None;
            return;
        }
        let position = self
            .selected_position()
            .map_or(0, |pos| (pos + 1).min(self.view.len() - 1));
        self.select_position(position);
    }

    pub fn page_up(&mut self) {
        self.page(false);
    }

    pub fn page_down(&mut self) {
        self.page(true);
    }

    fn page(&mut self, down: bool) {
        if self.view.is_empty() {
            return;
        }
        let page = self.viewport_height.max(1);
        let current = self.selected_position().unwrap_or(0);
        let anchor = self.heights.offset(current);
        let target = if down {
            anchor.saturating_add(page)
        } else {
            anchor.saturating_sub(page)
        };
        let position = self.heights.position_at(target).min(self.view.len() - 1);
        self.select_position(position);
    }

    /// Scrolls so the active row is inside the viewport.
    pub fn ensure_selection_visible(&mut self) {
        let Some(position) = self.selected_position() else {
            return;
        };
        if self.viewport_height == 0 {
            return;
        }
        let top = self.heights.offset(position);
        let height = self.heights.height(position);
        let target = match self.scroll_policy {
            ScrollPolicy::KeepInView => {
                if top < self.scroll_top {
                    top
                } else if top.saturating_add(height) > self.scroll_top.saturating_add(self.viewport_height) {
                    top.saturating_add(height).saturating_sub(self.viewport_height)
                } else {
                    return;
                }
            }
            ScrollPolicy::CenterOnSelect => {
                top.saturating_add(height / 2).saturating_sub(self.viewport_height / 2)
            }
        };
        self.scroll_to(target, Instant::now());
    }

    /// Activates the n-th row (1-based) of the view and returns its key for
    /// pasting.
    pub fn execute_shortcut(&mut self, n: u8) -> Option<ItemKey> {
        let position = usize::from(n).checked_sub(1)?;
        let original = self.view.original(position)?;
        self.active = Some(original);
        self.items.get(original).map(|item| item.key.clone())
    }

    /// Visual index of the row under a viewport-relative line.
    pub fn visual_at(&self, line: u32) -> Option<usize> {
        let offset = self.scroll_top.saturating_add(line);
        self.renderer
            .layout(&self.heights)
            .position(|(_, top, height)| offset >= top && offset < top.saturating_add(height))
    }

    /// Click on a rendered row. Suppressed while a drag is active.
    pub fn click(&mut self, visual: usize) -> Option<ItemKey> {
        if self.resolver.is_dragging() {
            tracing::trace!(visual, "click suppressed during drag");
            return None;
        }
        let node = self.renderer.node_at_visual(visual)?;
        let key = node.key().clone();
        self.active = Some(node.original());
        Some(key)
    }

    /// Starts dragging the row at a visual index.
    pub fn drag_start(&mut self, visual: usize) -> bool {
        if self.resolver.is_dragging() {
            return false;
        }
        let Some(node) = self.renderer.node_at_visual(visual) else {
            return false;
        };
        tracing::debug!(key = %node.key(), visual, "drag started");
        self.resolver.start(node, self.generation);
        true
    }

    /// Abandons the drag and applies held-back filter changes.
    pub fn drag_cancel(&mut self) {
        self.resolver.cancel();
        self.apply_deferred_filter();
    }

    /// Finishes a drag at `new_visual`, persists the move and applies it.
    ///
    /// Any inconsistency or backend failure falls back to a full refresh so
    /// the list never shows an order the backend does not have.
    pub async fn drag_end<B: Backend>(&mut self, backend: &B, new_visual: usize) -> ReorderOutcome {
        let Some(session) = self.resolver.session().cloned() else {
            return ReorderOutcome::Ignored;
        };
        let outcome = self.commit_drop(backend, &session, new_visual).await;
        self.resolver.finish();
        match &outcome {
            ReorderOutcome::Aborted(err) => {
                tracing::warn!(error = %err, "drop could not be resolved, refreshing");
                self.resync(backend).await;
            }
            ReorderOutcome::RolledBack(err) => {
                tracing::warn!(error = %err, "move rejected, refreshing");
                self.notify(ListNotice::Notification(format!("Failed to move item: {err}")));
                self.resync(backend).await;
            }
            ReorderOutcome::Moved { .. } | ReorderOutcome::Unchanged | ReorderOutcome::Ignored => {
                self.apply_deferred_filter();
                let _ = self.flush_deferred(backend).await;
            }
        }
        outcome
    }

    // Applies held-back filter changes and reloads from the backend.
    async fn resync<B: Backend>(&mut self, backend: &B) {
        self.apply_deferred_filter();
        let _ = self.refresh(backend).await;
    }

    async fn commit_drop<B: Backend>(
        &mut self,
        backend: &B,
        session: &DragSession,
        new_visual: usize,
    ) -> ReorderOutcome {
        let report = DropReport::from_rendered(self.renderer.nodes(), session, new_visual);
        let resolution = match self.resolver.end(&report, self.view.len(), self.generation) {
            Ok(Some(resolution)) => resolution,
            Ok(None) => return ReorderOutcome::Unchanged,
            Err(err) => return ReorderOutcome::Aborted(err),
        };
        let plan = match ReorderPlan::build(&self.items, &self.view, resolution, &self.kind) {
            Ok(plan) => plan,
            Err(err) => return ReorderOutcome::Aborted(err),
        };
        tracing::debug!(
            key = %plan.key,
            from = resolution.from,
            to = resolution.to,
            scope_index = plan.scope_index,
            group = ?plan.target_group,
            "committing move"
        );

        if let Err(err) = self.persist_move(backend, &plan).await {
            return ReorderOutcome::RolledBack(err);
        }
        let active_key = self.active_item().map(|item| item.key.clone());
        if let Err(err) = apply_move(&mut self.items, &plan) {
            return ReorderOutcome::Aborted(err);
        }
        self.active = active_key.and_then(|key| self.items.iter().position(|item| item.key == key));
        self.rebuild_view();
        ReorderOutcome::Moved {
            key: plan.key,
            from: resolution.from,
            to: resolution.to,
        }
    }

    async fn persist_move<B: Backend>(&self, backend: &B, plan: &ReorderPlan) -> Result<(), BackendError> {
        let policy = self.config.retry_policy();
        if let Some(group) = plan.target_group.as_deref() {
            retry(policy, "move_item_to_group", || backend.move_item_to_group(&plan.key, group)).await?;
        }
        retry(policy, "move_item", || backend.move_item(&plan.key, plan.scope_index)).await
    }

    /// Spawns queued asset fetches up to the concurrency limit.
    pub fn pump_assets<S: AssetSource>(&mut self, source: &Arc<S>) -> usize {
        self.loader.pump(source)
    }

    /// Waits for the next asset fetch and applies it.
    pub async fn next_asset(&mut self) -> Option<usize> {
        self.loader.next_completion().await
    }

    /// Fetches every asset requested by visible rows.
    pub async fn load_visible_assets<S: AssetSource>(&mut self, source: &Arc<S>) -> usize {
        self.loader.run_until_idle(source).await
    }

    /// Handles a list action and returns the resulting event.
    pub fn handle_action<C>(&mut self, action: ListAction<C>) -> ListEvent<C> {
        if matches!(&action, ListAction::Custom(_)) {
            return ListEvent::Action(action);
        }
        if let ListAction::CycleTypeFilter = action {
            let next = self.requested_filter().type_filter.next();
            self.set_type_filter(next);
            return ListEvent::Handled;
        }
        if self.view.is_empty() {
            return ListEvent::Unhandled;
        }

        match action {
            ListAction::SelectPrev => {
                self.select_prev();
                ListEvent::Handled
            }
            ListAction::SelectNext => {
                self.select_next();
                ListEvent::Handled
            }
            ListAction::SelectFirst => {
                self.select_first();
                ListEvent::Handled
            }
            ListAction::SelectLast => {
                self.select_last();
                ListEvent::Handled
            }
            ListAction::PageUp => {
                self.page_up();
                ListEvent::Handled
            }
            ListAction::PageDown => {
                self.page_down();
                ListEvent::Handled
            }
            ListAction::Execute => match self.selected_position().and(self.active_item()) {
                Some(item) => ListEvent::Execute(item.key.clone()),
                None => ListEvent::Unhandled,
            },
            ListAction::ExecuteShortcut(n) => match self.execute_shortcut(n) {
                Some(key) => ListEvent::Execute(key),
                None => ListEvent::Unhandled,
            },
            ListAction::Delete => {
                if self.selected_position().is_some() {
                    ListEvent::Action(ListAction::Delete)
                } else {
                    ListEvent::Unhandled
                }
            }
            ListAction::CycleTypeFilter | ListAction::Custom(_) => ListEvent::Unhandled,
        }
    }

    #[cfg(feature = "keymap")]
    /// Resolves a key event into an action and handles it.
    pub fn handle_key(&mut self, key: KeyEvent) -> ListEvent<()> {
        let Some(action) = self.keymap.resolve(key) else {
            return ListEvent::Unhandled;
        };
        self.handle_action(action)
    }

    #[cfg(feature = "keymap")]
    /// Resolves a key event with a custom mapping and handles it.
    pub fn handle_key_with<C, F>(&mut self, key: KeyEvent, custom: F) -> ListEvent<C>
    where
        F: Fn(KeyEvent) -> Option<C>,
    {
        let Some(action) = self.keymap.resolve_with(key, custom) else {
            return ListEvent::Unhandled;
        };
        self.handle_action(action)
    }

    fn notify(&self, notice: ListNotice) {
        // Nobody listening is fine.
        let _ = self.notices.send(notice);
    }
}
