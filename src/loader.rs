//! Visibility-triggered asset loading with a bounded LRU cache and a bounded
//! number of concurrent fetches.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use tokio::task::JoinSet;

use crate::render::NodeId;

/// Source of image data URLs.
pub trait AssetSource: Send + Sync + 'static {
    fn fetch_asset(
        &self,
        asset_id: &str,
        thumbnail: bool,
    ) -> impl Future<Output = Result<String, AssetError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    Fetch { asset_id: String, reason: String },
    Aborted { asset_id: String },
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch { asset_id, reason } => write!(f, "failed to load asset {asset_id}: {reason}"),
            Self::Aborted { asset_id } => write!(f, "asset fetch aborted ({asset_id})"),
        }
    }
}

impl std::error::Error for AssetError {}

/// Load state of an observed row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetState {
    /// Observed, not yet intersecting the viewport.
    Waiting,
    Loading,
    Loaded(Arc<str>),
    /// Shown as an error placeholder; not retried for this row.
    Failed(AssetError),
}

#[derive(Clone, Debug)]
struct Binding {
    asset_id: String,
    thumbnail: bool,
    state: AssetState,
}

/// A fetch the loader wants to start.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    pub asset_id: String,
    pub thumbnail: bool,
}

type FetchOutcome = (String, Result<String, AssetError>);

pub struct AssetLoader {
    cache: LruCache<String, Arc<str>>,
    bindings: FxHashMap<NodeId, Binding>,
    queue: VecDeque<FetchRequest>,
    in_flight: FxHashSet<String>,
    max_in_flight: usize,
    tasks: JoinSet<FetchOutcome>,
}

impl fmt::Debug for AssetLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetLoader")
            .field("cached", &self.cache.len())
            .field("observed", &self.bindings.len())
            .field("queued", &self.queue.len())
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new(100, 3)
    }
}

impl AssetLoader {
    pub fn new(cache_capacity: usize, max_in_flight: usize) -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(cache_capacity).unwrap_or(NonZeroUsize::MIN)),
            bindings: FxHashMap::default(),
            queue: VecDeque::new(),
            in_flight: FxHashSet::default(),
            max_in_flight: max_in_flight.max(1),
            tasks: JoinSet::new(),
        }
    }

    /// Registers a row for a visibility-triggered load.
    pub fn observe(&mut self, node: NodeId, asset_id: impl Into<String>, thumbnail: bool) {
        self.bindings.insert(
            node,
            Binding {
                asset_id: asset_id.into(),
                thumbnail,
                state: AssetState::Waiting,
            },
        );
    }

    /// Releases a row. Pending results for it are dropped on arrival.
    pub fn unobserve(&mut self, node: NodeId) {
        self.bindings.remove(&node);
    }

    pub fn is_observed(&self, node: NodeId) -> bool {
        self.bindings.contains_key(&node)
    }

    pub fn state(&self, node: NodeId) -> Option<&AssetState> {
        self.bindings.get(&node).map(|binding| &binding.state)
    }

    /// Returns a cached data URL without touching recency.
    pub fn cached(&self, asset_id: &str) -> Option<Arc<str>> {
        self.cache.peek(asset_id).cloned()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Handles the first viewport intersection of a row. Later calls are no-ops.
    pub fn intersect(&mut self, node: NodeId) {
        let Some(binding) = self.bindings.get_mut(&node) else {
            return;
        };
        if binding.state != AssetState::Waiting {
            return;
        }
        if let Some(url) = self.cache.get(&binding.asset_id) {
            binding.state = AssetState::Loaded(Arc::clone(url));
            return;
        }
        binding.state = AssetState::Loading;
        let asset_id = binding.asset_id.clone();
        let thumbnail = binding.thumbnail;
        if !self.in_flight.contains(&asset_id) && !self.queue.iter().any(|req| req.asset_id == asset_id) {
            self.queue.push_back(FetchRequest { asset_id, thumbnail });
        }
    }

    fn is_wanted(&self, asset_id: &str) -> bool {
        self.bindings
            .values()
            .any(|binding| binding.asset_id == asset_id && binding.state == AssetState::Loading)
    }

    /// Pops queued requests up to the concurrency limit and marks them in flight.
    pub fn take_requests(&mut self) -> SmallVec<[FetchRequest; 4]> {
        let mut out = SmallVec::new();
        while self.in_flight.len() < self.max_in_flight {
            let Some(request) = self.queue.pop_front() else {
                break;
            };
            // Rows scrolled away before their turn no longer need the asset.
            if !self.is_wanted(&request.asset_id) {
                continue;
            }
            self.in_flight.insert(request.asset_id.clone());
            out.push(request);
        }
        out
    }

    /// Records a fetch result. The cache is always updated on success; rows
    /// that were recycled in the meantime are left alone. Returns the number
    /// of rows updated.
    pub fn complete(&mut self, asset_id: &str, result: Result<String, AssetError>) -> usize {
        self.in_flight.remove(asset_id);
        let state = match result {
            Ok(url) => {
                let url: Arc<str> = Arc::from(url);
                self.cache.put(asset_id.to_owned(), Arc::clone(&url));
                tracing::trace!(asset_id, cached = self.cache.len(), "asset loaded");
                AssetState::Loaded(url)
            }
            Err(err) => {
                tracing::warn!(asset_id, error = %err, "asset load failed");
                AssetState::Failed(err)
            }
        };
        let mut updated = 0;
        for binding in self.bindings.values_mut() {
            if binding.asset_id == asset_id && binding.state == AssetState::Loading {
                binding.state = state.clone();
                updated += 1;
            }
        }
        updated
    }

    /// Spawns fetches for queued requests up to the concurrency limit.
    pub fn pump<S: AssetSource>(&mut self, source: &Arc<S>) -> usize {
        let requests = self.take_requests();
        let spawned = requests.len();
        for FetchRequest { asset_id, thumbnail } in requests {
            let source = Arc::clone(source);
            self.tasks.spawn(async move {
                let result = source.fetch_asset(&asset_id, thumbnail).await;
                (asset_id, result)
            });
        }
        spawned
    }

    /// Returns `true` if fetches are running.
    pub fn is_busy(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Waits for the next fetch to finish and applies it. Returns `None` when
    /// nothing is in flight.
    pub async fn next_completion(&mut self) -> Option<usize> {
        match self.tasks.join_next().await? {
            Ok((asset_id, result)) => Some(self.complete(&asset_id, result)),
            Err(err) => {
                tracing::warn!(error = %err, "asset task did not complete");
                if self.tasks.is_empty() {
                    self.abort_lost();
                }
                Some(0)
            }
        }
    }

    /// Pumps and drains fetches until the queue is empty.
    pub async fn run_until_idle<S: AssetSource>(&mut self, source: &Arc<S>) -> usize {
        let mut updated = 0;
        loop {
            self.pump(source);
            match self.next_completion().await {
                Some(count) => updated += count,
                None => return updated,
            }
        }
    }

    fn abort_lost(&mut self) {
        for asset_id in std::mem::take(&mut self.in_flight) {
            let err = AssetError::Aborted {
                asset_id: asset_id.clone(),
            };
            self.complete(&asset_id, Err(err));
        }
    }
}
