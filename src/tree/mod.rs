//! 树核心：持有根节点与节点表，负责异步刷新子节点
//!
//! - 刷新期间超过 busy 延迟会把节点标记为忙碌（引用计数）
//! - 刷新结果落地前校验目标仍属于当前根，否则丢弃
//! - onNodeRefreshed 是 wait-until 事件，监听者的异步任务完成后才触发 onChanged

pub mod model;

use crate::config::TreeConfig;
use crate::core::event::{AsyncEmitter, Emitter};
use crate::error::{BoxError, TreeError};
use crate::models::{ordered_nodes, IteratorOptions, NodeId, NodeStore, Resolution, TreeNode};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub use model::{TreeModel, TreeModelState};

#[async_trait]
pub trait TreeProvider: Send + Sync {
    async fn resolve_children(&self, parent: &TreeNode) -> Result<Vec<TreeNode>, BoxError>;
}

struct TreeState {
    store: NodeStore,
    // Bumped whenever the root is replaced; refreshes started under an
    // older generation are discarded.
    generation: u64,
}

struct TreeInner {
    provider: Arc<dyn TreeProvider>,
    config: TreeConfig,
    state: Mutex<TreeState>,
    on_changed: Emitter<()>,
    on_node_refreshed: AsyncEmitter<TreeNode>,
    on_did_change_busy: Emitter<TreeNode>,
    on_did_update: Emitter<Vec<TreeNode>>,
}

#[derive(Clone)]
pub struct Tree {
    inner: Arc<TreeInner>,
}

#[derive(Clone)]
pub struct WeakTree {
    inner: Weak<TreeInner>,
}

impl WeakTree {
    pub fn upgrade(&self) -> Option<Tree> {
        self.inner.upgrade().map(|inner| Tree { inner })
    }
}

impl Tree {
    pub fn new(provider: Arc<dyn TreeProvider>, config: TreeConfig) -> Self {
        Self {
            inner: Arc::new(TreeInner {
                provider,
                config,
                state: Mutex::new(TreeState {
                    store: NodeStore::new(),
                    generation: 0,
                }),
                on_changed: Emitter::new(),
                on_node_refreshed: AsyncEmitter::new(),
                on_did_change_busy: Emitter::new(),
                on_did_update: Emitter::new(),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakTree {
        WeakTree {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.inner.config
    }

    pub fn on_changed(&self) -> &Emitter<()> {
        &self.inner.on_changed
    }

    pub fn on_node_refreshed(&self) -> &AsyncEmitter<TreeNode> {
        &self.inner.on_node_refreshed
    }

    pub fn on_did_change_busy(&self) -> &Emitter<TreeNode> {
        &self.inner.on_did_change_busy
    }

    pub fn on_did_update(&self) -> &Emitter<Vec<TreeNode>> {
        &self.inner.on_did_update
    }

    fn state(&self) -> MutexGuard<'_, TreeState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `f` against the node store. Events never fire while `f` runs, and
    /// `f` must not call back into the tree.
    pub fn read<R>(&self, f: impl FnOnce(&NodeStore) -> R) -> R {
        f(&self.state().store)
    }

    pub fn root(&self) -> Option<TreeNode> {
        self.read(|store| store.root().cloned())
    }

    pub fn get_node(&self, id: &NodeId) -> Option<TreeNode> {
        self.read(|store| store.get(id).cloned())
    }

    /// Re-resolve a possibly stale node reference against the current store.
    pub fn validate_node(&self, node: &TreeNode) -> Option<TreeNode> {
        self.get_node(&node.id)
    }

    pub fn resolution(&self, id: &NodeId) -> Resolution {
        self.read(|store| store.resolution(id))
    }

    /// Traversal options derived from `TreeConfig`.
    pub fn iterator_options(&self) -> IteratorOptions {
        IteratorOptions {
            prune_collapsed: self.inner.config.prune_collapsed,
            prune_siblings: false,
        }
    }

    /// Nodes in display order under the configured traversal options.
    pub fn visible_order(&self) -> Vec<TreeNode> {
        let options = self.iterator_options();
        self.read(|store| ordered_nodes(store, options).into_iter().cloned().collect())
    }

    /// Replace the root and drop every node of the previous tree.
    ///
    /// The new root is installed before this returns; the returned future
    /// resolves the root's children.
    pub fn set_root(
        &self,
        root: Option<TreeNode>,
    ) -> BoxFuture<'static, Result<Option<TreeNode>, TreeError>> {
        let has_root = root.is_some();
        {
            let mut state = self.state();
            state.store.reset(root);
            state.generation += 1;
        }
        self.fire_changed();

        let tree = self.clone();
        Box::pin(async move {
            if !has_root {
                return Ok(None);
            }
            tree.do_refresh(None, None).await
        })
    }

    /// Resolve the children of `parent` (the root when `None`).
    ///
    /// Returns `Ok(None)` when the target is missing, not composite, or
    /// stopped belonging to the current root while its children resolved.
    /// Provider failures propagate; a cancelled `token` yields
    /// `TreeError::Cancelled` and leaves the store untouched.
    pub fn refresh(
        &self,
        parent: Option<&NodeId>,
        token: Option<CancellationToken>,
    ) -> BoxFuture<'static, Result<Option<TreeNode>, TreeError>> {
        let tree = self.clone();
        let parent = parent.cloned();
        Box::pin(async move { tree.do_refresh(parent, token).await })
    }

    pub async fn refresh_all(&self) -> Result<Option<TreeNode>, TreeError> {
        self.do_refresh(None, None).await
    }

    async fn do_refresh(
        &self,
        parent: Option<NodeId>,
        token: Option<CancellationToken>,
    ) -> Result<Option<TreeNode>, TreeError> {
        let is_cancelled = || token.as_ref().is_some_and(|t| t.is_cancelled());

        let (target, previous, generation) = {
            let mut state = self.state();
            let target = match &parent {
                Some(id) => state.store.get(id).cloned(),
                None => state.store.root().cloned(),
            };
            let Some(target) = target else {
                tracing::warn!(node = ?parent, "refresh target is not part of the tree");
                return Ok(None);
            };
            if !target.is_composite() {
                tracing::error!(node = %target.id, "refresh target is not a composite node");
                return Ok(None);
            }
            if is_cancelled() {
                return Err(TreeError::Cancelled);
            }
            let previous = state.store.resolution(&target.id);
            state.store.set_resolution(&target.id, Resolution::Resolving);
            (target, previous, state.generation)
        };

        tracing::debug!(node = %target.id, "refreshing children");
        let busy = CancellationToken::new();
        self.spawn_busy_marker(
            &target.id,
            generation,
            self.inner.config.busy_delay(),
            busy.clone(),
        );
        // Releases the busy marker on every exit path.
        let _busy_guard = busy.drop_guard();

        let children = match self.inner.provider.resolve_children(&target).await {
            Ok(children) => children,
            Err(source) => {
                self.restore_resolution(&target.id, generation, previous);
                return Err(TreeError::Resolve {
                    id: target.id,
                    source,
                });
            }
        };
        if is_cancelled() {
            self.restore_resolution(&target.id, generation, previous);
            return Err(TreeError::Cancelled);
        }

        let refreshed = self.set_children(&target.id, generation, children).await;
        tracing::debug!(node = %target.id, applied = refreshed.is_some(), "refresh finished");
        if refreshed.is_some() {
            self.fire_changed();
        }
        Ok(refreshed)
    }

    fn restore_resolution(&self, id: &NodeId, generation: u64, previous: Resolution) {
        let mut state = self.state();
        if state.generation == generation {
            state.store.set_resolution(id, previous);
        }
    }

    async fn set_children(
        &self,
        parent: &NodeId,
        generation: u64,
        children: Vec<TreeNode>,
    ) -> Option<TreeNode> {
        let refreshed = {
            let mut state = self.state();
            if state.generation != generation || !state.store.contains(parent) {
                let root = state.store.root_id().cloned();
                tracing::error!(
                    node = %parent,
                    root = ?root,
                    "refreshed node does not belong to the current tree"
                );
                return None;
            }
            state.store.replace_children(parent, children);
            state.store.set_resolution(parent, Resolution::Resolved);
            state.store.get(parent).cloned()
        }?;

        self.inner.on_node_refreshed.fire(refreshed.clone()).await;
        Some(self.get_node(parent).unwrap_or(refreshed))
    }

    /// Flag `id` busy after `delay` unless `token` is cancelled first.
    ///
    /// Once flagged, cancelling the token releases the flag again. Busy
    /// state is reference counted, so overlapping markers compose. A marker
    /// belongs to the root that was current when it was placed and has no
    /// effect once the root is replaced. Must be called from within a tokio
    /// runtime.
    pub fn mark_as_busy(&self, id: &NodeId, delay: Duration, token: CancellationToken) {
        if token.is_cancelled() {
            return;
        }
        let generation = self.state().generation;
        self.spawn_busy_marker(id, generation, delay, token);
    }

    fn spawn_busy_marker(
        &self,
        id: &NodeId,
        generation: u64,
        delay: Duration,
        token: CancellationToken,
    ) {
        let tree = self.downgrade();
        let id = id.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            let applied = tree
                .upgrade()
                .is_some_and(|t| t.set_busy(&id, generation));
            if !applied {
                return;
            }
            token.cancelled().await;
            if let Some(t) = tree.upgrade() {
                t.reset_busy(&id, generation);
            }
        });
    }

    fn set_busy(&self, id: &NodeId, generation: u64) -> bool {
        let (applied, changed) = {
            let mut state = self.state();
            if state.generation != generation {
                return false;
            }
            match state.store.get_mut(id) {
                Some(node) => {
                    let old = node.increment_busy();
                    (true, (old == 0).then(|| node.clone()))
                }
                None => (false, None),
            }
        };
        if let Some(node) = changed {
            self.inner.on_did_change_busy.fire(&node);
        }
        applied
    }

    fn reset_busy(&self, id: &NodeId, generation: u64) {
        let changed = {
            let mut state = self.state();
            if state.generation != generation {
                tracing::debug!(node = %id, "busy marker outlived its root");
                return;
            }
            state
                .store
                .get_mut(id)
                .and_then(|node| node.decrement_busy().then(|| node.clone()))
        };
        if let Some(node) = changed {
            self.inner.on_did_change_busy.fire(&node);
        }
    }

    pub fn mark_as_checked(&self, id: &NodeId, checked: bool) {
        let updated = self.update_node(id, |node| {
            let checkbox = node.checkbox.get_or_insert_with(Default::default);
            checkbox.checked = checked;
            node.clone()
        });
        if let Some(node) = updated {
            self.inner.on_did_update.fire(&vec![node]);
        }
    }

    pub(crate) fn update_node<R>(
        &self,
        id: &NodeId,
        f: impl FnOnce(&mut TreeNode) -> R,
    ) -> Option<R> {
        let mut state = self.state();
        state.store.get_mut(id).map(f)
    }

    pub(crate) fn fire_changed(&self) {
        self.inner.on_changed.fire(&());
    }
}

#[cfg(test)]
#[path = "../../tests/unit/tree/tree.rs"]
mod tests;
