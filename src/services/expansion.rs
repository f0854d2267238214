//! 展开服务：维护可展开节点的展开/折叠状态
//!
//! 展开未加载的节点会先刷新其子节点；父节点刷新时，已展开的子节点在
//! wait-until 窗口内一并刷新。

use crate::core::disposable::DisposableCollection;
use crate::core::event::Emitter;
use crate::error::TreeError;
use crate::models::{IteratorOptions, NodeId, Resolution, TopDownIterator, TreeNode};
use crate::tree::Tree;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionState {
    /// Expanded nodes in top-down order.
    pub expanded: Vec<NodeId>,
}

struct ExpansionInner {
    tree: Tree,
    on_expansion_changed: Emitter<TreeNode>,
}

pub struct ExpansionService {
    inner: Arc<ExpansionInner>,
    _subscriptions: DisposableCollection,
}

impl ExpansionService {
    pub fn new(tree: Tree) -> Self {
        let inner = Arc::new(ExpansionInner {
            tree: tree.clone(),
            on_expansion_changed: Emitter::new(),
        });

        let mut subscriptions = DisposableCollection::new();
        let weak = tree.downgrade();
        subscriptions.push(tree.on_node_refreshed().subscribe(move |event| {
            let Some(tree) = weak.upgrade() else { return };
            let expanded: Vec<NodeId> = tree.read(|store| {
                event
                    .payload
                    .children()
                    .iter()
                    .filter(|id| store.get(id).is_some_and(|child| child.is_expanded()))
                    .cloned()
                    .collect()
            });
            for child in expanded {
                let tree = tree.clone();
                event.wait_until(async move {
                    if let Err(e) = tree.refresh(Some(&child), None).await {
                        tracing::warn!(node = %child, error = %e, "failed to refresh expanded child");
                    }
                });
            }
        }));

        Self {
            inner,
            _subscriptions: subscriptions,
        }
    }

    pub fn on_expansion_changed(&self) -> &Emitter<TreeNode> {
        &self.inner.on_expansion_changed
    }

    /// Expand a collapsed node, loading its children first when they have
    /// not been resolved yet. Resolves to the expanded node, or `None` when
    /// there was nothing to expand.
    pub async fn expand_node(&self, id: &NodeId) -> Result<Option<TreeNode>, TreeError> {
        let tree = &self.inner.tree;
        if !tree.get_node(id).is_some_and(|node| node.is_collapsed()) {
            return Ok(None);
        }
        if tree.resolution(id) != Resolution::Resolved
            && tree.refresh(Some(id), None).await?.is_none()
        {
            return Ok(None);
        }

        let expanded = tree.update_node(id, |node| {
            if node.is_collapsed() {
                node.set_expanded(true);
                Some(node.clone())
            } else {
                None
            }
        });
        let expanded = expanded.flatten();
        if let Some(node) = &expanded {
            self.inner.on_expansion_changed.fire(node);
        }
        Ok(expanded)
    }

    /// The node stays in the store, so re-expanding it reuses its children.
    pub fn collapse_node(&self, id: &NodeId) -> bool {
        self.inner.collapse(id)
    }

    /// Collapse `id` and every expandable descendant, deepest first.
    pub fn collapse_all(&self, id: &NodeId) -> bool {
        let order: Vec<NodeId> = self.inner.tree.read(|store| match store.get(id) {
            Some(node) => {
                let options = IteratorOptions {
                    prune_collapsed: false,
                    prune_siblings: true,
                };
                TopDownIterator::new(store, node, options)
                    .filter(|n| n.is_expandable())
                    .map(|n| n.id.clone())
                    .collect()
            }
            None => Vec::new(),
        });

        let mut collapsed = false;
        for node in order.iter().rev() {
            collapsed |= self.inner.collapse(node);
        }
        collapsed
    }

    pub async fn toggle_node_expansion(&self, id: &NodeId) -> Result<(), TreeError> {
        let expanded = self
            .inner
            .tree
            .get_node(id)
            .is_some_and(|node| node.is_expanded());
        if expanded {
            self.collapse_node(id);
        } else {
            self.expand_node(id).await?;
        }
        Ok(())
    }

    pub fn is_expanded(&self, id: &NodeId) -> bool {
        self.inner
            .tree
            .get_node(id)
            .is_some_and(|node| node.is_expanded())
    }

    pub fn store_state(&self) -> ExpansionState {
        let expanded = self.inner.tree.read(|store| match store.root() {
            Some(root) => TopDownIterator::new(store, root, IteratorOptions::default())
                .filter(|node| node.is_expanded())
                .map(|node| node.id.clone())
                .collect(),
            None => Vec::new(),
        });
        ExpansionState { expanded }
    }

    /// Ids are expanded in order, so a parent's children are loaded before
    /// its expanded descendants are looked up.
    pub async fn restore_state(&self, state: &ExpansionState) -> Result<(), TreeError> {
        for id in &state.expanded {
            self.expand_node(id).await?;
        }
        Ok(())
    }
}

impl ExpansionInner {
    fn collapse(&self, id: &NodeId) -> bool {
        let collapsed = self
            .tree
            .update_node(id, |node| {
                if node.is_expanded() {
                    node.set_expanded(false);
                    Some(node.clone())
                } else {
                    None
                }
            })
            .flatten();
        match collapsed {
            Some(node) => {
                self.on_expansion_changed.fire(&node);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/services/expansion.rs"]
mod tests;
