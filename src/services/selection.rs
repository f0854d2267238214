//! 选择服务：维护有序的选中节点集合
//!
//! 集合顺序为加入顺序；范围选择按显示顺序展开。节点的 `selected`
//! 标志只由这里修改。

use crate::core::disposable::DisposableCollection;
use crate::core::event::Emitter;
use crate::models::{ordered_nodes, NodeId, TreeNode};
use crate::tree::Tree;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionType {
    #[default]
    Default,
    Toggle,
    Range,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeSelection {
    pub node: NodeId,
    pub kind: SelectionType,
}

impl TreeSelection {
    pub fn new(node: NodeId, kind: SelectionType) -> Self {
        Self { node, kind }
    }

    pub fn toggle(node: NodeId) -> Self {
        Self::new(node, SelectionType::Toggle)
    }

    pub fn range(node: NodeId) -> Self {
        Self::new(node, SelectionType::Range)
    }
}

impl From<NodeId> for TreeSelection {
    fn from(node: NodeId) -> Self {
        Self::new(node, SelectionType::Default)
    }
}

impl From<&NodeId> for TreeSelection {
    fn from(node: &NodeId) -> Self {
        Self::new(node.clone(), SelectionType::Default)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub selected: Vec<NodeId>,
    /// Start of the next range selection.
    pub anchor: Option<NodeId>,
}

struct SelectionInner {
    tree: Tree,
    state: Mutex<SelectionState>,
    on_selection_changed: Emitter<Vec<TreeNode>>,
}

pub struct SelectionService {
    inner: Arc<SelectionInner>,
    _subscriptions: DisposableCollection,
}

impl SelectionService {
    pub fn new(tree: Tree) -> Self {
        let inner = Arc::new(SelectionInner {
            tree: tree.clone(),
            state: Mutex::new(SelectionState::default()),
            on_selection_changed: Emitter::new(),
        });

        let mut subscriptions = DisposableCollection::new();
        let weak = Arc::downgrade(&inner);
        subscriptions.push(tree.on_changed().subscribe(move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.prune();
            }
        }));

        Self {
            inner,
            _subscriptions: subscriptions,
        }
    }

    pub fn on_selection_changed(&self) -> &Emitter<Vec<TreeNode>> {
        &self.inner.on_selection_changed
    }

    pub fn selected_ids(&self) -> Vec<NodeId> {
        self.inner.state().selected.clone()
    }

    pub fn selected_nodes(&self) -> Vec<TreeNode> {
        self.inner.selected_nodes()
    }

    pub fn is_selected(&self, id: &NodeId) -> bool {
        self.inner.state().selected.contains(id)
    }

    /// Returns `false` when the target is missing, hidden or not selectable;
    /// the selection is left untouched in that case.
    pub fn add_selection(&self, selection: impl Into<TreeSelection>) -> bool {
        self.inner.add_selection(selection.into())
    }

    /// Always notifies listeners, even when nothing was selected.
    pub fn clear_selection(&self) {
        self.inner.transition(Vec::new(), None);
    }

    pub fn store_state(&self) -> SelectionState {
        self.inner.state().clone()
    }

    pub fn restore_state(&self, state: &SelectionState) {
        let selected: Vec<NodeId> = state
            .selected
            .iter()
            .filter(|id| self.inner.is_selectable(id))
            .cloned()
            .collect();
        let anchor = state
            .anchor
            .clone()
            .filter(|id| self.inner.is_selectable(id));
        self.inner.transition(selected, anchor);
    }
}

impl SelectionInner {
    fn state(&self) -> MutexGuard<'_, SelectionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_selectable(&self, id: &NodeId) -> bool {
        self.tree
            .get_node(id)
            .is_some_and(|node| node.is_visible_selectable())
    }

    fn selected_nodes(&self) -> Vec<TreeNode> {
        let ids = self.state().selected.clone();
        ids.iter().filter_map(|id| self.tree.get_node(id)).collect()
    }

    fn add_selection(&self, selection: TreeSelection) -> bool {
        if !self.is_selectable(&selection.node) {
            tracing::debug!(node = %selection.node, "ignoring selection of unselectable node");
            return false;
        }

        let (current, anchor) = {
            let state = self.state();
            (state.selected.clone(), state.anchor.clone())
        };
        let target = selection.node;
        let (next, anchor) = match selection.kind {
            SelectionType::Default => (vec![target.clone()], Some(target)),
            SelectionType::Toggle => {
                let mut next = current;
                if let Some(index) = next.iter().position(|id| *id == target) {
                    next.remove(index);
                    (next, anchor)
                } else {
                    next.push(target.clone());
                    (next, Some(target))
                }
            }
            SelectionType::Range => {
                let next = self.range(anchor.as_ref(), &target);
                (next, anchor.or(Some(target)))
            }
        };
        self.transition(next, anchor);
        true
    }

    /// The contiguous display-order span between `anchor` and `target`.
    fn range(&self, anchor: Option<&NodeId>, target: &NodeId) -> Vec<NodeId> {
        let options = self.tree.iterator_options();
        let order: Vec<NodeId> = self.tree.read(|store| {
            ordered_nodes(store, options)
                .into_iter()
                .filter(|node| node.is_visible_selectable())
                .map(|node| node.id.clone())
                .collect()
        });
        let Some(to) = order.iter().position(|id| id == target) else {
            return vec![target.clone()];
        };
        let from = anchor
            .and_then(|anchor| order.iter().position(|id| id == anchor))
            .unwrap_or(to);
        let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
        order[lo..=hi].to_vec()
    }

    fn transition(&self, next: Vec<NodeId>, anchor: Option<NodeId>) {
        let previous = {
            let mut state = self.state();
            state.anchor = anchor;
            std::mem::replace(&mut state.selected, next.clone())
        };

        for id in previous.iter().filter(|id| !next.contains(id)) {
            self.tree.update_node(id, |node| node.set_selected(false));
        }
        for id in next.iter().filter(|id| !previous.contains(id)) {
            self.tree.update_node(id, |node| node.set_selected(true));
        }

        self.on_selection_changed.fire(&self.selected_nodes());
    }

    /// Drop selected ids whose node left the tree or lost its flag.
    fn prune(&self) {
        let selected = self.state().selected.clone();
        if selected.is_empty() {
            return;
        }
        let alive: Vec<NodeId> = selected
            .iter()
            .filter(|id| self.tree.get_node(id).is_some_and(|node| node.selected()))
            .cloned()
            .collect();
        if alive.len() == selected.len() {
            return;
        }

        {
            let mut state = self.state();
            state.selected.retain(|id| alive.contains(id));
            if state
                .anchor
                .as_ref()
                .is_some_and(|anchor| !self.tree.read(|store| store.contains(anchor)))
            {
                state.anchor = None;
            }
        }
        self.on_selection_changed.fire(&self.selected_nodes());
    }
}

#[cfg(test)]
#[path = "../../tests/unit/services/selection.rs"]
mod tests;
