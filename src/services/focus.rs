//! 焦点服务：至多一个获得焦点的节点

use crate::core::disposable::DisposableCollection;
use crate::core::event::Emitter;
use crate::models::{NodeId, TreeNode};
use crate::tree::Tree;
use std::sync::{Arc, Mutex, MutexGuard};

struct FocusInner {
    tree: Tree,
    focused: Mutex<Option<NodeId>>,
    on_did_change_focus: Emitter<Option<TreeNode>>,
}

pub struct FocusService {
    inner: Arc<FocusInner>,
    _subscriptions: DisposableCollection,
}

impl FocusService {
    pub fn new(tree: Tree) -> Self {
        let inner = Arc::new(FocusInner {
            tree: tree.clone(),
            focused: Mutex::new(None),
            on_did_change_focus: Emitter::new(),
        });

        let mut subscriptions = DisposableCollection::new();
        let weak = Arc::downgrade(&inner);
        subscriptions.push(tree.on_changed().subscribe(move |_| {
            let Some(inner) = weak.upgrade() else { return };
            let stale = inner
                .focused()
                .clone()
                .is_some_and(|id| inner.tree.get_node(&id).is_none());
            if stale {
                inner.set(None);
            }
        }));

        Self {
            inner,
            _subscriptions: subscriptions,
        }
    }

    pub fn on_did_change_focus(&self) -> &Emitter<Option<TreeNode>> {
        &self.inner.on_did_change_focus
    }

    pub fn focused_id(&self) -> Option<NodeId> {
        self.inner.focused().clone()
    }

    pub fn focused_node(&self) -> Option<TreeNode> {
        let id = self.focused_id()?;
        self.inner.tree.get_node(&id)
    }

    pub fn has_focus(&self, id: &NodeId) -> bool {
        self.inner.focused().as_ref() == Some(id)
    }

    /// Nodes outside the tree are ignored. Listeners only hear about actual
    /// changes.
    pub fn set_focus(&self, id: Option<&NodeId>) {
        if let Some(id) = id {
            if self.inner.tree.get_node(id).is_none() {
                tracing::debug!(node = %id, "ignoring focus on unknown node");
                return;
            }
        }
        self.inner.set(id.cloned());
    }
}

impl FocusInner {
    fn focused(&self) -> MutexGuard<'_, Option<NodeId>> {
        self.focused
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set(&self, id: Option<NodeId>) {
        {
            let mut focused = self.focused();
            if *focused == id {
                return;
            }
            *focused = id.clone();
        }
        let node = id.and_then(|id| self.tree.get_node(&id));
        self.on_did_change_focus.fire(&node);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/services/focus.rs"]
mod tests;
