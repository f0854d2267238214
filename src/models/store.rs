//! 节点表：id -> 节点，树结构只通过 id 互相引用

use super::node::{NodeId, TreeNode};
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Unresolved,
    Resolving,
    Resolved,
}

#[derive(Debug, Default)]
pub struct NodeStore {
    nodes: FxHashMap<NodeId, TreeNode>,
    resolution: FxHashMap<NodeId, Resolution>,
    root: Option<NodeId>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.root.as_ref().and_then(|id| self.nodes.get(id))
    }

    pub fn root_id(&self) -> Option<&NodeId> {
        self.root.as_ref()
    }

    pub fn get(&self, id: &NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn resolution(&self, id: &NodeId) -> Resolution {
        self.resolution
            .get(id)
            .copied()
            .unwrap_or(Resolution::Unresolved)
    }

    pub fn parent(&self, node: &TreeNode) -> Option<&TreeNode> {
        node.parent().and_then(|id| self.nodes.get(id))
    }

    pub fn first_child(&self, node: &TreeNode) -> Option<&TreeNode> {
        node.children().first().and_then(|id| self.nodes.get(id))
    }

    pub fn last_child(&self, node: &TreeNode) -> Option<&TreeNode> {
        node.children().last().and_then(|id| self.nodes.get(id))
    }

    pub fn previous_sibling(&self, node: &TreeNode) -> Option<&TreeNode> {
        let (siblings, index) = self.position(node)?;
        let prev = index.checked_sub(1)?;
        siblings.get(prev).and_then(|id| self.nodes.get(id))
    }

    pub fn next_sibling(&self, node: &TreeNode) -> Option<&TreeNode> {
        let (siblings, index) = self.position(node)?;
        siblings.get(index + 1).and_then(|id| self.nodes.get(id))
    }

    fn position(&self, node: &TreeNode) -> Option<(&[NodeId], usize)> {
        let parent = self.parent(node)?;
        let siblings = parent.children();
        let index = siblings.iter().position(|id| *id == node.id)?;
        Some((siblings, index))
    }

    pub fn is_ancestor(&self, ancestor: &NodeId, descendant: &NodeId) -> bool {
        let mut current = self.nodes.get(descendant).and_then(|n| n.parent());
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(id).and_then(|n| n.parent());
        }
        false
    }

    pub fn ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    pub(crate) fn get_mut(&mut self, id: &NodeId) -> Option<&mut TreeNode> {
        self.nodes.get_mut(id)
    }

    pub(crate) fn set_resolution(&mut self, id: &NodeId, state: Resolution) {
        if self.nodes.contains_key(id) {
            self.resolution.insert(id.clone(), state);
        }
    }

    /// Drop everything and install `root` as a fresh, unresolved root.
    pub(crate) fn reset(&mut self, root: Option<TreeNode>) {
        self.nodes.clear();
        self.resolution.clear();
        self.root = None;
        if let Some(mut root) = root {
            root.set_parent(None);
            root.set_children(Vec::new());
            root.set_selected(false);
            root.clear_busy();
            let id = root.id.clone();
            self.nodes.insert(id.clone(), root);
            self.root = Some(id);
        }
    }

    /// Replace the children of `parent`.
    ///
    /// A new child whose id matches a current child keeps its subtree and
    /// the state the services own; the provider's attributes are merged
    /// onto it. Old children that are not matched are removed with their
    /// whole subtree.
    pub(crate) fn replace_children(&mut self, parent: &NodeId, incoming: Vec<TreeNode>) -> bool {
        let Some(old_children) = self.nodes.get(parent).map(|n| n.children().to_vec()) else {
            return false;
        };

        let mut seen = FxHashSet::default();
        let incoming: Vec<TreeNode> = incoming
            .into_iter()
            .filter(|child| {
                if child.id == *parent || !seen.insert(child.id.clone()) {
                    tracing::warn!(parent = %parent, child = %child.id, "duplicate child id ignored");
                    return false;
                }
                true
            })
            .collect();

        let kept: FxHashSet<NodeId> = incoming
            .iter()
            .map(|c| c.id.clone())
            .filter(|id| old_children.contains(id))
            .collect();
        for old in old_children.iter().filter(|id| !kept.contains(*id)) {
            self.remove_subtree(old);
        }

        let mut new_ids = Vec::with_capacity(incoming.len());
        for child in incoming {
            let id = child.id.clone();
            if kept.contains(&id) {
                let orphans = match self.nodes.get_mut(&id) {
                    Some(existing) => {
                        let previous = existing.children().to_vec();
                        existing.merge_attributes(child);
                        if existing.is_composite() {
                            Vec::new()
                        } else {
                            previous
                        }
                    }
                    None => Vec::new(),
                };
                for orphan in orphans {
                    self.remove_subtree(&orphan);
                }
            } else {
                if self.nodes.contains_key(&id) {
                    if self.is_ancestor(&id, parent) || self.root.as_ref() == Some(&id) {
                        tracing::warn!(parent = %parent, child = %id, "child id refers to an ancestor");
                        continue;
                    }
                    // The id lives elsewhere in the tree; the newest placement wins.
                    self.detach(&id);
                }
                self.insert_child(parent, child);
            }
            new_ids.push(id);
        }

        if let Some(node) = self.nodes.get_mut(parent) {
            node.set_children(new_ids);
        }
        true
    }

    // Providers hand over detached nodes: children arrive through their own refresh.
    fn insert_child(&mut self, parent: &NodeId, mut node: TreeNode) {
        node.set_parent(Some(parent.clone()));
        node.set_selected(false);
        node.set_children(Vec::new());
        let id = node.id.clone();
        self.nodes.insert(id.clone(), node);
        self.resolution.insert(id, Resolution::Unresolved);
    }

    fn detach(&mut self, id: &NodeId) {
        let parent = self.nodes.get(id).and_then(|n| n.parent().cloned());
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            let children: Vec<NodeId> = parent
                .children()
                .iter()
                .filter(|c| *c != id)
                .cloned()
                .collect();
            parent.set_children(children);
        }
        self.remove_subtree(id);
    }

    pub(crate) fn remove_subtree(&mut self, id: &NodeId) {
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                stack.extend(node.children().iter().cloned());
            }
            self.resolution.remove(&current);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/models/store.rs"]
mod tests;
