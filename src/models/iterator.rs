//! 树遍历：自上而下（先序）、自下而上（镜像）、以及过滤列表上的环形遍历
//!
//! 迭代器只读 NodeStore，用完即弃，不可重启。

use super::node::TreeNode;
use super::store::NodeStore;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IteratorOptions {
    /// Children of collapsed expandable nodes are skipped.
    pub prune_collapsed: bool,
    /// Going forward, never leave the subtree of the start node.
    pub prune_siblings: bool,
}

impl IteratorOptions {
    pub fn visible() -> Self {
        Self {
            prune_collapsed: true,
            prune_siblings: false,
        }
    }
}

fn find_first_child<'a>(
    store: &'a NodeStore,
    node: &'a TreeNode,
    options: IteratorOptions,
) -> Option<&'a TreeNode> {
    if options.prune_collapsed && node.is_collapsed() {
        return None;
    }
    store.first_child(node)
}

fn find_last_child<'a>(
    store: &'a NodeStore,
    node: &'a TreeNode,
    options: IteratorOptions,
) -> Option<&'a TreeNode> {
    if options.prune_collapsed && node.is_collapsed() {
        return None;
    }
    store.last_child(node)
}

pub struct TopDownIterator<'a> {
    store: &'a NodeStore,
    start: Option<&'a TreeNode>,
    next: Option<&'a TreeNode>,
    options: IteratorOptions,
}

impl<'a> TopDownIterator<'a> {
    pub fn new(store: &'a NodeStore, start: &'a TreeNode, options: IteratorOptions) -> Self {
        Self {
            store,
            start: Some(start),
            next: Some(start),
            options,
        }
    }

    pub fn empty(store: &'a NodeStore) -> Self {
        Self {
            store,
            start: None,
            next: None,
            options: IteratorOptions::default(),
        }
    }

    fn find_next_sibling(&self, mut node: &'a TreeNode) -> Option<&'a TreeNode> {
        loop {
            if self.options.prune_siblings && self.start.is_some_and(|s| s.id == node.id) {
                return None;
            }
            if let Some(sibling) = self.store.next_sibling(node) {
                return Some(sibling);
            }
            node = self.store.parent(node)?;
        }
    }
}

impl<'a> Iterator for TopDownIterator<'a> {
    type Item = &'a TreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = find_first_child(self.store, current, self.options)
            .or_else(|| self.find_next_sibling(current));
        Some(current)
    }
}

pub struct BottomUpIterator<'a> {
    store: &'a NodeStore,
    next: Option<&'a TreeNode>,
    options: IteratorOptions,
}

impl<'a> BottomUpIterator<'a> {
    pub fn new(store: &'a NodeStore, start: &'a TreeNode, options: IteratorOptions) -> Self {
        Self {
            store,
            next: Some(start),
            options,
        }
    }

    fn last_descendant(&self, mut node: &'a TreeNode) -> &'a TreeNode {
        while let Some(child) = find_last_child(self.store, node, self.options) {
            node = child;
        }
        node
    }
}

impl<'a> Iterator for BottomUpIterator<'a> {
    type Item = &'a TreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = match self.store.previous_sibling(current) {
            Some(sibling) => Some(self.last_descendant(sibling)),
            None => self.store.parent(current),
        };
        Some(current)
    }
}

/// One lap over `items`, starting at `first` and wrapping past the end.
pub struct CycleIterator<'a, T> {
    items: &'a [T],
    start: usize,
    yielded: usize,
}

impl<'a, T: PartialEq> CycleIterator<'a, T> {
    pub fn new(items: &'a [T], first: &T) -> Self {
        match items.iter().position(|item| item == first) {
            Some(start) => Self {
                items,
                start,
                yielded: 0,
            },
            None => Self {
                items,
                start: 0,
                yielded: items.len(),
            },
        }
    }
}

impl<'a, T> Iterator for CycleIterator<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.yielded >= self.items.len() {
            return None;
        }
        let index = (self.start + self.yielded) % self.items.len();
        self.yielded += 1;
        self.items.get(index)
    }
}

/// Nodes in display order: top-down from the root, collapsed subtrees pruned.
pub fn visible_order(store: &NodeStore) -> Vec<&TreeNode> {
    ordered_nodes(store, IteratorOptions::visible())
}

/// Every node reachable top-down from the root under `options`.
pub fn ordered_nodes(store: &NodeStore, options: IteratorOptions) -> Vec<&TreeNode> {
    match store.root() {
        Some(root) => TopDownIterator::new(store, root, options).collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/models/iterator.rs"]
mod tests;
