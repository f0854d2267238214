//! 树模型：把树与各服务组合成一个可操作的整体
//!
//! - 树、选择、展开、焦点的变化统一汇入 on_changed
//! - 键盘式导航：上/下一个节点、上/下一个可选节点（过滤生效时只在匹配项中循环）
//! - 根节点导航历史与状态的保存/恢复

use super::Tree;
use crate::core::disposable::DisposableCollection;
use crate::core::event::Emitter;
use crate::error::TreeError;
use crate::models::{
    ordered_nodes, BottomUpIterator, CycleIterator, IteratorOptions, NodeId, NodeStore,
    TopDownIterator, TreeNode,
};
use crate::services::{
    ExpansionService, ExpansionState, FocusService, LabelProvider, NavigationService,
    SelectionService, SelectionState, SelectionType, TreeSearch, TreeSelection,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TreeModelState {
    pub root: Option<TreeNode>,
    pub selection: SelectionState,
    pub expansion: ExpansionState,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

pub struct TreeModel {
    tree: Tree,
    selection: SelectionService,
    expansion: ExpansionService,
    focus: FocusService,
    navigation: NavigationService,
    search: TreeSearch,
    on_changed: Arc<Emitter<()>>,
    on_open_node: Emitter<TreeNode>,
    _subscriptions: DisposableCollection,
}

impl TreeModel {
    pub fn new(tree: Tree, labels: Arc<dyn LabelProvider>) -> Self {
        let selection = SelectionService::new(tree.clone());
        let expansion = ExpansionService::new(tree.clone());
        let focus = FocusService::new(tree.clone());
        let search = TreeSearch::new(tree.clone(), labels);
        let on_changed = Arc::new(Emitter::new());

        let mut subscriptions = DisposableCollection::new();
        let changed = on_changed.clone();
        subscriptions.push(tree.on_changed().subscribe(move |_| changed.fire(&())));
        let changed = on_changed.clone();
        subscriptions.push(
            selection
                .on_selection_changed()
                .subscribe(move |_| changed.fire(&())),
        );
        let changed = on_changed.clone();
        subscriptions.push(
            expansion
                .on_expansion_changed()
                .subscribe(move |_| changed.fire(&())),
        );
        let changed = on_changed.clone();
        subscriptions.push(
            focus
                .on_did_change_focus()
                .subscribe(move |_| changed.fire(&())),
        );

        Self {
            tree,
            selection,
            expansion,
            focus,
            navigation: NavigationService::new(),
            search,
            on_changed,
            on_open_node: Emitter::new(),
            _subscriptions: subscriptions,
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn selection(&self) -> &SelectionService {
        &self.selection
    }

    pub fn expansion(&self) -> &ExpansionService {
        &self.expansion
    }

    pub fn focus(&self) -> &FocusService {
        &self.focus
    }

    pub fn navigation(&self) -> &NavigationService {
        &self.navigation
    }

    pub fn search(&self) -> &TreeSearch {
        &self.search
    }

    pub fn on_changed(&self) -> &Emitter<()> {
        &self.on_changed
    }

    pub fn on_open_node(&self) -> &Emitter<TreeNode> {
        &self.on_open_node
    }

    pub fn on_selection_changed(&self) -> &Emitter<Vec<TreeNode>> {
        self.selection.on_selection_changed()
    }

    pub fn on_expansion_changed(&self) -> &Emitter<TreeNode> {
        self.expansion.on_expansion_changed()
    }

    pub fn root(&self) -> Option<TreeNode> {
        self.tree.root()
    }

    pub fn get_node(&self, id: &NodeId) -> Option<TreeNode> {
        self.tree.get_node(id)
    }

    pub fn validate_node(&self, node: &TreeNode) -> Option<TreeNode> {
        self.tree.validate_node(node)
    }

    pub fn selected_nodes(&self) -> Vec<TreeNode> {
        self.selection.selected_nodes()
    }

    pub fn focused_node(&self) -> Option<TreeNode> {
        self.focus.focused_node()
    }

    pub async fn set_root(&self, root: Option<TreeNode>) -> Result<Option<TreeNode>, TreeError> {
        self.tree.set_root(root).await
    }

    pub async fn refresh(&self, parent: Option<&NodeId>) -> Result<Option<TreeNode>, TreeError> {
        self.tree.refresh(parent, None).await
    }

    // ==================== Selection ====================

    /// Apply `selection` and move focus to its target. Returns `false` when
    /// the target cannot be selected.
    pub fn add_selection(&self, selection: impl Into<TreeSelection>) -> bool {
        let selection = selection.into();
        let target = selection.node.clone();
        if !self.selection.add_selection(selection) {
            return false;
        }
        self.focus.set_focus(Some(&target));
        true
    }

    pub fn select_node(&self, id: &NodeId) -> bool {
        self.add_selection(TreeSelection::new(id.clone(), SelectionType::Default))
    }

    pub fn toggle_node(&self, id: &NodeId) -> bool {
        self.add_selection(TreeSelection::toggle(id.clone()))
    }

    pub fn select_range(&self, id: &NodeId) -> bool {
        self.add_selection(TreeSelection::range(id.clone()))
    }

    pub fn clear_selection(&self) {
        self.selection.clear_selection();
    }

    // ==================== Expansion ====================

    pub async fn expand_node(&self, id: &NodeId) -> Result<Option<TreeNode>, TreeError> {
        self.expansion.expand_node(id).await
    }

    pub fn collapse_node(&self, id: &NodeId) -> bool {
        self.expansion.collapse_node(id)
    }

    /// Collapse everything below `id`, or below the root when `None`.
    pub fn collapse_all(&self, id: Option<&NodeId>) -> bool {
        let target = id.cloned().or_else(|| self.tree.root().map(|root| root.id));
        target.is_some_and(|target| self.expansion.collapse_all(&target))
    }

    pub async fn toggle_node_expansion(&self, id: &NodeId) -> Result<(), TreeError> {
        self.expansion.toggle_node_expansion(id).await
    }

    // ==================== Keyboard navigation ====================

    /// The node after `from` (the focused node when `None`) in display
    /// order, whatever its selectability.
    pub fn get_next_node(&self, from: Option<&NodeId>) -> Option<TreeNode> {
        self.find_node(from, Direction::Forward, |_| true)
    }

    pub fn get_prev_node(&self, from: Option<&NodeId>) -> Option<TreeNode> {
        self.find_node(from, Direction::Backward, |_| true)
    }

    /// The next visible selectable node. While a filter is active only
    /// matching nodes qualify, and the walk wraps around the match list.
    pub fn get_next_selectable_node(&self, from: Option<&NodeId>) -> Option<TreeNode> {
        if self.search.is_active() {
            return self.find_filtered(from, Direction::Forward);
        }
        self.find_node(from, Direction::Forward, TreeNode::is_visible_selectable)
    }

    pub fn get_prev_selectable_node(&self, from: Option<&NodeId>) -> Option<TreeNode> {
        if self.search.is_active() {
            return self.find_filtered(from, Direction::Backward);
        }
        self.find_node(from, Direction::Backward, TreeNode::is_visible_selectable)
    }

    /// Move focus to the next node, selecting it when it is selectable.
    pub fn select_next(&self) -> Option<TreeNode> {
        let node = self.get_next_node(None)?;
        self.move_focus(&node);
        Some(node)
    }

    pub fn select_prev(&self) -> Option<TreeNode> {
        let node = self.get_prev_node(None)?;
        self.move_focus(&node);
        Some(node)
    }

    pub fn select_next_node(&self, kind: SelectionType) -> Option<TreeNode> {
        let node = self.get_next_selectable_node(None)?;
        self.add_selection(TreeSelection::new(node.id.clone(), kind));
        Some(node)
    }

    pub fn select_prev_node(&self, kind: SelectionType) -> Option<TreeNode> {
        let node = self.get_prev_selectable_node(None)?;
        self.add_selection(TreeSelection::new(node.id.clone(), kind));
        Some(node)
    }

    /// Select the nearest visible selectable ancestor of the focused node.
    pub fn select_parent(&self) -> Option<TreeNode> {
        let start = self.current_node()?;
        let parent = self.tree.read(|store| {
            let mut current = store.get(&start)?;
            loop {
                current = store.parent(current)?;
                if current.is_visible_selectable() {
                    return Some(current.clone());
                }
            }
        })?;
        self.select_node(&parent.id);
        Some(parent)
    }

    /// Toggle an expandable node, then notify open listeners. Opens the
    /// focused node when `id` is `None`.
    pub async fn open_node(&self, id: Option<&NodeId>) -> Result<Option<TreeNode>, TreeError> {
        let Some(target) = id.cloned().or_else(|| self.current_node()) else {
            return Ok(None);
        };
        let Some(node) = self.tree.get_node(&target) else {
            return Ok(None);
        };
        if node.is_expandable() {
            self.expansion.toggle_node_expansion(&node.id).await?;
        }
        let node = self.tree.get_node(&node.id).unwrap_or(node);
        self.on_open_node.fire(&node);
        Ok(Some(node))
    }

    fn current_node(&self) -> Option<NodeId> {
        self.focus.focused_id().or_else(|| {
            let selected = self.selection.selected_ids();
            match selected.as_slice() {
                [only] => Some(only.clone()),
                _ => None,
            }
        })
    }

    fn move_focus(&self, node: &TreeNode) {
        if node.is_visible_selectable() {
            self.select_node(&node.id);
        } else {
            self.focus.set_focus(Some(&node.id));
        }
    }

    fn find_node(
        &self,
        from: Option<&NodeId>,
        direction: Direction,
        accept: fn(&TreeNode) -> bool,
    ) -> Option<TreeNode> {
        let start = from.cloned().or_else(|| self.current_node());
        let options = self.tree.iterator_options();
        self.tree.read(|store| {
            let Some(start) = start.as_ref().and_then(|id| store.get(id)) else {
                return Self::fallback_node(store, options, direction, accept);
            };
            match direction {
                Direction::Forward => TopDownIterator::new(store, start, options)
                    .skip(1)
                    .find(|node| accept(node))
                    .cloned(),
                Direction::Backward => BottomUpIterator::new(store, start, options)
                    .skip(1)
                    .find(|node| accept(node))
                    .cloned(),
            }
        })
    }

    /// Without a starting point: first match after the root going forward,
    /// last match in display order going backward.
    fn fallback_node(
        store: &NodeStore,
        options: IteratorOptions,
        direction: Direction,
        accept: fn(&TreeNode) -> bool,
    ) -> Option<TreeNode> {
        let order = ordered_nodes(store, options);
        let mut candidates = order.into_iter().skip(1).filter(|node| accept(node));
        let found = match direction {
            Direction::Forward => candidates.next(),
            Direction::Backward => candidates.last(),
        };
        found.cloned()
    }

    fn find_filtered(&self, from: Option<&NodeId>, direction: Direction) -> Option<TreeNode> {
        let mut filtered = self.search.filtered_nodes();
        if direction == Direction::Backward {
            filtered.reverse();
        }
        let start = from.cloned().or_else(|| self.current_node());
        self.tree.read(|store| {
            let accept = |id: &NodeId| {
                store
                    .get(id)
                    .filter(|node| node.is_visible_selectable())
                    .cloned()
            };
            match start.filter(|id| filtered.contains(id)) {
                Some(start) => CycleIterator::new(&filtered, &start)
                    .skip(1)
                    .find_map(|id| accept(id)),
                None => filtered.iter().find_map(|id| accept(id)),
            }
        })
    }

    // ==================== Root navigation ====================

    /// Make `id` the new root and record it in the navigation history. The
    /// first navigation also records the root being left.
    pub async fn navigate_to(&self, id: &NodeId) -> Result<Option<TreeNode>, TreeError> {
        let Some(node) = self.tree.get_node(id) else {
            tracing::debug!(node = %id, "cannot navigate to unknown node");
            return Ok(None);
        };
        self.navigate_to_node(node).await
    }

    /// Like `navigate_to`, for a node that need not be part of the current
    /// tree.
    pub async fn navigate_to_node(&self, node: TreeNode) -> Result<Option<TreeNode>, TreeError> {
        if self.navigation.is_empty() {
            if let Some(root) = self.tree.root().filter(|root| root.id != node.id) {
                self.navigation.push(root);
            }
        }
        self.navigation.push(node.clone());
        self.do_navigate(node, None).await
    }

    pub async fn navigate_forward(&self) -> Result<Option<TreeNode>, TreeError> {
        match self.navigation.advance() {
            Some(node) => self.do_navigate(node, None).await,
            None => Ok(None),
        }
    }

    /// Re-selects the node that was navigated away from when it is part of
    /// the restored tree.
    pub async fn navigate_backward(&self) -> Result<Option<TreeNode>, TreeError> {
        let left = self.tree.root().map(|root| root.id);
        match self.navigation.retreat() {
            Some(node) => self.do_navigate(node, left).await,
            None => Ok(None),
        }
    }

    pub fn can_navigate_forward(&self) -> bool {
        self.navigation.can_go_forward()
    }

    pub fn can_navigate_backward(&self) -> bool {
        self.navigation.can_go_back()
    }

    async fn do_navigate(
        &self,
        node: TreeNode,
        reselect: Option<NodeId>,
    ) -> Result<Option<TreeNode>, TreeError> {
        let root_id = node.id.clone();
        self.tree.set_root(Some(node)).await?;
        if self
            .tree
            .get_node(&root_id)
            .is_some_and(|root| root.is_collapsed())
        {
            self.expansion.expand_node(&root_id).await?;
        }

        let target = reselect
            .filter(|id| self.tree.get_node(id).is_some())
            .unwrap_or_else(|| root_id.clone());
        self.select_node(&target);
        Ok(self.tree.get_node(&root_id))
    }

    // ==================== State ====================

    pub fn store_state(&self) -> TreeModelState {
        TreeModelState {
            root: self.tree.root(),
            selection: self.selection.store_state(),
            expansion: self.expansion.store_state(),
        }
    }

    pub async fn restore_state(&self, state: TreeModelState) -> Result<(), TreeError> {
        self.tree.set_root(state.root).await?;
        self.expansion.restore_state(&state.expansion).await?;
        self.selection.restore_state(&state.selection);
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/tree/model.rs"]
mod tests;
