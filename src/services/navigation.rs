//! 导航历史：线性的根节点历史，带当前位置
//!
//! push 会截断当前位置之后的前进历史。

use crate::models::TreeNode;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct History {
    nodes: Vec<TreeNode>,
    index: Option<usize>,
}

impl History {
    fn next(&self) -> Option<&TreeNode> {
        let index = self.index?;
        self.nodes.get(index + 1)
    }

    fn prev(&self) -> Option<&TreeNode> {
        let index = self.index?.checked_sub(1)?;
        self.nodes.get(index)
    }
}

#[derive(Default)]
pub struct NavigationService {
    history: Mutex<History>,
}

impl NavigationService {
    pub fn new() -> Self {
        Self::default()
    }

    fn history(&self) -> MutexGuard<'_, History> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, node: TreeNode) {
        let mut history = self.history();
        let keep = history.index.map_or(0, |index| index + 1);
        history.nodes.truncate(keep);
        history.nodes.push(node);
        history.index = Some(history.nodes.len() - 1);
    }

    pub fn current(&self) -> Option<TreeNode> {
        let history = self.history();
        history.index.and_then(|index| history.nodes.get(index).cloned())
    }

    pub fn next(&self) -> Option<TreeNode> {
        self.history().next().cloned()
    }

    pub fn prev(&self) -> Option<TreeNode> {
        self.history().prev().cloned()
    }

    /// Step forward and return the new current entry.
    pub fn advance(&self) -> Option<TreeNode> {
        let mut history = self.history();
        let node = history.next().cloned()?;
        history.index = history.index.map(|index| index + 1);
        Some(node)
    }

    /// Step backward and return the new current entry.
    pub fn retreat(&self) -> Option<TreeNode> {
        let mut history = self.history();
        let node = history.prev().cloned()?;
        history.index = history.index.map(|index| index - 1);
        Some(node)
    }

    pub fn can_go_forward(&self) -> bool {
        self.history().next().is_some()
    }

    pub fn can_go_back(&self) -> bool {
        self.history().prev().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.history().nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.history().nodes.len()
    }

    pub fn clear(&self) {
        *self.history() = History::default();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/services/navigation.rs"]
mod tests;
