//! 树过滤：按标签做模糊子序列匹配
//!
//! 过滤生效时，只有匹配的可见节点参与"可选节点"导航；
//! 匹配区间以字符下标表示，供渲染高亮。

use super::label::LabelProvider;
use crate::core::disposable::DisposableCollection;
use crate::core::event::Emitter;
use crate::models::{IteratorOptions, NodeId, TopDownIterator};
use crate::tree::Tree;
use rustc_hash::FxHashMap;
use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard};

/// Match `pattern` as a subsequence of `text`, returning the matched
/// character ranges with adjacent hits merged.
pub fn fuzzy_match(pattern: &str, text: &str, case_sensitive: bool) -> Option<Vec<Range<usize>>> {
    let fold = |c: char| {
        if case_sensitive {
            c
        } else {
            c.to_lowercase().next().unwrap_or(c)
        }
    };

    let mut wanted = pattern.chars().filter(|c| !c.is_whitespace()).map(fold).peekable();
    wanted.peek()?;

    let mut ranges: Vec<Range<usize>> = Vec::new();
    for (index, c) in text.chars().enumerate() {
        let Some(&next) = wanted.peek() else { break };
        if fold(c) != next {
            continue;
        }
        wanted.next();
        match ranges.last_mut() {
            Some(last) if last.end == index => last.end = index + 1,
            _ => ranges.push(index..index + 1),
        }
    }

    wanted.peek().is_none().then_some(ranges)
}

#[derive(Default)]
struct FilterState {
    pattern: String,
    filtered: Vec<NodeId>,
    matches: FxHashMap<NodeId, Vec<Range<usize>>>,
}

struct SearchInner {
    tree: Tree,
    labels: Arc<dyn LabelProvider>,
    case_sensitive: bool,
    state: Mutex<FilterState>,
    on_filtered_nodes_changed: Emitter<Vec<NodeId>>,
}

pub struct TreeSearch {
    inner: Arc<SearchInner>,
    _subscriptions: DisposableCollection,
}

impl TreeSearch {
    pub fn new(tree: Tree, labels: Arc<dyn LabelProvider>) -> Self {
        let case_sensitive = tree.config().case_sensitive_filter;
        let inner = Arc::new(SearchInner {
            tree: tree.clone(),
            labels,
            case_sensitive,
            state: Mutex::new(FilterState::default()),
            on_filtered_nodes_changed: Emitter::new(),
        });

        let mut subscriptions = DisposableCollection::new();
        let weak = Arc::downgrade(&inner);
        subscriptions.push(tree.on_changed().subscribe(move |_| {
            let Some(inner) = weak.upgrade() else { return };
            let pattern = inner.state().pattern.clone();
            if !pattern.is_empty() {
                inner.filter(&pattern);
            }
        }));

        Self {
            inner,
            _subscriptions: subscriptions,
        }
    }

    pub fn on_filtered_nodes_changed(&self) -> &Emitter<Vec<NodeId>> {
        &self.inner.on_filtered_nodes_changed
    }

    /// Filter loaded visible nodes by `pattern`; an empty pattern clears
    /// the filter. Returns the matching ids in top-down order.
    pub fn filter(&self, pattern: &str) -> Vec<NodeId> {
        self.inner.filter(pattern)
    }

    pub fn pattern(&self) -> String {
        self.inner.state().pattern.clone()
    }

    pub fn is_active(&self) -> bool {
        !self.inner.state().pattern.is_empty()
    }

    pub fn filtered_nodes(&self) -> Vec<NodeId> {
        self.inner.state().filtered.clone()
    }

    /// Every node passes while no filter is active.
    pub fn passes_filter(&self, id: &NodeId) -> bool {
        let state = self.inner.state();
        state.pattern.is_empty() || state.matches.contains_key(id)
    }

    pub fn match_ranges(&self, id: &NodeId) -> Option<Vec<Range<usize>>> {
        self.inner.state().matches.get(id).cloned()
    }
}

impl SearchInner {
    fn state(&self) -> MutexGuard<'_, FilterState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn filter(&self, pattern: &str) -> Vec<NodeId> {
        let pattern = pattern.trim();
        let matches: Vec<(NodeId, Vec<Range<usize>>)> = if pattern.is_empty() {
            Vec::new()
        } else {
            self.tree.read(|store| {
                let Some(root) = store.root() else {
                    return Vec::new();
                };
                TopDownIterator::new(store, root, IteratorOptions::default())
                    .filter(|node| node.is_visible())
                    .filter_map(|node| {
                        let label = self.labels.name(node);
                        fuzzy_match(pattern, &label, self.case_sensitive)
                            .map(|ranges| (node.id.clone(), ranges))
                    })
                    .collect()
            })
        };

        let filtered: Vec<NodeId> = matches.iter().map(|(id, _)| id.clone()).collect();
        let changed = {
            let mut state = self.state();
            let changed = state.filtered != filtered || state.pattern != pattern;
            state.pattern = pattern.to_string();
            state.filtered = filtered.clone();
            state.matches = matches.into_iter().collect();
            changed
        };
        if changed {
            tracing::debug!(pattern, matches = filtered.len(), "tree filter updated");
            self.on_filtered_nodes_changed.fire(&filtered);
        }
        filtered
    }
}

#[cfg(test)]
#[path = "../../tests/unit/services/filter.rs"]
mod tests;
