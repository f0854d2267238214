//! 树装饰：汇总各 TreeDecorator 给出的按节点装饰
//!
//! 同一节点的多份装饰按优先级升序排列，后者覆盖前者。

use crate::core::disposable::DisposableCollection;
use crate::core::event::Emitter;
use crate::models::NodeId;
use crate::tree::Tree;
use async_trait::async_trait;
use futures::future::join_all;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TailDecoration {
    pub data: String,
    pub color: Option<String>,
    pub tooltip: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeDecorationData {
    pub priority: i32,
    pub font_color: Option<String>,
    pub background_color: Option<String>,
    pub caption_prefixes: Vec<String>,
    pub caption_suffixes: Vec<String>,
    pub tail_decorations: Vec<TailDecoration>,
    pub icon_overlay: Option<String>,
    pub tooltip: Option<String>,
}

pub type NodeDecorations = FxHashMap<NodeId, Vec<TreeDecorationData>>;

#[async_trait]
pub trait TreeDecorator: Send + Sync {
    fn id(&self) -> &str;

    fn on_did_change_decorations(&self) -> &Emitter<()>;

    async fn decorations(&self, tree: &Tree) -> FxHashMap<NodeId, TreeDecorationData>;
}

pub struct TreeDecoratorService {
    decorators: Vec<Arc<dyn TreeDecorator>>,
    on_did_change_decorations: Arc<Emitter<()>>,
    _subscriptions: DisposableCollection,
}

impl TreeDecoratorService {
    pub fn new(decorators: Vec<Arc<dyn TreeDecorator>>) -> Self {
        let on_did_change_decorations = Arc::new(Emitter::new());
        let mut subscriptions = DisposableCollection::new();
        for decorator in &decorators {
            let changed = on_did_change_decorations.clone();
            let id = decorator.id().to_string();
            subscriptions.push(decorator.on_did_change_decorations().subscribe(move |_| {
                tracing::debug!(decorator = %id, "tree decorations changed");
                changed.fire(&());
            }));
        }
        Self {
            decorators,
            on_did_change_decorations,
            _subscriptions: subscriptions,
        }
    }

    /// Fires whenever any decorator reports a change.
    pub fn on_did_change_decorations(&self) -> &Emitter<()> {
        &self.on_did_change_decorations
    }

    pub fn decorator_ids(&self) -> Vec<&str> {
        self.decorators.iter().map(|d| d.id()).collect()
    }

    /// Query every decorator concurrently and merge the results per node.
    pub async fn get_decorations(&self, tree: &Tree) -> NodeDecorations {
        let results = join_all(self.decorators.iter().map(|d| d.decorations(tree))).await;

        let mut merged = NodeDecorations::default();
        for decorations in results {
            for (id, data) in decorations {
                merged.entry(id).or_default().push(data);
            }
        }
        for data in merged.values_mut() {
            data.sort_by_key(|d| d.priority);
        }
        merged
    }
}

/// Serializable form of per-node decorations, for storing widget state.
pub fn deflate_decorators(decorations: &NodeDecorations) -> serde_json::Result<serde_json::Value> {
    serde_json::to_value(decorations)
}

pub fn inflate_decorators(state: &serde_json::Value) -> serde_json::Result<NodeDecorations> {
    NodeDecorations::deserialize(state)
}

#[cfg(test)]
#[path = "../../tests/unit/decorations/tree_decorator.rs"]
mod tests;
