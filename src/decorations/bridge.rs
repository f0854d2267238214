use super::service::{Decoration, DecorationsService};
use super::tree_decorator::{TailDecoration, TreeDecorationData, TreeDecorator};
use crate::core::event::{Emitter, Subscription};
use crate::models::NodeId;
use crate::tree::Tree;
use async_trait::async_trait;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use url::Url;

/// Presents URI decorations on the tree nodes carrying those URIs.
///
/// Composite nodes also show bubbling decorations of their descendants.
pub struct UriTreeDecorator {
    service: Arc<DecorationsService>,
    on_did_change: Arc<Emitter<()>>,
    _subscription: Subscription,
}

impl UriTreeDecorator {
    pub const ID: &'static str = "uri-decorations";

    pub fn new(service: Arc<DecorationsService>) -> Self {
        let on_did_change = Arc::new(Emitter::new());
        let changed = on_did_change.clone();
        let subscription = service
            .on_did_change_decorations()
            .subscribe(move |_| changed.fire(&()));
        Self {
            service,
            on_did_change,
            _subscription: subscription,
        }
    }
}

fn to_tree_decoration(decorations: &[Decoration]) -> TreeDecorationData {
    let mut data = TreeDecorationData {
        priority: decorations.iter().filter_map(|d| d.weight).max().unwrap_or(0),
        font_color: decorations.iter().find_map(|d| d.color_id.clone()),
        ..TreeDecorationData::default()
    };
    for decoration in decorations {
        if let Some(letter) = &decoration.letter {
            data.tail_decorations.push(TailDecoration {
                data: letter.clone(),
                color: decoration.color_id.clone(),
                tooltip: decoration.tooltip.clone(),
            });
        }
    }
    let tooltips: Vec<&str> = decorations
        .iter()
        .filter_map(|d| d.tooltip.as_deref())
        .collect();
    if !tooltips.is_empty() {
        data.tooltip = Some(tooltips.join(", "));
    }
    data
}

#[async_trait]
impl TreeDecorator for UriTreeDecorator {
    fn id(&self) -> &str {
        Self::ID
    }

    fn on_did_change_decorations(&self) -> &Emitter<()> {
        &self.on_did_change
    }

    async fn decorations(&self, tree: &Tree) -> FxHashMap<NodeId, TreeDecorationData> {
        let targets: Vec<(NodeId, Url, bool)> = tree.read(|store| {
            store
                .ids()
                .filter_map(|id| store.get(id))
                .filter_map(|node| {
                    let uri = node.uri.clone()?;
                    Some((node.id.clone(), uri, node.is_composite()))
                })
                .collect()
        });

        targets
            .into_iter()
            .filter_map(|(id, uri, include_children)| {
                let decorations = self.service.get_decoration(&uri, include_children);
                (!decorations.is_empty()).then(|| (id, to_tree_decoration(&decorations)))
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/decorations/bridge.rs"]
mod tests;
