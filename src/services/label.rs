use crate::models::TreeNode;

/// Supplies the text a node is rendered and searched by.
pub trait LabelProvider: Send + Sync {
    fn name(&self, node: &TreeNode) -> String;

    fn description(&self, node: &TreeNode) -> Option<String> {
        node.description.clone()
    }

    fn icon(&self, node: &TreeNode) -> Option<String> {
        node.icon.clone()
    }
}

/// Uses the node's own name, falling back to its id.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultLabelProvider;

impl LabelProvider for DefaultLabelProvider {
    fn name(&self, node: &TreeNode) -> String {
        node.name.clone().unwrap_or_else(|| node.id.to_string())
    }
}
