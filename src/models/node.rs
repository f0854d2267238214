//! 树节点数据模型

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use url::Url;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(CompactString);

impl NodeId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(CompactString::new(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(CompactString::from(value))
    }
}

impl std::borrow::Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKind(u8);

impl NodeKind {
    pub const LEAF: Self = Self(0);
    pub const COMPOSITE: Self = Self(1 << 0);
    pub const SELECTABLE: Self = Self(1 << 1);
    // Expandable nodes always carry children.
    pub const EXPANDABLE: Self = Self((1 << 2) | (1 << 0));

    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn is_composite(self) -> bool {
        self.contains(Self::COMPOSITE)
    }

    pub fn is_selectable(self) -> bool {
        self.contains(Self::SELECTABLE)
    }

    pub fn is_expandable(self) -> bool {
        self.contains(Self::EXPANDABLE)
    }
}

impl BitOr for NodeKind {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for NodeKind {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckboxInfo {
    pub checked: bool,
    pub tooltip: Option<String>,
    pub accessibility_text: Option<String>,
}

/// A tree node as seen from outside the store.
///
/// Providers build detached nodes with the builder methods; `parent`,
/// `children` and `busy` are owned by the tree, `selected` by the selection
/// service and `expanded` by the expansion service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: NodeId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub tooltip: Option<String>,
    pub uri: Option<Url>,
    pub visible: bool,
    pub checkbox: Option<CheckboxInfo>,
    kind: NodeKind,
    #[serde(skip)]
    busy: u32,
    selected: bool,
    expanded: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl TreeNode {
    fn with_kind(id: impl Into<NodeId>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            name: None,
            description: None,
            icon: None,
            tooltip: None,
            uri: None,
            visible: true,
            checkbox: None,
            kind,
            busy: 0,
            selected: false,
            expanded: false,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn leaf(id: impl Into<NodeId>) -> Self {
        Self::with_kind(id, NodeKind::LEAF)
    }

    pub fn composite(id: impl Into<NodeId>) -> Self {
        Self::with_kind(id, NodeKind::COMPOSITE)
    }

    pub fn expandable(id: impl Into<NodeId>) -> Self {
        Self::with_kind(id, NodeKind::EXPANDABLE)
    }

    pub fn selectable(mut self) -> Self {
        self.kind |= NodeKind::SELECTABLE;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    pub fn with_uri(mut self, uri: Url) -> Self {
        self.uri = Some(uri);
        self
    }

    pub fn with_checkbox(mut self, checkbox: CheckboxInfo) -> Self {
        self.checkbox = Some(checkbox);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Initial expansion state for a node the tree has not seen yet.
    pub fn initially_expanded(mut self, expanded: bool) -> Self {
        self.expanded = expanded && self.kind.is_expandable();
        self
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn busy(&self) -> u32 {
        self.busy
    }

    pub fn is_busy(&self) -> bool {
        self.busy > 0
    }

    pub fn selected(&self) -> bool {
        self.selected
    }

    pub fn expanded(&self) -> bool {
        self.expanded
    }

    pub fn parent(&self) -> Option<&NodeId> {
        self.parent.as_ref()
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_composite(&self) -> bool {
        self.kind.is_composite()
    }

    pub fn is_selectable(&self) -> bool {
        self.kind.is_selectable()
    }

    pub fn is_expandable(&self) -> bool {
        self.kind.is_expandable()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_visible_selectable(&self) -> bool {
        self.is_selectable() && self.is_visible()
    }

    pub fn is_expanded(&self) -> bool {
        self.is_expandable() && self.expanded
    }

    pub fn is_collapsed(&self) -> bool {
        self.is_expandable() && !self.expanded
    }

    pub(crate) fn set_selected(&mut self, selected: bool) {
        self.selected = selected && self.is_selectable();
    }

    pub(crate) fn set_expanded(&mut self, expanded: bool) {
        self.expanded = expanded && self.is_expandable();
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeId>) {
        self.parent = parent;
    }

    pub(crate) fn set_children(&mut self, children: Vec<NodeId>) {
        self.children = children;
    }

    pub(crate) fn increment_busy(&mut self) -> u32 {
        let old = self.busy;
        self.busy = old.saturating_add(1);
        old
    }

    pub(crate) fn clear_busy(&mut self) {
        self.busy = 0;
    }

    /// Returns `true` when the count dropped to zero.
    pub(crate) fn decrement_busy(&mut self) -> bool {
        if self.busy == 0 {
            return false;
        }
        self.busy -= 1;
        self.busy == 0
    }

    /// Copy provider supplied attributes onto an existing node, keeping
    /// everything the services and the tree own.
    pub(crate) fn merge_attributes(&mut self, incoming: TreeNode) {
        self.name = incoming.name;
        self.description = incoming.description;
        self.icon = incoming.icon;
        self.tooltip = incoming.tooltip;
        self.uri = incoming.uri;
        self.visible = incoming.visible;
        self.checkbox = incoming.checkbox;
        self.kind = incoming.kind;
        if !self.kind.is_selectable() {
            self.selected = false;
        }
        if !self.kind.is_expandable() {
            self.expanded = false;
        }
        if !self.kind.is_composite() {
            self.children.clear();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/models/node.rs"]
mod tests;
