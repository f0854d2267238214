//! 数据模型层

pub mod iterator;
pub mod node;
pub mod store;

pub use iterator::{
    ordered_nodes, visible_order, BottomUpIterator, CycleIterator, IteratorOptions, TopDownIterator,
};
pub use node::{CheckboxInfo, NodeId, NodeKind, TreeNode};
pub use store::{NodeStore, Resolution};
