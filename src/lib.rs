//! ztree - 通用树模型库
//!
//! 模块结构：
//! - core: 事件、订阅释放、URI 分段
//! - models: 节点、节点表、树遍历
//! - tree: 树核心（异步刷新、忙碌标记）与树模型
//! - services: 选择、展开、焦点、导航历史、过滤
//! - decorations: URI 装饰服务与树装饰

pub mod config;
pub mod core;
pub mod decorations;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod tree;

pub use config::TreeConfig;
pub use error::{BoxError, ConfigError, DecorationError, TreeError};
pub use models::{NodeId, NodeKind, TreeNode};
pub use tree::{Tree, TreeModel, TreeModelState, TreeProvider};

#[cfg(test)]
#[path = "../tests/unit/support.rs"]
pub(crate) mod test_support;
