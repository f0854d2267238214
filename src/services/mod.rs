//! 树服务
//!
//! - SelectionService: 选中集合（默认/切换/范围）
//! - ExpansionService: 展开与折叠，按需加载子节点
//! - FocusService: 焦点节点
//! - NavigationService: 根节点前进/后退历史
//! - TreeSearch: 按标签模糊过滤

pub mod expansion;
pub mod filter;
pub mod focus;
pub mod label;
pub mod navigation;
pub mod selection;

pub use expansion::{ExpansionService, ExpansionState};
pub use filter::{fuzzy_match, TreeSearch};
pub use focus::FocusService;
pub use label::{DefaultLabelProvider, LabelProvider};
pub use navigation::NavigationService;
pub use selection::{SelectionService, SelectionState, SelectionType, TreeSelection};
