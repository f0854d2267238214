//! 装饰层
//!
//! - TernarySearchTree: URI 前缀树
//! - DecorationsService: 多提供者、可取消的按 URI 装饰
//! - TreeDecoratorService: 按节点汇总的树装饰
//! - UriTreeDecorator: 把 URI 装饰映射到树节点

mod bridge;
mod service;
mod tree_decorator;
mod tst;

pub use bridge::UriTreeDecorator;
pub use service::{
    Decoration, DecorationSnapshot, DecorationsProvider, DecorationsService, ProvidedDecoration,
};
pub use tree_decorator::{
    deflate_decorators, inflate_decorators, NodeDecorations, TailDecoration, TreeDecorationData,
    TreeDecorator, TreeDecoratorService,
};
pub use tst::TernarySearchTree;
