//! 核心基础设施
//!
//! - Event: 观察者注册表与 wait-until 事件
//! - Disposable: 订阅的聚合释放
//! - Uri: URI 分段

pub mod disposable;
pub mod event;
pub mod uri;

pub use disposable::DisposableCollection;
pub use event::{AsyncEmitter, Emitter, Subscription, WaitUntilEvent};
pub use uri::{ancestor_uris, is_ancestor_uri, uri_segments};
