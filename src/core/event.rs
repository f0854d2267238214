//! 事件：观察者注册表与 wait-until 事件
//!
//! - Emitter: 同步分发，订阅返回 Subscription（drop 即退订）
//! - AsyncEmitter: 监听者可以挂上异步任务，fire 会等待全部完成

use futures::future::{join_all, BoxFuture};
use std::future::Future;
use std::sync::{Arc, Mutex, Weak};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Listeners<T> {
    next_id: u64,
    entries: Vec<(u64, Listener<T>)>,
}

pub struct Emitter<T> {
    listeners: Arc<Mutex<Listeners<T>>>,
}

impl<T: 'static> Emitter<T> {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(Listeners {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut listeners = lock(&self.listeners);
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.entries.push((id, Arc::new(listener)));
            id
        };

        let weak: Weak<Mutex<Listeners<T>>> = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = weak.upgrade() {
                lock(&listeners).entries.retain(|(entry_id, _)| *entry_id != id);
            }
        })
    }

    /// Listeners run outside the registry lock, so they may subscribe or
    /// unsubscribe while the event is being dispatched.
    pub fn fire(&self, event: &T) {
        let snapshot: Vec<Listener<T>> = lock(&self.listeners)
            .entries
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in snapshot {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).entries.len()
    }
}

impl<T: 'static> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 退订句柄
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    dispose: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new<F>(dispose: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            dispose: Some(Box::new(dispose)),
        }
    }

    pub fn dispose(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.dispose.is_some())
            .finish()
    }
}

pub struct WaitUntilEvent<T> {
    pub payload: T,
    waits: Mutex<Vec<BoxFuture<'static, ()>>>,
}

impl<T> WaitUntilEvent<T> {
    fn new(payload: T) -> Self {
        Self {
            payload,
            waits: Mutex::new(Vec::new()),
        }
    }

    pub fn wait_until<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        lock(&self.waits).push(Box::pin(work));
    }

    fn take_waits(&self) -> Vec<BoxFuture<'static, ()>> {
        std::mem::take(&mut *lock(&self.waits))
    }
}

pub struct AsyncEmitter<T> {
    inner: Emitter<WaitUntilEvent<T>>,
}

impl<T: Send + 'static> AsyncEmitter<T> {
    pub fn new() -> Self {
        Self {
            inner: Emitter::new(),
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&WaitUntilEvent<T>) + Send + Sync + 'static,
    {
        self.inner.subscribe(listener)
    }

    /// Dispatch happens in subscription order; the attached work then runs
    /// concurrently and this future resolves once all of it has finished.
    pub async fn fire(&self, payload: T) {
        let event = WaitUntilEvent::new(payload);
        self.inner.fire(&event);
        let waits = event.take_waits();
        if !waits.is_empty() {
            join_all(waits).await;
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listener_count()
    }
}

impl<T: Send + 'static> Default for AsyncEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/core/event.rs"]
mod tests;
