//! 装饰服务：聚合多个提供者的按 URI 装饰数据
//!
//! 每个提供者有自己的前缀树缓存。未命中时发起获取；异步获取在缓存中
//! 以 Pending 占位，同一 URI 的新请求会取消旧请求，结果只有在占位仍是
//! 同一请求时才会写入。

use super::tst::TernarySearchTree;
use crate::core::event::{Emitter, Subscription};
use crate::core::uri::ancestor_uris;
use crate::error::DecorationError;
use futures::future::BoxFuture;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use url::Url;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Decoration {
    pub weight: Option<i32>,
    pub color_id: Option<String>,
    pub letter: Option<String>,
    pub tooltip: Option<String>,
    /// Also surfaces on descendants in aggregate queries.
    pub bubble: bool,
}

/// Decorations a provider currently holds, keyed by URI.
pub type DecorationSnapshot = FxHashMap<Url, Decoration>;

pub enum ProvidedDecoration {
    Ready(Option<Decoration>),
    Pending(BoxFuture<'static, Result<Option<Decoration>, DecorationError>>),
}

pub trait DecorationsProvider: Send + Sync {
    /// `None` invalidates every URI the provider has decorated.
    fn on_did_change(&self) -> &Emitter<Option<Vec<Url>>>;

    fn provide_decorations(&self, uri: &Url, token: CancellationToken) -> ProvidedDecoration;
}

enum Slot {
    Pending {
        request: u64,
        token: CancellationToken,
    },
    Known(Option<Decoration>),
}

enum Lookup {
    Missing,
    Pending,
    Known(Option<Decoration>),
}

struct ProviderCache {
    provider: Arc<dyn DecorationsProvider>,
    data: Mutex<TernarySearchTree<Slot>>,
    next_request: AtomicU64,
    handle: Handle,
    on_did_change: Arc<Emitter<DecorationSnapshot>>,
}

impl ProviderCache {
    fn data(&self) -> MutexGuard<'_, TernarySearchTree<Slot>> {
        self.data
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lookup(&self, uri: &Url) -> Lookup {
        match self.data().get(uri) {
            None => Lookup::Missing,
            Some(Slot::Pending { .. }) => Lookup::Pending,
            Some(Slot::Known(decoration)) => Lookup::Known(decoration.clone()),
        }
    }

    fn get_or_retrieve(self: &Arc<Self>, uri: &Url, include_children: bool, out: &mut Vec<Decoration>) {
        let own = match self.lookup(uri) {
            Lookup::Known(decoration) => decoration,
            Lookup::Pending => None,
            Lookup::Missing => self.fetch(uri),
        };
        out.extend(own);

        if include_children {
            // Ancestors may bubble onto `uri`; make sure each has been asked for.
            for ancestor in ancestor_uris(uri) {
                if matches!(self.lookup(&ancestor), Lookup::Missing) {
                    self.fetch(&ancestor);
                }
            }
            let data = self.data();
            let related = data
                .ancestors(uri)
                .into_iter()
                .chain(data.find_superstr(uri));
            for (_, slot) in related {
                if let Slot::Known(Some(decoration)) = slot {
                    if decoration.bubble {
                        out.push(decoration.clone());
                    }
                }
            }
        }
    }

    /// Start a fetch for `uri`, cancelling any request still in flight for
    /// it. Synchronous answers are cached and returned immediately.
    fn fetch(self: &Arc<Self>, uri: &Url) -> Option<Decoration> {
        {
            let mut data = self.data();
            if let Some(Slot::Pending { token, .. }) = data.get(uri) {
                token.cancel();
                data.delete(uri);
            }
        }

        let token = CancellationToken::new();
        match self.provider.provide_decorations(uri, token.clone()) {
            ProvidedDecoration::Ready(decoration) => self.keep(uri, decoration),
            ProvidedDecoration::Pending(future) => {
                let request = self.next_request.fetch_add(1, Ordering::Relaxed);
                self.data().set(
                    uri,
                    Slot::Pending {
                        request,
                        token: token.clone(),
                    },
                );

                let cache = Arc::downgrade(self);
                let uri = uri.clone();
                self.handle.spawn(async move {
                    let result = tokio::select! {
                        biased;
                        _ = token.cancelled() => Err(DecorationError::Cancelled),
                        result = future => result,
                    };
                    if let Some(cache) = cache.upgrade() {
                        cache.settle(&uri, request, result);
                    }
                });
                None
            }
        }
    }

    fn settle(&self, uri: &Url, request: u64, result: Result<Option<Decoration>, DecorationError>) {
        let changed = {
            let mut data = self.data();
            let current = matches!(
                data.get(uri),
                Some(Slot::Pending { request: pending, .. }) if *pending == request
            );
            if !current {
                tracing::debug!(%uri, request, "discarding stale decoration result");
                return;
            }
            match result {
                Ok(decoration) => Self::store(&mut data, uri, decoration),
                Err(e) => {
                    if !e.is_cancelled() {
                        tracing::warn!(%uri, error = %e, "decoration provider failed");
                    }
                    data.delete(uri);
                    false
                }
            }
        };
        if changed {
            self.fire_snapshot();
        }
    }

    fn keep(&self, uri: &Url, decoration: Option<Decoration>) -> Option<Decoration> {
        let changed = Self::store(&mut self.data(), uri, decoration.clone());
        if changed {
            self.fire_snapshot();
        }
        decoration
    }

    fn store(
        data: &mut TernarySearchTree<Slot>,
        uri: &Url,
        decoration: Option<Decoration>,
    ) -> bool {
        let had_decoration = decoration.is_some();
        let old = data.set(uri, Slot::Known(decoration));
        had_decoration || matches!(old, Some(Slot::Known(Some(_))))
    }

    fn snapshot(&self) -> DecorationSnapshot {
        self.data()
            .entries()
            .into_iter()
            .filter_map(|(uri, slot)| match slot {
                Slot::Known(Some(decoration)) => Some((uri.clone(), decoration.clone())),
                _ => None,
            })
            .collect()
    }

    fn fire_snapshot(&self) {
        let snapshot = self.snapshot();
        self.on_did_change.fire(&snapshot);
    }

    fn handle_change(self: &Arc<Self>, uris: Option<&[Url]>) {
        match uris {
            None => {
                self.cancel_pending();
                self.data().clear();
            }
            Some(uris) => {
                for uri in uris {
                    self.fetch(uri);
                }
            }
        }
        self.fire_snapshot();
    }

    fn cancel_pending(&self) {
        for (_, slot) in self.data().entries() {
            if let Slot::Pending { token, .. } = slot {
                token.cancel();
            }
        }
    }
}

struct Registration {
    id: u64,
    cache: Arc<ProviderCache>,
    _subscription: Subscription,
}

struct ServiceInner {
    handle: Handle,
    registrations: Mutex<Vec<Registration>>,
    next_id: AtomicU64,
    on_did_change_decorations: Arc<Emitter<DecorationSnapshot>>,
}

impl ServiceInner {
    fn registrations(&self) -> MutexGuard<'_, Vec<Registration>> {
        self.registrations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub struct DecorationsService {
    inner: Arc<ServiceInner>,
}

impl DecorationsService {
    /// Asynchronous provider answers are awaited on `handle`.
    pub fn new(handle: Handle) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                handle,
                registrations: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                on_did_change_decorations: Arc::new(Emitter::new()),
            }),
        }
    }

    /// Fires with the full snapshot of the provider whose data changed; an
    /// empty map after a provider is removed.
    pub fn on_did_change_decorations(&self) -> &Emitter<DecorationSnapshot> {
        &self.inner.on_did_change_decorations
    }

    pub fn provider_count(&self) -> usize {
        self.inner.registrations().len()
    }

    /// Dropping the returned subscription unregisters the provider and
    /// cancels its pending requests.
    pub fn register_provider(&self, provider: Arc<dyn DecorationsProvider>) -> Subscription {
        let cache = Arc::new(ProviderCache {
            provider: provider.clone(),
            data: Mutex::new(TernarySearchTree::new()),
            next_request: AtomicU64::new(0),
            handle: self.inner.handle.clone(),
            on_did_change: self.inner.on_did_change_decorations.clone(),
        });

        let weak_cache = Arc::downgrade(&cache);
        let subscription = provider.on_did_change().subscribe(move |uris| {
            if let Some(cache) = weak_cache.upgrade() {
                cache.handle_change(uris.as_deref());
            }
        });

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.registrations().push(Registration {
            id,
            cache,
            _subscription: subscription,
        });
        tracing::debug!(provider = id, "decoration provider registered");

        let weak_inner = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            let Some(inner) = weak_inner.upgrade() else { return };
            let removed = {
                let mut registrations = inner.registrations();
                registrations
                    .iter()
                    .position(|r| r.id == id)
                    .map(|index| registrations.remove(index))
            };
            if let Some(registration) = removed {
                registration.cache.cancel_pending();
                inner
                    .on_did_change_decorations
                    .fire(&DecorationSnapshot::default());
            }
        })
    }

    /// Decorations for `uri` across all providers, in registration order.
    ///
    /// Uncached URIs are fetched; answers that arrive later are reported via
    /// `on_did_change_decorations`. With `include_children`, `bubble`
    /// decorations of ancestors and cached descendants are included too;
    /// uncached ancestors are fetched like `uri` itself.
    pub fn get_decoration(&self, uri: &Url, include_children: bool) -> Vec<Decoration> {
        let caches: Vec<Arc<ProviderCache>> = self
            .inner
            .registrations()
            .iter()
            .map(|r| r.cache.clone())
            .collect();
        let mut decorations = Vec::new();
        for cache in caches {
            cache.get_or_retrieve(uri, include_children, &mut decorations);
        }
        decorations
    }
}

#[cfg(test)]
#[path = "../../tests/unit/decorations/service.rs"]
mod tests;
