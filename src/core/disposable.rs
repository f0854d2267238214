use super::event::Subscription;

enum Disposable {
    Subscription(Subscription),
    Callback(Box<dyn FnOnce() + Send + Sync>),
}

/// 聚合资源：dispose 或 drop 时按加入的逆序释放，且只释放一次
#[derive(Default)]
pub struct DisposableCollection {
    items: Vec<Disposable>,
    disposed: bool,
}

impl DisposableCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, subscription: Subscription) {
        if self.disposed {
            subscription.dispose();
            return;
        }
        self.items.push(Disposable::Subscription(subscription));
    }

    pub fn push_callback<F>(&mut self, callback: F)
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        if self.disposed {
            callback();
            return;
        }
        self.items.push(Disposable::Callback(Box::new(callback)));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        while let Some(item) = self.items.pop() {
            match item {
                Disposable::Subscription(subscription) => subscription.dispose(),
                Disposable::Callback(callback) => callback(),
            }
        }
    }
}

impl Drop for DisposableCollection {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/core/disposable.rs"]
mod tests;
