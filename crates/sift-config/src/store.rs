use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;

use crate::SiftConfig;

/// Shared, observable configuration.
///
/// Readers take cheap snapshots; writers replace the whole snapshot and wake
/// every subscriber.
#[derive(Clone)]
pub struct ConfigStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    current: RwLock<Arc<SiftConfig>>,
    notify: watch::Sender<Arc<SiftConfig>>,
}

impl ConfigStore {
    pub fn new(config: SiftConfig) -> Self {
        let config = Arc::new(config);
        let (notify, _) = watch::channel(Arc::clone(&config));
        Self {
            inner: Arc::new(StoreInner {
                current: RwLock::new(config),
                notify,
            }),
        }
    }

    pub fn get(&self) -> Arc<SiftConfig> {
        Arc::clone(&self.inner.current.read())
    }

    pub fn update(&self, config: SiftConfig) {
        let mut current = self.inner.current.write();
        self.publish(&mut current, config);
    }

    /// Apply `f` to a copy of the current snapshot and publish the result.
    ///
    /// The write lock is held throughout, so concurrent calls never lose an
    /// update. `f` must not call back into the store.
    pub fn modify(&self, f: impl FnOnce(&mut SiftConfig)) {
        let mut current = self.inner.current.write();
        let mut next = SiftConfig::clone(&current);
        f(&mut next);
        self.publish(&mut current, next);
    }

    fn publish(&self, current: &mut Arc<SiftConfig>, config: SiftConfig) {
        let config = Arc::new(config);
        *current = Arc::clone(&config);
        self.inner.notify.send_replace(config);
        tracing::debug!(target: "sift.config", "configuration updated");
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<SiftConfig>> {
        self.inner.notify.subscribe()
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(SiftConfig::default())
    }
}
