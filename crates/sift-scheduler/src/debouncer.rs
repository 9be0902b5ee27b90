use std::{
    collections::HashMap,
    future::Future,
    hash::Hash,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::Mutex;
use tokio::runtime::Handle;

use crate::CancellationToken;

struct DebounceEntry {
    id: u64,
    token: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

struct DebouncerInner<K> {
    runtime: Handle,
    delay: Duration,
    next_id: AtomicU64,
    entries: Mutex<HashMap<K, DebounceEntry>>,
}

/// Per-key trailing-edge debouncer.
///
/// Re-arming a key cancels its pending timer, so only the last-armed action
/// for a key fires. Once an action's delay has elapsed it is detached from the
/// key and runs to completion; cancellation only affects pending timers.
#[derive(Clone)]
pub struct KeyedDebouncer<K> {
    inner: Arc<DebouncerInner<K>>,
}

pub struct KeyedDebouncedHandle {
    token: CancellationToken,
}

impl KeyedDebouncedHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl<K> KeyedDebouncer<K>
where
    K: Clone + Eq + Hash + Send + std::fmt::Debug + 'static,
{
    pub fn new(runtime: Handle, delay: Duration) -> Self {
        Self {
            inner: Arc::new(DebouncerInner {
                runtime,
                delay,
                next_id: AtomicU64::new(1),
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Debouncer bound to the runtime of the calling task.
    ///
    /// Panics outside a Tokio runtime, like [`Handle::current`].
    pub fn current(delay: Duration) -> Self {
        Self::new(Handle::current(), delay)
    }

    pub fn debounce<F, Fut>(&self, key: K, f: F) -> KeyedDebouncedHandle
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.debounce_with_delay(key, self.inner.delay, f)
    }

    pub fn debounce_with_delay<F, Fut>(&self, key: K, delay: Duration, f: F) -> KeyedDebouncedHandle
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        // Hold the lock across spawn so the task's cleanup cannot observe the
        // map before this entry is inserted.
        let mut entries = self.inner.entries.lock();
        if let Some(previous) = entries.remove(&key) {
            previous.token.cancel();
            previous.handle.abort();
        }

        let inner = Arc::clone(&self.inner);
        let key_for_task = key.clone();
        let token_for_task = token.clone();

        let handle = self.inner.runtime.spawn(async move {
            let fired = tokio::select! {
                _ = token_for_task.cancelled() => false,
                _ = tokio::time::sleep(delay) => true,
            };

            {
                let mut entries = inner.entries.lock();
                if entries.get(&key_for_task).is_some_and(|current| current.id == id) {
                    entries.remove(&key_for_task);
                }
            }

            if fired && !token_for_task.is_cancelled() {
                tracing::trace!(target: "sift.scheduler", key = ?key_for_task, "debounced action fired");
                f(token_for_task).await;
            }
        });

        entries.insert(
            key,
            DebounceEntry {
                id,
                token: token.clone(),
                handle,
            },
        );

        KeyedDebouncedHandle { token }
    }

    /// Cancel the pending timer for `key`. Returns `false` if nothing was pending.
    pub fn cancel(&self, key: &K) -> bool {
        let Some(entry) = self.inner.entries.lock().remove(key) else {
            return false;
        };
        entry.token.cancel();
        entry.handle.abort();
        true
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.inner.entries.lock().contains_key(key)
    }

    pub fn cancel_all(&self) {
        let drained: Vec<DebounceEntry> = self.inner.entries.lock().drain().map(|(_, e)| e).collect();
        for entry in drained {
            entry.token.cancel();
            entry.handle.abort();
        }
    }
}
