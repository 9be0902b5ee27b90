use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

/// Sink for per-source fetch metrics, keyed by source name.
pub trait ProviderMetricsSink: Send + Sync {
    fn record_request(&self, key: &str, duration: Duration);
    fn record_error(&self, key: &str);
    fn record_panic(&self, key: &str);
    /// A batch containing this source's results was discarded as superseded.
    fn record_stale(&self, key: &str);
}

#[derive(Debug, Default)]
pub struct NoopMetricsSink;

impl ProviderMetricsSink for NoopMetricsSink {
    fn record_request(&self, _key: &str, _duration: Duration) {}
    fn record_error(&self, _key: &str) {}
    fn record_panic(&self, _key: &str) {}
    fn record_stale(&self, _key: &str) {}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestMetricsSnapshot {
    pub request_count: u64,
    pub error_count: u64,
    pub panic_count: u64,
    pub stale_count: u64,
    pub durations: Vec<Duration>,
}

/// Recording sink for deterministic assertions in tests.
#[derive(Debug, Default)]
pub struct TestMetricsSink {
    inner: Mutex<HashMap<String, TestMetricsSnapshot>>,
}

impl TestMetricsSink {
    pub fn snapshot(&self) -> HashMap<String, TestMetricsSnapshot> {
        self.inner.lock().clone()
    }

    /// Snapshot for `key`, or an empty one if `key` was never recorded.
    pub fn snapshot_for(&self, key: &str) -> TestMetricsSnapshot {
        self.inner.lock().get(key).cloned().unwrap_or_default()
    }

    fn update(&self, key: &str, f: impl FnOnce(&mut TestMetricsSnapshot)) {
        let mut inner = self.inner.lock();
        f(inner.entry(key.to_owned()).or_default());
    }
}

impl ProviderMetricsSink for TestMetricsSink {
    fn record_request(&self, key: &str, duration: Duration) {
        self.update(key, |entry| {
            entry.request_count = entry.request_count.saturating_add(1);
            entry.durations.push(duration);
        });
    }

    fn record_error(&self, key: &str) {
        self.update(key, |entry| entry.error_count = entry.error_count.saturating_add(1));
    }

    fn record_panic(&self, key: &str) {
        self.update(key, |entry| entry.panic_count = entry.panic_count.saturating_add(1));
    }

    fn record_stale(&self, key: &str) {
        self.update(key, |entry| entry.stale_count = entry.stale_count.saturating_add(1));
    }
}
