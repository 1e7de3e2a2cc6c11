//! Loading-state tracking around bridged calls
//!
//! Replaces hand-written "show spinner, await, hide spinner" blocks with a
//! single combinator. Keys name the UI element that shows the loading state.

use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Shared registry of in-flight operations per key
#[derive(Debug, Clone)]
pub struct LoadingTracker {
    inner: Arc<TrackerInner>,
}

#[derive(Debug)]
struct TrackerInner {
    active: DashMap<String, usize>,
    changes: watch::Sender<usize>,
}

impl LoadingTracker {
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            inner: Arc::new(TrackerInner {
                active: DashMap::new(),
                changes,
            }),
        }
    }

    /// Run `fut` with `key` marked as loading.
    ///
    /// The mark is cleared when the future completes, fails or is dropped.
    pub async fn with_loading_state<F, T>(&self, key: impl Into<String>, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        let _guard = self.begin(key);
        fut.await
    }

    /// Mark `key` as loading until the returned guard is dropped
    pub fn begin(&self, key: impl Into<String>) -> LoadingGuard {
        let key = key.into();
        *self.inner.active.entry(key.clone()).or_insert(0) += 1;
        self.notify();
        LoadingGuard {
            tracker: self.clone(),
            key,
        }
    }

    pub fn is_loading(&self, key: &str) -> bool {
        self.inner.active.get(key).is_some_and(|count| *count > 0)
    }

    /// Keys with at least one operation in flight, sorted
    pub fn active_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .inner
            .active
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        keys
    }

    /// Receiver of the number of loading keys, updated on every change
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.inner.changes.subscribe()
    }

    fn finish(&self, key: &str) {
        self.inner.active.remove_if_mut(key, |_, count| {
            *count = count.saturating_sub(1);
            *count == 0
        });
        self.notify();
    }

    fn notify(&self) {
        self.inner.changes.send_replace(self.inner.active.len());
    }
}

impl Default for LoadingTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears one loading mark on drop
#[derive(Debug)]
pub struct LoadingGuard {
    tracker: LoadingTracker,
    key: String,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.tracker.finish(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_key_is_loading_while_running() {
        let tracker = LoadingTracker::new();
        let (tx, rx) = oneshot::channel::<()>();

        let task = tokio::spawn({
            let tracker = tracker.clone();
            async move {
                tracker
                    .with_loading_state("save-sample", async move {
                        rx.await.ok();
                        42
                    })
                    .await
            }
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(tracker.is_loading("save-sample"));
        assert_eq!(tracker.active_keys(), vec!["save-sample".to_string()]);

        tx.send(()).unwrap();
        assert_eq!(task.await.unwrap(), 42);
        assert!(!tracker.is_loading("save-sample"));
        assert!(tracker.active_keys().is_empty());
    }

    #[tokio::test]
    async fn test_cleared_on_error() {
        let tracker = LoadingTracker::new();
        let result: Result<(), &str> = tracker
            .with_loading_state("delete-area", async { Err("rejected") })
            .await;

        assert!(result.is_err());
        assert!(!tracker.is_loading("delete-area"));
    }

    #[tokio::test]
    async fn test_cleared_on_cancellation() {
        let tracker = LoadingTracker::new();
        let pending = tracker.with_loading_state("upload-coa", std::future::pending::<()>());

        let timed_out = tokio::time::timeout(Duration::from_millis(10), pending).await;
        assert!(timed_out.is_err());
        assert!(!tracker.is_loading("upload-coa"));
    }

    #[test]
    fn test_overlapping_operations_share_a_key() {
        let tracker = LoadingTracker::new();
        let first = tracker.begin("refresh-grid");
        let second = tracker.begin("refresh-grid");

        drop(first);
        assert!(tracker.is_loading("refresh-grid"));

        drop(second);
        assert!(!tracker.is_loading("refresh-grid"));
    }

    #[test]
    fn test_subscribe_sees_counts() {
        let tracker = LoadingTracker::new();
        let rx = tracker.subscribe();

        let a = tracker.begin("a");
        let _b = tracker.begin("b");
        assert_eq!(*rx.borrow(), 2);

        drop(a);
        assert_eq!(*rx.borrow(), 1);
    }
}
