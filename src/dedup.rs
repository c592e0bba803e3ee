//! Sliding-window message deduplication (C3).
//!
//! Two messages are the same event if they share `(source_ip, priority,
//! message)` and arrive within `window` of each other's *first* sighting.
//! The first arrival in a window always writes; every later arrival inside
//! that window is suppressed. A background reaper forgets keys once they
//! fall out of the window so the map does not grow without bound.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

/// Default dedup window: 10 minutes, matching the original collector.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(10 * 60);

/// Interval between background sweeps that evict expired keys.
const REAP_INTERVAL: Duration = Duration::from_secs(60);

/// The deduplication half of the pipeline, as a narrow capability contract
/// (§9) so receivers can depend on `Arc<dyn Deduplicator>` and tests can
/// substitute a stub that always or never suppresses.
#[async_trait]
pub trait Deduplicator: Send + Sync {
    /// Returns `true` if this `(source_ip, priority, message)` triple has
    /// not been seen within the window and should be written. Only a
    /// `true` result updates the first-sight timestamp; suppressed
    /// arrivals leave the existing window untouched.
    async fn should_write(&self, source_ip: &str, priority: u64, message: &str) -> bool;
}

type Key = (String, u64, String);

/// Mutex-guarded hash map implementation of [`Deduplicator`].
///
/// A single lock covers the read-then-insert sequence so two concurrent
/// arrivals for the same key cannot both observe "not seen" and both write.
pub struct WindowedDeduplicator {
    window: Duration,
    seen: Mutex<HashMap<Key, Instant>>,
}

impl WindowedDeduplicator {
    /// Creates a deduplicator with the given window. Does not start the
    /// reaper; call [`WindowedDeduplicator::spawn_reaper`] separately once
    /// the value is behind an `Arc`.
    pub fn new(window: Duration) -> Self {
        Self { window, seen: Mutex::new(HashMap::new()) }
    }

    /// Creates a deduplicator using [`DEFAULT_WINDOW`].
    pub fn with_default_window() -> Self {
        Self::new(DEFAULT_WINDOW)
    }

    /// Spawns the background reaper as a detached task and returns its
    /// handle so callers can abort it during shutdown.
    pub fn spawn_reaper(self: &std::sync::Arc<Self>) -> tokio::task::JoinHandle<()> {
        let dedup = std::sync::Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(REAP_INTERVAL).await;
                dedup.cleanup();
            }
        })
    }

    /// Removes every key whose first sighting is older than the window.
    pub fn cleanup(&self) {
        let now = Instant::now();
        let mut seen = self.seen.lock().unwrap();
        let before = seen.len();
        seen.retain(|_, &mut first_seen| now.duration_since(first_seen) < self.window);
        let evicted = before - seen.len();
        if evicted > 0 {
            debug!(evicted, remaining = seen.len(), "reaped expired dedup keys");
        }
    }
}

#[async_trait]
impl Deduplicator for WindowedDeduplicator {
    async fn should_write(&self, source_ip: &str, priority: u64, message: &str) -> bool {
        let key = (source_ip.to_string(), priority, message.to_string());
        let now = Instant::now();
        let mut seen = self.seen.lock().unwrap();

        if let Some(&first_seen) = seen.get(&key) {
            if now.duration_since(first_seen) < self.window {
                return false;
            }
        }

        seen.insert(key, now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn first_sighting_always_writes() {
        let dedup = WindowedDeduplicator::with_default_window();
        assert!(dedup.should_write("10.0.0.1", 11, "disk full").await);
    }

    #[tokio::test]
    async fn repeat_within_window_is_suppressed() {
        let dedup = WindowedDeduplicator::new(Duration::from_secs(60));
        assert!(dedup.should_write("10.0.0.1", 11, "disk full").await);
        assert!(!dedup.should_write("10.0.0.1", 11, "disk full").await);
        assert!(!dedup.should_write("10.0.0.1", 11, "disk full").await);
    }

    #[tokio::test]
    async fn distinct_keys_never_collide() {
        let dedup = WindowedDeduplicator::new(Duration::from_secs(60));
        assert!(dedup.should_write("10.0.0.1", 11, "disk full").await);
        assert!(dedup.should_write("10.0.0.2", 11, "disk full").await); // different source
        assert!(dedup.should_write("10.0.0.1", 12, "disk full").await); // different priority
        assert!(dedup.should_write("10.0.0.1", 11, "disk full again").await); // different message
    }

    #[tokio::test]
    async fn repeat_after_window_elapses_writes_again() {
        let dedup = WindowedDeduplicator::new(Duration::from_millis(200));
        assert!(dedup.should_write("10.0.0.1", 11, "disk full").await);
        assert!(!dedup.should_write("10.0.0.1", 11, "disk full").await);
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(dedup.should_write("10.0.0.1", 11, "disk full").await);
    }

    #[tokio::test]
    async fn cleanup_evicts_only_stale_entries() {
        let dedup = WindowedDeduplicator::new(Duration::from_millis(100));
        dedup.should_write("10.0.0.1", 11, "stale").await;
        tokio::time::sleep(Duration::from_millis(150)).await;
        dedup.should_write("10.0.0.2", 11, "fresh").await;

        dedup.cleanup();
        assert_eq!(dedup.seen.lock().unwrap().len(), 1);
        assert!(dedup.seen.lock().unwrap().contains_key(&("10.0.0.2".to_string(), 11, "fresh".to_string())));
    }

    #[tokio::test]
    async fn reaper_can_be_stopped() {
        let dedup = Arc::new(WindowedDeduplicator::new(Duration::from_secs(60)));
        let handle = dedup.spawn_reaper();
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
    }
}
