use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

/// Entries untouched for this long are expired.
pub const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// How often the background sweep runs.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);
/// Per-session key cap; crossing it truncates to the most recent keys.
const MAX_KEYS_PER_SESSION: usize = 500;
const TRUNCATE_TO: usize = 300;

/// Previously shown keys for one session, in insertion order so truncation
/// can preserve recency over completeness.
struct SessionEntry {
    order: Vec<String>,
    set: HashSet<String>,
    last_access: Instant,
}

impl SessionEntry {
    fn fresh() -> Self {
        Self {
            order: Vec::new(),
            set: HashSet::new(),
            last_access: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.last_access.elapsed() >= ttl
    }
}

/// TTL-bounded, size-capped registry of previously shown candidate keys per
/// session. This is the only state shared across concurrent requests; a
/// single coarse lock serializes access, which is sufficient at the expected
/// contention level.
///
/// Reads and writes are not atomic across a caller's read-select-write span:
/// two near-simultaneous refreshes for one session may both observe the same
/// snapshot and repeat an item. Accepted trade-off.
#[derive(Clone)]
pub struct SessionHistoryStore {
    inner: Arc<RwLock<HashMap<String, SessionEntry>>>,
    ttl: Duration,
}

impl SessionHistoryStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Returns the session's seen-key set, transparently replacing an absent
    /// or expired entry with a fresh empty one. Refreshes the TTL.
    pub async fn get(&self, session_id: &str) -> HashSet<String> {
        let mut map = self.inner.write().await;
        let entry = map
            .entry(session_id.to_string())
            .or_insert_with(SessionEntry::fresh);

        if entry.is_expired(self.ttl) {
            tracing::debug!(session_id, "Session history expired, starting fresh");
            *entry = SessionEntry::fresh();
        }

        entry.last_access = Instant::now();
        entry.set.clone()
    }

    /// Records shown keys for a session, refreshing the TTL and enforcing
    /// the size cap. Re-adding a key moves it to the most recent position.
    pub async fn add(&self, session_id: &str, keys: impl IntoIterator<Item = String>) {
        let mut map = self.inner.write().await;
        let entry = map
            .entry(session_id.to_string())
            .or_insert_with(SessionEntry::fresh);

        if entry.is_expired(self.ttl) {
            *entry = SessionEntry::fresh();
        }
        entry.last_access = Instant::now();

        for key in keys {
            if entry.set.contains(&key) {
                entry.order.retain(|k| k != &key);
            } else {
                entry.set.insert(key.clone());
            }
            entry.order.push(key);
        }

        if entry.order.len() > MAX_KEYS_PER_SESSION {
            let drop_count = entry.order.len() - TRUNCATE_TO;
            tracing::debug!(
                session_id,
                dropped = drop_count,
                kept = TRUNCATE_TO,
                "Session history cap reached, truncating oldest keys"
            );
            for dropped in entry.order.drain(..drop_count) {
                entry.set.remove(&dropped);
            }
        }
    }

    /// Removes expired entries, bounding memory growth independent of
    /// request volume. Runs under the same lock discipline as get/add.
    pub async fn sweep(&self) {
        let mut map = self.inner.write().await;
        let before = map.len();
        map.retain(|_, entry| !entry.is_expired(self.ttl));
        let swept = before - map.len();
        if swept > 0 {
            tracing::info!(swept, remaining = map.len(), "Session history sweep");
        }
    }

    /// Spawns the periodic sweep task.
    pub fn spawn_sweeper(&self, period: Duration) {
        let store = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                store.sweep().await;
            }
        });
    }

    #[cfg(test)]
    async fn key_count(&self, session_id: &str) -> usize {
        self.inner
            .read()
            .await
            .get(session_id)
            .map(|e| e.order.len())
            .unwrap_or(0)
    }
}

impl Default for SessionHistoryStore {
    fn default() -> Self {
        Self::new(SESSION_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(range: std::ops::Range<usize>) -> Vec<String> {
        range.map(|i| format!("key-{i}")).collect()
    }

    #[tokio::test]
    async fn test_get_creates_fresh_empty_set() {
        let store = SessionHistoryStore::default();
        let set = store.get("session-a").await;
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_add_then_get_roundtrip() {
        let store = SessionHistoryStore::default();
        store
            .add("session-a", vec!["poi-1".to_string(), "castell".to_string()])
            .await;

        let set = store.get("session-a").await;
        assert!(set.contains("poi-1"));
        assert!(set.contains("castell"));

        // Other sessions are unaffected
        assert!(store.get("session-b").await.is_empty());
    }

    #[tokio::test]
    async fn test_cap_truncates_to_most_recent() {
        let store = SessionHistoryStore::default();
        for batch in 0..5 {
            store.add("session-a", keys(batch * 120..(batch + 1) * 120)).await;
            assert!(store.key_count("session-a").await <= MAX_KEYS_PER_SESSION);
        }

        // 600 keys were added; the overflow truncated to the last 300
        let set = store.get("session-a").await;
        assert_eq!(set.len(), TRUNCATE_TO);
        assert!(set.contains("key-599"));
        assert!(!set.contains("key-0"));
    }

    #[tokio::test]
    async fn test_readding_a_key_refreshes_its_recency() {
        let store = SessionHistoryStore::default();
        store.add("session-a", keys(0..400)).await;
        store.add("session-a", vec!["key-0".to_string()]).await;
        store.add("session-a", keys(400..501)).await;

        // key-0 was re-added after the first 400, so it survives truncation
        let set = store.get("session-a").await;
        assert_eq!(set.len(), TRUNCATE_TO);
        assert!(set.contains("key-0"));
        assert!(!set.contains("key-1"));
    }

    #[tokio::test]
    async fn test_expired_entry_is_replaced_transparently() {
        let store = SessionHistoryStore::new(Duration::ZERO);
        store.add("session-a", vec!["poi-1".to_string()]).await;
        assert!(store.get("session-a").await.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_drops_expired_entries_only() {
        let expired = SessionHistoryStore::new(Duration::ZERO);
        expired.add("stale", vec!["poi-1".to_string()]).await;
        expired.sweep().await;
        assert_eq!(expired.inner.read().await.len(), 0);

        let live = SessionHistoryStore::default();
        live.add("active", vec!["poi-1".to_string()]).await;
        live.sweep().await;
        assert_eq!(live.inner.read().await.len(), 1);
    }
}
