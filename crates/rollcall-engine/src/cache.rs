// Derived-stats cache
//
// Memoizes one `PeriodStats` per (user, window). Invalidation is coarse:
// any write to a watched collection clears the whole cache, since a single
// attendance edit can shift another user's system summary too.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rollcall_common::{collections::STATS_WATCH_SET, PeriodStats};
use rollcall_store::DocumentStore;
use tokio::sync::{broadcast::error::RecvError, RwLock};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    user_id: String,
    from: NaiveDate,
    to: NaiveDate,
}

#[derive(Clone, Default)]
pub struct StatsCache {
    entries: Arc<RwLock<HashMap<CacheKey, PeriodStats>>>,
}

impl StatsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user_id: &str, from: NaiveDate, to: NaiveDate) -> Option<PeriodStats> {
        let key = CacheKey { user_id: user_id.to_string(), from, to };
        self.entries.read().await.get(&key).cloned()
    }

    pub async fn insert(&self, user_id: &str, from: NaiveDate, to: NaiveDate, stats: PeriodStats) {
        let key = CacheKey { user_id: user_id.to_string(), from, to };
        self.entries.write().await.insert(key, stats);
    }

    pub async fn invalidate_all(&self) {
        self.entries.write().await.clear();
    }

    /// Subscribes to the store's change feed and clears the cache on any
    /// write to a watched collection. Runs until the store closes its
    /// event channel.
    pub fn watch(&self, store: Arc<dyn DocumentStore>) -> tokio::task::JoinHandle<()> {
        let cache = self.clone();
        let mut events = store.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if STATS_WATCH_SET.contains(&event.collection.as_str()) {
                            debug!("Invalidating stats cache after write to {}", event.collection);
                            cache.invalidate_all().await;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Stats cache missed {} store events, clearing", skipped);
                        cache.invalidate_all().await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_store::MemoryStore;
    use serde_json::json;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, d).unwrap()
    }

    #[tokio::test]
    async fn test_get_insert_invalidate() {
        let cache = StatsCache::new();
        assert!(cache.get("u1", date(1), date(31)).await.is_none());

        cache.insert("u1", date(1), date(31), PeriodStats::default()).await;
        assert!(cache.get("u1", date(1), date(31)).await.is_some());
        assert!(cache.get("u1", date(1), date(30)).await.is_none());

        cache.invalidate_all().await;
        assert!(cache.get("u1", date(1), date(31)).await.is_none());
    }

    #[tokio::test]
    async fn test_watch_clears_on_attendance_write() {
        let store = Arc::new(MemoryStore::new());
        let cache = StatsCache::new();
        let handle = cache.watch(store.clone());

        cache.insert("u1", date(1), date(31), PeriodStats::default()).await;

        let doc = match json!({ "id": "x", "user_id": "u1" }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        store.put("attendance", doc).await.unwrap();

        // Give the subscriber task a turn to observe the event.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(cache.get("u1", date(1), date(31)).await.is_none());
        handle.abort();
    }
}
