//! In-process TTL caches.

use std::hash::Hash;

use jiff::{SignedDuration, Timestamp};
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;

/// A small read-mostly cache whose entries expire after a fixed TTL.
///
/// Callers pass `now` explicitly so expiry is deterministic under test.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: SignedDuration,
    entries: RwLock<FxHashMap<K, CacheEntry<V>>>,
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Timestamp,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    #[must_use]
    pub fn new(ttl: SignedDuration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(FxHashMap::default()),
        }
    }

    /// Return a live entry, if any.
    pub async fn get(&self, key: &K, now: Timestamp) -> Option<V> {
        let entries = self.entries.read().await;

        entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.clone())
    }

    /// Store `value` until `now + ttl`. Entries whose expiry would overflow are not stored.
    pub async fn insert(&self, key: K, value: V, now: Timestamp) {
        let Ok(expires_at) = now.checked_add(self.ttl) else {
            return;
        };

        let mut entries = self.entries.write().await;

        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(key, CacheEntry { value, expires_at });
    }

    pub async fn invalidate(&self, key: &K) {
        self.entries.write().await.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = TtlCache::new(SignedDuration::from_secs(60));
        let now = Timestamp::UNIX_EPOCH;

        cache.insert("key", 1, now).await;

        assert_eq!(cache.get(&"key", now).await, Some(1));
        assert_eq!(
            cache.get(&"key", now + SignedDuration::from_secs(59)).await,
            Some(1)
        );
        assert_eq!(
            cache.get(&"key", now + SignedDuration::from_secs(60)).await,
            None
        );
    }

    #[tokio::test]
    async fn invalidate_removes_entry() {
        let cache = TtlCache::new(SignedDuration::from_secs(60));
        let now = Timestamp::UNIX_EPOCH;

        cache.insert("key", 1, now).await;
        cache.invalidate(&"key").await;

        assert_eq!(cache.get(&"key", now).await, None);
    }

    #[tokio::test]
    async fn insert_prunes_expired_entries() {
        let cache = TtlCache::new(SignedDuration::from_secs(10));
        let now = Timestamp::UNIX_EPOCH;

        cache.insert("old", 1, now).await;
        cache
            .insert("new", 2, now + SignedDuration::from_secs(30))
            .await;

        assert_eq!(cache.entries.read().await.len(), 1);
    }
}
