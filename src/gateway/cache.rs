// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use async_trait::async_trait;
use bytes::Bytes;
use hashlink::LruCache;
use http::{HeaderMap, StatusCode};
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// A fully buffered response, keyed by request URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<CachedResponse>;

    async fn put(&self, key: String, response: CachedResponse);
}

/// Bounded in-process cache. Entries are evicted least recently used first
/// once `capacity` is reached, and ignored once older than `ttl`.
pub struct MemoryResponseCache {
    entries: Mutex<LruCache<String, Entry>>,
    ttl: Duration,
}

struct Entry {
    stored: Instant,
    response: CachedResponse,
}

impl MemoryResponseCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResponseCache for MemoryResponseCache {
    async fn get(&self, key: &str) -> Option<CachedResponse> {
        let mut entries = self.entries.lock();
        let fresh = entries.get(key)?.stored.elapsed() < self.ttl;
        if fresh {
            entries.get(key).map(|entry| entry.response.clone())
        } else {
            entries.remove(key);
            None
        }
    }

    async fn put(&self, key: String, response: CachedResponse) {
        self.entries.lock().insert(
            key,
            Entry {
                stored: Instant::now(),
                response,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(body: &'static [u8]) -> CachedResponse {
        CachedResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::from_static(body),
        }
    }

    #[tokio::test]
    async fn hit_returns_stored_response() {
        let cache = MemoryResponseCache::new(4, Duration::from_secs(60));
        assert!(cache.get("/car/a").await.is_none());
        cache.put("/car/a".into(), response(b"a")).await;
        assert_eq!(cache.get("/car/a").await, Some(response(b"a")));
        assert!(cache.get("/car/a?x=1").await.is_none());
    }

    #[tokio::test]
    async fn least_recently_used_is_evicted() {
        let cache = MemoryResponseCache::new(2, Duration::from_secs(60));
        cache.put("a".into(), response(b"a")).await;
        cache.put("b".into(), response(b"b")).await;
        // touch `a` so that `b` is the oldest
        cache.get("a").await;
        cache.put("c".into(), response(b"c")).await;
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").await.is_some());
        assert!(cache.get("b").await.is_none());
        assert!(cache.get("c").await.is_some());
    }

    #[tokio::test]
    async fn expired_entries_are_dropped() {
        let cache = MemoryResponseCache::new(2, Duration::ZERO);
        cache.put("a".into(), response(b"a")).await;
        assert!(cache.get("a").await.is_none());
        assert!(cache.is_empty());
    }
}
