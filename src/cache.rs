// Copyright 2026 Schoolyard Software, LLC.

//! Session-scoped cache of constructed school objects
//!
//! Keyed by `(kind, sorted attribute items)`. Invalidation is coarse:
//! any successful write of any instance of a kind drops that kind's
//! whole partition. The cache belongs to a [`crate::context::Context`],
//! not to the process — concurrent sessions do not share entries.

use std::num::NonZeroUsize;

use lru::LruCache;
use tokio::sync::Mutex;
use tracing::debug;

use crate::model::{ModelKind, SchoolObject};

/// Cache key: concrete kind plus the sorted constructor arguments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: ModelKind,
    items: Vec<(String, String)>,
}

impl CacheKey {
    /// Build a key from a kind and (attribute, value) pairs
    pub fn new(kind: ModelKind, items: &[(&str, &str)]) -> Self {
        let mut items: Vec<(String, String)> = items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        items.sort();
        Self { kind, items }
    }
}

/// Bounded LRU cache of school objects with per-kind invalidation
pub struct ObjectCache {
    inner: Mutex<LruCache<CacheKey, SchoolObject>>,
}

impl ObjectCache {
    /// New cache holding at most `capacity` objects
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity >= 1");
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Fetch a cached object, or construct it and cache the result
    pub async fn get_or_insert_with<F>(&self, key: CacheKey, build: F) -> SchoolObject
    where
        F: FnOnce() -> SchoolObject,
    {
        let mut cache = self.inner.lock().await;
        if let Some(hit) = cache.get(&key) {
            return hit.clone();
        }
        let object = build();
        cache.put(key, object.clone());
        object
    }

    /// Drop every cached object of the given kind
    pub async fn invalidate_kind(&self, kind: ModelKind) {
        let mut cache = self.inner.lock().await;
        let stale: Vec<CacheKey> = cache
            .iter()
            .filter(|(key, _)| key.kind == kind)
            .map(|(key, _)| key.clone())
            .collect();
        if !stale.is_empty() {
            debug!(kind = %kind, count = stale.len(), "invalidating cached objects");
        }
        for key in stale {
            cache.pop(&key);
        }
    }

    /// Drop everything
    pub async fn clear(&self) {
        self.inner.lock().await.clear();
    }

    /// Number of cached objects
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Whether the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DirectoryConfig;
    use std::sync::Arc;

    fn school(name: &str) -> SchoolObject {
        let config = Arc::new(DirectoryConfig::default());
        SchoolObject::new(ModelKind::School, Some(name), None, config)
    }

    #[tokio::test]
    async fn caches_by_sorted_items() {
        let cache = ObjectCache::new(8);
        let a = CacheKey::new(ModelKind::School, &[("name", "Alpha"), ("x", "1")]);
        let b = CacheKey::new(ModelKind::School, &[("x", "1"), ("name", "Alpha")]);
        assert_eq!(a, b);

        let mut built = 0;
        let _ = cache
            .get_or_insert_with(a, || {
                built += 1;
                school("Alpha")
            })
            .await;
        let _ = cache
            .get_or_insert_with(b, || {
                built += 1;
                school("Alpha")
            })
            .await;
        assert_eq!(built, 1);
    }

    #[tokio::test]
    async fn invalidation_is_per_kind() {
        let cache = ObjectCache::new(8);
        let school_key = CacheKey::new(ModelKind::School, &[("name", "Alpha")]);
        let teacher_key = CacheKey::new(ModelKind::Teacher, &[("name", "t1")]);
        let config = Arc::new(DirectoryConfig::default());
        cache
            .get_or_insert_with(school_key, || school("Alpha"))
            .await;
        cache
            .get_or_insert_with(teacher_key, || {
                SchoolObject::new(ModelKind::Teacher, Some("t1"), Some("Alpha"), config.clone())
            })
            .await;
        assert_eq!(cache.len().await, 2);

        cache.invalidate_kind(ModelKind::School).await;
        assert_eq!(cache.len().await, 1);
    }
}
