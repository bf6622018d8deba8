//! Identity caches of documents, indexed by `ObjectId`.
//!
//! An [`ObjectCache`] behaves like a dictionary while it is enabled. Once
//! disabled it looks empty: lookups miss, `len` is 0 and inserts are dropped,
//! but the entries stored before are kept and show up again when the cache
//! is re-enabled.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use bson::oid::ObjectId;

type Entry = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
struct Inner {
    enabled: bool,
    entries: HashMap<ObjectId, Entry>,
}

/// A shared handle on a cache. Clones point at the same cache.
#[derive(Clone)]
pub struct ObjectCache {
    inner: Arc<RwLock<Inner>>,
}

impl Default for ObjectCache {
    fn default() -> Self {
        Self::new(true)
    }
}

impl std::fmt::Debug for ObjectCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("ObjectCache")
            .field("enabled", &inner.enabled)
            .field("entries", &inner.entries.len())
            .finish()
    }
}

impl ObjectCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                enabled,
                entries: HashMap::new(),
            })),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_enabled(&self) -> bool {
        self.read().enabled
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.write().enabled = enabled;
    }

    /// Returns the value stored at `key` if it has the type `T`.
    pub fn get<T: Any + Send + Sync>(&self, key: &ObjectId) -> Option<Arc<T>> {
        let entry = self.get_any(key)?;
        entry.downcast::<T>().ok()
    }

    pub fn get_any(&self, key: &ObjectId) -> Option<Entry> {
        let inner = self.read();
        if !inner.enabled {
            return None;
        }
        inner.entries.get(key).cloned()
    }

    /// Stores `value` at `key`. Ignored while the cache is disabled.
    pub fn insert<T: Any + Send + Sync>(&self, key: ObjectId, value: T) {
        self.insert_shared(key, Arc::new(value));
    }

    pub fn insert_shared(&self, key: ObjectId, value: Entry) {
        let mut inner = self.write();
        if inner.enabled {
            inner.entries.insert(key, value);
        }
    }

    pub fn remove(&self, key: &ObjectId) -> Option<Entry> {
        self.write().entries.remove(key)
    }

    pub fn contains(&self, key: &ObjectId) -> bool {
        let inner = self.read();
        inner.enabled && inner.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        let inner = self.read();
        if inner.enabled {
            inner.entries.len()
        } else {
            0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<ObjectId> {
        let inner = self.read();
        if !inner.enabled {
            return Vec::new();
        }
        inner.entries.keys().copied().collect()
    }

    pub fn clear(&self) {
        self.write().entries.clear();
    }

    /// Whether both handles point at the same cache.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Caches indexed by collection name.
#[derive(Default)]
pub struct ObjectCacheCollection {
    caches: Mutex<HashMap<String, ObjectCache>>,
}

impl ObjectCacheCollection {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, ObjectCache>> {
        self.caches.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn enable_caches(&self) {
        for cache in self.lock().values() {
            cache.set_enabled(true);
        }
    }

    pub fn disable_caches(&self) {
        for cache in self.lock().values() {
            cache.set_enabled(false);
        }
    }

    pub fn clear_caches(&self) {
        for cache in self.lock().values() {
            cache.clear();
        }
    }

    /// Returns the cache of the collection `name`, creating an enabled one
    /// when `create_if_needed` is set and none exists.
    pub fn get_cache(&self, name: &str, create_if_needed: bool) -> Option<ObjectCache> {
        let mut caches = self.lock();
        match caches.get(name) {
            Some(cache) => Some(cache.clone()),
            None if create_if_needed => {
                let cache = ObjectCache::new(true);
                caches.insert(name.to_string(), cache.clone());
                Some(cache)
            }
            None => None,
        }
    }

    pub fn set_cache(&self, name: &str, cache: ObjectCache) {
        self.lock().insert(name.to_string(), cache);
    }

    pub fn remove_cache(&self, name: &str) -> Option<ObjectCache> {
        self.lock().remove(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_enabled_and_empty() {
        let cache = ObjectCache::default();
        assert!(cache.is_enabled());
        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn disabled_at_construction() {
        let cache = ObjectCache::new(false);
        assert!(!cache.is_enabled());
    }

    #[test]
    fn behaves_like_a_map() {
        let cache = ObjectCache::default();
        let key = ObjectId::new();
        assert!(!cache.contains(&key));

        cache.insert(key, "bar".to_string());
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&key));
        assert_eq!(cache.get::<String>(&key).as_deref(), Some(&"bar".to_string()));
        assert!(cache.get::<i32>(&key).is_none());

        cache.remove(&key);
        assert!(!cache.contains(&key));
        assert!(cache.get::<String>(&ObjectId::new()).is_none());
    }

    #[test]
    fn disabled_cache_looks_empty_and_drops_inserts() {
        let cache = ObjectCache::default();
        let foo = ObjectId::new();
        cache.insert(foo, "bar");

        cache.set_enabled(false);
        assert!(!cache.contains(&foo));
        assert_eq!(cache.len(), 0);
        assert!(cache.keys().is_empty());

        let bar = ObjectId::new();
        cache.insert(bar, "foo");
        cache.set_enabled(true);
        assert!(!cache.contains(&bar));
        assert!(cache.contains(&foo));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn collection_get_and_set() {
        let caches = ObjectCacheCollection::new();
        assert!(caches.get_cache("foo", false).is_none());

        let cache = ObjectCache::default();
        caches.set_cache("foo", cache.clone());
        assert!(caches.get_cache("foo", false).unwrap().ptr_eq(&cache));

        let created = caches.get_cache("bar", true).unwrap();
        assert!(created.is_enabled());
        assert!(caches.get_cache("bar", false).unwrap().ptr_eq(&created));
    }

    #[test]
    fn collection_switches_every_cache() {
        let caches = ObjectCacheCollection::new();
        let cache = ObjectCache::new(false);
        caches.set_cache("foo", cache.clone());

        caches.enable_caches();
        assert!(cache.is_enabled());

        caches.disable_caches();
        assert!(!cache.is_enabled());
    }

    #[test]
    fn collection_clears_every_cache() {
        let caches = ObjectCacheCollection::new();
        let cache = ObjectCache::default();
        cache.insert(ObjectId::new(), "foo");
        caches.set_cache("foo", cache.clone());

        caches.clear_caches();
        assert_eq!(cache.len(), 0);
    }
}
