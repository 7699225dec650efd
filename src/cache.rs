use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Why an entry left the cache. Passed to the eviction hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictReason {
    /// Removed via `invalidate`.
    Explicit,
    /// Removed because its TTL elapsed.
    Expired,
    /// Removed to keep the store under `max_entries`.
    Capacity,
    /// Removed via `clear`.
    Cleared,
}

type EvictHook<K, V> = Box<dyn FnMut(&K, &V, EvictReason) + Send>;

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
    last_accessed: Instant,
}

/// Generic key/value store with per-entry TTL and LRU eviction under a
/// max entry count.
///
/// `get` hits return a clone of the stored value, never the stored
/// instance, so callers cannot corrupt cache state by mutating their
/// result. Expired entries are evicted lazily on access; `cleanup`
/// sweeps them all and is meant to run on a periodic external tick.
pub struct TtlCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    default_ttl: Duration,
    max_entries: usize,
    on_evict: Option<EvictHook<K, V>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(default_ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            default_ttl,
            max_entries: max_entries.max(1),
            on_evict: None,
        }
    }

    /// Register a hook fired on every removal: explicit, expiry, LRU, clear.
    #[allow(dead_code)]
    pub fn set_on_evict(&mut self, hook: impl FnMut(&K, &V, EvictReason) + Send + 'static) {
        self.on_evict = Some(Box::new(hook));
    }

    /// Return a clone of the value if present and unexpired.
    ///
    /// An expired entry is removed on the spot (the hook fires) and the
    /// call reports a miss. Hits bump the entry's last-access time.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let now = Instant::now();
        let expired = matches!(self.entries.get(key), Some(e) if e.expires_at <= now);
        if expired {
            if let Some(entry) = self.entries.remove(key) {
                if let Some(hook) = self.on_evict.as_mut() {
                    hook(key, &entry.value, EvictReason::Expired);
                }
            }
            return None;
        }
        let entry = self.entries.get_mut(key)?;
        entry.last_accessed = now;
        Some(entry.value.clone())
    }

    /// Insert or overwrite with the default TTL.
    pub fn set(&mut self, key: K, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Insert or overwrite with an explicit TTL. If the store exceeds
    /// `max_entries`, the least-recently-accessed entry is evicted.
    pub fn set_with_ttl(&mut self, key: K, value: V, ttl: Duration) {
        let now = Instant::now();
        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: now + ttl,
                last_accessed: now,
            },
        );
        while self.entries.len() > self.max_entries {
            let lru = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_accessed)
                .map(|(k, _)| k.clone());
            match lru {
                Some(k) => {
                    if let Some(entry) = self.entries.remove(&k) {
                        if let Some(hook) = self.on_evict.as_mut() {
                            hook(&k, &entry.value, EvictReason::Capacity);
                        }
                    }
                }
                None => break,
            }
        }
    }

    /// Remove a single entry, firing the hook if it was present.
    pub fn invalidate(&mut self, key: &K) {
        if let Some(entry) = self.entries.remove(key) {
            if let Some(hook) = self.on_evict.as_mut() {
                hook(key, &entry.value, EvictReason::Explicit);
            }
        }
    }

    /// Drop every entry, firing the hook for each.
    pub fn clear(&mut self) {
        let drained: Vec<(K, CacheEntry<V>)> = self.entries.drain().collect();
        if let Some(hook) = self.on_evict.as_mut() {
            for (k, entry) in &drained {
                hook(k, &entry.value, EvictReason::Cleared);
            }
        }
    }

    /// Sweep all expired entries. Returns how many were removed.
    pub fn cleanup(&mut self) -> usize {
        let now = Instant::now();
        let expired: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, e)| e.expires_at <= now)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            if let Some(entry) = self.entries.remove(key) {
                if let Some(hook) = self.on_evict.as_mut() {
                    hook(key, &entry.value, EvictReason::Expired);
                }
            }
        }
        expired.len()
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::thread::sleep;

    fn cache() -> TtlCache<String, u32> {
        TtlCache::new(Duration::from_secs(60), 10)
    }

    #[test]
    fn get_after_set_returns_value() {
        let mut c = cache();
        c.set("a".into(), 1);
        assert_eq!(c.get(&"a".into()), Some(1));
    }

    #[test]
    fn get_missing_returns_none() {
        let mut c = cache();
        assert_eq!(c.get(&"missing".into()), None);
    }

    #[test]
    fn zero_ttl_entry_is_immediately_expired() {
        let mut c = cache();
        c.set_with_ttl("a".into(), 1, Duration::ZERO);
        assert_eq!(c.get(&"a".into()), None);
        assert!(c.is_empty());
    }

    #[test]
    fn entry_expires_after_ttl() {
        let mut c = cache();
        c.set_with_ttl("a".into(), 1, Duration::from_millis(10));
        assert_eq!(c.get(&"a".into()), Some(1));
        sleep(Duration::from_millis(30));
        assert_eq!(c.get(&"a".into()), None);
    }

    #[test]
    fn overwrite_replaces_value() {
        let mut c = cache();
        c.set("a".into(), 1);
        c.set("a".into(), 2);
        assert_eq!(c.get(&"a".into()), Some(2));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn lru_eviction_removes_least_recently_accessed() {
        let mut c: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60), 2);
        c.set("a".into(), 1);
        sleep(Duration::from_millis(2));
        c.set("b".into(), 2);
        sleep(Duration::from_millis(2));
        // Touch "a" so "b" becomes the LRU entry.
        assert_eq!(c.get(&"a".into()), Some(1));
        sleep(Duration::from_millis(2));
        c.set("c".into(), 3);
        assert_eq!(c.len(), 2);
        assert_eq!(c.get(&"b".into()), None);
        assert_eq!(c.get(&"a".into()), Some(1));
        assert_eq!(c.get(&"c".into()), Some(3));
    }

    #[test]
    fn invalidate_removes_entry() {
        let mut c = cache();
        c.set("a".into(), 1);
        c.invalidate(&"a".into());
        assert_eq!(c.get(&"a".into()), None);
    }

    #[test]
    fn clear_empties_cache() {
        let mut c = cache();
        c.set("a".into(), 1);
        c.set("b".into(), 2);
        c.clear();
        assert!(c.is_empty());
    }

    #[test]
    fn cleanup_sweeps_only_expired() {
        let mut c = cache();
        c.set_with_ttl("old".into(), 1, Duration::from_millis(5));
        c.set_with_ttl("fresh".into(), 2, Duration::from_secs(60));
        sleep(Duration::from_millis(20));
        assert_eq!(c.cleanup(), 1);
        assert_eq!(c.get(&"old".into()), None);
        assert_eq!(c.get(&"fresh".into()), Some(2));
    }

    #[test]
    fn evict_hook_fires_for_every_removal_kind() {
        let log: Arc<Mutex<Vec<(String, EvictReason)>>> = Arc::new(Mutex::new(Vec::new()));
        let mut c: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60), 2);
        let sink = log.clone();
        c.set_on_evict(move |k, _v, reason| sink.lock().unwrap().push((k.clone(), reason)));

        c.set("explicit".into(), 1);
        c.invalidate(&"explicit".into());

        c.set_with_ttl("expired".into(), 2, Duration::ZERO);
        assert_eq!(c.get(&"expired".into()), None);

        c.set("a".into(), 3);
        sleep(Duration::from_millis(2));
        c.set("b".into(), 4);
        sleep(Duration::from_millis(2));
        c.set("c".into(), 5); // capacity 2: evicts "a"

        c.clear();

        let log = log.lock().unwrap();
        assert!(log.contains(&("explicit".into(), EvictReason::Explicit)));
        assert!(log.contains(&("expired".into(), EvictReason::Expired)));
        assert!(log.contains(&("a".into(), EvictReason::Capacity)));
        assert!(log.iter().any(|(_, r)| *r == EvictReason::Cleared));
    }

    #[test]
    fn get_returns_a_copy_not_the_stored_instance() {
        let mut c: TtlCache<String, HashMap<String, u32>> =
            TtlCache::new(Duration::from_secs(60), 10);
        let mut map = HashMap::new();
        map.insert("k".to_string(), 1);
        c.set("m".into(), map);

        let mut hit = c.get(&"m".into()).unwrap();
        hit.insert("rogue".to_string(), 99);

        let again = c.get(&"m".into()).unwrap();
        assert_eq!(again.len(), 1);
        assert!(!again.contains_key("rogue"));
    }
}
