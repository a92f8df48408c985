use indexmap::IndexMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Default number of subtree hashes retained by a [`HashCache`].
pub const DEFAULT_HASH_CACHE_CAPACITY: usize = 1000;

/// Type alias representing the 64-bit hash code used for subtree comparison.
///
/// ```
/// # use jsoncompare_core::hash_bytes;
/// let code = hash_bytes(b"jsoncompare");
/// assert_eq!(code.len(), 8);
/// ```
pub type HashCode = [u8; 8];

/// Compute the FNV-1a hash of the provided bytes.
///
/// ```
/// # use jsoncompare_core::hash_bytes;
/// assert_eq!(hash_bytes(b"diff"), hash_bytes(b"diff"));
/// assert_ne!(hash_bytes(b"diff"), hash_bytes(b"diffs"));
/// ```
#[must_use]
pub fn hash_bytes(input: &[u8]) -> HashCode {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    let mut hash = OFFSET_BASIS;
    for byte in input {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash.to_le_bytes()
}

/// Renders a hash code as lowercase hexadecimal.
#[must_use]
pub fn to_hex(code: &HashCode) -> String {
    code.iter().map(|byte| format!("{byte:02x}")).collect()
}

#[derive(Default)]
struct CacheState {
    // Least recently used first.
    entries: IndexMap<String, HashCode>,
}

/// Bounded memo of container hashes with least-recently-used eviction.
///
/// Keys are the short combination text built from a container's child
/// digests, not the container's full serialized form.
///
/// The cache is internally synchronized so one instance can be shared across
/// concurrent normalizations behind an `Arc`.
///
/// ```
/// # use jsoncompare_core::{hash_bytes, HashCache};
/// let cache = HashCache::new(2);
/// assert_eq!(cache.hash("a"), hash_bytes(b"a"));
/// cache.hash("b");
/// cache.hash("a");
/// cache.hash("c");
/// assert!(cache.contains("a"));
/// assert!(!cache.contains("b"));
/// ```
pub struct HashCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl HashCache {
    /// Creates a cache holding at most `capacity` entries (minimum one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), state: Mutex::new(CacheState::default()) }
    }

    /// Returns the maximum number of retained entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Indicates whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reports whether `key` is cached without refreshing its access time.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Returns the FNV-1a hash of `serialized`, memoized.
    pub fn hash(&self, serialized: &str) -> HashCode {
        self.get_or_compute(serialized, |text| hash_bytes(text.as_bytes()))
    }

    /// Returns the cached value for `key`, computing and inserting it on a miss.
    ///
    /// A hit refreshes the entry's access time. When the cache is full, the
    /// least recently accessed entry is evicted before inserting.
    pub fn get_or_compute<F>(&self, key: &str, compute: F) -> HashCode
    where
        F: FnOnce(&str) -> HashCode,
    {
        let mut state = self.lock();
        if let Some(index) = state.entries.get_index_of(key) {
            let last = state.entries.len() - 1;
            state.entries.move_index(index, last);
            return state.entries[last];
        }

        let value = compute(key);
        if state.entries.len() >= self.capacity {
            state.entries.shift_remove_index(0);
        }
        state.entries.insert(key.to_owned(), value);
        value
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for HashCache {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for HashCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashCache").field("capacity", &self.capacity).field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn capacity_is_never_zero() {
        assert_eq!(HashCache::new(0).capacity(), 1);
    }

    #[test]
    fn hit_does_not_recompute() {
        let cache = HashCache::new(4);
        let first = cache.get_or_compute("k", |_| [1; 8]);
        let second = cache.get_or_compute("k", |_| [2; 8]);
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = HashCache::new(3);
        cache.hash("a");
        cache.hash("b");
        cache.hash("c");
        cache.hash("a");
        cache.hash("b");
        cache.hash("d");
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains("c"));
        assert!(cache.contains("a"));
        assert!(cache.contains("b"));
        assert!(cache.contains("d"));
    }

    #[test]
    fn shared_across_threads() {
        let cache = Arc::new(HashCache::new(16));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.hash(&format!("key-{}", i % 2)))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn hex_rendering_is_sixteen_chars() {
        assert_eq!(to_hex(&hash_bytes(b"x")).len(), 16);
    }
}
