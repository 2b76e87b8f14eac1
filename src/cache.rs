//! Content-addressed artifact cache
//!
//! Built graph artifacts are stored under a key derived from the hashes of
//! every input plus the selection. The backing store is injected through
//! [`ArtifactStore`] so the cache can be exercised without a real backend.
//!
//! ## Implementations
//!
//! - [`MemoryStore`]: in-process map with a byte quota
//! - [`FileStore`]: one file per key in a directory, with a byte quota
//!
//! Persistence is best effort: when the store runs out of room, cache entries
//! are evicted smallest first and the write retried after each eviction. If
//! nothing is left to evict the write is abandoned and reported as
//! [`PutOutcome::Abandoned`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::checksum::Checksum;

/// Prefix shared by every cache key
pub const CACHE_PREFIX: &str = "graph-cache_";

const ARTIFACT_EXT: &str = "artifact";

/// Store failure
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: u64, quota: u64 },

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Key/value storage for serialized artifacts
pub trait ArtifactStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    /// Either the whole value is stored or nothing changes.
    fn put(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    fn remove(&mut self, key: &str) -> Result<(), StoreError>;

    /// Every stored key with its size in bytes
    fn entries(&self) -> Result<Vec<(String, u64)>, StoreError>;
}

// =============================================================================
// Memory Store
// =============================================================================

/// In-memory store, optionally bounded
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    quota: Option<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding at most `quota` bytes of values
    pub fn with_quota(quota: u64) -> Self {
        Self {
            entries: BTreeMap::new(),
            quota: Some(quota),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn used_except(&self, key: &str) -> u64 {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(_, v)| v.len() as u64)
            .sum()
    }
}

impl ArtifactStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if let Some(quota) = self.quota {
            let needed = self.used_except(key) + value.len() as u64;
            if needed > quota {
                return Err(StoreError::QuotaExceeded { needed, quota });
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    fn entries(&self) -> Result<Vec<(String, u64)>, StoreError> {
        Ok(self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.len() as u64))
            .collect())
    }
}

// =============================================================================
// File Store
// =============================================================================

/// Directory-backed store: one `<key>.artifact` file per entry
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    quota: Option<u64>,
}

impl FileStore {
    /// Open (creating if needed) a store in `dir`
    pub fn open(dir: impl Into<PathBuf>, quota: Option<u64>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, quota })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", encode_key(key), ARTIFACT_EXT))
    }
}

impl ArtifactStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if let Some(quota) = self.quota {
            let used: u64 = self
                .entries()?
                .into_iter()
                .filter(|(k, _)| k != key)
                .map(|(_, size)| size)
                .sum();
            let needed = used + value.len() as u64;
            if needed > quota {
                return Err(StoreError::QuotaExceeded { needed, quota });
            }
        }

        // Write to a temp file then rename so readers never see a partial value
        let tmp = self.dir.join(format!(".{}.tmp", encode_key(key)));
        fs::write(&tmp, value)?;
        if let Err(e) = fs::rename(&tmp, self.path_for(key)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn entries(&self) -> Result<Vec<(String, u64)>, StoreError> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != ARTIFACT_EXT) {
                continue;
            }
            let Some(key) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(decode_key)
            else {
                continue;
            };
            entries.push((key, entry.metadata()?.len()));
        }
        entries.sort();
        Ok(entries)
    }
}

/// Percent-encode everything outside `[A-Za-z0-9_-]`
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

fn decode_key(encoded: &str) -> Option<String> {
    let bytes = encoded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = encoded.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

// =============================================================================
// Cache Key
// =============================================================================

/// Content-addressed cache key, `graph-cache_<sha256>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key from the dataset hashes, the asset hash and the
    /// normalized selection (empty when no selection was given)
    pub fn derive(
        groups_hash: &Checksum,
        images_hash: &Checksum,
        assets_hash: &Checksum,
        selection: &str,
    ) -> Self {
        let digest = Checksum::combine([
            groups_hash.as_str(),
            images_hash.as_str(),
            assets_hash.as_str(),
            selection,
        ]);
        Self(format!("{}{}", CACHE_PREFIX, digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Artifact Cache
// =============================================================================

/// Result of a best-effort write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Stored,
    /// Stored after evicting this many entries
    StoredAfterEviction(usize),
    /// Nothing was stored
    Abandoned,
}

/// Cache over an injected store
#[derive(Debug)]
pub struct ArtifactCache<S> {
    store: S,
}

impl<S: ArtifactStore> ArtifactCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Look up an artifact; store errors read as a miss
    pub fn get(&self, key: &CacheKey) -> Option<String> {
        match self.store.get(key.as_str()) {
            Ok(hit) => hit,
            Err(e) => {
                warn!(key = %key, error = %e, "cache read failed; treating as miss");
                None
            }
        }
    }

    /// Store an artifact, evicting cache entries smallest first on quota failure
    pub fn put(&mut self, key: &CacheKey, value: &str) -> PutOutcome {
        match self.store.put(key.as_str(), value) {
            Ok(()) => return PutOutcome::Stored,
            Err(StoreError::QuotaExceeded { .. }) => {}
            Err(e) => {
                warn!(key = %key, error = %e, "cache write failed; result not persisted");
                return PutOutcome::Abandoned;
            }
        }

        let mut victims = match self.cache_entries() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(key = %key, error = %e, "cannot list cache entries; result not persisted");
                return PutOutcome::Abandoned;
            }
        };
        victims.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        let mut evicted = 0;
        for (victim, size) in victims {
            if let Err(e) = self.store.remove(&victim) {
                warn!(key = %victim, error = %e, "cache eviction failed; result not persisted");
                return PutOutcome::Abandoned;
            }
            evicted += 1;
            debug!(key = %victim, size, "evicted cache entry");

            match self.store.put(key.as_str(), value) {
                Ok(()) => return PutOutcome::StoredAfterEviction(evicted),
                Err(StoreError::QuotaExceeded { .. }) => continue,
                Err(e) => {
                    warn!(key = %key, error = %e, "cache write failed; result not persisted");
                    return PutOutcome::Abandoned;
                }
            }
        }

        warn!(key = %key, bytes = value.len(), "cache quota exhausted; result not persisted");
        PutOutcome::Abandoned
    }

    /// Remove one entry
    pub fn invalidate(&mut self, key: &CacheKey) -> Result<(), StoreError> {
        self.store.remove(key.as_str())
    }

    /// Remove every cache entry; returns how many were removed
    pub fn clear(&mut self) -> Result<usize, StoreError> {
        let entries = self.cache_entries()?;
        for (key, _) in &entries {
            self.store.remove(key)?;
        }
        Ok(entries.len())
    }

    fn cache_entries(&self) -> Result<Vec<(String, u64)>, StoreError> {
        Ok(self
            .store
            .entries()?
            .into_iter()
            .filter(|(k, _)| k.starts_with(CACHE_PREFIX))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(selection: &str) -> CacheKey {
        CacheKey::derive(
            &Checksum::from_str("groups"),
            &Checksum::from_str("images"),
            &Checksum::from_str("assets"),
            selection,
        )
    }

    #[test]
    fn test_key_is_deterministic_and_selection_sensitive() {
        assert_eq!(key("呂"), key("呂"));
        assert_ne!(key("呂"), key("all"));
        assert_ne!(key(""), key("all"));
        assert!(key("").as_str().starts_with(CACHE_PREFIX));
        assert_eq!(key("").as_str().len(), CACHE_PREFIX.len() + 64);
    }

    #[test]
    fn test_put_get_overwrite() {
        let mut cache = ArtifactCache::new(MemoryStore::new());
        assert_eq!(cache.get(&key("a")), None);
        assert_eq!(cache.put(&key("a"), "one"), PutOutcome::Stored);
        assert_eq!(cache.put(&key("a"), "two"), PutOutcome::Stored);
        assert_eq!(cache.get(&key("a")).as_deref(), Some("two"));
        assert_eq!(cache.store().len(), 1);
    }

    #[test]
    fn test_evicts_smallest_first() {
        let mut store = MemoryStore::with_quota(10);
        store.put("graph-cache_small", "12").unwrap();
        store.put("graph-cache_big", "1234").unwrap();
        store.put("graph-cache_mid", "123").unwrap();
        let mut cache = ArtifactCache::new(store);

        // 9 used; 4 more needs two evictions (small, then mid)
        let outcome = cache.put(&key("x"), "abcd");
        assert_eq!(outcome, PutOutcome::StoredAfterEviction(2));

        let remaining: Vec<String> = cache
            .store()
            .entries()
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert!(remaining.contains(&"graph-cache_big".to_string()));
        assert!(!remaining.contains(&"graph-cache_small".to_string()));
        assert!(!remaining.contains(&"graph-cache_mid".to_string()));
    }

    #[test]
    fn test_non_cache_entries_are_never_evicted() {
        let mut store = MemoryStore::with_quota(8);
        store.put("settings", "12345").unwrap();
        let mut cache = ArtifactCache::new(store);

        assert_eq!(cache.put(&key("x"), "abcdef"), PutOutcome::Abandoned);
        assert_eq!(cache.store().get("settings").unwrap().as_deref(), Some("12345"));
        assert_eq!(cache.get(&key("x")), None);
    }

    #[test]
    fn test_oversized_value_abandoned_after_evicting_everything() {
        let mut store = MemoryStore::with_quota(4);
        store.put("graph-cache_a", "12").unwrap();
        let mut cache = ArtifactCache::new(store);
        assert_eq!(cache.put(&key("x"), "far too large"), PutOutcome::Abandoned);
        assert!(cache.store().is_empty());
    }

    #[test]
    fn test_invalidate_removes_one_key() {
        let mut cache = ArtifactCache::new(MemoryStore::new());
        cache.put(&key("a"), "1");
        cache.put(&key("b"), "2");
        cache.invalidate(&key("a")).unwrap();
        assert_eq!(cache.get(&key("a")), None);
        assert_eq!(cache.get(&key("b")).as_deref(), Some("2"));
        cache.invalidate(&key("a")).unwrap();
    }

    #[test]
    fn test_clear_only_touches_cache_prefix() {
        let mut store = MemoryStore::new();
        store.put("other", "x").unwrap();
        let mut cache = ArtifactCache::new(store);
        cache.put(&key("a"), "1");
        cache.put(&key("b"), "2");
        assert_eq!(cache.clear().unwrap(), 2);
        assert_eq!(cache.store().len(), 1);
    }

    #[test]
    fn test_file_store_roundtrip_and_quota() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path().join("cache"), Some(6)).unwrap();

        store.put("graph-cache_a/b", "1234").unwrap();
        assert_eq!(store.get("graph-cache_a/b").unwrap().as_deref(), Some("1234"));
        assert_eq!(store.get("missing").unwrap(), None);
        assert_eq!(
            store.entries().unwrap(),
            vec![("graph-cache_a/b".to_string(), 4)]
        );

        assert!(matches!(
            store.put("graph-cache_c", "123"),
            Err(StoreError::QuotaExceeded { needed: 7, quota: 6 })
        ));
        // replacing an existing key only counts the new size
        store.put("graph-cache_a/b", "123456").unwrap();

        store.remove("graph-cache_a/b").unwrap();
        store.remove("graph-cache_a/b").unwrap();
        assert!(store.entries().unwrap().is_empty());
    }

    #[test]
    fn test_key_encoding() {
        assert_eq!(encode_key("graph-cache_ab"), "graph-cache_ab");
        assert_eq!(decode_key(&encode_key("a/b.c 呂")).as_deref(), Some("a/b.c 呂"));
        assert_eq!(decode_key("%G1"), None);
    }
}
