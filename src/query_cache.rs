//! Sharded cache for query result payloads.
//!
//! This is the collaborator sitting next to the index layer: query engines
//! store fully computed result payloads here, keyed by the hash of the query
//! string, and data modification invalidates them by collection name. The
//! index itself knows nothing about this cache; it only supplies the lookup
//! capability the cached queries were built from.
//!
//! ## Layout
//!
//! ```text
//! QueryCache
//! ├─ mode: Off | OnDemand | On        (process-wide, relaxed atomic)
//! ├─ max_results                      (per-database bound, mutex-guarded)
//! └─ shards[8]: RwLock ──► database id ──► DatabaseCache
//!                                          ├─ entries: hash ──► Arc<CachedQuery>
//!                                          │  (LRU-bounded by max_results)
//!                                          └─ collection ──► hashes (invalidation)
//! ```
//!
//! Lookups take a shard's read lock; stores and invalidation take the write
//! lock. Database caches removed by invalidation are dropped only after the
//! shard lock is released, keeping critical sections short. Result payloads
//! are `Arc`-shared, so a reader holding a result keeps it alive across a
//! concurrent invalidation.
//!
//! Changing the cache mode invalidates everything: while the cache is off no
//! invalidation is tracked, so anything still stored would be stale once the
//! cache is re-enabled.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use hashbrown::HashMap;
use lru::LruCache;
use multimap::MultiMap;
use parking_lot::{Mutex, RwLock};

use crate::index::splitmix64;

/// Identifier of a database whose queries are cached.
pub type DatabaseId = u64;

/// Number of independently locked shards.
const SHARD_COUNT: usize = 8;

/// Default maximum number of cached results per database.
pub const DEFAULT_MAX_RESULTS: usize = 128;

/// Process-wide caching mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum CacheMode {
    /// Never cache.
    Off = 0,
    /// Cache only queries that ask for it.
    OnDemand = 1,
    /// Cache every eligible query.
    On = 2,
}

impl CacheMode {
    /// String form used in properties output.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheMode::Off => "off",
            CacheMode::OnDemand => "demand",
            CacheMode::On => "on",
        }
    }

    /// Parse a mode string; anything unrecognized turns the cache off.
    pub fn parse(value: &str) -> Self {
        match value {
            "on" => CacheMode::On,
            "demand" => CacheMode::OnDemand,
            _ => CacheMode::Off,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            2 => CacheMode::On,
            1 => CacheMode::OnDemand,
            _ => CacheMode::Off,
        }
    }
}

/// A cached query result.
///
/// The full query string is kept so a lookup can reject a different query
/// that happens to share a hash.
#[derive(Debug)]
pub struct CachedQuery {
    /// Hash of the query string.
    pub hash: u64,
    /// The query string itself.
    pub query: String,
    /// The serialized result payload.
    pub payload: Vec<u8>,
    /// Collections the result was computed from.
    pub collections: Vec<String>,
}

/// Snapshot of the cache's configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheProperties {
    /// Current caching mode.
    pub mode: CacheMode,
    /// Per-database result bound.
    pub max_results: usize,
}

/// Cache state of a single database.
struct DatabaseCache {
    /// Results by query hash, evicting the least recently stored.
    entries: LruCache<u64, Arc<CachedQuery>>,
    /// Collection name to the hashes of results computed from it.
    by_collection: MultiMap<String, u64>,
}

impl DatabaseCache {
    fn new(max_results: usize) -> Self {
        Self {
            entries: LruCache::new(NonZeroUsize::new(max_results.max(1)).unwrap()),
            by_collection: MultiMap::new(),
        }
    }

    fn lookup(&self, hash: u64, query: &str) -> Option<Arc<CachedQuery>> {
        let entry = self.entries.peek(&hash)?;
        if entry.query != query {
            // a different query with the same hash
            return None;
        }
        Some(entry.clone())
    }

    fn store(&mut self, entry: Arc<CachedQuery>) {
        let hash = entry.hash;
        if let Some(previous) = self.entries.pop(&hash) {
            self.forget_collections(&previous);
        }
        if let Some((_, evicted)) = self.entries.push(hash, entry.clone()) {
            self.forget_collections(&evicted);
        }
        for collection in &entry.collections {
            self.by_collection.insert(collection.clone(), hash);
        }
    }

    fn invalidate_collection(&mut self, collection: &str) {
        if let Some(hashes) = self.by_collection.remove(collection) {
            for hash in hashes {
                // the entry may already be gone via another collection
                self.entries.pop(&hash);
            }
        }
    }

    /// Drop the collection registrations of an entry leaving the cache.
    fn forget_collections(&mut self, entry: &CachedQuery) {
        for collection in &entry.collections {
            let now_empty = match self.by_collection.get_vec_mut(collection) {
                Some(hashes) => {
                    hashes.retain(|hash| *hash != entry.hash);
                    hashes.is_empty()
                }
                None => false,
            };
            if now_empty {
                self.by_collection.remove(collection);
            }
        }
    }

    fn set_capacity(&mut self, max_results: usize) {
        let capacity = NonZeroUsize::new(max_results.max(1)).unwrap();
        while self.entries.len() > capacity.get() {
            match self.entries.pop_lru() {
                Some((_, evicted)) => self.forget_collections(&evicted),
                None => break,
            }
        }
        self.entries.resize(capacity);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Process-wide query result cache.
///
/// Storage is partitioned into [`SHARD_COUNT`] shards, each protected by a
/// reader-writer lock; a database's shard is chosen by hashing its id. The
/// cache is safe to share across threads.
pub struct QueryCache {
    shards: Vec<RwLock<HashMap<DatabaseId, DatabaseCache>>>,
    mode: AtomicU8,
    max_results: Mutex<usize>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    /// Create a standalone cache with default properties.
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| RwLock::new(HashMap::new())).collect(),
            mode: AtomicU8::new(CacheMode::OnDemand as u8),
            max_results: Mutex::new(DEFAULT_MAX_RESULTS),
        }
    }

    /// The lazily initialized process-wide instance.
    pub fn instance() -> &'static QueryCache {
        static INSTANCE: OnceLock<QueryCache> = OnceLock::new();
        INSTANCE.get_or_init(QueryCache::new)
    }

    /// Current caching mode.
    pub fn mode(&self) -> CacheMode {
        CacheMode::from_u8(self.mode.load(Ordering::Relaxed))
    }

    /// Quick test saving callers further work when the cache is off.
    pub fn may_be_active(&self) -> bool {
        self.mode() != CacheMode::Off
    }

    /// Change the caching mode.
    ///
    /// Any actual change invalidates every cached result: invalidation is
    /// not tracked while the cache is off, so surviving entries could be
    /// stale after a re-enable.
    pub fn set_mode(&self, mode: CacheMode) {
        if mode == self.mode() {
            return;
        }
        self.invalidate_all();
        self.mode.store(mode as u8, Ordering::Release);
    }

    /// Snapshot mode and per-database bound.
    pub fn properties(&self) -> CacheProperties {
        let max_results = *self.max_results.lock();
        CacheProperties {
            mode: self.mode(),
            max_results,
        }
    }

    /// Apply a mode and per-database bound together.
    pub fn set_properties(&self, properties: CacheProperties) {
        self.set_mode(properties.mode);
        self.set_max_results(properties.max_results);
    }

    /// Change the per-database result bound. A value of 0 is ignored.
    ///
    /// Shrinking evicts immediately; raising only widens the bound.
    pub fn set_max_results(&self, value: usize) {
        if value == 0 {
            return;
        }
        let mut max_results = self.max_results.lock();
        for shard in &self.shards {
            let mut databases = shard.write();
            for cache in databases.values_mut() {
                cache.set_capacity(value);
            }
        }
        *max_results = value;
    }

    /// Look up a cached result.
    ///
    /// The stored query string must match `query` exactly; a hash collision
    /// between different queries is treated as a miss.
    pub fn lookup(&self, database: DatabaseId, hash: u64, query: &str) -> Option<Arc<CachedQuery>> {
        let databases = self.shards[self.shard_for(database)].read();
        databases.get(&database)?.lookup(hash, query)
    }

    /// Store a query result, returning the shared entry.
    ///
    /// Replaces any prior result with the same hash and evicts the least
    /// recently stored result once the database exceeds the bound.
    pub fn store(
        &self,
        database: DatabaseId,
        hash: u64,
        query: impl Into<String>,
        payload: Vec<u8>,
        collections: Vec<String>,
    ) -> Arc<CachedQuery> {
        let entry = Arc::new(CachedQuery {
            hash,
            query: query.into(),
            payload,
            collections,
        });
        let max_results = *self.max_results.lock();

        let mut databases = self.shards[self.shard_for(database)].write();
        let cache = databases
            .entry(database)
            .or_insert_with(|| DatabaseCache::new(max_results));
        cache.store(entry.clone());
        entry
    }

    /// Invalidate all results computed from any of `collections`.
    pub fn invalidate_collections(&self, database: DatabaseId, collections: &[&str]) {
        let mut databases = self.shards[self.shard_for(database)].write();
        if let Some(cache) = databases.get_mut(&database) {
            for collection in collections {
                cache.invalidate_collection(collection);
            }
        }
    }

    /// Invalidate all results computed from one collection.
    pub fn invalidate_collection(&self, database: DatabaseId, collection: &str) {
        self.invalidate_collections(database, &[collection]);
    }

    /// Invalidate every result of one database.
    pub fn invalidate_database(&self, database: DatabaseId) {
        let removed = {
            let mut databases = self.shards[self.shard_for(database)].write();
            databases.remove(&database)
        };
        // dropped here, after the shard lock is released
        drop(removed);
    }

    /// Invalidate every result in the cache.
    pub fn invalidate_all(&self) {
        for shard in &self.shards {
            let removed: Vec<DatabaseCache> = {
                let mut databases = shard.write();
                databases.drain().map(|(_, cache)| cache).collect()
            };
            drop(removed);
        }
    }

    /// Total number of cached results across all databases.
    pub fn cached_results(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.read().values().map(DatabaseCache::len).sum::<usize>())
            .sum()
    }

    fn shard_for(&self, database: DatabaseId) -> usize {
        (splitmix64(database) % SHARD_COUNT as u64) as usize
    }
}
