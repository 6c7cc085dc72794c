//! # grouplink
//!
//! Indexing-layer building blocks for a storage engine:
//!
//! - [`index`]: a multi-valued associative table ([`MultiIndex`]) that
//!   indexes borrowed record handles by an attribute key while tolerating
//!   repeated keys. Records sharing a key form intrusive doubly-linked
//!   groups inside partitioned, open-addressed, prime-sized buckets, with
//!   two-hash placement and hole-healing deletion. This is the backbone of
//!   secondary (non-unique) indexes.
//! - [`query_cache`]: the surrounding query-result cache collaborator, a
//!   sharded, reader-writer-locked store of cached query payloads with
//!   per-database LRU bounds and collection-based invalidation.
//!
//! The index performs no I/O, owns no record memory, and is externally
//! synchronized by its owner; every operation is synchronous.

pub mod error;
pub mod index;
pub mod query_cache;

pub use error::{IndexError, Result};
pub use index::{splitmix64, IndexAdapter, IndexConfig, IndexStats, MultiIndex};
pub use query_cache::{CacheMode, CacheProperties, CachedQuery, QueryCache};
