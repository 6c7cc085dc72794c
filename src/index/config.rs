//! Construction parameters for the multi-valued index.
//!
//! Two knobs control the initial shape of an index:
//!
//! - `num_buckets`: how many independently sized shards the index is split
//!   into. A record's bucket is chosen by the low bits of its key hash, so
//!   the count is rounded up to a power of two at construction and never
//!   changes afterwards. More buckets shard mutation work and bound the cost
//!   of any single resize.
//! - `initial_capacity`: the slot-array size each bucket starts with.
//!   Buckets grow independently once an insert pushes them past a 2/3 load
//!   factor, so this only sets the starting point.
//!
//! ```text
//! num_buckets = 4, initial_capacity = 64
//!
//! key hash: 0x..…10  ──low bits──►  bucket 2
//!                                   ├─ 64 slots (grows alone)
//!                                   └─ used / collision counters
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! // defaults
//! let config = IndexConfig::default();
//!
//! // a sharded index for a write-heavy secondary index
//! let config = IndexConfig::builder()
//!     .num_buckets(16)
//!     .initial_capacity(1024)
//!     .build();
//! config.validate();
//! ```

use more_asserts as ma;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Default number of buckets.
pub const DEFAULT_NUM_BUCKETS: usize = 1;

/// Default per-bucket slot count.
pub const DEFAULT_INITIAL_CAPACITY: usize = 64;

/// Smallest allowed per-bucket slot count.
///
/// Four is the smallest capacity at which the 2/3 growth trigger always
/// fires before a bucket can fill completely; a completely full bucket
/// would turn missing-key probe loops into infinite loops.
pub const MIN_INITIAL_CAPACITY: usize = 4;

/// Construction parameters for a [`MultiIndex`](super::MultiIndex).
#[derive(Clone, Debug, PartialEq, Eq, TypedBuilder, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Number of buckets, rounded up to a power of two at construction.
    #[serde(default = "IndexConfig::default_num_buckets")]
    #[builder(default = DEFAULT_NUM_BUCKETS)]
    pub num_buckets: usize,

    /// Initial slot count of each bucket.
    #[serde(default = "IndexConfig::default_initial_capacity")]
    #[builder(default = DEFAULT_INITIAL_CAPACITY)]
    pub initial_capacity: usize,
}

impl IndexConfig {
    /// Get the default bucket count for serde deserialization.
    pub fn default_num_buckets() -> usize {
        DEFAULT_NUM_BUCKETS
    }

    /// Get the default per-bucket capacity for serde deserialization.
    pub fn default_initial_capacity() -> usize {
        DEFAULT_INITIAL_CAPACITY
    }

    /// Validate that configuration values are consistent.
    ///
    /// # Panics
    ///
    /// Panics if `num_buckets` is zero or `initial_capacity` is below
    /// [`MIN_INITIAL_CAPACITY`].
    pub fn validate(&self) {
        ma::assert_ge!(self.num_buckets, 1);
        ma::assert_ge!(self.initial_capacity, MIN_INITIAL_CAPACITY);
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            num_buckets: DEFAULT_NUM_BUCKETS,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
        }
    }
}
