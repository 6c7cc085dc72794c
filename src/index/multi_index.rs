//! # Multi-Valued Associative Table
//!
//! This module implements the core of the indexing layer: an associative
//! table that indexes records by an attribute key while tolerating repeated
//! keys. It backs secondary (non-unique) indexes, offering constant-time
//! single-record operations and linear-in-output key scans.
//!
//! ## Structure
//!
//! The table is partitioned into buckets selected by the low bits of a
//! record's key hash. Each bucket is an open-addressed slot array; all
//! records sharing a key form one doubly-linked list threaded *through the
//! slot array itself* via intra-bucket `prev`/`next` indices.
//!
//! ```text
//! bucket (capacity 11, prime)
//!
//!  slot:   0     1     2     3     4     5     6     7     8     9    10
//!        [   ] [r1*] [   ] [r4*] [r2 ] [   ] [r3 ] [   ] [   ] [r5*] [   ]
//!                │           ▲ │         ▲
//!                └── next ───┘ └─ next ──┘          * = group head
//!
//!  r1, r2, r3 share key A:   r1 (head) ⇄ r2 ⇄ r3
//!  r4 alone under key B, r5 alone under key C
//! ```
//!
//! ## Two-hash placement
//!
//! - The **head** of a group sits at the position probed from its *key*
//!   hash (or the first free slot after it).
//! - Every further **member** sits at the position probed from its
//!   *full-record* hash.
//!
//! Each slot caches the hash that governed its placement, so probe loops can
//! reject mismatches with one integer compare before calling back into the
//! adapter's equality predicates.
//!
//! ## Deletion
//!
//! Removing a record splices it out of its list and then *heals* the hole:
//! the probe chain walk forward from the hole moves any entry whose home
//! position can no longer reach it, preserving reachability without
//! re-inserting. Removing a head promotes its first member, which moves into
//! the head's slot and re-caches the key hash.
//!
//! ## Example
//!
//! ```rust,ignore
//! let index = MultiIndex::new(DocAdapter, IndexConfig::default())?;
//!
//! index.insert(doc_a1.clone(), /*overwrite=*/ false, /*check_equality=*/ true)?;
//! index.insert(doc_a2.clone(), false, true)?;
//!
//! // all records under key A, head first, members in stack order
//! let group = index.lookup_by_key(&key_a, /*limit=*/ 0);
//!
//! // paged enumeration
//! let page = index.lookup_by_key(&key_a, 100);
//! let rest = index.lookup_continue_after(page.last().unwrap(), 100);
//! ```
//!
//! The table is not internally synchronized; its owner serializes mutation
//! (typically one writer / many readers). No operation blocks or suspends.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::error::{IndexError, Result};
use crate::index::adapter::IndexAdapter;
use crate::index::bucket::Bucket;
use crate::index::config::{IndexConfig, MIN_INITIAL_CAPACITY};
use crate::index::prime::next_prime;
use crate::index::slot::{Slot, INVALID_INDEX};

/// Operation and probe counters, updated with relaxed atomics so read paths
/// can report without exclusive access.
#[derive(Debug, Default)]
struct Telemetry {
    lookups: AtomicU64,
    inserts: AtomicU64,
    removes: AtomicU64,
    resizes: AtomicU64,
    probe_misses: AtomicU64,
}

impl Telemetry {
    fn add_probes(&self, n: u64) {
        if n != 0 {
            self.probe_misses.fetch_add(n, Ordering::Relaxed);
        }
    }
}

/// Snapshot of an index's operation counters, for monitoring.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexStats {
    /// Number of lookup calls (by record, by key, and continuations).
    pub lookups: u64,
    /// Number of insert calls.
    pub inserts: u64,
    /// Number of remove calls.
    pub removes: u64,
    /// Number of bucket resizes.
    pub resizes: u64,
    /// Total probe steps past a slot that did not match.
    pub probe_misses: u64,
    /// Records currently stored.
    pub records: usize,
    /// Slots currently allocated across all buckets.
    pub allocated_slots: usize,
}

/// Associative table of record handles, tolerating repeated keys.
///
/// Parameterized by an [`IndexAdapter`] supplying the hashing and equality
/// semantics. Records are cheap-to-clone handles owned by the caller for
/// the whole of their membership; the table never frees them.
pub struct MultiIndex<A: IndexAdapter> {
    adapter: A,
    buckets: Vec<Bucket<A::Record>>,
    bucket_mask: u64,
    telemetry: Telemetry,
}

impl<A: IndexAdapter> MultiIndex<A> {
    /// Create an empty index.
    ///
    /// The configured bucket count is rounded up to a power of two. Fails
    /// wholesale if any bucket's slot array cannot be allocated.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid (see [`IndexConfig::validate`]).
    pub fn new(adapter: A, config: IndexConfig) -> Result<Self> {
        config.validate();

        let num_buckets = config.num_buckets.next_power_of_two();
        let mut buckets = Vec::new();
        buckets
            .try_reserve_exact(num_buckets)
            .map_err(|_| IndexError::out_of_memory(num_buckets))?;
        for _ in 0..num_buckets {
            buckets.push(Bucket::with_capacity(config.initial_capacity)?);
        }

        Ok(Self {
            adapter,
            buckets,
            bucket_mask: (num_buckets - 1) as u64,
            telemetry: Telemetry::default(),
        })
    }

    /// Number of buckets the index is partitioned into.
    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Number of records stored.
    pub fn size(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.used).sum()
    }

    /// Whether the index stores no records.
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|bucket| bucket.used == 0)
    }

    /// Number of slots allocated across all buckets.
    pub fn capacity(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.capacity()).sum()
    }

    /// Bytes used by the slot arrays.
    pub fn memory_usage(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.memory_usage()).sum()
    }

    /// Fraction of stored records that are group heads.
    ///
    /// A value of 1.0 means every record is identified uniquely by its key;
    /// lower values mean more repeated keys. Returns 1.0 for an empty index.
    pub fn selectivity(&self) -> f64 {
        let mut used = 0usize;
        let mut collisions = 0usize;
        for bucket in &self.buckets {
            used += bucket.used;
            collisions += bucket.collisions;
        }
        if used > 0 {
            (used - collisions) as f64 / used as f64
        } else {
            1.0
        }
    }

    /// Snapshot the operation counters.
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            lookups: self.telemetry.lookups.load(Ordering::Relaxed),
            inserts: self.telemetry.inserts.load(Ordering::Relaxed),
            removes: self.telemetry.removes.load(Ordering::Relaxed),
            resizes: self.telemetry.resizes.load(Ordering::Relaxed),
            probe_misses: self.telemetry.probe_misses.load(Ordering::Relaxed),
            records: self.size(),
            allocated_slots: self.capacity(),
        }
    }

    /// Add a record to the index.
    ///
    /// If an identical record is already present (per the adapter's full
    /// identity predicate) the prior handle is returned; with `overwrite`
    /// set, the stored handle is replaced first. Inserting a duplicate is a
    /// defined operation, not an error.
    ///
    /// `check_equality = false` is a bulk-load mode: the caller guarantees
    /// the record is not already present, so no equality callbacks run and
    /// placement walks straight to the first free slot.
    ///
    /// Fails only if the bucket had to grow and the new slot array could not
    /// be allocated; the index is unchanged in that case.
    pub fn insert(
        &mut self,
        record: A::Record,
        overwrite: bool,
        check_equality: bool,
    ) -> Result<Option<A::Record>> {
        let hash_by_key = self.adapter.hash_record(&record, true);
        let bucket_index = (hash_by_key & self.bucket_mask) as usize;

        // grow before probing: an insert into a bucket more than 2/3 full
        // extends it first, whether or not a free slot would have been found
        let capacity = self.buckets[bucket_index].capacity();
        if 2 * capacity < 3 * self.buckets[bucket_index].used {
            self.resize_bucket(bucket_index, 2 * capacity + 1)?;
        }

        self.telemetry.inserts.fetch_add(1, Ordering::Relaxed);
        let mut probes = 0u64;

        let Self {
            adapter,
            buckets,
            telemetry,
            ..
        } = self;
        let bucket = &mut buckets[bucket_index];

        let i = Self::find_group_head(
            bucket,
            hash_by_key,
            |stored| adapter.records_share_key(&record, stored),
            &mut probes,
        );

        if bucket.slots[i].is_vacant() {
            // first record with this key: it becomes a group of one
            bucket.slots[i] = Slot::head(hash_by_key, record);
            bucket.used += 1;
            telemetry.add_probes(probes);
            return Ok(None);
        }

        // slot i heads the group this record joins; the head itself may be
        // the record being re-inserted
        if check_equality {
            let head_record = bucket.slots[i].record.as_ref().unwrap();
            if adapter.records_identical(&record, head_record) {
                let prior = head_record.clone();
                if overwrite {
                    debug_assert_eq!(bucket.slots[i].hash, hash_by_key);
                    bucket.slots[i].record = Some(record);
                }
                telemetry.add_probes(probes);
                return Ok(Some(prior));
            }
        }

        let hash_by_record = adapter.hash_record(&record, false);
        let j = Self::find_record_place(
            adapter,
            bucket,
            &record,
            check_equality,
            hash_by_record,
            &mut probes,
        );

        if let Some(prior) = bucket.slots[j].record.clone() {
            if overwrite {
                bucket.slots[j].hash = hash_by_record;
                bucket.slots[j].record = Some(record);
            }
            telemetry.add_probes(probes);
            return Ok(Some(prior));
        }

        // splice the new member in directly after the head
        let head_next = bucket.slots[i].next;
        bucket.slots[j] = Slot {
            hash: hash_by_record,
            record: Some(record),
            prev: i,
            next: head_next,
        };
        bucket.slots[i].next = j;
        if head_next != INVALID_INDEX {
            bucket.slots[head_next].prev = j;
        }
        bucket.used += 1;
        bucket.collisions += 1;
        telemetry.add_probes(probes);
        Ok(None)
    }

    /// Look up a record by its full identity.
    ///
    /// Returns the stored handle, which may differ from `record` as a handle
    /// while comparing identical.
    pub fn lookup(&self, record: &A::Record) -> Option<A::Record> {
        self.telemetry.lookups.fetch_add(1, Ordering::Relaxed);
        let mut probes = 0u64;
        let (bucket_index, i) = self.locate_record(record, &mut probes);
        self.telemetry.add_probes(probes);
        self.buckets[bucket_index].slots[i].record.clone()
    }

    /// Collect all records stored under `key`, head first, then the members
    /// in their stored (most-recently-inserted-first) order.
    ///
    /// A `limit` of 0 means no limit.
    pub fn lookup_by_key(&self, key: &A::Key, limit: usize) -> Vec<A::Record> {
        self.telemetry.lookups.fetch_add(1, Ordering::Relaxed);
        let mut probes = 0u64;

        let hash_by_key = self.adapter.hash_key(key);
        let bucket_index = (hash_by_key & self.bucket_mask) as usize;
        let bucket = &self.buckets[bucket_index];

        let i = Self::find_group_head(
            bucket,
            hash_by_key,
            |stored| self.adapter.key_matches_record(key, stored),
            &mut probes,
        );
        self.telemetry.add_probes(probes);

        let mut results = Vec::new();
        if !bucket.slots[i].is_vacant() {
            let mut cursor = i;
            loop {
                results.push(bucket.slots[cursor].record.clone().unwrap());
                cursor = bucket.slots[cursor].next;
                if cursor == INVALID_INDEX || (limit != 0 && results.len() >= limit) {
                    break;
                }
            }
        }
        results
    }

    /// Continue a key scan after `record`, the last result of a previous
    /// call.
    ///
    /// Re-locates the record's slot and walks on along its group list, so a
    /// caller can page through a large group without tracking positions. A
    /// `limit` of 0 means no limit.
    pub fn lookup_continue_after(&self, record: &A::Record, limit: usize) -> Vec<A::Record> {
        self.telemetry.lookups.fetch_add(1, Ordering::Relaxed);
        let mut probes = 0u64;

        let hash_by_key = self.adapter.hash_record(record, true);
        let bucket_index = (hash_by_key & self.bucket_mask) as usize;
        let bucket = &self.buckets[bucket_index];

        let hash_by_record = self.adapter.hash_record(record, false);
        let mut i = Self::find_record_place(
            &self.adapter,
            bucket,
            record,
            true,
            hash_by_record,
            &mut probes,
        );

        if bucket.slots[i].is_vacant() {
            // not found by its full-record hash: the record must have been
            // serving as its group's head, which is placed by key hash
            i = Self::find_group_head(
                bucket,
                hash_by_key,
                |stored| self.adapter.records_share_key(record, stored),
                &mut probes,
            );
            if bucket.slots[i].is_vacant() {
                self.telemetry.add_probes(probes);
                return Vec::new();
            }
        }
        self.telemetry.add_probes(probes);

        let mut results = Vec::new();
        let mut cursor = i;
        loop {
            cursor = bucket.slots[cursor].next;
            if cursor == INVALID_INDEX || (limit != 0 && results.len() >= limit) {
                break;
            }
            results.push(bucket.slots[cursor].record.clone().unwrap());
        }
        results
    }

    /// Remove a record, returning the stored handle if it was present.
    pub fn remove(&mut self, record: &A::Record) -> Option<A::Record> {
        self.telemetry.removes.fetch_add(1, Ordering::Relaxed);
        let mut probes = 0u64;
        let (bucket_index, i) = self.locate_record(record, &mut probes);
        self.telemetry.add_probes(probes);

        let Self {
            adapter, buckets, ..
        } = self;
        let bucket = &mut buckets[bucket_index];

        if bucket.slots[i].is_vacant() {
            return None;
        }
        let old = bucket.slots[i].record.clone();

        if bucket.slots[i].prev == INVALID_INDEX {
            let successor = bucket.slots[i].next;
            if successor == INVALID_INDEX {
                // sole member of its group: the group dissolves
                bucket.invalidate(i);
                bucket.heal_hole(i);
            } else {
                // promote the first member: it moves into the head's slot
                // and must cache the key hash from now on
                bucket.slots[successor].prev = INVALID_INDEX;
                bucket.move_entry(successor, i);
                let key_hash = {
                    let promoted = bucket.slots[i].record.as_ref().unwrap();
                    adapter.hash_record(promoted, true)
                };
                bucket.slots[i].hash = key_hash;
                bucket.heal_hole(successor);
                bucket.collisions -= 1;
            }
        } else {
            // a non-head member: splice it out of its list
            let (prev, next) = (bucket.slots[i].prev, bucket.slots[i].next);
            bucket.slots[prev].next = next;
            if next != INVALID_INDEX {
                bucket.slots[next].prev = prev;
            }
            bucket.invalidate(i);
            bucket.heal_hole(i);
            bucket.collisions -= 1;
        }
        bucket.used -= 1;
        old
    }

    /// Resize the index to hold roughly `total_slots` slots, distributed
    /// over the buckets and rounded up to primes.
    ///
    /// Fails with [`IndexError::ResizeTooSmall`] if a bucket's share cannot
    /// hold its current entries under the 2/3 load-factor rule, and with
    /// [`IndexError::OutOfMemory`] if an allocation fails; in both cases
    /// every bucket is left in a consistent, usable state.
    pub fn resize(&mut self, total_slots: usize) -> Result<()> {
        let per_bucket = total_slots / self.buckets.len();
        let target = 2 * per_bucket + 1;
        for bucket_index in 0..self.buckets.len() {
            if 2 * target < 3 * self.buckets[bucket_index].used {
                return Err(IndexError::resize_too_small(
                    target,
                    self.buckets[bucket_index].used,
                ));
            }
            self.resize_bucket(bucket_index, target)?;
        }
        Ok(())
    }

    /// Invoke `visitor` on every stored record, in unspecified order.
    pub fn iterate<F>(&self, mut visitor: F)
    where
        F: FnMut(&A::Record),
    {
        for bucket in &self.buckets {
            for slot in &bucket.slots {
                if let Some(record) = slot.record.as_ref() {
                    visitor(record);
                }
            }
        }
    }

    /// Walk every bucket and assert the structural invariants.
    ///
    /// Checks, for every occupied slot: reciprocal `prev`/`next` links,
    /// cycle-free group lists, the cached hash matching the governing hash,
    /// and probe reachability from the home position. Also re-derives the
    /// `used` and `collision` counters. Intended for tests and bulk-load
    /// verification.
    ///
    /// # Panics
    ///
    /// Panics on the first violated invariant.
    pub fn validate(&self) {
        for (bucket_index, bucket) in self.buckets.iter().enumerate() {
            let capacity = bucket.capacity();
            let mut occupied = 0usize;
            let mut non_heads = 0usize;

            for i in 0..capacity {
                let slot = &bucket.slots[i];
                let record = match slot.record.as_ref() {
                    Some(record) => record,
                    None => continue,
                };
                occupied += 1;

                if slot.prev != INVALID_INDEX {
                    non_heads += 1;
                    assert_eq!(
                        bucket.slots[slot.prev].next, i,
                        "bucket {}: predecessor link broken at slot {}",
                        bucket_index, i
                    );
                }
                if slot.next != INVALID_INDEX {
                    assert_eq!(
                        bucket.slots[slot.next].prev, i,
                        "bucket {}: successor link broken at slot {}",
                        bucket_index, i
                    );
                }

                // cached hash must be the hash that governs placement
                let expected = self.adapter.hash_record(record, slot.prev == INVALID_INDEX);
                assert_eq!(
                    slot.hash, expected,
                    "bucket {}: stale cached hash at slot {}",
                    bucket_index, i
                );

                // group lists must terminate
                let mut steps = 0usize;
                let mut cursor = slot.next;
                while cursor != INVALID_INDEX {
                    assert_ne!(
                        cursor, i,
                        "bucket {}: cyclic group list through slot {}",
                        bucket_index, i
                    );
                    steps += 1;
                    assert!(
                        steps <= capacity,
                        "bucket {}: unterminated group list at slot {}",
                        bucket_index, i
                    );
                    cursor = bucket.slots[cursor].next;
                }

                // probe reachability: walking from the home position must
                // reach this slot before any free slot, and before any
                // earlier slot that would have satisfied the probe
                let mut k = bucket.home(slot.hash);
                while k != i {
                    let probed = &bucket.slots[k];
                    let blocking = probed.record.as_ref();
                    assert!(
                        blocking.is_some(),
                        "bucket {}: slot {} unreachable past hole at {}",
                        bucket_index,
                        i,
                        k
                    );
                    if slot.prev == INVALID_INDEX {
                        assert!(
                            !(probed.prev == INVALID_INDEX
                                && self.adapter.records_share_key(record, blocking.unwrap())),
                            "bucket {}: duplicate group head for slot {} at {}",
                            bucket_index,
                            i,
                            k
                        );
                    } else {
                        assert!(
                            !self.adapter.records_identical(record, blocking.unwrap()),
                            "bucket {}: duplicate record for slot {} at {}",
                            bucket_index,
                            i,
                            k
                        );
                    }
                    k = bucket.step(k);
                }
            }

            assert_eq!(
                occupied, bucket.used,
                "bucket {}: used counter drifted",
                bucket_index
            );
            assert_eq!(
                non_heads, bucket.collisions,
                "bucket {}: collision counter drifted",
                bucket_index
            );
        }
    }

    /// Probe for the head of the group matching `hash_by_key`, or the first
    /// free slot if no such group exists.
    fn find_group_head<F>(
        bucket: &Bucket<A::Record>,
        hash_by_key: u64,
        mut matches: F,
        probes: &mut u64,
    ) -> usize
    where
        F: FnMut(&A::Record) -> bool,
    {
        let mut i = bucket.home(hash_by_key);
        loop {
            let slot = &bucket.slots[i];
            match slot.record.as_ref() {
                None => return i,
                Some(stored) => {
                    if slot.prev == INVALID_INDEX && slot.hash == hash_by_key && matches(stored) {
                        return i;
                    }
                }
            }
            *probes += 1;
            i = bucket.step(i);
        }
    }

    /// Probe by full-record hash for `record` or for a free slot to place it.
    ///
    /// With `check_equality` unset the caller guarantees the record is not
    /// present and the walk stops only at a free slot.
    fn find_record_place(
        adapter: &A,
        bucket: &Bucket<A::Record>,
        record: &A::Record,
        check_equality: bool,
        hash_by_record: u64,
        probes: &mut u64,
    ) -> usize {
        let mut i = bucket.home(hash_by_record);
        loop {
            let slot = &bucket.slots[i];
            match slot.record.as_ref() {
                None => return i,
                Some(stored) => {
                    if check_equality
                        && slot.hash == hash_by_record
                        && adapter.records_identical(record, stored)
                    {
                        return i;
                    }
                }
            }
            *probes += 1;
            i = bucket.step(i);
        }
    }

    /// Locate a record's slot by full identity.
    ///
    /// Returns a slot index that either holds a record identical to
    /// `record` or is free (the record is absent).
    fn locate_record(&self, record: &A::Record, probes: &mut u64) -> (usize, usize) {
        let hash_by_key = self.adapter.hash_record(record, true);
        let bucket_index = (hash_by_key & self.bucket_mask) as usize;
        let bucket = &self.buckets[bucket_index];

        let i = Self::find_group_head(
            bucket,
            hash_by_key,
            |stored| self.adapter.records_share_key(record, stored),
            probes,
        );

        if let Some(head_record) = bucket.slots[i].record.as_ref() {
            // the head itself may be the record
            if self.adapter.records_identical(record, head_record) {
                return (bucket_index, i);
            }
            let hash_by_record = self.adapter.hash_record(record, false);
            let j = Self::find_record_place(
                &self.adapter,
                bucket,
                record,
                true,
                hash_by_record,
                probes,
            );
            return (bucket_index, j);
        }

        // no group with this key, so the record is absent
        (bucket_index, i)
    }

    /// Install a record known to be the first with its key, during resize.
    fn place_head(
        bucket: &mut Bucket<A::Record>,
        record: A::Record,
        hash_by_key: u64,
        probes: &mut u64,
    ) {
        let mut i = bucket.home(hash_by_key);
        while !bucket.slots[i].is_vacant() {
            *probes += 1;
            i = bucket.step(i);
        }
        bucket.slots[i] = Slot::head(hash_by_key, record);
        bucket.used += 1;
    }

    /// Install a record known to join an existing group, during resize.
    fn place_member(
        adapter: &A,
        bucket: &mut Bucket<A::Record>,
        record: A::Record,
        hash_by_key: u64,
        hash_by_record: u64,
        probes: &mut u64,
    ) {
        let head = Self::find_group_head(
            bucket,
            hash_by_key,
            |stored| adapter.records_share_key(&record, stored),
            probes,
        );
        debug_assert!(!bucket.slots[head].is_vacant());

        let mut j = bucket.home(hash_by_record);
        while !bucket.slots[j].is_vacant() {
            *probes += 1;
            j = bucket.step(j);
        }

        let head_next = bucket.slots[head].next;
        bucket.slots[j] = Slot {
            hash: hash_by_record,
            record: Some(record),
            prev: head,
            next: head_next,
        };
        bucket.slots[head].next = j;
        if head_next != INVALID_INDEX {
            bucket.slots[head_next].prev = j;
        }
        bucket.used += 1;
        bucket.collisions += 1;
    }

    /// Replace one bucket's slot array with a prime-sized larger one and
    /// re-insert its contents.
    ///
    /// Groups are re-inserted head first, then members from the tail back to
    /// the second element, so that splicing each member in right after the
    /// head restores the original list order. On allocation failure the
    /// bucket keeps its previous array.
    fn resize_bucket(&mut self, bucket_index: usize, requested: usize) -> Result<()> {
        // the floor keeps even a shrunken bucket large enough that the
        // growth trigger fires before it can ever fill completely
        let target = next_prime(requested.max(MIN_INITIAL_CAPACITY));
        let label = self.adapter.context();
        tracing::debug!(context = %label, slots = target, "resizing index bucket");
        let started = Instant::now();

        let fresh = Bucket::allocate_slots(target)?;
        self.telemetry.resizes.fetch_add(1, Ordering::Relaxed);

        let mut probes = 0u64;
        let Self {
            adapter,
            buckets,
            telemetry,
            ..
        } = self;
        let bucket = &mut buckets[bucket_index];
        let old = std::mem::replace(&mut bucket.slots, fresh);
        bucket.used = 0;
        bucket.collisions = 0;

        for j in 0..old.len() {
            if !old[j].is_head() {
                continue;
            }
            let hash_by_key = old[j].hash;
            Self::place_head(
                bucket,
                old[j].record.clone().unwrap(),
                hash_by_key,
                &mut probes,
            );

            let mut tail = j;
            while old[tail].next != INVALID_INDEX {
                tail = old[tail].next;
            }
            let mut k = tail;
            while k != j {
                Self::place_member(
                    adapter,
                    bucket,
                    old[k].record.clone().unwrap(),
                    hash_by_key,
                    old[k].hash,
                    &mut probes,
                );
                k = old[k].prev;
            }
        }
        telemetry.add_probes(probes);

        tracing::debug!(
            context = %label,
            slots = target,
            elapsed = ?started.elapsed(),
            "index bucket resized"
        );
        Ok(())
    }
}
