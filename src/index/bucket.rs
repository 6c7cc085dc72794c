//! One open-addressed shard of the multi-valued index.
//!
//! A bucket owns an independently sized slot array plus two counters: `used`
//! (occupied slots) and `collisions` (occupied slots that are not group
//! heads, i.e. records whose key was already present). Buckets never
//! rebalance against each other (a record's bucket is fixed by the low bits
//! of its key hash for the lifetime of the index), so each bucket can grow
//! and heal on its own.
//!
//! The bucket layer is purely mechanical: stepping the probe cursor, moving
//! and invalidating slots, and healing the hole a deletion leaves behind.
//! Hash computation and equality decisions stay with the index orchestrator.

use crate::error::{IndexError, Result};
use crate::index::slot::{Slot, INVALID_INDEX};

/// An independently sized open-addressed slot array.
#[derive(Debug)]
pub(crate) struct Bucket<R> {
    /// The slot array. Its length is the bucket capacity, kept near a prime.
    pub slots: Vec<Slot<R>>,

    /// Number of occupied slots.
    pub used: usize,

    /// Number of occupied slots that are not group heads.
    pub collisions: usize,
}

impl<R> Bucket<R> {
    /// Create a bucket with `capacity` free slots.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Ok(Self {
            slots: Self::allocate_slots(capacity)?,
            used: 0,
            collisions: 0,
        })
    }

    /// Allocate a fresh array of `capacity` free slots.
    ///
    /// Allocation failure is reported instead of aborting, so resize can
    /// leave the previous array in place.
    pub fn allocate_slots(capacity: usize) -> Result<Vec<Slot<R>>> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| IndexError::out_of_memory(capacity))?;
        slots.resize_with(capacity, Slot::vacant);
        Ok(slots)
    }

    /// Number of slots in this bucket.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Advance a probe cursor by one slot, wrapping at the end of the array.
    #[inline]
    pub fn step(&self, i: usize) -> usize {
        let next = i + 1;
        if next == self.slots.len() {
            0
        } else {
            next
        }
    }

    /// The home position of a hash in this bucket.
    #[inline]
    pub fn home(&self, hash: u64) -> usize {
        (hash % self.slots.len() as u64) as usize
    }

    /// Reset slot `i` to the free state.
    #[inline]
    pub fn invalidate(&mut self, i: usize) {
        self.slots[i] = Slot::vacant();
    }

    /// Move the entry at `from` into `to`, rewiring its list neighbors.
    ///
    /// `to` must not be referenced by any linked list. `from` may be any
    /// member of a list. The hole left at `from` is not healed here.
    pub fn move_entry(&mut self, from: usize, to: usize) {
        let entry = std::mem::replace(&mut self.slots[from], Slot::vacant());
        let (prev, next) = (entry.prev, entry.next);
        self.slots[to] = entry;
        if prev != INVALID_INDEX {
            self.slots[prev].next = to;
        }
        if next != INVALID_INDEX {
            self.slots[next].prev = to;
        }
    }

    /// Heal the hole left after emptying slot `hole`.
    ///
    /// Walks forward from the hole. Every occupied slot whose probe chain
    /// from its home position would now be broken by the hole is moved into
    /// the hole, opening a new hole further along; the walk ends at the
    /// first free slot. Homes are computed from the cached hashes, which by
    /// invariant hold the key hash for heads and the full-record hash for
    /// members, which is exactly the hash that governed each slot's
    /// placement.
    pub fn heal_hole(&mut self, mut hole: usize) {
        let mut j = self.step(hole);
        while !self.slots[j].is_vacant() {
            let home = self.home(self.slots[j].hash);
            if !is_between(hole, home, j) {
                self.move_entry(j, hole);
                hole = j;
            }
            j = self.step(j);
        }
    }

    /// Bytes occupied by this bucket's slot array.
    pub fn memory_usage(&self) -> usize {
        self.slots.len() * std::mem::size_of::<Slot<R>>()
    }
}

/// Whether `x` lies behind `from` and at or before `to` in cyclic order.
///
/// `x == from` is never between; `from == to` means everything else is.
#[inline]
fn is_between(from: usize, x: usize, to: usize) -> bool {
    if from < to {
        from < x && x <= to
    } else {
        x > from || x <= to
    }
}
