//! Error types for the multi-valued index.
//!
//! Index operations are infallible in steady state; errors only arise when a
//! slot array has to be (re)allocated. A failed resize leaves the affected
//! bucket at its previous capacity, so the index stays fully usable.

use std::fmt;

/// Result type for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors that can occur while constructing or resizing an index.
#[derive(Debug)]
pub enum IndexError {
    /// A slot array could not be allocated.
    OutOfMemory {
        /// Number of slots the failed allocation asked for.
        requested_slots: usize,
    },

    /// A requested resize cannot hold the entries already stored under the
    /// load-factor rule.
    ResizeTooSmall {
        /// Per-bucket slot count the resize would have produced.
        requested_slots: usize,
        /// Number of entries currently stored in the bucket.
        used: usize,
    },
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::OutOfMemory { requested_slots } => {
                write!(f, "failed to allocate {} index slots", requested_slots)
            }
            IndexError::ResizeTooSmall {
                requested_slots,
                used,
            } => {
                write!(
                    f,
                    "requested capacity of {} slots cannot hold {} stored entries",
                    requested_slots, used
                )
            }
        }
    }
}

impl std::error::Error for IndexError {}

impl IndexError {
    /// Create an out-of-memory error.
    pub fn out_of_memory(requested_slots: usize) -> Self {
        IndexError::OutOfMemory { requested_slots }
    }

    /// Create a resize-too-small error.
    pub fn resize_too_small(requested_slots: usize, used: usize) -> Self {
        IndexError::ResizeTooSmall {
            requested_slots,
            used,
        }
    }
}
