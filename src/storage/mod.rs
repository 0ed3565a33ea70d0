//! Counts storage backends.
//!
//! A histogram keeps one count per distinct bucket/sub-bucket slot. How those counts are held in
//! memory is up to the `CountsStorage` implementation: `DenseStorage` is a plain `Vec` of some
//! `Counter` word, while `PackedStorage` keeps a sparse radix trie that only allocates for the
//! byte planes of non-zero counts.
//!
//! Both behave identically as seen through the histogram: a logical array of `u64` counts that
//! can grow but never shrinks.

use crate::errors::StorageError;
use std::fmt;

mod dense;
pub mod packed;

pub use self::dense::DenseStorage;
pub use self::packed::PackedStorage;

/// A logical `index -> count` array backing a histogram.
pub trait CountsStorage: Clone + fmt::Debug {
    /// Create storage for `len` counts, all zero.
    fn with_len(len: usize) -> Self;

    /// The number of counts this storage can address.
    fn len(&self) -> usize;

    /// Returns true if the storage cannot address any counts.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The count at `index`, or `None` if `index` is out of range.
    fn get(&self, index: usize) -> Option<u64>;

    /// Overwrite the count at `index`.
    ///
    /// Fails without changing anything if the index is out of range or the count does not fit.
    fn set(&mut self, index: usize, count: u64) -> Result<(), StorageError>;

    /// Add `delta` to the count at `index`.
    ///
    /// Fails without changing anything if the index is out of range or the sum does not fit.
    fn add(&mut self, index: usize, delta: u64) -> Result<(), StorageError>;

    /// Add one to the count at `index`.
    fn increment(&mut self, index: usize) -> Result<(), StorageError> {
        self.add(index, 1)
    }

    /// Grow to `new_len` counts. Existing counts stay at their indices. A length at or below the
    /// current one is a no-op.
    fn resize(&mut self, new_len: usize);

    /// Set every count to zero, keeping the length.
    fn clear(&mut self);

    /// The largest count a single slot can hold.
    fn max_count(&self) -> u64;

    /// Estimate of the heap memory held by this storage, in bytes.
    fn estimated_footprint_bytes(&self) -> usize;
}

#[inline]
fn out_of_range(index: usize, len: usize) -> StorageError {
    StorageError::IndexOutOfRange { index, len }
}
