//! Sparse counts storage.
//!
//! `PackedStorage` stores each 64-bit count as 8 independent bytes, one per byte plane, and keeps
//! each plane in its own radix trie keyed by 4-bit nibbles of the index. A plane only allocates
//! nodes along the paths to indexes where that plane's byte is non-zero, so a histogram with a huge
//! value range and few distinct recorded values costs a small fraction of a dense array, and small
//! counts never pay for their empty high bytes.
//!
//! Lookups cost one short tree walk per plane. That makes recording and iteration noticeably
//! slower than `DenseStorage`; choose packed storage when memory matters more than speed.
//!
//! ```
//! use hdrpack::{CountsStorage, PackedStorage};
//!
//! let mut counts = PackedStorage::with_len(1 << 20);
//! counts.add(123_456, 300).unwrap();
//! assert_eq!(Some(300), counts.get(123_456));
//! assert_eq!(Some(0), counts.get(123_457));
//! ```

use super::{out_of_range, CountsStorage};
use crate::errors::StorageError;

mod bits;
mod context;

use self::context::PackedArrayContext;

/// Counts held in a packed, sparse array of byte-plane tries.
#[derive(Clone, Debug)]
pub struct PackedStorage {
    context: PackedArrayContext,
}

impl PackedStorage {
    /// Current depth parameter of the tries: the index shift handled by the top level.
    pub fn top_level_shift(&self) -> u32 {
        self.context.top_level_shift()
    }

    /// Number of 8-byte leaves allocated across all planes.
    pub fn allocated_leaves(&self) -> usize {
        self.context.leaf_count()
    }

    #[inline]
    fn check_index(&self, index: usize) -> Result<(), StorageError> {
        let len = self.context.virtual_length();
        if index < len {
            Ok(())
        } else {
            Err(out_of_range(index, len))
        }
    }
}

impl CountsStorage for PackedStorage {
    fn with_len(len: usize) -> Self {
        PackedStorage {
            context: PackedArrayContext::new(len),
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.context.virtual_length()
    }

    #[inline]
    fn get(&self, index: usize) -> Option<u64> {
        if index < self.context.virtual_length() {
            Some(self.context.get(index))
        } else {
            None
        }
    }

    fn set(&mut self, index: usize, count: u64) -> Result<(), StorageError> {
        self.check_index(index)?;
        self.context.set(index, count);
        Ok(())
    }

    fn add(&mut self, index: usize, delta: u64) -> Result<(), StorageError> {
        self.check_index(index)?;
        if delta == 0 {
            return Ok(());
        }
        self.context
            .get(index)
            .checked_add(delta)
            .ok_or(StorageError::CountOverflow)?;
        self.context.add(index, delta);
        Ok(())
    }

    fn resize(&mut self, new_len: usize) {
        self.context.set_virtual_length(new_len);
    }

    fn clear(&mut self) {
        self.context.clear();
    }

    fn max_count(&self) -> u64 {
        u64::max_value()
    }

    fn estimated_footprint_bytes(&self) -> usize {
        self.context.estimated_footprint_bytes()
    }
}
