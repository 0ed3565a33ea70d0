use super::{out_of_range, CountsStorage};
use crate::core::counter::Counter;
use crate::errors::StorageError;
use std::mem;

/// Counts held directly in a `Vec` of `T`.
///
/// The choice of `T` trades memory for headroom: a `u8` slot overflows after 255 samples of the
/// same value, a `u64` slot practically never does.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseStorage<T: Counter> {
    counts: Vec<T>,
}

impl<T: Counter> DenseStorage<T> {
    /// The raw counts.
    pub fn as_slice(&self) -> &[T] {
        &self.counts
    }
}

impl<T: Counter> CountsStorage for DenseStorage<T> {
    fn with_len(len: usize) -> Self {
        DenseStorage {
            counts: vec![T::zero(); len],
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    fn get(&self, index: usize) -> Option<u64> {
        self.counts.get(index).map(|c| c.as_u64())
    }

    fn set(&mut self, index: usize, count: u64) -> Result<(), StorageError> {
        let len = self.counts.len();
        let word = T::from_u64(count).ok_or(StorageError::CountOverflow)?;
        let slot = self
            .counts
            .get_mut(index)
            .ok_or_else(|| out_of_range(index, len))?;
        *slot = word;
        Ok(())
    }

    #[inline]
    fn add(&mut self, index: usize, delta: u64) -> Result<(), StorageError> {
        let len = self.counts.len();
        let delta = T::from_u64(delta).ok_or(StorageError::CountOverflow)?;
        let slot = self
            .counts
            .get_mut(index)
            .ok_or_else(|| out_of_range(index, len))?;
        *slot = slot.checked_add(&delta).ok_or(StorageError::CountOverflow)?;
        Ok(())
    }

    fn resize(&mut self, new_len: usize) {
        if new_len > self.counts.len() {
            self.counts.resize(new_len, T::zero());
        }
    }

    fn clear(&mut self) {
        for c in &mut self.counts {
            *c = T::zero();
        }
    }

    fn max_count(&self) -> u64 {
        T::max_value().as_u64()
    }

    fn estimated_footprint_bytes(&self) -> usize {
        self.counts.capacity() * mem::size_of::<T>()
    }
}
