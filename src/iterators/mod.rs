//! Iterators over the recorded distribution of a histogram.
//!
//! All iterators share one engine, `HistogramIterator`, which walks the counts array in index
//! order and asks a `PickyIterator` strategy whether to yield at the current position. What
//! differs between them is only the picking rule.

use crate::storage::CountsStorage;
use crate::Histogram;

/// An iterator that iterates over histogram percentiles.
pub mod percentile;

/// An iterator that iterates linearly over histogram values.
pub mod linear;

/// An iterator that iterates logarithmically over histogram values.
pub mod log;

/// An iterator that iterates over recorded histogram values.
pub mod recorded;

/// An iterator that iterates over histogram values.
pub mod all;

/// Extra information about the picked point in the histogram provided by the picker.
pub struct PickMetadata {
    /// Supply the percentile iterated to in the last `pick()`, if the picker has a percentile
    /// of its own.
    percentile_iterated_to: Option<f64>,

    /// Supply the value iterated to in the last `pick()`, if the picker can supply a more useful
    /// value than the largest value represented by the bucket.
    value_iterated_to: Option<u64>,
}

impl PickMetadata {
    fn new(percentile_iterated_to: Option<f64>, value_iterated_to: Option<u64>) -> PickMetadata {
        PickMetadata {
            percentile_iterated_to,
            value_iterated_to,
        }
    }
}

/// A trait for designing an subset iterator over values in a `Histogram`.
pub trait PickyIterator {
    /// Return `Some` if an `IterationValue` should be emitted at this point.
    ///
    /// `index` is a valid index in the relevant histogram.
    ///
    /// This will be called with the same index until it returns `None`. This enables modes of
    /// iteration that pick different values represented by the same bucket, for instance.
    fn pick(
        &mut self,
        index: usize,
        total_count_to_index: u64,
        count_at_index: u64,
    ) -> Option<PickMetadata>;

    /// Should we keep iterating even though the last index with non-zero count has already been
    /// picked at least once?
    ///
    /// This will be called every time iteration reaches a new index that is past the last
    /// non-zero count.
    fn more(&mut self, index_to_pick: usize) -> bool;
}

/// `HistogramIterator` provides a base iterator for a `Histogram`.
///
/// It will iterate over all discrete values until there are no more recorded values (i.e. *not*
/// necessarily until all bins have been exhausted). To facilitate the development of more
/// sophisticated iterators, a *picker* is also provided, which is allowed to only select some bins
/// that should be yielded. The picker may also extend the iteration to include a suffix of empty
/// bins.
///
/// The iterator borrows the histogram, so it cannot be modified while an iteration is in progress.
pub struct HistogramIterator<'a, S: 'a + CountsStorage, P: PickyIterator> {
    hist: &'a Histogram<S>,
    total_count_to_index: u64,
    total_value_to_index: u64,
    prev_total_count_at_yield: u64,
    prev_value_iterated_to: u64,
    current_index: usize,
    fresh: bool,
    ended: bool,
    picker: P,
}

/// The value emitted at each step when iterating over a `Histogram`.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct IterationValue {
    value_iterated_to: u64,
    value_iterated_from: u64,
    count_at_value: u64,
    count_since_last_iteration: u64,
    total_count_to_value: u64,
    total_value_to_value: u64,
    percentile: f64,
    percentile_iterated_to: f64,
}

impl IterationValue {
    /// The value iterated to. Some iterators provide a specific value inside the bucket, while
    /// others just use the highest value in the bucket.
    pub fn value_iterated_to(&self) -> u64 {
        self.value_iterated_to
    }

    /// The value iterated to at the previous step, or 0 at the first step.
    pub fn value_iterated_from(&self) -> u64 {
        self.value_iterated_from
    }

    /// Percentile of samples that were at or below `value_iterated_to()`, in `[0, 100]`. Note
    /// that for iteration modes that pick a value that is not the top of a bucket, this may
    /// differ from `percentile_iterated_to()`.
    pub fn percentile(&self) -> f64 {
        self.percentile
    }

    /// Percentile level iterated to. Only percentile iteration sets this to something other than
    /// `percentile()`.
    pub fn percentile_iterated_to(&self) -> f64 {
        self.percentile_iterated_to
    }

    /// Recorded count for values equivalent to `value_iterated_to()`.
    pub fn count_at_value(&self) -> u64 {
        self.count_at_value
    }

    /// Number of samples added since the previous step.
    pub fn count_since_last_iteration(&self) -> u64 {
        self.count_since_last_iteration
    }

    /// Number of samples at or below the current bucket.
    pub fn total_count_to_value(&self) -> u64 {
        self.total_count_to_value
    }

    /// Sum of the highest equivalent values of all samples at or below the current bucket,
    /// saturating at `u64::max_value()`.
    pub fn total_value_to_value(&self) -> u64 {
        self.total_value_to_value
    }
}

impl<'a, S: CountsStorage, P: PickyIterator> HistogramIterator<'a, S, P> {
    fn new(h: &'a Histogram<S>, picker: P) -> HistogramIterator<'a, S, P> {
        HistogramIterator {
            hist: h,
            total_count_to_index: 0,
            total_value_to_index: 0,
            prev_total_count_at_yield: 0,
            prev_value_iterated_to: 0,
            current_index: 0,
            picker,
            fresh: true,
            ended: false,
        }
    }

    fn current(&self, metadata: PickMetadata, count_at_index: u64) -> IterationValue {
        let value_iterated_to = metadata.value_iterated_to.unwrap_or_else(|| {
            self.hist
                .highest_equivalent(self.hist.value_for(self.current_index))
        });
        let percentile = if self.hist.len() == 0 {
            0.0
        } else {
            100.0 * self.total_count_to_index as f64 / self.hist.len() as f64
        };

        IterationValue {
            value_iterated_to,
            value_iterated_from: self.prev_value_iterated_to,
            count_at_value: count_at_index,
            count_since_last_iteration: self.total_count_to_index - self.prev_total_count_at_yield,
            total_count_to_value: self.total_count_to_index,
            total_value_to_value: self.total_value_to_index,
            percentile,
            percentile_iterated_to: metadata.percentile_iterated_to.unwrap_or(percentile),
        }
    }
}

impl<'a, S: 'a, P> Iterator for HistogramIterator<'a, S, P>
where
    S: CountsStorage,
    P: PickyIterator,
{
    type Item = IterationValue;
    fn next(&mut self) -> Option<Self::Item> {
        // We iterate over the indices of the counts array, but most of those (especially towards
        // the end) are zero and are not worth yielding. So we iterate until we reach the total
        // *count*, and past that only for as long as the picker's `more()` asks for it.
        if self.ended {
            return None;
        }

        if self.total_count_to_index >= self.hist.len() && !self.picker.more(self.current_index) {
            self.ended = true;
            return None;
        }

        while self.current_index < self.hist.distinct_values() {
            let count = self.hist.count_at_index(self.current_index).unwrap_or(0);

            if self.fresh {
                // maintain totals so we can yield percentiles
                self.total_count_to_index = self.total_count_to_index.saturating_add(count);
                let value = self
                    .hist
                    .highest_equivalent(self.hist.value_for(self.current_index));
                self.total_value_to_index = self
                    .total_value_to_index
                    .saturating_add(count.saturating_mul(value));

                // make sure we don't add this index again
                self.fresh = false;
            }

            // figure out if picker thinks we should yield this value
            if let Some(metadata) =
                self.picker
                    .pick(self.current_index, self.total_count_to_index, count)
            {
                let val = self.current(metadata, count);

                // note that we *don't* increment self.current_index here. the picker will be
                // exposed to the same value again after yielding.
                self.prev_total_count_at_yield = self.total_count_to_index;
                self.prev_value_iterated_to = val.value_iterated_to;
                return Some(val);
            }

            // check the next entry
            self.current_index += 1;
            self.fresh = true;
        }

        self.ended = true;
        None
    }
}
