//! hdrpack is an implementation of Gil Tene's High Dynamic Range histogram with pluggable counts
//! storage. It records sampled integer values across a large, configurable range with configurable
//! precision within that range, and answers percentile and distribution queries over what was
//! recorded. The resulting "HDR" histogram allows for fast and accurate analysis of the extreme
//! ranges of data with non-normal distributions, like latency.
//!
//! # HdrHistogram
//!
//! What follows is a description from [the HdrHistogram
//! website](https://hdrhistogram.github.io/HdrHistogram/).
//!
//! HdrHistogram supports the recording and analyzing of sampled data value counts across a
//! configurable integer value range with configurable value precision within the range. Value
//! precision is expressed as the number of significant digits in the value recording, and provides
//! control over value quantization behavior across the value range and the subsequent value
//! resolution at any given level.
//!
//! For example, a Histogram could be configured to track the counts of observed integer values
//! between 0 and 3,600,000,000 while maintaining a value precision of 3 significant digits across
//! that range. Value quantization within the range will thus be no larger than 1/1,000th (or 0.1%)
//! of any value. This example Histogram could be used to track and analyze the counts of observed
//! response times ranging between 1 microsecond and 1 hour in magnitude, while maintaining a value
//! resolution of 1 microsecond up to 1 millisecond, a resolution of 1 millisecond (or better) up
//! to one second, and a resolution of 1 second (or better) up to 1,000 seconds. At its maximum
//! tracked value (1 hour), it would still maintain a resolution of 3.6 seconds (or better).
//!
//! # Storage
//!
//! Every histogram keeps one count per distinct equivalent value range. Where those counts live is
//! decided by the storage type parameter:
//!
//!  - `DenseStorage<T>` is a `Vec<T>` for any `Counter` word (`u8`, `u16`, `u32`, `u64`). It is
//!    the fastest option, and the narrower words trade headroom for memory.
//!  - `PackedStorage` is a sparse radix trie over the byte planes of 64-bit counts. It allocates
//!    only for non-zero bytes, which makes wide-range histograms with few distinct values cheap to
//!    keep around (for instance, many histograms held for later merging).
//!
//! `DenseHistogram<T>` and `PackedHistogram` name the two common choices.
//!
//! # Recording samples
//!
//! A histogram is created with `new`, `new_with_max`, or `new_with_bounds`. `new` only sets the
//! required precision and leaves the range open: the histogram resizes itself when a value above
//! its current range is recorded. `new_with_max` sets an upper bound and disables resizing, so
//! recording a larger value fails. `new_with_bounds` additionally raises the lowest discernible
//! value, shrinking the range that must be covered.
//!
//! ```
//! use hdrpack::DenseHistogram;
//! let mut hist = DenseHistogram::<u64>::new_with_bounds(1, 60 * 60 * 1000, 2).unwrap();
//!
//! // samples can be recorded using .record, which will error if the value is too small or large
//! hist.record(54321).expect("value 54321 should be in range");
//!
//! // for ergonomics, samples can also be recorded with +=
//! // this call will panic if the value is out of range!
//! hist += 54321;
//!
//! // if the code that generates the values is subject to Coordinated Omission,
//! // the self-correcting record method should be used instead.
//! // for example, if the expected sampling interval is 10 msec:
//! hist.record_correct(54321, 10).expect("value 54321 should be in range");
//! ```
//!
//! # Querying samples
//!
//! ```
//! use hdrpack::PackedHistogram;
//! let mut hist = PackedHistogram::new(2).unwrap();
//! hist.record_n(1_000, 3).unwrap();
//! hist.record(2_000_000).unwrap();
//!
//! println!("# of samples: {}", hist.len());
//! println!("99.9'th percentile: {}", hist.value_at_percentile(99.9));
//!
//! for v in hist.iter_recorded() {
//!     println!("{}'th percentile of data is {} with {} samples",
//!         v.percentile(), v.value_iterated_to(), v.count_at_value());
//! }
//! ```
//!
//! # Merging
//!
//! Histograms of any storage and any precision can be added to and subtracted from each other.
//! Both operations check every affected count first, so a failed merge leaves the target as it
//! was.
//!
//! # Serialization
//!
//! With the default `serialization` feature, the `serialization` module reads and writes the
//! compact V2 binary format (optionally zlib-compressed and base64-encoded) shared with the other
//! HdrHistogram implementations.

#![warn(missing_docs)]
#![cfg_attr(feature = "bench_private", feature(test))]
#[cfg(all(test, feature = "bench_private"))]
extern crate test;

use std::borrow::Borrow;
use std::cmp;
use std::collections::BTreeMap;
use std::ops::{AddAssign, SubAssign};

use tracing::debug;

pub mod core;
pub mod errors;
pub mod iterators;
pub mod storage;

mod config;
mod output;

#[cfg(feature = "serialization")]
pub mod serialization;

pub use crate::config::HistogramConfig;
pub use crate::core::counter::Counter;
pub use crate::errors::*;
pub use crate::output::HistogramSummary;
pub use crate::storage::{CountsStorage, DenseStorage, PackedStorage};

/// Tag reported by histograms that were never given one.
pub const NO_TAG: &str = "NO TAG";

/// A histogram whose counts are kept in a plain `Vec` of `T`.
pub type DenseHistogram<T = u64> = Histogram<DenseStorage<T>>;

/// A histogram whose counts are kept in a sparse packed array.
pub type PackedHistogram = Histogram<PackedStorage>;

/// `Histogram` is the core data structure in hdrpack. It records values, and performs analytics.
///
/// At its heart, it keeps the count for recorded samples in "buckets" of values. The resolution
/// and distribution of these buckets is tuned based on the desired highest trackable value, as
/// well as the user-specified number of significant decimal digits to preserve. The values for the
/// buckets are kept in a way that resembles floats and doubles: there is a mantissa and an
/// exponent, and each bucket represents a different exponent. The "sub-buckets" within a bucket
/// represent different values for the mantissa.
///
/// To a first approximation, the sub-buckets of the first bucket would hold the values `0`, `1`,
/// `2`, `3`, …, the sub-buckets of the second bucket would hold `0`, `2`, `4`, `6`, …, the third
/// would hold `0`, `4`, `8`, and so on. However, the low half of each bucket (except bucket 0) is
/// unnecessary, since those values are already covered by the sub-buckets of all the preceeding
/// buckets. Thus, `Histogram` keeps the top half of every such bucket.
///
/// For the purposes of explanation, consider a `Histogram` with 2048 sub-buckets for every bucket,
/// and a lowest discernible value of 1:
///
/// <pre>
/// The 0th bucket covers 0...2047 in multiples of 1, using all 2048 sub-buckets
/// The 1st bucket covers 2048..4097 in multiples of 2, using only the top 1024 sub-buckets
/// The 2nd bucket covers 4096..8191 in multiple of 4, using only the top 1024 sub-buckets
/// ...
/// </pre>
///
/// Bucket 0 is "special" here. It is the only one that has 2048 entries. All the rest have
/// 1024 entries (because their bottom half overlaps with and is already covered by the all of
/// the previous buckets put together). In other words, the `k`'th bucket could represent `0 *
/// 2^k` to `2048 * 2^k` in 2048 buckets with `2^k` precision, but the midpoint of `1024 * 2^k
/// = 2048 * 2^(k-1)`, which is the k-1'th bucket's end. So, we would use the previous bucket
/// for those lower values as it has better precision.
#[derive(Debug, Clone)]
pub struct Histogram<S: CountsStorage = DenseStorage<u64>> {
    auto_resize: bool,

    // >= 2 * lowest_discernible_value
    highest_trackable_value: u64,
    // >= 1
    lowest_discernible_value: u64,
    // in [0, 5]
    significant_value_digits: u8,

    // in [1, 64]
    bucket_count: u8,
    // 2^(sub_bucket_half_count_magnitude + 1) = [2, 2^18]
    sub_bucket_count: u32,
    // sub_bucket_count / 2 = [1, 2^17]
    sub_bucket_half_count: u32,
    // [0, 17]
    sub_bucket_half_count_magnitude: u8,
    // The bottom sub bucket's bits set, shifted by unit magnitude.
    // The highest bit will be (one-indexed) sub bucket count magnitude + unit_magnitude.
    sub_bucket_mask: u64,

    // Number of leading zeros that would be used by the largest value in bucket 0.
    // in [1, 63]
    leading_zero_count_base: u8,

    // Largest exponent of 2 that's smaller than the lowest discernible value. In [0, 62].
    unit_magnitude: u8,
    // low unit_magnitude bits set
    unit_magnitude_mask: u64,

    // Stored with the unit mask or'ed in so that max() can report the top of the range.
    max_value: u64,
    // Stored with the unit mask cleared.
    min_non_zero_value: u64,

    total_count: u64,
    counts: S,

    start_timestamp: Option<u64>,
    end_timestamp: Option<u64>,
    tag: Option<String>,
}

pub use crate::iterators::IterationValue;

// max_value sentinel: nothing recorded
const ORIGINAL_MAX: u64 = 0;
// min_non_zero_value sentinel: nothing above the first unit recorded
const ORIGINAL_MIN: u64 = u64::max_value();

impl<S: CountsStorage> Histogram<S> {
    // ********************************************************************************************
    // Histogram administrative read-outs
    // ********************************************************************************************

    /// Get the current number of distinct values that can be represented in the histogram.
    pub fn distinct_values(&self) -> usize {
        self.counts.len()
    }

    /// Get the lowest discernible value for the histogram in its current configuration.
    pub fn low(&self) -> u64 {
        self.lowest_discernible_value
    }

    /// Get the highest trackable value for the histogram in its current configuration.
    pub fn high(&self) -> u64 {
        self.highest_trackable_value
    }

    /// Get the number of significant value digits kept by this histogram.
    pub fn sigfig(&self) -> u8 {
        self.significant_value_digits
    }

    /// Get the total number of samples recorded.
    pub fn len(&self) -> u64 {
        self.total_count
    }

    /// Returns true if this histogram has no recorded values.
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }

    /// Get the number of buckets used by the histogram to cover the highest trackable value.
    ///
    /// This method differs from `.len()` in that it does not count the sub buckets within each
    /// bucket.
    ///
    /// This method is probably only useful for testing purposes.
    pub fn buckets(&self) -> u8 {
        self.bucket_count
    }

    /// Get the number of sub buckets in every bucket.
    pub fn sub_buckets(&self) -> u32 {
        self.sub_bucket_count
    }

    /// Returns true if this histogram is currently able to auto-resize as new samples are recorded.
    pub fn is_auto(&self) -> bool {
        self.auto_resize
    }

    /// Read-only access to the counts storage.
    pub fn storage(&self) -> &S {
        &self.counts
    }

    /// The construction parameters of this histogram in its current configuration.
    pub fn config(&self) -> HistogramConfig {
        HistogramConfig {
            lowest_discernible_value: self.lowest_discernible_value,
            highest_trackable_value: self.highest_trackable_value,
            significant_value_digits: self.significant_value_digits,
            auto_resize: self.auto_resize,
        }
    }

    /// Estimate of the memory held by this histogram, in bytes.
    pub fn estimated_footprint(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.counts.estimated_footprint_bytes()
            + self.tag.as_ref().map_or(0, |t| t.capacity())
    }

    // ********************************************************************************************
    // Methods for looking up the count for a given value/index
    // ********************************************************************************************

    /// Find the bucket the given value should be placed in.
    /// Returns `None` if the corresponding index cannot be represented in the current counts
    /// array.
    pub fn index_for(&self, value: u64) -> Option<usize> {
        let index = self.raw_index_for(value);
        if index < self.counts.len() {
            Some(index)
        } else {
            None
        }
    }

    /// Find the bucket the given value should be placed in.
    /// If the value is bigger than what this histogram can express, the last valid bucket index
    /// is returned instead.
    fn index_for_or_last(&self, value: u64) -> usize {
        self.index_for(value).unwrap_or_else(|| self.last_index())
    }

    /// Get the count of recorded values at a specific value (to within the histogram resolution at
    /// the value level).
    ///
    /// The count is computed across values recorded with any value that is equivalent to the
    /// given value. Values beyond the current range report the count of the last bucket.
    pub fn count_at(&self, value: u64) -> u64 {
        self.counts.get(self.index_for_or_last(value)).unwrap_or(0)
    }

    /// Get the count of recorded values at a specific index, or `None` if the index is beyond the
    /// counts array.
    pub fn count_at_index(&self, index: usize) -> Option<u64> {
        self.counts.get(index)
    }

    /// Overwrite the count at `index` without touching the total or the min/max tracking. Callers
    /// are expected to restat afterwards.
    pub(crate) fn set_count_at_index(&mut self, index: usize, count: u64) -> Result<(), StorageError> {
        self.counts.set(index, count)
    }

    /// Disable or enable automatic resizing of the histogram when a value above the current range
    /// is recorded.
    pub fn auto(&mut self, enabled: bool) {
        self.auto_resize = enabled;
    }

    // ********************************************************************************************
    // Metadata
    // ********************************************************************************************

    /// Start of the recording period, in milliseconds since the epoch, if one was set.
    pub fn start_timestamp(&self) -> Option<u64> {
        self.start_timestamp
    }

    /// Set the start of the recording period, in milliseconds since the epoch.
    pub fn set_start_timestamp(&mut self, millis: u64) {
        self.start_timestamp = Some(millis);
    }

    /// End of the recording period, in milliseconds since the epoch, if one was set.
    pub fn end_timestamp(&self) -> Option<u64> {
        self.end_timestamp
    }

    /// Set the end of the recording period, in milliseconds since the epoch.
    pub fn set_end_timestamp(&mut self, millis: u64) {
        self.end_timestamp = Some(millis);
    }

    /// The tag of this histogram, or `NO_TAG` if none was set.
    pub fn tag(&self) -> &str {
        self.tag.as_ref().map_or(NO_TAG, |t| t.as_str())
    }

    /// Label this histogram.
    pub fn set_tag<T: Into<String>>(&mut self, tag: T) {
        self.tag = Some(tag.into());
    }

    // ********************************************************************************************
    // Histograms should be cloneable.
    // ********************************************************************************************

    /// Get a copy of this histogram, corrected for coordinated omission.
    ///
    /// To compensate for the loss of sampled values when a recorded value is larger than the
    /// expected interval between value samples, the new histogram will include an auto-generated
    /// additional series of decreasingly-smaller (down to the `interval`) value records for each
    /// count found in the current histogram that is larger than the `interval`.
    ///
    /// Note: This is a post-correction method, as opposed to the at-recording correction method
    /// provided by `record_correct`. The two methods are mutually exclusive, and only one of the
    /// two should be be used on a given data set to correct for the same coordinated omission
    /// issue.
    ///
    /// See notes in the description of the Histogram calls for an illustration of why this
    /// corrective behavior is important.
    ///
    /// If `interval` is larger than 0, add auto-generated value records as appropriate if value is
    /// larger than `interval`.
    ///
    /// Returns an error if the corrected counts do not fit this histogram's storage words or
    /// overflow the total count.
    pub fn clone_correct(&self, interval: u64) -> Result<Histogram<S>, RecordError> {
        let mut h = Histogram::new_from(self);
        h.add_correct(self, interval)?;
        Ok(h)
    }

    /// Overwrite this histogram with the given histogram. All data and statistics in this
    /// histogram will be overwritten.
    pub fn set_to<O: CountsStorage, B: Borrow<Histogram<O>>>(
        &mut self,
        source: B,
    ) -> Result<(), AdditionError> {
        self.reset();
        self.add(source.borrow())
    }

    /// Overwrite this histogram with the given histogram while correcting for coordinated
    /// omission. All data and statistics in this histogram will be overwritten. See
    /// `clone_correct` for more detailed explanation about how correction is applied
    pub fn set_to_corrected<O: CountsStorage, B: Borrow<Histogram<O>>>(
        &mut self,
        source: B,
        interval: u64,
    ) -> Result<(), RecordError> {
        self.reset();
        self.add_correct(source.borrow(), interval)
    }

    // ********************************************************************************************
    // Add and subtract methods for, well, adding or subtracting two histograms
    // ********************************************************************************************

    /// Add the contents of another histogram to this one.
    ///
    /// Returns an error if values in the other histogram cannot be stored; see `AdditionError`.
    /// Every affected count is checked before anything is changed, so on error this histogram is
    /// left exactly as it was.
    ///
    /// If the other histogram has the same bucket layout, counts are added index by index.
    /// Otherwise each recorded value of the other histogram is re-mapped into this histogram's
    /// layout, which is slower and subject to this histogram's precision.
    ///
    /// The start and end timestamps of this histogram are widened to include the other's.
    pub fn add<O: CountsStorage>(&mut self, source: &Histogram<O>) -> Result<(), AdditionError> {
        let new_total = self
            .total_count
            .checked_add(source.total_count)
            .ok_or(AdditionError::CountOverflow)?;

        let deltas = self.deltas_from(source);
        let needs_growth = deltas
            .last()
            .map_or(false, |&(index, _)| index >= self.counts.len());
        if needs_growth && !self.auto_resize {
            return Err(AdditionError::OtherAddendValueExceedsRange);
        }

        let max_count = self.counts.max_count();
        for &(index, delta) in &deltas {
            let current = self.counts.get(index).unwrap_or(0);
            match current.checked_add(delta) {
                Some(sum) if sum <= max_count => {}
                _ => return Err(AdditionError::CountOverflow),
            }
        }

        if let Some(&(top_index, _)) = deltas.last() {
            if needs_growth {
                let top_value = self.value_for(top_index);
                self.grow_to_cover(top_value)
                    .map_err(|_| AdditionError::ResizeFailedUsizeTypeTooSmall)?;
            }
        }

        for &(index, delta) in &deltas {
            self.counts
                .add(index, delta)
                .map_err(|_| AdditionError::OtherAddendValueExceedsRange)?;
            let value = self.value_for(index);
            self.update_min_max(value);
        }
        self.total_count = new_total;

        self.start_timestamp = match (self.start_timestamp, source.start_timestamp) {
            (Some(a), Some(b)) => Some(cmp::min(a, b)),
            (a, b) => a.or(b),
        };
        self.end_timestamp = match (self.end_timestamp, source.end_timestamp) {
            (Some(a), Some(b)) => Some(cmp::max(a, b)),
            (a, b) => a.or(b),
        };

        Ok(())
    }

    /// Add the contents of another histogram to this one, while correcting for coordinated
    /// omission.
    ///
    /// To compensate for the loss of sampled values when a recorded value is larger than the
    /// expected interval between value samples, the values added will include an auto-generated
    /// additional series of decreasingly-smaller (down to the given `interval`) value records for
    /// each count found in the current histogram that is larger than `interval`.
    ///
    /// Note: This is a post-recording correction method, as opposed to the at-recording correction
    /// method provided by `record_correct`. The two methods are mutually exclusive, and only one of
    /// the two should be be used on a given data set to correct for the same coordinated omission
    /// issue.
    ///
    /// All corrected counts are checked before any is added; on error this histogram is unchanged.
    pub fn add_correct<O: CountsStorage>(
        &mut self,
        source: &Histogram<O>,
        interval: u64,
    ) -> Result<(), RecordError> {
        let mut cells = BTreeMap::new();
        let mut added: u64 = 0;
        for v in source.iter_recorded() {
            let n = self.plan_correct(
                v.value_iterated_to(),
                v.count_at_value(),
                interval,
                &mut cells,
            )?;
            added = added.checked_add(n).ok_or(RecordError::CountOverflow)?;
        }
        self.commit_cells(&cells, added)
    }

    /// Subtract the contents of another histogram from this one.
    ///
    /// Every count is checked before any is changed: if any count in the other histogram exceeds
    /// the corresponding count here, or the other histogram holds values beyond this histogram's
    /// range, nothing is subtracted and an error is returned. See `SubtractionError`.
    ///
    /// Subtraction never resizes. When the cells holding the minimum or maximum drop to zero,
    /// both are recomputed with a full scan of the counts.
    pub fn subtract<O: CountsStorage>(
        &mut self,
        subtrahend: &Histogram<O>,
    ) -> Result<(), SubtractionError> {
        let deltas = self.deltas_from(subtrahend);

        let len = self.counts.len();
        let mut removed: u64 = 0;
        for &(index, delta) in &deltas {
            if index >= len {
                // cells beyond our range are zero, so a resizable histogram just lacks the counts
                return Err(if self.auto_resize {
                    SubtractionError::SubtrahendCountExceedsMinuendCount
                } else {
                    SubtractionError::SubtrahendValueExceedsMinuendRange
                });
            }
            if self.counts.get(index).unwrap_or(0) < delta {
                return Err(SubtractionError::SubtrahendCountExceedsMinuendCount);
            }
            // bounded by our own total
            removed += delta;
        }

        for &(index, delta) in &deltas {
            let current = self.counts.get(index).unwrap_or(0);
            self.counts
                .set(index, current - delta)
                .map_err(|_| SubtractionError::SubtrahendValueExceedsMinuendRange)?;
        }
        self.total_count = self.total_count.saturating_sub(removed);

        if self.count_at(self.max()) == 0 || self.count_at(self.min_nz()) == 0 {
            self.establish_internal_tracking_values();
        }

        Ok(())
    }

    /// Counts of `source` that are non-zero, as `(index in self, count)` pairs sorted by index.
    ///
    /// With a matching layout the indexes carry over directly. Otherwise each non-zero cell is
    /// mapped by its lowest equivalent value, and cells of `source` that land in the same cell
    /// here are summed.
    fn deltas_from<O: CountsStorage>(&self, source: &Histogram<O>) -> Vec<(usize, u64)> {
        let nonzero = (0..source.counts.len()).filter_map(|i| match source.counts.get(i) {
            Some(count) if count > 0 => Some((i, count)),
            _ => None,
        });

        if self.sub_bucket_count == source.sub_bucket_count
            && self.unit_magnitude == source.unit_magnitude
        {
            nonzero.collect()
        } else {
            let mut merged: BTreeMap<usize, u64> = BTreeMap::new();
            for (i, count) in nonzero {
                let target = self.raw_index_for(source.value_for(i));
                let slot = merged.entry(target).or_insert(0);
                *slot = slot.saturating_add(count);
            }
            merged.into_iter().collect()
        }
    }

    // ********************************************************************************************
    // Setters and resetters.
    // ********************************************************************************************

    /// Clear the contents of this histogram while preserving its statistics and configuration.
    ///
    /// The tracked minimum and maximum are kept; use `reset` to forget them as well.
    pub fn clear(&mut self) {
        self.counts.clear();
        self.total_count = 0;
    }

    /// Reset the contents and statistics of this histogram, preserving only its configuration and
    /// its tag.
    pub fn reset(&mut self) {
        self.clear();

        self.reset_max(ORIGINAL_MAX);
        self.reset_min(ORIGINAL_MIN);
        self.start_timestamp = None;
        self.end_timestamp = None;
    }

    /// Grow the histogram to cover values up to `high`. A value at or below the current highest
    /// trackable value leaves the histogram as it is. Existing counts keep their indexes.
    pub fn resize(&mut self, high: u64) -> Result<(), UsizeTypeTooSmall> {
        if high <= self.highest_trackable_value {
            return Ok(());
        }

        let from_len = self.counts.len();
        self.establish_size(high)?;
        debug!(
            high,
            from_len,
            to_len = self.counts.len(),
            buckets = self.bucket_count,
            "resized histogram"
        );
        Ok(())
    }

    /// Recompute the total count and the min/max tracking from the counts.
    pub fn establish_internal_tracking_values(&mut self) {
        let mut restat_state = RestatState::new();
        for i in 0..self.counts.len() {
            match self.counts.get(i) {
                Some(count) if count > 0 => restat_state.on_nonzero_count(i, count),
                _ => {}
            }
        }
        restat_state.update_histogram(self);
    }

    // ********************************************************************************************
    // Construction.
    // ********************************************************************************************

    /// Construct an auto-resizing `Histogram` with a lowest discernible value of 1 and an
    /// auto-adjusting highest trackable value. Can auto-resize up to track values up to
    /// `u64::max_value()`.
    ///
    /// See [`new_with_bounds`] for info on `sigfig`.
    ///
    /// [`new_with_bounds`]: #method.new_with_bounds
    pub fn new(sigfig: u8) -> Result<Histogram<S>, CreationError> {
        let mut h = Self::new_with_bounds(1, 2, sigfig);
        if let Ok(ref mut h) = h {
            h.auto_resize = true;
        }
        h
    }

    /// Construct a `Histogram` given a known maximum value to be tracked, and a number of
    /// significant decimal digits. The histogram will be constructed to implicitly track
    /// (distinguish from 0) values as low as 1. Auto-resizing will be disabled.
    ///
    /// See [`new_with_bounds`] for info on `high` and `sigfig`.
    ///
    /// [`new_with_bounds`]: #method.new_with_bounds
    pub fn new_with_max(high: u64, sigfig: u8) -> Result<Histogram<S>, CreationError> {
        Self::new_with_bounds(1, high, sigfig)
    }

    /// Construct a `Histogram` with known upper and lower bounds for recorded sample values.
    ///
    /// `low` is the lowest value that can be discerned (distinguished from 0) by the histogram,
    /// and must be a positive integer that is >= 1. It may be internally rounded down to nearest
    /// power of 2. Providing a lowest discernible value (`low`) is useful is situations where the
    /// units used for the histogram's values are much smaller that the minimal accuracy required.
    /// E.g. when tracking time values stated in nanosecond units, where the minimal accuracy
    /// required is a microsecond, the proper value for `low` would be 1000. If you're not sure,
    /// use 1.
    ///
    /// `high` is the highest value to be tracked by the histogram, and must be a
    /// positive integer that is `>= (2 * low)`. If you're not sure, use `u64::max_value()`.
    ///
    /// `sigfig` Specifies the number of significant figures to maintain. This is the number of
    /// significant decimal digits to which the histogram will maintain value resolution and
    /// separation. Must be in the range [0, 5]. If you're not sure, use 3. As `sigfig` increases,
    /// memory usage grows exponentially, so choose carefully if there will be many histograms in
    /// memory at once or if storage is constrained.
    pub fn new_with_bounds(low: u64, high: u64, sigfig: u8) -> Result<Histogram<S>, CreationError> {
        // Verify argument validity
        if low < 1 {
            return Err(CreationError::LowIsZero);
        }
        if low > u64::max_value() / 2 {
            // avoid overflow in 2 * low
            return Err(CreationError::LowExceedsMax);
        }
        if high < 2 * low {
            return Err(CreationError::HighLessThanTwiceLow);
        }
        if sigfig > 5 {
            return Err(CreationError::SigFigExceedsMax);
        }

        // Given a 3 decimal point accuracy, the expectation is obviously for "+/- 1 unit at 1000".
        // It also means that it's "ok to be +/- 2 units at 2000". The "tricky" thing is that it is
        // NOT ok to be +/- 2 units at 1999. Only starting at 2000. So internally, we need to
        // maintain single unit resolution to 2x 10^decimal_points.

        // largest value with single unit resolution, in [2, 200_000].
        let largest = 2 * 10_u32.pow(u32::from(sigfig));

        // floor(log2(low)), in [0, 62]
        let unit_magnitude = (63 - low.leading_zeros()) as u8;
        let unit_magnitude_mask = (1_u64 << unit_magnitude) - 1;

        // We need to maintain power-of-two sub_bucket_count (for clean direct indexing) that is
        // large enough to provide unit resolution to at least
        // largest_value_with_single_unit_resolution. So figure out
        // largest_value_with_single_unit_resolution's nearest power-of-two (rounded up), and use
        // that. In [1, 18]. 2^18 > 2 * 10^5 (the largest possible
        // largest_value_with_single_unit_resolution)
        let sub_bucket_count_magnitude = (32 - (largest - 1).leading_zeros()) as u8;
        let sub_bucket_half_count_magnitude = sub_bucket_count_magnitude - 1;
        let sub_bucket_count = 1_u32 << u32::from(sub_bucket_count_magnitude);

        if unit_magnitude + sub_bucket_count_magnitude > 63 {
            // sub_bucket_count entries can't be represented, with unit_magnitude applied, in a
            // u64. Technically it still sort of works if their sum is 64: you can represent all
            // but the last number in the shifted sub_bucket_count. However, the utility of such a
            // histogram vs ones whose magnitude here fits in 63 bits is debatable, and it makes
            // it harder to work through the logic. Sums larger than 64 are totally broken as
            // leading_zero_count_base would go negative.
            return Err(CreationError::CannotRepresentSigFigBeyondLow);
        }

        let sub_bucket_half_count = sub_bucket_count / 2;
        // sub_bucket_count is always at least 2, so subtraction won't underflow
        let sub_bucket_mask = (u64::from(sub_bucket_count) - 1) << unit_magnitude;

        let mut h = Histogram {
            auto_resize: false,

            highest_trackable_value: high,
            lowest_discernible_value: low,
            significant_value_digits: sigfig,

            // set by establish_size below
            bucket_count: 0,
            sub_bucket_count,

            // Establish leading_zero_count_base, used in bucket_index_of() fast path:
            // subtract the bits that would be used by the largest value in bucket 0.
            leading_zero_count_base: 64 - unit_magnitude - sub_bucket_half_count_magnitude - 1,
            sub_bucket_half_count_magnitude,

            unit_magnitude,
            sub_bucket_half_count,

            sub_bucket_mask,

            unit_magnitude_mask,
            max_value: ORIGINAL_MAX,
            min_non_zero_value: ORIGINAL_MIN,

            total_count: 0,
            counts: S::with_len(0),

            start_timestamp: None,
            end_timestamp: None,
            tag: None,
        };

        // Already checked that high >= 2*low
        h.establish_size(high)
            .map_err(|_| CreationError::UsizeTypeTooSmall)?;
        Ok(h)
    }

    /// Construct a `Histogram` with the same range settings as a given source histogram,
    /// duplicating the source's start/end timestamps (but NOT its contents).
    pub fn new_from<O: CountsStorage>(source: &Histogram<O>) -> Histogram<S> {
        let mut h = Self::new_with_bounds(
            source.lowest_discernible_value,
            source.highest_trackable_value,
            source.significant_value_digits,
        )
        .expect("Using another histogram's parameters failed");

        // Also copy auto-resize and timestamps
        h.auto_resize = source.auto_resize;
        h.start_timestamp = source.start_timestamp;
        h.end_timestamp = source.end_timestamp;
        h
    }

    // ********************************************************************************************
    // Recording samples.
    // ********************************************************************************************

    /// Record `value` in the histogram.
    ///
    /// Returns an error if `value` exceeds the highest trackable value and auto-resize is
    /// disabled, or if the count for `value` would overflow.
    pub fn record(&mut self, value: u64) -> Result<(), RecordError> {
        self.record_n(value, 1)
    }

    /// Record multiple samples for a value in the histogram, adding to the value's current count.
    ///
    /// `count` is the number of occurrences of this value to record.
    ///
    /// Returns an error if `value` cannot be recorded; see `RecordError`. On error nothing about
    /// the histogram's counts or statistics has changed.
    pub fn record_n(&mut self, value: u64, count: u64) -> Result<(), RecordError> {
        self.record_n_inner(value, count)
    }

    /// Record a value in the histogram while correcting for coordinated omission.
    ///
    /// See `record_n_correct` for further documentation.
    pub fn record_correct(&mut self, value: u64, interval: u64) -> Result<(), RecordError> {
        self.record_n_correct(value, 1, interval)
    }

    /// Record multiple values in the histogram while correcting for coordinated omission.
    ///
    /// To compensate for the loss of sampled values when a recorded value is larger than the
    /// expected interval between value samples, this method will auto-generate and record an
    /// additional series of decreasingly-smaller (down to `interval`) value records.
    ///
    /// Note: This is a at-recording correction method, as opposed to the post-recording correction
    /// method provided by `clone_correct`. The two methods are mutually exclusive, and only one of
    /// the two should be be used on a given data set to correct for the same coordinated omission
    /// issue.
    ///
    /// Returns an error if `value` exceeds the highest trackable value and auto-resize is
    /// disabled, or if any generated record would overflow its count or the total count. Every
    /// generated record is checked before any is made, so on error the histogram is unchanged.
    pub fn record_n_correct(
        &mut self,
        value: u64,
        count: u64,
        interval: u64,
    ) -> Result<(), RecordError> {
        if interval == 0 {
            return self.record_n_inner(value, count);
        }
        let mut cells = BTreeMap::new();
        let added = self.plan_correct(value, count, interval, &mut cells)?;
        self.commit_cells(&cells, added)
    }

    /// Add the counts `record_n_correct` would make for `value` into `cells`, keyed by raw index.
    /// Returns the number of samples planned.
    fn plan_correct(
        &self,
        value: u64,
        count: u64,
        interval: u64,
        cells: &mut BTreeMap<usize, u64>,
    ) -> Result<u64, RecordError> {
        let mut planned: u64 = 0;
        let mut next = value;
        loop {
            let cell = cells.entry(self.raw_index_for(next)).or_insert(0);
            *cell = cell.checked_add(count).ok_or(RecordError::CountOverflow)?;
            planned = planned.checked_add(count).ok_or(RecordError::CountOverflow)?;

            // synthetic values run from value - interval down to interval
            match next.checked_sub(interval) {
                Some(missing) if interval > 0 && missing >= interval => next = missing,
                _ => return Ok(planned),
            }
        }
    }

    /// Record planned `(raw index, count)` cells totalling `added` samples, or nothing at all.
    fn commit_cells(
        &mut self,
        cells: &BTreeMap<usize, u64>,
        added: u64,
    ) -> Result<(), RecordError> {
        let new_total = self
            .total_count
            .checked_add(added)
            .ok_or(RecordError::CountOverflow)?;
        let top_index = match cells.keys().next_back() {
            Some(&index) => index,
            None => return Ok(()),
        };

        let needs_growth = top_index >= self.counts.len();
        if needs_growth && !self.auto_resize {
            return Err(RecordError::ValueOutOfRangeResizeDisabled);
        }

        let max_count = self.counts.max_count();
        for (&index, &count) in cells {
            let current = self.counts.get(index).unwrap_or(0);
            match current.checked_add(count) {
                Some(sum) if sum <= max_count => {}
                _ => return Err(RecordError::CountOverflow),
            }
        }

        if needs_growth {
            let top_value = self.value_for(top_index);
            self.grow_to_cover(top_value)
                .map_err(|_| RecordError::ResizeFailedUsizeTypeTooSmall)?;
            if top_index >= self.counts.len() {
                return Err(RecordError::ResizeFailedUsizeTypeTooSmall);
            }
        }

        for (&index, &count) in cells {
            if count == 0 {
                continue;
            }
            self.counts
                .add(index, count)
                .map_err(|_| RecordError::CountOverflow)?;
            let value = self.value_for(index);
            self.update_min_max(value);
        }
        self.total_count = new_total;
        Ok(())
    }

    fn record_n_inner(&mut self, value: u64, count: u64) -> Result<(), RecordError> {
        let new_total = self
            .total_count
            .checked_add(count)
            .ok_or(RecordError::CountOverflow)?;

        let index = match self.index_for(value) {
            Some(index) => index,
            None => {
                if !self.auto_resize {
                    return Err(RecordError::ValueOutOfRangeResizeDisabled);
                }
                // the new cell starts at zero, so only the word width can reject the count
                if count > self.counts.max_count() {
                    return Err(RecordError::CountOverflow);
                }
                self.grow_to_cover(value)
                    .map_err(|_| RecordError::ResizeFailedUsizeTypeTooSmall)?;
                self.index_for(value)
                    .ok_or(RecordError::ResizeFailedUsizeTypeTooSmall)?
            }
        };

        self.counts
            .add(index, count)
            .map_err(|_| RecordError::CountOverflow)?;
        self.total_count = new_total;
        if count > 0 {
            self.update_min_max(value);
        }
        Ok(())
    }

    // ********************************************************************************************
    // Iteration support.
    // ********************************************************************************************

    /// Iterate through histogram values by percentile levels.
    ///
    /// The iteration mechanic for this iterator may appear somewhat confusing, but it yields
    /// fairly pleasing output. The iterator starts with a *percentile step size* of
    /// `50 / ticks_per_half_distance`. For every iteration, it yields a value whose percentile is
    /// that much greater than the previously emitted percentile. Once `ticks_per_half_distance`
    /// values have been emitted, the step size is halved, and the iteration continues.
    ///
    /// `ticks_per_half_distance` must be at least 1.
    ///
    /// The iterator yields an `iterators::IterationValue` struct.
    ///
    /// One subtlety of this iterator is that you can reach a value whose cumulative count yields
    /// a percentile of 100.0 far sooner than the percentile iteration would reach 100.0. Consider
    /// a histogram with count 1 at value 1, and count 1000000 at value 1000. At any percentile
    /// iteration above `100/1000001 = 0.0000999`, iteration will have necessarily proceeded to
    /// the index for value 1000, which has all the remaining counts, and therefore percentile
    /// (for the value) of 100.0. This is why `IterationValue` has both `percentile()` and
    /// `percentile_iterated_to()`. Additionally, to avoid a bunch of unhelpful iterations once
    /// iteration has reached the last value with non-zero count, percentile iteration will skip
    /// straight to 100 as the percentile to iterate to and end there.
    ///
    /// ```
    /// use hdrpack::DenseHistogram;
    /// let mut hist = DenseHistogram::<u64>::new_with_max(10_000, 4).unwrap();
    /// for i in 0..10_000 {
    ///     hist += i;
    /// }
    ///
    /// let mut perc = hist.iter_percentiles(1);
    /// assert_eq!(
    ///     perc.next().map(|v| (v.value_iterated_to(), v.percentile_iterated_to())),
    ///     Some((0, 0.0))
    /// );
    /// // step size = 50
    /// assert_eq!(
    ///     perc.next().map(|v| (v.value_iterated_to(), v.percentile_iterated_to())),
    ///     Some((4999, 50.0))
    /// );
    /// ```
    pub fn iter_percentiles(
        &self,
        ticks_per_half_distance: u32,
    ) -> iterators::HistogramIterator<'_, S, iterators::percentile::Iter<'_, S>> {
        iterators::percentile::Iter::new(self, ticks_per_half_distance)
    }

    /// Iterates through histogram values using linear value steps. The iteration is performed in
    /// steps of size `step`, each one yielding the count for all values in the preceeding value
    /// range of size `step`. The iterator terminates when all recorded histogram values are
    /// exhausted.
    ///
    /// The iterator yields an `iterators::IterationValue` struct.
    ///
    /// ```
    /// use hdrpack::DenseHistogram;
    /// let mut hist = DenseHistogram::<u64>::new_with_max(1000, 3).unwrap();
    /// hist += 100;
    /// hist += 500;
    /// hist += 800;
    /// hist += 850;
    ///
    /// let mut perc = hist.iter_linear(100);
    /// assert_eq!(perc.next().map(|v| (v.value_iterated_to(), v.count_since_last_iteration())), Some((99, 0)));
    /// assert_eq!(perc.next().map(|v| (v.value_iterated_to(), v.count_since_last_iteration())), Some((199, 1)));
    /// assert_eq!(perc.next().map(|v| (v.value_iterated_to(), v.count_since_last_iteration())), Some((299, 0)));
    /// assert_eq!(perc.next().map(|v| (v.value_iterated_to(), v.count_since_last_iteration())), Some((399, 0)));
    /// assert_eq!(perc.next().map(|v| (v.value_iterated_to(), v.count_since_last_iteration())), Some((499, 0)));
    /// assert_eq!(perc.next().map(|v| (v.value_iterated_to(), v.count_since_last_iteration())), Some((599, 1)));
    /// assert_eq!(perc.next().map(|v| (v.value_iterated_to(), v.count_since_last_iteration())), Some((699, 0)));
    /// assert_eq!(perc.next().map(|v| (v.value_iterated_to(), v.count_since_last_iteration())), Some((799, 0)));
    /// assert_eq!(perc.next().map(|v| (v.value_iterated_to(), v.count_since_last_iteration())), Some((899, 2)));
    /// assert_eq!(perc.next(), None);
    /// ```
    pub fn iter_linear(&self, step: u64) -> iterators::HistogramIterator<'_, S, iterators::linear::Iter<'_, S>> {
        iterators::linear::Iter::new(self, step)
    }

    /// Iterates through histogram values at logarithmically increasing levels. The iteration is
    /// performed in steps that start at `start` and increase exponentially according to `exp`. The
    /// iterator terminates when all recorded histogram values are exhausted.
    ///
    /// The iterator yields an `iterators::IterationValue` struct.
    ///
    /// ```
    /// use hdrpack::DenseHistogram;
    /// let mut hist = DenseHistogram::<u64>::new_with_max(1000, 3).unwrap();
    /// hist += 100;
    /// hist += 500;
    /// hist += 800;
    /// hist += 850;
    ///
    /// let mut perc = hist.iter_log(1, 10.0);
    /// assert_eq!(perc.next().map(|v| (v.value_iterated_to(), v.count_since_last_iteration())), Some((0, 0)));
    /// assert_eq!(perc.next().map(|v| (v.value_iterated_to(), v.count_since_last_iteration())), Some((9, 0)));
    /// assert_eq!(perc.next().map(|v| (v.value_iterated_to(), v.count_since_last_iteration())), Some((99, 0)));
    /// assert_eq!(perc.next().map(|v| (v.value_iterated_to(), v.count_since_last_iteration())), Some((999, 4)));
    /// assert_eq!(perc.next(), None);
    /// ```
    pub fn iter_log(&self, start: u64, exp: f64) -> iterators::HistogramIterator<'_, S, iterators::log::Iter<'_, S>> {
        iterators::log::Iter::new(self, start, exp)
    }

    /// Iterates through all recorded histogram values using the finest granularity steps
    /// supported by the underlying representation. The iteration steps through all non-zero
    /// recorded value counts, and terminates when all recorded histogram values are exhausted.
    ///
    /// The iterator yields an `iterators::IterationValue` struct.
    ///
    /// ```
    /// use hdrpack::DenseHistogram;
    /// let mut hist = DenseHistogram::<u64>::new_with_max(1000, 3).unwrap();
    /// hist += 100;
    /// hist += 500;
    /// hist += 800;
    /// hist += 850;
    ///
    /// let mut perc = hist.iter_recorded();
    /// assert_eq!(perc.next().map(|v| (v.value_iterated_to(), v.count_since_last_iteration())), Some((100, 1)));
    /// assert_eq!(perc.next().map(|v| (v.value_iterated_to(), v.count_since_last_iteration())), Some((500, 1)));
    /// assert_eq!(perc.next().map(|v| (v.value_iterated_to(), v.count_since_last_iteration())), Some((800, 1)));
    /// assert_eq!(perc.next().map(|v| (v.value_iterated_to(), v.count_since_last_iteration())), Some((850, 1)));
    /// assert_eq!(perc.next(), None);
    /// ```
    pub fn iter_recorded(&self) -> iterators::HistogramIterator<'_, S, iterators::recorded::Iter> {
        iterators::recorded::Iter::new(self)
    }

    /// Iterates through all histogram values using the finest granularity steps supported by the
    /// underlying representation. The iteration steps through all possible unit value levels,
    /// regardless of whether or not there were recorded values for that value level, and
    /// terminates when all recorded histogram values are exhausted.
    ///
    /// The iterator yields an `iterators::IterationValue` struct.
    ///
    /// ```
    /// use hdrpack::DenseHistogram;
    /// let mut hist = DenseHistogram::<u64>::new_with_max(10, 1).unwrap();
    /// hist += 1;
    /// hist += 5;
    /// hist += 8;
    ///
    /// let mut all = hist.iter_all();
    /// assert_eq!(all.next().map(|v| (v.value_iterated_to(), v.count_since_last_iteration())), Some((0, 0)));
    /// assert_eq!(all.next().map(|v| (v.value_iterated_to(), v.count_since_last_iteration())), Some((1, 1)));
    /// assert_eq!(all.next().map(|v| (v.value_iterated_to(), v.count_since_last_iteration())), Some((2, 0)));
    ///
    /// // every bucket is visited, including the empty ones past the last recorded value
    /// assert_eq!(hist.iter_all().count(), hist.distinct_values());
    /// ```
    pub fn iter_all(&self) -> iterators::HistogramIterator<'_, S, iterators::all::Iter> {
        iterators::all::Iter::new(self)
    }

    // ********************************************************************************************
    // Data statistics
    // ********************************************************************************************

    /// Get the lowest recorded value level in the histogram.
    /// If the histogram has no recorded values, the value returned will be 0.
    pub fn min(&self) -> u64 {
        if self.total_count == 0 || self.counts.get(0).map_or(false, |c| c != 0) {
            0
        } else {
            self.min_nz()
        }
    }

    /// Get the highest recorded value level in the histogram.
    /// If the histogram has no recorded values, the value returned is undefined.
    pub fn max(&self) -> u64 {
        if self.max_value == ORIGINAL_MAX {
            ORIGINAL_MAX
        } else {
            self.highest_equivalent(self.max_value)
        }
    }

    /// Get the lowest recorded non-zero value level in the histogram.
    /// If the histogram has no recorded values, the value returned is `u64::max_value()`.
    pub fn min_nz(&self) -> u64 {
        if self.min_non_zero_value == ORIGINAL_MIN {
            ORIGINAL_MIN
        } else {
            self.lowest_equivalent(self.min_non_zero_value)
        }
    }

    /// Determine if two values are equivalent with the histogram's resolution. Equivalent here
    /// means that value samples recorded for any two equivalent values are counted in a common
    /// total count.
    pub fn equivalent(&self, value1: u64, value2: u64) -> bool {
        self.lowest_equivalent(value1) == self.lowest_equivalent(value2)
    }

    /// Get the computed mean value of all recorded values in the histogram.
    pub fn mean(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }

        self.iter_recorded().fold(0.0_f64, |total, v| {
            total
                + self.median_equivalent(v.value_iterated_to()) as f64 * v.count_at_value() as f64
                    / self.total_count as f64
        })
    }

    /// Get the computed standard deviation of all recorded values in the histogram
    pub fn stdev(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }

        let mean = self.mean();
        let geom_dev_tot = self.iter_recorded().fold(0.0_f64, |gdt, v| {
            let dev = self.median_equivalent(v.value_iterated_to()) as f64 - mean;
            gdt + (dev * dev) * v.count_since_last_iteration() as f64
        });

        (geom_dev_tot / self.total_count as f64).sqrt()
    }

    /// Get the value at a given percentile.
    ///
    /// `percentile` is clamped to `[0, 100]`. The value reported for 0 is the lowest equivalent
    /// of the first recorded cell; for anything else it is the highest equivalent of the cell where
    /// the running count first reaches `percentile`% of the total. An empty histogram reports 0.
    pub fn value_at_percentile(&self, percentile: f64) -> u64 {
        // Truncate to 0..100%
        let percentile = percentile.max(0.0).min(100.0);

        // Scale the percentile to the total count, stepping back one ulp before rounding up so a
        // product that should be integral but lands a hair above it still maps to that integer.
        let fp_count_at_percentile = (percentile / 100.0) * self.total_count as f64;
        let count_at_percentile = cmp::max(
            1,
            (fp_count_at_percentile - ulp(fp_count_at_percentile)).ceil() as u64,
        );

        let mut total_to_current_index: u64 = 0;
        for i in 0..self.counts.len() {
            // Direct indexing is safe; indexes must reside in counts array.
            total_to_current_index += self.counts.get(i).unwrap_or(0);
            if total_to_current_index >= count_at_percentile {
                let value_at_index = self.value_for(i);
                return if percentile == 0.0 {
                    self.lowest_equivalent(value_at_index)
                } else {
                    self.highest_equivalent(value_at_index)
                };
            }
        }

        0
    }

    /// Get the percentile of samples at and below a given value.
    ///
    /// The percentile returned is the percentile of values recorded in the histogram that are
    /// smaller than or equivalent to the given value.
    ///
    /// Note that two values are "equivalent" in this statement if `h.equivalent(v1, v2)` would
    /// return true.
    pub fn percentile_below(&self, value: u64) -> f64 {
        if self.total_count == 0 {
            return 100.0;
        }

        let target_index = self.index_for_or_last(value);
        let total_to_current_index: u64 = (0..=target_index)
            .map(|i| self.counts.get(i).unwrap_or(0))
            .sum();
        100.0 * total_to_current_index as f64 / self.total_count as f64
    }

    /// Get the count of recorded values within a range of value levels (inclusive to within the
    /// histogram's resolution).
    ///
    /// `low` gives the lower value bound on the range for which to provide the recorded count.
    /// Will be rounded down with `lowest_equivalent`. Similarly, `high` gives the higher value
    /// bound on the range, and will be rounded up with `highest_equivalent`. The function returns
    /// the total count of values recorded in the histogram within the value range that is `>=
    /// lowest_equivalent(low)` and `<= highest_equivalent(high)`.
    ///
    /// If either value is larger than the maximum representable value, it will be clamped to the
    /// max representable value.
    ///
    /// The range is inclusive of both `low` and `high`.
    pub fn count_between(&self, low: u64, high: u64) -> u64 {
        let low_index = self.index_for_or_last(low);
        let high_index = self.index_for_or_last(high);
        if low_index > high_index {
            return 0;
        }
        (low_index..=high_index)
            .map(|i| self.counts.get(i).unwrap_or(0))
            .sum()
    }

    // ********************************************************************************************
    // Public helpers
    // ********************************************************************************************

    /// Get the lowest value that is equivalent to the given value within the histogram's
    /// resolution. Equivalent here means that value samples recorded for any two equivalent values
    /// are counted in a common total count.
    pub fn lowest_equivalent(&self, value: u64) -> u64 {
        let bucket_index = self.bucket_for(value);
        let sub_bucket_index = self.sub_bucket_for(value, bucket_index);
        self.value_from_loc(bucket_index, sub_bucket_index)
    }

    /// Get the highest value that is equivalent to the given value within the histogram's
    /// resolution. Equivalent here means that value samples recorded for any two equivalent values
    /// are counted in a common total count.
    ///
    /// The top cell of a histogram covering `u64::max_value()` ends exactly at
    /// `u64::max_value()`.
    pub fn highest_equivalent(&self, value: u64) -> u64 {
        self.lowest_equivalent(value)
            .saturating_add(self.equivalent_range(value) - 1)
    }

    /// Get a value that lies in the middle (rounded up) of the range of values equivalent the
    /// given value. Equivalent here means that value samples recorded for any two equivalent
    /// values are counted in a common total count.
    ///
    /// Note that the return value is capped at `u64::max_value()`.
    pub fn median_equivalent(&self, value: u64) -> u64 {
        // adding half of the range to the bottom of the range shouldn't overflow
        self.lowest_equivalent(value)
            .saturating_add(self.equivalent_range(value) >> 1)
    }

    /// Get the next value that is *not* equivalent to the given value within the histogram's
    /// resolution. Equivalent means that value samples recorded for any two equivalent values are
    /// counted in a common total count.
    ///
    /// Note that the return value is capped at `u64::max_value()`.
    pub fn next_non_equivalent(&self, value: u64) -> u64 {
        self.lowest_equivalent(value)
            .saturating_add(self.equivalent_range(value))
    }

    /// Get the size (in value units) of the range of values that are equivalent to the given value
    /// within the histogram's resolution. Equivalent here means that value samples recorded for
    /// any two equivalent values are counted in a common total count.
    pub fn equivalent_range(&self, value: u64) -> u64 {
        let bucket_index = self.bucket_for(value);
        1_u64 << (self.unit_magnitude + bucket_index)
    }

    /// Turn this histogram into a value that counts with the bucket at `index`. That is, the
    /// lowest value equivalent to the bucket at `index`.
    pub fn value_for(&self, index: usize) -> u64 {
        // Dividing by sub bucket half count will yield 1 in top half of first bucket, 2 in
        // in the top half (i.e., the only half that's used) of the 2nd bucket, etc, so subtract 1
        // to get 0-indexed bucket indexes. This will be -1 for the bottom half of the first bucket.
        let mut bucket_index = (index >> self.sub_bucket_half_count_magnitude) as isize - 1;

        // Calculate the remainder of dividing by sub_bucket_half_count, shifted into the top half
        // of the corresponding bucket. This will (temporarily) map indexes in the lower half of
        // first bucket into the top half.

        // The subtraction won't underflow because half count is always at least 1.
        // TODO precalculate sub_bucket_half_count mask if benchmarks show improvement
        let mut sub_bucket_index = ((index as u32) & (self.sub_bucket_half_count - 1))
            + self.sub_bucket_half_count;
        if bucket_index < 0 {
            // lower half of first bucket case; move sub bucket index back
            sub_bucket_index -= self.sub_bucket_half_count;
            bucket_index = 0;
        }
        self.value_from_loc(bucket_index as u8, sub_bucket_index)
    }

    // ********************************************************************************************
    // Internal helpers
    // ********************************************************************************************

    /// Computes the matching histogram value for the given histogram bin.
    ///
    /// `bucket_index` must be no larger than `self.bucket_count`
    #[inline]
    fn value_from_loc(&self, bucket_index: u8, sub_bucket_index: u32) -> u64 {
        // Sum won't overflow; bucket_index and unit_magnitude are both <= 64.
        // However, the resulting shift may overflow given bogus input, e.g. if unit magnitude is
        // large and the input sub_bucket_index is for an entry in the counts index that shouldn't
        // be used (because this calculation will overflow).
        u64::from(sub_bucket_index) << (bucket_index + self.unit_magnitude)
    }

    /// Find the number of buckets needed such that `value` is representable.
    fn buckets_to_cover(&self, value: u64) -> u8 {
        // Shift won't overflow because sub_bucket_magnitude + unit_magnitude <= 63.
        // the k'th bucket can express from 0 * 2^k to sub_bucket_count * 2^k in units of 2^k
        let mut smallest_untrackable_value =
            u64::from(self.sub_bucket_count) << self.unit_magnitude;

        // always have at least 1 bucket
        let mut buckets_needed = 1;
        while smallest_untrackable_value <= value {
            if smallest_untrackable_value > u64::max_value() / 2 {
                // next shift will overflow, meaning that bucket could represent values up to ones
                // greater than i64::max_value, so it's the last bucket
                return buckets_needed + 1;
            }
            smallest_untrackable_value <<= 1;
            buckets_needed += 1;
        }
        buckets_needed
    }

    /// Compute the actual number of bins to use for the given bucket count (that is, including the
    /// sub-buckets within each top-level bucket).
    ///
    /// If we have `N` such that `sub_bucket_count * 2^N > high`, we need storage for `N+1` buckets,
    /// each with enough slots to hold the top half of the `sub_bucket_count` (the lower half is
    /// covered by previous buckets), and the +1 being used for the lower half of the 0'th bucket.
    /// Or, equivalently, we need 1 more bucket to capture the max value if we consider the
    /// sub-bucket length to be halved.
    fn num_bins(&self, number_of_buckets: u8) -> Option<usize> {
        (usize::from(number_of_buckets) + 1).checked_mul(self.sub_bucket_half_count as usize)
    }

    /// Size the counts for `high`, recomputing the bucket count. Counts never shrink.
    fn establish_size(&mut self, high: u64) -> Result<(), UsizeTypeTooSmall> {
        assert!(
            high >= 2 * self.lowest_discernible_value,
            "highest trackable value must be >= (2 * lowest discernible value)"
        );

        let buckets_needed = self.buckets_to_cover(high);
        let len = self.num_bins(buckets_needed).ok_or(UsizeTypeTooSmall)?;

        self.highest_trackable_value = high;
        self.bucket_count = buckets_needed;
        self.counts.resize(len);
        Ok(())
    }

    /// Resize so that `value` is covered, then report the top of the new range as the highest
    /// trackable value.
    fn grow_to_cover(&mut self, value: u64) -> Result<(), UsizeTypeTooSmall> {
        self.resize(value)?;
        self.highest_trackable_value = self.highest_equivalent(self.value_for(self.last_index()));
        Ok(())
    }

    /// The index of the last valid bucket.
    #[inline]
    fn last_index(&self) -> usize {
        // the counts array always holds at least the two halves of bucket 0
        self.counts.len() - 1
    }

    /// Compute the lowest (and therefore highest precision) bucket index whose sub-buckets can
    /// represent the value.
    #[inline]
    fn bucket_for(&self, value: u64) -> u8 {
        // Calculates the number of powers of two by which the value is greater than the biggest
        // value that fits in bucket 0. This is the bucket index since each successive bucket can
        // hold a value 2x greater. The mask maps small values to bucket 0.
        // Will not underflow because sub_bucket_mask caps the leading zeros to no more than
        // leading_zero_count_base.
        self.leading_zero_count_base - (value | self.sub_bucket_mask).leading_zeros() as u8
    }

    /// Compute the position inside a bucket at which the given value should be recorded, indexed
    /// from position 0 in the bucket (in the first half, which is not used past the first bucket).
    /// For bucket_index > 0, the result will be in the top half of the bucket.
    #[inline]
    fn sub_bucket_for(&self, value: u64, bucket_index: u8) -> u32 {
        // Since bucket_index is simply how many powers of 2 greater value is than what will fit in
        // bucket 0 (that is, what will fit in [0, sub_bucket_count)), we shift off that many
        // powers of two, and end up with a number in [0, sub_bucket_count).
        // For bucket_index 0, this is just value, so it may be anywhere in [0, sub_bucket_count).
        // For bucket 1, this will be in [sub_bucket_count / 2, sub_bucket_count).
        (value >> (bucket_index + self.unit_magnitude)) as u32
    }

    /// The counts array index for `value`, whether or not the counts array currently reaches it.
    #[inline]
    fn raw_index_for(&self, value: u64) -> usize {
        let bucket_index = self.bucket_for(value);
        let sub_bucket_index = self.sub_bucket_for(value, bucket_index);

        debug_assert!(sub_bucket_index < self.sub_bucket_count);
        debug_assert!(bucket_index == 0 || (sub_bucket_index >= self.sub_bucket_half_count));

        // Calculate the index for the first entry that will be used in the bucket (halfway through
        // sub_bucket_count). For bucket_index 0, all sub_bucket_count entries may be used, but
        // bucket_base_index is still set in the middle.
        let bucket_base_index =
            (usize::from(bucket_index) + 1) << self.sub_bucket_half_count_magnitude;

        // Calculate the offset in the bucket. This subtraction will result in a positive value in
        // all buckets except the 0th bucket (since a value in that bucket may be less than half
        // the bucket's 0 to sub_bucket_count range). However, this works out since we give bucket
        // 0 twice as much space, so the sum is never negative.
        bucket_base_index + sub_bucket_index as usize - self.sub_bucket_half_count as usize
    }

    /// Set internally tracked max_value to new value if new value is greater than current one.
    fn update_max(&mut self, value: u64) {
        let internal_value = value | self.unit_magnitude_mask; // Max unit-equivalent value
        if internal_value > self.max_value {
            self.max_value = internal_value;
        }
    }

    /// Set internally tracked min_non_zero_value to new value if new value is smaller than current
    /// one.
    fn update_min(&mut self, value: u64) {
        if value <= self.unit_magnitude_mask {
            return; // Unit-equivalent to 0.
        }

        let internal_value = value & !self.unit_magnitude_mask; // Min unit-equivalent value
        if internal_value < self.min_non_zero_value {
            self.min_non_zero_value = internal_value;
        }
    }

    fn update_min_max(&mut self, value: u64) {
        self.update_max(value);
        self.update_min(value);
    }

    fn reset_max(&mut self, max: u64) {
        self.max_value = if max == ORIGINAL_MAX {
            max
        } else {
            max | self.unit_magnitude_mask // Max unit-equivalent value
        };
    }

    fn reset_min(&mut self, min: u64) {
        let internal_value = min & !self.unit_magnitude_mask; // Min unit-equivalent value
        self.min_non_zero_value = if min == u64::max_value() {
            min
        } else {
            internal_value
        };
    }
}

/// One ULP above `x`, minus `x`. `x` must be finite and non-negative.
#[inline]
fn ulp(x: f64) -> f64 {
    f64::from_bits(x.to_bits() + 1) - x
}

/// Stores the state to calculate the max, min, etc when iterating through the counts in order.
///
/// Indexes must be fed in ascending order.
#[derive(Debug)]
struct RestatState {
    max_index: Option<usize>,
    min_non_zero_index: Option<usize>,
    total_count: u64,
}

impl RestatState {
    fn new() -> RestatState {
        RestatState {
            max_index: None,
            min_non_zero_index: None,
            total_count: 0,
        }
    }

    /// Should be called on every non-zero count found
    #[inline]
    fn on_nonzero_count(&mut self, index: usize, count: u64) {
        self.total_count = self.total_count.saturating_add(count);

        self.max_index = Some(index);

        if self.min_non_zero_index.is_none() && index != 0 {
            self.min_non_zero_index = Some(index);
        }
    }

    /// Write updated min, max, total statistics into histogram.
    /// Called once all counts have been iterated across.
    fn update_histogram<S: CountsStorage>(self, h: &mut Histogram<S>) {
        if let Some(max_i) = self.max_index {
            let max = h.highest_equivalent(h.value_for(max_i));
            h.reset_max(max);
        } else {
            h.reset_max(ORIGINAL_MAX);
        }

        if let Some(min_i) = self.min_non_zero_index {
            let min = h.value_for(min_i);
            h.reset_min(min);
        } else {
            h.reset_min(ORIGINAL_MIN);
        }

        h.total_count = self.total_count;
    }
}

// ************************************************************************************************
// Trait implementations
// ************************************************************************************************

impl<S: CountsStorage, O: CountsStorage> AddAssign<&Histogram<O>> for Histogram<S> {
    fn add_assign(&mut self, source: &Histogram<O>) {
        self.add(source).expect("add_assign failed");
    }
}

impl<S: CountsStorage, O: CountsStorage> SubAssign<&Histogram<O>> for Histogram<S> {
    fn sub_assign(&mut self, other: &Histogram<O>) {
        self.subtract(other).expect("sub_assign failed");
    }
}

impl<S: CountsStorage> AddAssign<u64> for Histogram<S> {
    fn add_assign(&mut self, value: u64) {
        self.record(value).expect("value should be in range");
    }
}

impl<S: CountsStorage, O: CountsStorage> PartialEq<Histogram<O>> for Histogram<S> {
    fn eq(&self, other: &Histogram<O>) -> bool {
        if self.lowest_discernible_value != other.lowest_discernible_value
            || self.significant_value_digits != other.significant_value_digits
        {
            return false;
        }
        if self.total_count != other.total_count {
            return false;
        }
        if self.max() != other.max() {
            return false;
        }
        if self.min_nz() != other.min_nz() {
            return false;
        }

        let len = cmp::max(self.counts.len(), other.counts.len());
        (0..len).all(|i| self.counts.get(i).unwrap_or(0) == other.counts.get(i).unwrap_or(0))
    }
}

#[path = "tests/tests.rs"]
#[cfg(test)]
mod tests;
