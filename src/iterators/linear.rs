use crate::iterators::{HistogramIterator, PickMetadata, PickyIterator};
use crate::storage::CountsStorage;
use crate::Histogram;

/// An iterator that will yield at fixed-size steps through the histogram's value range.
pub struct Iter<'a, S: 'a + CountsStorage> {
    hist: &'a Histogram<S>,

    // > 0
    value_units_per_bucket: u64,
    current_step_highest_value_reporting_level: u64,
    current_step_lowest_value_reporting_level: u64,
}

impl<'a, S: 'a + CountsStorage> Iter<'a, S> {
    /// Construct a new linear iterator. See `Histogram::iter_linear` for details.
    pub fn new(
        hist: &'a Histogram<S>,
        value_units_per_bucket: u64,
    ) -> HistogramIterator<'a, S, Iter<'a, S>> {
        assert!(value_units_per_bucket > 0, "value_units_per_bucket must be > 0");

        let new_lowest = hist.lowest_equivalent(value_units_per_bucket - 1);
        HistogramIterator::new(
            hist,
            Iter {
                hist,
                value_units_per_bucket,
                current_step_highest_value_reporting_level: value_units_per_bucket - 1,
                current_step_lowest_value_reporting_level: new_lowest,
            },
        )
    }
}

impl<'a, S: 'a + CountsStorage> PickyIterator for Iter<'a, S> {
    fn pick(&mut self, index: usize, _: u64, _: u64) -> Option<PickMetadata> {
        let val = self.hist.value_for(index);
        if val >= self.current_step_lowest_value_reporting_level || index == self.hist.last_index()
        {
            let metadata =
                PickMetadata::new(None, Some(self.current_step_highest_value_reporting_level));
            self.current_step_highest_value_reporting_level = self
                .current_step_highest_value_reporting_level
                .saturating_add(self.value_units_per_bucket);
            self.current_step_lowest_value_reporting_level = self
                .hist
                .lowest_equivalent(self.current_step_highest_value_reporting_level);
            Some(metadata)
        } else {
            None
        }
    }

    fn more(&mut self, index: usize) -> bool {
        // If the next iterate will not move to the next sub bucket index (which is empty if
        // if we reached this point), then we are not yet done iterating (we want to iterate
        // until we are no longer on a value that has a count, rather than util we first reach
        // the last value that has a count. The difference is subtle but important)...
        self.current_step_highest_value_reporting_level.saturating_add(1)
            < self.hist.value_for(index + 1)
    }
}
