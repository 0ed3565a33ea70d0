use crate::iterators::{HistogramIterator, PickMetadata, PickyIterator};
use crate::storage::CountsStorage;
use crate::Histogram;

/// An iterator that will yield at log-size steps through the histogram's value range.
pub struct Iter<'a, S: 'a + CountsStorage> {
    hist: &'a Histogram<S>,

    // > 1.0
    next_value_reporting_level: f64,
    // > 1.0
    log_base: f64,

    current_step_lowest_value_reporting_level: u64,
    current_step_highest_value_reporting_level: u64,
}

impl<'a, S: 'a + CountsStorage> Iter<'a, S> {
    /// Construct a new logarithmic iterator. See `Histogram::iter_log` for details.
    pub fn new(
        hist: &'a Histogram<S>,
        value_units_in_first_bucket: u64,
        log_base: f64,
    ) -> HistogramIterator<'a, S, Iter<'a, S>> {
        assert!(
            value_units_in_first_bucket > 0,
            "value_units_per_bucket must be > 0"
        );
        assert!(log_base > 1.0, "log_base must be > 1.0");

        let new_lowest = hist.lowest_equivalent(value_units_in_first_bucket - 1);
        HistogramIterator::new(
            hist,
            Iter {
                hist,
                log_base,
                next_value_reporting_level: value_units_in_first_bucket as f64,
                current_step_highest_value_reporting_level: value_units_in_first_bucket - 1,
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
            self.next_value_reporting_level *= self.log_base;
            // won't underflow since next_value_reporting_level starts > 0 and only grows;
            // the float to int cast saturates
            self.current_step_highest_value_reporting_level =
                self.next_value_reporting_level as u64 - 1;
            self.current_step_lowest_value_reporting_level = self
                .hist
                .lowest_equivalent(self.current_step_highest_value_reporting_level);
            Some(metadata)
        } else {
            None
        }
    }

    fn more(&mut self, index: usize) -> bool {
        // Keep going until the next reporting level lies beyond the next bucket.
        self.hist
            .lowest_equivalent(self.next_value_reporting_level as u64)
            < self.hist.value_for(index + 1)
    }
}
