use crate::iterators::{HistogramIterator, PickMetadata, PickyIterator};
use crate::storage::CountsStorage;
use crate::Histogram;

/// An iterator that will yield at percentile steps through the histogram's value range.
pub struct Iter<'a, S: 'a + CountsStorage> {
    hist: &'a Histogram<S>,

    ticks_per_half_distance: u32,
    percentile_to_iterate_to: f64,
    reached_last_recorded_value: bool,
}

impl<'a, S: 'a + CountsStorage> Iter<'a, S> {
    /// Construct a new iterator. See `Histogram::iter_percentiles` for details.
    pub fn new(
        hist: &'a Histogram<S>,
        ticks_per_half_distance: u32,
    ) -> HistogramIterator<'a, S, Iter<'a, S>> {
        assert!(
            ticks_per_half_distance > 0,
            "Ticks per half distance must be > 0"
        );

        HistogramIterator::new(
            hist,
            Iter {
                hist,
                ticks_per_half_distance,
                percentile_to_iterate_to: 0.0,
                reached_last_recorded_value: false,
            },
        )
    }
}

impl<'a, S: 'a + CountsStorage> PickyIterator for Iter<'a, S> {
    fn pick(
        &mut self,
        _: usize,
        running_total: u64,
        count_at_index: u64,
    ) -> Option<PickMetadata> {
        if count_at_index == 0 {
            return None;
        }

        let current_percentile = 100.0 * running_total as f64 / self.hist.len() as f64;
        if current_percentile < self.percentile_to_iterate_to {
            return None;
        }

        let metadata = PickMetadata::new(Some(self.percentile_to_iterate_to), None);

        // The choice to maintain fixed-sized "ticks" in each half-distance to 100% [starting from
        // 0%], as opposed to a "tick" size that varies with each interval, was made to make the
        // steps easily comprehensible and readable to humans. The resulting percentile steps are
        // much easier to browse through in a percentile distribution output, for example.
        //
        // Calculate the number of times we've halved the distance to 100%. This is 1 at 50%, 2 at
        // 75%, 3 at 87.5%, etc. 2 ^ num_halvings is the number of slices that will fit into 100%,
        // and each slice has two "half distances" to tick, so one more power of two gives the
        // ticks per whole distance.
        if self.percentile_to_iterate_to < 100.0 {
            let num_halvings = (100.0 / (100.0 - self.percentile_to_iterate_to)).log2() as u32;
            let total_ticks = u64::from(self.ticks_per_half_distance)
                .saturating_mul(1_u64.checked_shl(num_halvings + 1).unwrap_or(u64::max_value()));
            self.percentile_to_iterate_to += 100.0 / total_ticks as f64;
        }
        Some(metadata)
    }

    fn more(&mut self, _: usize) -> bool {
        // We want one additional last step to 100%
        if !self.reached_last_recorded_value && self.hist.len() != 0 {
            self.percentile_to_iterate_to = 100.0;
            self.reached_last_recorded_value = true;
            true
        } else {
            false
        }
    }
}
