use crate::iterators::{HistogramIterator, PickMetadata, PickyIterator};
use crate::storage::CountsStorage;
use crate::Histogram;

/// An iterator that will yield only bins with at least one sample.
pub struct Iter {
    visited: Option<usize>,
}

impl Iter {
    /// Construct a new sampled iterator. See `Histogram::iter_recorded` for details.
    pub fn new<S: CountsStorage>(hist: &Histogram<S>) -> HistogramIterator<'_, S, Iter> {
        HistogramIterator::new(hist, Iter { visited: None })
    }
}

impl PickyIterator for Iter {
    fn pick(&mut self, index: usize, _: u64, count_at_index: u64) -> Option<PickMetadata> {
        if count_at_index != 0 && self.visited.map(|i| i != index).unwrap_or(true) {
            self.visited = Some(index);
            return Some(PickMetadata::new(None, None));
        }
        None
    }

    fn more(&mut self, _: usize) -> bool {
        false
    }
}
