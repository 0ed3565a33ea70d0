use crate::iterators::{HistogramIterator, PickMetadata, PickyIterator};
use crate::storage::CountsStorage;
use crate::Histogram;

/// An iterator that will yield every bin.
pub struct Iter {
    visited: Option<usize>,
    last_index: usize,
}

impl Iter {
    /// Construct a new full iterator. See `Histogram::iter_all` for details.
    pub fn new<S: CountsStorage>(hist: &Histogram<S>) -> HistogramIterator<'_, S, Iter> {
        HistogramIterator::new(
            hist,
            Iter {
                visited: None,
                last_index: hist.last_index(),
            },
        )
    }
}

impl PickyIterator for Iter {
    fn pick(&mut self, index: usize, _: u64, _: u64) -> Option<PickMetadata> {
        // have we visited before?
        if self.visited.map(|i| i != index).unwrap_or(true) {
            self.visited = Some(index);
            Some(PickMetadata::new(None, None))
        } else {
            None
        }
    }

    fn more(&mut self, index: usize) -> bool {
        index < self.last_index
    }
}
