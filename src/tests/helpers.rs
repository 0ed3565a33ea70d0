use crate::storage::CountsStorage;
use crate::{DenseStorage, Histogram, PackedStorage};

pub fn histo<S: CountsStorage>(
    lowest_discernible_value: u64,
    highest_trackable_value: u64,
    num_significant_digits: u8,
) -> Histogram<S> {
    Histogram::new_with_bounds(
        lowest_discernible_value,
        highest_trackable_value,
        num_significant_digits,
    )
    .unwrap()
}

pub fn histo64(low: u64, high: u64, sigfig: u8) -> Histogram<DenseStorage<u64>> {
    histo(low, high, sigfig)
}

pub fn packed(low: u64, high: u64, sigfig: u8) -> Histogram<PackedStorage> {
    histo(low, high, sigfig)
}

/// Stamp out a `dense` and a `packed` test for each generic `fn name<S: CountsStorage>()`.
macro_rules! storage_tests {
    ($($name:ident),* $(,)*) => {
        mod dense {
            $(
                #[test]
                fn $name() {
                    super::$name::<crate::DenseStorage<u64>>();
                }
            )*
        }

        mod packed {
            $(
                #[test]
                fn $name() {
                    super::$name::<crate::PackedStorage>();
                }
            )*
        }
    };
}
