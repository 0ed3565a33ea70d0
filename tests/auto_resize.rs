//! Histograms created with `new` grow their counts array as larger values are recorded.

use hdrpack::{DenseHistogram, Histogram, PackedHistogram};

#[test]
fn autosizing_edges() {
    let mut histogram = DenseHistogram::<u64>::new(3).unwrap();
    histogram += (1_u64 << 62) - 1;
    assert_eq!(histogram.buckets(), 52);
    assert_eq!(histogram.distinct_values(), 54272);
    histogram += u64::max_value() >> 1;
    assert_eq!(histogram.buckets(), 53);
    assert_eq!(histogram.distinct_values(), 55296);
}

#[test]
fn autosizing() {
    let mut histogram = PackedHistogram::new(3).unwrap();
    for i in 0..63 {
        histogram += 1_u64 << i;
    }
    assert_eq!(histogram.buckets(), 53);
    assert_eq!(histogram.distinct_values(), 55296);
    assert_eq!(histogram.len(), 63);
}

#[test]
fn autosizing_add() {
    let mut histogram1 = DenseHistogram::<u64>::new(2).unwrap();
    let mut histogram2 = DenseHistogram::<u64>::new(2).unwrap();

    histogram1 += 1000;
    histogram1 += 1000000000;

    histogram2 += &histogram1;
    assert!(histogram2.equivalent(histogram2.max(), 1000000000));
}

#[test]
fn autosizing_across_continuous_range() {
    let mut histogram = DenseHistogram::<u64>::new(2).unwrap();

    for i in 0..10000000 {
        histogram += i;
    }
    assert_eq!(10000000, histogram.len());
}

#[test]
fn packed_grows_from_smallest_range() {
    let mut histogram = PackedHistogram::new_with_bounds(1, 2, 3).unwrap();
    histogram.auto(true);

    histogram.record(123456).unwrap();
    assert_eq!(1, histogram.len());
    assert_eq!(1, histogram.count_at(123456));
    assert!(histogram.high() >= 123456);
    assert_eq!(histogram.highest_equivalent(123456), histogram.max());
}

#[test]
fn resize_keeps_existing_counts() {
    let mut histogram: Histogram = Histogram::new_with_max(10_000, 3).unwrap();
    histogram.record_n(5_000, 9).unwrap();
    let len_before = histogram.distinct_values();

    histogram.resize(1 << 40).unwrap();
    assert!(histogram.distinct_values() > len_before);
    assert_eq!(9, histogram.count_at(5_000));
    assert!(histogram.high() >= 1 << 40);

    // shrinking is a no-op
    histogram.resize(100).unwrap();
    assert!(histogram.high() >= 1 << 40);
    assert!(!histogram.is_auto());
}
