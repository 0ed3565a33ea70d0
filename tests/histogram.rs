//! Construction, recording, merging and the value equivalence helpers.

use hdrpack::storage::CountsStorage;
use hdrpack::{
    AdditionError, CreationError, DenseHistogram, Histogram, PackedHistogram, RecordError,
};
use std::borrow::Borrow;
use std::fmt;

macro_rules! assert_near {
    ($a: expr, $b: expr, $tolerance: expr) => {{
        let a = $a as f64;
        let b = $b as f64;
        let tol = $tolerance as f64;
        assert!(
            (a - b).abs() <= b * tol,
            "assertion failed: `(left ~= right) (left: `{}`, right: `{}`, tolerance: `{:.5}%`)",
            a,
            b,
            100.0 * tol
        );
    }};
}

fn verify_max<S: CountsStorage, B: Borrow<Histogram<S>>>(hist: B) -> bool {
    let hist = hist.borrow();
    if let Some(mx) = hist
        .iter_recorded()
        .map(|v| v.value_iterated_to())
        .map(|v| hist.highest_equivalent(v))
        .last()
    {
        hist.max() == mx
    } else {
        hist.max() == 0
    }
}

const TRACKABLE_MAX: u64 = 3600 * 1000 * 1000;
const SIGFIG: u8 = 3;
const TEST_VALUE_LEVEL: u64 = 4;

#[test]
fn construction_arg_ranges() {
    assert_eq!(
        CreationError::HighLessThanTwiceLow,
        DenseHistogram::<u64>::new_with_max(1, SIGFIG).unwrap_err()
    );
    assert_eq!(
        CreationError::SigFigExceedsMax,
        DenseHistogram::<u64>::new_with_max(TRACKABLE_MAX, 6).unwrap_err()
    );
    assert_eq!(
        CreationError::LowIsZero,
        PackedHistogram::new_with_bounds(0, TRACKABLE_MAX, SIGFIG).unwrap_err()
    );
}

#[test]
fn empty_histogram() {
    let h = DenseHistogram::<u64>::new(SIGFIG).unwrap();
    assert_eq!(h.min(), 0);
    assert_eq!(h.max(), 0);
    assert_eq!(h.min_nz(), u64::max_value());
    assert!(h.is_empty());
    assert_near!(h.mean(), 0.0, 0.0000000000001);
    assert_near!(h.stdev(), 0.0, 0.0000000000001);
    assert_near!(h.percentile_below(0), 100.0, 0.0000000000001);
    assert_eq!(0, h.value_at_percentile(50.0));
    assert_eq!(0, h.iter_recorded().count());
    assert!(verify_max(h));
}

#[test]
fn construction_arg_gets() {
    let h = DenseHistogram::<u64>::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    assert_eq!(h.low(), 1);
    assert_eq!(h.high(), TRACKABLE_MAX);
    assert_eq!(h.sigfig(), SIGFIG);
    assert!(!h.is_auto());

    let h = DenseHistogram::<u64>::new_with_bounds(1000, TRACKABLE_MAX, SIGFIG).unwrap();
    assert_eq!(h.low(), 1000);

    let h = PackedHistogram::new(SIGFIG).unwrap();
    assert!(h.is_auto());
}

#[test]
fn construction_2_pow_53_layout() {
    let h = DenseHistogram::<u64>::new_with_bounds(1, 9_007_199_254_740_991, 3).unwrap();
    assert_eq!(2048, h.sub_buckets());
    assert_eq!(43, h.buckets());
    assert_eq!(45056, h.distinct_values());

    // straddling the first bucket boundary at 2048
    assert_eq!(Some(2000), h.index_for(2000));
    assert_eq!(Some(2049), h.index_for(2050));
}

#[test]
fn record() {
    let mut h = DenseHistogram::<u64>::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    h += TEST_VALUE_LEVEL;
    assert_eq!(h.count_at(TEST_VALUE_LEVEL), 1);
    assert_eq!(h.len(), 1);
    assert!(verify_max(h));
}

#[test]
fn record_mean_and_stdev() {
    let mut h = PackedHistogram::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    h.record(25).unwrap();
    h.record(50).unwrap();
    h.record(75).unwrap();

    assert_near!(h.mean(), 50.0, 0.0000000000001);
    let stdev = h.stdev();
    assert!(stdev > 20.4124 && stdev < 20.4125, "stdev {}", stdev);
    assert_eq!(50, h.value_at_percentile(50.0));
}

#[test]
fn record_overflow() {
    let mut h = DenseHistogram::<u64>::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    assert_eq!(
        Err(RecordError::ValueOutOfRangeResizeDisabled),
        h.record(3 * TRACKABLE_MAX)
    );
    assert_eq!(0, h.len());
    assert!(verify_max(h));
}

#[test]
fn record_n_is_n_records() {
    let mut once: DenseHistogram = Histogram::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    let mut many: DenseHistogram = Histogram::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();

    for &v in &[3, 2_500, 77_777, 12_345_678] {
        once.record_n(v, 17).unwrap();
        for _ in 0..17 {
            many.record(v).unwrap();
        }
    }

    assert_eq!(once, many);
    assert_eq!(once.len(), many.len());
    assert_eq!(once.max(), many.max());
    assert_eq!(once.min_nz(), many.min_nz());
}

#[test]
fn record_zero_count_changes_nothing() {
    let mut h = DenseHistogram::<u64>::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    h.record_n(1_000, 0).unwrap();
    assert_eq!(0, h.len());
    assert_eq!(0, h.max());
    assert_eq!(u64::max_value(), h.min_nz());
}

#[test]
fn create_with_large_values() {
    let mut h = DenseHistogram::<u64>::new_with_bounds(20000000, 100000000, 5).unwrap();

    h += 100000000;
    h += 20000000;
    h += 30000000;

    assert!(h.equivalent(20000000, h.value_at_percentile(50.0)));
    assert!(h.equivalent(30000000, h.value_at_percentile(83.33)));
    assert!(h.equivalent(100000000, h.value_at_percentile(83.34)));
    assert!(h.equivalent(100000000, h.value_at_percentile(99.0)));
}

#[test]
fn record_in_interval() {
    let mut h = DenseHistogram::<u64>::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    h.record_correct(TEST_VALUE_LEVEL, TEST_VALUE_LEVEL / 4)
        .unwrap();
    let mut r = DenseHistogram::<u64>::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    r += TEST_VALUE_LEVEL;

    // The data will include corrected samples:
    assert_eq!(h.count_at((TEST_VALUE_LEVEL * 1) / 4), 1);
    assert_eq!(h.count_at((TEST_VALUE_LEVEL * 2) / 4), 1);
    assert_eq!(h.count_at((TEST_VALUE_LEVEL * 3) / 4), 1);
    assert_eq!(h.count_at((TEST_VALUE_LEVEL * 4) / 4), 1);
    assert_eq!(h.len(), 4);
    // But the raw data will not:
    assert_eq!(r.count_at((TEST_VALUE_LEVEL * 1) / 4), 0);
    assert_eq!(r.count_at((TEST_VALUE_LEVEL * 2) / 4), 0);
    assert_eq!(r.count_at((TEST_VALUE_LEVEL * 3) / 4), 0);
    assert_eq!(r.count_at((TEST_VALUE_LEVEL * 4) / 4), 1);
    assert_eq!(r.len(), 1);

    assert!(verify_max(h));
}

#[test]
fn record_in_interval_single_synthetic_sample() {
    let mut h = PackedHistogram::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    h.record_correct(207, 100).unwrap();

    assert_eq!(2, h.len());
    assert_eq!(107, h.min_nz());
    assert_eq!(207, h.max());
}

#[test]
fn record_in_interval_is_all_or_nothing() {
    let mut h = DenseHistogram::<u64>::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    h.record_n(1, u64::max_value() - 10).unwrap();

    // would add 100 samples
    assert_eq!(
        Err(RecordError::CountOverflow),
        h.record_correct(10_000, 100)
    );
    assert_eq!(u64::max_value() - 10, h.len());
    assert_eq!(0, h.count_at(10_000));
    assert_eq!(1, h.max());
}

#[test]
fn reset() {
    let mut h = DenseHistogram::<u64>::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    h += TEST_VALUE_LEVEL;
    h.reset();

    assert_eq!(h.count_at(TEST_VALUE_LEVEL), 0);
    assert_eq!(h.len(), 0);
    assert!(verify_max(h));
}

#[test]
fn add() {
    let mut h1 = DenseHistogram::<u64>::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    let mut h2 = DenseHistogram::<u64>::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();

    h1 += TEST_VALUE_LEVEL;
    h1 += 1000 * TEST_VALUE_LEVEL;
    h2 += TEST_VALUE_LEVEL;
    h2 += 1000 * TEST_VALUE_LEVEL;
    h1 += &h2;

    assert_eq!(h1.count_at(TEST_VALUE_LEVEL), 2);
    assert_eq!(h1.count_at(1000 * TEST_VALUE_LEVEL), 2);
    assert_eq!(h1.len(), 4);

    let mut big = DenseHistogram::<u64>::new_with_max(2 * TRACKABLE_MAX, SIGFIG).unwrap();
    big += TEST_VALUE_LEVEL;
    big += 1000 * TEST_VALUE_LEVEL;
    big += 2 * TRACKABLE_MAX;

    // Adding the smaller histogram to the bigger one should work:
    big += &h1;
    assert_eq!(big.count_at(TEST_VALUE_LEVEL), 3);
    assert_eq!(big.count_at(1000 * TEST_VALUE_LEVEL), 3);
    assert_eq!(big.count_at(2 * TRACKABLE_MAX), 1); // overflow smaller hist...
    assert_eq!(big.len(), 7);

    // But trying to add a larger histogram into a smaller one should fail, and leave it alone:
    let before = h1.clone();
    assert_eq!(
        AdditionError::OtherAddendValueExceedsRange,
        h1.add(&big).unwrap_err()
    );
    assert_eq!(before, h1);

    assert!(verify_max(h1));
    assert!(verify_max(h2));
    assert!(verify_max(big));
}

#[test]
fn add_larger_into_auto_resizing() {
    let mut small = PackedHistogram::new(SIGFIG).unwrap();
    small += TEST_VALUE_LEVEL;

    let mut big = DenseHistogram::<u32>::new_with_max(2 * TRACKABLE_MAX, SIGFIG).unwrap();
    big += 2 * TRACKABLE_MAX;

    small.add(&big).unwrap();
    assert_eq!(2, small.len());
    assert_eq!(1, small.count_at(2 * TRACKABLE_MAX));
    assert!(small.high() >= 2 * TRACKABLE_MAX);
    assert!(verify_max(small));
}

#[test]
fn add_with_different_precision() {
    let mut coarse = DenseHistogram::<u64>::new_with_max(TRACKABLE_MAX, 2).unwrap();
    let mut fine = DenseHistogram::<u64>::new_with_max(TRACKABLE_MAX, 4).unwrap();

    for v in (1_000..2_000_000).step_by(7_919) {
        fine.record(v).unwrap();
    }
    coarse.add(&fine).unwrap();

    assert_eq!(fine.len(), coarse.len());
    for &p in &[10.0, 50.0, 90.0, 99.0, 100.0] {
        assert!(coarse.equivalent(
            coarse.value_at_percentile(p),
            fine.value_at_percentile(p)
        ));
    }
}

#[test]
fn add_count_overflow_leaves_target_alone() {
    let mut h1 = DenseHistogram::<u8>::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    let mut h2 = DenseHistogram::<u8>::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();

    h1.record_n(10, 200).unwrap();
    h1.record_n(20, 1).unwrap();
    h2.record_n(20, 1).unwrap();
    h2.record_n(10, 100).unwrap();

    let before = h1.clone();
    assert_eq!(AdditionError::CountOverflow, h1.add(&h2).unwrap_err());
    assert_eq!(before, h1);
    assert_eq!(1, h1.count_at(20));
}

#[test]
fn add_widens_timestamps() {
    let mut h1 = DenseHistogram::<u64>::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    let mut h2 = DenseHistogram::<u64>::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();

    h1.set_start_timestamp(2_000);
    h1.set_end_timestamp(3_000);
    h2.set_start_timestamp(1_000);
    h2.set_end_timestamp(2_500);

    h1.add(&h2).unwrap();
    assert_eq!(Some(1_000), h1.start_timestamp());
    assert_eq!(Some(3_000), h1.end_timestamp());
}

#[test]
fn equivalent_range() {
    let h = DenseHistogram::<u64>::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    assert_eq!(h.equivalent_range(1), 1);
    assert_eq!(h.equivalent_range(2500), 2);
    assert_eq!(h.equivalent_range(8191), 4);
    assert_eq!(h.equivalent_range(8192), 8);
    assert_eq!(h.equivalent_range(10000), 8);
}

#[test]
fn scaled_equivalent_range() {
    let h = DenseHistogram::<u64>::new_with_bounds(1024, TRACKABLE_MAX, SIGFIG).unwrap();
    assert_eq!(h.equivalent_range(1 * 1024), 1 * 1024);
    assert_eq!(h.equivalent_range(2500 * 1024), 2 * 1024);
    assert_eq!(h.equivalent_range(8191 * 1024), 4 * 1024);
    assert_eq!(h.equivalent_range(8192 * 1024), 8 * 1024);
    assert_eq!(h.equivalent_range(10000 * 1024), 8 * 1024);
}

#[test]
fn lowest_equivalent() {
    let h = DenseHistogram::<u64>::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    assert_eq!(h.lowest_equivalent(10007), 10000);
    assert_eq!(h.lowest_equivalent(10009), 10008);
}

#[test]
fn scaled_lowest_equivalent() {
    let h = DenseHistogram::<u64>::new_with_bounds(1024, TRACKABLE_MAX, SIGFIG).unwrap();
    assert_eq!(h.lowest_equivalent(10007 * 1024), 10000 * 1024);
    assert_eq!(h.lowest_equivalent(10009 * 1024), 10008 * 1024);
}

#[test]
fn highest_equivalent() {
    let h = DenseHistogram::<u64>::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    assert_eq!(h.highest_equivalent(8180), 8183);
    assert_eq!(h.highest_equivalent(8191), 8191);
    assert_eq!(h.highest_equivalent(8193), 8199);
    assert_eq!(h.highest_equivalent(9995), 9999);
    assert_eq!(h.highest_equivalent(10007), 10007);
    assert_eq!(h.highest_equivalent(10008), 10015);
}

#[test]
fn scaled_highest_equivalent() {
    let h = DenseHistogram::<u64>::new_with_bounds(1024, TRACKABLE_MAX, SIGFIG).unwrap();
    assert_eq!(h.highest_equivalent(8180 * 1024), 8183 * 1024 + 1023);
    assert_eq!(h.highest_equivalent(8191 * 1024), 8191 * 1024 + 1023);
    assert_eq!(h.highest_equivalent(8193 * 1024), 8199 * 1024 + 1023);
    assert_eq!(h.highest_equivalent(9995 * 1024), 9999 * 1024 + 1023);
    assert_eq!(h.highest_equivalent(10007 * 1024), 10007 * 1024 + 1023);
    assert_eq!(h.highest_equivalent(10008 * 1024), 10015 * 1024 + 1023);
}

#[test]
fn median_equivalent() {
    let h = DenseHistogram::<u64>::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    assert_eq!(h.median_equivalent(4), 4);
    assert_eq!(h.median_equivalent(5), 5);
    assert_eq!(h.median_equivalent(4000), 4001);
    assert_eq!(h.median_equivalent(8000), 8002);
    assert_eq!(h.median_equivalent(10007), 10004);
}

#[test]
fn scaled_median_equivalent() {
    let h = DenseHistogram::<u64>::new_with_bounds(1024, TRACKABLE_MAX, SIGFIG).unwrap();
    assert_eq!(h.median_equivalent(1024 * 4), 1024 * 4 + 512);
    assert_eq!(h.median_equivalent(1024 * 5), 1024 * 5 + 512);
    assert_eq!(h.median_equivalent(1024 * 4000), 1024 * 4001);
    assert_eq!(h.median_equivalent(1024 * 8000), 1024 * 8002);
    assert_eq!(h.median_equivalent(1024 * 10007), 1024 * 10004);
}

#[test]
fn index_round_trips_across_range() {
    let h = PackedHistogram::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    let mut last_index = 0;
    for value in (0..TRACKABLE_MAX).step_by(99_991) {
        let index = h.index_for(value).unwrap();
        let back = h.value_for(index);
        assert!(h.lowest_equivalent(value) <= back && back <= h.highest_equivalent(value));
        assert!(index >= last_index);
        last_index = index;
    }
}

#[test]
fn overflow() {
    let mut h = DenseHistogram::<u16>::new_with_max(TRACKABLE_MAX, 2).unwrap();
    h += TEST_VALUE_LEVEL;
    h += 10 * TEST_VALUE_LEVEL;
    // This should overflow a u16 cell:
    let max = h.high();
    assert_eq!(
        Err(RecordError::CountOverflow),
        h.record_n(max - 1, 70_000)
    );
    assert_eq!(2, h.len());
}

fn are_equal<S1, S2, B1, B2>(actual: B1, expected: B2)
where
    S1: CountsStorage,
    S2: CountsStorage,
    B1: Borrow<Histogram<S1>>,
    B2: Borrow<Histogram<S2>>,
    Histogram<S1>: fmt::Debug + PartialEq<Histogram<S2>>,
{
    let actual = actual.borrow();
    let expected = expected.borrow();

    assert!(actual == expected);
    assert_eq!(
        actual.count_at(TEST_VALUE_LEVEL),
        expected.count_at(TEST_VALUE_LEVEL)
    );
    assert_eq!(
        actual.count_at(10 * TEST_VALUE_LEVEL),
        expected.count_at(10 * TEST_VALUE_LEVEL)
    );
    assert_eq!(actual.len(), expected.len());
    assert!(verify_max(expected));
    assert!(verify_max(actual));
}

#[test]
fn clone() {
    let mut h = DenseHistogram::<u64>::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    h += TEST_VALUE_LEVEL;
    h += 10 * TEST_VALUE_LEVEL;

    let max = h.high();
    h.record_correct(max - 1, 31000).unwrap();

    are_equal(h.clone(), h);
}

#[test]
fn scaled_clone() {
    let mut h = DenseHistogram::<u64>::new_with_bounds(1000, TRACKABLE_MAX, SIGFIG).unwrap();
    h += TEST_VALUE_LEVEL;
    h += 10 * TEST_VALUE_LEVEL;

    let max = h.high();
    h.record_correct(max - 1, 31000).unwrap();

    are_equal(h.clone(), h);
}

#[test]
fn new_from_copies_layout_into_other_storage() {
    let mut h = DenseHistogram::<u64>::new_with_bounds(1000, TRACKABLE_MAX, SIGFIG).unwrap();
    h += 10 * TEST_VALUE_LEVEL;
    h.set_tag("latency");

    let mut packed = PackedHistogram::new_from(&h);
    assert_eq!(0, packed.len());
    assert_eq!(h.config(), packed.config());
    assert_eq!(h.distinct_values(), packed.distinct_values());

    packed.set_to(&h).unwrap();
    are_equal(packed, h);
}

#[test]
fn clone_correct_matches_record_correct() {
    let mut raw = DenseHistogram::<u64>::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    let mut corrected = DenseHistogram::<u64>::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    // all below 2048, so every value is its own cell
    for &v in &[1_000, 1_000, 1_900, 1_000, 2_000] {
        raw += v;
        corrected.record_correct(v, 300).unwrap();
    }

    assert_eq!(corrected, raw.clone_correct(300).unwrap());

    let mut via_add = DenseHistogram::<u64>::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    via_add.add_correct(&raw, 300).unwrap();
    assert_eq!(corrected, via_add);
}

#[test]
fn tag_defaults_and_survives_reset() {
    let mut h = PackedHistogram::new(SIGFIG).unwrap();
    assert_eq!(hdrpack::NO_TAG, h.tag());

    h.set_tag("api");
    h += 5;
    h.reset();
    assert_eq!("api", h.tag());
}

#[test]
fn record_n_correct_scales_synthetic_samples() {
    let mut h = DenseHistogram::<u64>::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    h.record_n_correct(1_000, 3, 250).unwrap();

    // 1000, 750, 500 and 250, three of each
    assert_eq!(12, h.len());
    assert_eq!(3, h.count_at(250));
    assert_eq!(3, h.count_at(750));
    assert_eq!(0, h.count_at(1_250));
    assert_eq!(250, h.min_nz());

    // no correction below the interval
    h.record_n_correct(100, 2, 250).unwrap();
    assert_eq!(14, h.len());
    assert_eq!(2, h.count_at(100));
}

#[test]
fn set_to_corrected_replaces_contents() {
    let mut source = DenseHistogram::<u64>::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    source.record(1_000).unwrap();

    let mut target = PackedHistogram::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    target.record_n(77, 40).unwrap();
    target.set_to_corrected(&source, 500).unwrap();

    assert_eq!(2, target.len());
    assert_eq!(0, target.count_at(77));
    assert_eq!(1, target.count_at(500));
    assert_eq!(1, target.count_at(1_000));
}

#[test]
fn establish_internal_tracking_values_after_clear() {
    let mut h = DenseHistogram::<u64>::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    h.record(10).unwrap();
    h.record(1_000).unwrap();

    h.clear();
    // clear keeps the old extremes until a restat
    assert_eq!(1_000, h.max());
    h.establish_internal_tracking_values();
    assert_eq!(0, h.max());
    assert_eq!(u64::max_value(), h.min_nz());
    assert_eq!(0, h.len());
}

#[test]
fn record_n_correct_overflow_records_nothing() {
    let mut h = DenseHistogram::<u8>::new_with_max(1_000, SIGFIG).unwrap();
    h.record_n(100, 200).unwrap();

    // 300, 200 and 100, a hundred each; the cell for 100 cannot take another hundred
    assert_eq!(Err(RecordError::CountOverflow), h.record_n_correct(300, 100, 100));
    assert_eq!(200, h.len());
    assert_eq!(0, h.count_at(300));
    assert_eq!(0, h.count_at(200));
    assert_eq!(200, h.count_at(100));
    assert_eq!(100, h.max());

    h.record_n_correct(300, 55, 100).unwrap();
    assert_eq!(255, h.count_at(100));
    assert_eq!(55, h.count_at(300));
    assert_eq!(365, h.len());
}

#[test]
fn record_n_correct_overflow_does_not_resize() {
    let mut h = DenseHistogram::<u8>::new_with_bounds(1, 2047, SIGFIG).unwrap();
    h.auto(true);
    h.record_n(1_000, 250).unwrap();

    // the last synthetic sample lands on 1000 and overflows it
    assert_eq!(
        Err(RecordError::CountOverflow),
        h.record_n_correct(1_000_000, 10, 1_000)
    );
    assert_eq!(2048, h.distinct_values());
    assert_eq!(2047, h.high());
    assert_eq!(250, h.len());
    assert_eq!(1_000, h.max());

    h.record_n_correct(1_000_000, 5, 1_000).unwrap();
    assert!(h.distinct_values() > 2048);
    assert_eq!(255, h.count_at(1_000));
    assert_eq!(250 + 5 * 1_000, h.len());
}

#[test]
fn record_n_correct_out_of_range_records_nothing() {
    let mut h = PackedHistogram::new_with_bounds(1, 2047, SIGFIG).unwrap();
    assert_eq!(
        Err(RecordError::ValueOutOfRangeResizeDisabled),
        h.record_n_correct(4_000, 1, 1_000)
    );
    assert_eq!(0, h.len());
    assert_eq!(0, h.count_at(1_000));
}

#[test]
fn clone_correct_reports_overflow() {
    let mut h = DenseHistogram::<u8>::new_with_max(1_000, SIGFIG).unwrap();
    h.record_n(200, 200).unwrap();
    h.record_n(300, 200).unwrap();

    // 300 spills 200 synthetic samples onto 200, which already holds 200
    assert_eq!(Err(RecordError::CountOverflow), h.clone_correct(100).map(|_| ()));

    let mut target = DenseHistogram::<u8>::new_with_max(1_000, SIGFIG).unwrap();
    target.record(700).unwrap();
    assert_eq!(Err(RecordError::CountOverflow), target.add_correct(&h, 100));
    assert_eq!(1, target.len());
    assert_eq!(0, target.count_at(200));
    assert_eq!(700, target.max());

    let corrected = h.clone_correct(1_000).unwrap();
    assert_eq!(h, corrected);
}
