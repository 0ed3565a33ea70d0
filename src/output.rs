//! Human readable renderings of a histogram.

use crate::storage::CountsStorage;
use crate::Histogram;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// The commonly reported percentiles of a histogram, as a serde-friendly value.
///
/// ```
/// use hdrpack::DenseHistogram;
///
/// let mut h = DenseHistogram::<u64>::new(3).unwrap();
/// for v in 1..=1000 {
///     h.record(v).unwrap();
/// }
/// let summary = h.summary();
/// assert_eq!(500, summary.p50);
/// assert_eq!(1000, summary.max);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramSummary {
    /// 50th percentile.
    pub p50: u64,
    /// 75th percentile.
    pub p75: u64,
    /// 90th percentile.
    pub p90: u64,
    /// 97.5th percentile.
    #[serde(rename = "p97.5")]
    pub p97_5: u64,
    /// 99th percentile.
    pub p99: u64,
    /// 99.9th percentile.
    #[serde(rename = "p99.9")]
    pub p99_9: u64,
    /// 99.99th percentile.
    #[serde(rename = "p99.99")]
    pub p99_99: u64,
    /// 99.999th percentile.
    #[serde(rename = "p99.999")]
    pub p99_999: u64,
    /// Highest recorded value.
    pub max: u64,
    /// Number of recorded samples.
    pub total_count: u64,
}

impl<S: CountsStorage> Histogram<S> {
    /// Snapshot of the usual reporting percentiles.
    pub fn summary(&self) -> HistogramSummary {
        HistogramSummary {
            p50: self.value_at_percentile(50.0),
            p75: self.value_at_percentile(75.0),
            p90: self.value_at_percentile(90.0),
            p97_5: self.value_at_percentile(97.5),
            p99: self.value_at_percentile(99.0),
            p99_9: self.value_at_percentile(99.9),
            p99_99: self.value_at_percentile(99.99),
            p99_999: self.value_at_percentile(99.999),
            max: self.max(),
            total_count: self.len(),
        }
    }

    /// Write the percentile distribution table in the layout shared by the HdrHistogram tools
    /// (and understood by the HdrHistogram plotter).
    ///
    /// Values are divided by `output_value_unit_scaling_ratio` and printed with as many decimal
    /// places as the histogram has significant digits. `ticks_per_half_distance` is passed to
    /// `iter_percentiles`.
    ///
    /// ```
    /// use hdrpack::DenseHistogram;
    ///
    /// let mut h = DenseHistogram::<u64>::new_with_max(1000, 2).unwrap();
    /// h.record(7).unwrap();
    /// h.record(42).unwrap();
    ///
    /// let mut out = Vec::new();
    /// h.output_percentile_distribution(&mut out, 5, 1.0).unwrap();
    /// let text = String::from_utf8(out).unwrap();
    /// assert!(text.starts_with("       Value     Percentile TotalCount 1/(1-Percentile)\n\n"));
    /// assert!(text.contains("#[Max     =        42.00, Total count    =            2]"));
    /// ```
    pub fn output_percentile_distribution<W: Write>(
        &self,
        writer: &mut W,
        ticks_per_half_distance: u32,
        output_value_unit_scaling_ratio: f64,
    ) -> io::Result<()> {
        let digits = usize::from(self.significant_value_digits);
        let scale = |v: f64| v / output_value_unit_scaling_ratio;

        write!(
            writer,
            "{:>12} {:>14} {:>10} {:>14}\n\n",
            "Value", "Percentile", "TotalCount", "1/(1-Percentile)"
        )?;

        for v in self.iter_percentiles(ticks_per_half_distance) {
            let value = scale(v.value_iterated_to() as f64);
            let fraction = v.percentile_iterated_to() / 100.0;
            if v.percentile_iterated_to() < 100.0 {
                writeln!(
                    writer,
                    "{:12.*} {:2.12} {:10} {:14.2}",
                    digits,
                    value,
                    fraction,
                    v.total_count_to_value(),
                    1.0 / (1.0 - fraction)
                )?;
            } else {
                writeln!(
                    writer,
                    "{:12.*} {:2.12} {:10}",
                    digits,
                    value,
                    fraction,
                    v.total_count_to_value()
                )?;
            }
        }

        writeln!(
            writer,
            "#[Mean    = {:12.*}, StdDeviation   = {:12.*}]",
            digits,
            scale(self.mean()),
            digits,
            scale(self.stdev())
        )?;
        writeln!(
            writer,
            "#[Max     = {:12.*}, Total count    = {:12}]",
            digits,
            scale(self.max() as f64),
            self.len()
        )?;
        writeln!(
            writer,
            "#[Buckets = {:12}, SubBuckets     = {:12}]",
            self.bucket_count, self.sub_bucket_count
        )
    }
}
