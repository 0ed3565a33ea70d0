use crate::errors::CreationError;
use crate::storage::CountsStorage;
use crate::Histogram;
use serde::{Deserialize, Serialize};

/// The construction parameters of a histogram, as a plain value that can be loaded from (or
/// written to) any serde format.
///
/// Missing fields take their default: lowest discernible value 1, highest trackable value 2,
/// 3 significant digits, and auto-resize on. That is, an empty configuration describes the same
/// histogram as `Histogram::new(3)`.
///
/// ```
/// use hdrpack::{HistogramConfig, PackedHistogram};
///
/// let config: HistogramConfig =
///     serde_json::from_str(r#"{"highestTrackableValue": 3600000000, "autoResize": false}"#)
///         .unwrap();
/// let h: PackedHistogram = config.build().unwrap();
/// assert_eq!(3_600_000_000, h.high());
/// assert!(!h.is_auto());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistogramConfig {
    /// Smallest value distinguishable from 0. At least 1.
    pub lowest_discernible_value: u64,
    /// Highest value the histogram covers before resizing. At least twice the lowest
    /// discernible value.
    pub highest_trackable_value: u64,
    /// Decimal digits of precision, in [0, 5].
    pub significant_value_digits: u8,
    /// Whether recording a value above the range grows the histogram.
    pub auto_resize: bool,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        HistogramConfig {
            lowest_discernible_value: 1,
            highest_trackable_value: 2,
            significant_value_digits: 3,
            auto_resize: true,
        }
    }
}

impl HistogramConfig {
    /// Construct an empty histogram with these parameters, using storage `S`.
    pub fn build<S: CountsStorage>(&self) -> Result<Histogram<S>, CreationError> {
        let mut h = Histogram::new_with_bounds(
            self.lowest_discernible_value,
            self.highest_trackable_value,
            self.significant_value_digits,
        )?;
        h.auto(self.auto_resize);
        Ok(h)
    }
}
