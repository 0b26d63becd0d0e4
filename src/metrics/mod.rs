use serde::Serialize;

use crate::model::Item;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RatioBand {
    Good,
    Mid,
    Bad,
}

impl RatioBand {
    pub fn from_percent(percent: u64) -> Self {
        if percent >= 80 {
            Self::Good
        } else if percent >= 50 {
            Self::Mid
        } else {
            Self::Bad
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Mid => "mid",
            Self::Bad => "bad",
        }
    }
}

/// Display ratio of `success / replications`, or `0` when nothing was replicated.
///
/// Counters are not cross-checked, so the result can exceed `1.0` for
/// inconsistent records.
pub fn ratio(item: &Item) -> f64 {
    let rep = item.metrics.replications;
    if rep == 0 {
        return 0.0;
    }
    item.metrics.success as f64 / rep as f64
}

/// Ratio used by the success-ratio sort. Zero replications compare with a
/// denominator of one instead of collapsing to zero like [`ratio`].
pub fn comparison_ratio(item: &Item) -> f64 {
    item.metrics.success as f64 / item.metrics.replications.max(1) as f64
}

pub fn success_percent(item: &Item) -> u64 {
    (ratio(item) * 100.0).round() as u64
}

pub fn band(item: &Item) -> RatioBand {
    RatioBand::from_percent(success_percent(item))
}
