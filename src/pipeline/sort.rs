use std::cmp::Ordering;

use crate::metrics;
use crate::model::Item;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    ByReplications,
    BySuccessRatio,
    ByRecency,
}

impl SortKey {
    /// Exact token match after trimming; `REP` is not `rep`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "rep" => Some(Self::ByReplications),
            "sr" => Some(Self::BySuccessRatio),
            "new" => Some(Self::ByRecency),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Self::ByReplications => "rep",
            Self::BySuccessRatio => "sr",
            Self::ByRecency => "new",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::ByReplications => "Sort: Replications",
            Self::BySuccessRatio => "Sort: Success%",
            Self::ByRecency => "Sort: Newest",
        }
    }

    pub const ALL: [SortKey; 3] = [
        SortKey::ByReplications,
        SortKey::BySuccessRatio,
        SortKey::ByRecency,
    ];
}

fn compare(a: &Item, b: &Item, key: SortKey) -> Ordering {
    match key {
        SortKey::ByReplications => b.metrics.replications.cmp(&a.metrics.replications),
        SortKey::BySuccessRatio => {
            metrics::comparison_ratio(b).total_cmp(&metrics::comparison_ratio(a))
        }
        SortKey::ByRecency => {
            let a = a.updated_at.as_deref().unwrap_or_default();
            let b = b.updated_at.as_deref().unwrap_or_default();
            b.cmp(a)
        }
    }
}

/// Descending, stable sort into a new sequence. The input is left untouched.
pub fn sort<'a>(items: &[&'a Item], key: SortKey) -> Vec<&'a Item> {
    let mut out = items.to_vec();
    out.sort_by(|a, b| compare(a, b, key));
    out
}
