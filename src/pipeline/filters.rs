use std::collections::BTreeSet;
use std::fmt;

use itertools::Itertools;

use crate::model::Item;

pub const STATUS_MARKER: &str = "status:";

/// Allow-list of lower-cased status tags. A blank entry (as in `master,`)
/// is kept and admits items without a status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusSet(BTreeSet<String>);

impl Default for StatusSet {
    fn default() -> Self {
        Self::from_iter(["master", "grand"])
    }
}

impl<S: AsRef<str>> FromIterator<S> for StatusSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .collect(),
        )
    }
}

impl StatusSet {
    pub fn parse_csv(input: &str) -> Self {
        input.split(',').collect()
    }

    /// Parses a `status:a,b` filter spec. Returns `None` when the marker is
    /// missing, leaving the default to the caller. `status:` alone yields
    /// the single blank entry.
    pub fn parse_filter_spec(spec: &str) -> Option<Self> {
        let spec = spec.trim().to_lowercase();
        spec.strip_prefix(STATUS_MARKER).map(Self::parse_csv)
    }

    /// True when every comma-separated entry of `input` is blank.
    pub fn is_blank_list(input: &str) -> bool {
        input.split(',').all(|s| s.trim().is_empty())
    }

    pub fn contains(&self, status: &str) -> bool {
        self.0.contains(status)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for StatusSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join(","))
    }
}

pub fn status_matches(item: &Item, statuses: &StatusSet) -> bool {
    statuses.contains(&item.status_lower())
}

/// Text predicate over `title`, space-joined `tags` and `status`.
/// An empty query matches everything.
pub fn query_matches(item: &Item, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let query = query.to_lowercase();
    let haystack = [
        item.title.as_deref().unwrap_or_default().to_string(),
        item.tags.join(" "),
        item.status.as_deref().unwrap_or_default().to_string(),
    ]
    .join(" ")
    .to_lowercase();
    haystack.contains(&query)
}

pub fn filter<'a, I>(items: I, statuses: &StatusSet, query: &str) -> Vec<&'a Item>
where
    I: IntoIterator<Item = &'a Item>,
{
    items
        .into_iter()
        .filter(|item| status_matches(item, statuses))
        .filter(|item| query_matches(item, query))
        .collect()
}
