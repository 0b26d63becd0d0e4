pub mod filters;
pub mod sort;

pub use filters::StatusSet;
pub use sort::SortKey;

use crate::model::Item;

/// Inputs for one derivation of the visible list.
#[derive(Clone, Copy, Debug)]
pub struct ViewQuery<'a> {
    pub statuses: &'a StatusSet,
    pub query: &'a str,
    pub sort: SortKey,
    /// `<= 0` means unbounded.
    pub limit: i64,
}

/// Filter, then sort, then cap. The order matters once `limit` is smaller
/// than the filtered set.
pub fn derive<'a>(items: &'a [Item], view: ViewQuery<'_>) -> Vec<&'a Item> {
    let filtered = filters::filter(items, view.statuses, view.query);
    let mut sorted = sort::sort(&filtered, view.sort);
    if let Ok(limit) = usize::try_from(view.limit) {
        if limit > 0 {
            sorted.truncate(limit);
        }
    }
    sorted
}
