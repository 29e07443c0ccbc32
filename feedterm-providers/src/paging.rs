//! Client-side pagination for upstreams that return whole lists

use feedterm_core::Query;

/// Take the window of `items` that `query` asks for
///
/// Pages past the end come back empty.
pub fn slice_page<T>(items: Vec<T>, query: &Query) -> Vec<T> {
    items
        .into_iter()
        .skip(query.offset())
        .take(query.page_size() as usize)
        .collect()
}
