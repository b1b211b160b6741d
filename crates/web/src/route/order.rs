use totea_http::route::RoutePath;

use super::RouteEntry;

/// How specific a path is; lower ranks are tried first.
fn rank(path: &RoutePath) -> u8 {
    if path.is_pattern() {
        2
    } else if path.has_params() {
        1
    } else {
        0
    }
}

/// Sorts routes so literal paths come before parameterized ones and regular expressions
/// come last. The sort is stable: routes of the same rank keep their declaration order.
pub fn order(mut entries: Vec<RouteEntry>) -> Vec<RouteEntry> {
    entries.sort_by_key(|entry| rank(entry.path()));
    entries
}
