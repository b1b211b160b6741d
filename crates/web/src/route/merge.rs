use super::RouteEntry;

/// Layers instance routes over class routes.
///
/// The class routes keep their order. A class route whose `(method, path)` is also bound
/// by an instance route is replaced in place by it; the remaining instance routes are
/// appended in declaration order. No conflict checks happen here, each tier has already
/// been resolved on its own.
pub fn merge(class_routes: Vec<RouteEntry>, instance_routes: Vec<RouteEntry>) -> Vec<RouteEntry> {
    let mut merged = class_routes;
    merged.reserve(instance_routes.len());

    for entry in instance_routes {
        match merged.iter().position(|existing| existing.same_binding(&entry)) {
            Some(position) => merged[position] = entry,
            None => merged.push(entry),
        }
    }
    merged
}
