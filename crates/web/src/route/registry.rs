use std::collections::HashSet;

use tracing::{debug, warn};

use super::RouteEntry;
use crate::error::RegistrationError;

/// Collects the routes of one tier (class defaults or instance overrides) of one owner.
///
/// Binding a handler twice is rejected as soon as it is registered. Two handlers on the
/// same `(method, path)` are only detected in [`resolve`](RouteRegistry::resolve), since
/// the later one may be marked as an override after it was declared.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    entries: Vec<RouteEntry>,
    overrides: HashSet<String>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn register(&mut self, entry: RouteEntry) -> Result<(), RegistrationError> {
        if let Some(existing) = bound_elsewhere(&self.entries, &entry) {
            return Err(duplicate_handler(existing, &entry));
        }

        self.entries.push(entry);
        Ok(())
    }

    /// Lets routes of `handler_name` replace an earlier route on the same `(method, path)`.
    pub fn mark_override(&mut self, handler_name: impl Into<String>) {
        self.overrides.insert(handler_name.into());
    }

    /// Applies overrides and returns the routes in declaration order.
    ///
    /// An override takes the place of the route it replaces.
    pub fn resolve(self) -> Result<Vec<RouteEntry>, RegistrationError> {
        let mut resolved: Vec<RouteEntry> = Vec::with_capacity(self.entries.len());

        for entry in self.entries {
            let Some(position) = resolved.iter().position(|existing| existing.same_binding(&entry)) else {
                resolved.push(entry);
                continue;
            };

            if !self.overrides.contains(&entry.handler_name) {
                return Err(RegistrationError::DuplicateRoute {
                    method: entry.method,
                    path: entry.path,
                    existing: resolved[position].handler_name.clone(),
                    handler: entry.handler_name,
                });
            }

            debug!(
                method = %entry.method,
                path = %entry.path,
                replaced = resolved[position].handler_name,
                handler = entry.handler_name,
                "route overridden"
            );
            resolved[position] = entry;
        }

        for name in &self.overrides {
            if !resolved.iter().any(|entry| &entry.handler_name == name) {
                warn!(handler = name, "override marked on a handler without routes");
            }
        }

        Ok(resolved)
    }
}

/// Rejects a handler bound to more than one `(method, path)` across a merged route set.
///
/// Each tier is checked on registration; this catches a handler that the class tier and
/// the instance tier bind to different paths.
pub fn ensure_unique_handlers(entries: &[RouteEntry]) -> Result<(), RegistrationError> {
    for (index, entry) in entries.iter().enumerate() {
        if let Some(existing) = bound_elsewhere(&entries[..index], entry) {
            return Err(duplicate_handler(existing, entry));
        }
    }
    Ok(())
}

fn bound_elsewhere<'a>(entries: &'a [RouteEntry], entry: &RouteEntry) -> Option<&'a RouteEntry> {
    entries.iter().find(|existing| existing.same_handler(entry) && !existing.same_binding(entry))
}

fn duplicate_handler(existing: &RouteEntry, entry: &RouteEntry) -> RegistrationError {
    RegistrationError::DuplicateHandler {
        handler: entry.handler_name.clone(),
        method: existing.method.clone(),
        path: existing.path.clone(),
        new_method: entry.method.clone(),
        new_path: entry.path.clone(),
    }
}
