//! Name conventions shared by controllers and routes.

use crate::error::RegistrationError;

/// `child-route`, `child_route` and `ChildRoute` all become `childRoute`.
pub(crate) fn camelize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (index, part) in name.split(['-', '_', ' ']).filter(|part| !part.is_empty()).enumerate() {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            if index == 0 {
                out.extend(first.to_lowercase());
            } else {
                out.extend(first.to_uppercase());
            }
            out.push_str(chars.as_str());
        }
    }
    out
}

/// `childRoute` and `child_route` both become `child-route`.
pub(crate) fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (index, ch) in name.chars().enumerate() {
        if ch == '_' || ch == ' ' {
            out.push('-');
        } else if ch.is_uppercase() {
            if index > 0 && !out.ends_with('-') {
                out.push('-');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// The path a route gets when it is declared without one: `/` plus the kebab-cased handler name.
pub(crate) fn default_route_path(handler_name: &str) -> String {
    format!("/{}", kebab_case(handler_name))
}

/// Validates a controller name and returns it in camel case.
pub(crate) fn controller_name(raw: &str) -> Result<String, RegistrationError> {
    let invalid = |reason| RegistrationError::InvalidControllerName { name: raw.to_owned(), reason };

    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('/').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Err(invalid("name must not be empty"));
    }
    if trimmed.contains('/') {
        return Err(invalid("name can not contain `/`"));
    }

    Ok(camelize(trimmed))
}
