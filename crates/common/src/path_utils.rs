//! Small path and name helpers.

use std::path::Path;

use crate::error::PathError;

/// Final component of a path as UTF-8.
///
/// # Errors
/// Returns `PathError::InvalidPath` when the path has no final component
/// (e.g. `/` or `..`) or it is not valid UTF-8.
pub fn base_name(path: &Path) -> Result<&str, PathError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| PathError::InvalidPath {
            path: path.display().to_string(),
        })
}

/// Whether a file or directory name is a dot-entry.
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Split a file name into stem and extension (with leading dot).
///
/// A leading dot does not start an extension, so `.bashrc` has none.
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => (&name[..idx], Some(&name[idx..])),
        _ => (name, None),
    }
}

/// Upper-case the first character and leave the rest untouched.
pub fn capitalize_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
