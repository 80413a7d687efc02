//! Content-path handling.
//!
//! Content paths are POSIX-style slash-separated identifiers, independent
//! of the host filesystem. All lookups normalize through [`cleanup_path`]
//! so two spellings of the same path hit the same record and cache slot.

use std::path::{Path, PathBuf};

/// Normalize a content path: leading slash, no trailing slash except for
/// the root, no empty or `.` segments.
pub fn cleanup_path(path: &str) -> String {
    let mut rv = String::from("/");
    for segment in path.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }
        if rv.len() > 1 {
            rv.push('/');
        }
        rv.push_str(segment);
    }
    rv
}

/// The parent of a normalized content path. The root is its own parent.
pub fn dirname(path: &str) -> String {
    match path.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
        None => "/".to_string(),
    }
}

/// The last segment of a normalized content path; empty for the root.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or("")
}

/// Join a child name onto a normalized content path.
pub fn join(path: &str, name: &str) -> String {
    if path == "/" {
        format!("/{name}")
    } else {
        format!("{path}/{name}")
    }
}

/// The lowercase extension of a path's final segment, without the dot.
pub fn extension(path: &str) -> Option<String> {
    let name = basename(path);
    let idx = name.rfind('.')?;
    if idx == 0 || idx + 1 == name.len() {
        return None;
    }
    Some(name[idx + 1..].to_ascii_lowercase())
}

/// Map a content path onto the filesystem below a content root.
pub fn to_fs_path(content_root: &Path, path: &str) -> PathBuf {
    let mut rv = content_root.to_path_buf();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        rv.push(segment);
    }
    rv
}

/// Filenames the content scanner ignores: dotfiles, underscore-prefixed
/// names, editor backups and well-known system droppings.
pub fn is_uninteresting_source_name(name: &str) -> bool {
    if name.starts_with('.') || name.starts_with('_') {
        return true;
    }
    if name.ends_with('~') || name.ends_with(".tmp") {
        return true;
    }
    name.eq_ignore_ascii_case("thumbs.db") || name.eq_ignore_ascii_case("desktop.ini")
}
