//! Lexical path helpers.
//!
//! Nothing here touches the file system; symlinks are resolved elsewhere
//! (see the overlay's same-file check).

use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path: drop `.` segments, fold `name/..` pairs,
/// discard `..` directly under the root, and return `.` for an empty result.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();

    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(comp),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// Final path element, mirroring `basename`: trailing separators are
/// ignored and an empty path yields `.`.
pub fn base_name(path: &str) -> String {
    let trimmed = path.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        return if path.is_empty() { ".".to_string() } else { "/".to_string() };
    }
    match trimmed.rfind(['/', '\\']) {
        Some(i) => trimmed[i + 1..].to_string(),
        None => trimmed.to_string(),
    }
}

/// Make a path absolute against the current directory without resolving
/// symlinks, then clean it.
pub fn absolute_clean(path: &Path) -> std::io::Result<PathBuf> {
    let abs = std::path::absolute(path)?;
    Ok(clean_path(&abs))
}
