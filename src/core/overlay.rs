//! In-memory replacements for on-disk sources.
//!
//! Editors pass unsaved buffers keyed by the path they know the file by.
//! The same file may be reached through another alias (a symlinked
//! workspace, a relative path), so lookups fall back to comparing base
//! names and then file identity.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::trace;

use crate::{
    core::error::{Error, Result},
    infra::paths::clean_path,
};

/// Wire shape of `--overlay`: `{"replace": {"<path>": "<content>"}}`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverlayPayload
{
    #[serde(default)]
    pub replace: IndexMap<String, String>,
}

/// Path → content map consulted before the file system.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlay
{
    entries: IndexMap<PathBuf, String>,
}

impl Overlay
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Add or replace one entry.
    pub fn insert(
        &mut self,
        path: impl Into<PathBuf>,
        content: impl Into<String>,
    )
    {
        self.entries
            .insert(path.into(), content.into());
    }

    pub fn len(&self) -> usize
    {
        self.entries
            .len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.entries
            .is_empty()
    }

    /// Parse the JSON payload; unknown fields are rejected. Returns None
    /// when the payload replaces nothing.
    pub fn from_json(text: &str) -> Result<Option<Self>>
    {
        let payload: OverlayPayload = serde_json::from_str(text).map_err(Error::Schema)?;
        if payload
            .replace
            .is_empty()
        {
            return Ok(None);
        }

        let entries = payload
            .replace
            .into_iter()
            .map(|(k, v)| (PathBuf::from(k), v))
            .collect();
        Ok(Some(Self { entries }))
    }

    /// Content for `path`: exact key first, then any entry that denotes
    /// the same file.
    pub fn lookup(
        &self,
        path: &Path,
    ) -> Option<&str>
    {
        // Fast path: names match exactly
        if let Some(content) = self
            .entries
            .get(path)
        {
            return Some(content);
        }

        // Slow path: same file under a different alias
        self.entries
            .iter()
            .find(|(key, _)| same_file(path, key))
            .map(|(key, content)| {
                trace!(requested = %path.display(), overlay = %key.display(), "overlay alias hit");
                content.as_str()
            })
    }
}

/// True when `x` and `y` share a base name and denote the same file,
/// either lexically or by file-system identity.
pub fn same_file(
    x: &Path,
    y: &Path,
) -> bool
{
    if x == y
    {
        return true;
    }
    if x.file_name() != y.file_name()
    {
        return false;
    }
    if clean_path(x) == clean_path(y)
    {
        return true;
    }
    same_file::is_same_file(x, y).unwrap_or(false)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn exact_and_lexical_matches()
    {
        let mut o = Overlay::new();
        o.insert("/ws/pkg/a.go", "package overlay");

        assert_eq!(o.lookup(Path::new("/ws/pkg/a.go")), Some("package overlay"));
        assert_eq!(o.lookup(Path::new("/ws/./pkg/../pkg/a.go")), Some("package overlay"));
        assert_eq!(o.lookup(Path::new("/ws/pkg/b.go")), None);
    }

    #[test]
    fn unknown_fields_are_a_schema_error()
    {
        let err = Overlay::from_json(r#"{"replace": {}, "extra": 1}"#).unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
        assert!(err.to_string().contains("extra"));
    }

    #[test]
    fn empty_payload_means_no_overlay() -> Result<()>
    {
        assert!(Overlay::from_json("{}")?.is_none());
        assert!(Overlay::from_json(r#"{"replace": {}}"#)?.is_none());

        let o = Overlay::from_json(r#"{"replace": {"/x/a.go": "package a"}}"#)?
            .expect("overlay");
        assert_eq!(o.len(), 1);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_alias_hits_the_overlay() -> anyhow::Result<()>
    {
        let dir = tempfile::TempDir::new()?;
        let ws = dir
            .path()
            .join("ws");
        std::fs::create_dir(&ws)?;
        std::fs::write(ws.join("a.go"), "package disk")?;
        std::os::unix::fs::symlink(&ws, ws.join("link"))?;

        let mut o = Overlay::new();
        o.insert(ws.join("a.go"), "package p");

        assert_eq!(o.lookup(&ws.join("link/a.go")), Some("package p"));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn different_base_names_never_match() -> anyhow::Result<()>
    {
        let dir = tempfile::TempDir::new()?;
        let a = dir
            .path()
            .join("a.go");
        std::fs::write(&a, "package p")?;
        std::os::unix::fs::symlink(&a, dir.path().join("b.go"))?;

        assert!(!same_file(&a, &dir.path().join("b.go")));
        Ok(())
    }
}
