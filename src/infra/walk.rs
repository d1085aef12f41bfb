//! Filepath: src/infra/walk.rs
//! Single-directory lister for package resolution.
//! - No ignore files: Go builds gitignored sources too
//! - Symlinks are followed so linked sources count as files
//! - Hidden entries are kept; callers apply Go's `_`/`.` rule
//! - Deterministic ordering for stable tests/CI
//!
//! Backed by ripgrep's `ignore` crate with every filter turned off.

use std::path::Path;

use anyhow::{Context, Result};
use ignore::WalkBuilder;

/// Lists the regular files directly inside one directory.
pub struct FileWalker
{
    /// Only keep names with this extension (without the dot)
    extension: Option<String>,
}

impl FileWalker
{
    /// Build a lister that keeps every regular file.
    pub fn new() -> Self
    {
        Self { extension: None }
    }

    /// (Optional) Restrict to a file extension, e.g. `"go"`.
    pub fn with_extension(
        mut self,
        ext: &str,
    ) -> Self
    {
        self.extension = Some(ext.to_string());
        self
    }

    /// Internal: construct a configured WalkBuilder for `dir`.
    fn build_walk(
        &self,
        dir: &Path,
    ) -> WalkBuilder
    {
        let mut b = WalkBuilder::new(dir);

        // Plain listing: no hidden filter, no ignore files of any kind
        b.standard_filters(false);

        // Only the directory's own entries
        b.max_depth(Some(1));
        b.follow_links(true);

        b
    }

    /// List file names directly inside `dir`, sorted.
    pub fn list_files<P: AsRef<Path>>(
        &self,
        dir: P,
    ) -> Result<Vec<String>>
    {
        let dir = dir.as_ref();
        let mut out = Vec::new();

        for res in self
            .build_walk(dir)
            .build()
        {
            let entry = res.with_context(|| format!("Failed to list {}", dir.display()))?;

            // Skip the root itself and anything that is not a regular file
            if entry.depth() == 0
                || !entry
                    .file_type()
                    .is_some_and(|ft| ft.is_file())
            {
                continue;
            }

            let Some(name) = entry
                .file_name()
                .to_str()
            else
            {
                continue;
            };

            if let Some(ext) = &self.extension
                && Path::new(name)
                    .extension()
                    .is_none_or(|e| e != ext.as_str())
            {
                continue;
            }

            out.push(name.to_string());
        }

        // Deterministic order (stable CLI & tests)
        out.sort();

        Ok(out)
    }
}

impl Default for FileWalker
{
    fn default() -> Self
    {
        Self::new()
    }
}
