use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

const MMAP_THRESHOLD: u64 = 1024 * 1024; // 1 MiB

pub enum FileContent {
    Mapped(Mmap),
    Buffered(String),
}

impl FileContent {
    /// Borrow the content as UTF-8, failing on invalid mapped bytes.
    pub fn as_str(&self) -> Result<&str> {
        match self {
            FileContent::Mapped(mmap) => {
                std::str::from_utf8(mmap).context("source file is not valid UTF-8")
            }
            FileContent::Buffered(s) => Ok(s.as_str()),
        }
    }

    /// Take ownership of the content as a String.
    pub fn into_string(self) -> Result<String> {
        match self {
            FileContent::Buffered(s) => Ok(s),
            mapped => Ok(mapped.as_str()?.to_owned()),
        }
    }
}

pub fn read_file_smart<P: AsRef<Path>>(path: P) -> Result<FileContent> {
    let path = path.as_ref();
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to read metadata for {}", path.display()))?;

    if metadata.len() > MMAP_THRESHOLD {
        // Use memory mapping for large files
        let file =
            File::open(path).with_context(|| format!("Failed to open file {}", path.display()))?;

        // Safety: We're only reading the file, not modifying it
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("Failed to memory-map {}", path.display()))?;

        Ok(FileContent::Mapped(mmap))
    } else {
        // Read small files into memory
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file {}", path.display()))?;

        Ok(FileContent::Buffered(content))
    }
}

/// Read a whole source file into an owned String.
pub fn read_source<P: AsRef<Path>>(path: P) -> Result<String> {
    read_file_smart(path)?.into_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_small_files_buffered() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let p = dir.path().join("a.go");
        std::fs::write(&p, "package a\n")?;

        let content = read_file_smart(&p)?;
        assert!(matches!(content, FileContent::Buffered(_)));
        assert_eq!(content.as_str()?, "package a\n");
        assert_eq!(read_source(&p)?, "package a\n");
        Ok(())
    }

    #[test]
    fn missing_file_reports_path() {
        let err = read_source("/definitely/not/here.go").unwrap_err();
        assert!(format!("{err:#}").contains("/definitely/not/here.go"));
    }
}
