//! File I/O boundary for the patch engine.
//!
//! The core only needs to read and write ordered line sequences; it
//! does not care whether files came out of a packed archive or a plain
//! directory tree. `DirStore` is the filesystem implementation used by
//! the CLI, rooted at the work directory the extracted configs live in.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub trait ConfigStore {
    fn read_lines(&self, file: &str) -> Result<Vec<String>, StoreError>;
    fn write_lines(&self, file: &str, lines: &[String]) -> Result<(), StoreError>;
}

/// Filesystem-backed store rooted at a work directory.
///
/// Config file names are slash-separated paths relative to the root;
/// backslashes from Windows-authored mod scripts are normalized.
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, file: &str) -> PathBuf {
        self.root.join(normalize_config_path(file))
    }
}

/// Normalize a config path from a mod script: forward slashes, no
/// leading separator.
pub fn normalize_config_path(path: &str) -> String {
    path.replace('\\', "/").trim_start_matches('/').to_string()
}

impl ConfigStore for DirStore {
    fn read_lines(&self, file: &str) -> Result<Vec<String>, StoreError> {
        let path = self.resolve(file);
        let content = fs::read_to_string(&path).map_err(|source| StoreError::Read {
            path: path.clone(),
            source,
        })?;
        Ok(content.lines().map(str::to_string).collect())
    }

    fn write_lines(&self, file: &str, lines: &[String]) -> Result<(), StoreError> {
        let path = self.resolve(file);
        let mut content = lines.join("\n");
        content.push('\n');
        atomic_write(&path, content.as_bytes()).map_err(|source| StoreError::Write {
            path: path.clone(),
            source,
        })
    }
}

/// Atomic file write: tempfile in the target directory + fsync + rename.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), std::io::Error> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path has no parent directory",
        )
    })?;
    fs::create_dir_all(parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
