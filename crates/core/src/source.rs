//! Source provider abstraction.
//!
//! Workers read files through [`SourceProvider`] so the analysis pipeline can
//! run against the filesystem or against an in-memory file set in tests.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

pub trait SourceProvider: Sync {
    /// Read the full text of `path`.
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error>;
}

/// Reads straight from disk.
pub struct FileSystemProvider;

impl SourceProvider for FileSystemProvider {
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error> {
        std::fs::read_to_string(path)
    }
}

/// Maps normalized paths to source text.
pub struct InMemoryProvider {
    files: HashMap<PathBuf, String>,
}

impl InMemoryProvider {
    pub fn new(files: HashMap<PathBuf, String>) -> Self {
        let files = files
            .into_iter()
            .map(|(k, v)| (Self::normalize_path(&k), v))
            .collect();
        Self { files }
    }

    /// Resolve `.` and `..` without touching the filesystem.
    fn normalize_path(path: &Path) -> PathBuf {
        let mut components = Vec::new();
        for component in path.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    components.pop();
                }
                other => components.push(other),
            }
        }
        components.iter().collect()
    }
}

impl SourceProvider for InMemoryProvider {
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error> {
        let normalized = Self::normalize_path(path);
        self.files.get(&normalized).cloned().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("file not found in memory: {}", normalized.display()),
            )
        })
    }
}
