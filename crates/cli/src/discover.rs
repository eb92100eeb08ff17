//! Expand positional path and glob patterns into the files to scan.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use globset::Glob;
use ignore::WalkBuilder;

#[derive(Debug, thiserror::Error)]
pub enum DiscoverError {
    #[error("invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// Files matched by `patterns`, sorted and deduplicated.
///
/// An existing file is taken as-is. A directory is walked (honouring
/// `.gitignore`) for files with one of `extensions`. Anything else is a glob,
/// matched against files under its literal leading directories.
pub fn discover(patterns: &[String], extensions: &[String]) -> Result<Vec<PathBuf>, DiscoverError> {
    let mut files = BTreeSet::new();

    for pattern in patterns {
        let path = Path::new(pattern);
        if path.is_file() {
            files.insert(clean(path));
            continue;
        }
        if path.is_dir() {
            for file in walk(path, extensions) {
                files.insert(file);
            }
            continue;
        }

        let matcher = Glob::new(pattern)
            .map_err(|source| DiscoverError::Pattern {
                pattern: pattern.clone(),
                source,
            })?
            .compile_matcher();
        let before = files.len();
        for file in walk(&glob_base(pattern), extensions) {
            if matcher.is_match(&file) {
                files.insert(file);
            }
        }
        if files.len() == before {
            tracing::warn!(pattern = %pattern, "pattern matched no files");
        }
    }

    tracing::info!(files = files.len(), "discovered files");
    Ok(files.into_iter().collect())
}

fn walk(root: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for entry in WalkBuilder::new(root).require_git(false).build() {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable path");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        if has_extension(entry.path(), extensions) {
            out.push(clean(entry.path()));
        }
    }
    out
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| x == e))
}

/// Longest leading run of components without glob metacharacters.
fn glob_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    for component in Path::new(pattern).components() {
        let text = component.as_os_str().to_string_lossy();
        if text.contains(['*', '?', '[', '{']) {
            break;
        }
        base.push(component);
    }
    if base.as_os_str().is_empty() || base == Path::new(pattern) {
        PathBuf::from(".")
    } else {
        base
    }
}

/// Drop `./` components so walked paths line up with patterns.
fn clean(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
