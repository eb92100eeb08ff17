//! Transactional application of a [`MigrationPlan`].
//!
//! A plan is rendered in memory, verified, and only then written. The write
//! goes to a temporary file next to the original which is renamed over it,
//! so a failure at any step leaves the original untouched.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tokenguard_core::{Extraction, Extractor, Registry, SegmentKind};

use crate::error::MigrationError;
use crate::plan::{Edit, MigrationPlan};

/// Splice `edits` into `source`. Edits must not overlap and must still
/// match the text they were planned against.
pub fn render<'e>(
    source: &str,
    edits: impl IntoIterator<Item = &'e Edit>,
) -> Result<String, MigrationError> {
    let mut edits: Vec<&Edit> = edits.into_iter().collect();
    edits.sort_by_key(|e| (e.byte_range.start, e.byte_range.end));

    for pair in edits.windows(2) {
        if pair[0].byte_range.end > pair[1].byte_range.start {
            return Err(MigrationError::Overlap {
                first: pair[0].byte_range.clone(),
                second: pair[1].byte_range.clone(),
            });
        }
    }

    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for edit in edits {
        let range = edit.byte_range.clone();
        if source.get(range.clone()) != Some(edit.original_text.as_str()) {
            return Err(MigrationError::Mismatch { range });
        }
        out.push_str(&source[cursor..range.start]);
        out.push_str(&edit.replacement_text);
        cursor = range.end;
    }
    out.push_str(&source[cursor..]);
    Ok(out)
}

/// Every style value a file refers to, with references resolved through
/// the registry and multi-token values split. Sorted, duplicates kept.
pub fn resolved_values(extraction: &Extraction, registry: &Registry) -> Vec<String> {
    let mut values = Vec::new();
    for segment in &extraction.segments {
        for token in &segment.tokens {
            match segment.kind {
                SegmentKind::Reference => match registry.resolve(&token.text) {
                    Some(raw) => values.extend(raw.split_whitespace().map(str::to_string)),
                    None => values.push(token.text.clone()),
                },
                SegmentKind::Str {
                    jsx_attribute: true,
                    ..
                } => values.push(token.text.clone()),
                _ => values.push(cooked(&token.text)),
            }
        }
    }
    values.sort();
    values
}

/// Drop escape backslashes so string and template spellings compare equal.
fn cooked(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Render and verify a plan without touching disk.
///
/// The rewritten text must parse cleanly and reference exactly the same
/// style values as the original.
pub fn rewrite(
    plan: &MigrationPlan,
    original: &Extraction,
    extractor: &Extractor,
    registry: &Registry,
) -> Result<String, MigrationError> {
    let rewritten = render(original.source(), plan.all_edits())?;
    let after = extractor.extract(&plan.file_path, &rewritten)?;

    let before_values = resolved_values(original, registry);
    let after_values = resolved_values(&after, registry);
    if before_values != after_values {
        return Err(MigrationError::ValuesChanged {
            before: before_values.len(),
            after: after_values.len(),
        });
    }
    Ok(rewritten)
}

/// Atomically replace `path` with `rewritten`, provided the file still
/// holds `original`. Permissions of the original are kept.
pub fn commit(path: &Path, original: &str, rewritten: &str) -> Result<(), MigrationError> {
    let on_disk = std::fs::read_to_string(path).map_err(|source| MigrationError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if on_disk != original {
        return Err(MigrationError::Stale {
            path: path.to_path_buf(),
        });
    }

    let write_err = |source: std::io::Error| MigrationError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let permissions = std::fs::metadata(path).map_err(write_err)?.permissions();

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(rewritten.as_bytes()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    std::fs::set_permissions(tmp.path(), permissions).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    tracing::debug!(file = %path.display(), bytes = rewritten.len(), "committed rewrite");
    Ok(())
}
