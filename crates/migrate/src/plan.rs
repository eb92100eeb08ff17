//! Migration planning: classified literals to canonical references.
//!
//! Planning is read-only. It walks every string and template segment of a
//! file, matches registry raw values greedily (longest run of adjacent
//! tokens first), resolves categories, and produces one [`Edit`] per
//! rewritten node plus the file's [`ImportRequirement`].

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokenguard_core::classify::normalize_pattern;
use tokenguard_core::syntax::line_of;
use tokenguard_core::{
    Extraction, Location, Registry, RegistryEntry, SegmentKind, StyleSegment, StyleToken,
    Violation, ViolationKind,
};

use crate::imports::ensure_import;

pub const CHECK_NAME: &str = "token-migration";

/// A single text replacement in one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edit {
    pub file_path: PathBuf,
    pub byte_range: Range<usize>,
    pub line: u32,
    pub original_text: String,
    pub replacement_text: String,
}

/// Top-level names a file must import after migration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportRequirement {
    pub module_specifier: String,
    pub names: BTreeSet<String>,
}

/// Everything migration would do to one file.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationPlan {
    pub file_path: PathBuf,
    /// Expression rewrites in document order.
    pub edits: Vec<Edit>,
    pub import: Option<ImportRequirement>,
    /// The import merge, absent when every name is already bound.
    pub import_edit: Option<Edit>,
    /// Literal runs replaced by a reference.
    pub migrated_tokens: usize,
    pub violations: Vec<Violation>,
}

impl MigrationPlan {
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty() && self.import_edit.is_none()
    }

    pub fn edit_count(&self) -> usize {
        self.edits.len() + usize::from(self.import_edit.is_some())
    }

    /// Expression edits followed by the import edit.
    pub fn all_edits(&self) -> impl Iterator<Item = &Edit> {
        self.edits.iter().chain(self.import_edit.iter())
    }
}

/// A run of adjacent literal tokens whose joined text is a registry value.
struct Candidate<'r> {
    segment: usize,
    attribute_id: usize,
    range: Range<usize>,
    raw: String,
    entries: Vec<&'r RegistryEntry>,
}

/// A candidate with its category decided.
struct Resolved<'r> {
    segment: usize,
    range: Range<usize>,
    entry: &'r RegistryEntry,
}

/// Plan the migration of one extracted file.
pub fn plan_migration(extraction: &Extraction, registry: &Registry) -> MigrationPlan {
    let source = extraction.source();
    let path = &extraction.file_path;

    let mut candidates = Vec::new();
    for (idx, segment) in extraction.segments.iter().enumerate() {
        if segment.kind == SegmentKind::Reference {
            continue;
        }
        if has_character_reference(source, segment) {
            tracing::debug!(
                file = %path.display(),
                line = segment.line,
                "attribute string holds an HTML entity; not rewritten"
            );
            continue;
        }
        candidates.extend(find_runs(source, idx, segment, registry));
    }

    let (resolved, mut violations) = resolve_categories(path, source, candidates, registry);

    let mut by_segment: BTreeMap<usize, Vec<(Range<usize>, &str)>> = BTreeMap::new();
    let mut names = BTreeSet::new();
    for r in &resolved {
        names.insert(r.entry.category.clone());
        by_segment
            .entry(r.segment)
            .or_default()
            .push((r.range.clone(), r.entry.canonical_path.as_str()));
    }

    let mut edits = Vec::new();
    for (idx, matches) in &by_segment {
        let segment = &extraction.segments[*idx];
        edits.extend(rewrite_segment(path, source, segment, matches));
    }
    edits.sort_by_key(|e| e.byte_range.start);

    let mut migrated_tokens = resolved.len();
    let mut import = (!edits.is_empty()).then(|| ImportRequirement {
        module_specifier: registry.module().to_string(),
        names,
    });
    let mut import_edit = None;
    if let Some(req) = &import {
        match ensure_import(path, extraction.tree(), req) {
            Ok(found) => import_edit = found,
            Err(conflict) => {
                tracing::warn!(
                    file = %path.display(),
                    name = %conflict.name,
                    module = %conflict.module,
                    "token name already bound; file not migrated"
                );
                violations.push(Violation::new(
                    path,
                    Location::new(
                        line_of(source, conflict.range.start),
                        conflict.range.start,
                        conflict.range.end,
                    ),
                    ViolationKind::ImportConflict,
                    CHECK_NAME,
                    format!(
                        "`{}` is already bound by an import from '{}'; file left unchanged",
                        conflict.name, conflict.module
                    ),
                    source[conflict.range.clone()].to_string(),
                ));
                edits.clear();
                import = None;
                migrated_tokens = 0;
            }
        }
    }

    tracing::debug!(
        file = %path.display(),
        edits = edits.len(),
        migrated = migrated_tokens,
        violations = violations.len(),
        "planned migration"
    );

    MigrationPlan {
        file_path: path.clone(),
        edits,
        import,
        import_edit,
        migrated_tokens,
        violations,
    }
}

/// JSX attribute strings decode HTML entities (`&amp;`); template literals do
/// not, so such strings cannot be moved into a template unchanged.
fn has_character_reference(source: &str, segment: &StyleSegment) -> bool {
    matches!(
        segment.kind,
        SegmentKind::Str {
            jsx_attribute: true,
            ..
        }
    ) && source[segment.range.clone()].contains('&')
}

/// Greedy longest-run matching over one segment's tokens.
fn find_runs<'r>(
    source: &str,
    segment_idx: usize,
    segment: &StyleSegment,
    registry: &'r Registry,
) -> Vec<Candidate<'r>> {
    let tokens = &segment.tokens;
    let mut out = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].fragment {
            i += 1;
            continue;
        }
        let longest = adjacent_run(source, tokens, i, registry.max_token_run());
        let found = (1..=longest).rev().find_map(|n| {
            let run = &tokens[i..i + n];
            let raw = run
                .iter()
                .map(|t| t.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            let entries = registry.lookup_mapped(&raw);
            (!entries.is_empty()).then(|| (n, raw, entries))
        });
        match found {
            Some((n, raw, entries)) => {
                out.push(Candidate {
                    segment: segment_idx,
                    attribute_id: segment.attribute_id,
                    range: tokens[i].range.start..tokens[i + n - 1].range.end,
                    raw,
                    entries,
                });
                i += n;
            }
            None => i += 1,
        }
    }
    out
}

/// Number of tokens from `start` separated only by whitespace, capped at `max`.
fn adjacent_run(source: &str, tokens: &[StyleToken], start: usize, max: usize) -> usize {
    let mut n = 1;
    while n < max && start + n < tokens.len() {
        let prev = &tokens[start + n - 1];
        let next = &tokens[start + n];
        let gap = &source[prev.range.end..next.range.start];
        if next.fragment || !gap.chars().all(char::is_whitespace) {
            break;
        }
        n += 1;
    }
    n
}

/// Pick one category per candidate.
///
/// Several categories can map the same raw value. Candidates are first
/// narrowed by the categories' utility prefixes; if more than one remains,
/// a category already used by an unambiguous match in the same attribute
/// wins. Anything still undecided is reported and left untouched.
fn resolve_categories<'r>(
    path: &Path,
    source: &str,
    candidates: Vec<Candidate<'r>>,
    registry: &'r Registry,
) -> (Vec<Resolved<'r>>, Vec<Violation>) {
    let scoped: Vec<(Candidate<'r>, Vec<&'r RegistryEntry>)> = candidates
        .into_iter()
        .map(|c| {
            let entries = scope_by_prefix(&c, registry);
            (c, entries)
        })
        .collect();

    let mut affinity: BTreeMap<usize, BTreeSet<&str>> = BTreeMap::new();
    for (c, entries) in &scoped {
        if let [only] = entries.as_slice() {
            affinity
                .entry(c.attribute_id)
                .or_default()
                .insert(only.category.as_str());
        }
    }

    let mut resolved = Vec::new();
    let mut violations = Vec::new();
    for (c, entries) in &scoped {
        let chosen = match entries.as_slice() {
            [only] => Some(*only),
            _ => {
                let used = affinity.get(&c.attribute_id);
                let preferred: Vec<&RegistryEntry> = entries
                    .iter()
                    .copied()
                    .filter(|e| used.is_some_and(|u| u.contains(e.category.as_str())))
                    .collect();
                match preferred.as_slice() {
                    [only] => Some(*only),
                    _ => None,
                }
            }
        };
        match chosen {
            Some(entry) => resolved.push(Resolved {
                segment: c.segment,
                range: c.range.clone(),
                entry,
            }),
            None => {
                let paths: Vec<&str> = entries.iter().map(|e| e.canonical_path.as_str()).collect();
                violations.push(Violation::new(
                    path,
                    Location::new(line_of(source, c.range.start), c.range.start, c.range.end),
                    ViolationKind::AmbiguousMigration,
                    CHECK_NAME,
                    format!(
                        "`{}` maps to several tokens ({}); left unchanged",
                        c.raw,
                        paths.join(", ")
                    ),
                    c.raw.clone(),
                ));
            }
        }
    }
    (resolved, violations)
}

/// Drop categories whose declared prefixes match none of the run's tokens.
/// Only applied when more than one category is possible.
fn scope_by_prefix<'r>(candidate: &Candidate<'r>, registry: &Registry) -> Vec<&'r RegistryEntry> {
    if candidate.entries.len() < 2 {
        return candidate.entries.clone();
    }
    let scoped: Vec<&'r RegistryEntry> = candidate
        .entries
        .iter()
        .copied()
        .filter(|e| {
            let prefixes = registry.prefixes(&e.category);
            prefixes.is_empty()
                || candidate.raw.split(' ').any(|token| {
                    let utility = normalize_pattern(token);
                    prefixes.iter().any(|p| utility.starts_with(p.as_str()))
                })
        })
        .collect();
    if scoped.is_empty() {
        candidate.entries.clone()
    } else {
        scoped
    }
}

/// Rewrite one segment given its matched ranges and target paths.
fn rewrite_segment(
    path: &Path,
    source: &str,
    segment: &StyleSegment,
    matches: &[(Range<usize>, &str)],
) -> Vec<Edit> {
    let inner = segment.range.start + 1..segment.range.end - 1;
    let content = &source[inner.clone()];
    // Outer whitespace only disappears safely from an attribute string;
    // anywhere else it is part of the runtime value (`"space-y-4 " + x`).
    let padding_free = matches!(
        segment.kind,
        SegmentKind::Str {
            jsx_attribute: true,
            ..
        }
    );
    let single_full_match = match matches {
        [(range, _)] if padding_free => content.trim() == &source[range.clone()],
        [(range, _)] => content == &source[range.clone()],
        _ => false,
    };

    match segment.kind {
        SegmentKind::Str {
            jsx_attribute,
            ..
        } => {
            let replacement = if single_full_match {
                let reference = matches[0].1;
                if jsx_attribute {
                    format!("{{{}}}", reference)
                } else {
                    reference.to_string()
                }
            } else {
                let mut body = String::new();
                let mut cursor = inner.start;
                for (range, reference) in matches {
                    body.push_str(&escape_template(&source[cursor..range.start], jsx_attribute));
                    body.push_str(&format!("${{{}}}", reference));
                    cursor = range.end;
                }
                body.push_str(&escape_template(&source[cursor..inner.end], jsx_attribute));
                if jsx_attribute {
                    format!("{{`{}`}}", body)
                } else {
                    format!("`{}`", body)
                }
            };
            vec![edit(path, source, segment.range.clone(), replacement)]
        }
        SegmentKind::Template { substitutions } => {
            if substitutions == 0 && single_full_match {
                return vec![edit(
                    path,
                    source,
                    segment.range.clone(),
                    matches[0].1.to_string(),
                )];
            }
            // Substitutions may hold segments of their own; touch only the
            // literal tokens.
            matches
                .iter()
                .map(|(range, reference)| {
                    edit(path, source, range.clone(), format!("${{{}}}", reference))
                })
                .collect()
        }
        SegmentKind::Reference => Vec::new(),
    }
}

/// Escape passthrough text for a template literal. JSX attribute strings
/// have no escapes of their own, so their backslashes are literal.
fn escape_template(text: &str, jsx_attribute: bool) -> String {
    let text = if jsx_attribute {
        text.replace('\\', "\\\\")
    } else {
        text.to_string()
    };
    text.replace('`', "\\`").replace("${", "\\${")
}

fn edit(path: &Path, source: &str, range: Range<usize>, replacement: String) -> Edit {
    Edit {
        file_path: path.to_path_buf(),
        line: line_of(source, range.start),
        original_text: source[range.clone()].to_string(),
        byte_range: range,
        replacement_text: replacement,
    }
}
