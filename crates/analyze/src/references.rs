//! token-references: every canonical reference must resolve.
//!
//! Unresolved paths are `UnknownReference` errors carrying the nearest valid
//! path. Deprecated paths and retired aliases are `DeprecatedUsage` warnings.

use serde::Serialize;
use tokenguard_core::{
    Classification, ExtractedToken, Location, PathLookup, Registry, Violation, ViolationKind,
};

pub const CHECK_NAME: &str = "token-references";

/// Aggregated token-references result for one file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReferenceResult {
    pub references_checked: usize,
    pub unknown: usize,
    pub deprecated: usize,
    #[serde(skip)]
    pub violations: Vec<Violation>,
}

pub fn check_references(tokens: &[ExtractedToken], registry: &Registry) -> ReferenceResult {
    let mut result = ReferenceResult::default();

    for token in tokens
        .iter()
        .filter(|t| t.classification == Classification::CanonicalRef)
    {
        result.references_checked += 1;
        let path = token.raw_text.as_str();
        let location = Location::new(token.line, token.byte_range.start, token.byte_range.end);

        match registry.lookup_path(path) {
            None => {
                result.unknown += 1;
                let mut v = Violation::new(
                    &token.file_path,
                    location,
                    ViolationKind::UnknownReference,
                    CHECK_NAME,
                    format!("unknown token reference `{}`", path),
                    path,
                );
                if let Some(nearest) = registry.nearest_path(path) {
                    v = v.with_suggestion(nearest);
                }
                result.violations.push(v);
            }
            Some(PathLookup::Live(_)) => {}
            Some(PathLookup::Deprecated(entry)) => {
                result.deprecated += 1;
                let mut v = Violation::new(
                    &token.file_path,
                    location,
                    ViolationKind::DeprecatedUsage,
                    CHECK_NAME,
                    format!("token `{}` is deprecated", path),
                    path,
                );
                if let Some(replacement) = &entry.replacement {
                    v = v.with_suggestion(replacement);
                }
                result.violations.push(v);
            }
            Some(PathLookup::Alias(entry)) => {
                result.deprecated += 1;
                let target = if entry.deprecated {
                    entry
                        .replacement
                        .as_deref()
                        .unwrap_or(&entry.canonical_path)
                } else {
                    &entry.canonical_path
                };
                result.violations.push(
                    Violation::new(
                        &token.file_path,
                        location,
                        ViolationKind::DeprecatedUsage,
                        CHECK_NAME,
                        format!(
                            "`{}` is a retired alias of `{}`",
                            path, entry.canonical_path
                        ),
                        path,
                    )
                    .with_suggestion(target),
                );
            }
        }
    }

    result
}
