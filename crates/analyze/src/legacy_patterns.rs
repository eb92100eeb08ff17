//! legacy-patterns: hard-coded literals that have no live token.
//!
//! Every `KnownUnmapped` token is reported once as a non-blocking
//! `LegacyPattern` suggestion. When the literal is the value of a deprecated
//! token, the suggestion points at that token's replacement.

use std::collections::BTreeMap;

use serde::Serialize;
use tokenguard_core::{
    Classification, Classifier, ExtractedToken, Location, Violation, ViolationKind,
};

pub const CHECK_NAME: &str = "legacy-patterns";

/// Aggregated legacy-patterns result for one file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LegacyResult {
    pub literals: usize,
    /// Palette family -> occurrences (`bg`, `text`, ...).
    pub by_family: BTreeMap<String, usize>,
    #[serde(skip)]
    pub violations: Vec<Violation>,
}

pub fn check_legacy_patterns(tokens: &[ExtractedToken], classifier: &Classifier) -> LegacyResult {
    let mut result = LegacyResult::default();
    let registry = classifier.registry();

    for token in tokens
        .iter()
        .filter(|t| t.classification == Classification::KnownUnmapped)
    {
        result.literals += 1;
        let raw = token.raw_text.as_str();
        let location = Location::new(token.line, token.byte_range.start, token.byte_range.end);

        let deprecated = registry.lookup_deprecated(raw);
        let violation = if let Some(entry) = deprecated.first() {
            let v = Violation::new(
                &token.file_path,
                location,
                ViolationKind::LegacyPattern,
                CHECK_NAME,
                format!(
                    "`{}` is the value of deprecated token `{}`",
                    raw, entry.canonical_path
                ),
                raw,
            );
            match &entry.replacement {
                Some(r) => v.with_suggestion(r),
                None => v,
            }
        } else {
            let family = classifier
                .pattern(raw)
                .map(|rule| rule.family)
                .unwrap_or("style");
            *result.by_family.entry(family.to_string()).or_default() += 1;
            Violation::new(
                &token.file_path,
                location,
                ViolationKind::LegacyPattern,
                CHECK_NAME,
                format!("hard-coded {} colour `{}` has no design token", family, raw),
                raw,
            )
        };
        result.violations.push(violation);
    }

    result
}
