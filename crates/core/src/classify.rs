//! Pattern classifier.
//!
//! Classification is a constant-time lookup: canonical references are
//! recognized syntactically, mapped literals through the registry's reverse
//! index, and legacy literals through a pattern table generated once from
//! three small enumerations (family x variant x shade).

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::registry::Registry;

/// Style families that take a palette colour.
pub const FAMILIES: [&str; 6] = ["bg", "text", "border", "ring", "divide", "placeholder"];
/// Palette variants.
pub const VARIANTS: [&str; 10] = [
    "slate", "gray", "zinc", "neutral", "red", "amber", "green", "blue", "indigo", "purple",
];
/// Palette shades.
pub const SHADES: [u16; 11] = [50, 100, 200, 300, 400, 500, 600, 700, 800, 900, 950];

/// Result of classifying one style token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// A literal with a live registry mapping.
    KnownMapped,
    /// A recognized literal with no live mapping.
    KnownUnmapped,
    /// Already a dotted-path reference.
    CanonicalRef,
    Unrecognized,
}

/// One row of the generated pattern table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternRule {
    pub family: &'static str,
    pub variant: &'static str,
    pub shade: u16,
}

/// Token classifier bound to a registry snapshot.
#[derive(Debug)]
pub struct Classifier {
    registry: Arc<Registry>,
    patterns: HashMap<String, PatternRule>,
}

impl Classifier {
    pub fn new(registry: Arc<Registry>) -> Self {
        Classifier {
            registry,
            patterns: pattern_table(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn classify(&self, token: &str) -> Classification {
        if is_canonical_path(token) {
            return Classification::CanonicalRef;
        }
        if !self.registry.lookup_mapped(token).is_empty() {
            return Classification::KnownMapped;
        }
        if self.pattern(token).is_some() || !self.registry.lookup_deprecated(token).is_empty() {
            return Classification::KnownUnmapped;
        }
        Classification::Unrecognized
    }

    /// The pattern-table row a literal normalizes to, if any.
    pub fn pattern(&self, token: &str) -> Option<&PatternRule> {
        self.patterns.get(normalize_pattern(token))
    }
}

/// Enumerate every family-variant-shade combination.
pub fn pattern_table() -> HashMap<String, PatternRule> {
    let mut table = HashMap::with_capacity(FAMILIES.len() * VARIANTS.len() * SHADES.len());
    for family in FAMILIES {
        for variant in VARIANTS {
            for shade in SHADES {
                table.insert(
                    format!("{}-{}-{}", family, variant, shade),
                    PatternRule {
                        family,
                        variant,
                        shade,
                    },
                );
            }
        }
    }
    table
}

/// Strip the `!` marker, `md:`/`hover:`-style modifiers and `/50` opacity.
pub fn normalize_pattern(token: &str) -> &str {
    let base = token.rsplit(':').next().unwrap_or(token);
    let base = base.strip_prefix('!').unwrap_or(base);
    match base.split_once('/') {
        Some((head, _)) => head,
        None => base,
    }
}

/// `SPACING.content`, `TYPOGRAPHY.heading.h1`: an all-caps root identifier
/// followed by one or more identifier segments.
pub fn is_canonical_path(token: &str) -> bool {
    let mut segments = token.split('.');
    let Some(root) = segments.next() else {
        return false;
    };
    let root_ok = root.chars().next().is_some_and(|c| c.is_ascii_uppercase())
        && root
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
    let mut rest = 0;
    for seg in segments {
        if !crate::registry::is_identifier(seg) {
            return false;
        }
        rest += 1;
    }
    root_ok && rest > 0
}
