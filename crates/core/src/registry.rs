//! Token registry: the immutable map between literal style values and
//! canonical dotted-path references.
//!
//! The registry is built once per run from a single JSON definition and then
//! shared read-only between workers (`Arc<Registry>`). It exposes no mutating
//! methods after construction.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RegistryLoadError;

/// One named design token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryEntry {
    /// Top-level export name, e.g. `SPACING`.
    pub category: String,
    /// Full dotted path, e.g. `SPACING.content`.
    pub canonical_path: String,
    /// Whitespace-normalized literal value, e.g. `space-y-4`.
    pub raw_value: String,
    pub deprecated: bool,
    /// Old dotted paths that still resolve to this entry.
    pub aliases: BTreeSet<String>,
    /// Suggested successor for a deprecated entry.
    pub replacement: Option<String>,
}

impl RegistryEntry {
    /// Number of whitespace-separated style tokens in the raw value.
    pub fn token_count(&self) -> usize {
        self.raw_value.split(' ').count()
    }
}

/// How a dotted path resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathLookup<'a> {
    /// The path names a live entry directly.
    Live(&'a RegistryEntry),
    /// The path names an entry marked deprecated.
    Deprecated(&'a RegistryEntry),
    /// The path is a retired alias of a (possibly live) entry.
    Alias(&'a RegistryEntry),
}

impl<'a> PathLookup<'a> {
    pub fn entry(&self) -> &'a RegistryEntry {
        match self {
            PathLookup::Live(e) | PathLookup::Deprecated(e) | PathLookup::Alias(e) => e,
        }
    }
}

// ── Definition format ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Definition {
    module: String,
    categories: BTreeMap<String, CategoryDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CategoryDef {
    #[serde(default)]
    prefixes: Vec<String>,
    tokens: BTreeMap<String, TokenNode>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TokenNode {
    Value(String),
    Entry(EntryDef),
    Group(BTreeMap<String, TokenNode>),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EntryDef {
    value: String,
    #[serde(default)]
    deprecated: bool,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    replacement: Option<String>,
}

// ── Registry ─────────────────────────────────────────────────────────

/// Read-only token registry.
#[derive(Debug)]
pub struct Registry {
    module: String,
    entries: Vec<RegistryEntry>,
    by_path: HashMap<String, usize>,
    by_alias: HashMap<String, usize>,
    /// Normalized raw value -> live entries (any category).
    live_by_raw: HashMap<String, Vec<usize>>,
    /// Normalized raw value -> deprecated entries (any category).
    deprecated_by_raw: HashMap<String, Vec<usize>>,
    prefixes: BTreeMap<String, Vec<String>>,
    max_token_run: usize,
}

impl Registry {
    /// Load and validate a registry definition file.
    pub fn load(path: &Path) -> Result<Registry, RegistryLoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| RegistryLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Registry::from_json_str(&text)
    }

    /// Build a registry from definition JSON text.
    pub fn from_json_str(text: &str) -> Result<Registry, RegistryLoadError> {
        let def: Definition = serde_json::from_str(text)?;
        Registry::from_definition(def)
    }

    fn from_definition(def: Definition) -> Result<Registry, RegistryLoadError> {
        let mut entries = Vec::new();
        let mut prefixes = BTreeMap::new();

        for (category, cat) in def.categories {
            check_identifier(&category, &category)?;
            for (key, node) in cat.tokens {
                flatten(&category, &category, &key, node, &mut entries)?;
            }
            prefixes.insert(category, cat.prefixes);
        }

        let mut by_path = HashMap::new();
        let mut live_by_raw: HashMap<String, Vec<usize>> = HashMap::new();
        let mut deprecated_by_raw: HashMap<String, Vec<usize>> = HashMap::new();

        for (idx, entry) in entries.iter().enumerate() {
            by_path.insert(entry.canonical_path.clone(), idx);
            if entry.deprecated {
                deprecated_by_raw
                    .entry(entry.raw_value.clone())
                    .or_default()
                    .push(idx);
                continue;
            }
            let bucket = live_by_raw.entry(entry.raw_value.clone()).or_default();
            if let Some(&prev) = bucket
                .iter()
                .find(|&&i| entries[i].category == entry.category)
            {
                return Err(RegistryLoadError::DuplicateMapping {
                    category: entry.category.clone(),
                    raw_value: entry.raw_value.clone(),
                    first: entries[prev].canonical_path.clone(),
                    second: entry.canonical_path.clone(),
                });
            }
            bucket.push(idx);
        }

        let mut by_alias = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            for alias in &entry.aliases {
                if by_path.contains_key(alias) || by_alias.insert(alias.clone(), idx).is_some() {
                    return Err(RegistryLoadError::AliasCollision {
                        alias: alias.clone(),
                        path: entry.canonical_path.clone(),
                    });
                }
            }
            if let Some(replacement) = &entry.replacement {
                let live = by_path
                    .get(replacement)
                    .map(|&i| !entries[i].deprecated)
                    .unwrap_or(false);
                if !live {
                    return Err(RegistryLoadError::InvalidReplacement {
                        path: entry.canonical_path.clone(),
                        replacement: replacement.clone(),
                    });
                }
            }
        }

        let max_token_run = entries
            .iter()
            .filter(|e| !e.deprecated)
            .map(RegistryEntry::token_count)
            .max()
            .unwrap_or(1);

        tracing::debug!(
            module = %def.module,
            entries = entries.len(),
            "registry loaded"
        );

        Ok(Registry {
            module: def.module,
            entries,
            by_path,
            by_alias,
            live_by_raw,
            deprecated_by_raw,
            prefixes,
            max_token_run,
        })
    }

    /// Module specifier that exports the token categories.
    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.prefixes.keys().map(String::as_str)
    }

    pub fn has_category(&self, name: &str) -> bool {
        self.prefixes.contains_key(name)
    }

    /// Utility prefixes a category is scoped to. Empty means unscoped.
    pub fn prefixes(&self, category: &str) -> &[String] {
        self.prefixes
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Largest number of style tokens in any live raw value.
    pub fn max_token_run(&self) -> usize {
        self.max_token_run
    }

    /// Raw value for a dotted path (canonical or alias).
    pub fn resolve(&self, path: &str) -> Option<&str> {
        self.lookup_path(path).map(|l| l.entry().raw_value.as_str())
    }

    /// Resolve a dotted path and report how it resolved.
    pub fn lookup_path(&self, path: &str) -> Option<PathLookup<'_>> {
        if let Some(&idx) = self.by_path.get(path) {
            let entry = &self.entries[idx];
            return Some(if entry.deprecated {
                PathLookup::Deprecated(entry)
            } else {
                PathLookup::Live(entry)
            });
        }
        self.by_alias
            .get(path)
            .map(|&idx| PathLookup::Alias(&self.entries[idx]))
    }

    /// Canonical path of the live entry for `raw_value` within `category`.
    pub fn reverse_lookup(&self, category: &str, raw_value: &str) -> Option<&str> {
        self.live_by_raw
            .get(&normalize_raw(raw_value))?
            .iter()
            .map(|&i| &self.entries[i])
            .find(|e| e.category == category)
            .map(|e| e.canonical_path.as_str())
    }

    /// All live entries whose raw value equals `raw_value`, across categories.
    pub fn lookup_mapped(&self, raw_value: &str) -> Vec<&RegistryEntry> {
        self.live_by_raw
            .get(&normalize_raw(raw_value))
            .map(|ids| ids.iter().map(|&i| &self.entries[i]).collect())
            .unwrap_or_default()
    }

    /// Deprecated entries whose raw value equals `raw_value`.
    pub fn lookup_deprecated(&self, raw_value: &str) -> Vec<&RegistryEntry> {
        self.deprecated_by_raw
            .get(&normalize_raw(raw_value))
            .map(|ids| ids.iter().map(|&i| &self.entries[i]).collect())
            .unwrap_or_default()
    }

    /// Closest live dotted path to `invalid`, by edit distance.
    ///
    /// Paths in the same category as `invalid` are preferred. Only used for
    /// diagnostics; never applied automatically.
    pub fn nearest_path(&self, invalid: &str) -> Option<&str> {
        let category = invalid.split('.').next().unwrap_or("");
        self.entries
            .iter()
            .filter(|e| !e.deprecated)
            .map(|e| e.canonical_path.as_str())
            .min_by_key(|p| {
                let other_category = !p.starts_with(&format!("{}.", category));
                (other_category, strsim::levenshtein(invalid, p), *p)
            })
    }
}

fn flatten(
    category: &str,
    parent: &str,
    key: &str,
    node: TokenNode,
    out: &mut Vec<RegistryEntry>,
) -> Result<(), RegistryLoadError> {
    let path = format!("{}.{}", parent, key);
    check_identifier(&path, key)?;

    let (value, deprecated, aliases, replacement) = match node {
        TokenNode::Value(v) => (v, false, Vec::new(), None),
        TokenNode::Entry(e) => (e.value, e.deprecated, e.aliases, e.replacement),
        TokenNode::Group(children) => {
            for (child_key, child) in children {
                flatten(category, &path, &child_key, child, out)?;
            }
            return Ok(());
        }
    };

    let raw_value = normalize_raw(&value);
    if raw_value.is_empty() {
        return Err(RegistryLoadError::EmptyValue { path });
    }
    for alias in &aliases {
        for segment in alias.split('.') {
            check_identifier(alias, segment)?;
        }
    }

    out.push(RegistryEntry {
        category: category.to_string(),
        canonical_path: path,
        raw_value,
        deprecated,
        aliases: aliases.into_iter().collect(),
        replacement,
    });
    Ok(())
}

fn check_identifier(path: &str, segment: &str) -> Result<(), RegistryLoadError> {
    if is_identifier(segment) {
        Ok(())
    } else {
        Err(RegistryLoadError::InvalidIdentifier {
            path: path.to_string(),
            segment: segment.to_string(),
        })
    }
}

/// A JavaScript identifier (ASCII subset).
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Collapse runs of whitespace to a single space and trim.
pub fn normalize_raw(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFINITION: &str = r#"{
        "module": "@/lib/design-tokens",
        "categories": {
            "SPACING": {
                "prefixes": ["space-", "gap-"],
                "tokens": {
                    "content": "space-y-4",
                    "compact": "space-y-2",
                    "section": { "value": "space-y-8", "aliases": ["SPACING.large"] },
                    "loose": { "value": "space-y-6", "deprecated": true, "replacement": "SPACING.section" }
                }
            },
            "TYPOGRAPHY": {
                "tokens": {
                    "heading": { "h1": "text-4xl  font-bold", "h2": "text-2xl font-semibold" }
                }
            }
        }
    }"#;

    fn registry() -> Registry {
        Registry::from_json_str(DEFINITION).unwrap()
    }

    #[test]
    fn resolve_round_trips_every_entry() {
        let reg = registry();
        for entry in reg.entries() {
            assert_eq!(reg.resolve(&entry.canonical_path), Some(entry.raw_value.as_str()));
        }
    }

    #[test]
    fn nested_groups_flatten_to_dotted_paths() {
        let reg = registry();
        assert_eq!(reg.resolve("TYPOGRAPHY.heading.h1"), Some("text-4xl font-bold"));
        assert_eq!(reg.max_token_run(), 2);
    }

    #[test]
    fn reverse_lookup_is_scoped_by_category() {
        let reg = registry();
        assert_eq!(reg.reverse_lookup("SPACING", "space-y-4"), Some("SPACING.content"));
        assert_eq!(reg.reverse_lookup("TYPOGRAPHY", "space-y-4"), None);
    }

    #[test]
    fn deprecated_entries_are_never_mapped() {
        let reg = registry();
        assert!(reg.lookup_mapped("space-y-6").is_empty());
        assert_eq!(reg.lookup_deprecated("space-y-6").len(), 1);
        assert!(matches!(
            reg.lookup_path("SPACING.loose"),
            Some(PathLookup::Deprecated(_))
        ));
    }

    #[test]
    fn aliases_resolve_to_their_entry() {
        let reg = registry();
        match reg.lookup_path("SPACING.large") {
            Some(PathLookup::Alias(e)) => assert_eq!(e.canonical_path, "SPACING.section"),
            other => panic!("expected alias, got {:?}", other),
        }
    }

    #[test]
    fn duplicate_live_value_in_category_is_rejected() {
        let text = r#"{"module": "m", "categories": {"SPACING": {"tokens": {
            "a": "space-y-4", "b": "space-y-4"
        }}}}"#;
        let err = Registry::from_json_str(text).unwrap_err();
        assert!(matches!(err, RegistryLoadError::DuplicateMapping { .. }));
    }

    #[test]
    fn same_value_in_two_categories_is_allowed() {
        let text = r#"{"module": "m", "categories": {
            "SPACING": {"tokens": {"a": "p-4"}},
            "LAYOUT": {"tokens": {"card": "p-4"}}
        }}"#;
        let reg = Registry::from_json_str(text).unwrap();
        assert_eq!(reg.lookup_mapped("p-4").len(), 2);
    }

    #[test]
    fn invalid_identifier_is_rejected() {
        let text = r#"{"module": "m", "categories": {"SPACING": {"tokens": {"2xl": "p-8"}}}}"#;
        let err = Registry::from_json_str(text).unwrap_err();
        assert!(matches!(err, RegistryLoadError::InvalidIdentifier { .. }));
    }

    #[test]
    fn replacement_must_be_live() {
        let text = r#"{"module": "m", "categories": {"SPACING": {"tokens": {
            "old": {"value": "p-1", "deprecated": true, "replacement": "SPACING.missing"}
        }}}}"#;
        let err = Registry::from_json_str(text).unwrap_err();
        assert!(matches!(err, RegistryLoadError::InvalidReplacement { .. }));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            Registry::from_json_str("{ not json"),
            Err(RegistryLoadError::Malformed(_))
        ));
    }

    #[test]
    fn nearest_path_prefers_same_category() {
        let reg = registry();
        assert_eq!(reg.nearest_path("SPACING.nonexistentKey"), Some("SPACING.content"));
        assert_eq!(reg.nearest_path("SPACING.compat"), Some("SPACING.compact"));
    }
}
