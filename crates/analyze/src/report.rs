//! FileAnalysis: aggregated validator output for one file.
//!
//! Holds the per-check results plus the flattened violation list in
//! document order.

use std::path::PathBuf;

use serde::Serialize;
use tokenguard_core::{Classification, ExtractedToken, Violation};

use crate::legacy_patterns::LegacyResult;
use crate::references::ReferenceResult;

/// Number of tokens per classification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TokenCounts {
    pub known_mapped: usize,
    pub known_unmapped: usize,
    pub canonical_ref: usize,
    pub unrecognized: usize,
}

impl TokenCounts {
    pub fn tally(tokens: &[ExtractedToken]) -> Self {
        let mut counts = TokenCounts::default();
        for t in tokens {
            match t.classification {
                Classification::KnownMapped => counts.known_mapped += 1,
                Classification::KnownUnmapped => counts.known_unmapped += 1,
                Classification::CanonicalRef => counts.canonical_ref += 1,
                Classification::Unrecognized => counts.unrecognized += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.known_mapped + self.known_unmapped + self.canonical_ref + self.unrecognized
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileAnalysis {
    pub file_path: PathBuf,
    pub token_counts: TokenCounts,
    pub references: Option<ReferenceResult>,
    pub legacy_patterns: Option<LegacyResult>,
    pub checks_run: Vec<String>,
    pub violations: Vec<Violation>,
}

impl FileAnalysis {
    pub fn new(file_path: PathBuf, token_counts: TokenCounts) -> Self {
        FileAnalysis {
            file_path,
            token_counts,
            references: None,
            legacy_patterns: None,
            checks_run: Vec::new(),
            violations: Vec::new(),
        }
    }

    /// Rebuild `violations` from the populated check results.
    pub fn collect_violations(&mut self) {
        self.violations.clear();
        if let Some(ref r) = self.references {
            self.violations.extend(r.violations.iter().cloned());
        }
        if let Some(ref l) = self.legacy_patterns {
            self.violations.extend(l.violations.iter().cloned());
        }
        self.violations
            .sort_by_key(|v| (v.location.start, v.location.end, v.check.clone()));
    }
}
