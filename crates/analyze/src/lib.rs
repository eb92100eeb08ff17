//! tokenguard validator -- native checks over extracted style tokens.
//!
//! Each check is a separate module producing a serializable result struct.
//! [`validate`] runs every native check and aggregates results into a
//! [`FileAnalysis`]. The validator never modifies files.

pub mod error;
pub mod legacy_patterns;
pub mod references;
pub mod report;

pub use error::AnalysisError;
pub use legacy_patterns::LegacyResult;
pub use references::ReferenceResult;
pub use report::{FileAnalysis, TokenCounts};

use tokenguard_core::{Classifier, Extraction};

/// Native validator checks, in run order.
pub const CHECKS: [&str; 2] = [references::CHECK_NAME, legacy_patterns::CHECK_NAME];

/// Run every native check on one extracted file.
pub fn validate(extraction: &Extraction, classifier: &Classifier) -> FileAnalysis {
    let tokens = extraction.tokens(classifier);
    let mut analysis = FileAnalysis::new(extraction.file_path.clone(), TokenCounts::tally(&tokens));

    analysis.references = Some(references::check_references(
        &tokens,
        classifier.registry(),
    ));
    analysis.legacy_patterns = Some(legacy_patterns::check_legacy_patterns(&tokens, classifier));
    analysis.checks_run = CHECKS.iter().map(|c| c.to_string()).collect();

    analysis.collect_violations();
    analysis
}

/// Run only the named checks.
///
/// Valid check names are listed in [`CHECKS`].
pub fn validate_selected(
    extraction: &Extraction,
    classifier: &Classifier,
    checks: &[&str],
) -> Result<FileAnalysis, AnalysisError> {
    if let Some(unknown) = checks.iter().find(|c| !CHECKS.contains(*c)) {
        return Err(AnalysisError::UnknownCheck(unknown.to_string()));
    }

    let tokens = extraction.tokens(classifier);
    let mut analysis = FileAnalysis::new(extraction.file_path.clone(), TokenCounts::tally(&tokens));

    if checks.contains(&references::CHECK_NAME) {
        analysis.references = Some(references::check_references(
            &tokens,
            classifier.registry(),
        ));
        analysis.checks_run.push(references::CHECK_NAME.to_string());
    }
    if checks.contains(&legacy_patterns::CHECK_NAME) {
        analysis.legacy_patterns =
            Some(legacy_patterns::check_legacy_patterns(&tokens, classifier));
        analysis.checks_run.push(legacy_patterns::CHECK_NAME.to_string());
    }

    analysis.collect_violations();
    tracing::debug!(
        file = %analysis.file_path.display(),
        violations = analysis.violations.len(),
        "validated"
    );
    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;
    use tokenguard_core::{Extractor, Registry, ViolationKind};

    fn classifier() -> Classifier {
        let reg = Registry::from_json_str(
            r#"{
                "module": "@/design/tokens",
                "categories": {
                    "SPACING": {"tokens": {
                        "content": "space-y-4",
                        "old": {"value": "space-y-8", "deprecated": true, "replacement": "SPACING.content"}
                    }}
                }
            }"#,
        )
        .unwrap();
        Classifier::new(Arc::new(reg))
    }

    fn extract(src: &str) -> Extraction {
        Extractor::default()
            .extract(Path::new("App.tsx"), src)
            .unwrap()
    }

    #[test]
    fn full_validate_runs_both_checks() {
        let c = classifier();
        let e = extract(
            "const A = () => <div className={`${SPACING.contnt} bg-red-500`} />;\n",
        );
        let analysis = validate(&e, &c);
        assert_eq!(analysis.checks_run, vec!["token-references", "legacy-patterns"]);
        let kinds: Vec<ViolationKind> = analysis.violations.iter().map(|v| v.kind).collect();
        assert_eq!(
            kinds,
            vec![ViolationKind::UnknownReference, ViolationKind::LegacyPattern]
        );
        assert_eq!(
            analysis.violations[0].suggestion.as_deref(),
            Some("SPACING.content")
        );
        assert_eq!(analysis.token_counts.canonical_ref, 1);
        assert_eq!(analysis.token_counts.known_unmapped, 1);
    }

    #[test]
    fn selected_checks_only() {
        let c = classifier();
        let e = extract("const A = () => <div className=\"bg-red-500\" />;\n");
        let analysis = validate_selected(&e, &c, &["token-references"]).unwrap();
        assert!(analysis.legacy_patterns.is_none());
        assert!(analysis.violations.is_empty());
    }

    #[test]
    fn unknown_check_is_rejected() {
        let c = classifier();
        let e = extract("const A = 1;\n");
        let err = validate_selected(&e, &c, &["prettier"]).unwrap_err();
        assert_eq!(err, AnalysisError::UnknownCheck("prettier".to_string()));
    }

    #[test]
    fn deprecated_literal_points_at_replacement() {
        let c = classifier();
        let e = extract("const A = () => <div className=\"space-y-8\" />;\n");
        let analysis = validate(&e, &c);
        assert_eq!(analysis.violations.len(), 1);
        let v = &analysis.violations[0];
        assert_eq!(v.kind, ViolationKind::LegacyPattern);
        assert_eq!(v.suggestion.as_deref(), Some("SPACING.content"));
    }

    #[test]
    fn analysis_is_serializable() {
        let c = classifier();
        let e = extract("const A = () => <div className=\"space-y-4\" />;\n");
        let json = serde_json::to_value(validate(&e, &c)).unwrap();
        assert_eq!(json["token_counts"]["known_mapped"], 1);
        assert!(json["checks_run"].is_array());
    }
}
