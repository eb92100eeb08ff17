//! Run summary and text rendering.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;
use tokenguard_core::{BlockingPolicy, Severity, Violation};
use tokenguard_migrate::Edit;

use crate::runner::{FileResult, FileStatus, RunResult};

/// Totals over a run. Built by summing per-file values only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub files_scanned: usize,
    pub files_with_errors: usize,
    pub files_skipped: usize,
    pub edits_proposed: usize,
    pub edits_applied: usize,
    pub tokens_migratable: usize,
    pub unrecognized_tokens: usize,
    /// Violation kind -> count.
    pub violations: BTreeMap<String, usize>,
    pub blocking: usize,
}

impl Summary {
    pub fn collect(files: &[FileResult], external: &[Violation], policy: BlockingPolicy) -> Self {
        let mut summary = Summary::default();
        for file in files {
            if file.status == FileStatus::Skipped {
                summary.files_skipped += 1;
                continue;
            }
            summary.files_scanned += 1;
            let failed = matches!(
                file.status,
                FileStatus::ParseError | FileStatus::ReadError | FileStatus::WriteError
            );
            if failed || file.violations.iter().any(|v| v.severity == Severity::Error) {
                summary.files_with_errors += 1;
            }
            summary.edits_proposed += file.edits_proposed();
            summary.edits_applied += file.edits_applied;
            summary.tokens_migratable += file.tokens_migratable();
            summary.unrecognized_tokens += file.token_counts.unrecognized;
            summary.count(&file.violations, policy);
        }
        summary.count(external, policy);
        summary
    }

    fn count(&mut self, violations: &[Violation], policy: BlockingPolicy) {
        for v in violations {
            *self.violations.entry(v.kind.to_string()).or_default() += 1;
            if v.is_blocking(policy) {
                self.blocking += 1;
            }
        }
    }
}

const PREVIEW_WIDTH: usize = 60;

/// Human-readable report. `verbose` prints full before/after text for
/// every edit instead of one-line previews.
pub fn render_text(result: &RunResult, verbose: bool) -> String {
    let mut out = String::new();

    for file in &result.files {
        if let Some(plan) = &file.plan {
            for edit in plan.all_edits() {
                render_edit(&mut out, edit, verbose);
            }
        }
        for v in &file.violations {
            let _ = writeln!(out, "{}", v);
        }
        if file.status == FileStatus::Skipped && verbose {
            let _ = writeln!(out, "{}: skipped", file.path.display());
        }
    }
    for v in &result.external {
        let _ = writeln!(out, "{}", v);
    }

    let s = &result.summary;
    if !out.is_empty() {
        out.push('\n');
    }
    let _ = writeln!(
        out,
        "{} summary",
        if result.apply { "Migration" } else { "Dry-run" }
    );
    let _ = writeln!(out, "  files scanned:       {}", s.files_scanned);
    let _ = writeln!(out, "  files with errors:   {}", s.files_with_errors);
    if s.files_skipped > 0 {
        let _ = writeln!(out, "  files skipped:       {}", s.files_skipped);
    }
    let _ = writeln!(out, "  migratable tokens:   {}", s.tokens_migratable);
    let _ = writeln!(out, "  edits proposed:      {}", s.edits_proposed);
    if result.apply {
        let _ = writeln!(out, "  edits applied:       {}", s.edits_applied);
    }
    let _ = writeln!(out, "  unrecognized tokens: {}", s.unrecognized_tokens);
    for (kind, count) in &s.violations {
        let _ = writeln!(out, "  {}: {}", kind, count);
    }
    out
}

fn render_edit(out: &mut String, edit: &Edit, verbose: bool) {
    let _ = writeln!(
        out,
        "{}:{} [{}..{}]",
        edit.file_path.display(),
        edit.line,
        edit.byte_range.start,
        edit.byte_range.end
    );
    if verbose {
        for line in edit.original_text.lines() {
            let _ = writeln!(out, "  - {}", line);
        }
        for line in edit.replacement_text.lines() {
            let _ = writeln!(out, "  + {}", line);
        }
    } else {
        let _ = writeln!(out, "  - {}", preview(&edit.original_text));
        let _ = writeln!(out, "  + {}", preview(&edit.replacement_text));
    }
}

/// First line of `text`, cut to a fixed width.
fn preview(text: &str) -> String {
    let line = text.trim().lines().next().unwrap_or("");
    if line.chars().count() <= PREVIEW_WIDTH {
        return line.to_string();
    }
    let cut: String = line.chars().take(PREVIEW_WIDTH - 3).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tokenguard_core::{Location, ViolationKind};

    #[test]
    fn preview_truncates_long_lines() {
        let long = "x".repeat(100);
        let p = preview(&long);
        assert_eq!(p.chars().count(), PREVIEW_WIDTH);
        assert!(p.ends_with("..."));
        assert_eq!(preview("a\nb"), "a");
    }

    #[test]
    fn edit_preview_shows_range_and_both_sides() {
        let edit = Edit {
            file_path: PathBuf::from("src/A.tsx"),
            byte_range: 30..43,
            line: 3,
            original_text: "\"space-y-4\"".to_string(),
            replacement_text: "{SPACING.content}".to_string(),
        };
        let mut out = String::new();
        render_edit(&mut out, &edit, false);
        assert_eq!(
            out,
            "src/A.tsx:3 [30..43]\n  - \"space-y-4\"\n  + {SPACING.content}\n"
        );
    }

    #[test]
    fn external_violations_are_counted() {
        let v = Violation::new(
            "tlp",
            Location::file(1),
            ViolationKind::ExternalCheck,
            "tlp",
            "failed",
            "",
        );
        let s = Summary::collect(&[], &[v], BlockingPolicy::default());
        assert_eq!(s.blocking, 1);
        assert_eq!(s.violations.get("external-check"), Some(&1));
    }
}
