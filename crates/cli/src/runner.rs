//! Run driver: a bounded worker pool over the discovered files.
//!
//! Each file is owned by one worker for its whole sub-flow
//! (parse, classify, validate, plan). In apply mode two further parallel
//! stages verify the rewrites and then commit them. Results are merged by
//! summing per-file counts, so totals do not depend on the worker count.
//!
//! Phases: `Idle -> Scanning -> DryRunReport -> Done`, or
//! `Idle -> Scanning -> Migrating -> Writing -> AppliedReport -> Done`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::Serialize;
use tokenguard_analyze::{FileAnalysis, TokenCounts};
use tokenguard_core::{
    BlockingPolicy, Classifier, Extractor, Location, SourceProvider, Violation, ViolationKind,
};
use tokenguard_migrate::{executor, MigrationError, MigrationPlan, Migrator};

use crate::checks::{self, Selection};
use crate::report::Summary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Idle,
    Scanning,
    DryRunReport,
    Migrating,
    Writing,
    AppliedReport,
    Done,
}

impl Phase {
    fn can_advance_to(self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Idle, Phase::Scanning)
                | (Phase::Scanning, Phase::DryRunReport)
                | (Phase::Scanning, Phase::Migrating)
                | (Phase::Migrating, Phase::Writing)
                | (Phase::Writing, Phase::AppliedReport)
                | (Phase::DryRunReport, Phase::Done)
                | (Phase::AppliedReport, Phase::Done)
        )
    }
}

/// Phase history of one run. Never re-enters a phase.
#[derive(Debug, Clone)]
struct PhaseLog {
    history: Vec<Phase>,
}

impl PhaseLog {
    fn new() -> Self {
        PhaseLog {
            history: vec![Phase::Idle],
        }
    }

    fn current(&self) -> Phase {
        *self.history.last().unwrap_or(&Phase::Idle)
    }

    fn advance(&mut self, next: Phase) {
        let current = self.current();
        if !current.can_advance_to(next) {
            tracing::error!(from = ?current, to = ?next, "invalid phase transition ignored");
            return;
        }
        tracing::debug!(from = ?current, to = ?next, "phase");
        self.history.push(next);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileStatus {
    /// Parsed and checked; nothing written.
    Scanned,
    /// Rewritten on disk.
    Migrated,
    ParseError,
    ReadError,
    WriteError,
    /// Not started because the run was stopped.
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub path: PathBuf,
    pub status: FileStatus,
    pub token_counts: TokenCounts,
    pub violations: Vec<Violation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<MigrationPlan>,
    pub edits_applied: usize,
    /// Analysed text, kept only while a rewrite is pending.
    #[serde(skip)]
    source: Option<String>,
}

impl FileResult {
    fn new(path: &Path, status: FileStatus) -> Self {
        FileResult {
            path: path.to_path_buf(),
            status,
            token_counts: TokenCounts::default(),
            violations: Vec::new(),
            plan: None,
            edits_applied: 0,
            source: None,
        }
    }

    pub fn edits_proposed(&self) -> usize {
        self.plan.as_ref().map_or(0, MigrationPlan::edit_count)
    }

    pub fn tokens_migratable(&self) -> usize {
        self.plan.as_ref().map_or(0, |p| p.migrated_tokens)
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub apply: bool,
    pub jobs: usize,
    pub policy: BlockingPolicy,
    pub selection: Selection,
    /// Working directory for legacy check commands.
    pub legacy_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub apply: bool,
    /// Sorted by path.
    pub files: Vec<FileResult>,
    /// Violations from legacy checks, which are not tied to one file.
    pub external: Vec<Violation>,
    pub summary: Summary,
    pub phases: Vec<Phase>,
    #[serde(skip)]
    pub policy: BlockingPolicy,
}

impl RunResult {
    /// 0 when nothing blocks, else 1.
    ///
    /// A parse or read failure only counts when it hit the only file
    /// processed, or under fail-fast (via the blocking policy).
    pub fn exit_code(&self) -> i32 {
        if self.summary.blocking > 0 {
            return 1;
        }
        let processed: Vec<&FileResult> = self
            .files
            .iter()
            .filter(|f| f.status != FileStatus::Skipped)
            .collect();
        match processed.as_slice() {
            [only] if matches!(only.status, FileStatus::ParseError | FileStatus::ReadError) => 1,
            _ => 0,
        }
    }
}

pub struct Runner<'a> {
    classifier: &'a Classifier,
    extractor: &'a Extractor,
    provider: &'a dyn SourceProvider,
    options: &'a RunOptions,
}

impl<'a> Runner<'a> {
    pub fn new(
        classifier: &'a Classifier,
        extractor: &'a Extractor,
        provider: &'a dyn SourceProvider,
        options: &'a RunOptions,
    ) -> Self {
        Runner {
            classifier,
            extractor,
            provider,
            options,
        }
    }

    pub fn run(&self, files: &[PathBuf]) -> Result<RunResult, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.jobs.max(1))
            .build()?;
        let stop = AtomicBool::new(false);
        let mut phases = PhaseLog::new();

        phases.advance(Phase::Scanning);
        tracing::info!(
            files = files.len(),
            jobs = self.options.jobs,
            apply = self.options.apply,
            "scanning"
        );
        let mut results: Vec<FileResult> =
            pool.install(|| files.par_iter().map(|p| self.scan(p, &stop)).collect());

        let mut external = Vec::new();
        if !stop.load(Ordering::SeqCst) && !files.is_empty() {
            for check in &self.options.selection.legacy {
                if let Some(v) = checks::run_legacy(check, files, &self.options.legacy_dir) {
                    external.push(v);
                }
            }
        }

        if self.options.apply {
            phases.advance(Phase::Migrating);
            let rewrites: Vec<Option<Result<String, MigrationError>>> =
                pool.install(|| results.par_iter().map(|r| self.rewrite(r)).collect());

            phases.advance(Phase::Writing);
            pool.install(|| {
                results
                    .par_iter_mut()
                    .zip(rewrites)
                    .for_each(|(result, rewrite)| self.write(result, rewrite, &stop))
            });
            phases.advance(Phase::AppliedReport);
        } else {
            phases.advance(Phase::DryRunReport);
        }

        results.sort_by(|a, b| a.path.cmp(&b.path));
        let summary = Summary::collect(&results, &external, self.options.policy);
        phases.advance(Phase::Done);

        Ok(RunResult {
            apply: self.options.apply,
            files: results,
            external,
            summary,
            phases: phases.history,
            policy: self.options.policy,
        })
    }

    /// Parse, classify, validate and plan one file.
    fn scan(&self, path: &Path, stop: &AtomicBool) -> FileResult {
        if stop.load(Ordering::SeqCst) {
            tracing::debug!(file = %path.display(), "skipped after fail-fast stop");
            return FileResult::new(path, FileStatus::Skipped);
        }

        let source = match self.provider.read_source(path) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "skipping unreadable file");
                let mut result = FileResult::new(path, FileStatus::ReadError);
                result.violations.push(Violation::new(
                    path,
                    Location::file(1),
                    ViolationKind::ParseError,
                    "read",
                    format!("cannot read file: {}", e),
                    "",
                ));
                self.note_blocking(&result, stop);
                return result;
            }
        };

        let extraction = match self.extractor.extract(path, &source) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "skipping file that does not parse");
                let mut result = FileResult::new(path, FileStatus::ParseError);
                let snippet = match &e {
                    tokenguard_core::ParseError::Syntax { snippet, .. } => snippet.clone(),
                    _ => String::new(),
                };
                result.violations.push(Violation::new(
                    path,
                    Location::file(e.line()),
                    ViolationKind::ParseError,
                    "parse",
                    e.to_string(),
                    snippet,
                ));
                self.note_blocking(&result, stop);
                return result;
            }
        };
        tracing::debug!(file = %path.display(), "parsed");

        let validators = &self.options.selection.validators;
        let analysis = match tokenguard_analyze::validate_selected(
            &extraction,
            self.classifier,
            validators,
        ) {
            Ok(a) => a,
            Err(e) => {
                tracing::error!(file = %path.display(), error = %e, "validator rejected check list");
                FileAnalysis::new(
                    path.to_path_buf(),
                    TokenCounts::tally(&extraction.tokens(self.classifier)),
                )
            }
        };

        let plan = self.options.selection.migrate.then(|| {
            Migrator::new(self.classifier.registry(), self.extractor).plan(&extraction)
        });

        let mut result = FileResult::new(path, FileStatus::Scanned);
        result.token_counts = analysis.token_counts;
        result.violations = analysis.violations;
        if let Some(plan) = &plan {
            result.violations.extend(plan.violations.iter().cloned());
            result
                .violations
                .sort_by_key(|v| (v.location.start, v.location.end));
        }
        if self.options.apply && plan.as_ref().is_some_and(|p| !p.is_empty()) {
            result.source = Some(source);
        }
        result.plan = plan;

        self.note_blocking(&result, stop);
        result
    }

    /// Verify a pending rewrite in memory.
    fn rewrite(&self, result: &FileResult) -> Option<Result<String, MigrationError>> {
        let plan = result.plan.as_ref()?;
        let source = result.source.as_deref()?;
        tracing::debug!(file = %result.path.display(), "migrating");
        let extraction = match self.extractor.extract(&result.path, source) {
            Ok(e) => e,
            Err(e) => return Some(Err(MigrationError::Reparse(e))),
        };
        Some(Migrator::new(self.classifier.registry(), self.extractor).preview(plan, &extraction))
    }

    /// Commit a verified rewrite, or record why it failed.
    fn write(
        &self,
        result: &mut FileResult,
        rewrite: Option<Result<String, MigrationError>>,
        stop: &AtomicBool,
    ) {
        let Some(rewrite) = rewrite else {
            return;
        };
        let original = result.source.take().unwrap_or_default();

        let outcome = rewrite.and_then(|text| {
            if stop.load(Ordering::SeqCst) {
                return Ok(None);
            }
            executor::commit(&result.path, &original, &text).map(|()| Some(()))
        });

        match outcome {
            Ok(Some(())) => {
                result.status = FileStatus::Migrated;
                result.edits_applied = result.edits_proposed();
                tracing::info!(
                    file = %result.path.display(),
                    edits = result.edits_applied,
                    "written"
                );
            }
            Ok(None) => {
                tracing::warn!(file = %result.path.display(), "not written: run stopped");
            }
            Err(e) => {
                tracing::warn!(file = %result.path.display(), error = %e, "migration not written");
                result.status = FileStatus::WriteError;
                result.violations.push(Violation::new(
                    &result.path,
                    Location::file(1),
                    ViolationKind::WriteError,
                    tokenguard_migrate::CHECK_NAME,
                    e.to_string(),
                    "",
                ));
                self.note_blocking(result, stop);
            }
        }
    }

    fn note_blocking(&self, result: &FileResult, stop: &AtomicBool) {
        let policy = self.options.policy;
        if policy.fail_fast && result.violations.iter().any(|v| v.is_blocking(policy)) {
            if !stop.swap(true, Ordering::SeqCst) {
                tracing::info!(file = %result.path.display(), "fail-fast: stopping run");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokenguard_core::{InMemoryProvider, Registry};

    fn classifier() -> Classifier {
        let reg = Registry::from_json_str(
            r#"{"module": "@/t", "categories": {"SPACING": {"tokens": {"content": "space-y-4", "compact": "space-y-2"}}}}"#,
        )
        .unwrap();
        Classifier::new(Arc::new(reg))
    }

    fn provider() -> (InMemoryProvider, Vec<PathBuf>) {
        let mut files = HashMap::new();
        let mut paths = Vec::new();
        for i in 0..12 {
            let path = PathBuf::from(format!("src/C{:02}.tsx", i));
            let body = match i % 4 {
                0 => "export const A = () => <div style=\"space-y-4\" />;\n".to_string(),
                1 => "export const A = () => <div className=\"space-y-2 bg-red-500 w-4\" />;\n".to_string(),
                2 => "export const A = () => <div className={SPACING.missing} />;\n".to_string(),
                _ => "export const A = () => <div className=\"x\">;\n".to_string(),
            };
            files.insert(path.clone(), body);
            paths.push(path);
        }
        (InMemoryProvider::new(files), paths)
    }

    fn options(jobs: usize, policy: BlockingPolicy) -> RunOptions {
        RunOptions {
            apply: false,
            jobs,
            policy,
            selection: checks::select(None, &[]).unwrap(),
            legacy_dir: PathBuf::from("."),
        }
    }

    #[test]
    fn counts_do_not_depend_on_worker_count() {
        let classifier = classifier();
        let extractor = Extractor::default();
        let (provider, paths) = provider();

        let one = options(1, BlockingPolicy::default());
        let four = options(4, BlockingPolicy::default());
        let a = Runner::new(&classifier, &extractor, &provider, &one)
            .run(&paths)
            .unwrap();
        let b = Runner::new(&classifier, &extractor, &provider, &four)
            .run(&paths)
            .unwrap();

        assert_eq!(a.summary, b.summary);
        assert_eq!(a.summary.files_scanned, 12);
        assert_eq!(a.summary.edits_proposed, 12);
        assert_eq!(a.summary.tokens_migratable, 6);
        let order: Vec<&PathBuf> = a.files.iter().map(|f| &f.path).collect();
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(order, sorted);
    }

    #[test]
    fn dry_run_phases_and_exit_code() {
        let classifier = classifier();
        let extractor = Extractor::default();
        let (provider, paths) = provider();
        let opts = options(2, BlockingPolicy::default());
        let result = Runner::new(&classifier, &extractor, &provider, &opts)
            .run(&paths)
            .unwrap();
        assert_eq!(
            result.phases,
            vec![Phase::Idle, Phase::Scanning, Phase::DryRunReport, Phase::Done]
        );
        // Parse errors in some files and unknown references are not blocking.
        assert_eq!(result.exit_code(), 0);
    }

    #[test]
    fn strict_makes_unknown_references_blocking() {
        let classifier = classifier();
        let extractor = Extractor::default();
        let (provider, paths) = provider();
        let opts = options(
            2,
            BlockingPolicy {
                strict: true,
                fail_fast: false,
            },
        );
        let result = Runner::new(&classifier, &extractor, &provider, &opts)
            .run(&paths)
            .unwrap();
        assert_eq!(result.summary.blocking, 3);
        assert_eq!(result.exit_code(), 1);
    }

    #[test]
    fn fail_fast_skips_remaining_files() {
        let classifier = classifier();
        let extractor = Extractor::default();
        let (provider, paths) = provider();
        let opts = options(
            1,
            BlockingPolicy {
                strict: false,
                fail_fast: true,
            },
        );
        let result = Runner::new(&classifier, &extractor, &provider, &opts)
            .run(&paths)
            .unwrap();
        assert_eq!(result.exit_code(), 1);
        assert!(result.summary.files_skipped > 0);
        assert!(result
            .files
            .iter()
            .any(|f| f.status == FileStatus::Skipped));
    }

    #[test]
    fn a_single_unparsable_file_fails_the_run() {
        let classifier = classifier();
        let extractor = Extractor::default();
        let (provider, paths) = provider();
        let opts = options(1, BlockingPolicy::default());
        let result = Runner::new(&classifier, &extractor, &provider, &opts)
            .run(&paths[3..4])
            .unwrap();
        assert_eq!(result.files[0].status, FileStatus::ParseError);
        assert_eq!(result.exit_code(), 1);
    }

    #[test]
    fn phases_reject_reentry() {
        let mut log = PhaseLog::new();
        log.advance(Phase::Scanning);
        log.advance(Phase::Scanning);
        log.advance(Phase::DryRunReport);
        log.advance(Phase::Done);
        assert_eq!(
            log.history,
            vec![Phase::Idle, Phase::Scanning, Phase::DryRunReport, Phase::Done]
        );
    }
}
