use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Category of a reported problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ViolationKind {
    UnknownReference,
    DeprecatedUsage,
    AmbiguousMigration,
    /// A required token name is already bound to something else.
    ImportConflict,
    LegacyPattern,
    ParseError,
    WriteError,
    ExternalCheck,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ViolationKind::UnknownReference => "unknown-reference",
            ViolationKind::DeprecatedUsage => "deprecated-usage",
            ViolationKind::AmbiguousMigration => "ambiguous-migration",
            ViolationKind::ImportConflict => "import-conflict",
            ViolationKind::LegacyPattern => "legacy-pattern",
            ViolationKind::ParseError => "parse-error",
            ViolationKind::WriteError => "write-error",
            ViolationKind::ExternalCheck => "external-check",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Position of a violation inside its file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    /// 1-based line.
    pub line: u32,
    pub start: usize,
    pub end: usize,
}

impl Location {
    pub fn new(line: u32, start: usize, end: usize) -> Self {
        Location { line, start, end }
    }

    /// Whole-file location, used for parse and write failures.
    pub fn file(line: u32) -> Self {
        Location {
            line,
            start: 0,
            end: 0,
        }
    }
}

/// Which violation kinds stop the run from succeeding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockingPolicy {
    pub strict: bool,
    pub fail_fast: bool,
}

/// A reported problem. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub file_path: PathBuf,
    pub location: Location,
    pub kind: ViolationKind,
    pub severity: Severity,
    /// Name of the check that produced it.
    pub check: String,
    pub message: String,
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Violation {
    pub fn new(
        file_path: impl Into<PathBuf>,
        location: Location,
        kind: ViolationKind,
        check: &str,
        message: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        let severity = match kind {
            ViolationKind::UnknownReference
            | ViolationKind::ParseError
            | ViolationKind::WriteError
            | ViolationKind::ExternalCheck => Severity::Error,
            ViolationKind::DeprecatedUsage
            | ViolationKind::AmbiguousMigration
            | ViolationKind::ImportConflict
            | ViolationKind::LegacyPattern => Severity::Warning,
        };
        Violation {
            file_path: file_path.into(),
            location,
            kind,
            severity,
            check: check.to_string(),
            message: message.into(),
            snippet: snippet.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Whether this violation fails the run under `policy`.
    ///
    /// Parse errors only block under fail-fast here; the single-file rule
    /// is applied by the run aggregator.
    pub fn is_blocking(&self, policy: BlockingPolicy) -> bool {
        match self.kind {
            ViolationKind::WriteError | ViolationKind::ExternalCheck => true,
            ViolationKind::UnknownReference => policy.strict || policy.fail_fast,
            ViolationKind::ParseError => policy.fail_fast,
            ViolationKind::DeprecatedUsage
            | ViolationKind::AmbiguousMigration
            | ViolationKind::ImportConflict
            | ViolationKind::LegacyPattern => false,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {} [{}] {}",
            self.file_path.display(),
            self.location.line,
            match self.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
            },
            self.kind,
            self.message
        )?;
        if let Some(s) = &self.suggestion {
            write!(f, " (did you mean `{}`?)", s)?;
        }
        Ok(())
    }
}
