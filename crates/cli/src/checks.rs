//! Check catalog: native checks plus legacy scripts from the config.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;
use tokenguard_core::{Location, Violation, ViolationKind};

use crate::config::LegacyCheck;

/// Native checks with their descriptions, in run order.
pub const NATIVE_CHECKS: [(&str, &str); 3] = [
    (
        tokenguard_analyze::references::CHECK_NAME,
        "canonical token references resolve to live registry entries",
    ),
    (
        tokenguard_analyze::legacy_patterns::CHECK_NAME,
        "hard-coded palette literals with no design token",
    ),
    (
        tokenguard_migrate::CHECK_NAME,
        "rewrite mapped literals into canonical token references",
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    Native,
    Legacy,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckInfo {
    pub name: String,
    pub kind: CheckKind,
    pub description: String,
}

/// Every available check. Natives shadow legacy checks of the same name.
pub fn catalog(legacy: &[LegacyCheck]) -> Vec<CheckInfo> {
    let mut out: Vec<CheckInfo> = NATIVE_CHECKS
        .iter()
        .map(|(name, description)| CheckInfo {
            name: name.to_string(),
            kind: CheckKind::Native,
            description: description.to_string(),
        })
        .collect();
    for check in legacy {
        if is_native(&check.name) {
            tracing::warn!(check = %check.name, "legacy check shadowed by native check");
            continue;
        }
        out.push(CheckInfo {
            name: check.name.clone(),
            kind: CheckKind::Legacy,
            description: check.description.clone(),
        });
    }
    out
}

fn is_native(name: &str) -> bool {
    NATIVE_CHECKS.iter().any(|(n, _)| *n == name)
}

/// What a run executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Native validator checks (`token-references`, `legacy-patterns`).
    pub validators: Vec<&'static str>,
    pub migrate: bool,
    pub legacy: Vec<LegacyCheck>,
}

/// Resolve `--module`. `None` selects everything.
pub fn select(module: Option<&str>, legacy: &[LegacyCheck]) -> Result<Selection, String> {
    let validators: Vec<&'static str> = tokenguard_analyze::CHECKS.to_vec();
    let unshadowed = |c: &&LegacyCheck| !is_native(&c.name);

    let Some(name) = module else {
        return Ok(Selection {
            validators,
            migrate: true,
            legacy: legacy.iter().filter(unshadowed).cloned().collect(),
        });
    };

    if let Some(&check) = validators.iter().find(|c| **c == name) {
        return Ok(Selection {
            validators: vec![check],
            migrate: false,
            legacy: Vec::new(),
        });
    }
    if name == tokenguard_migrate::CHECK_NAME {
        return Ok(Selection {
            validators: Vec::new(),
            migrate: true,
            legacy: Vec::new(),
        });
    }
    if let Some(check) = legacy.iter().find(|c| c.name == name) {
        return Ok(Selection {
            validators: Vec::new(),
            migrate: false,
            legacy: vec![check.clone()],
        });
    }

    let known: Vec<String> = catalog(legacy).into_iter().map(|c| c.name).collect();
    Err(format!(
        "unknown check module '{}'. Valid: {}",
        name,
        known.join(", ")
    ))
}

/// Run a legacy script once over `files`. A non-zero exit or a spawn
/// failure becomes an `ExternalCheck` violation.
pub fn run_legacy(check: &LegacyCheck, files: &[PathBuf], dir: &Path) -> Option<Violation> {
    let (program, args) = check.command.split_first()?;
    tracing::info!(check = %check.name, files = files.len(), "running legacy check");

    let result = Command::new(program)
        .args(args)
        .args(files.iter().map(|f| absolute(f)))
        .current_dir(dir)
        .output();

    let message = match result {
        Ok(output) if output.status.success() => return None,
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
            match output.status.code() {
                Some(code) => format!("legacy check failed with exit code {}: {}", code, detail),
                None => format!("legacy check terminated by signal: {}", detail),
            }
        }
        Err(e) => format!("cannot run '{}': {}", program, e),
    };

    Some(Violation::new(
        PathBuf::from(&check.name),
        Location::file(1),
        ViolationKind::ExternalCheck,
        &check.name,
        message.trim_end().to_string(),
        check.command.join(" "),
    ))
}

/// Legacy commands run in the config directory, so hand them absolute paths.
fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
