use std::fmt;

/// Error type for validator invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// A requested check name is not a native validator check.
    UnknownCheck(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::UnknownCheck(name) => write!(
                f,
                "unknown check '{}'. Valid: {}",
                name,
                crate::CHECKS.join(", ")
            ),
        }
    }
}

impl std::error::Error for AnalysisError {}
