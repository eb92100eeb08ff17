use std::path::PathBuf;

/// Failure to build the token registry. Always fatal for a run.
#[derive(Debug, thiserror::Error)]
pub enum RegistryLoadError {
    #[error("cannot read registry definition '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed registry definition: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid identifier '{segment}' in token path '{path}'")]
    InvalidIdentifier { path: String, segment: String },

    #[error("token '{path}' has an empty value")]
    EmptyValue { path: String },

    #[error(
        "ambiguous registry: '{raw_value}' maps to both '{first}' and '{second}' in category {category}"
    )]
    DuplicateMapping {
        category: String,
        raw_value: String,
        first: String,
        second: String,
    },

    #[error("alias '{alias}' of '{path}' collides with an existing token path")]
    AliasCollision { alias: String, path: String },

    #[error("replacement '{replacement}' for deprecated token '{path}' is not a live token")]
    InvalidReplacement { path: String, replacement: String },
}

/// A source file that could not be parsed. Scoped to one file.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("parser initialization failed: {0}")]
    ParserInit(String),

    #[error("parser produced no tree")]
    ParseFailed,

    #[error("syntax error at {line}:{column} near `{snippet}`")]
    Syntax {
        line: u32,
        column: u32,
        snippet: String,
    },
}

impl ParseError {
    /// 1-based line of the error, when known.
    pub fn line(&self) -> u32 {
        match self {
            ParseError::Syntax { line, .. } => *line,
            _ => 1,
        }
    }
}
