use std::ops::Range;
use std::path::PathBuf;

use tokenguard_core::ParseError;

/// A migration transaction that could not be committed. The original file
/// is left untouched in every case.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("cannot read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("edits overlap at bytes {first:?} and {second:?}")]
    Overlap {
        first: Range<usize>,
        second: Range<usize>,
    },

    #[error("edit at bytes {range:?} no longer matches the source")]
    Mismatch { range: Range<usize> },

    #[error("rewritten source does not parse: {0}")]
    Reparse(#[from] ParseError),

    #[error("rewrite would change the resolved style values ({before} tokens before, {after} after)")]
    ValuesChanged { before: usize, after: usize },

    #[error("'{path}' changed on disk since it was analysed")]
    Stale { path: PathBuf },

    #[error("cannot write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
