//! tokenguard-core: design-token registry and style-token extraction.
//!
//! # Public API
//!
//! - [`Registry`] -- immutable token registry (load, resolve, reverse lookup)
//! - [`Classifier`] -- constant-time token classification
//! - [`Extractor`] -- parse a source file and collect style segments
//! - [`SyntaxTree`] -- capability trait over the parsed source
//! - [`Violation`] -- the report record shared by validator and migrator

pub mod classify;
pub mod error;
pub mod extract;
pub mod registry;
pub mod source;
pub mod syntax;
pub mod violation;

// ── Convenience re-exports ───────────────────────────────────────────

pub use classify::{Classification, Classifier};
pub use error::{ParseError, RegistryLoadError};
pub use extract::{ExtractedToken, Extraction, Extractor, DEFAULT_ATTRIBUTES};
pub use registry::{PathLookup, Registry, RegistryEntry};
pub use source::{FileSystemProvider, InMemoryProvider, SourceProvider};
pub use syntax::{
    ImportDecl, NamedImport, SegmentKind, StyleSegment, StyleToken, SyntaxTree, TsxTree,
};
pub use violation::{BlockingPolicy, Location, Severity, Violation, ViolationKind};
