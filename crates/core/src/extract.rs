//! Extractor: source text to classified style tokens.

use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::classify::{Classification, Classifier};
use crate::error::ParseError;
use crate::syntax::{StyleSegment, SyntaxTree, TsxTree};

/// Default JSX attributes that carry style tokens.
pub const DEFAULT_ATTRIBUTES: [&str; 3] = ["className", "class", "style"];

/// One occurrence of a style token in a file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedToken {
    pub file_path: PathBuf,
    pub style_attribute_id: usize,
    /// Index into [`Extraction::segments`].
    pub segment: usize,
    pub raw_text: String,
    pub byte_range: Range<usize>,
    pub line: u32,
    pub classification: Classification,
}

/// The parsed file plus its style segments.
pub struct Extraction {
    pub file_path: PathBuf,
    pub segments: Vec<StyleSegment>,
    tree: Box<dyn SyntaxTree>,
}

impl Extraction {
    pub fn tree(&self) -> &dyn SyntaxTree {
        self.tree.as_ref()
    }

    pub fn source(&self) -> &str {
        self.tree.source()
    }

    /// Flatten segments into classified tokens. Template fragments are
    /// always `Unrecognized`.
    pub fn tokens(&self, classifier: &Classifier) -> Vec<ExtractedToken> {
        let newlines: Vec<usize> = self
            .source()
            .match_indices('\n')
            .map(|(i, _)| i)
            .collect();
        let line_of = |offset: usize| newlines.partition_point(|&nl| nl < offset) as u32 + 1;
        self.segments
            .iter()
            .enumerate()
            .flat_map(|(idx, seg)| {
                let line_of = &line_of;
                seg.tokens.iter().map(move |tok| ExtractedToken {
                    file_path: self.file_path.clone(),
                    style_attribute_id: seg.attribute_id,
                    segment: idx,
                    raw_text: tok.text.clone(),
                    byte_range: tok.range.clone(),
                    line: line_of(tok.range.start),
                    classification: if tok.fragment {
                        Classification::Unrecognized
                    } else {
                        classifier.classify(&tok.text)
                    },
                })
            })
            .collect()
    }
}

/// Locates style-bearing attributes in source files.
#[derive(Debug, Clone)]
pub struct Extractor {
    attributes: Vec<String>,
}

impl Default for Extractor {
    fn default() -> Self {
        Extractor::new(DEFAULT_ATTRIBUTES.iter().map(|s| s.to_string()).collect())
    }
}

impl Extractor {
    pub fn new(attributes: Vec<String>) -> Self {
        Extractor { attributes }
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Parse `source` and collect its style segments.
    pub fn extract(&self, path: &Path, source: &str) -> Result<Extraction, ParseError> {
        let tree = TsxTree::parse(source)?;
        let segments = tree.style_segments(&self.attributes);
        tracing::debug!(
            file = %path.display(),
            segments = segments.len(),
            "extracted style segments"
        );
        Ok(Extraction {
            file_path: path.to_path_buf(),
            segments,
            tree: Box::new(tree),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use std::sync::Arc;

    #[test]
    fn tokens_are_classified_in_document_order() {
        let reg = Registry::from_json_str(
            r#"{"module": "m", "categories": {"SPACING": {"tokens": {"content": "space-y-4"}}}}"#,
        )
        .unwrap();
        let classifier = Classifier::new(Arc::new(reg));
        let src = "const A = ({ n }) => (\n  <div className=\"space-y-4 bg-red-500\">\n    <p style={`w-${n} mt-4 ${SPACING.content}`} />\n  </div>\n);\n";
        let extraction = Extractor::default().extract(Path::new("a.tsx"), src).unwrap();
        let tokens = extraction.tokens(&classifier);
        let summary: Vec<(&str, Classification, usize)> = tokens
            .iter()
            .map(|t| (t.raw_text.as_str(), t.classification, t.style_attribute_id))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("space-y-4", Classification::KnownMapped, 0),
                ("bg-red-500", Classification::KnownUnmapped, 0),
                ("w-", Classification::Unrecognized, 1),
                ("mt-4", Classification::Unrecognized, 1),
                ("SPACING.content", Classification::CanonicalRef, 1),
            ]
        );
        assert_eq!(tokens[0].line, 2);
        assert_eq!(&src[tokens[1].byte_range.clone()], "bg-red-500");
    }

    #[test]
    fn parse_errors_are_returned_not_raised() {
        let err = Extractor::default()
            .extract(Path::new("bad.tsx"), "export const = <div")
            .err();
        assert!(matches!(err, Some(ParseError::Syntax { .. })));
    }
}
