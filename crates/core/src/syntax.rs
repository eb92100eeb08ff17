//! Syntax-tree capability.
//!
//! The rest of the workspace sees source files only through [`SyntaxTree`]:
//! locating nodes, reading their text, listing style segments and import
//! declarations. Rewriting works on the byte ranges these operations return.
//! [`TsxTree`] implements the trait on top of tree-sitter's TSX grammar.

use std::ops::Range;

use crate::classify::is_canonical_path;
use crate::error::ParseError;

/// A node as seen through the capability interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub kind: String,
    pub range: Range<usize>,
    /// 1-based line of the first byte.
    pub line: u32,
    pub column: u32,
    /// The node is an error or a parser-inserted missing node.
    pub is_error: bool,
}

/// Shape of a style segment, which decides how it can be rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// A quoted string. `jsx_attribute` is set when the string is the
    /// attribute value itself (`className="..."`), where no escapes apply.
    Str { quote: char, jsx_attribute: bool },
    /// A template literal.
    Template { substitutions: usize },
    /// A dotted member expression such as `SPACING.content`.
    Reference,
}

/// A whitespace-delimited style token with its absolute byte range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleToken {
    pub text: String,
    pub range: Range<usize>,
    /// Glued to a template substitution (`text-${size}`); never rewritten.
    pub fragment: bool,
}

/// One string, template or reference node inside a style attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSegment {
    /// Index of the enclosing style attribute in document order.
    pub attribute_id: usize,
    pub attribute: String,
    pub kind: SegmentKind,
    /// Range of the whole node, delimiters included.
    pub range: Range<usize>,
    pub line: u32,
    pub tokens: Vec<StyleToken>,
}

/// An `import` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    pub range: Range<usize>,
    /// Module specifier without quotes.
    pub module: String,
    pub quote: char,
    /// Range of the default binding identifier, if any.
    pub default_binding: Option<Range<usize>>,
    /// Specifiers from the `{ ... }` list.
    pub named: Vec<NamedImport>,
    /// Range of the `{ ... }` list, braces included.
    pub named_list: Option<Range<usize>>,
    /// Local name of a `* as ns` binding.
    pub namespace: Option<String>,
    pub type_only: bool,
    pub semicolon: bool,
}

impl ImportDecl {
    /// Every local name this declaration introduces.
    pub fn locals<'a>(&'a self, source: &'a str) -> impl Iterator<Item = &'a str> {
        self.named
            .iter()
            .map(|n| n.local.as_str())
            .chain(self.default_binding.iter().map(move |r| &source[r.clone()]))
            .chain(self.namespace.as_deref())
    }
}

/// One `{ ... }` specifier: `imported as local`, possibly `type`-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedImport {
    pub imported: String,
    pub local: String,
    pub type_only: bool,
}

/// Read-only access to a parsed source file.
pub trait SyntaxTree {
    fn source(&self) -> &str;

    /// All nodes satisfying `predicate`, in document order.
    fn locate(&self, predicate: &dyn Fn(&SyntaxNode) -> bool) -> Vec<SyntaxNode>;

    fn read(&self, node: &SyntaxNode) -> &str {
        &self.source()[node.range.clone()]
    }

    /// Style segments of every attribute named in `attributes`.
    fn style_segments(&self, attributes: &[String]) -> Vec<StyleSegment>;

    fn imports(&self) -> Vec<ImportDecl>;

    /// Byte offset just past a leading directive prologue (`"use client";`),
    /// or 0 when there is none.
    fn prologue_end(&self) -> usize;
}

/// A TSX/JSX source parsed with tree-sitter.
pub struct TsxTree {
    source: String,
    tree: tree_sitter::Tree,
}

impl TsxTree {
    /// Parse `source`. Any syntax error fails the whole file.
    pub fn parse(source: &str) -> Result<TsxTree, ParseError> {
        let mut parser = tree_sitter::Parser::new();
        let language: tree_sitter::Language = tree_sitter_typescript::LANGUAGE_TSX.into();
        parser
            .set_language(&language)
            .map_err(|e| ParseError::ParserInit(e.to_string()))?;

        let tree = parser.parse(source, None).ok_or(ParseError::ParseFailed)?;
        let parsed = TsxTree {
            source: source.to_string(),
            tree,
        };

        if parsed.tree.root_node().has_error() {
            let first = parsed.locate(&|n| n.is_error).into_iter().next();
            return Err(match first {
                Some(node) => ParseError::Syntax {
                    line: node.line,
                    column: node.column,
                    snippet: snippet(parsed.read(&node)),
                },
                None => ParseError::Syntax {
                    line: 1,
                    column: 1,
                    snippet: String::new(),
                },
            });
        }
        Ok(parsed)
    }

    fn text(&self, node: tree_sitter::Node) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    fn walk_attributes(
        &self,
        node: tree_sitter::Node,
        attributes: &[String],
        out: &mut Vec<StyleSegment>,
        next_id: &mut usize,
    ) {
        if node.kind() == "jsx_attribute" {
            if let Some((attribute, value)) = self.attribute_site(node, attributes) {
                let mut collector = SegmentCollector {
                    tree: self,
                    attribute_id: *next_id,
                    attribute,
                    out: &mut *out,
                };
                collector.attribute_value(value);
                *next_id += 1;
                return;
            }
        }
        for i in 0..node.named_child_count() {
            if let Some(child) = node.named_child(i) {
                self.walk_attributes(child, attributes, out, next_id);
            }
        }
    }

    /// Name and value of a style-bearing attribute.
    fn attribute_site<'t>(
        &self,
        node: tree_sitter::Node<'t>,
        attributes: &[String],
    ) -> Option<(String, tree_sitter::Node<'t>)> {
        let name_node = node.named_child(0)?;
        let name = self.text(name_node);
        if !attributes.iter().any(|a| a == name) {
            return None;
        }
        let value = node.named_child(1)?;
        Some((name.to_string(), value))
    }

    fn import_decl(&self, node: tree_sitter::Node) -> Option<ImportDecl> {
        let source_node = node.child_by_field_name("source")?;
        let source_text = self.text(source_node);
        let quote = source_text.chars().next().unwrap_or('"');
        let module = strip_quotes(source_text).to_string();

        let text = self.text(node);
        let after_import = text.strip_prefix("import").unwrap_or("").trim_start();
        let type_only = after_import.starts_with("type ") || after_import.starts_with("type{");

        let mut decl = ImportDecl {
            range: node.byte_range(),
            module,
            quote,
            default_binding: None,
            named: Vec::new(),
            named_list: None,
            namespace: None,
            type_only,
            semicolon: text.trim_end().ends_with(';'),
        };

        for i in 0..node.named_child_count() {
            let Some(clause) = node.named_child(i) else {
                continue;
            };
            if clause.kind() != "import_clause" {
                continue;
            }
            for j in 0..clause.named_child_count() {
                let Some(part) = clause.named_child(j) else {
                    continue;
                };
                match part.kind() {
                    "identifier" => decl.default_binding = Some(part.byte_range()),
                    "namespace_import" => {
                        let local = (0..part.named_child_count())
                            .filter_map(|k| part.named_child(k))
                            .find(|c| c.kind() == "identifier");
                        decl.namespace =
                            Some(local.map_or(String::new(), |l| self.text(l).to_string()));
                    }
                    "named_imports" => {
                        decl.named_list = Some(part.byte_range());
                        for k in 0..part.named_child_count() {
                            let Some(spec) = part.named_child(k) else {
                                continue;
                            };
                            if spec.kind() != "import_specifier" {
                                continue;
                            }
                            let name = spec.child_by_field_name("name");
                            let alias = spec.child_by_field_name("alias");
                            let Some(local) = alias.or(name) else {
                                continue;
                            };
                            let local = self.text(local).to_string();
                            let imported =
                                name.map_or("default".to_string(), |n| self.text(n).to_string());
                            let spec_text = self.text(spec);
                            let type_only = spec_text.starts_with("type ")
                                && !spec_text.starts_with("type as ");
                            decl.named.push(NamedImport {
                                imported,
                                local,
                                type_only,
                            });
                        }
                    }
                    _ => {}
                }
            }
        }
        Some(decl)
    }
}

impl SyntaxTree for TsxTree {
    fn source(&self) -> &str {
        &self.source
    }

    fn locate(&self, predicate: &dyn Fn(&SyntaxNode) -> bool) -> Vec<SyntaxNode> {
        let mut found = Vec::new();
        let mut cursor = self.tree.walk();
        loop {
            let node = cursor.node();
            let view = SyntaxNode {
                kind: node.kind().to_string(),
                range: node.byte_range(),
                line: node.start_position().row as u32 + 1,
                column: node.start_position().column as u32 + 1,
                is_error: node.is_error() || node.is_missing(),
            };
            if predicate(&view) {
                found.push(view);
            }
            if cursor.goto_first_child() || cursor.goto_next_sibling() {
                continue;
            }
            loop {
                if !cursor.goto_parent() {
                    return found;
                }
                if cursor.goto_next_sibling() {
                    break;
                }
            }
        }
    }

    fn style_segments(&self, attributes: &[String]) -> Vec<StyleSegment> {
        let mut out = Vec::new();
        let mut next_id = 0;
        self.walk_attributes(self.tree.root_node(), attributes, &mut out, &mut next_id);
        out
    }

    fn imports(&self) -> Vec<ImportDecl> {
        let root = self.tree.root_node();
        (0..root.named_child_count())
            .filter_map(|i| root.named_child(i))
            .filter(|n| n.kind() == "import_statement")
            .filter_map(|n| self.import_decl(n))
            .collect()
    }

    fn prologue_end(&self) -> usize {
        let root = self.tree.root_node();
        let mut end = 0;
        for i in 0..root.named_child_count() {
            let Some(child) = root.named_child(i) else {
                break;
            };
            match child.kind() {
                "comment" => continue,
                "expression_statement"
                    if child.named_child_count() == 1
                        && child.named_child(0).map(|n| n.kind()) == Some("string") =>
                {
                    end = child.end_byte();
                }
                _ => break,
            }
        }
        end
    }
}

/// Walks one attribute value and records its segments.
struct SegmentCollector<'a> {
    tree: &'a TsxTree,
    attribute_id: usize,
    attribute: String,
    out: &'a mut Vec<StyleSegment>,
}

impl SegmentCollector<'_> {
    fn attribute_value(&mut self, value: tree_sitter::Node) {
        match value.kind() {
            "string" => self.string(value, true),
            "jsx_expression" => self.expression(value),
            _ => {}
        }
    }

    fn expression(&mut self, node: tree_sitter::Node) {
        match node.kind() {
            "string" => self.string(node, false),
            "template_string" => self.template(node),
            "member_expression" => self.reference(node),
            "ternary_expression" => {
                for field in ["consequence", "alternative"] {
                    if let Some(branch) = node.child_by_field_name(field) {
                        self.expression(branch);
                    }
                }
            }
            "binary_expression" => {
                let op = node
                    .child_by_field_name("operator")
                    .map(|n| n.kind())
                    .unwrap_or("");
                let left = node.child_by_field_name("left");
                let right = node.child_by_field_name("right");
                match op {
                    // The left operand of `&&` is a condition, not style text.
                    "&&" => {
                        if let Some(r) = right {
                            self.expression(r);
                        }
                    }
                    "||" | "??" | "+" => {
                        for side in [left, right].into_iter().flatten() {
                            self.expression(side);
                        }
                    }
                    _ => {}
                }
            }
            "call_expression" => {
                if let Some(args) = node.child_by_field_name("arguments") {
                    self.children(args);
                }
            }
            "jsx_expression" | "parenthesized_expression" | "array" | "template_substitution"
            | "as_expression" | "satisfies_expression" | "non_null_expression" => {
                self.children(node);
            }
            _ => {}
        }
    }

    fn children(&mut self, node: tree_sitter::Node) {
        for i in 0..node.named_child_count() {
            if let Some(child) = node.named_child(i) {
                self.expression(child);
            }
        }
    }

    fn string(&mut self, node: tree_sitter::Node, jsx_attribute: bool) {
        let range = node.byte_range();
        if range.len() < 2 {
            return;
        }
        let quote = self.tree.text(node).chars().next().unwrap_or('"');
        let tokens = split_tokens(&self.tree.source, range.start + 1..range.end - 1, false, false);
        self.push(
            node,
            SegmentKind::Str {
                quote,
                jsx_attribute,
            },
            tokens,
        );
    }

    fn template(&mut self, node: tree_sitter::Node) {
        let range = node.byte_range();
        if range.len() < 2 {
            return;
        }
        let mut substitutions = Vec::new();
        for i in 0..node.named_child_count() {
            if let Some(child) = node.named_child(i) {
                if child.kind() == "template_substitution" {
                    substitutions.push(child);
                }
            }
        }

        // Literal parts are the gaps between substitutions.
        let mut tokens = Vec::new();
        let mut cursor = range.start + 1;
        for sub in &substitutions {
            let glued_left = cursor != range.start + 1;
            tokens.extend(split_tokens(
                &self.tree.source,
                cursor..sub.start_byte(),
                glued_left,
                true,
            ));
            cursor = sub.end_byte();
        }
        let glued_left = !substitutions.is_empty();
        tokens.extend(split_tokens(
            &self.tree.source,
            cursor..range.end - 1,
            glued_left,
            false,
        ));

        self.push(
            node,
            SegmentKind::Template {
                substitutions: substitutions.len(),
            },
            tokens,
        );

        for sub in substitutions {
            self.children(sub);
        }
    }

    fn reference(&mut self, node: tree_sitter::Node) {
        let text: String = self
            .tree
            .text(node)
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if !is_canonical_path(&text) {
            return;
        }
        let token = StyleToken {
            text,
            range: node.byte_range(),
            fragment: false,
        };
        self.push(node, SegmentKind::Reference, vec![token]);
    }

    fn push(&mut self, node: tree_sitter::Node, kind: SegmentKind, tokens: Vec<StyleToken>) {
        self.out.push(StyleSegment {
            attribute_id: self.attribute_id,
            attribute: self.attribute.clone(),
            kind,
            range: node.byte_range(),
            line: node.start_position().row as u32 + 1,
            tokens,
        });
    }
}

/// Split `source[range]` on whitespace. Tokens touching the start (when
/// `glued_start`) or the end (when `glued_end`) of the range are fragments.
pub fn split_tokens(
    source: &str,
    range: Range<usize>,
    glued_start: bool,
    glued_end: bool,
) -> Vec<StyleToken> {
    let text = &source[range.clone()];
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;

    let close = |s: usize, e: usize, tokens: &mut Vec<StyleToken>| {
        let fragment = (glued_start && s == 0) || (glued_end && e == text.len());
        tokens.push(StyleToken {
            text: text[s..e].to_string(),
            range: range.start + s..range.start + e,
            fragment,
        });
    };

    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                close(s, i, &mut tokens);
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        close(s, text.len(), &mut tokens);
    }
    tokens
}

/// 1-based line number of a byte offset.
pub fn line_of(source: &str, offset: usize) -> u32 {
    let end = offset.min(source.len());
    source.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() as u32 + 1
}

fn strip_quotes(s: &str) -> &str {
    if s.len() >= 2 {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn snippet(text: &str) -> String {
    let line = text.lines().next().unwrap_or("");
    line.chars().take(40).collect()
}
