//! ensure-import: merge an [`ImportRequirement`] into a file's imports.
//!
//! A declaration is compatible when it imports values (not `import type`,
//! not `* as ns`) from the required module. Missing names are appended to
//! its `{ }` list, or added after its default binding. Without a compatible
//! declaration a new one is inserted after the last import, or after the
//! directive prologue when the file has no imports.

use std::collections::BTreeSet;
use std::ops::Range;
use std::path::Path;

use tokenguard_core::syntax::line_of;
use tokenguard_core::{ImportDecl, SyntaxTree};

use crate::plan::{Edit, ImportRequirement};

/// A required name that the file already binds to something other than the
/// registry export: another module, a type-only import, a default or a
/// namespace binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConflict {
    pub name: String,
    /// Module the existing binding comes from.
    pub module: String,
    /// Range of the conflicting declaration.
    pub range: Range<usize>,
}

/// The edit that makes every name in `requirement` available, or `None`
/// when they are all bound already. Fails when a name is taken by another
/// binding, since the rewritten references would resolve to it.
pub fn ensure_import(
    path: &Path,
    tree: &dyn SyntaxTree,
    requirement: &ImportRequirement,
) -> Result<Option<Edit>, ImportConflict> {
    let source = tree.source();
    let imports = tree.imports();

    let mut missing: BTreeSet<&str> = BTreeSet::new();
    for name in &requirement.names {
        if imports
            .iter()
            .any(|decl| binds_export(decl, &requirement.module_specifier, name))
        {
            continue;
        }
        if let Some(decl) = imports
            .iter()
            .find(|decl| decl.locals(source).any(|local| local == name))
        {
            return Err(ImportConflict {
                name: name.clone(),
                module: decl.module.clone(),
                range: decl.range.clone(),
            });
        }
        missing.insert(name.as_str());
    }
    if missing.is_empty() {
        return Ok(None);
    }
    let names = missing.into_iter().collect::<Vec<_>>().join(", ");

    let compatible = imports.iter().find(|i| {
        i.module == requirement.module_specifier && !i.type_only && i.namespace.is_none()
    });

    if let Some(decl) = compatible {
        if let Some(list) = &decl.named_list {
            let text = &source[list.clone()];
            let inner = &text[1..text.len() - 1];
            let body = inner.trim_end();
            let trailing = &inner[body.len()..];
            let merged = if body.trim().is_empty() {
                format!("{{ {} }}", names)
            } else if body.ends_with(',') {
                format!("{{{} {}{}}}", body, names, trailing)
            } else {
                format!("{{{}, {}{}}}", body, names, trailing)
            };
            return Ok(Some(edit(path, source, list.clone(), merged)));
        }
        if let Some(default) = &decl.default_binding {
            let at = default.end..default.end;
            return Ok(Some(edit(path, source, at, format!(", {{ {} }}", names))));
        }
    }

    let (quote, semicolon) = imports
        .first()
        .map(|i| (i.quote, i.semicolon))
        .unwrap_or(('"', true));
    let line = format!(
        "import {{ {} }} from {q}{}{q}{}",
        names,
        requirement.module_specifier,
        if semicolon { ";" } else { "" },
        q = quote
    );

    let (at, text) = match imports.last() {
        Some(last) => (last.range.end, format!("\n{}", line)),
        None => match tree.prologue_end() {
            0 => (0, format!("{}\n", line)),
            end => (end, format!("\n{}", line)),
        },
    };
    Ok(Some(edit(path, source, at..at, text)))
}

/// `import { name } from module` as a value binding, unaliased.
fn binds_export(decl: &ImportDecl, module: &str, name: &str) -> bool {
    decl.module == module
        && !decl.type_only
        && decl
            .named
            .iter()
            .any(|n| !n.type_only && n.local == name && n.imported == name)
}

fn edit(path: &Path, source: &str, range: Range<usize>, replacement: String) -> Edit {
    Edit {
        file_path: path.to_path_buf(),
        line: line_of(source, range.start),
        original_text: source[range.clone()].to_string(),
        byte_range: range,
        replacement_text: replacement,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokenguard_core::TsxTree;

    const MODULE: &str = "@/design/tokens";

    fn merged(src: &str, names: &[&str]) -> String {
        let tree = TsxTree::parse(src).unwrap();
        let req = ImportRequirement {
            module_specifier: MODULE.to_string(),
            names: names.iter().map(|s| s.to_string()).collect(),
        };
        match ensure_import(Path::new("a.tsx"), &tree, &req).unwrap() {
            Some(e) => {
                let mut out = src.to_string();
                out.replace_range(e.byte_range, &e.replacement_text);
                out
            }
            None => src.to_string(),
        }
    }

    #[test]
    fn appends_to_existing_named_list() {
        let src = "import { COLORS } from \"@/design/tokens\";\nconst a = 1;\n";
        assert_eq!(
            merged(src, &["SPACING"]),
            "import { COLORS, SPACING } from \"@/design/tokens\";\nconst a = 1;\n"
        );
    }

    #[test]
    fn handles_trailing_comma_and_multiline_lists() {
        let src = "import {\n  COLORS,\n} from '@/design/tokens'\nconst a = 1\n";
        assert_eq!(
            merged(src, &["SPACING"]),
            "import {\n  COLORS, SPACING\n} from '@/design/tokens'\nconst a = 1\n"
        );
    }

    #[test]
    fn adds_after_default_binding() {
        let src = "import tokens from \"@/design/tokens\";\n";
        assert_eq!(
            merged(src, &["SPACING"]),
            "import tokens, { SPACING } from \"@/design/tokens\";\n"
        );
    }

    #[test]
    fn already_bound_names_are_skipped() {
        let src = "import { SPACING } from \"@/design/tokens\";\n";
        assert_eq!(merged(src, &["SPACING"]), src);
    }

    #[test]
    fn type_and_namespace_imports_are_not_merged_into() {
        let src = "import type { Theme } from '@/design/tokens';\nimport * as all from '@/design/tokens';\n";
        assert_eq!(
            merged(src, &["SPACING"]),
            format!("{}import {{ SPACING }} from '@/design/tokens';\n", src)
        );
    }

    #[test]
    fn new_import_goes_after_last_import_with_matching_style() {
        let src = "import React from 'react'\n\nexport const A = 1\n";
        assert_eq!(
            merged(src, &["TYPOGRAPHY", "SPACING"]),
            "import React from 'react'\nimport { SPACING, TYPOGRAPHY } from '@/design/tokens'\n\nexport const A = 1\n"
        );
    }

    #[test]
    fn new_import_follows_directive_prologue() {
        let src = "\"use client\";\n\nexport const A = 1;\n";
        assert_eq!(
            merged(src, &["SPACING"]),
            "\"use client\";\nimport { SPACING } from \"@/design/tokens\";\n\nexport const A = 1;\n"
        );
    }

    #[test]
    fn new_import_at_top_of_plain_file() {
        let src = "export const A = 1;\n";
        assert_eq!(
            merged(src, &["SPACING"]),
            "import { SPACING } from \"@/design/tokens\";\nexport const A = 1;\n"
        );
    }

    fn conflict(src: &str, names: &[&str]) -> ImportConflict {
        let tree = TsxTree::parse(src).unwrap();
        let req = ImportRequirement {
            module_specifier: MODULE.to_string(),
            names: names.iter().map(|s| s.to_string()).collect(),
        };
        ensure_import(Path::new("a.tsx"), &tree, &req).unwrap_err()
    }

    #[test]
    fn type_only_binding_is_a_conflict() {
        let err = conflict("import type { SPACING } from \"@/design/tokens\";\n", &["SPACING"]);
        assert_eq!(err.name, "SPACING");
        assert_eq!(err.module, MODULE);

        let err = conflict("import { type SPACING } from \"@/design/tokens\";\n", &["SPACING"]);
        assert_eq!(err.name, "SPACING");
    }

    #[test]
    fn binding_from_another_module_is_a_conflict() {
        let src = "import { SPACING } from \"./legacy-spacing\";\n";
        let err = conflict(src, &["SPACING"]);
        assert_eq!(err.module, "./legacy-spacing");
        assert_eq!(err.range, 0..src.trim_end().len());
    }

    #[test]
    fn aliased_default_and_namespace_bindings_conflict() {
        assert_eq!(
            conflict("import { GAP as SPACING } from \"@/design/tokens\";\n", &["SPACING"]).name,
            "SPACING"
        );
        assert_eq!(
            conflict("import SPACING from \"@/design/tokens\";\n", &["SPACING"]).module,
            MODULE
        );
        assert_eq!(
            conflict("import * as SPACING from \"./s\";\n", &["SPACING"]).module,
            "./s"
        );
    }

    #[test]
    fn aliased_registry_import_still_gets_the_plain_name() {
        let src = "import { SPACING as S } from \"@/design/tokens\";\n";
        assert_eq!(
            merged(src, &["SPACING"]),
            "import { SPACING as S, SPACING } from \"@/design/tokens\";\n"
        );
    }
}
