//! End-to-end migration tests: extract, plan, verify and commit against
//! files in a temporary directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokenguard_core::{Extractor, Registry, ViolationKind};
use tokenguard_migrate::{executor, MigrationError, Migrator};

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

fn registry() -> Arc<Registry> {
    let path = workspace_root().join("crates/cli/tests/fixtures/design-tokens.json");
    Arc::new(Registry::load(&path).unwrap_or_else(|e| panic!("registry: {}", e)))
}

/// Run one migration pass over `path`; returns edits applied.
fn migrate_once(registry: &Registry, path: &Path) -> Result<usize, MigrationError> {
    let extractor = Extractor::default();
    let source = std::fs::read_to_string(path).unwrap();
    let extraction = extractor.extract(path, &source).unwrap();
    let migrator = Migrator::new(registry, &extractor);
    let plan = migrator.plan(&extraction);
    migrator.apply(&plan, &extraction)
}

fn write_fixture(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

#[test]
fn direct_reference_and_import_then_idempotent() {
    let reg = registry();
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(
        dir.path(),
        "Stack.tsx",
        "import React from \"react\";\n\nexport const Stack = () => <div style=\"space-y-4\" />;\n",
    );

    assert_eq!(migrate_once(&reg, &path).unwrap(), 2);
    let migrated = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        migrated,
        "import React from \"react\";\nimport { SPACING } from \"@/design/tokens\";\n\nexport const Stack = () => <div style={SPACING.content} />;\n"
    );

    assert_eq!(migrate_once(&reg, &path).unwrap(), 0);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), migrated);
}

#[test]
fn mixed_literal_keeps_passthrough_in_place() {
    let reg = registry();
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(
        dir.path(),
        "Compact.tsx",
        "export const Compact = () => <ul style=\"space-y-2 mt-4\" />;\n",
    );

    migrate_once(&reg, &path).unwrap();
    let migrated = std::fs::read_to_string(&path).unwrap();
    assert!(migrated.contains("<ul style={`${SPACING.compact} mt-4`} />"));
    assert!(migrated.starts_with("import { SPACING } from \"@/design/tokens\";\n"));
    assert_eq!(migrate_once(&reg, &path).unwrap(), 0);
}

#[test]
fn migration_preserves_resolved_style_values() {
    let reg = registry();
    let extractor = Extractor::default();
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(
        dir.path(),
        "Card.tsx",
        "import { TYPOGRAPHY } from '@/design/tokens'\n\nexport const Card = ({ on }) => (\n  <section className=\"rounded-lg border bg-white p-6\">\n    <h1 className={on ? \"text-4xl font-bold\" : \"text-base\"}>x</h1>\n  </section>\n)\n",
    );

    let values = |p: &Path| {
        let src = std::fs::read_to_string(p).unwrap();
        let extraction = extractor.extract(p, &src).unwrap();
        executor::resolved_values(&extraction, &reg)
    };
    let before = values(&path);

    let source = std::fs::read_to_string(&path).unwrap();
    let extraction = extractor.extract(&path, &source).unwrap();
    let plan = Migrator::new(&reg, &extractor).plan(&extraction);
    assert_eq!(plan.migrated_tokens, 3);

    migrate_once(&reg, &path).unwrap();
    let migrated = std::fs::read_to_string(&path).unwrap();
    assert_eq!(values(&path), before);
    assert!(!migrated.contains("\"text-base\""));
    assert!(migrated.starts_with("import { TYPOGRAPHY, SURFACE } from '@/design/tokens'\n"));
    assert!(migrated.contains("className={`${SURFACE.card} p-6`}"));
    assert!(migrated.contains("on ? TYPOGRAPHY.heading.h1 : TYPOGRAPHY.body"));
}

#[test]
fn stale_file_is_left_untouched() {
    let reg = registry();
    let extractor = Extractor::default();
    let dir = tempfile::tempdir().unwrap();
    let original = "export const A = () => <div style=\"space-y-4\" />;\n";
    let path = write_fixture(dir.path(), "A.tsx", original);

    let extraction = extractor.extract(&path, original).unwrap();
    let migrator = Migrator::new(&reg, &extractor);
    let plan = migrator.plan(&extraction);

    std::fs::write(&path, "export const A = 1;\n").unwrap();
    let err = migrator.apply(&plan, &extraction).unwrap_err();
    assert!(matches!(err, MigrationError::Stale { .. }));
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "export const A = 1;\n"
    );
}

#[test]
fn preview_does_not_write() {
    let reg = registry();
    let extractor = Extractor::default();
    let dir = tempfile::tempdir().unwrap();
    let original = "export const A = () => <div className=\"bg-slate-100 space-y-8\" />;\n";
    let path = write_fixture(dir.path(), "A.tsx", original);

    let extraction = extractor.extract(&path, original).unwrap();
    let migrator = Migrator::new(&reg, &extractor);
    let plan = migrator.plan(&extraction);
    let preview = migrator.preview(&plan, &extraction).unwrap();

    assert!(preview.contains("{`${SURFACE.muted} ${SPACING.section}`}"));
    assert!(preview.contains("import { SPACING, SURFACE } from \"@/design/tokens\";"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
}

/// Plan and verify `src` in memory.
fn preview_of(registry: &Registry, src: &str) -> (tokenguard_migrate::MigrationPlan, String) {
    let extractor = Extractor::default();
    let extraction = extractor.extract(Path::new("A.tsx"), src).unwrap();
    let migrator = Migrator::new(registry, &extractor);
    let plan = migrator.plan(&extraction);
    let text = migrator.preview(&plan, &extraction).unwrap();
    (plan, text)
}

/// The class string a `className={...}` expression evaluates to, for
/// expressions built from string literals, templates, token references and
/// the free variable `x` (bound to "foo") joined with `+`.
fn class_value(registry: &Registry, src: &str) -> String {
    let start = src.find("className={").unwrap() + "className={".len();
    let end = src.rfind("} />").unwrap();
    let lookup = |name: &str| match name {
        "x" => "foo".to_string(),
        path => registry
            .resolve(path)
            .unwrap_or_else(|| panic!("unresolved {}", path))
            .to_string(),
    };
    src[start..end]
        .split(" + ")
        .map(|operand| {
            let operand = operand.trim();
            if let Some(inner) = operand.strip_prefix('"').and_then(|o| o.strip_suffix('"')) {
                return inner.to_string();
            }
            let Some(mut rest) = operand.strip_prefix('`').and_then(|o| o.strip_suffix('`')) else {
                return lookup(operand);
            };
            let mut out = String::new();
            while let Some(open) = rest.find("${") {
                out.push_str(&rest[..open]);
                let close = open + rest[open..].find('}').unwrap();
                out.push_str(&lookup(&rest[open + 2..close]));
                rest = &rest[close + 1..];
            }
            out.push_str(rest);
            out
        })
        .collect()
}

#[test]
fn concatenated_strings_keep_their_runtime_value() {
    let reg = registry();
    let cases = [
        (
            "const A = ({ x }) => <div className={\"space-y-4 \" + x} />;\n",
            "className={`${SPACING.content} ` + x}",
        ),
        (
            "const A = ({ x }) => <div className={`space-y-4 ` + x} />;\n",
            "className={`${SPACING.content} ` + x}",
        ),
        (
            "const A = ({ x }) => <div className={x + \" space-y-4\"} />;\n",
            "className={x + ` ${SPACING.content}`}",
        ),
        (
            "const A = ({ x }) => <div className={\"space-y-4\" + x} />;\n",
            "className={SPACING.content + x}",
        ),
    ];
    for (src, expected) in cases {
        let (plan, out) = preview_of(&reg, src);
        assert_eq!(plan.migrated_tokens, 1, "{}", src);
        assert!(out.contains(expected), "{} -> {}", src, out);
        assert_eq!(class_value(&reg, &out), class_value(&reg, src), "{}", src);
    }
}

#[test]
fn padded_template_without_substitutions_keeps_padding() {
    let reg = registry();
    let src = "const A = ({ x }) => <div className={x + ` space-y-2 `} />;\n";
    let (_, out) = preview_of(&reg, src);
    assert!(out.contains("className={x + ` ${SPACING.compact} `}"));
    assert_eq!(class_value(&reg, &out), "foo space-y-2 ");
    assert_eq!(class_value(&reg, &out), class_value(&reg, src));
}

#[test]
fn type_only_binding_blocks_migration() {
    let reg = registry();
    let dir = tempfile::tempdir().unwrap();
    let original = "import type { SPACING } from \"@/design/tokens\";\nexport const A = () => <div className=\"space-y-4\" />;\n";
    let path = write_fixture(dir.path(), "A.tsx", original);

    let (plan, out) = preview_of(&reg, original);
    assert!(plan.is_empty());
    assert_eq!(plan.violations.len(), 1);
    assert_eq!(plan.violations[0].kind, ViolationKind::ImportConflict);
    assert_eq!(out, original);

    assert_eq!(migrate_once(&reg, &path).unwrap(), 0);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
}

#[test]
fn binding_from_another_module_blocks_migration() {
    let reg = registry();
    let original = "import { SPACING } from \"./legacy-spacing\";\nexport const A = () => <div className=\"space-y-4\" />;\n";
    let (plan, out) = preview_of(&reg, original);
    assert!(plan.is_empty());
    assert_eq!(plan.violations[0].kind, ViolationKind::ImportConflict);
    assert!(plan.violations[0].message.contains("./legacy-spacing"));
    assert_eq!(out, original);
}

#[test]
fn entity_in_attribute_string_is_not_rewritten() {
    let reg = registry();
    let original = "export const A = () => <div className=\"space-y-4 a&amp;b\" />;\n";
    let (plan, out) = preview_of(&reg, original);
    assert!(plan.is_empty());
    assert_eq!(out, original);
}
