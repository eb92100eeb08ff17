//! tokenguard migration engine.
//!
//! # Public API
//!
//! - [`plan_migration`] -- read-only rewrite plan for one extracted file
//! - [`Migrator`] -- verify a plan and commit it as one transaction
//! - [`Edit`], [`ImportRequirement`], [`MigrationPlan`] -- plan records

pub mod error;
pub mod executor;
pub mod imports;
pub mod plan;

pub use error::MigrationError;
pub use plan::{plan_migration, Edit, ImportRequirement, MigrationPlan, CHECK_NAME};

use tokenguard_core::{Extraction, Extractor, Registry};

/// Applies migration plans for one run.
pub struct Migrator<'a> {
    registry: &'a Registry,
    extractor: &'a Extractor,
}

impl<'a> Migrator<'a> {
    pub fn new(registry: &'a Registry, extractor: &'a Extractor) -> Self {
        Migrator {
            registry,
            extractor,
        }
    }

    pub fn plan(&self, extraction: &Extraction) -> MigrationPlan {
        plan_migration(extraction, self.registry)
    }

    /// The file text after `plan`, verified but not written.
    pub fn preview(
        &self,
        plan: &MigrationPlan,
        extraction: &Extraction,
    ) -> Result<String, MigrationError> {
        executor::rewrite(plan, extraction, self.extractor, self.registry)
    }

    /// Verify and write `plan`. Returns the number of edits applied; the file
    /// is left untouched on error.
    pub fn apply(
        &self,
        plan: &MigrationPlan,
        extraction: &Extraction,
    ) -> Result<usize, MigrationError> {
        if plan.is_empty() {
            return Ok(0);
        }
        let rewritten = self.preview(plan, extraction)?;
        executor::commit(&plan.file_path, extraction.source(), &rewritten)?;
        tracing::info!(
            file = %plan.file_path.display(),
            edits = plan.edit_count(),
            "migrated"
        );
        Ok(plan.edit_count())
    }
}
