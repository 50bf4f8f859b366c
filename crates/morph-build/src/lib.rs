//! Access-layer code generation.
//!
//! Turns a [`SchemaDescriptor`] plus [`GenerationOptions`] into a
//! [`GeneratedSourceSet`]: one source per entity type and one accessor source
//! exposing a collection per entity. Output is a pure function of the inputs.

mod emit;
mod plan;
mod source;

pub use source::{GeneratedSourceSet, SourceFile};

use morph_schema::{
    naming::{is_item_ident, normalize_member_name},
    prelude::*,
};
use plan::NamePlan;
use tracing::debug;

/// Generate the access-layer sources for `schema`.
pub fn generate(
    schema: &SchemaDescriptor,
    options: &GenerationOptions,
) -> Result<GeneratedSourceSet, SchemaError> {
    SourceBuilder::new(schema, options).generate()
}

///
/// SourceBuilder
///

pub struct SourceBuilder<'a> {
    schema: &'a SchemaDescriptor,
    options: &'a GenerationOptions,
}

impl<'a> SourceBuilder<'a> {
    #[must_use]
    pub const fn new(schema: &'a SchemaDescriptor, options: &'a GenerationOptions) -> Self {
        Self { schema, options }
    }

    /// Validate inputs, settle every identifier, then emit all sources.
    pub fn generate(self) -> Result<GeneratedSourceSet, SchemaError> {
        validate_options(self.options)?;
        self.schema.validate()?;

        let plan = NamePlan::build(self.schema, self.options)?;

        let mut files = Vec::with_capacity(plan.entities.len() + 1);
        for entity in &plan.entities {
            files.push(SourceFile::new(
                format!("{}.rs", entity.file),
                emit::entity_source(entity, self.options),
            ));
        }
        files.push(SourceFile::new(
            format!("{}.rs", plan.accessor_file),
            emit::accessor_source(&plan, self.options),
        ));

        debug!(
            entities = plan.entities.len(),
            namespace = %self.options.root_namespace,
            accessor = %plan.accessor,
            lazy = self.options.lazy_materialization,
            "generated access layer sources"
        );

        Ok(GeneratedSourceSet::from_files(files))
    }
}

// Options are reported under a synthetic `<options>` route.
fn validate_options(options: &GenerationOptions) -> Result<(), SchemaError> {
    const ROUTE: &str = "<options>";

    let accessor = &options.accessor_name;
    if !is_item_ident(accessor) || normalize_member_name(accessor).is_empty() {
        return Err(SchemaError::at(
            ROUTE,
            Some("accessor_name"),
            format!("'{accessor}' is not a valid type name"),
        ));
    }

    let namespace_ok = !options.root_namespace.is_empty()
        && options.root_namespace.split("::").all(is_item_ident);
    if !namespace_ok {
        return Err(SchemaError::at(
            ROUTE,
            Some("root_namespace"),
            format!("'{}' is not a valid namespace path", options.root_namespace),
        ));
    }

    Ok(())
}

///
/// TESTS
///
