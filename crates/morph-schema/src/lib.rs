//! Schema descriptors consumed by the Morph pipeline.
//!
//! A [`SchemaDescriptor`](node::SchemaDescriptor) is produced by an external
//! introspection collaborator; this crate owns its shape, the scalar type
//! vocabulary, generation options, residency rules, validation, and the names shared
//! by generated code and the compiler that reads it.

pub mod error;
pub mod naming;
pub mod node;
pub mod options;
pub mod residency;
pub mod types;
pub mod validate;
pub mod vocab;

/// Maximum length for entity schema identifiers.
pub const MAX_ENTITY_NAME_LEN: usize = 64;

/// Maximum length for property and relationship identifiers.
pub const MAX_MEMBER_NAME_LEN: usize = 64;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        err,
        error::{ErrorTree, SchemaError, SchemaIssue},
        node::*,
        options::GenerationOptions,
        residency::{ConfigurationConflictError, ContextKind},
        types::{Cardinality, ScalarType},
    };
    pub use serde::{Deserialize, Serialize};
}
