//! Morph: runtime-regenerated typed accessor layers.
//!
//! A schema description is turned into generated sources, compiled into a
//! binary module, loaded into an isolated reclaimable context and exposed
//! through a dynamic query facade. [`LifecycleManager`] runs that pipeline
//! as repeatable cycles and tears each one down before the next.
//!
//! ## Crate layout
//! - `schema`: schema descriptors, options, validation and residency rules.
//! - `build`: access-layer source generation.
//! - `compile`: front end, resolver and binary module format.
//! - `core`: host, module contexts, facade and data sources.

pub use morph_build as build;
pub use morph_compile as compile;
pub use morph_core as core;
pub use morph_schema as schema;

mod error;
mod lifecycle;

pub use error::{Error, ErrorKind};
pub use lifecycle::{CacheStats, Cycle, DEFAULT_CACHE_CAPACITY, LifecycleManager};

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///

pub mod prelude {
    pub use crate::{Cycle, Error, ErrorKind, LifecycleManager};
    pub use morph_core::{
        ContextKind, Cursor, DynamicAccessFacade, Host, MemoryConnector, MemoryStore, Record,
        Row, TypeHandle, Value,
    };
    pub use morph_schema::{
        node::{EntityDescriptor, PropertyDescriptor, RelationshipDescriptor, SchemaDescriptor},
        options::GenerationOptions,
    };
}
