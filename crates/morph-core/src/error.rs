use crate::context::ContextId;
use morph_compile::ImageError;
use morph_schema::residency::ConfigurationConflictError;
use thiserror::Error as ThisError;

///
/// Error
///
/// Every failure the runtime side of the pipeline can report.
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error(transparent)]
    ConfigurationConflict(#[from] ConfigurationConflictError),

    #[error(transparent)]
    StaleContext(#[from] StaleContextError),

    #[error(transparent)]
    UnknownEntity(#[from] UnknownEntityError),

    #[error(transparent)]
    Access(#[from] AccessError),
}

///
/// LoadError
///

#[derive(Debug, ThisError)]
pub enum LoadError {
    #[error("module carries {errors} error diagnostic(s) and cannot be loaded")]
    Diagnostics { errors: usize },

    #[error("module image rejected: {0}")]
    Image(#[from] ImageError),

    #[error("missing dependency: no resident library exports `{library}::{symbol}`")]
    MissingDependency { library: String, symbol: String },

    #[error("library `{library}` is version {resident}, module was built against {expected}")]
    VersionMismatch {
        library: String,
        expected: u32,
        resident: u32,
    },

    #[error("context {context} already holds a loaded module")]
    AlreadyLoaded { context: ContextId },
}

///
/// ConstructionError
///

#[derive(Debug, ThisError)]
pub enum ConstructionError {
    #[error("type `{0}` is not the accessor type")]
    NotAccessor(String),

    #[error("context {0} has no module loaded")]
    NotLoaded(ContextId),

    #[error("no constructor of `{accessor}` accepts {arity} text argument(s)")]
    NoMatchingConstructor { accessor: String, arity: usize },

    #[error("constructor `{constructor}` could not connect: {source}")]
    Connect {
        constructor: String,
        #[source]
        source: ConnectError,
    },
}

///
/// StaleContextError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("context {context} has been unloaded")]
pub struct StaleContextError {
    pub context: ContextId,
}

///
/// UnknownEntityError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum UnknownEntityError {
    #[error("no entity named '{0}'")]
    NoSuchEntity(String),

    #[error("handle for '{name}' belongs to context {owner}, not {context}")]
    ForeignHandle {
        name: String,
        owner: ContextId,
        context: ContextId,
    },
}

///
/// AccessError
///
/// Failures reading rows from a data source or materializing them.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum AccessError {
    #[error("data source failed for '{entity}': {message}")]
    Source { entity: String, message: String },

    #[error("'{entity}' row is missing non-nullable column '{column}'")]
    MissingValue { entity: String, column: String },

    #[error("'{entity}' column '{column}' expects {expected}, found {found}")]
    TypeMismatch {
        entity: String,
        column: String,
        expected: String,
        found: String,
    },
}

///
/// ConnectError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("cannot open connection '{connection}': {reason}")]
pub struct ConnectError {
    pub connection: String,
    pub reason: String,
}

impl ConnectError {
    #[must_use]
    pub fn new(connection: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            connection: connection.into(),
            reason: reason.into(),
        }
    }
}
