use derive_more::Display;
use morph_compile::CompileDiagnosticError;
use morph_core::{AccessError, ConstructionError, LoadError, StaleContextError, UnknownEntityError};
use morph_schema::{error::SchemaError, residency::ConfigurationConflictError};
use thiserror::Error as ThisError;

///
/// Error
///
/// Unified failure taxonomy of the pipeline. Every stage reports its own
/// variant; nothing is substituted with defaults.
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    CompileDiagnostic(#[from] CompileDiagnosticError),

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

impl Error {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Schema(_) => ErrorKind::Schema,
            Self::CompileDiagnostic(_) => ErrorKind::CompileDiagnostic,
            Self::Load(_) => ErrorKind::Load,
            Self::Construction(_) => ErrorKind::Construction,
            Self::ConfigurationConflict(_) => ErrorKind::ConfigurationConflict,
            Self::StaleContext(_) => ErrorKind::StaleContext,
            Self::UnknownEntity(_) => ErrorKind::UnknownEntity,
            Self::Access(_) => ErrorKind::Access,
        }
    }
}

impl From<morph_core::Error> for Error {
    fn from(err: morph_core::Error) -> Self {
        match err {
            morph_core::Error::Load(e) => Self::Load(e),
            morph_core::Error::Construction(e) => Self::Construction(e),
            morph_core::Error::ConfigurationConflict(e) => Self::ConfigurationConflict(e),
            morph_core::Error::StaleContext(e) => Self::StaleContext(e),
            morph_core::Error::UnknownEntity(e) => Self::UnknownEntity(e),
            morph_core::Error::Access(e) => Self::Access(e),
        }
    }
}

///
/// ErrorKind
///
/// Stable classification label for an [`Error`].
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    #[display("schema")]
    Schema,
    #[display("compile_diagnostic")]
    CompileDiagnostic,
    #[display("load")]
    Load,
    #[display("construction")]
    Construction,
    #[display("configuration_conflict")]
    ConfigurationConflict,
    #[display("stale_context")]
    StaleContext,
    #[display("unknown_entity")]
    UnknownEntity,
    #[display("access")]
    Access,
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use morph_schema::residency::ContextKind;

    #[test]
    fn core_errors_keep_their_kind() {
        let missing = UnknownEntityError::NoSuchEntity("X".into());
        let err: Error = morph_core::Error::from(missing).into();
        assert_eq!(err.kind(), ErrorKind::UnknownEntity);

        let err: Error =
            ConfigurationConflictError::new("lazy_materialization", ContextKind::Reclaimable, "x")
                .into();
        assert_eq!(err.kind().to_string(), "configuration_conflict");
    }
}
