use std::{io, path::PathBuf};
use thiserror::Error as ThisError;

///
/// CliError
///

#[derive(Debug, ThisError)]
pub enum CliError {
    #[error("cannot read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config '{}': {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid JSON in '{}': {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("data file: {0}")]
    Data(String),

    #[error(transparent)]
    Morph(#[from] morph::Error),
}

impl From<morph::core::Error> for CliError {
    fn from(err: morph::core::Error) -> Self {
        Self::Morph(err.into())
    }
}
