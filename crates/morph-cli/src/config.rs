//! `morph.toml` support.
//!
//! ```toml
//! [generation]
//! root_namespace = "acme::crm"
//! connection = "memory://crm"
//!
//! [runtime]
//! resident = false
//! compile_timeout_ms = 5000
//! ```

use crate::error::CliError;
use morph::{DEFAULT_CACHE_CAPACITY, prelude::GenerationOptions};
use serde::Deserialize;
use std::path::Path;

/// Config file picked up from the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "morph.toml";

///
/// CliConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub generation: GenerationOptions,
    pub runtime: RuntimeConfig,
}

///
/// RuntimeConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Load into a resident context instead of a reclaimable one.
    pub resident: bool,

    /// Abandon compilation after this many milliseconds.
    pub compile_timeout_ms: Option<u64>,

    pub cache_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            resident: false,
            compile_timeout_ms: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl CliConfig {
    pub fn parse(text: &str, path: &Path) -> Result<Self, CliError> {
        toml::from_str(text).map_err(|source| CliError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&text, path)
    }

    /// Explicit path if given, else `morph.toml` when present, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

///
/// TESTS
///
