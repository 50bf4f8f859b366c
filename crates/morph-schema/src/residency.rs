//! Residency rules between permanently-resident and reclaimable contexts.
//!
//! A reclaimable context may import from a resident one, never the reverse.
//! Features whose support code lives in the resident context and keeps
//! references back into the importing module therefore cannot be combined
//! with a reclaimable context.

use crate::options::GenerationOptions;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

/// Feature label for deferred relationship loading.
pub const LAZY_MATERIALIZATION: &str = "lazy_materialization";

///
/// ContextKind
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextKind {
    /// Lives for the remainder of the process; never unloaded.
    #[display("resident")]
    Resident,

    /// May be torn down while the process keeps running.
    #[display("reclaimable")]
    Reclaimable,
}

impl ContextKind {
    #[must_use]
    pub const fn is_reclaimable(self) -> bool {
        matches!(self, Self::Reclaimable)
    }
}

///
/// ConfigurationConflictError
///
/// A feature that needs permanent residency was combined with a context
/// that must stay reclaimable.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("configuration conflict: '{feature}' cannot be used with a {kind} context: {detail}")]
pub struct ConfigurationConflictError {
    pub feature: String,
    pub kind: ContextKind,
    pub detail: String,
}

impl ConfigurationConflictError {
    #[must_use]
    pub fn new(feature: impl Into<String>, kind: ContextKind, detail: impl Into<String>) -> Self {
        Self {
            feature: feature.into(),
            kind,
            detail: detail.into(),
        }
    }
}

/// Fail fast when `options` request a feature the target context kind
/// cannot host. Cheap; runs before any source is generated.
pub fn check_residency(
    options: &GenerationOptions,
    kind: ContextKind,
) -> Result<(), ConfigurationConflictError> {
    if options.lazy_materialization && kind.is_reclaimable() {
        return Err(ConfigurationConflictError::new(
            LAZY_MATERIALIZATION,
            kind,
            "deferred relationship loading keeps a resident proxy layer that would pin the module",
        ));
    }

    Ok(())
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lazy_materialization_conflicts_with_reclaimable_context() {
        let options = GenerationOptions::new().with_lazy_materialization(true);
        let err = check_residency(&options, ContextKind::Reclaimable)
            .expect_err("lazy + reclaimable must conflict");

        assert_eq!(err.feature, LAZY_MATERIALIZATION);
        assert_eq!(err.kind, ContextKind::Reclaimable);
        assert!(err.to_string().contains("reclaimable"));
    }

    #[test]
    fn lazy_materialization_is_fine_for_resident_context() {
        let options = GenerationOptions::new().with_lazy_materialization(true);
        assert!(check_residency(&options, ContextKind::Resident).is_ok());
    }

    #[test]
    fn eager_options_fit_any_context() {
        let options = GenerationOptions::new();
        assert!(check_residency(&options, ContextKind::Reclaimable).is_ok());
        assert!(check_residency(&options, ContextKind::Resident).is_ok());
    }
}
