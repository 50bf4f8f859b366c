use crate::{error::SchemaError, node::EntityDescriptor, validate::validate_schema};
use serde::{Deserialize, Serialize};

///
/// SchemaDescriptor
///
/// Ordered set of entities describing one version of an external store.
/// Treated as immutable once handed to the pipeline.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct SchemaDescriptor {
    /// Free-form version label supplied by the introspection collaborator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    pub entities: Vec<EntityDescriptor>,
}

impl SchemaDescriptor {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            version: None,
            entities: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn entity(mut self, entity: EntityDescriptor) -> Self {
        self.entities.push(entity);
        self
    }

    /// Look up an entity by its declared name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Run every validation pass and report all problems at once.
    pub fn validate(&self) -> Result<(), SchemaError> {
        validate_schema(self).map_err(SchemaError::new)
    }
}
