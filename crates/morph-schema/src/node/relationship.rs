use crate::types::Cardinality;
use serde::{Deserialize, Serialize};

///
/// RelationshipDescriptor
///
/// Navigation from one entity to another. When no member name is supplied
/// the generator derives one from the target and cardinality.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RelationshipDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub target: String,

    #[serde(default)]
    pub cardinality: Cardinality,
}

impl RelationshipDescriptor {
    #[must_use]
    pub fn one(target: impl Into<String>) -> Self {
        Self {
            name: None,
            target: target.into(),
            cardinality: Cardinality::One,
        }
    }

    #[must_use]
    pub fn many(target: impl Into<String>) -> Self {
        Self {
            name: None,
            target: target.into(),
            cardinality: Cardinality::Many,
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}
