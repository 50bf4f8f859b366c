use crate::types::{ScalarType, UnknownTypeTag};
use serde::{Deserialize, Serialize};

///
/// PropertyDescriptor
///
/// One scalar column. The type tag is kept verbatim from the descriptor so
/// an unsupported tag can be reported as supplied.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PropertyDescriptor {
    pub name: String,

    #[serde(rename = "type")]
    pub type_tag: String,

    #[serde(default)]
    pub nullable: bool,
}

impl PropertyDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_tag: type_tag.into(),
            nullable: false,
        }
    }

    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn scalar_type(&self) -> Result<ScalarType, UnknownTypeTag> {
        self.type_tag.parse()
    }
}
