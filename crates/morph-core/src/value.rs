use derive_more::Display;
use morph_schema::types::ScalarType;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// Raw record as handed out by a data source, keyed by column or member.
pub type Record = BTreeMap<String, Value>;

///
/// Value
///
/// Dynamic value carried by rows. `Deferred` stands in for a relationship
/// that is loaded on demand.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(String),
    Text(String),
    Blob(#[serde(with = "serde_bytes")] Vec<u8>),

    /// Days since 1970-01-01.
    Date(i32),

    /// Milliseconds since the Unix epoch.
    Timestamp(i64),

    Ulid(u128),
    List(Vec<Self>),
    Deferred { target: String },
}

///
/// ValueTag
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum ValueTag {
    #[display("null")]
    Null,
    #[display("bool")]
    Bool,
    #[display("int")]
    Int,
    #[display("float")]
    Float,
    #[display("decimal")]
    Decimal,
    #[display("text")]
    Text,
    #[display("blob")]
    Blob,
    #[display("date")]
    Date,
    #[display("timestamp")]
    Timestamp,
    #[display("ulid")]
    Ulid,
    #[display("list")]
    List,
    #[display("deferred")]
    Deferred,
}

impl Value {
    #[must_use]
    pub const fn tag(&self) -> ValueTag {
        match self {
            Self::Null => ValueTag::Null,
            Self::Bool(_) => ValueTag::Bool,
            Self::Int(_) => ValueTag::Int,
            Self::Float(_) => ValueTag::Float,
            Self::Decimal(_) => ValueTag::Decimal,
            Self::Text(_) => ValueTag::Text,
            Self::Blob(_) => ValueTag::Blob,
            Self::Date(_) => ValueTag::Date,
            Self::Timestamp(_) => ValueTag::Timestamp,
            Self::Ulid(_) => ValueTag::Ulid,
            Self::List(_) => ValueTag::List,
            Self::Deferred { .. } => ValueTag::Deferred,
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this value can populate a member of scalar type `ty`.
    /// `Null` never matches; nullability is decided by the caller.
    #[must_use]
    pub fn fits(&self, ty: ScalarType) -> bool {
        match (self, ty) {
            (Self::Int(v), ScalarType::Int32) => i32::try_from(*v).is_ok(),
            (Self::Bool(_), ScalarType::Bool)
            | (Self::Int(_), ScalarType::Int64)
            | (Self::Float(_), ScalarType::Float64)
            | (Self::Decimal(_), ScalarType::Decimal)
            | (Self::Text(_), ScalarType::Text)
            | (Self::Blob(_), ScalarType::Blob)
            | (Self::Date(_), ScalarType::Date)
            | (Self::Timestamp(_), ScalarType::Timestamp)
            | (Self::Ulid(_), ScalarType::Ulid) => true,
            _ => false,
        }
    }

    /// Whether this value can act as a reference key.
    #[must_use]
    pub const fn is_key(&self) -> bool {
        matches!(
            self,
            Self::Int(_) | Self::Text(_) | Self::Ulid(_) | Self::Decimal(_)
        )
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) | Self::Timestamp(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Decimal(v) => f.write_str(v),
            Self::Text(v) => write!(f, "{v:?}"),
            Self::Blob(v) => write!(f, "<{} bytes>", v.len()),
            Self::Date(v) => write!(f, "date({v})"),
            Self::Ulid(v) => write!(f, "{v:032x}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Deferred { target } => write!(f, "<deferred {target}>"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

///
/// Row
///
/// One materialized entity instance: members in declared order, properties
/// first, relationships after.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    entity: String,
    fields: Vec<(String, Value)>,
}

impl Row {
    #[must_use]
    pub(crate) const fn new(entity: String, fields: Vec<(String, Value)>) -> Self {
        Self { entity, fields }
    }

    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    #[must_use]
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    /// Look a value up by column (properties) or member (relationships).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn int32_range_is_enforced() {
        assert!(Value::Int(7).fits(ScalarType::Int32));
        assert!(!Value::Int(i64::from(i32::MAX) + 1).fits(ScalarType::Int32));
        assert!(Value::Int(i64::MAX).fits(ScalarType::Int64));
    }

    #[test]
    fn null_never_fits() {
        for ty in ScalarType::ALL {
            assert!(!Value::Null.fits(ty), "{ty}");
        }
    }

    #[test]
    fn blob_serializes_as_bytes() {
        let json = serde_json::to_string(&Value::Blob(vec![1, 2, 3])).expect("serialize");
        let back: Value = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(back, Value::Blob(vec![1, 2, 3]));
    }

    #[test]
    fn display_is_compact() {
        let list = Value::List(vec![Value::Int(1), Value::from("a")]);
        assert_eq!(list.to_string(), r#"[1, "a"]"#);
    }

    proptest! {
        #[test]
        fn int32_fit_matches_conversion(v in any::<i64>()) {
            prop_assert_eq!(Value::Int(v).fits(ScalarType::Int32), i32::try_from(v).is_ok());
            prop_assert!(Value::Int(v).fits(ScalarType::Int64));
            prop_assert!(!Value::Int(v).fits(ScalarType::Text));
        }
    }
}
