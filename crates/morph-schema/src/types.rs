use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

///
/// Cardinality
///
/// How many target rows a relationship member refers to.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    #[default]
    #[display("one")]
    One,
    #[display("many")]
    Many,
}

///
/// ScalarType
///
/// Scalar vocabulary understood by the generator and the runtime library.
/// The tag is the external spelling used by schema descriptors.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
#[remain::sorted]
pub enum ScalarType {
    #[display("blob")]
    Blob,
    #[display("bool")]
    Bool,
    #[display("date")]
    Date,
    #[display("decimal")]
    Decimal,
    #[display("float64")]
    Float64,
    #[display("int32")]
    Int32,
    #[display("int64")]
    Int64,
    #[display("text")]
    Text,
    #[display("timestamp")]
    Timestamp,
    #[display("ulid")]
    Ulid,
}

impl ScalarType {
    pub const ALL: [Self; 10] = [
        Self::Blob,
        Self::Bool,
        Self::Date,
        Self::Decimal,
        Self::Float64,
        Self::Int32,
        Self::Int64,
        Self::Text,
        Self::Timestamp,
        Self::Ulid,
    ];

    /// Symbol exported for this scalar by the runtime library.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Blob => "Blob",
            Self::Bool => "Bool",
            Self::Date => "Date",
            Self::Decimal => "Decimal",
            Self::Float64 => "Float64",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::Text => "Text",
            Self::Timestamp => "Timestamp",
            Self::Ulid => "Ulid",
        }
    }

    /// Reverse of [`Self::symbol`].
    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.symbol() == symbol)
    }

    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Decimal | Self::Float64 | Self::Int32 | Self::Int64
        )
    }
}

///
/// UnknownTypeTag
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnknownTypeTag(pub String);

impl FromStr for ScalarType {
    type Err = UnknownTypeTag;

    // tags are matched case-insensitively; a few common aliases are accepted
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        let ty = match tag.as_str() {
            "blob" | "bytes" => Self::Blob,
            "bool" | "boolean" => Self::Bool,
            "date" => Self::Date,
            "decimal" | "numeric" => Self::Decimal,
            "float64" | "double" => Self::Float64,
            "int32" | "int" => Self::Int32,
            "int64" | "bigint" => Self::Int64,
            "text" | "string" | "varchar" => Self::Text,
            "timestamp" => Self::Timestamp,
            "ulid" => Self::Ulid,
            _ => return Err(UnknownTypeTag(s.to_string())),
        };

        Ok(ty)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_through_display() {
        for ty in ScalarType::ALL {
            let parsed: ScalarType = ty.to_string().parse().expect("display tag should parse");
            assert_eq!(parsed, ty);
        }
    }

    #[test]
    fn symbols_are_unique_and_reversible() {
        for ty in ScalarType::ALL {
            assert_eq!(ScalarType::from_symbol(ty.symbol()), Some(ty));
        }
        assert_eq!(ScalarType::from_symbol("Money"), None);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = "money".parse::<ScalarType>().expect_err("money is not a scalar");
        assert_eq!(err, UnknownTypeTag("money".to_string()));
    }

    #[test]
    fn aliases_are_accepted() {
        assert_eq!("VARCHAR".parse::<ScalarType>(), Ok(ScalarType::Text));
        assert_eq!("bigint".parse::<ScalarType>(), Ok(ScalarType::Int64));
    }
}
