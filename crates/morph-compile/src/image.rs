//! Binary module format.
//!
//! Layout: `MRPH` magic, format version (u16 LE), payload length (u32 LE),
//! CBOR payload, SHA-256 of the payload. The payload is a [`ModuleImage`].

use morph_schema::types::{Cardinality, ScalarType};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error as ThisError;

pub const MAGIC: [u8; 4] = *b"MRPH";
pub const FORMAT_VERSION: u16 = 1;

/// Upper bound on an encoded payload.
pub const MAX_PAYLOAD_BYTES: usize = 16 * 1024 * 1024;

const HEADER_LEN: usize = 4 + 2 + 4;
const DIGEST_LEN: usize = 32;

///
/// ImageError
///

#[derive(Debug, ThisError)]
pub enum ImageError {
    #[error("module is truncated ({len} bytes)")]
    Truncated { len: usize },

    #[error("module has bad magic bytes")]
    BadMagic,

    #[error("unsupported module format version {found} (expected {FORMAT_VERSION})")]
    UnsupportedVersion { found: u16 },

    #[error("module payload of {len} bytes exceeds limit {MAX_PAYLOAD_BYTES}")]
    TooLarge { len: usize },

    #[error("module payload digest mismatch")]
    DigestMismatch,

    #[error("module encode failed: {0}")]
    Encode(String),

    #[error("module decode failed: {0}")]
    Decode(String),
}

///
/// ModuleImage
///
/// Everything the loader needs to materialize a module: entity layouts, the
/// accessor with its collections and constructors, and the imports that must
/// be satisfied by resident libraries.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ModuleImage {
    pub namespace: String,
    pub source_digest: String,
    pub entities: Vec<EntityDef>,
    pub accessor: AccessorDef,
    pub imports: Vec<Import>,
}

impl ModuleImage {
    /// Fully qualified accessor name, e.g. `acme::crm::DataContext`.
    #[must_use]
    pub fn module_name(&self) -> String {
        format!("{}::{}", self.namespace, self.accessor.symbol)
    }

    #[must_use]
    pub fn entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.iter().find(|e| e.name == name)
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct EntityDef {
    /// Logical name as declared by the schema.
    pub name: String,

    /// Generated type identifier.
    pub symbol: String,

    pub fields: Vec<FieldDef>,
    pub relations: Vec<RelationDef>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FieldDef {
    pub member: String,
    pub column: String,
    pub scalar: ScalarType,
    pub nullable: bool,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RelationDef {
    pub member: String,
    pub target: String,
    pub cardinality: Cardinality,
    pub deferred: bool,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AccessorDef {
    pub symbol: String,
    pub sets: Vec<SetDef>,
    pub constructors: Vec<ConstructorDef>,
}

/// One collection member of the accessor.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SetDef {
    pub member: String,
    pub entity: String,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ConstructorDef {
    pub name: String,
    pub params: Vec<String>,
    pub connection: ConnectionArg,
}

///
/// ConnectionArg
///
/// Where a constructor takes its connection parameters from.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ConnectionArg {
    Literal(String),
    Param(usize),
}

#[derive(Clone, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Import {
    pub library: String,
    pub symbol: String,
    pub version: u32,
}

/// Encode an image into the binary module format.
pub fn encode(image: &ModuleImage) -> Result<Vec<u8>, ImageError> {
    let payload = serde_cbor::to_vec(image).map_err(|e| ImageError::Encode(e.to_string()))?;
    if payload.len() > MAX_PAYLOAD_BYTES {
        return Err(ImageError::TooLarge { len: payload.len() });
    }
    let len = u32::try_from(payload.len()).map_err(|e| ImageError::Encode(e.to_string()))?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len() + DIGEST_LEN);
    bytes.extend_from_slice(&MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&len.to_le_bytes());
    bytes.extend_from_slice(&payload);
    bytes.extend_from_slice(&Sha256::digest(&payload));

    Ok(bytes)
}

/// Decode and verify a binary module.
pub fn decode(bytes: &[u8]) -> Result<ModuleImage, ImageError> {
    if bytes.len() < HEADER_LEN + DIGEST_LEN {
        return Err(ImageError::Truncated { len: bytes.len() });
    }
    if bytes[..4] != MAGIC {
        return Err(ImageError::BadMagic);
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != FORMAT_VERSION {
        return Err(ImageError::UnsupportedVersion { found: version });
    }

    let len = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]) as usize;
    if len > MAX_PAYLOAD_BYTES {
        return Err(ImageError::TooLarge { len });
    }
    if bytes.len() != HEADER_LEN + len + DIGEST_LEN {
        return Err(ImageError::Truncated { len: bytes.len() });
    }

    let payload = &bytes[HEADER_LEN..HEADER_LEN + len];
    let digest = &bytes[HEADER_LEN + len..];
    if Sha256::digest(payload).as_slice() != digest {
        return Err(ImageError::DigestMismatch);
    }

    serde_cbor::from_slice(payload).map_err(|e| ImageError::Decode(e.to_string()))
}

/// Hex SHA-256 over every `(name, text)` pair, length-prefixed.
pub(crate) fn source_digest<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut hasher = Sha256::new();
    for (name, text) in files {
        hasher.update((name.len() as u64).to_le_bytes());
        hasher.update(name.as_bytes());
        hasher.update((text.len() as u64).to_le_bytes());
        hasher.update(text.as_bytes());
    }

    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ModuleImage {
        ModuleImage {
            namespace: "acme".to_string(),
            source_digest: "00".to_string(),
            entities: vec![EntityDef {
                name: "Customer".to_string(),
                symbol: "Customer".to_string(),
                fields: vec![FieldDef {
                    member: "id".to_string(),
                    column: "id".to_string(),
                    scalar: ScalarType::Int64,
                    nullable: false,
                }],
                relations: Vec::new(),
            }],
            accessor: AccessorDef {
                symbol: "DataContext".to_string(),
                sets: vec![SetDef {
                    member: "customers".to_string(),
                    entity: "Customer".to_string(),
                }],
                constructors: Vec::new(),
            },
            imports: Vec::new(),
        }
    }

    #[test]
    fn decode_accepts_encoded_image() {
        let bytes = encode(&sample()).expect("encode");
        assert_eq!(&bytes[..4], b"MRPH");
        assert_eq!(decode(&bytes).expect("decode"), sample());
    }

    #[test]
    fn flipped_payload_byte_fails_digest() {
        let mut bytes = encode(&sample()).expect("encode");
        bytes[HEADER_LEN + 2] ^= 0xff;

        assert!(matches!(decode(&bytes), Err(ImageError::DigestMismatch)));
    }

    #[test]
    fn short_and_foreign_inputs_are_rejected() {
        assert!(matches!(decode(b"MRPH"), Err(ImageError::Truncated { .. })));

        let mut bytes = encode(&sample()).expect("encode");
        bytes[0] = b'X';
        assert!(matches!(decode(&bytes), Err(ImageError::BadMagic)));

        let mut bytes = encode(&sample()).expect("encode");
        bytes[4] = 9;
        assert!(matches!(
            decode(&bytes),
            Err(ImageError::UnsupportedVersion { found: 9 })
        ));
    }
}
