//! Document and identifier representation.

use super::error::{DocError, DocResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};

/// Reserved key holding the document identifier.
pub const ID_FIELD: &str = "_id";

/// A schemaless document. Always contains `_id` once stored.
pub type Document = Map<String, Value>;

// Hex doubles the length; keeps stem plus extension under 255 bytes.
const MAX_TEXT_ID_BYTES: usize = 120;

const INT_STEM_PREFIX: &str = "i.";
const TEXT_STEM_PREFIX: &str = "s.";

/// Externally assigned document identifier.
///
/// Entity documents use integers; link documents use `"{student}_{slot}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentId {
    Int(i64),
    Text(String),
}

impl DocumentId {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(id) => Value::from(*id),
            Self::Text(id) => Value::String(id.clone()),
        }
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => number.as_i64().map(Self::Int),
            Value::String(text) => Some(Self::Text(text.clone())),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(id) => Some(*id),
            Self::Text(_) => None,
        }
    }

    /// File stem used by the file-backed engine.
    ///
    /// Text ids are stored as lowercase hex of their UTF-8 bytes, so any
    /// string up to `MAX_TEXT_ID_BYTES` maps to a safe file name.
    pub(crate) fn file_stem(&self) -> DocResult<String> {
        match self {
            Self::Int(id) => Ok(format!("{INT_STEM_PREFIX}{id}")),
            Self::Text(id) if id.len() <= MAX_TEXT_ID_BYTES => {
                Ok(format!("{TEXT_STEM_PREFIX}{}", hex::encode(id.as_bytes())))
            }
            Self::Text(id) => Err(DocError::InvalidId(format!(
                "text id is {} bytes long; at most {MAX_TEXT_ID_BYTES} are supported",
                id.len()
            ))),
        }
    }

    pub(crate) fn from_file_stem(stem: &str) -> Option<Self> {
        if let Some(rest) = stem.strip_prefix(INT_STEM_PREFIX) {
            return rest.parse().ok().map(Self::Int);
        }
        let rest = stem.strip_prefix(TEXT_STEM_PREFIX)?;
        if rest.bytes().any(|byte| byte.is_ascii_uppercase()) {
            return None;
        }
        let bytes = hex::decode(rest).ok()?;
        String::from_utf8(bytes).ok().map(Self::Text)
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for DocumentId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Reads and decodes the `_id` of a document.
pub fn document_id(document: &Document) -> DocResult<DocumentId> {
    let value = document
        .get(ID_FIELD)
        .ok_or_else(|| DocError::InvalidId("document has no `_id`".to_string()))?;
    DocumentId::from_value(value)
        .ok_or_else(|| DocError::InvalidId(format!("unsupported `_id` value {value}")))
}

#[cfg(test)]
mod tests {
    use super::{document_id, DocumentId, ID_FIELD};
    use serde_json::{json, Map};

    #[test]
    fn file_stems_round_trip_any_text_id() {
        for id in [
            DocumentId::Int(-3),
            DocumentId::from("4_2"),
            DocumentId::from("ana.lomidze"),
            DocumentId::from("ana lomidze"),
            DocumentId::from("../etc"),
            DocumentId::from("ნინო"),
            DocumentId::from(""),
        ] {
            let stem = id.file_stem().unwrap();
            assert!(stem
                .bytes()
                .all(|byte| byte.is_ascii_alphanumeric() || byte == b'.' || byte == b'-'));
            assert_eq!(DocumentId::from_file_stem(&stem), Some(id));
        }
    }

    #[test]
    fn foreign_stems_and_oversized_ids_are_rejected() {
        assert_eq!(DocumentId::from_file_stem("s.zz"), None);
        assert_eq!(DocumentId::from_file_stem("s.4A"), None);
        assert_eq!(DocumentId::from_file_stem("notes"), None);
        assert!(DocumentId::from("x".repeat(121)).file_stem().is_err());
        assert!(DocumentId::from("x".repeat(120)).file_stem().is_ok());
    }

    #[test]
    fn document_id_reads_integer_and_string_ids() {
        let mut doc = Map::new();
        doc.insert(ID_FIELD.to_string(), json!(12));
        assert_eq!(document_id(&doc).unwrap(), DocumentId::Int(12));

        doc.insert(ID_FIELD.to_string(), json!("1_1"));
        assert_eq!(document_id(&doc).unwrap(), DocumentId::from("1_1"));

        doc.insert(ID_FIELD.to_string(), json!([1]));
        assert!(document_id(&doc).is_err());
    }
}
