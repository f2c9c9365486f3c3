//! Document engine error type.

use super::document::DocumentId;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;

pub type DocResult<T> = Result<T, DocError>;

#[derive(Debug)]
pub enum DocError {
    Io(io::Error),
    Json(serde_json::Error),
    /// `create_collection` called for a name that already exists.
    CollectionExists(String),
    CollectionNotFound(String),
    InvalidName(String),
    InvalidId(String),
    /// Insert raced with another insert of the same `_id`.
    DuplicateId(DocumentId),
    MissingField {
        collection: String,
        field: String,
    },
    InvalidData(String),
}

impl Display for DocError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "{err}"),
            Self::CollectionExists(name) => write!(f, "collection `{name}` already exists"),
            Self::CollectionNotFound(name) => write!(f, "collection `{name}` does not exist"),
            Self::InvalidName(name) => write!(f, "invalid collection name `{name}`"),
            Self::InvalidId(message) => write!(f, "invalid document id: {message}"),
            Self::DuplicateId(id) => write!(f, "document `{id}` already exists"),
            Self::MissingField { collection, field } => write!(
                f,
                "document in collection `{collection}` has no field `{field}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid stored document: {message}"),
        }
    }
}

impl Error for DocError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for DocError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for DocError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}
