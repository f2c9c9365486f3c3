//! Student and advisor records.
//!
//! # Invariants
//! - `name` and `surname` are non-blank.
//! - `age` does not exceed `MAX_AGE`.
//! - `id` is positive.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable student identifier.
pub type StudentId = i64;
/// Stable advisor identifier.
pub type AdvisorId = i64;

const MAX_AGE: u32 = 150;

/// Person fields exactly as they appear in the fixture file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub name: String,
    pub surname: String,
    pub age: u32,
}

/// Validation failures for entity records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    NonPositiveId(i64),
    BlankField(&'static str),
    AgeOutOfRange(u32),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveId(id) => write!(f, "entity id must be positive, got {id}"),
            Self::BlankField(field) => write!(f, "field `{field}` must not be blank"),
            Self::AgeOutOfRange(age) => write!(f, "age {age} exceeds maximum {MAX_AGE}"),
        }
    }
}

impl Error for ValidationError {}

/// A student who picks up to `advisor_quota` advisors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub surname: String,
    pub age: u32,
    /// Upper bound on advisor links; not persisted.
    #[serde(skip)]
    pub advisor_quota: u32,
}

impl Student {
    pub fn new(id: StudentId, record: PersonRecord, advisor_quota: u32) -> Self {
        Self {
            id,
            name: record.name,
            surname: record.surname,
            age: record.age,
            advisor_quota,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_person(self.id, &self.name, &self.surname, self.age)
    }
}

/// An advisor students can link to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisor {
    pub id: AdvisorId,
    pub name: String,
    pub surname: String,
    pub age: u32,
}

impl Advisor {
    pub fn new(id: AdvisorId, record: PersonRecord) -> Self {
        Self {
            id,
            name: record.name,
            surname: record.surname,
            age: record.age,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_person(self.id, &self.name, &self.surname, self.age)
    }
}

fn validate_person(id: i64, name: &str, surname: &str, age: u32) -> Result<(), ValidationError> {
    if id <= 0 {
        return Err(ValidationError::NonPositiveId(id));
    }
    if name.trim().is_empty() {
        return Err(ValidationError::BlankField("name"));
    }
    if surname.trim().is_empty() {
        return Err(ValidationError::BlankField("surname"));
    }
    if age > MAX_AGE {
        return Err(ValidationError::AgeOutOfRange(age));
    }
    Ok(())
}
