//! Seed fixture decoding.
//!
//! The fixture is a JSON object with two lists, `advisors` and `students`,
//! of `{ "name", "surname", "age" }` records. Ids are assigned from list
//! position, starting at 1.

use crate::model::person::{Advisor, PersonRecord, Student};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub type FixtureResult<T> = Result<T, FixtureError>;

#[derive(Debug)]
pub enum FixtureError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json(serde_json::Error),
}

impl Display for FixtureError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read fixture `{}`: {source}", path.display())
            }
            Self::Json(err) => write!(f, "malformed fixture: {err}"),
        }
    }
}

impl Error for FixtureError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for FixtureError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    pub advisors: Vec<PersonRecord>,
    pub students: Vec<PersonRecord>,
}

impl Fixture {
    pub fn from_json_str(content: &str) -> FixtureResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load(path: impl AsRef<Path>) -> FixtureResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Advisors with ids `1..=advisors.len()`.
    pub fn advisors(&self) -> impl Iterator<Item = Advisor> + '_ {
        (1_i64..)
            .zip(&self.advisors)
            .map(|(id, record)| Advisor::new(id, record.clone()))
    }

    /// Students with ids `1..=students.len()`, each with `advisor_quota`.
    pub fn students(&self, advisor_quota: u32) -> impl Iterator<Item = Student> + '_ {
        (1_i64..)
            .zip(&self.students)
            .map(move |(id, record)| Student::new(id, record.clone(), advisor_quota))
    }
}
