//! Backend-neutral store seam used by the enrollment service.
//!
//! # Responsibility
//! - Expose one insert-if-absent operation per backend so conflict
//!   handling lives in the backend, not at call sites.
//! - Expose the sampling/counting/linking primitives the linking policy
//!   needs.

use crate::docstore::DocError;
use crate::model::link::StudentAdvisorLink;
use crate::model::person::{Advisor, AdvisorId, Student, StudentId, ValidationError};
use crate::repo::sqlite_manager::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Error surfaced through the `AcademyStore` seam.
#[derive(Debug)]
pub enum StoreError {
    Validation(ValidationError),
    Relational(RepoError),
    Document(DocError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Relational(err) => write!(f, "relational store: {err}"),
            Self::Document(err) => write!(f, "document store: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Relational(err) => Some(err),
            Self::Document(err) => Some(err),
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Relational(value)
    }
}

impl From<DocError> for StoreError {
    fn from(value: DocError) -> Self {
        Self::Document(value)
    }
}

/// Entity handed to `AcademyStore::insert_if_absent`.
#[derive(Debug, Clone, Copy)]
pub enum Entity<'a> {
    Student(&'a Student),
    Advisor(&'a Advisor),
}

/// Store operations the enrollment policy is written against.
pub trait AcademyStore {
    /// Persists the entity unless one with the same id exists.
    ///
    /// Returns whether a record was written. Conflicts are never errors.
    fn insert_if_absent(&self, entity: Entity<'_>) -> StoreResult<bool>;
    /// Up to `n` distinct advisor ids drawn uniformly at random.
    fn sample_advisor_ids(&self, n: usize) -> StoreResult<Vec<AdvisorId>>;
    fn advisor_link_count(&self, student_id: StudentId) -> StoreResult<u64>;
    /// Appends `link` while the student holds fewer than `quota` links.
    ///
    /// Returns `false` when the quota is reached or the pair already exists.
    fn link_if_below_quota(&self, link: StudentAdvisorLink, quota: u32) -> StoreResult<bool>;
}

impl<S: AcademyStore + ?Sized> AcademyStore for &S {
    fn insert_if_absent(&self, entity: Entity<'_>) -> StoreResult<bool> {
        (**self).insert_if_absent(entity)
    }

    fn sample_advisor_ids(&self, n: usize) -> StoreResult<Vec<AdvisorId>> {
        (**self).sample_advisor_ids(n)
    }

    fn advisor_link_count(&self, student_id: StudentId) -> StoreResult<u64> {
        (**self).advisor_link_count(student_id)
    }

    fn link_if_below_quota(&self, link: StudentAdvisorLink, quota: u32) -> StoreResult<bool> {
        (**self).link_if_below_quota(link, quota)
    }
}
