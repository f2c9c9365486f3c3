//! Data-access core for the academy demo stores.
//!
//! Two managers expose the same kinds of operations over a relational store
//! (`SqliteManager`) and a document store (`DocumentManager`); the
//! enrollment service seeds either one through the `AcademyStore` seam.

pub mod config;
pub mod db;
pub mod docstore;
pub mod fixture;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, StoreConfig};
pub use docstore::{
    DocError, DocResult, Document, DocumentBackend, DocumentId, FileDocumentStore, Projection,
};
pub use fixture::{Fixture, FixtureError};
pub use logging::{default_log_level, flush_logging, init_logging, logging_status, LogTarget};
pub use model::link::StudentAdvisorLink;
pub use model::person::{Advisor, AdvisorId, PersonRecord, Student, StudentId, ValidationError};
pub use repo::document_manager::{collections, DocumentManager, Relationships};
pub use repo::sql::{Assignments, Conditions, Table};
pub use repo::sqlite_manager::{RepoError, RepoResult, SqlRow, SqliteManager};
pub use repo::store::{AcademyStore, Entity, StoreError, StoreResult};
pub use service::enrollment_service::{EnrollmentService, SeedReport};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
