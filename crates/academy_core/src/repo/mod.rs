//! Store managers and the backend-neutral seam over them.
//!
//! # Responsibility
//! - `sqlite_manager`: relational rows over SQLite with typed SQL builders.
//! - `document_manager`: documents over any `DocumentBackend`.
//! - `store`: the `AcademyStore` trait both managers implement.
//!
//! # Invariants
//! - Duplicate-key inserts are swallowed inside each manager and reported
//!   as "not inserted", never as errors.

pub mod document_manager;
pub mod sql;
pub mod sqlite_manager;
pub mod store;
