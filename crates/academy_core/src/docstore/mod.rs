//! Schemaless document engine backing the document store manager.
//!
//! # Responsibility
//! - Define the primitive backend surface (`DocumentBackend`) the manager
//!   builds on: count, insert, find, delete and aggregate.
//! - Provide a file-backed implementation (`FileDocumentStore`).
//!
//! # Invariants
//! - Every stored document carries an `_id` unique within its collection.
//! - Operations on a collection that was never created fail with
//!   `DocError::CollectionNotFound`.

mod backend;
mod document;
mod error;
mod file_store;
mod query;

pub use backend::{DocumentBackend, DocumentCursor};
pub use document::{document_id, Document, DocumentId, ID_FIELD};
pub use error::{DocError, DocResult};
pub use file_store::FileDocumentStore;
pub use query::{run_pipeline, FieldCondition, FieldOp, Filter, Projection, Stage};
