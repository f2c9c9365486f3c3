//! Primitive document backend surface.

use super::document::Document;
use super::error::DocResult;
use super::query::{Filter, Projection, Stage};

/// Lazy sequence of documents. Each `find` call yields a fresh cursor.
pub type DocumentCursor<'a> = Box<dyn Iterator<Item = DocResult<Document>> + 'a>;

/// Storage primitives a document store manager is built from.
///
/// Implementations are free to return duplicates from `Stage::Sample`
/// or fewer documents than requested; callers that need a non-repeating
/// sample must compensate.
pub trait DocumentBackend {
    /// Fails with `DocError::CollectionExists` when `name` already exists.
    fn create_collection(&self, name: &str) -> DocResult<()>;
    fn has_collection(&self, name: &str) -> DocResult<bool>;
    fn count_documents(&self, collection: &str, filter: &Filter) -> DocResult<u64>;
    /// Fails with `DocError::DuplicateId` when the `_id` is taken.
    fn insert_one(&self, collection: &str, document: Document) -> DocResult<()>;
    fn find(
        &self,
        collection: &str,
        filter: Filter,
        projection: Option<Projection>,
    ) -> DocResult<DocumentCursor<'_>>;
    fn delete_one(&self, collection: &str, filter: &Filter) -> DocResult<u64>;
    fn delete_many(&self, collection: &str, filter: &Filter) -> DocResult<u64>;
    fn aggregate(&self, collection: &str, pipeline: &[Stage]) -> DocResult<Vec<Document>>;
}
