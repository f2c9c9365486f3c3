//! Document store manager.
//!
//! # Responsibility
//! - Provide collection setup, existence-checked insertion, deletion,
//!   non-repeating random id sampling and two-collection relationship joins
//!   on top of a `DocumentBackend`.
//! - Implement the insert-if-absent policy for the document backend.
//!
//! # Invariants
//! - `add_document` never overwrites: it checks for the `_id` first.
//! - `sample_random_ids` never returns duplicates and returns
//!   `min(n, total)` ids unless the backend stops producing new ids.
//! - `delete_many(None)` empties the collection; `delete_many(Some(&[]))`
//!   deletes nothing.

use crate::docstore::{
    document_id, DocError, DocResult, Document, DocumentBackend, DocumentCursor, DocumentId,
    FileDocumentStore, Filter, Projection, Stage, ID_FIELD,
};
use crate::model::link::{link_document_key, StudentAdvisorLink};
use crate::model::person::{AdvisorId, StudentId};
use crate::repo::store::{AcademyStore, Entity, StoreError, StoreResult};
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

/// Collection names used by the academy dataset.
pub mod collections {
    pub const STUDENTS: &str = "students";
    pub const ADVISORS: &str = "advisors";
    pub const STUDENT_ADVISOR: &str = "student_advisor";

    pub const ALL: [&str; 3] = [STUDENTS, ADVISORS, STUDENT_ADVISOR];
}

/// Ordered mapping from a relationship key value to matching documents.
///
/// Keys keep the position of their first insertion; re-inserting a key
/// replaces its documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Relationships {
    entries: Vec<(Value, Vec<Document>)>,
}

impl Relationships {
    pub fn insert(&mut self, key: Value, documents: Vec<Document>) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = documents,
            None => self.entries.push((key, documents)),
        }
    }

    pub fn get(&self, key: &Value) -> Option<&[Document]> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, documents)| documents.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &[Document])> {
        self.entries
            .iter()
            .map(|(key, documents)| (key, documents.as_slice()))
    }
}

/// Document store manager generic over its backend.
pub struct DocumentManager<B = FileDocumentStore> {
    backend: B,
}

impl DocumentManager<FileDocumentStore> {
    /// Opens a file-backed database rooted at `database_dir`.
    pub fn open(database_dir: impl AsRef<Path>) -> DocResult<Self> {
        Ok(Self::new(FileDocumentStore::open(database_dir)?))
    }
}

impl<B: DocumentBackend> DocumentManager<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Creates `name`; a second call fails with `DocError::CollectionExists`.
    pub fn create_collection(&self, name: &str) -> DocResult<()> {
        self.backend.create_collection(name)
    }

    /// Creates `name` unless present. Returns whether it was created.
    pub fn ensure_collection(&self, name: &str) -> DocResult<bool> {
        if self.backend.has_collection(name)? {
            return Ok(false);
        }
        match self.backend.create_collection(name) {
            Ok(()) => Ok(true),
            Err(DocError::CollectionExists(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    pub fn exists(&self, collection: &str, id: &DocumentId) -> DocResult<bool> {
        let filter = Filter::all().eq(ID_FIELD, id.to_value());
        Ok(self.backend.count_documents(collection, &filter)? > 0)
    }

    /// Inserts `fields` keyed by `id` unless a document with `id` exists.
    ///
    /// Returns whether the document was inserted. An `_id` inside `fields`
    /// is replaced by `id`.
    pub fn add_document(
        &self,
        collection: &str,
        id: impl Into<DocumentId>,
        fields: Document,
    ) -> DocResult<bool> {
        let id = id.into();
        if self.exists(collection, &id)? {
            debug!("event=add_document module=document status=skipped reason=exists collection={collection} id={id}");
            return Ok(false);
        }

        let mut document = Document::new();
        document.insert(ID_FIELD.to_string(), id.to_value());
        for (key, value) in fields {
            if key != ID_FIELD {
                document.insert(key, value);
            }
        }

        match self.backend.insert_one(collection, document) {
            Ok(()) => Ok(true),
            // Another writer stored the id after the existence check.
            Err(DocError::DuplicateId(_)) => {
                debug!("event=add_document module=document status=skipped reason=duplicate collection={collection} id={id}");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Lazily yields every document, optionally projected.
    pub fn load_all(
        &self,
        collection: &str,
        projection: Option<Projection>,
    ) -> DocResult<DocumentCursor<'_>> {
        self.backend.find(collection, Filter::all(), projection)
    }

    pub fn delete_one(&self, collection: &str, id: &DocumentId) -> DocResult<u64> {
        self.backend
            .delete_one(collection, &Filter::all().eq(ID_FIELD, id.to_value()))
    }

    /// Deletes the listed ids, or every document when `ids` is `None`.
    ///
    /// `Some(&[])` is a no-op and returns 0.
    pub fn delete_many(&self, collection: &str, ids: Option<&[DocumentId]>) -> DocResult<u64> {
        let filter = match ids {
            None => Filter::all(),
            Some([]) => return Ok(0),
            Some(ids) => Filter::all().is_in(ID_FIELD, ids.iter().map(DocumentId::to_value).collect()),
        };
        self.backend.delete_many(collection, &filter)
    }

    /// Returns `min(n, total)` distinct document ids drawn at random.
    ///
    /// The first pass samples `n` documents. While the result is short
    /// (duplicates dropped, or the backend undersampled), another pass
    /// samples the shortfall from documents whose `_id` was not drawn yet.
    pub fn sample_random_ids(&self, collection: &str, n: usize) -> DocResult<Vec<DocumentId>> {
        let total = self.backend.count_documents(collection, &Filter::all())?;
        let target = usize::try_from(total).map_or(n, |total| n.min(total));
        if target == 0 {
            return Ok(Vec::new());
        }

        let mut drawn = Vec::with_capacity(target);
        let mut seen = HashSet::with_capacity(target);
        let first_pass = self.backend.aggregate(
            collection,
            &[Stage::Sample(target), Stage::Project(Projection::id_only())],
        )?;
        absorb_ids(first_pass, target, &mut drawn, &mut seen)?;

        let mut passes = 1;
        while drawn.len() < target {
            let shortfall = target - drawn.len();
            let excluded = drawn.iter().map(DocumentId::to_value).collect();
            let batch = self.backend.aggregate(
                collection,
                &[
                    Stage::Match(Filter::all().not_in(ID_FIELD, excluded)),
                    Stage::Sample(shortfall),
                    Stage::Project(Projection::id_only()),
                ],
            )?;
            passes += 1;

            let before = drawn.len();
            absorb_ids(batch, target, &mut drawn, &mut seen)?;
            if drawn.len() == before {
                warn!(
                    "event=sample_ids module=document status=short collection={collection} requested={n} returned={} passes={passes}",
                    drawn.len()
                );
                break;
            }
        }

        debug!(
            "event=sample_ids module=document status=ok collection={collection} requested={n} returned={} passes={passes}",
            drawn.len()
        );
        Ok(drawn)
    }

    /// Joins `collection_a` to `collection_b` on `key_a = key_b`.
    ///
    /// For each document of `collection_a` (cursor order) the value `v` of
    /// `key_a` maps to every `collection_b` document with `key_b = v`. When
    /// several documents share `v`, the last one processed wins.
    pub fn get_relationships(
        &self,
        collection_a: &str,
        collection_b: &str,
        key_a: &str,
        key_b: &str,
    ) -> DocResult<Relationships> {
        let mut relationships = Relationships::default();

        for document in self.backend.find(collection_a, Filter::all(), None)? {
            let document = document?;
            let key = document
                .get(key_a)
                .cloned()
                .ok_or_else(|| DocError::MissingField {
                    collection: collection_a.to_string(),
                    field: key_a.to_string(),
                })?;

            let matches = self
                .backend
                .find(collection_b, Filter::all().eq(key_b, key.clone()), None)?
                .collect::<DocResult<Vec<_>>>()?;
            relationships.insert(key, matches);
        }

        info!(
            "event=relationships module=document status=ok from={collection_a} to={collection_b} keys={}",
            relationships.len()
        );
        Ok(relationships)
    }

    fn person_document(name: &str, surname: &str, age: u32) -> Document {
        let mut document = Document::new();
        document.insert("name".to_string(), Value::from(name));
        document.insert("surname".to_string(), Value::from(surname));
        document.insert("age".to_string(), Value::from(age));
        document
    }
}

fn absorb_ids(
    batch: Vec<Document>,
    target: usize,
    drawn: &mut Vec<DocumentId>,
    seen: &mut HashSet<DocumentId>,
) -> DocResult<()> {
    for document in batch {
        if drawn.len() == target {
            break;
        }
        let id = document_id(&document)?;
        if seen.insert(id.clone()) {
            drawn.push(id);
        }
    }
    Ok(())
}

impl<B: DocumentBackend> AcademyStore for DocumentManager<B> {
    fn insert_if_absent(&self, entity: Entity<'_>) -> StoreResult<bool> {
        let inserted = match entity {
            Entity::Student(student) => self.add_document(
                collections::STUDENTS,
                student.id,
                Self::person_document(&student.name, &student.surname, student.age),
            )?,
            Entity::Advisor(advisor) => self.add_document(
                collections::ADVISORS,
                advisor.id,
                Self::person_document(&advisor.name, &advisor.surname, advisor.age),
            )?,
        };
        Ok(inserted)
    }

    fn sample_advisor_ids(&self, n: usize) -> StoreResult<Vec<AdvisorId>> {
        self.sample_random_ids(collections::ADVISORS, n)?
            .into_iter()
            .map(|id| {
                id.as_int().ok_or_else(|| {
                    StoreError::Document(DocError::InvalidId(format!(
                        "advisor id `{id}` is not an integer"
                    )))
                })
            })
            .collect()
    }

    fn advisor_link_count(&self, student_id: StudentId) -> StoreResult<u64> {
        let filter = Filter::all().eq("student_id", student_id);
        Ok(self
            .backend
            .count_documents(collections::STUDENT_ADVISOR, &filter)?)
    }

    /// Count-then-insert. Not atomic: two writers linking the same student
    /// at once can both pass the quota check.
    fn link_if_below_quota(&self, link: StudentAdvisorLink, quota: u32) -> StoreResult<bool> {
        if self.advisor_link_count(link.student_id)? >= u64::from(quota) {
            return Ok(false);
        }

        let pair = Filter::all()
            .eq("student_id", link.student_id)
            .eq("advisor_id", link.advisor_id);
        if self
            .backend
            .count_documents(collections::STUDENT_ADVISOR, &pair)?
            > 0
        {
            return Ok(false);
        }

        for slot in 1..=quota {
            let key = DocumentId::from(link_document_key(link.student_id, slot));
            if self.exists(collections::STUDENT_ADVISOR, &key)? {
                continue;
            }

            let mut fields = Document::new();
            fields.insert("student_id".to_string(), Value::from(link.student_id));
            fields.insert("advisor_id".to_string(), Value::from(link.advisor_id));
            return Ok(self.add_document(collections::STUDENT_ADVISOR, key, fields)?);
        }

        Ok(false)
    }
}
