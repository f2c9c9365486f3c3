//! File-backed document engine.
//!
//! # Responsibility
//! - Persist each collection as a directory and each document as one JSON
//!   file named after its `_id`.
//! - Evaluate filters, projections and pipelines in process.
//!
//! # Invariants
//! - Cursor order is `_id` order (integers before text ids).
//! - Document contents are read lazily by `find` cursors; the listing of
//!   files is taken when the cursor is created.

use super::backend::{DocumentBackend, DocumentCursor};
use super::document::{document_id, Document, DocumentId};
use super::error::{DocError, DocResult};
use super::query::{run_pipeline, Filter, Projection, Stage};
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

static COLLECTION_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]{0,63}$").expect("valid collection name regex")
});

const DOCUMENT_EXTENSION: &str = "json";

/// Document database rooted at one directory.
#[derive(Debug, Clone)]
pub struct FileDocumentStore {
    root: PathBuf,
}

impl FileDocumentStore {
    /// Opens the database directory, creating it when missing.
    pub fn open(root: impl AsRef<Path>) -> DocResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        info!(
            "event=docstore_open module=docstore status=ok root={}",
            root.display()
        );
        Ok(Self { root })
    }

    /// Lists collection names in lexical order.
    pub fn list_collections(&self) -> DocResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                if COLLECTION_NAME_RE.is_match(name) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn collection_dir(&self, name: &str) -> DocResult<PathBuf> {
        validate_collection_name(name)?;
        let dir = self.root.join(name);
        if !dir.is_dir() {
            return Err(DocError::CollectionNotFound(name.to_string()));
        }
        Ok(dir)
    }

    /// Loads every stored document matching `filter`, with its file path.
    fn matching(&self, dir: &Path, filter: &Filter) -> DocResult<Vec<(PathBuf, Document)>> {
        if let Some(id) = filter.id_equality().and_then(DocumentId::from_value) {
            // An id that cannot be stored cannot match a stored document.
            let path = match document_path(dir, &id) {
                Ok(path) => path,
                Err(DocError::InvalidId(_)) => return Ok(Vec::new()),
                Err(err) => return Err(err),
            };
            return match read_document(&path) {
                Ok(document) => Ok(vec![(path, document)]),
                Err(DocError::Io(err)) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
                Err(err) => Err(err),
            };
        }

        let mut out = Vec::new();
        for path in stored_paths(dir)? {
            let document = read_document(&path)?;
            if filter.matches(&document) {
                out.push((path, document));
            }
        }
        Ok(out)
    }

    fn remove(&self, collection: &str, filter: &Filter, limit: Option<usize>) -> DocResult<u64> {
        let dir = self.collection_dir(collection)?;
        let mut removed = 0_u64;
        for (path, _) in self.matching(&dir, filter)? {
            if limit.is_some_and(|limit| removed as usize >= limit) {
                break;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        debug!("event=delete module=docstore status=ok collection={collection} removed={removed}");
        Ok(removed)
    }
}

impl DocumentBackend for FileDocumentStore {
    fn create_collection(&self, name: &str) -> DocResult<()> {
        validate_collection_name(name)?;
        match fs::create_dir(self.root.join(name)) {
            Ok(()) => {
                info!("event=collection_create module=docstore status=ok collection={name}");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                Err(DocError::CollectionExists(name.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn has_collection(&self, name: &str) -> DocResult<bool> {
        validate_collection_name(name)?;
        Ok(self.root.join(name).is_dir())
    }

    fn count_documents(&self, collection: &str, filter: &Filter) -> DocResult<u64> {
        let dir = self.collection_dir(collection)?;
        if filter.conditions().is_empty() {
            return Ok(stored_paths(&dir)?.len() as u64);
        }
        Ok(self.matching(&dir, filter)?.len() as u64)
    }

    fn insert_one(&self, collection: &str, document: Document) -> DocResult<()> {
        let dir = self.collection_dir(collection)?;
        let id = document_id(&document)?;
        let path = document_path(&dir, &id)?;
        let content = serde_json::to_vec_pretty(&document)?;

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(DocError::DuplicateId(id));
            }
            Err(err) => return Err(err.into()),
        };
        file.write_all(&content)?;
        file.sync_data()?;

        debug!("event=insert_one module=docstore status=ok collection={collection} id={id}");
        Ok(())
    }

    fn find(
        &self,
        collection: &str,
        filter: Filter,
        projection: Option<Projection>,
    ) -> DocResult<DocumentCursor<'_>> {
        let dir = self.collection_dir(collection)?;
        let paths = stored_paths(&dir)?;

        Ok(Box::new(paths.into_iter().filter_map(move |path| {
            match read_document(&path) {
                Ok(document) if filter.matches(&document) => Some(Ok(match &projection {
                    Some(projection) => projection.apply(document),
                    None => document,
                })),
                Ok(_) => None,
                // Removed after the listing was taken.
                Err(DocError::Io(err)) if err.kind() == ErrorKind::NotFound => None,
                Err(err) => Some(Err(err)),
            }
        })))
    }

    fn delete_one(&self, collection: &str, filter: &Filter) -> DocResult<u64> {
        self.remove(collection, filter, Some(1))
    }

    fn delete_many(&self, collection: &str, filter: &Filter) -> DocResult<u64> {
        self.remove(collection, filter, None)
    }

    fn aggregate(&self, collection: &str, pipeline: &[Stage]) -> DocResult<Vec<Document>> {
        let dir = self.collection_dir(collection)?;
        let documents = self
            .matching(&dir, &Filter::all())?
            .into_iter()
            .map(|(_, document)| document)
            .collect();
        Ok(run_pipeline(documents, pipeline, &mut rand::thread_rng()))
    }
}

fn validate_collection_name(name: &str) -> DocResult<()> {
    if COLLECTION_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(DocError::InvalidName(name.to_string()))
    }
}

fn document_path(dir: &Path, id: &DocumentId) -> DocResult<PathBuf> {
    Ok(dir.join(format!("{}.{DOCUMENT_EXTENSION}", id.file_stem()?)))
}

/// Document files of one collection, sorted by decoded `_id`.
fn stored_paths(dir: &Path) -> DocResult<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(DOCUMENT_EXTENSION) {
            continue;
        }
        let id = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(DocumentId::from_file_stem);
        if let Some(id) = id {
            entries.push((id, path));
        }
    }
    entries.sort_by(|left, right| left.0.cmp(&right.0));
    Ok(entries.into_iter().map(|(_, path)| path).collect())
}

fn read_document(path: &Path) -> DocResult<Document> {
    let content = fs::read(path)?;
    match serde_json::from_slice::<Value>(&content)? {
        Value::Object(document) => Ok(document),
        other => Err(DocError::InvalidData(format!(
            "{} holds {} instead of an object",
            path.display(),
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::FileDocumentStore;
    use crate::docstore::{DocError, DocumentBackend, DocumentId, Filter, Projection};
    use serde_json::json;

    fn doc(value: serde_json::Value) -> crate::docstore::Document {
        value.as_object().cloned().unwrap()
    }

    fn store() -> (tempfile::TempDir, FileDocumentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDocumentStore::open(dir.path().join("academy")).unwrap();
        (dir, store)
    }

    #[test]
    fn creating_a_collection_twice_reports_exists() {
        let (_dir, store) = store();
        store.create_collection("students").unwrap();
        let err = store.create_collection("students").unwrap_err();
        assert!(matches!(err, DocError::CollectionExists(name) if name == "students"));
        assert_eq!(store.list_collections().unwrap(), vec!["students".to_string()]);
    }

    #[test]
    fn operations_on_missing_collection_fail() {
        let (_dir, store) = store();
        let err = store.count_documents("advisors", &Filter::all()).unwrap_err();
        assert!(matches!(err, DocError::CollectionNotFound(_)));
        assert!(matches!(
            store.create_collection("../escape").unwrap_err(),
            DocError::InvalidName(_)
        ));
    }

    #[test]
    fn duplicate_insert_is_rejected_by_the_engine() {
        let (_dir, store) = store();
        store.create_collection("advisors").unwrap();
        store.insert_one("advisors", doc(json!({"_id": 1, "name": "A"}))).unwrap();
        let err = store
            .insert_one("advisors", doc(json!({"_id": 1, "name": "B"})))
            .unwrap_err();
        assert!(matches!(err, DocError::DuplicateId(DocumentId::Int(1))));
    }

    #[test]
    fn find_orders_by_id_and_applies_projection() {
        let (_dir, store) = store();
        store.create_collection("students").unwrap();
        for id in [10, 2, 1] {
            store
                .insert_one("students", doc(json!({"_id": id, "name": "n", "age": id})))
                .unwrap();
        }

        let found = store
            .find("students", Filter::all(), Some(Projection::fields(["age"])))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        let ids = found
            .iter()
            .map(|document| document["_id"].as_i64().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![1, 2, 10]);
        assert!(found.iter().all(|document| !document.contains_key("name")));
    }

    #[test]
    fn text_ids_with_any_characters_are_stored_and_found() {
        let (_dir, store) = store();
        store.create_collection("students").unwrap();
        for id in ["ana lomidze", "ana.lomidze", "a/b", "ნინო"] {
            store
                .insert_one("students", doc(json!({"_id": id, "name": "Ana"})))
                .unwrap();
        }

        let ids = store
            .find("students", Filter::all(), None)
            .unwrap()
            .map(|document| document.unwrap()["_id"].as_str().unwrap().to_string())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["a/b", "ana lomidze", "ana.lomidze", "ნინო"]);
        assert_eq!(
            store
                .count_documents("students", &Filter::all().eq("_id", "a/b"))
                .unwrap(),
            1
        );
    }

    #[test]
    fn oversized_id_lookup_matches_nothing() {
        let (_dir, store) = store();
        store.create_collection("students").unwrap();
        let long = "x".repeat(500);

        let filter = Filter::all().eq("_id", long.clone());
        assert_eq!(store.count_documents("students", &filter).unwrap(), 0);
        assert_eq!(store.delete_one("students", &filter).unwrap(), 0);
        assert!(matches!(
            store
                .insert_one("students", doc(json!({"_id": long})))
                .unwrap_err(),
            DocError::InvalidId(_)
        ));
    }

    #[test]
    fn delete_one_removes_only_first_match() {
        let (_dir, store) = store();
        store.create_collection("links").unwrap();
        for id in ["1_1", "1_2"] {
            store
                .insert_one("links", doc(json!({"_id": id, "student_id": 1})))
                .unwrap();
        }

        let removed = store
            .delete_one("links", &Filter::all().eq("student_id", 1))
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.count_documents("links", &Filter::all()).unwrap(), 1);
    }
}
