use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, Bson, Document};

use super::backend::{DocumentBackend, FindSpec};
use crate::error::BackendError;

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("unsupported filter operator: {0}")]
    UnsupportedFilter(String),

    #[error("unsupported update operator: {0}")]
    UnsupportedUpdate(String),

    #[error("memory store lock poisoned")]
    Poisoned,
}

/// Process-local document store with MongoDB-like semantics for top-level
/// equality filters, `$set` updates and single-field sorts.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    collections: Mutex<BTreeMap<String, Vec<Document>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Vec<Document>>>, BackendError> {
        self.collections.lock().map_err(|_| MemoryError::Poisoned.into())
    }
}

/// Only plain top-level equality filters are supported.
fn check_filter(filter: &Document) -> Result<(), BackendError> {
    for (key, value) in filter {
        let nested_operator = match value {
            Bson::Document(inner) => inner.keys().find(|k| k.starts_with('$')).cloned(),
            _ => None,
        };
        if key.starts_with('$') {
            return Err(MemoryError::UnsupportedFilter(key.clone()).into());
        }
        if let Some(operator) = nested_operator {
            return Err(MemoryError::UnsupportedFilter(operator).into());
        }
    }
    Ok(())
}

// Numbers compare by value across Int32, Int64 and Double, as in MongoDB
fn values_equal(stored: &Bson, expected: &Bson) -> bool {
    match (as_f64(stored), as_f64(expected)) {
        (Some(a), Some(b)) => a == b,
        _ => stored == expected,
    }
}

fn matches(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(key, expected)| document.get(key).is_some_and(|stored| values_equal(stored, expected)))
}

fn set_fields(update: &Document) -> Result<&Document, BackendError> {
    let mut set = None;
    for (operator, fields) in update {
        match (operator.as_str(), fields) {
            ("$set", Bson::Document(fields)) => set = Some(fields),
            _ => return Err(MemoryError::UnsupportedUpdate(operator.clone()).into()),
        }
    }
    set.ok_or_else(|| MemoryError::UnsupportedUpdate("<empty>".to_string()).into())
}

fn apply(document: &mut Document, fields: &Document) {
    for (key, value) in fields {
        document.insert(key.clone(), value.clone());
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Double(v) => Some(*v),
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        _ => None,
    }
}

fn compare(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    match (a, b) {
        (Some(Bson::DateTime(a)), Some(Bson::DateTime(b))) => {
            a.timestamp_millis().cmp(&b.timestamp_millis())
        }
        (Some(Bson::String(a)), Some(Bson::String(b))) => a.cmp(b),
        (Some(a), Some(b)) => match (as_f64(a), as_f64(b)) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            _ => Ordering::Equal,
        },
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn sort_documents(documents: &mut [Document], sort: &Document) {
    documents.sort_by(|a, b| {
        for (key, direction) in sort {
            let descending = as_f64(direction).is_some_and(|d| d < 0.0);
            let mut ordering = compare(a.get(key), b.get(key));
            if descending {
                ordering = ordering.reverse();
            }
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

#[async_trait]
impl DocumentBackend for MemoryBackend {
    async fn list_collection_names(&self) -> Result<Vec<String>, BackendError> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    async fn create_collection(&self, name: &str) -> Result<bool, BackendError> {
        let mut collections = self.lock()?;
        if collections.contains_key(name) {
            return Ok(false);
        }
        collections.insert(name.to_string(), Vec::new());
        Ok(true)
    }

    async fn drop_collection(&self, name: &str) -> Result<(), BackendError> {
        self.lock()?.remove(name);
        Ok(())
    }

    async fn count_documents(&self, collection: &str, filter: Document) -> Result<u64, BackendError> {
        check_filter(&filter)?;
        let collections = self.lock()?;
        let count = collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| matches(d, &filter)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn insert_one(&self, collection: &str, mut document: Document) -> Result<Bson, BackendError> {
        if !document.contains_key("_id") {
            document.insert("_id", ObjectId::new());
        }
        let id = document.get("_id").cloned().unwrap_or(Bson::Null);
        self.lock()?
            .entry(collection.to_string())
            .or_default()
            .push(document);
        Ok(id)
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<usize, BackendError> {
        let count = documents.len();
        for document in documents {
            self.insert_one(collection, document).await?;
        }
        Ok(count)
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        spec: FindSpec,
    ) -> Result<Vec<Document>, BackendError> {
        check_filter(&filter)?;
        let mut found: Vec<Document> = self
            .lock()?
            .get(collection)
            .map(|docs| docs.iter().filter(|d| matches(d, &filter)).cloned().collect())
            .unwrap_or_default();

        if let Some(sort) = &spec.sort {
            sort_documents(&mut found, sort);
        }
        // As with MongoDB, a limit of zero means no limit
        if let Some(limit) = spec.limit.filter(|l| *l != 0) {
            found.truncate(limit.unsigned_abs() as usize);
        }

        Ok(found)
    }

    async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>, BackendError> {
        check_filter(&filter)?;
        Ok(self
            .lock()?
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| matches(d, &filter)).cloned()))
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<u64, BackendError> {
        check_filter(&filter)?;
        let fields = set_fields(&update)?;
        let mut collections = self.lock()?;
        let mut matched = 0;
        if let Some(docs) = collections.get_mut(collection) {
            for document in docs.iter_mut().filter(|d| matches(d, &filter)) {
                apply(document, fields);
                matched += 1;
            }
        }
        Ok(matched)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<u64, BackendError> {
        check_filter(&filter)?;
        let fields = set_fields(&update)?;
        let mut collections = self.lock()?;
        let target = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| matches(d, &filter)));
        match target {
            Some(document) => {
                apply(document, fields);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> Result<u64, BackendError> {
        check_filter(&filter)?;
        let mut collections = self.lock()?;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !matches(d, &filter));
        Ok((before - docs.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[tokio::test]
    async fn create_existing_collection_reports_not_created() {
        let backend = MemoryBackend::new();
        assert!(backend.create_collection("courses").await.unwrap());
        assert!(!backend.create_collection("courses").await.unwrap());
    }

    #[tokio::test]
    async fn numeric_filters_match_across_types() {
        let backend = MemoryBackend::new();
        backend.insert_one("courses", doc! { "price": 200.0 }).await.unwrap();
        backend.insert_one("courses", doc! { "price": 180_i64 }).await.unwrap();

        let found = backend
            .find("courses", doc! { "price": 200 }, FindSpec::default())
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(backend.count_documents("courses", doc! { "price": 180.0 }).await.unwrap(), 1);
        assert_eq!(backend.count_documents("courses", doc! { "price": "200" }).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn operator_filters_are_rejected() {
        let backend = MemoryBackend::new();
        backend.insert_one("courses", doc! { "price": 200.0 }).await.unwrap();

        let nested = backend
            .find("courses", doc! { "price": { "$gt": 100 } }, FindSpec::default())
            .await;
        assert!(nested.is_err());

        let top_level = backend
            .delete_many("courses", doc! { "$or": [{ "price": 200.0 }] })
            .await;
        assert!(top_level.is_err());
        assert_eq!(backend.count_documents("courses", doc! {}).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn insert_assigns_object_id() {
        let backend = MemoryBackend::new();
        let id = backend.insert_one("users", doc! { "name": "Ana" }).await.unwrap();
        assert!(matches!(id, Bson::ObjectId(_)));

        let stored = backend.find_one("users", doc! { "name": "Ana" }).await.unwrap().unwrap();
        assert_eq!(stored.get("_id"), Some(&id));
    }

    #[tokio::test]
    async fn find_sorts_descending_and_limits() {
        let backend = MemoryBackend::new();
        for n in [2, 3, 1] {
            backend.insert_one("items", doc! { "n": n }).await.unwrap();
        }

        let spec = FindSpec {
            sort: Some(doc! { "n": -1 }),
            limit: Some(2),
        };
        let found = backend.find("items", doc! {}, spec).await.unwrap();
        let ns: Vec<i32> = found.iter().map(|d| d.get_i32("n").unwrap()).collect();
        assert_eq!(ns, vec![3, 2]);
    }

    #[tokio::test]
    async fn update_rejects_replacement_documents() {
        let backend = MemoryBackend::new();
        backend.insert_one("items", doc! { "n": 1 }).await.unwrap();
        let result = backend
            .update_many("items", doc! { "n": 1 }, doc! { "n": 2 })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn delete_counts_removed_documents() {
        let backend = MemoryBackend::new();
        for tag in ["a", "b", "a"] {
            backend.insert_one("items", doc! { "tag": tag }).await.unwrap();
        }
        let deleted = backend.delete_many("items", doc! { "tag": "a" }).await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(backend.count_documents("items", doc! {}).await.unwrap(), 1);
    }
}
