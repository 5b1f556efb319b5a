pub mod backend;
pub mod contacts;
pub mod memory;
pub mod models;

use std::sync::Arc;

use mongodb::bson::{self, doc, Document};

use crate::config::DatabaseConfig;
use crate::error::{BackendError, StoreError, StoreResult};

pub use backend::{DocumentBackend, FindSpec, MongoBackend};
pub use memory::MemoryBackend;
pub use models::InsertedId;
use models::{seed_courses, COURSES, REQUIRED_COLLECTIONS};

/// Shared handle to the document database.
///
/// Built once at startup and cloned into whatever needs it; clones share the
/// same underlying connection.
#[derive(Clone)]
pub struct DataStore {
    backend: Arc<dyn DocumentBackend>,
}

pub(crate) fn storage_error(operation: &'static str, collection: &str, source: BackendError) -> StoreError {
    tracing::error!(operation, collection, "Database operation failed: {}", source);
    StoreError::Storage {
        operation,
        collection: collection.to_string(),
        source,
    }
}

impl DataStore {
    /// Connect to MongoDB and make sure the baseline collections and course
    /// data are in place.
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        tracing::info!("Attempting to connect to MongoDB: {}", config.uri);

        let connection_error = |source: BackendError| {
            tracing::error!(
                uri = %config.uri,
                database = %config.name,
                "MongoDB connection failed: {}",
                source
            );
            StoreError::Connection {
                uri: config.uri.clone(),
                database: config.name.clone(),
                source,
            }
        };

        let backend = MongoBackend::connect(&config.uri, &config.name)
            .await
            .map_err(|e| connection_error(e))?;
        let store = Self::with_backend(Arc::new(backend))
            .await
            .map_err(|e| connection_error(Box::new(e)))?;

        tracing::info!("MongoDB connection established. Database: {}", config.name);
        Ok(store)
    }

    /// Wrap an already connected backend and run initialization against it.
    pub async fn with_backend(backend: Arc<dyn DocumentBackend>) -> StoreResult<Self> {
        let store = Self { backend };
        store.initialize_collections().await?;
        Ok(store)
    }

    /// Create missing collections and seed `courses` when it is empty. Safe to
    /// run on every start.
    async fn initialize_collections(&self) -> StoreResult<()> {
        let existing = self
            .backend
            .list_collection_names()
            .await
            .map_err(|e| storage_error("list_collections", "*", e))?;

        for name in REQUIRED_COLLECTIONS {
            if existing.iter().any(|c| c == name) {
                continue;
            }
            // Another process may have created it since the listing
            let created = self
                .backend
                .create_collection(name)
                .await
                .map_err(|e| storage_error("create_collection", name, e))?;
            if created {
                tracing::info!("Collection '{}' created", name);
            }
        }

        let count = self
            .backend
            .count_documents(COURSES, doc! {})
            .await
            .map_err(|e| storage_error("count", COURSES, e))?;
        if count == 0 {
            let seeds = seed_courses()
                .iter()
                .map(bson::to_document)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| storage_error("seed", COURSES, Box::new(e)))?;
            let inserted = self
                .backend
                .insert_many(COURSES, seeds)
                .await
                .map_err(|e| storage_error("seed", COURSES, e))?;
            tracing::info!("Inserted {} initial courses", inserted);
        }

        Ok(())
    }

    pub async fn collection_names(&self) -> StoreResult<Vec<String>> {
        self.backend
            .list_collection_names()
            .await
            .map_err(|e| storage_error("list_collections", "*", e))
    }

    pub async fn count(&self, collection: &str, query: Document) -> StoreResult<u64> {
        self.backend
            .count_documents(collection, query)
            .await
            .map_err(|e| storage_error("count", collection, e))
    }

    pub async fn insert(&self, collection: &str, document: Document) -> StoreResult<InsertedId> {
        self.backend
            .insert_one(collection, document)
            .await
            .map(InsertedId::new)
            .map_err(|e| storage_error("insert", collection, e))
    }

    /// All documents matching `query`, in insertion order.
    pub async fn find(&self, collection: &str, query: Document) -> StoreResult<Vec<Document>> {
        self.backend
            .find(collection, query, FindSpec::default())
            .await
            .map_err(|e| storage_error("find", collection, e))
    }

    pub async fn find_one(&self, collection: &str, query: Document) -> StoreResult<Option<Document>> {
        self.backend
            .find_one(collection, query)
            .await
            .map_err(|e| storage_error("find_one", collection, e))
    }

    /// Merge `fields` into every matching document. Returns the number of
    /// documents matched.
    pub async fn update(&self, collection: &str, query: Document, fields: Document) -> StoreResult<u64> {
        self.backend
            .update_many(collection, query, doc! { "$set": fields })
            .await
            .map_err(|e| storage_error("update", collection, e))
    }

    pub async fn delete(&self, collection: &str, query: Document) -> StoreResult<u64> {
        self.backend
            .delete_many(collection, query)
            .await
            .map_err(|e| storage_error("delete", collection, e))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use models::{Course, USERS};

    /// Reports no collections, as if another process created them after the
    /// listing was taken.
    struct StaleListing(MemoryBackend);

    #[async_trait]
    impl DocumentBackend for StaleListing {
        async fn list_collection_names(&self) -> Result<Vec<String>, BackendError> {
            Ok(Vec::new())
        }

        async fn create_collection(&self, name: &str) -> Result<bool, BackendError> {
            self.0.create_collection(name).await
        }

        async fn drop_collection(&self, name: &str) -> Result<(), BackendError> {
            self.0.drop_collection(name).await
        }

        async fn count_documents(&self, collection: &str, filter: Document) -> Result<u64, BackendError> {
            self.0.count_documents(collection, filter).await
        }

        async fn insert_one(&self, collection: &str, document: Document) -> Result<bson::Bson, BackendError> {
            self.0.insert_one(collection, document).await
        }

        async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<usize, BackendError> {
            self.0.insert_many(collection, documents).await
        }

        async fn find(
            &self,
            collection: &str,
            filter: Document,
            spec: FindSpec,
        ) -> Result<Vec<Document>, BackendError> {
            self.0.find(collection, filter, spec).await
        }

        async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>, BackendError> {
            self.0.find_one(collection, filter).await
        }

        async fn update_many(
            &self,
            collection: &str,
            filter: Document,
            update: Document,
        ) -> Result<u64, BackendError> {
            self.0.update_many(collection, filter, update).await
        }

        async fn update_one(
            &self,
            collection: &str,
            filter: Document,
            update: Document,
        ) -> Result<u64, BackendError> {
            self.0.update_one(collection, filter, update).await
        }

        async fn delete_many(&self, collection: &str, filter: Document) -> Result<u64, BackendError> {
            self.0.delete_many(collection, filter).await
        }
    }

    async fn memory_store() -> (Arc<MemoryBackend>, DataStore) {
        let backend = Arc::new(MemoryBackend::new());
        let store = DataStore::with_backend(backend.clone()).await.unwrap();
        (backend, store)
    }

    #[tokio::test]
    async fn initialization_creates_collections_and_seeds_courses() {
        let (_, store) = memory_store().await;

        let names = store.collection_names().await.unwrap();
        assert_eq!(names, vec!["contacts", "courses", "users"]);

        let courses = store.find(COURSES, doc! {}).await.unwrap();
        let ids: Vec<&str> = courses.iter().map(|c| c.get_str("id").unwrap()).collect();
        assert_eq!(ids, vec!["web", "marketing"]);
    }

    #[tokio::test]
    async fn initialization_is_idempotent() {
        let (backend, first) = memory_store().await;
        let names_before = first.collection_names().await.unwrap();

        let second = DataStore::with_backend(backend).await.unwrap();
        assert_eq!(second.collection_names().await.unwrap(), names_before);
        assert_eq!(second.count(COURSES, doc! {}).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn initialization_tolerates_concurrently_created_collections() {
        let inner = MemoryBackend::new();
        for name in REQUIRED_COLLECTIONS {
            inner.create_collection(name).await.unwrap();
        }

        let store = DataStore::with_backend(Arc::new(StaleListing(inner)))
            .await
            .unwrap();
        assert_eq!(store.count(COURSES, doc! {}).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn seeding_skips_non_empty_courses() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .insert_one(COURSES, doc! { "id": "rust", "title": "Rust" })
            .await
            .unwrap();

        let store = DataStore::with_backend(backend).await.unwrap();
        let courses = store.find(COURSES, doc! {}).await.unwrap();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].get_str("id").unwrap(), "rust");
    }

    #[tokio::test]
    async fn update_merges_only_given_fields() {
        let (_, store) = memory_store().await;

        let matched = store
            .update(COURSES, doc! { "id": "web" }, doc! { "price": 150.0 })
            .await
            .unwrap();
        assert_eq!(matched, 1);

        let web = store.find_one(COURSES, doc! { "id": "web" }).await.unwrap().unwrap();
        let course: Course = bson::from_document(web).unwrap();
        assert_eq!(course.price, 150.0);
        assert_eq!(course.title, "Full Stack Web Development");
        assert_eq!(course.description, "Learn web development from scratch");
        assert_eq!(course.duration, "3 months");
        assert_eq!(course.level, "Beginner");

        let marketing = store
            .find_one(COURSES, doc! { "id": "marketing" })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(marketing.get_f64("price").unwrap(), 180.0);
    }

    #[tokio::test]
    async fn insert_and_delete_users() {
        let (_, store) = memory_store().await;

        let id = store
            .insert(USERS, doc! { "name": "Ana", "email": "ana@example.com" })
            .await
            .unwrap();
        assert!(matches!(id.as_bson(), bson::Bson::ObjectId(_)));
        assert_eq!(store.find(USERS, doc! { "name": "Ana" }).await.unwrap().len(), 1);

        let deleted = store.delete(USERS, doc! { "name": "Ana" }).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(store.find(USERS, doc! {}).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_with_no_match_is_empty() {
        let (_, store) = memory_store().await;
        let found = store.find(COURSES, doc! { "id": "missing" }).await.unwrap();
        assert!(found.is_empty());
        assert!(store.find_one(COURSES, doc! { "id": "missing" }).await.unwrap().is_none());
    }
}
