use std::time::Duration;

use async_trait::async_trait;
use mongodb::{
    bson::{doc, Bson, Document},
    error::ErrorKind,
    options::ClientOptions,
    Client, Collection, Database,
};

use crate::error::BackendError;

/// Connect, server selection and ping are each bounded by this.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

// Server error code for "collection already exists"
const NAMESPACE_EXISTS: i32 = 48;

/// Sort and limit applied to a `find`.
#[derive(Debug, Clone, Default)]
pub struct FindSpec {
    pub sort: Option<Document>,
    pub limit: Option<i64>,
}

/// Raw document operations the data store is built on.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    async fn list_collection_names(&self) -> Result<Vec<String>, BackendError>;

    /// Returns `false` when the collection already existed.
    async fn create_collection(&self, name: &str) -> Result<bool, BackendError>;

    async fn drop_collection(&self, name: &str) -> Result<(), BackendError>;

    async fn count_documents(&self, collection: &str, filter: Document) -> Result<u64, BackendError>;

    /// Returns the storage-assigned `_id`.
    async fn insert_one(&self, collection: &str, document: Document) -> Result<Bson, BackendError>;

    /// Returns the number of documents inserted.
    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<usize, BackendError>;

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        spec: FindSpec,
    ) -> Result<Vec<Document>, BackendError>;

    async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>, BackendError>;

    /// Returns the number of documents matched.
    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<u64, BackendError>;

    /// Returns the number of documents matched (0 or 1).
    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<u64, BackendError>;

    async fn delete_many(&self, collection: &str, filter: Document) -> Result<u64, BackendError>;
}

pub struct MongoBackend {
    database: Database,
}

impl MongoBackend {
    /// Open a client against `uri` and verify the server answers a ping.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, BackendError> {
        let mut options = ClientOptions::parse(uri).await?;
        options.connect_timeout = Some(CONNECTION_TIMEOUT);
        options.server_selection_timeout = Some(CONNECTION_TIMEOUT);
        options.retry_reads = Some(false);
        options.retry_writes = Some(false);

        let client = Client::with_options(options)?;

        // The driver has no per-socket timeout, so bound the liveness check instead
        tokio::time::timeout(
            CONNECTION_TIMEOUT,
            client.database("admin").run_command(doc! { "ping": 1 }),
        )
        .await??;

        tracing::info!("Successfully connected to MongoDB");
        Ok(Self {
            database: client.database(database),
        })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }
}

#[async_trait]
impl DocumentBackend for MongoBackend {
    async fn list_collection_names(&self) -> Result<Vec<String>, BackendError> {
        Ok(self.database.list_collection_names().await?)
    }

    async fn create_collection(&self, name: &str) -> Result<bool, BackendError> {
        match self.database.create_collection(name).await {
            Ok(()) => Ok(true),
            Err(e) if matches!(*e.kind, ErrorKind::Command(ref c) if c.code == NAMESPACE_EXISTS) => {
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn drop_collection(&self, name: &str) -> Result<(), BackendError> {
        self.collection(name).drop().await?;
        Ok(())
    }

    async fn count_documents(&self, collection: &str, filter: Document) -> Result<u64, BackendError> {
        Ok(self.collection(collection).count_documents(filter).await?)
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<Bson, BackendError> {
        let result = self.collection(collection).insert_one(document).await?;
        Ok(result.inserted_id)
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<usize, BackendError> {
        let result = self.collection(collection).insert_many(documents).await?;
        Ok(result.inserted_ids.len())
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        spec: FindSpec,
    ) -> Result<Vec<Document>, BackendError> {
        let coll = self.collection(collection);
        let mut find = coll.find(filter);
        if let Some(sort) = spec.sort {
            find = find.sort(sort);
        }
        if let Some(limit) = spec.limit {
            find = find.limit(limit);
        }

        let mut cursor = find.await?;
        let mut documents = Vec::new();
        while cursor.advance().await? {
            documents.push(cursor.deserialize_current()?);
        }

        Ok(documents)
    }

    async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>, BackendError> {
        Ok(self.collection(collection).find_one(filter).await?)
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<u64, BackendError> {
        let result = self.collection(collection).update_many(filter, update).await?;
        Ok(result.matched_count)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<u64, BackendError> {
        let result = self.collection(collection).update_one(filter, update).await?;
        Ok(result.matched_count)
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> Result<u64, BackendError> {
        let result = self.collection(collection).delete_many(filter).await?;
        Ok(result.deleted_count)
    }
}
