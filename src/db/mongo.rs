//! MongoDB client and collection wrapper

use bson::{doc, oid::ObjectId, DateTime, Document};
use futures_util::StreamExt;
use mongodb::{
    options::{FindOneAndReplaceOptions, FindOneOptions, FindOptions, IndexOptions, ReturnDocument},
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, info};

use crate::db::schemas::Metadata;
use crate::types::{MusterError, Result};

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// Trait for schemas that expose free-text searchable fields
pub trait Searchable {
    fn searchable_fields() -> &'static [&'static str];
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| MusterError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        // Verify connection with timeout
        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| MusterError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Get the raw MongoDB client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the database name
    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
{
    /// Create a new collection and apply indexes
    pub async fn new(client: &Client, db_name: &str, collection_name: &str) -> Result<Self> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        // Apply indexes
        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<()> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| MusterError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document, setting metadata timestamps
    pub async fn insert_one(&self, mut item: T) -> Result<ObjectId> {
        let metadata = item.mut_metadata();
        metadata.created_at = Some(DateTime::now());
        metadata.updated_at = Some(DateTime::now());

        let result = self.inner.insert_one(item).await.map_err(MusterError::from)?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| MusterError::Database("Failed to get inserted ID".into()))
    }

    /// Find one document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>> {
        self.inner
            .find_one(filter)
            .await
            .map_err(|e| MusterError::Database(format!("Find failed: {}", e)))
    }

    /// Find one document by its identifier
    pub async fn find_by_id(&self, id: ObjectId) -> Result<Option<T>> {
        self.find_one(doc! { "_id": id }).await
    }

    /// Find one document as a raw BSON document, honoring a field projection
    pub async fn find_raw_by_id(
        &self,
        id: ObjectId,
        projection: Option<Document>,
    ) -> Result<Option<Document>> {
        let options = FindOneOptions::builder().projection(projection).build();

        self.inner
            .clone_with_type::<Document>()
            .find_one(doc! { "_id": id })
            .with_options(options)
            .await
            .map_err(|e| MusterError::Database(format!("Find failed: {}", e)))
    }

    /// Find many documents by filter with sort and pagination options
    pub async fn find_many(&self, filter: Document, options: FindOptions) -> Result<Vec<T>> {
        let cursor = self
            .inner
            .find(filter)
            .with_options(options)
            .await
            .map_err(|e| MusterError::Database(format!("Find failed: {}", e)))?;

        let results: Vec<T> = cursor
            .filter_map(|item| async {
                match item {
                    Ok(doc) => Some(doc),
                    Err(e) => {
                        error!("Error reading document: {}", e);
                        None
                    }
                }
            })
            .collect()
            .await;

        Ok(results)
    }

    /// Count documents matching a filter
    pub async fn count(&self, filter: Document) -> Result<u64> {
        self.inner
            .count_documents(filter)
            .await
            .map_err(|e| MusterError::Database(format!("Count failed: {}", e)))
    }

    /// Latest update timestamp among documents matching a filter
    pub async fn last_modified(&self, filter: Document) -> Result<Option<DateTime>> {
        let options = FindOneOptions::builder()
            .sort(doc! { "metadata.updated_at": -1 })
            .projection(doc! { "metadata": 1 })
            .build();

        let latest = self
            .inner
            .clone_with_type::<Document>()
            .find_one(filter)
            .with_options(options)
            .await
            .map_err(|e| MusterError::Database(format!("Find failed: {}", e)))?;

        Ok(latest
            .and_then(|doc| doc.get_document("metadata").ok().cloned())
            .and_then(|metadata| metadata.get_datetime("updated_at").ok().copied()))
    }

    /// Replace a document by id, bumping its update timestamp and returning
    /// the stored replacement
    pub async fn replace_by_id(&self, id: ObjectId, mut item: T) -> Result<Option<T>> {
        item.mut_metadata().updated_at = Some(DateTime::now());

        let options = FindOneAndReplaceOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        self.inner
            .find_one_and_replace(doc! { "_id": id }, item)
            .with_options(options)
            .await
            .map_err(MusterError::from)
    }

    /// Delete a document by id, returning the removed document
    pub async fn delete_by_id(&self, id: ObjectId) -> Result<Option<T>> {
        self.inner
            .find_one_and_delete(doc! { "_id": id })
            .await
            .map_err(|e| MusterError::Database(format!("Delete failed: {}", e)))
    }

    /// Delete every document matching a filter
    pub async fn delete_many(&self, filter: Document) -> Result<u64> {
        let result = self
            .inner
            .delete_many(filter)
            .await
            .map_err(|e| MusterError::Database(format!("Delete failed: {}", e)))?;

        Ok(result.deleted_count)
    }

    /// Get the underlying collection for advanced operations
    pub fn inner(&self) -> &Collection<T> {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    // Collection operations require a running MongoDB instance and are
    // exercised by the end-to-end suite in tests/http_api.rs.
}
