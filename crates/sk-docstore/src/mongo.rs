//! MongoDB backend

use std::sync::Arc;

use async_trait::async_trait;
use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::error::{Error as MongoError, ErrorKind};
use mongodb::options::{
    CreateCollectionOptions, DeleteManyModel, DeleteOneModel, IndexOptions, InsertOneModel,
    ReplaceOneModel, UpdateManyModel, UpdateModifications, UpdateOneModel, WriteModel,
};
use mongodb::{Client, Collection, Database, IndexModel};
use tracing::{debug, info};

use crate::backend::{CollectionOptions, DatabaseInfo, DocumentBackend, IndexSpec, UpdateOutcome};
use crate::error::{DocStoreError, Result};
use crate::query::{Filter, QueryOptions, SortOrder, Update};
use crate::write::{BulkWriteOptions, BulkWriteSummary, WriteOperation};

impl From<MongoError> for DocStoreError {
    fn from(err: MongoError) -> Self {
        match *err.kind {
            ErrorKind::Io(_)
            | ErrorKind::ServerSelection { .. }
            | ErrorKind::ConnectionPoolCleared { .. }
            | ErrorKind::DnsResolve { .. }
            | ErrorKind::Authentication { .. } => DocStoreError::unavailable(err.to_string()),
            _ => DocStoreError::operation_failed(err.to_string()),
        }
    }
}

/// [`DocumentBackend`] over the official MongoDB driver.
#[derive(Clone)]
pub struct MongoBackend {
    client: Client,
    database: Database,
}

impl MongoBackend {
    pub fn new(client: Client, database_name: &str) -> Self {
        let database = client.database(database_name);
        Self { client, database }
    }

    /// Parse the connection string and bind to `database_name`.
    ///
    /// The driver connects lazily; use [`MongoBackend::ping`] to verify
    /// reachability.
    pub async fn connect(connection_string: &str, database_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(connection_string).await?;
        info!(database = database_name, "MongoDB client created");
        Ok(Self::new(client, database_name))
    }

    pub async fn ping(&self) -> Result<()> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }
}

fn non_negative(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

#[async_trait]
impl DocumentBackend for MongoBackend {
    fn database_name(&self) -> &str {
        self.database.name()
    }

    fn with_database(&self, database_name: &str) -> Arc<dyn DocumentBackend> {
        Arc::new(Self::new(self.client.clone(), database_name))
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<()> {
        self.collection(collection).insert_one(document).await?;
        Ok(())
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }
        self.collection(collection).insert_many(documents).await?;
        Ok(())
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &QueryOptions,
    ) -> Result<Vec<Document>> {
        // The server treats a zero limit as "no limit".
        if options.limit == Some(0) {
            return Ok(Vec::new());
        }

        let coll = self.collection(collection);
        let mut find = coll.find(filter.to_document());
        if let Some(sort) = &options.sort {
            find = find.sort(sort.to_document());
        }
        if options.skip > 0 {
            find = find.skip(options.skip);
        }
        if let Some(limit) = options.limit {
            find = find.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if let Some(projection) = &options.projection {
            find = find.projection(projection.to_document());
        }

        let cursor = find.await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64> {
        Ok(self.collection(collection).count_documents(filter.to_document()).await?)
    }

    async fn update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        many: bool,
    ) -> Result<UpdateOutcome> {
        if update.is_empty() {
            return Err(DocStoreError::operation_failed("Update document must contain at least one operator"));
        }

        let coll = self.collection(collection);
        let result = if many {
            coll.update_many(filter.to_document(), update.to_document()).await?
        } else {
            coll.update_one(filter.to_document(), update.to_document()).await?
        };

        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn delete(&self, collection: &str, filter: &Filter, many: bool) -> Result<u64> {
        let coll = self.collection(collection);
        let result = if many {
            coll.delete_many(filter.to_document()).await?
        } else {
            coll.delete_one(filter.to_document()).await?
        };
        Ok(result.deleted_count)
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: &Filter,
        replacement: Document,
    ) -> Result<UpdateOutcome> {
        let result = self
            .collection(collection)
            .replace_one(filter.to_document(), replacement)
            .await?;

        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    /// Uses the client-level bulk write command (MongoDB 8.0+).
    async fn bulk_write(
        &self,
        collection: &str,
        operations: Vec<WriteOperation<Document>>,
        options: &BulkWriteOptions,
    ) -> Result<BulkWriteSummary> {
        if operations.is_empty() {
            return Ok(BulkWriteSummary::default());
        }

        let namespace = self.collection(collection).namespace();
        let models: Vec<WriteModel> = operations
            .into_iter()
            .map(|operation| match operation {
                WriteOperation::InsertOne(document) => WriteModel::InsertOne(
                    InsertOneModel::builder()
                        .namespace(namespace.clone())
                        .document(document)
                        .build(),
                ),
                WriteOperation::UpdateOne { filter, update } => WriteModel::UpdateOne(
                    UpdateOneModel::builder()
                        .namespace(namespace.clone())
                        .filter(filter.to_document())
                        .update(UpdateModifications::Document(update.to_document()))
                        .build(),
                ),
                WriteOperation::UpdateMany { filter, update } => WriteModel::UpdateMany(
                    UpdateManyModel::builder()
                        .namespace(namespace.clone())
                        .filter(filter.to_document())
                        .update(UpdateModifications::Document(update.to_document()))
                        .build(),
                ),
                WriteOperation::ReplaceOne { filter, replacement } => WriteModel::ReplaceOne(
                    ReplaceOneModel::builder()
                        .namespace(namespace.clone())
                        .filter(filter.to_document())
                        .replacement(replacement)
                        .build(),
                ),
                WriteOperation::DeleteOne(filter) => WriteModel::DeleteOne(
                    DeleteOneModel::builder()
                        .namespace(namespace.clone())
                        .filter(filter.to_document())
                        .build(),
                ),
                WriteOperation::DeleteMany(filter) => WriteModel::DeleteMany(
                    DeleteManyModel::builder()
                        .namespace(namespace.clone())
                        .filter(filter.to_document())
                        .build(),
                ),
            })
            .collect();

        debug!(collection, operations = models.len(), ordered = options.ordered, "MongoDB bulk write");
        let result = self.client.bulk_write(models).ordered(options.ordered).await?;

        Ok(BulkWriteSummary {
            inserted: non_negative(result.inserted_count),
            matched: non_negative(result.matched_count),
            modified: non_negative(result.modified_count),
            deleted: non_negative(result.deleted_count),
        })
    }

    async fn list_databases(&self) -> Result<Vec<DatabaseInfo>> {
        let databases = self.client.list_databases().await?;
        Ok(databases
            .into_iter()
            .map(|spec| DatabaseInfo {
                name: spec.name,
                size_on_disk: spec.size_on_disk,
                empty: spec.empty,
            })
            .collect())
    }

    async fn drop_database(&self, database_name: &str) -> Result<()> {
        self.client.database(database_name).drop().await?;
        Ok(())
    }

    async fn create_collection(&self, collection: &str, options: &CollectionOptions) -> Result<()> {
        let mut create_options = CreateCollectionOptions::default();
        if options.capped {
            create_options.capped = Some(true);
            create_options.size = options.size_bytes;
            create_options.max = options.max_documents;
        }

        self.database
            .create_collection(collection)
            .with_options(create_options)
            .await?;
        Ok(())
    }

    async fn drop_collection(&self, collection: &str) -> Result<()> {
        self.collection(collection).drop().await?;
        Ok(())
    }

    async fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<String> {
        let mut keys = Document::new();
        for (field, order) in &index.keys {
            let direction = match order {
                SortOrder::Ascending => 1,
                SortOrder::Descending => -1,
            };
            keys.insert(field.as_str(), direction);
        }

        let model = IndexModel::builder()
            .keys(keys)
            .options(
                IndexOptions::builder()
                    .unique(index.unique)
                    .name(index.index_name())
                    .build(),
            )
            .build();

        let result = self.collection(collection).create_index(model).await?;
        Ok(result.index_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Counter {
        #[allow(dead_code)]
        n: i32,
    }

    #[test]
    fn test_transport_errors_are_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        let err = DocStoreError::from(MongoError::from(io));

        assert!(matches!(err, DocStoreError::StoreUnavailable { .. }));
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_other_errors_are_operation_failures() {
        let decode = bson::from_document::<Counter>(doc! { "n": "not a number" }).unwrap_err();
        let err = DocStoreError::from(MongoError::from(decode));

        assert!(matches!(err, DocStoreError::OperationFailed { .. }));
        assert!(!err.is_unavailable());
    }
}
