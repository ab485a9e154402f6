//! Document Store Gateway
//!
//! Typed document operations over any [`DocumentBackend`]. Entities are
//! serialized to BSON on the way in and deserialized on the way out; filter
//! correctness is the caller's responsibility.

use std::marker::PhantomData;
use std::sync::Arc;

use bson::Document;
use tracing::{debug, warn};

use crate::backend::{CollectionOptions, DatabaseInfo, DocumentBackend, IndexSpec};
use crate::entity::{Entity, ID_FIELD};
use crate::error::{DocStoreError, Result};
use crate::query::{Filter, Projection, QueryOptions, Update};
use crate::write::{BulkWriteOptions, BulkWriteSummary, WriteOperation};

/// Generic gateway bound to one database.
///
/// Cloning is cheap; clones share the backend. Rebinding to another
/// database produces a new gateway via [`DocumentStore::with_database`].
#[derive(Clone)]
pub struct DocumentStore {
    backend: Arc<dyn DocumentBackend>,
}

impl DocumentStore {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self { backend }
    }

    pub fn database_name(&self) -> &str {
        self.backend.database_name()
    }

    /// Gateway for another database on the same client.
    pub fn with_database(&self, database_name: &str) -> Self {
        debug!(from = self.database_name(), to = database_name, "rebinding document store");
        Self::new(self.backend.with_database(database_name))
    }

    /// Typed handle to a named collection. No I/O is performed.
    pub fn collection<T: Entity>(&self, name: &str) -> CollectionHandle<T> {
        CollectionHandle {
            store: self.clone(),
            name: name.to_string(),
            _entity: PhantomData,
        }
    }

    /// Insert one document and hand it back unchanged.
    pub async fn insert_document<T: Entity>(&self, document: T, collection: &str) -> Result<T> {
        debug!(collection, id = document.id(), "insert_document");
        self.backend.insert_one(collection, bson::to_document(&document)?).await?;
        Ok(document)
    }

    pub async fn insert_documents<T: Entity>(&self, documents: Vec<T>, collection: &str) -> Result<Vec<T>> {
        debug!(collection, count = documents.len(), "insert_documents");
        let raw = documents
            .iter()
            .map(bson::to_document)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.backend.insert_many(collection, raw).await?;
        Ok(documents)
    }

    /// Every document in database-native order.
    pub async fn get_all_documents<T: Entity>(&self, collection: &str) -> Result<Vec<T>> {
        self.get_documents(collection, &Filter::Empty, QueryOptions::default()).await
    }

    pub async fn count_documents<T: Entity>(&self, collection: &str, filter: &Filter) -> Result<u64> {
        debug!(collection, "count_documents");
        self.backend.count(collection, filter).await
    }

    /// Single-result lookup.
    ///
    /// Returns `Ok(None)` when nothing matches and
    /// [`DocStoreError::AmbiguousResult`] when more than one document does.
    pub async fn get_document<T: Entity>(
        &self,
        filter: &Filter,
        collection: &str,
        projection: Option<Projection>,
    ) -> Result<Option<T>> {
        debug!(collection, "get_document");
        let options = QueryOptions {
            limit: Some(2),
            projection,
            ..QueryOptions::default()
        };

        let mut found = self.backend.find(collection, filter, &options).await?;
        match found.len() {
            0 => Ok(None),
            1 => Ok(Some(bson::from_document(found.remove(0))?)),
            matched => {
                warn!(collection, matched, "single-result lookup matched more than one document");
                Err(DocStoreError::ambiguous(collection, matched))
            }
        }
    }

    /// Page of matching documents: sort, then skip/limit, then projection.
    pub async fn get_documents<T: Entity>(
        &self,
        collection: &str,
        filter: &Filter,
        options: QueryOptions,
    ) -> Result<Vec<T>> {
        debug!(collection, skip = options.skip, limit = ?options.limit, "get_documents");
        let found = self.backend.find(collection, filter, &options).await?;
        found
            .into_iter()
            .map(|raw| bson::from_document(raw).map_err(DocStoreError::from))
            .collect()
    }

    /// Partial update of the first match; `true` only if its contents changed.
    pub async fn update_document<T: Entity>(
        &self,
        filter: &Filter,
        update: &Update,
        collection: &str,
    ) -> Result<bool> {
        debug!(collection, "update_document");
        let outcome = self.backend.update(collection, filter, update, false).await?;
        Ok(outcome.modified > 0)
    }

    /// Partial update of every match; `true` if any document changed.
    pub async fn update_documents<T: Entity>(
        &self,
        filter: &Filter,
        update: &Update,
        collection: &str,
    ) -> Result<bool> {
        debug!(collection, "update_documents");
        let outcome = self.backend.update(collection, filter, update, true).await?;
        Ok(outcome.modified > 0)
    }

    pub async fn delete_document<T: Entity>(&self, filter: &Filter, collection: &str) -> Result<bool> {
        debug!(collection, "delete_document");
        Ok(self.backend.delete(collection, filter, false).await? > 0)
    }

    pub async fn delete_documents<T: Entity>(&self, filter: &Filter, collection: &str) -> Result<bool> {
        debug!(collection, "delete_documents");
        Ok(self.backend.delete(collection, filter, true).await? > 0)
    }

    /// Heterogeneous batch; `true` iff an update or replace matched an
    /// existing document (see [`BulkWriteSummary::any_matched`]).
    pub async fn bulk_write<T: Entity>(
        &self,
        operations: Vec<WriteOperation<T>>,
        options: BulkWriteOptions,
        collection: &str,
    ) -> Result<bool> {
        let summary = self.bulk_write_summary(operations, options, collection).await?;
        Ok(summary.any_matched())
    }

    /// Heterogeneous batch with the full per-kind counts.
    pub async fn bulk_write_summary<T: Entity>(
        &self,
        operations: Vec<WriteOperation<T>>,
        options: BulkWriteOptions,
        collection: &str,
    ) -> Result<BulkWriteSummary> {
        debug!(collection, count = operations.len(), "bulk_write");
        let raw = operations
            .into_iter()
            .map(|op| op.try_map(|doc| Ok(bson::to_document(&doc)?)))
            .collect::<Result<Vec<WriteOperation<Document>>>>()?;
        self.backend.bulk_write(collection, raw, &options).await
    }

    /// Full-document replace; `true` iff the filter matched a document.
    pub async fn replace_document<T: Entity>(
        &self,
        filter: &Filter,
        document: &T,
        collection: &str,
    ) -> Result<bool> {
        debug!(collection, id = document.id(), "replace_document");
        let outcome = self
            .backend
            .replace_one(collection, filter, bson::to_document(document)?)
            .await?;
        Ok(outcome.matched > 0)
    }

    pub async fn list_databases(&self) -> Result<Vec<DatabaseInfo>> {
        self.backend.list_databases().await
    }

    pub async fn drop_database(&self, database_name: &str) -> Result<bool> {
        warn!(database = database_name, "dropping database");
        self.backend.drop_database(database_name).await?;
        Ok(true)
    }

    pub async fn create_collection(&self, collection: &str, options: CollectionOptions) -> Result<bool> {
        self.backend.create_collection(collection, &options).await?;
        Ok(true)
    }

    pub async fn drop_collection(&self, collection: &str) -> Result<bool> {
        warn!(collection, "dropping collection");
        self.backend.drop_collection(collection).await?;
        Ok(true)
    }

    /// Returns the name of the created (or already existing) index.
    pub async fn create_index(&self, collection: &str, index: IndexSpec) -> Result<String> {
        let name = self.backend.create_index(collection, &index).await?;
        debug!(collection, index = %name, unique = index.unique, "index ensured");
        Ok(name)
    }
}

/// Typed handle to one collection of a [`DocumentStore`].
pub struct CollectionHandle<T> {
    store: DocumentStore,
    name: String,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for CollectionHandle<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            name: self.name.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> CollectionHandle<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn insert_one(&self, document: T) -> Result<T> {
        self.store.insert_document(document, &self.name).await
    }

    pub async fn insert_many(&self, documents: Vec<T>) -> Result<Vec<T>> {
        self.store.insert_documents(documents, &self.name).await
    }

    pub async fn find_all(&self) -> Result<Vec<T>> {
        self.store.get_all_documents(&self.name).await
    }

    pub async fn find(&self, filter: &Filter, options: QueryOptions) -> Result<Vec<T>> {
        self.store.get_documents(&self.name, filter, options).await
    }

    pub async fn find_single(&self, filter: &Filter) -> Result<Option<T>> {
        self.store.get_document(filter, &self.name, None).await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<T>> {
        self.find_single(&Filter::eq(ID_FIELD, id)).await
    }

    pub async fn count(&self, filter: &Filter) -> Result<u64> {
        self.store.count_documents::<T>(&self.name, filter).await
    }

    pub async fn update_one(&self, filter: &Filter, update: &Update) -> Result<bool> {
        self.store.update_document::<T>(filter, update, &self.name).await
    }

    pub async fn update_many(&self, filter: &Filter, update: &Update) -> Result<bool> {
        self.store.update_documents::<T>(filter, update, &self.name).await
    }

    pub async fn replace_one(&self, filter: &Filter, document: &T) -> Result<bool> {
        self.store.replace_document(filter, document, &self.name).await
    }

    /// Replace the document sharing `document`'s identity.
    pub async fn replace_by_id(&self, document: &T) -> Result<bool> {
        self.replace_one(&Filter::eq(ID_FIELD, document.id()), document).await
    }

    pub async fn delete_one(&self, filter: &Filter) -> Result<bool> {
        self.store.delete_document::<T>(filter, &self.name).await
    }

    pub async fn delete_many(&self, filter: &Filter) -> Result<bool> {
        self.store.delete_documents::<T>(filter, &self.name).await
    }

    pub async fn bulk_write(&self, operations: Vec<WriteOperation<T>>, options: BulkWriteOptions) -> Result<bool> {
        self.store.bulk_write(operations, options, &self.name).await
    }

    pub async fn create_index(&self, index: IndexSpec) -> Result<String> {
        self.store.create_index(&self.name, index).await
    }
}
