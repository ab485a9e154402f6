//! Store Repository

use sk_docstore::{CollectionHandle, DocumentStore, Filter, IndexSpec, QueryOptions};
use tracing::info;

use crate::domain::Store;
use crate::error::Result;

pub const STORE_COLLECTION: &str = "Store";

pub struct StoreRepository {
    collection: CollectionHandle<Store>,
}

impl StoreRepository {
    pub fn new(store: &DocumentStore) -> Self {
        Self {
            collection: store.collection(STORE_COLLECTION),
        }
    }

    pub async fn create_store(&self, store: Store) -> Result<Store> {
        Ok(self.collection.insert_one(store).await?)
    }

    /// Every store in the collection, unscoped. Callers gate access.
    pub async fn get_stores(&self) -> Result<Vec<Store>> {
        Ok(self.collection.find_all().await?)
    }

    pub async fn get_store_by_user(&self, owner_id: &str) -> Result<Vec<Store>> {
        Ok(self
            .collection
            .find(&Filter::eq("ownerId", owner_id), QueryOptions::default())
            .await?)
    }

    pub async fn get_store_by_id(&self, store_id: &str) -> Result<Option<Store>> {
        Ok(self.collection.find_by_id(store_id).await?)
    }

    /// Replace the stored document keyed on `store_id`.
    ///
    /// Returns the input when a document matched, `None` otherwise.
    pub async fn update_store(&self, store: Store) -> Result<Option<Store>> {
        let matched = self.collection.replace_by_id(&store).await?;
        Ok(matched.then_some(store))
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        self.collection
            .create_index(IndexSpec::ascending("ownerId").with_name("idx_owner"))
            .await?;
        info!(collection = STORE_COLLECTION, "Ensured store indexes");
        Ok(())
    }
}
