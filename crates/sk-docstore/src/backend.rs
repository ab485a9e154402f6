//! Backend seam
//!
//! Object-safe operations over raw BSON documents. The typed
//! [`DocumentStore`](crate::DocumentStore) gateway serializes entities and
//! delegates here.

use std::sync::Arc;

use async_trait::async_trait;
use bson::Document;

use crate::error::Result;
use crate::query::{Filter, QueryOptions, SortOrder, Update};
use crate::write::{BulkWriteOptions, BulkWriteSummary, WriteOperation};

/// Matched / modified counts reported by update and replace operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

/// Entry returned by `list_databases`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseInfo {
    pub name: String,
    pub size_on_disk: u64,
    pub empty: bool,
}

/// Options for explicit collection creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionOptions {
    pub capped: bool,
    pub size_bytes: Option<u64>,
    pub max_documents: Option<u64>,
}

/// Index definition for `create_index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub keys: Vec<(String, SortOrder)>,
    pub unique: bool,
    pub name: Option<String>,
}

impl IndexSpec {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            keys: vec![(field.into(), SortOrder::Ascending)],
            unique: false,
            name: None,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            keys: vec![(field.into(), SortOrder::Descending)],
            unique: false,
            name: None,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Explicit name, or the driver convention `field_1_other_-1`.
    pub fn index_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.keys
                .iter()
                .map(|(field, order)| match order {
                    SortOrder::Ascending => format!("{}_1", field),
                    SortOrder::Descending => format!("{}_-1", field),
                })
                .collect::<Vec<_>>()
                .join("_")
        })
    }
}

/// Raw document database operations bound to one database.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Name of the database this backend is bound to.
    fn database_name(&self) -> &str;

    /// A backend for another database on the same client.
    fn with_database(&self, database_name: &str) -> Arc<dyn DocumentBackend>;

    async fn insert_one(&self, collection: &str, document: Document) -> Result<()>;

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<()>;

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &QueryOptions,
    ) -> Result<Vec<Document>>;

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64>;

    async fn update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        many: bool,
    ) -> Result<UpdateOutcome>;

    async fn delete(&self, collection: &str, filter: &Filter, many: bool) -> Result<u64>;

    async fn replace_one(
        &self,
        collection: &str,
        filter: &Filter,
        replacement: Document,
    ) -> Result<UpdateOutcome>;

    async fn bulk_write(
        &self,
        collection: &str,
        operations: Vec<WriteOperation<Document>>,
        options: &BulkWriteOptions,
    ) -> Result<BulkWriteSummary>;

    async fn list_databases(&self) -> Result<Vec<DatabaseInfo>>;

    async fn drop_database(&self, database_name: &str) -> Result<()>;

    async fn create_collection(&self, collection: &str, options: &CollectionOptions) -> Result<()>;

    async fn drop_collection(&self, collection: &str) -> Result<()>;

    /// Returns the name of the created index.
    async fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_name_follows_driver_convention() {
        let spec = IndexSpec {
            keys: vec![
                ("ownerId".to_string(), SortOrder::Ascending),
                ("name".to_string(), SortOrder::Descending),
            ],
            unique: false,
            name: None,
        };
        assert_eq!(spec.index_name(), "ownerId_1_name_-1");
        assert_eq!(IndexSpec::ascending("email").with_name("email_unique").index_name(), "email_unique");
    }
}
