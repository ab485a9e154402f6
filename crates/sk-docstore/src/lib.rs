//! storekeep Document Store
//!
//! Generic, typed access to a document database:
//! - Filter / update / sort / projection builders that stay independent of the driver
//! - `DocumentBackend` seam with MongoDB and in-memory implementations
//! - `DocumentStore` gateway with document CRUD, bulk writes and administration
//! - `CollectionHandle<T>` for entity-specific repositories

pub mod backend;
pub mod entity;
pub mod error;
pub mod memory;
pub mod mongo;
pub mod query;
pub mod store;
pub mod write;

pub use backend::{CollectionOptions, DatabaseInfo, DocumentBackend, IndexSpec, UpdateOutcome};
pub use entity::{Entity, ID_FIELD};
pub use error::{DocStoreError, Result};
pub use memory::MemoryBackend;
pub use mongo::MongoBackend;
pub use query::{Filter, Projection, QueryOptions, Sort, SortOrder, Update};
pub use store::{CollectionHandle, DocumentStore};
pub use write::{BulkWriteOptions, BulkWriteSummary, WriteOperation};
