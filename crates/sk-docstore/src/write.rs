//! Bulk write models

use bson::Document;

use crate::error::Result;
use crate::query::{Filter, Update};

/// One operation of a heterogeneous bulk write.
///
/// `D` is the document type: an entity for typed callers, a raw BSON
/// document once it reaches a backend.
#[derive(Debug, Clone)]
pub enum WriteOperation<D> {
    InsertOne(D),
    UpdateOne { filter: Filter, update: Update },
    UpdateMany { filter: Filter, update: Update },
    ReplaceOne { filter: Filter, replacement: D },
    DeleteOne(Filter),
    DeleteMany(Filter),
}

impl<D> WriteOperation<D> {
    /// Convert the carried documents, leaving filters and updates untouched.
    pub fn try_map<E, F>(self, mut f: F) -> Result<WriteOperation<E>>
    where
        F: FnMut(D) -> Result<E>,
    {
        Ok(match self {
            WriteOperation::InsertOne(doc) => WriteOperation::InsertOne(f(doc)?),
            WriteOperation::UpdateOne { filter, update } => WriteOperation::UpdateOne { filter, update },
            WriteOperation::UpdateMany { filter, update } => WriteOperation::UpdateMany { filter, update },
            WriteOperation::ReplaceOne { filter, replacement } => WriteOperation::ReplaceOne {
                filter,
                replacement: f(replacement)?,
            },
            WriteOperation::DeleteOne(filter) => WriteOperation::DeleteOne(filter),
            WriteOperation::DeleteMany(filter) => WriteOperation::DeleteMany(filter),
        })
    }
}

impl WriteOperation<Document> {
    pub fn kind(&self) -> &'static str {
        match self {
            WriteOperation::InsertOne(_) => "insertOne",
            WriteOperation::UpdateOne { .. } => "updateOne",
            WriteOperation::UpdateMany { .. } => "updateMany",
            WriteOperation::ReplaceOne { .. } => "replaceOne",
            WriteOperation::DeleteOne(_) => "deleteOne",
            WriteOperation::DeleteMany(_) => "deleteMany",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkWriteOptions {
    /// Stop at the first failing operation.
    pub ordered: bool,
}

impl Default for BulkWriteOptions {
    fn default() -> Self {
        Self { ordered: true }
    }
}

impl BulkWriteOptions {
    pub fn unordered() -> Self {
        Self { ordered: false }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkWriteSummary {
    pub inserted: u64,
    pub matched: u64,
    pub modified: u64,
    pub deleted: u64,
}

impl BulkWriteSummary {
    /// True when at least one update or replace matched an existing document.
    /// Insert-only and delete-only batches report `false`.
    pub fn any_matched(&self) -> bool {
        self.matched > 0
    }
}
