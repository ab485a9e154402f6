//! In-memory backend
//!
//! Process-local document storage interpreting [`Filter`], [`Update`],
//! [`Sort`](crate::Sort) and [`Projection`] with document-database semantics.
//! Backends created through `with_database` share the same underlying
//! "server", so several named databases can coexist.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use bson::{oid::ObjectId, Bson, Document};
use parking_lot::RwLock;
use tracing::debug;

use crate::backend::{CollectionOptions, DatabaseInfo, DocumentBackend, IndexSpec, UpdateOutcome};
use crate::entity::ID_FIELD;
use crate::error::{DocStoreError, Result};
use crate::query::{Filter, Projection, QueryOptions, SortOrder, Update, UpdateOp};
use crate::write::{BulkWriteOptions, BulkWriteSummary, WriteOperation};

#[derive(Debug, Default)]
struct MemCollection {
    documents: Vec<Document>,
    /// Index name -> indexed fields, for unique indexes only.
    unique_indexes: BTreeMap<String, Vec<String>>,
    index_names: Vec<String>,
    options: CollectionOptions,
}

type Server = HashMap<String, HashMap<String, MemCollection>>;

/// In-memory [`DocumentBackend`].
#[derive(Clone)]
pub struct MemoryBackend {
    server: Arc<RwLock<Server>>,
    database: String,
}

impl MemoryBackend {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            server: Arc::new(RwLock::new(HashMap::new())),
            database: database.into(),
        }
    }

    fn write<R>(&self, f: impl FnOnce(&mut HashMap<String, MemCollection>) -> R) -> R {
        let mut server = self.server.write();
        let database = server.entry(self.database.clone()).or_default();
        f(database)
    }

    /// Run `f` against an existing collection only; nothing is created.
    fn write_existing<R>(&self, collection: &str, f: impl FnOnce(Option<&mut MemCollection>) -> R) -> R {
        let mut server = self.server.write();
        f(server.get_mut(&self.database).and_then(|db| db.get_mut(collection)))
    }

    fn read<R>(&self, collection: &str, f: impl FnOnce(Option<&MemCollection>) -> R) -> R {
        let server = self.server.read();
        f(server.get(&self.database).and_then(|db| db.get(collection)))
    }
}

#[async_trait]
impl DocumentBackend for MemoryBackend {
    fn database_name(&self) -> &str {
        &self.database
    }

    fn with_database(&self, database_name: &str) -> Arc<dyn DocumentBackend> {
        Arc::new(Self {
            server: Arc::clone(&self.server),
            database: database_name.to_string(),
        })
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<()> {
        debug!(database = %self.database, collection, "memory insert_one");
        self.write(|db| db.entry(collection.to_string()).or_default().insert(document))
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<()> {
        debug!(database = %self.database, collection, count = documents.len(), "memory insert_many");
        self.write(|db| {
            let coll = db.entry(collection.to_string()).or_default();
            for document in documents {
                coll.insert(document)?;
            }
            Ok(())
        })
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &QueryOptions,
    ) -> Result<Vec<Document>> {
        Ok(self.read(collection, |coll| {
            coll.map(|c| c.find(filter, options)).unwrap_or_default()
        }))
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64> {
        Ok(self.read(collection, |coll| {
            coll.map(|c| c.documents.iter().filter(|d| matches(filter, d)).count() as u64)
                .unwrap_or(0)
        }))
    }

    async fn update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        many: bool,
    ) -> Result<UpdateOutcome> {
        self.write_existing(collection, |coll| match coll {
            Some(c) => c.update(filter, update, many),
            None => Ok(UpdateOutcome::default()),
        })
    }

    async fn delete(&self, collection: &str, filter: &Filter, many: bool) -> Result<u64> {
        Ok(self.write_existing(collection, |coll| coll.map(|c| c.delete(filter, many)).unwrap_or(0)))
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: &Filter,
        replacement: Document,
    ) -> Result<UpdateOutcome> {
        self.write_existing(collection, |coll| match coll {
            Some(c) => c.replace_one(filter, replacement),
            None => Ok(UpdateOutcome::default()),
        })
    }

    async fn bulk_write(
        &self,
        collection: &str,
        operations: Vec<WriteOperation<Document>>,
        options: &BulkWriteOptions,
    ) -> Result<BulkWriteSummary> {
        let mut server = self.server.write();
        let created_database = !server.contains_key(&self.database);
        let db = server.entry(self.database.clone()).or_default();
        let created_collection = !db.contains_key(collection);

        let result = {
            let coll = db.entry(collection.to_string()).or_default();
            let mut summary = BulkWriteSummary::default();
            let mut first_error = None;

            for operation in operations {
                let kind = operation.kind();
                let result = match operation {
                    WriteOperation::InsertOne(document) => {
                        coll.insert(document).map(|_| summary.inserted += 1)
                    }
                    WriteOperation::UpdateOne { filter, update } => coll
                        .update(&filter, &update, false)
                        .map(|o| accumulate(&mut summary, o)),
                    WriteOperation::UpdateMany { filter, update } => coll
                        .update(&filter, &update, true)
                        .map(|o| accumulate(&mut summary, o)),
                    WriteOperation::ReplaceOne { filter, replacement } => coll
                        .replace_one(&filter, replacement)
                        .map(|o| accumulate(&mut summary, o)),
                    WriteOperation::DeleteOne(filter) => {
                        summary.deleted += coll.delete(&filter, false);
                        Ok(())
                    }
                    WriteOperation::DeleteMany(filter) => {
                        summary.deleted += coll.delete(&filter, true);
                        Ok(())
                    }
                };

                if let Err(e) = result {
                    debug!(collection, operation = kind, error = %e, "bulk write operation failed");
                    first_error.get_or_insert(e);
                    if options.ordered {
                        break;
                    }
                }
            }

            match first_error {
                Some(e) => Err(e),
                None => Ok(summary),
            }
        };

        // A batch that inserted nothing leaves no trace of a new collection.
        if created_collection && db.get(collection).map_or(false, |c| c.documents.is_empty()) {
            db.remove(collection);
        }
        if created_database && db.is_empty() {
            server.remove(&self.database);
        }
        result
    }

    async fn list_databases(&self) -> Result<Vec<DatabaseInfo>> {
        let server = self.server.read();
        let mut databases: Vec<DatabaseInfo> = server
            .iter()
            .map(|(name, collections)| {
                let size_on_disk = collections
                    .values()
                    .flat_map(|c| c.documents.iter())
                    .map(|d| bson::to_vec(d).map(|bytes| bytes.len() as u64).unwrap_or(0))
                    .sum();
                DatabaseInfo {
                    name: name.clone(),
                    size_on_disk,
                    empty: collections.values().all(|c| c.documents.is_empty()),
                }
            })
            .collect();
        databases.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(databases)
    }

    async fn drop_database(&self, database_name: &str) -> Result<()> {
        self.server.write().remove(database_name);
        Ok(())
    }

    async fn create_collection(&self, collection: &str, options: &CollectionOptions) -> Result<()> {
        self.write(|db| {
            if db.contains_key(collection) {
                return Err(DocStoreError::operation_failed(format!(
                    "Collection {}.{} already exists",
                    self.database, collection
                )));
            }
            db.insert(
                collection.to_string(),
                MemCollection {
                    options: options.clone(),
                    ..Default::default()
                },
            );
            Ok(())
        })
    }

    async fn drop_collection(&self, collection: &str) -> Result<()> {
        let mut server = self.server.write();
        if let Some(db) = server.get_mut(&self.database) {
            db.remove(collection);
        }
        Ok(())
    }

    async fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<String> {
        self.write(|db| db.entry(collection.to_string()).or_default().create_index(index))
    }
}

fn accumulate(summary: &mut BulkWriteSummary, outcome: UpdateOutcome) {
    summary.matched += outcome.matched;
    summary.modified += outcome.modified;
}

impl MemCollection {
    fn insert(&mut self, mut document: Document) -> Result<()> {
        if !document.contains_key(ID_FIELD) {
            document.insert(ID_FIELD, ObjectId::new());
        }
        self.check_unique(&document, None)?;
        self.documents.push(document);

        if self.options.capped {
            if let Some(max) = self.options.max_documents {
                let excess = self.documents.len().saturating_sub(max as usize);
                self.documents.drain(..excess);
            }
        }
        Ok(())
    }

    fn find(&self, filter: &Filter, options: &QueryOptions) -> Vec<Document> {
        let mut matched: Vec<&Document> = self.documents.iter().filter(|d| matches(filter, d)).collect();

        if let Some(sort) = &options.sort {
            matched.sort_by(|a, b| {
                for (field, order) in sort.keys() {
                    let ordering = compare_values(lookup(a, field), lookup(b, field));
                    let ordering = match order {
                        SortOrder::Ascending => ordering,
                        SortOrder::Descending => ordering.reverse(),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        let limit = options.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        matched
            .into_iter()
            .skip(options.skip as usize)
            .take(limit)
            .map(|d| match &options.projection {
                Some(projection) => project(d, projection),
                None => d.clone(),
            })
            .collect()
    }

    fn update(&mut self, filter: &Filter, update: &Update, many: bool) -> Result<UpdateOutcome> {
        if update.is_empty() {
            return Err(DocStoreError::operation_failed("Update document must contain at least one operator"));
        }

        let positions: Vec<usize> = self
            .documents
            .iter()
            .enumerate()
            .filter(|(_, d)| matches(filter, d))
            .map(|(i, _)| i)
            .take(if many { usize::MAX } else { 1 })
            .collect();

        let mut outcome = UpdateOutcome::default();
        for position in positions {
            outcome.matched += 1;
            let mut updated = self.documents[position].clone();
            apply_update(&mut updated, update)?;
            if updated != self.documents[position] {
                self.check_unique(&updated, Some(position))?;
                self.documents[position] = updated;
                outcome.modified += 1;
            }
        }
        Ok(outcome)
    }

    fn replace_one(&mut self, filter: &Filter, mut replacement: Document) -> Result<UpdateOutcome> {
        let Some(position) = self.documents.iter().position(|d| matches(filter, d)) else {
            return Ok(UpdateOutcome::default());
        };

        let existing_id = self.documents[position].get(ID_FIELD).cloned();
        match (replacement.get(ID_FIELD), &existing_id) {
            (Some(new_id), Some(old_id)) if !values_equal(new_id, old_id) => {
                return Err(DocStoreError::operation_failed(
                    "After applying the update, the (immutable) field '_id' was found to have been altered",
                ));
            }
            (None, Some(old_id)) => {
                replacement.insert(ID_FIELD, old_id.clone());
            }
            _ => {}
        }

        let modified = replacement != self.documents[position];
        if modified {
            self.check_unique(&replacement, Some(position))?;
            self.documents[position] = replacement;
        }
        Ok(UpdateOutcome {
            matched: 1,
            modified: u64::from(modified),
        })
    }

    fn delete(&mut self, filter: &Filter, many: bool) -> u64 {
        if many {
            let before = self.documents.len();
            self.documents.retain(|d| !matches(filter, d));
            (before - self.documents.len()) as u64
        } else if let Some(position) = self.documents.iter().position(|d| matches(filter, d)) {
            self.documents.remove(position);
            1
        } else {
            0
        }
    }

    fn create_index(&mut self, index: &IndexSpec) -> Result<String> {
        let name = index.index_name();
        if self.index_names.contains(&name) {
            return Ok(name);
        }

        if index.unique {
            let fields: Vec<String> = index.keys.iter().map(|(f, _)| f.clone()).collect();
            for (i, a) in self.documents.iter().enumerate() {
                for b in self.documents.iter().skip(i + 1) {
                    if same_key(a, b, &fields) {
                        return Err(DocStoreError::operation_failed(format!(
                            "Cannot create unique index {}: duplicate key {:?}",
                            name,
                            key_of(a, &fields)
                        )));
                    }
                }
            }
            self.unique_indexes.insert(name.clone(), fields);
        }

        self.index_names.push(name.clone());
        Ok(name)
    }

    /// Reject `document` if it collides with another document on `_id` or
    /// any unique index. `skip` is the position of the document being
    /// rewritten, if any.
    fn check_unique(&self, document: &Document, skip: Option<usize>) -> Result<()> {
        let id_key = vec![ID_FIELD.to_string()];
        let constraints = std::iter::once((ID_FIELD, &id_key))
            .chain(self.unique_indexes.iter().map(|(n, f)| (n.as_str(), f)));

        for (name, fields) in constraints {
            let collision = self
                .documents
                .iter()
                .enumerate()
                .any(|(i, existing)| Some(i) != skip && same_key(existing, document, fields));
            if collision {
                return Err(DocStoreError::operation_failed(format!(
                    "E11000 duplicate key error index: {} dup key: {:?}",
                    name,
                    key_of(document, fields)
                )));
            }
        }
        Ok(())
    }
}

fn key_of(document: &Document, fields: &[String]) -> Vec<Bson> {
    fields
        .iter()
        .map(|f| lookup(document, f).cloned().unwrap_or(Bson::Null))
        .collect()
}

fn same_key(a: &Document, b: &Document, fields: &[String]) -> bool {
    fields.iter().all(|f| {
        let left = lookup(a, f).unwrap_or(&Bson::Null);
        let right = lookup(b, f).unwrap_or(&Bson::Null);
        values_equal(left, right)
    })
}

/// Resolve a dotted field path.
fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = document.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Bson::Document(inner) => inner.get(part)?,
            _ => return None,
        };
    }
    Some(current)
}

fn matches(filter: &Filter, document: &Document) -> bool {
    match filter {
        Filter::Empty => true,
        Filter::Eq(field, value) => field_equals(document, field, value),
        Filter::Ne(field, value) => !field_equals(document, field, value),
        Filter::Gt(field, value) => field_compares(document, field, value, |o| o == Ordering::Greater),
        Filter::Gte(field, value) => field_compares(document, field, value, |o| o != Ordering::Less),
        Filter::Lt(field, value) => field_compares(document, field, value, |o| o == Ordering::Less),
        Filter::Lte(field, value) => field_compares(document, field, value, |o| o != Ordering::Greater),
        Filter::In(field, values) => values.iter().any(|v| field_equals(document, field, v)),
        Filter::Exists(field, exists) => lookup(document, field).is_some() == *exists,
        Filter::And(filters) => filters.iter().all(|f| matches(f, document)),
        Filter::Or(filters) => filters.iter().any(|f| matches(f, document)),
    }
}

/// Equality with array-element matching; a missing field equals `null`.
fn field_equals(document: &Document, field: &str, target: &Bson) -> bool {
    match lookup(document, field) {
        None => matches!(target, Bson::Null),
        Some(value) => match value {
            Bson::Array(items) => values_equal(value, target) || items.iter().any(|i| values_equal(i, target)),
            _ => values_equal(value, target),
        },
    }
}

fn field_compares(
    document: &Document,
    field: &str,
    target: &Bson,
    accept: impl Fn(Ordering) -> bool,
) -> bool {
    let check = |value: &Bson| compare_same_class(value, target).map(&accept).unwrap_or(false);
    match lookup(document, field) {
        None => false,
        Some(Bson::Array(items)) => items.iter().any(check),
        Some(value) => check(value),
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

fn values_equal(a: &Bson, b: &Bson) -> bool {
    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Ordering for values of the same type class (numbers, strings, ...).
/// Values of different classes never satisfy a range predicate.
fn compare_same_class(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.bytes().cmp(&y.bytes())),
        (Bson::Null, Bson::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn type_rank(value: Option<&Bson>) -> u8 {
    match value {
        None | Some(Bson::Null) => 0,
        Some(Bson::Int32(_)) | Some(Bson::Int64(_)) | Some(Bson::Double(_)) => 1,
        Some(Bson::String(_)) | Some(Bson::Symbol(_)) => 2,
        Some(Bson::Document(_)) => 3,
        Some(Bson::Array(_)) => 4,
        Some(Bson::Binary(_)) => 5,
        Some(Bson::ObjectId(_)) => 6,
        Some(Bson::Boolean(_)) => 7,
        Some(Bson::DateTime(_)) => 8,
        Some(Bson::Timestamp(_)) => 9,
        Some(_) => 10,
    }
}

/// Total order used for sorting; missing fields sort with `null`, first.
fn compare_values(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Some(x), Some(y)) => compare_same_class(x, y).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}

fn project(document: &Document, projection: &Projection) -> Document {
    match projection {
        Projection::Include(fields) => {
            let mut projected = Document::new();
            if let Some(id) = document.get(ID_FIELD) {
                projected.insert(ID_FIELD, id.clone());
            }
            for field in fields {
                if let Some(value) = lookup(document, field) {
                    set_path(&mut projected, field, value.clone());
                }
            }
            projected
        }
        Projection::Exclude(fields) => {
            let mut projected = document.clone();
            for field in fields {
                unset_path(&mut projected, field);
            }
            projected
        }
    }
}

fn apply_update(document: &mut Document, update: &Update) -> Result<()> {
    for op in update.ops() {
        match op {
            UpdateOp::Set(field, value) => {
                if field == ID_FIELD && document.get(ID_FIELD).map_or(false, |id| !values_equal(id, value)) {
                    return Err(DocStoreError::operation_failed(
                        "Performing an update on the path '_id' would modify the immutable field '_id'",
                    ));
                }
                set_path(document, field, value.clone());
            }
            UpdateOp::Unset(field) => {
                if field == ID_FIELD {
                    return Err(DocStoreError::operation_failed(
                        "Performing an update on the path '_id' would modify the immutable field '_id'",
                    ));
                }
                unset_path(document, field);
            }
            UpdateOp::Inc(field, amount) => {
                let incremented = match (lookup(document, field), amount) {
                    (None, amount) if as_f64(amount).is_some() => amount.clone(),
                    (Some(Bson::Int32(a)), Bson::Int32(b)) => Bson::Int32(a.wrapping_add(*b)),
                    (Some(Bson::Int64(a)), Bson::Int64(b)) => Bson::Int64(a.wrapping_add(*b)),
                    (Some(Bson::Int32(a)), Bson::Int64(b)) => Bson::Int64(i64::from(*a).wrapping_add(*b)),
                    (Some(Bson::Int64(a)), Bson::Int32(b)) => Bson::Int64(a.wrapping_add(i64::from(*b))),
                    (Some(current), amount) => match (as_f64(current), as_f64(amount)) {
                        (Some(x), Some(y)) => Bson::Double(x + y),
                        _ => {
                            return Err(DocStoreError::operation_failed(format!(
                                "Cannot apply $inc to a non-numeric value at '{}'",
                                field
                            )))
                        }
                    },
                    (None, _) => {
                        return Err(DocStoreError::operation_failed(format!(
                            "Cannot increment '{}' with a non-numeric amount",
                            field
                        )))
                    }
                };
                set_path(document, field, incremented);
            }
        }
    }
    Ok(())
}

fn set_path(document: &mut Document, path: &str, value: Bson) {
    match path.split_once('.') {
        None => {
            document.insert(path, value);
        }
        Some((head, rest)) => {
            if !matches!(document.get(head), Some(Bson::Document(_))) {
                document.insert(head, Document::new());
            }
            if let Some(Bson::Document(inner)) = document.get_mut(head) {
                set_path(inner, rest, value);
            }
        }
    }
}

fn unset_path(document: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            document.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Bson::Document(inner)) = document.get_mut(head) {
                unset_path(inner, rest);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_lookup_dotted_path() {
        let document = doc! { "address": { "city": "Leeds" } };
        assert_eq!(lookup(&document, "address.city"), Some(&Bson::String("Leeds".into())));
        assert!(lookup(&document, "address.zip").is_none());
    }

    #[test]
    fn test_eq_matches_array_elements() {
        let document = doc! { "roles": ["Admin", "Owner"] };
        assert!(matches(&Filter::eq("roles", "Admin"), &document));
        assert!(!matches(&Filter::eq("roles", "Guest"), &document));
    }

    #[test]
    fn test_numeric_comparison_across_types() {
        let document = doc! { "rank": 5_i64 };
        assert!(matches(&Filter::gt("rank", 4), &document));
        assert!(matches(&Filter::eq("rank", 5.0), &document));
        assert!(!matches(&Filter::lt("rank", "9"), &document));
    }

    #[test]
    fn test_missing_field_equals_null() {
        let document = doc! { "_id": "a" };
        assert!(matches(&Filter::eq("avatarId", Bson::Null), &document));
        assert!(matches(&Filter::exists("avatarId", false), &document));
    }

    #[test]
    fn test_apply_update_rejects_id_change() {
        let mut document = doc! { "_id": "a", "n": 1 };
        let err = apply_update(&mut document, &Update::new().set("_id", "b")).unwrap_err();
        assert!(matches!(err, DocStoreError::OperationFailed { .. }));
    }

    #[test]
    fn test_apply_update_inc_and_nested_set() {
        let mut document = doc! { "_id": "a", "n": 1 };
        apply_update(&mut document, &Update::new().inc("n", 2).set("meta.flag", true)).unwrap();
        assert_eq!(document, doc! { "_id": "a", "n": 3, "meta": { "flag": true } });
    }

    #[test]
    fn test_sort_places_missing_first() {
        let mut coll = MemCollection::default();
        coll.insert(doc! { "_id": "b", "k": 2 }).unwrap();
        coll.insert(doc! { "_id": "a" }).unwrap();
        coll.insert(doc! { "_id": "c", "k": 1 }).unwrap();

        let found = coll.find(&Filter::Empty, &QueryOptions::new().sort(crate::Sort::ascending("k")));
        let ids: Vec<&str> = found.iter().map(|d| d.get_str("_id").unwrap()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_capped_collection_drops_oldest() {
        let mut coll = MemCollection {
            options: CollectionOptions {
                capped: true,
                size_bytes: Some(4096),
                max_documents: Some(2),
            },
            ..Default::default()
        };
        for id in ["a", "b", "c"] {
            coll.insert(doc! { "_id": id }).unwrap();
        }
        let ids: Vec<&str> = coll.documents.iter().map(|d| d.get_str("_id").unwrap()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }
}
