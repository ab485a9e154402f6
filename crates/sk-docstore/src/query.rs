//! Query Builders
//!
//! Driver-independent descriptions of filters, updates, sort orders and
//! projections. Repositories build these; backends interpret them.

use bson::{doc, Bson, Document};

/// Predicate over the documents of a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document.
    Empty,
    Eq(String, Bson),
    Ne(String, Bson),
    Gt(String, Bson),
    Gte(String, Bson),
    Lt(String, Bson),
    Lte(String, Bson),
    In(String, Vec<Bson>),
    Exists(String, bool),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn empty() -> Self {
        Self::Empty
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::Eq(field.into(), value.into())
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::Ne(field.into(), value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::Gt(field.into(), value.into())
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::Gte(field.into(), value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::Lt(field.into(), value.into())
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::Lte(field.into(), value.into())
    }

    pub fn is_in<V: Into<Bson>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self::In(field.into(), values.into_iter().map(Into::into).collect())
    }

    pub fn exists(field: impl Into<String>, exists: bool) -> Self {
        Self::Exists(field.into(), exists)
    }

    /// Conjunction; flattens nested `And`s and drops `Empty` operands.
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::Empty, f) | (f, Filter::Empty) => f,
            (Filter::And(mut left), Filter::And(right)) => {
                left.extend(right);
                Filter::And(left)
            }
            (Filter::And(mut left), f) => {
                left.push(f);
                Filter::And(left)
            }
            (f, Filter::And(mut right)) => {
                right.insert(0, f);
                Filter::And(right)
            }
            (a, b) => Filter::And(vec![a, b]),
        }
    }

    pub fn or(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::Or(mut left), Filter::Or(right)) => {
                left.extend(right);
                Filter::Or(left)
            }
            (Filter::Or(mut left), f) => {
                left.push(f);
                Filter::Or(left)
            }
            (a, b) => Filter::Or(vec![a, b]),
        }
    }

    /// Render as a MongoDB query document.
    pub fn to_document(&self) -> Document {
        match self {
            Filter::Empty => Document::new(),
            Filter::Eq(field, value) => doc! { field.as_str(): value.clone() },
            Filter::Ne(field, value) => doc! { field.as_str(): { "$ne": value.clone() } },
            Filter::Gt(field, value) => doc! { field.as_str(): { "$gt": value.clone() } },
            Filter::Gte(field, value) => doc! { field.as_str(): { "$gte": value.clone() } },
            Filter::Lt(field, value) => doc! { field.as_str(): { "$lt": value.clone() } },
            Filter::Lte(field, value) => doc! { field.as_str(): { "$lte": value.clone() } },
            Filter::In(field, values) => doc! { field.as_str(): { "$in": values.clone() } },
            Filter::Exists(field, exists) => doc! { field.as_str(): { "$exists": *exists } },
            Filter::And(filters) => doc! {
                "$and": filters.iter().map(|f| Bson::Document(f.to_document())).collect::<Vec<_>>()
            },
            Filter::Or(filters) => doc! {
                "$or": filters.iter().map(|f| Bson::Document(f.to_document())).collect::<Vec<_>>()
            },
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::Empty
    }
}

/// Single field modification within an [`Update`].
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    Set(String, Bson),
    Unset(String),
    Inc(String, Bson),
}

/// Partial update applied to matched documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    ops: Vec<UpdateOp>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.ops.push(UpdateOp::Set(field.into(), value.into()));
        self
    }

    pub fn unset(mut self, field: impl Into<String>) -> Self {
        self.ops.push(UpdateOp::Unset(field.into()));
        self
    }

    pub fn inc(mut self, field: impl Into<String>, amount: impl Into<Bson>) -> Self {
        self.ops.push(UpdateOp::Inc(field.into(), amount.into()));
        self
    }

    pub fn ops(&self) -> &[UpdateOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Render as a MongoDB update document (`$set` / `$unset` / `$inc`).
    pub fn to_document(&self) -> Document {
        let mut set = Document::new();
        let mut unset = Document::new();
        let mut inc = Document::new();
        for op in &self.ops {
            match op {
                UpdateOp::Set(field, value) => {
                    set.insert(field.as_str(), value.clone());
                }
                UpdateOp::Unset(field) => {
                    unset.insert(field.as_str(), "");
                }
                UpdateOp::Inc(field, value) => {
                    inc.insert(field.as_str(), value.clone());
                }
            }
        }

        let mut update = Document::new();
        if !set.is_empty() {
            update.insert("$set", set);
        }
        if !unset.is_empty() {
            update.insert("$unset", unset);
        }
        if !inc.is_empty() {
            update.insert("$inc", inc);
        }
        update
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn as_i32(self) -> i32 {
        match self {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        }
    }
}

/// Ordered list of sort keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sort {
    keys: Vec<(String, SortOrder)>,
}

impl Sort {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self::default().then_ascending(field)
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self::default().then_descending(field)
    }

    pub fn then_ascending(mut self, field: impl Into<String>) -> Self {
        self.keys.push((field.into(), SortOrder::Ascending));
        self
    }

    pub fn then_descending(mut self, field: impl Into<String>) -> Self {
        self.keys.push((field.into(), SortOrder::Descending));
        self
    }

    pub fn keys(&self) -> &[(String, SortOrder)] {
        &self.keys
    }

    pub fn to_document(&self) -> Document {
        let mut sort = Document::new();
        for (field, order) in &self.keys {
            sort.insert(field.as_str(), order.as_i32());
        }
        sort
    }
}

/// Selection of the fields returned for each matched document.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Only these fields (the identity field is always kept).
    Include(Vec<String>),
    /// Every field except these.
    Exclude(Vec<String>),
}

impl Projection {
    pub fn include<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self::Include(fields.into_iter().map(Into::into).collect())
    }

    pub fn exclude<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self::Exclude(fields.into_iter().map(Into::into).collect())
    }

    pub fn to_document(&self) -> Document {
        let mut projection = Document::new();
        match self {
            Projection::Include(fields) => {
                for field in fields {
                    projection.insert(field.as_str(), 1);
                }
            }
            Projection::Exclude(fields) => {
                for field in fields {
                    projection.insert(field.as_str(), 0);
                }
            }
        }
        projection
    }
}

/// Paging, ordering and projection for multi-document reads.
///
/// Applied in order: sort, skip, limit, projection. A `None` limit is unbounded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    pub skip: u64,
    pub limit: Option<u64>,
    pub sort: Option<Sort>,
    pub projection: Option<Projection>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eq_filter_document() {
        let filter = Filter::eq("ownerId", "u1");
        assert_eq!(filter.to_document(), doc! { "ownerId": "u1" });
    }

    #[test]
    fn test_and_flattens_and_skips_empty() {
        let filter = Filter::empty()
            .and(Filter::eq("a", 1))
            .and(Filter::gt("b", 2))
            .and(Filter::Empty);

        assert_eq!(
            filter,
            Filter::And(vec![Filter::eq("a", 1), Filter::gt("b", 2)])
        );
        assert_eq!(
            filter.to_document(),
            doc! { "$and": [ { "a": 1 }, { "b": { "$gt": 2 } } ] }
        );
    }

    #[test]
    fn test_in_filter_document() {
        let filter = Filter::is_in("_id", ["s1", "s2"]);
        assert_eq!(filter.to_document(), doc! { "_id": { "$in": ["s1", "s2"] } });
    }

    #[test]
    fn test_update_document_groups_operators() {
        let update = Update::new()
            .set("name", "Corner Shop")
            .unset("avatarId")
            .inc("visits", 1)
            .set("description", "Open late");

        assert_eq!(
            update.to_document(),
            doc! {
                "$set": { "name": "Corner Shop", "description": "Open late" },
                "$unset": { "avatarId": "" },
                "$inc": { "visits": 1 },
            }
        );
    }

    #[test]
    fn test_sort_and_projection_documents() {
        let sort = Sort::ascending("name").then_descending("_id");
        assert_eq!(sort.to_document(), doc! { "name": 1, "_id": -1 });

        let projection = Projection::include(["name", "ownerId"]);
        assert_eq!(projection.to_document(), doc! { "name": 1, "ownerId": 1 });
    }

    #[test]
    fn test_query_options_defaults_are_unbounded() {
        let options = QueryOptions::default();
        assert_eq!(options.skip, 0);
        assert!(options.limit.is_none());
        assert!(options.sort.is_none());
        assert!(options.projection.is_none());
    }
}
