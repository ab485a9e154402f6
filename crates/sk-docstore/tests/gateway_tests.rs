//! Document Store Gateway Tests
//!
//! Exercises the typed gateway against the in-memory backend:
//! - Insert / lookup round trips and identity uniqueness
//! - Single-result lookups and ambiguous matches
//! - Update, replace and delete result semantics
//! - Paging with sort, skip, limit and projection
//! - Bulk writes and administrative operations

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use sk_docstore::{
    BulkWriteOptions, CollectionOptions, DocStoreError, DocumentStore, Entity, Filter, IndexSpec,
    MemoryBackend, Projection, QueryOptions, Sort, Update, WriteOperation, ID_FIELD,
};

const SHOPS: &str = "Shop";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Shop {
    #[serde(rename = "_id")]
    shop_id: String,
    name: String,
    owner_id: String,
    rank: i32,
}

impl Entity for Shop {
    fn id(&self) -> &str {
        &self.shop_id
    }
}

fn shop(id: &str, owner: &str, rank: i32) -> Shop {
    Shop {
        shop_id: id.to_string(),
        name: format!("Shop {}", id),
        owner_id: owner.to_string(),
        rank,
    }
}

fn memory_store() -> DocumentStore {
    DocumentStore::new(Arc::new(MemoryBackend::new("storekeep_test")))
}

// ============================================================================
// Insert / lookup
// ============================================================================

#[tokio::test]
async fn test_insert_then_get_by_id_round_trips() {
    let store = memory_store();
    let inserted = store.insert_document(shop("s1", "u1", 3), SHOPS).await.unwrap();
    assert_eq!(inserted, shop("s1", "u1", 3));

    let fetched: Option<Shop> = store
        .get_document(&Filter::eq("_id", "s1"), SHOPS, None)
        .await
        .unwrap();
    assert_eq!(fetched, Some(shop("s1", "u1", 3)));
}

#[tokio::test]
async fn test_duplicate_identity_is_rejected() {
    let store = memory_store();
    store.insert_document(shop("s1", "u1", 1), SHOPS).await.unwrap();

    let err = store.insert_document(shop("s1", "u2", 2), SHOPS).await.unwrap_err();
    assert!(matches!(err, DocStoreError::OperationFailed { .. }));

    let count = store.count_documents::<Shop>(SHOPS, &Filter::Empty).await.unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_insert_documents_returns_input() {
    let store = memory_store();
    let shops = vec![shop("a", "u1", 1), shop("b", "u1", 2)];
    let returned = store.insert_documents(shops.clone(), SHOPS).await.unwrap();
    assert_eq!(returned, shops);

    let all: Vec<Shop> = store.get_all_documents(SHOPS).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_get_document_absent_is_none() {
    let store = memory_store();
    let fetched: Option<Shop> = store
        .get_document(&Filter::eq("_id", "missing"), SHOPS, None)
        .await
        .unwrap();
    assert!(fetched.is_none());
}

#[tokio::test]
async fn test_get_document_with_multiple_matches_is_ambiguous() {
    let store = memory_store();
    store
        .insert_documents(vec![shop("a", "u1", 1), shop("b", "u1", 2)], SHOPS)
        .await
        .unwrap();

    let err = store
        .get_document::<Shop>(&Filter::eq("ownerId", "u1"), SHOPS, None)
        .await
        .unwrap_err();
    match err {
        DocStoreError::AmbiguousResult { collection, matched } => {
            assert_eq!(collection, SHOPS);
            assert_eq!(matched, 2);
        }
        other => panic!("expected AmbiguousResult, got {:?}", other),
    }
}

#[tokio::test]
async fn test_get_document_with_projection() {
    let store = memory_store();
    store.insert_document(shop("s1", "u1", 9), SHOPS).await.unwrap();

    let fetched: Shop = store
        .get_document(&Filter::eq("_id", "s1"), SHOPS, Some(Projection::include(["name"])))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched.shop_id, "s1");
    assert_eq!(fetched.name, "Shop s1");
    assert_eq!(fetched.owner_id, "");
    assert_eq!(fetched.rank, 0);
}

// ============================================================================
// Paging
// ============================================================================

#[tokio::test]
async fn test_pagination_returns_ranked_window() {
    let store = memory_store();
    // Inserted out of order so native order differs from rank order.
    let shops: Vec<Shop> = [7, 2, 9, 4, 1, 10, 3, 8, 6, 5]
        .iter()
        .map(|rank| shop(&format!("s{}", rank), "u1", *rank))
        .collect();
    store.insert_documents(shops, SHOPS).await.unwrap();

    let page: Vec<Shop> = store
        .get_documents(
            SHOPS,
            &Filter::Empty,
            QueryOptions::new().skip(3).limit(4).sort(Sort::ascending("rank")),
        )
        .await
        .unwrap();

    let ranks: Vec<i32> = page.iter().map(|s| s.rank).collect();
    assert_eq!(ranks, vec![4, 5, 6, 7]);
}

#[tokio::test]
async fn test_filter_applies_before_skip_and_limit() {
    let store = memory_store();
    for rank in 1..=6 {
        let owner = if rank % 2 == 0 { "even" } else { "odd" };
        store.insert_document(shop(&format!("s{}", rank), owner, rank), SHOPS).await.unwrap();
    }

    let page: Vec<Shop> = store
        .get_documents(
            SHOPS,
            &Filter::eq("ownerId", "even"),
            QueryOptions::new().sort(Sort::descending("rank")).skip(1),
        )
        .await
        .unwrap();

    let ranks: Vec<i32> = page.iter().map(|s| s.rank).collect();
    assert_eq!(ranks, vec![4, 2]);
}

#[tokio::test]
async fn test_range_filters_and_count() {
    let store = memory_store();
    for rank in 1..=10 {
        store.insert_document(shop(&format!("s{}", rank), "u1", rank), SHOPS).await.unwrap();
    }

    let filter = Filter::gte("rank", 3).and(Filter::lt("rank", 7));
    assert_eq!(store.count_documents::<Shop>(SHOPS, &filter).await.unwrap(), 4);

    let filter = Filter::eq("rank", 1).or(Filter::eq("rank", 10));
    assert_eq!(store.count_documents::<Shop>(SHOPS, &filter).await.unwrap(), 2);
}

// ============================================================================
// Update / replace / delete
// ============================================================================

#[tokio::test]
async fn test_update_document_reports_content_change_only() {
    let store = memory_store();
    store.insert_document(shop("s1", "u1", 1), SHOPS).await.unwrap();
    let filter = Filter::eq("_id", "s1");

    let unchanged = store
        .update_document::<Shop>(&filter, &Update::new().set("rank", 1), SHOPS)
        .await
        .unwrap();
    assert!(!unchanged);

    let changed = store
        .update_document::<Shop>(&filter, &Update::new().set("rank", 2), SHOPS)
        .await
        .unwrap();
    assert!(changed);

    let fetched: Shop = store.get_document(&filter, SHOPS, None).await.unwrap().unwrap();
    assert_eq!(fetched.rank, 2);
}

#[tokio::test]
async fn test_update_documents_touches_every_match() {
    let store = memory_store();
    store
        .insert_documents(vec![shop("a", "u1", 1), shop("b", "u1", 2), shop("c", "u2", 3)], SHOPS)
        .await
        .unwrap();

    let changed = store
        .update_documents::<Shop>(&Filter::eq("ownerId", "u1"), &Update::new().inc("rank", 10), SHOPS)
        .await
        .unwrap();
    assert!(changed);

    let boosted = store
        .count_documents::<Shop>(SHOPS, &Filter::gt("rank", 10))
        .await
        .unwrap();
    assert_eq!(boosted, 2);
}

#[tokio::test]
async fn test_empty_update_is_rejected() {
    let store = memory_store();
    store.insert_document(shop("s1", "u1", 1), SHOPS).await.unwrap();

    let err = store
        .update_document::<Shop>(&Filter::Empty, &Update::new(), SHOPS)
        .await
        .unwrap_err();
    assert!(matches!(err, DocStoreError::OperationFailed { .. }));
}

#[tokio::test]
async fn test_replace_document_reports_match() {
    let store = memory_store();
    store.insert_document(shop("s1", "u1", 1), SHOPS).await.unwrap();

    let mut replacement = shop("s1", "u1", 1);
    // Same content still counts as matched.
    assert!(store
        .replace_document(&Filter::eq("_id", "s1"), &replacement, SHOPS)
        .await
        .unwrap());

    replacement.name = "Renamed".to_string();
    assert!(store
        .replace_document(&Filter::eq("_id", "s1"), &replacement, SHOPS)
        .await
        .unwrap());

    let missing = shop("nope", "u1", 1);
    assert!(!store
        .replace_document(&Filter::eq("_id", "nope"), &missing, SHOPS)
        .await
        .unwrap());

    let fetched: Shop = store.get_document(&Filter::eq("_id", "s1"), SHOPS, None).await.unwrap().unwrap();
    assert_eq!(fetched.name, "Renamed");
}

#[tokio::test]
async fn test_delete_document_and_documents() {
    let store = memory_store();
    store
        .insert_documents(vec![shop("a", "u1", 1), shop("b", "u1", 2), shop("c", "u2", 3)], SHOPS)
        .await
        .unwrap();

    assert!(store.delete_document::<Shop>(&Filter::eq("ownerId", "u1"), SHOPS).await.unwrap());
    assert_eq!(store.count_documents::<Shop>(SHOPS, &Filter::Empty).await.unwrap(), 2);

    assert!(store.delete_documents::<Shop>(&Filter::Empty, SHOPS).await.unwrap());
    assert!(!store.delete_documents::<Shop>(&Filter::Empty, SHOPS).await.unwrap());
}

// ============================================================================
// Bulk writes
// ============================================================================

#[tokio::test]
async fn test_bulk_write_mixed_batch() {
    let store = memory_store();
    store.insert_document(shop("s1", "u1", 1), SHOPS).await.unwrap();
    store.insert_document(shop("s3", "u1", 3), SHOPS).await.unwrap();

    let operations = vec![
        WriteOperation::InsertOne(shop("s4", "u2", 4)),
        WriteOperation::UpdateOne {
            filter: Filter::eq("_id", "s1"),
            update: Update::new().set("rank", 2),
        },
        WriteOperation::DeleteOne(Filter::eq("_id", "s3")),
        WriteOperation::ReplaceOne {
            filter: Filter::eq("_id", "s4"),
            replacement: shop("s4", "u2", 40),
        },
    ];

    let summary = store
        .bulk_write_summary(operations, BulkWriteOptions::default(), SHOPS)
        .await
        .unwrap();
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.matched, 2);
    assert_eq!(summary.modified, 2);
    assert_eq!(summary.deleted, 1);

    let ranks: Vec<i32> = store
        .get_documents::<Shop>(SHOPS, &Filter::Empty, QueryOptions::new().sort(Sort::ascending("rank")))
        .await
        .unwrap()
        .iter()
        .map(|s| s.rank)
        .collect();
    assert_eq!(ranks, vec![2, 40]);
}

#[tokio::test]
async fn test_bulk_write_insert_only_reports_false() {
    let store = memory_store();
    let operations = vec![
        WriteOperation::InsertOne(shop("a", "u1", 1)),
        WriteOperation::InsertOne(shop("b", "u1", 2)),
    ];

    let matched = store
        .bulk_write(operations, BulkWriteOptions::default(), SHOPS)
        .await
        .unwrap();
    assert!(!matched);
    assert_eq!(store.count_documents::<Shop>(SHOPS, &Filter::Empty).await.unwrap(), 2);
}

#[tokio::test]
async fn test_bulk_write_ordered_stops_at_first_error() {
    let store = memory_store();
    let operations = vec![
        WriteOperation::InsertOne(shop("a", "u1", 1)),
        WriteOperation::InsertOne(shop("a", "u1", 1)),
        WriteOperation::InsertOne(shop("b", "u1", 2)),
    ];

    let err = store
        .bulk_write(operations, BulkWriteOptions::default(), SHOPS)
        .await
        .unwrap_err();
    assert!(matches!(err, DocStoreError::OperationFailed { .. }));
    assert_eq!(store.count_documents::<Shop>(SHOPS, &Filter::Empty).await.unwrap(), 1);
}

#[tokio::test]
async fn test_bulk_write_unordered_continues_past_error() {
    let store = memory_store();
    let operations = vec![
        WriteOperation::InsertOne(shop("a", "u1", 1)),
        WriteOperation::InsertOne(shop("a", "u1", 1)),
        WriteOperation::InsertOne(shop("b", "u1", 2)),
    ];

    let result = store.bulk_write(operations, BulkWriteOptions::unordered(), SHOPS).await;
    assert!(result.is_err());
    assert_eq!(store.count_documents::<Shop>(SHOPS, &Filter::Empty).await.unwrap(), 2);
}

// ============================================================================
// Administration
// ============================================================================

#[tokio::test]
async fn test_unique_index_enforced_on_insert_and_update() {
    let store = memory_store();
    let handle = store.collection::<Shop>(SHOPS);
    let name = handle.create_index(IndexSpec::ascending("name").unique()).await.unwrap();
    assert_eq!(name, "name_1");

    handle.insert_one(shop("a", "u1", 1)).await.unwrap();
    let mut clash = shop("b", "u1", 2);
    clash.name = "Shop a".to_string();
    assert!(handle.insert_one(clash).await.is_err());

    handle.insert_one(shop("c", "u1", 3)).await.unwrap();
    let err = handle
        .update_one(&Filter::eq("_id", "c"), &Update::new().set("name", "Shop a"))
        .await
        .unwrap_err();
    assert!(matches!(err, DocStoreError::OperationFailed { .. }));
}

#[tokio::test]
async fn test_unique_index_creation_fails_on_existing_duplicates() {
    let store = memory_store();
    let handle = store.collection::<Shop>(SHOPS);
    handle.insert_one(shop("a", "u1", 1)).await.unwrap();
    handle.insert_one(shop("b", "u1", 2)).await.unwrap();

    let result = handle.create_index(IndexSpec::ascending("ownerId").unique()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_with_database_isolates_data_and_lists_databases() {
    let store = memory_store();
    store.insert_document(shop("a", "u1", 1), SHOPS).await.unwrap();

    let other = store.with_database("storekeep_other");
    assert_eq!(other.database_name(), "storekeep_other");
    assert_eq!(store.database_name(), "storekeep_test");
    assert_eq!(other.count_documents::<Shop>(SHOPS, &Filter::Empty).await.unwrap(), 0);

    other.insert_document(shop("b", "u1", 1), SHOPS).await.unwrap();
    let names: Vec<String> = store
        .list_databases()
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.name)
        .collect();
    assert_eq!(names, vec!["storekeep_other".to_string(), "storekeep_test".to_string()]);

    assert!(store.drop_database("storekeep_other").await.unwrap());
    assert_eq!(other.count_documents::<Shop>(SHOPS, &Filter::Empty).await.unwrap(), 0);
    assert_eq!(store.count_documents::<Shop>(SHOPS, &Filter::Empty).await.unwrap(), 1);
}

#[tokio::test]
async fn test_writes_matching_nothing_create_nothing() {
    let store = memory_store();
    let other = store.with_database("storekeep_untouched");

    let filter = Filter::eq(ID_FIELD, "ghost");
    assert!(!other.update_document::<Shop>(&filter, &Update::new().set("rank", 1), SHOPS).await.unwrap());
    assert!(!other.update_documents::<Shop>(&filter, &Update::new().set("rank", 1), SHOPS).await.unwrap());
    assert!(!other.replace_document(&filter, &shop("ghost", "u1", 1), SHOPS).await.unwrap());
    assert!(!other.delete_document::<Shop>(&filter, SHOPS).await.unwrap());
    let ops = vec![WriteOperation::UpdateOne { filter: filter.clone(), update: Update::new().set("rank", 2) }];
    assert!(!other.bulk_write::<Shop>(ops, BulkWriteOptions::default(), SHOPS).await.unwrap());
    assert!(other.drop_collection(SHOPS).await.unwrap());

    assert!(store.list_databases().await.unwrap().is_empty());
    assert!(other.create_collection(SHOPS, CollectionOptions::default()).await.unwrap());
}

#[tokio::test]
async fn test_create_and_drop_collection() {
    let store = memory_store();
    assert!(store.create_collection("Audit", CollectionOptions::default()).await.unwrap());
    assert!(store.create_collection("Audit", CollectionOptions::default()).await.is_err());

    store.insert_document(shop("a", "u1", 1), "Audit").await.unwrap();
    assert!(store.drop_collection("Audit").await.unwrap());
    assert_eq!(store.count_documents::<Shop>("Audit", &Filter::Empty).await.unwrap(), 0);
}

#[tokio::test]
async fn test_collection_handle_delegates() {
    let store = memory_store();
    let handle = store.collection::<Shop>(SHOPS);
    assert_eq!(handle.name(), SHOPS);

    handle.insert_many(vec![shop("a", "u1", 1), shop("b", "u2", 2)]).await.unwrap();
    assert_eq!(handle.count(&Filter::Empty).await.unwrap(), 2);
    assert_eq!(handle.find_all().await.unwrap().len(), 2);

    let found = handle.find_single(&Filter::eq("ownerId", "u2")).await.unwrap();
    assert_eq!(found.map(|s| s.shop_id), Some("b".to_string()));

    assert!(handle.delete_one(&Filter::eq("_id", "a")).await.unwrap());
    assert_eq!(handle.count(&Filter::Empty).await.unwrap(), 1);
}

#[tokio::test]
async fn test_collection_handle_addresses_by_identity() {
    let store = memory_store();
    let handle = store.collection::<Shop>(SHOPS);
    handle.insert_many(vec![shop("a", "u1", 1), shop("b", "u1", 2)]).await.unwrap();

    assert_eq!(handle.find_by_id("b").await.unwrap(), Some(shop("b", "u1", 2)));
    assert_eq!(handle.find_by_id("zzz").await.unwrap(), None);

    let renamed = Shop { name: "Renamed".to_string(), ..shop("a", "u1", 1) };
    assert!(handle.replace_by_id(&renamed).await.unwrap());
    assert_eq!(handle.find_by_id("a").await.unwrap(), Some(renamed));
    assert!(!handle.replace_by_id(&shop("zzz", "u1", 0)).await.unwrap());
    assert_eq!(handle.count(&Filter::Empty).await.unwrap(), 2);
}
