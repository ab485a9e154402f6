//! Store Entity

use serde::{Deserialize, Serialize};
use sk_docstore::Entity;

/// A store owned by one user.
///
/// `store_id` is assigned at creation and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    #[serde(rename = "_id")]
    pub store_id: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    /// References `User::user_id`
    pub owner_id: String,

    #[serde(default)]
    pub avatar_id: String,
}

impl Store {
    pub fn new(name: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            store_id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            owner_id: owner_id.into(),
            avatar_id: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_avatar(mut self, avatar_id: impl Into<String>) -> Self {
        self.avatar_id = avatar_id.into();
        self
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }
}

impl Entity for Store {
    fn id(&self) -> &str {
        &self.store_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_document_layout() {
        let store = Store::new("Corner Shop", "u1").with_description("Groceries");
        let doc = bson::to_document(&store).unwrap();

        assert_eq!(doc.get_str("_id").unwrap(), store.store_id);
        assert_eq!(doc.get_str("ownerId").unwrap(), "u1");
        assert_eq!(doc.get_str("avatarId").unwrap(), "");
        assert!(!doc.contains_key("storeId"));
    }

    #[test]
    fn test_new_stores_get_distinct_ids() {
        let a = Store::new("A", "u1");
        let b = Store::new("B", "u1");
        assert_ne!(a.store_id, b.store_id);
        assert!(a.is_owned_by("u1"));
        assert!(!a.is_owned_by("u2"));
    }
}
