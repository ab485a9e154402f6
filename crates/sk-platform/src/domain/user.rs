//! User Entity

use serde::{Deserialize, Serialize};
use sk_docstore::Entity;

/// Role that unlocks the global store listing.
pub const ADMIN_ROLE: &str = "Admin";

/// A registered user.
///
/// `password_hash` and `roles` belong to the identity provider and are
/// never exposed through the HTTP API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub user_id: String,

    pub email: String,

    #[serde(default)]
    pub first_name: String,

    #[serde(default)]
    pub last_name: String,

    #[serde(default)]
    pub avatar_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,

    #[serde(default)]
    pub roles: Vec<String>,
}

impl User {
    pub fn new(email: impl Into<String>, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            user_id: uuid::Uuid::new_v4().to_string(),
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            avatar_id: String::new(),
            password_hash: None,
            roles: Vec::new(),
        }
    }

    pub fn with_password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = Some(hash.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        let role = role.into();
        if !self.roles.contains(&role) {
            self.roles.push(role);
        }
        self
    }
}

impl Entity for User {
    fn id(&self) -> &str {
        &self.user_id
    }
}
