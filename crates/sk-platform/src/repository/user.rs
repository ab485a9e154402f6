//! User Repository

use sk_docstore::{CollectionHandle, DocumentStore, Filter, IndexSpec};
use tracing::info;

use crate::domain::User;
use crate::error::Result;

pub const USER_COLLECTION: &str = "User";

pub struct UserRepository {
    collection: CollectionHandle<User>,
}

impl UserRepository {
    pub fn new(store: &DocumentStore) -> Self {
        Self {
            collection: store.collection(USER_COLLECTION),
        }
    }

    pub async fn create_user(&self, user: User) -> Result<User> {
        Ok(self.collection.insert_one(user).await?)
    }

    /// Fails with an ambiguous-result error if the email is not unique.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.collection.find_single(&Filter::eq("email", email)).await?)
    }

    pub async fn get_user_by_id(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.collection.find_by_id(user_id).await?)
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        self.collection
            .create_index(IndexSpec::ascending("email").unique().with_name("idx_email_unique"))
            .await?;
        info!(collection = USER_COLLECTION, "Ensured user indexes");
        Ok(())
    }
}
