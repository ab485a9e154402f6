//! Identity Provider
//!
//! Credential checks and role lookup for users.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::User;
use crate::error::{PlatformError, Result};
use crate::service::password::PasswordService;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify_password(&self, user: &User, password: &str) -> Result<bool>;

    /// Spend the work of a verification for a username that matched nobody.
    async fn reject_unknown(&self, password: &str) -> Result<()>;

    async fn roles_for(&self, user: &User) -> Result<Vec<String>>;
}

/// Reads the hash and roles stored on the user document.
pub struct LocalIdentityProvider {
    password_service: Arc<PasswordService>,
}

impl LocalIdentityProvider {
    pub fn new(password_service: Arc<PasswordService>) -> Self {
        Self { password_service }
    }

    /// Argon2 work runs off the async executor.
    async fn blocking<R: Send + 'static>(
        &self,
        f: impl FnOnce(&PasswordService) -> R + Send + 'static,
    ) -> Result<R> {
        let passwords = Arc::clone(&self.password_service);
        tokio::task::spawn_blocking(move || f(&passwords))
            .await
            .map_err(|e| PlatformError::internal(format!("Password task failed: {}", e)))
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn verify_password(&self, user: &User, password: &str) -> Result<bool> {
        let Some(hash) = user.password_hash.clone() else {
            self.reject_unknown(password).await?;
            return Ok(false);
        };

        let password = password.to_string();
        match self.blocking(move |p| p.verify_password(&password, &hash)).await? {
            Ok(valid) => Ok(valid),
            Err(e) => {
                warn!(user_id = %user.user_id, error = %e, "Stored password hash is unreadable");
                Ok(false)
            }
        }
    }

    async fn reject_unknown(&self, password: &str) -> Result<()> {
        let password = password.to_string();
        self.blocking(move |p| p.verify_decoy(&password)).await
    }

    async fn roles_for(&self, user: &User) -> Result<Vec<String>> {
        Ok(user.roles.clone())
    }
}
