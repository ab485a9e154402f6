//! Authorization
//!
//! Caller context built from validated token claims, plus role checks.

use crate::domain::user::ADMIN_ROLE;
use crate::service::auth::AccessTokenClaims;

/// Identity of the caller for one request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
    pub email: String,
    pub roles: Vec<String>,
    pub token_id: String,
}

impl AuthContext {
    pub fn from_claims(claims: &AccessTokenClaims) -> Self {
        Self {
            user_id: claims.sub.clone(),
            email: claims.email.clone(),
            roles: claims.role.clone(),
            token_id: claims.jti.clone(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }
}

/// Guards called by handlers before touching any repository.
pub mod checks {
    use tracing::warn;

    use super::AuthContext;
    use crate::domain::user::ADMIN_ROLE;
    use crate::error::{PlatformError, Result};

    pub fn require_role(ctx: &AuthContext, role: &str) -> Result<()> {
        if ctx.has_role(role) {
            return Ok(());
        }
        warn!(user_id = %ctx.user_id, required = role, "Authorization denied");
        Err(PlatformError::forbidden(format!("Role '{}' required", role)))
    }

    pub fn require_admin(ctx: &AuthContext) -> Result<()> {
        require_role(ctx, ADMIN_ROLE)
    }

    /// Owner of the resource, or an admin.
    pub fn require_owner_or_admin(ctx: &AuthContext, owner_id: &str) -> Result<()> {
        if ctx.user_id == owner_id || ctx.is_admin() {
            return Ok(());
        }
        warn!(user_id = %ctx.user_id, owner_id, "Authorization denied: not the owner");
        Err(PlatformError::forbidden("Only the owner or an administrator may modify this resource"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlatformError;

    fn ctx(user_id: &str, roles: &[&str]) -> AuthContext {
        AuthContext {
            user_id: user_id.to_string(),
            email: format!("{}@example.com", user_id),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            token_id: "jti".to_string(),
        }
    }

    #[test]
    fn test_require_admin() {
        assert!(checks::require_admin(&ctx("u1", &["Admin"])).is_ok());
        assert!(matches!(
            checks::require_admin(&ctx("u1", &["Seller"])),
            Err(PlatformError::Forbidden { .. })
        ));
        // Role names are case-sensitive
        assert!(checks::require_admin(&ctx("u1", &["admin"])).is_err());
    }

    #[test]
    fn test_require_owner_or_admin() {
        assert!(checks::require_owner_or_admin(&ctx("u1", &[]), "u1").is_ok());
        assert!(checks::require_owner_or_admin(&ctx("u2", &["Admin"]), "u1").is_ok());
        assert!(checks::require_owner_or_admin(&ctx("u2", &[]), "u1").is_err());
    }
}
