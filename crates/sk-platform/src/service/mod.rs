//! Service Layer
//!
//! Authentication, authorization, password hashing and identity lookup.

pub mod auth;
pub mod authorization;
pub mod identity;
pub mod password;

pub use auth::{AuthService, AuthConfig, AccessTokenClaims, extract_bearer_token};
pub use authorization::{AuthContext, checks};
pub use identity::{IdentityProvider, LocalIdentityProvider};
pub use password::{PasswordService, Argon2Config, MIN_PASSWORD_LENGTH};
