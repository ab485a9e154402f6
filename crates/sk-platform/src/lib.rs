//! storekeep Platform
//!
//! - Store and User documents with typed repositories
//! - HS256 access token issuance and validation
//! - Argon2id password hashing behind an identity provider
//! - Axum handlers with role checks and an OpenAPI document

pub mod domain;
pub mod repository;
pub mod service;
pub mod api;
pub mod error;

pub use domain::*;
pub use error::PlatformError;
