//! Repository Layer
//!
//! Typed accessors over the document store gateway.

pub mod store;
pub mod user;

pub use store::{StoreRepository, STORE_COLLECTION};
pub use user::{UserRepository, USER_COLLECTION};
