//! Domain Models
//!
//! Documents persisted in the `Store` and `User` collections.

pub mod store;
pub mod user;

pub use store::Store;
pub use user::User;
