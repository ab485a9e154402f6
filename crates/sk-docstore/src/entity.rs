//! Entity bound for typed collections

use serde::{de::DeserializeOwned, Serialize};

/// Field every backend keys document identity on.
pub const ID_FIELD: &str = "_id";

/// A serializable document with a string identity.
///
/// Implementations must serialize [`Entity::id`] under [`ID_FIELD`]
/// (typically `#[serde(rename = "_id")]`); the identity field is not
/// configurable per entity.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static {
    fn id(&self) -> &str;
}
