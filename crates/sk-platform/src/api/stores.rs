//! Stores API
//!
//! - GET /GetStores - every store (Admin only)
//! - POST /CreateStore - create a store owned by the caller
//! - GET /GetMyStores - stores owned by the caller
//! - PUT /UpdateStore/{storeId} - update name, description and avatar

use axum::{
    routing::{get, post, put},
    extract::{Path, State},
    http::StatusCode,
    Json, Router,
};
use utoipa::ToSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::domain::Store;
use crate::repository::StoreRepository;
use crate::error::PlatformError;
use crate::api::middleware::Authenticated;

/// Create store request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateStoreRequest {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub avatar_id: String,
}

/// Update store request; omitted fields keep their current value
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStoreRequest {
    pub name: Option<String>,

    pub description: Option<String>,

    pub avatar_id: Option<String>,
}

/// Store response DTO
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoreResponse {
    pub store_id: String,
    pub name: String,
    pub description: String,
    pub owner_id: String,
    pub avatar_id: String,
}

impl From<Store> for StoreResponse {
    fn from(s: Store) -> Self {
        Self {
            store_id: s.store_id,
            name: s.name,
            description: s.description,
            owner_id: s.owner_id,
            avatar_id: s.avatar_id,
        }
    }
}

/// Stores service state
#[derive(Clone)]
pub struct StoresState {
    pub store_repo: Arc<StoreRepository>,
}

fn require_name(name: &str) -> Result<String, PlatformError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PlatformError::validation("Store name must not be empty"));
    }
    Ok(name.to_string())
}

/// List every store
///
/// Global listing, not scoped to the caller. Requires the Admin role.
#[utoipa::path(
    get,
    path = "/GetStores",
    tag = "stores",
    responses(
        (status = 200, description = "All stores", body = Vec<StoreResponse>),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_stores(
    State(state): State<StoresState>,
    auth: Authenticated,
) -> Result<Json<Vec<StoreResponse>>, PlatformError> {
    crate::service::checks::require_admin(&auth.0)?;

    let stores = state.store_repo.get_stores().await?;
    Ok(Json(stores.into_iter().map(StoreResponse::from).collect()))
}

/// Create a store owned by the caller
#[utoipa::path(
    post,
    path = "/CreateStore",
    tag = "stores",
    request_body = CreateStoreRequest,
    responses(
        (status = 201, description = "Store created", body = StoreResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_store(
    State(state): State<StoresState>,
    auth: Authenticated,
    Json(req): Json<CreateStoreRequest>,
) -> Result<(StatusCode, Json<StoreResponse>), PlatformError> {
    let name = require_name(&req.name)?;

    let store = Store::new(name, &auth.0.user_id)
        .with_description(req.description)
        .with_avatar(req.avatar_id);
    let store = state.store_repo.create_store(store).await?;

    info!(store_id = %store.store_id, owner_id = %store.owner_id, "Store created");
    Ok((StatusCode::CREATED, Json(store.into())))
}

/// Stores owned by the caller
#[utoipa::path(
    get,
    path = "/GetMyStores",
    tag = "stores",
    responses(
        (status = 200, description = "Caller's stores", body = Vec<StoreResponse>),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_my_stores(
    State(state): State<StoresState>,
    auth: Authenticated,
) -> Result<Json<Vec<StoreResponse>>, PlatformError> {
    let stores = state.store_repo.get_store_by_user(&auth.0.user_id).await?;
    Ok(Json(stores.into_iter().map(StoreResponse::from).collect()))
}

/// Update a store
///
/// Owner and store id cannot be changed here.
#[utoipa::path(
    put,
    path = "/UpdateStore/{storeId}",
    tag = "stores",
    params(
        ("storeId" = String, Path, description = "Store ID")
    ),
    request_body = UpdateStoreRequest,
    responses(
        (status = 200, description = "Store updated", body = StoreResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Store not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_store(
    State(state): State<StoresState>,
    auth: Authenticated,
    Path(store_id): Path<String>,
    Json(req): Json<UpdateStoreRequest>,
) -> Result<Json<StoreResponse>, PlatformError> {
    let mut store = state.store_repo.get_store_by_id(&store_id).await?
        .ok_or_else(|| PlatformError::not_found("Store", &store_id))?;

    crate::service::checks::require_owner_or_admin(&auth.0, &store.owner_id)?;

    if let Some(name) = req.name {
        store.name = require_name(&name)?;
    }
    if let Some(description) = req.description {
        store.description = description;
    }
    if let Some(avatar_id) = req.avatar_id {
        store.avatar_id = avatar_id;
    }

    // Deleted between lookup and replace
    let store = state.store_repo.update_store(store).await?
        .ok_or_else(|| PlatformError::not_found("Store", &store_id))?;

    info!(store_id = %store.store_id, user_id = %auth.0.user_id, "Store updated");
    Ok(Json(store.into()))
}

/// Create the stores router
pub fn stores_router(state: StoresState) -> Router {
    Router::new()
        .route("/GetStores", get(get_stores))
        .route("/CreateStore", post(create_store))
        .route("/GetMyStores", get(get_my_stores))
        .route("/UpdateStore/:storeId", put(update_store))
        .with_state(state)
}
