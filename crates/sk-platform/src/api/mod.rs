//! API Layer
//!
//! HTTP endpoints, bearer authentication and the OpenAPI document.

pub mod common;
pub mod health;
pub mod middleware;
pub mod openapi;
pub mod stores;
pub mod users;

use axum::{Extension, Router};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use common::*;
pub use health::health_router;
pub use middleware::{AppState, Authenticated};
pub use openapi::StorekeepApiDoc;
pub use stores::{StoresState, stores_router};
pub use users::{UsersState, users_router};

/// All routes plus Swagger UI, with `AppState` installed for `Authenticated`.
pub fn app_router(app_state: AppState, stores_state: StoresState, users_state: UsersState) -> Router {
    Router::new()
        .merge(stores_router(stores_state))
        .merge(users_router(users_state))
        .merge(health_router())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", StorekeepApiDoc::openapi()))
        .layer(Extension(app_state))
}
