//! API Middleware
//!
//! Bearer token authentication for Axum handlers.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::error::PlatformError;
use crate::service::{AuthService, AuthContext};

/// Shared services, installed as a request extension
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
}

/// Extractor for authenticated requests
///
/// Rejects with 401 before the handler body runs. No repository is consulted.
pub struct Authenticated(pub AuthContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| PlatformError::unauthorized("Missing Authorization header").into_response())?;

        let token = crate::service::extract_bearer_token(auth_header)
            .ok_or_else(|| PlatformError::unauthorized("Invalid Authorization header format").into_response())?;

        let app_state = parts
            .extensions
            .get::<AppState>()
            .ok_or_else(|| PlatformError::internal("AppState not found").into_response())?;

        let claims = app_state
            .auth_service
            .validate_token(token)
            .map_err(|e| e.into_response())?;

        Ok(Authenticated(AuthContext::from_claims(&claims)))
    }
}
