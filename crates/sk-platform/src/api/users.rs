//! Users API
//!
//! - POST /GetAuthToken - exchange credentials for an access token
//! - POST /SignUp - register a user
//! - GET /Me - the caller's profile

use axum::{
    routing::{get, post},
    extract::State,
    http::StatusCode,
    Json, Router,
};
use utoipa::ToSchema;
use serde::{Deserialize, Serialize};
use sk_docstore::DocStoreError;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::User;
use crate::repository::UserRepository;
use crate::service::{AuthService, IdentityProvider, PasswordService};
use crate::error::PlatformError;
use crate::api::common::CreatedResponse;
use crate::api::middleware::Authenticated;

/// Token request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetAuthTokenRequest {
    /// User id or email address
    pub username: String,

    pub password: String,
}

/// Token response
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokenResponse {
    pub access_token: String,

    /// Always "Bearer"
    pub token_type: String,

    /// Lifetime in seconds
    pub expires_in: i64,
}

/// Sign-up request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub email: String,

    pub password: String,

    #[serde(default)]
    pub first_name: String,

    #[serde(default)]
    pub last_name: String,
}

/// Current user profile
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_id: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            user_id: u.user_id,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            avatar_id: u.avatar_id,
        }
    }
}

/// Users service state
#[derive(Clone)]
pub struct UsersState {
    pub user_repo: Arc<UserRepository>,
    pub identity: Arc<dyn IdentityProvider>,
    pub password_service: Arc<PasswordService>,
    pub auth_service: Arc<AuthService>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Exchange credentials for an access token
///
/// `username` is matched against the user id first, then the email.
/// Unknown users and wrong passwords are reported identically.
#[utoipa::path(
    post,
    path = "/GetAuthToken",
    tag = "auth",
    request_body = GetAuthTokenRequest,
    responses(
        (status = 200, description = "Token issued", body = AuthTokenResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn get_auth_token(
    State(state): State<UsersState>,
    Json(req): Json<GetAuthTokenRequest>,
) -> Result<Json<AuthTokenResponse>, PlatformError> {
    let username = req.username.trim();
    if username.is_empty() {
        return Err(PlatformError::InvalidCredentials);
    }

    let user = match state.user_repo.get_user_by_id(username).await? {
        Some(user) => Some(user),
        None => state.user_repo.get_user_by_email(&normalize_email(username)).await?,
    };

    let Some(user) = user else {
        state.identity.reject_unknown(&req.password).await?;
        warn!("Token request for unknown user");
        return Err(PlatformError::InvalidCredentials);
    };

    if !state.identity.verify_password(&user, &req.password).await? {
        warn!(user_id = %user.user_id, "Token request with wrong password");
        return Err(PlatformError::InvalidCredentials);
    }

    let roles = state.identity.roles_for(&user).await?;
    let access_token = state.auth_service.issue_token(&user.email, &user.user_id, &roles)?;

    info!(user_id = %user.user_id, "Access token issued");
    Ok(Json(AuthTokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.auth_service.expires_in_secs(),
    }))
}

/// Register a user
///
/// New users have no roles.
#[utoipa::path(
    post,
    path = "/SignUp",
    tag = "auth",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "User registered", body = CreatedResponse),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn sign_up(
    State(state): State<UsersState>,
    Json(req): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), PlatformError> {
    let email = normalize_email(&req.email);
    if !is_plausible_email(&email) {
        return Err(PlatformError::validation("A valid email address is required"));
    }
    state.password_service.validate_password(&req.password)?;

    if state.user_repo.get_user_by_email(&email).await?.is_some() {
        return Err(PlatformError::duplicate("User", "email", &email));
    }

    let passwords = Arc::clone(&state.password_service);
    let password = req.password;
    let hash = tokio::task::spawn_blocking(move || passwords.hash_password(&password))
        .await
        .map_err(|e| PlatformError::internal(format!("Password task failed: {}", e)))??;

    let user = User::new(email.clone(), req.first_name.trim(), req.last_name.trim()).with_password_hash(hash);
    // A concurrent registration can win between the check above and this insert.
    let user = state.user_repo.create_user(user).await.map_err(|e| match e {
        PlatformError::DocStore(DocStoreError::OperationFailed { message }) => {
            warn!(error = %message, "User insert rejected; treating as duplicate email");
            PlatformError::duplicate("User", "email", &email)
        }
        other => other,
    })?;

    info!(user_id = %user.user_id, "User registered");
    Ok((StatusCode::CREATED, Json(CreatedResponse::new(user.user_id))))
}

/// The caller's profile
#[utoipa::path(
    get,
    path = "/Me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "User no longer exists")
    ),
    security(("bearer_auth" = []))
)]
pub async fn me(
    State(state): State<UsersState>,
    auth: Authenticated,
) -> Result<Json<UserResponse>, PlatformError> {
    let user = state.user_repo.get_user_by_id(&auth.0.user_id).await?
        .ok_or_else(|| PlatformError::not_found("User", &auth.0.user_id))?;

    Ok(Json(user.into()))
}

/// Create the users router
pub fn users_router(state: UsersState) -> Router {
    Router::new()
        .route("/GetAuthToken", post(get_auth_token))
        .route("/SignUp", post(sign_up))
        .route("/Me", get(me))
        .with_state(state)
}
