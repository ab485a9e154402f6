//! OpenAPI Documentation

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// storekeep API OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "storekeep API",
        version = "1.0.0",
        description = "Store management and token issuance"
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "stores", description = "Store management"),
        (name = "auth", description = "Authentication and user profile"),
        (name = "monitoring", description = "Health")
    ),
    paths(
        super::stores::get_stores,
        super::stores::create_store,
        super::stores::get_my_stores,
        super::stores::update_store,
        super::users::get_auth_token,
        super::users::sign_up,
        super::users::me,
        super::health::health,
    ),
    components(schemas(
        super::common::ApiError,
        super::common::CreatedResponse,
        super::stores::CreateStoreRequest,
        super::stores::UpdateStoreRequest,
        super::stores::StoreResponse,
        super::users::GetAuthTokenRequest,
        super::users::AuthTokenResponse,
        super::users::SignUpRequest,
        super::users::UserResponse,
        super::health::HealthResponse,
    )),
    modifiers(&SecurityAddon)
)]
pub struct StorekeepApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
