//! storekeep Server
//!
//! REST APIs for stores and token issuance:
//! - GET /GetStores (Admin), POST /CreateStore, GET /GetMyStores, PUT /UpdateStore/{storeId}
//! - POST /GetAuthToken, POST /SignUp, GET /Me
//! - GET /health, Swagger UI at /swagger-ui
//!
//! Configuration comes from the TOML file named by `SK_CONFIG` plus `SK_*`
//! environment overrides (see `sk-config`). `RUST_LOG` overrides the
//! configured log level.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sk_config::{AppConfig, BackendKind, LoggingSettings};
use sk_docstore::{DocumentBackend, DocumentStore, MemoryBackend, MongoBackend};
use sk_platform::api::{app_router, AppState, StoresState, UsersState};
use sk_platform::repository::{StoreRepository, UserRepository};
use sk_platform::service::{Argon2Config, AuthConfig, AuthService, LocalIdentityProvider, PasswordService};

fn init_logging(settings: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));

    if settings.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn connect_backend(config: &AppConfig) -> Result<Arc<dyn DocumentBackend>> {
    let database = &config.database;
    match database.backend {
        BackendKind::Mongo => {
            info!("Connecting to MongoDB: {}", database.database_name);
            let backend = MongoBackend::connect(&database.connection_string, &database.database_name)
                .await
                .context("failed to create MongoDB client")?;
            match backend.ping().await {
                Ok(()) => info!("MongoDB reachable"),
                Err(e) if e.is_unavailable() => {
                    warn!(error = %e, "MongoDB unreachable; requests will fail until it is reachable");
                }
                Err(e) => return Err(e).context("MongoDB rejected the ping command"),
            }
            Ok(Arc::new(backend))
        }
        BackendKind::Memory => {
            warn!(database = %database.database_name, "Using in-memory document store; data is not persisted");
            Ok(Arc::new(MemoryBackend::new(database.database_name.clone())))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    init_logging(&config.logging);

    info!("Starting storekeep server");

    let docs = DocumentStore::new(connect_backend(&config).await?);

    // Initialize repositories
    let store_repo = Arc::new(StoreRepository::new(&docs));
    let user_repo = Arc::new(UserRepository::new(&docs));
    if let Err(e) = store_repo.ensure_indexes().await {
        warn!("Store index creation failed: {}", e);
    }
    if let Err(e) = user_repo.ensure_indexes().await {
        warn!("User index creation failed: {}", e);
    }
    info!("Repositories initialized");

    // Initialize auth
    let auth_service = Arc::new(AuthService::new(AuthConfig::from_settings(&config.jwt)?));
    let password_service = Arc::new(PasswordService::new(Argon2Config::default())?);
    let identity = Arc::new(LocalIdentityProvider::new(password_service.clone()));
    info!("Auth services initialized");

    let app_state = AppState {
        auth_service: auth_service.clone(),
    };
    let stores_state = StoresState { store_repo };
    let users_state = UsersState {
        user_repo,
        identity,
        password_service,
        auth_service,
    };

    let app = app_router(app_state, stores_state, users_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));

    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("storekeep server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received...");
}
