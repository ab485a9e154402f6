//! storekeep Configuration
//!
//! Loaded once at startup: an optional TOML file (path from `SK_CONFIG`)
//! followed by environment overrides.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SK_CONFIG` | - | Path to a TOML configuration file |
//! | `SK_HOST` | `0.0.0.0` | HTTP bind address |
//! | `SK_PORT` | `8080` | HTTP port |
//! | `SK_DB_BACKEND` | `mongo` | `mongo` or `memory` |
//! | `SK_MONGO_URL` | `mongodb://localhost:27017` | MongoDB connection string |
//! | `SK_MONGO_DB` | `storekeep` | Database name |
//! | `SK_JWT_ISSUER` | `storekeep` | Token issuer |
//! | `SK_JWT_AUDIENCE` | `storekeep` | Token audience |
//! | `SK_JWT_KEY` | - | HMAC-SHA256 signing key (at least 32 bytes) |
//! | `SK_JWT_EXPIRATION_MINUTES` | `60` | Access token lifetime |
//! | `SK_LOG_LEVEL` | `info` | Default log level (`RUST_LOG` still wins) |
//! | `SK_LOG_JSON` | `false` | Emit JSON log lines |

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Minimum HMAC-SHA256 key length in bytes.
pub const MIN_SIGNING_KEY_BYTES: usize = 32;

/// Longest accepted access token lifetime (one year).
pub const MAX_TOKEN_EXPIRATION_MINUTES: i64 = 365 * 24 * 60;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidOverride { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Mongo,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerSettings {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Document store connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct DatabaseSettings {
    pub backend: BackendKind,
    pub connection_string: String,
    pub database_name: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::Mongo,
            connection_string: "mongodb://localhost:27017".to_string(),
            database_name: "storekeep".to_string(),
        }
    }
}

/// Token issuance settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtAuthSettings {
    pub issuer: String,
    pub audience: String,
    pub key: String,
    pub expiration_minutes: i64,
}

impl Default for JwtAuthSettings {
    fn default() -> Self {
        Self {
            issuer: "storekeep".to_string(),
            audience: "storekeep".to_string(),
            key: String::new(),
            expiration_minutes: 60,
        }
    }
}

impl fmt::Debug for JwtAuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtAuthSettings")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("key", &"<redacted>")
            .field("expiration_minutes", &self.expiration_minutes)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtAuthSettings,
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Parse a TOML document; missing sections and keys take defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config file");
        Self::from_toml_str(&content)
    }

    /// File named by `SK_CONFIG` (if any), then environment overrides, then validation.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var("SK_CONFIG") {
            Ok(path) if !path.is_empty() => Self::from_file(Path::new(&path))?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SK_*` overrides from `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = lookup("SK_HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("SK_PORT") {
            self.server.port = parse_override("SK_PORT", &v)?;
        }
        if let Some(v) = lookup("SK_DB_BACKEND") {
            self.database.backend = match v.to_lowercase().as_str() {
                "mongo" | "mongodb" => BackendKind::Mongo,
                "memory" => BackendKind::Memory,
                _ => {
                    return Err(ConfigError::InvalidOverride {
                        key: "SK_DB_BACKEND".to_string(),
                        value: v,
                    })
                }
            };
        }
        if let Some(v) = lookup("SK_MONGO_URL") {
            self.database.connection_string = v;
        }
        if let Some(v) = lookup("SK_MONGO_DB") {
            self.database.database_name = v;
        }
        if let Some(v) = lookup("SK_JWT_ISSUER") {
            self.jwt.issuer = v;
        }
        if let Some(v) = lookup("SK_JWT_AUDIENCE") {
            self.jwt.audience = v;
        }
        if let Some(v) = lookup("SK_JWT_KEY") {
            self.jwt.key = v;
        }
        if let Some(v) = lookup("SK_JWT_EXPIRATION_MINUTES") {
            self.jwt.expiration_minutes = parse_override("SK_JWT_EXPIRATION_MINUTES", &v)?;
        }
        if let Some(v) = lookup("SK_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = lookup("SK_LOG_JSON") {
            self.logging.json = matches!(v.to_lowercase().as_str(), "true" | "1" | "yes");
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".to_string()));
        }
        if self.database.database_name.trim().is_empty() {
            return Err(ConfigError::Invalid("database.database_name must not be empty".to_string()));
        }
        if self.database.backend == BackendKind::Mongo && self.database.connection_string.trim().is_empty() {
            return Err(ConfigError::Invalid("database.connection_string must not be empty".to_string()));
        }
        if self.jwt.issuer.trim().is_empty() || self.jwt.audience.trim().is_empty() {
            return Err(ConfigError::Invalid("jwt.issuer and jwt.audience must not be empty".to_string()));
        }
        if self.jwt.key.len() < MIN_SIGNING_KEY_BYTES {
            return Err(ConfigError::Invalid(format!(
                "jwt.key must be at least {} bytes",
                MIN_SIGNING_KEY_BYTES
            )));
        }
        if self.jwt.expiration_minutes <= 0 {
            return Err(ConfigError::Invalid("jwt.expiration_minutes must be positive".to_string()));
        }
        if self.jwt.expiration_minutes > MAX_TOKEN_EXPIRATION_MINUTES {
            return Err(ConfigError::Invalid(format!(
                "jwt.expiration_minutes must not exceed {}",
                MAX_TOKEN_EXPIRATION_MINUTES
            )));
        }
        Ok(())
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| ConfigError::InvalidOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}
