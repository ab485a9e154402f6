//! Authentication Service
//!
//! Issues and validates HS256-signed access tokens.

use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Deserializer, Serialize};
use sk_config::JwtAuthSettings;

use crate::error::{PlatformError, Result};

/// Token issuance settings, loaded once at startup.
#[derive(Clone)]
pub struct AuthConfig {
    pub secret_key: String,
    pub issuer: String,
    pub audience: String,
    pub access_token_expiry_secs: i64,
}

impl AuthConfig {
    pub fn from_settings(settings: &JwtAuthSettings) -> Result<Self> {
        let access_token_expiry_secs = settings
            .expiration_minutes
            .checked_mul(60)
            .filter(|secs| *secs > 0)
            .ok_or_else(|| {
                PlatformError::configuration(format!(
                    "Token lifetime of {} minutes is out of range",
                    settings.expiration_minutes
                ))
            })?;

        Ok(Self {
            secret_key: settings.key.clone(),
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
            access_token_expiry_secs,
        })
    }
}

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user id)
    pub sub: String,

    pub email: String,

    /// Unique token id
    pub jti: String,

    /// Role names; a single string is accepted on decode
    #[serde(default, deserialize_with = "one_or_many")]
    pub role: Vec<String>,

    pub iss: String,

    pub aud: String,

    pub iat: i64,

    pub nbf: i64,

    pub exp: i64,
}

impl AccessTokenClaims {
    pub fn has_role(&self, role: &str) -> bool {
        self.role.iter().any(|r| r == role)
    }
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(role) => vec![role],
        OneOrMany::Many(roles) => roles,
    })
}

pub struct AuthService {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret_key.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret_key.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.validate_nbf = true;

        Self {
            config,
            encoding_key,
            decoding_key,
            validation,
        }
    }

    /// Access token lifetime in seconds.
    pub fn expires_in_secs(&self) -> i64 {
        self.config.access_token_expiry_secs
    }

    /// Sign a token for an already-authenticated identity.
    pub fn issue_token(&self, email: &str, subject_id: &str, roles: &[String]) -> Result<String> {
        let now = Utc::now().timestamp();
        let exp = now
            .checked_add(self.config.access_token_expiry_secs)
            .ok_or_else(|| PlatformError::internal("Token expiry overflows the timestamp range"))?;
        let claims = AccessTokenClaims {
            sub: subject_id.to_string(),
            email: email.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            role: roles.to_vec(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            iat: now,
            nbf: now,
            exp,
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &AccessTokenClaims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| PlatformError::internal(format!("Failed to sign token: {}", e)))
    }

    /// Verify signature, issuer, audience and expiry.
    pub fn validate_token(&self, token: &str) -> Result<AccessTokenClaims> {
        decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => PlatformError::TokenExpired,
                _ => PlatformError::invalid_token(e.to_string()),
            })
    }
}

/// Token from an `Authorization: Bearer <token>` header value.
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}
