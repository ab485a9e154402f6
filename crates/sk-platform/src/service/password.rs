//! Password Service
//!
//! Argon2id hashing in PHC string format.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::error::{PlatformError, Result};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy)]
pub struct Argon2Config {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for Argon2Config {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

pub struct PasswordService {
    params: Params,
    /// Hash with the configured cost that no caller knows the input of.
    decoy_hash: String,
}

impl PasswordService {
    pub fn new(config: Argon2Config) -> Result<Self> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| PlatformError::configuration(format!("Invalid Argon2 parameters: {}", e)))?;
        let mut service = Self {
            params,
            decoy_hash: String::new(),
        };
        service.decoy_hash = service.hash_password(&uuid::Uuid::new_v4().to_string())?;
        Ok(service)
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn validate_password(&self, password: &str) -> Result<()> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(PlatformError::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }
        Ok(())
    }

    pub fn hash_password(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.hasher()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PlatformError::internal(format!("Password hashing failed: {}", e)))
    }

    /// Cost parameters are read from the stored hash.
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| PlatformError::internal(format!("Invalid password hash: {}", e)))?;
        Ok(self.hasher().verify_password(password.as_bytes(), &parsed).is_ok())
    }

    /// Pay the cost of one verification without a stored hash to check.
    ///
    /// Keeps rejections for unknown users as slow as wrong passwords.
    pub fn verify_decoy(&self, password: &str) {
        let _ = self.verify_password(password, &self.decoy_hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> PasswordService {
        PasswordService::new(Argon2Config {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let service = fast();
        let hash = service.hash_password("correct horse").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(service.verify_password("correct horse", &hash).unwrap());
        assert!(!service.verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let service = fast();
        assert_ne!(
            service.hash_password("same-password").unwrap(),
            service.hash_password("same-password").unwrap()
        );
    }

    #[test]
    fn test_decoy_uses_configured_cost() {
        let service = fast();
        let decoy = PasswordHash::new(&service.decoy_hash).unwrap();
        let params = Params::try_from(&decoy).unwrap();

        assert_eq!(decoy.algorithm.as_str(), "argon2id");
        assert_eq!(params.m_cost(), 1024);
        assert_eq!(params.t_cost(), 1);
        assert!(!service.verify_password("", &service.decoy_hash).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(fast().verify_password("anything", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_validate_password_length() {
        let service = fast();
        assert!(service.validate_password("short").is_err());
        assert!(service.validate_password("long enough").is_ok());
    }
}
