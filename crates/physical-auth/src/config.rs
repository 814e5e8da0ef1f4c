//! Service configuration
//!
//! Settings are loaded from environment variables with defaults suitable for
//! local development. Key files and the provider client secret have no
//! sensible default; [`AuthConfig::validate`] reports them when missing.

use crate::error::{AuthError, AuthResult};
use crate::keys::{JwtAlgorithm, KeySource, LocalKeyProvider};
use physical_store::{MemoryTokenStore, RefreshTokenStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing required environment variable.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Complete configuration for the credential services.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Access token settings.
    pub tokens: TokenSettings,

    /// Local signing/verification key files.
    pub keys: KeySettings,

    /// Identity provider settings.
    pub federation: FederationSettings,

    /// Refresh-token store settings.
    pub store: StoreSettings,
}

/// Access token settings.
#[derive(Debug, Clone)]
pub struct TokenSettings {
    /// `iss` claim written into and required of access tokens
    pub issuer: String,

    /// `aud` claim written into and required of access tokens
    pub audience: String,

    /// Access token lifetime in seconds
    pub access_token_ttl_secs: i64,

    /// Signature algorithm
    pub algorithm: JwtAlgorithm,

    /// Clock skew tolerated when checking expiration, in seconds
    pub leeway_secs: u64,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            issuer: "https://physical.spencerhartland.com".to_string(),
            audience: "com.spencerhartland.Physical".to_string(),
            access_token_ttl_secs: 3600,
            algorithm: JwtAlgorithm::ES256,
            leeway_secs: 0,
        }
    }
}

/// Local key files for the service's own tokens.
#[derive(Debug, Clone)]
pub struct KeySettings {
    /// Key id written into the token header
    pub key_id: String,

    /// PEM private key (PKCS#8 for EC keys)
    pub private_key_file: Option<PathBuf>,

    /// PEM public key
    pub public_key_file: Option<PathBuf>,
}

impl Default for KeySettings {
    fn default() -> Self {
        Self {
            key_id: "physical-access-1".to_string(),
            private_key_file: None,
            public_key_file: None,
        }
    }
}

impl KeySettings {
    /// Build a file-backed key provider.
    pub fn provider(&self, algorithm: JwtAlgorithm) -> Result<LocalKeyProvider, ConfigError> {
        let private_key = self
            .private_key_file
            .clone()
            .ok_or_else(|| ConfigError::MissingEnvVar("PRIVATE_ACCESS_KEY_FILE".to_string()))?;
        let public_key = self
            .public_key_file
            .clone()
            .ok_or_else(|| ConfigError::MissingEnvVar("PUBLIC_ACCESS_KEY_FILE".to_string()))?;

        Ok(LocalKeyProvider::pair(
            algorithm,
            self.key_id.clone(),
            KeySource::File(private_key),
            KeySource::File(public_key),
        ))
    }
}

/// Identity provider settings.
#[derive(Debug, Clone)]
pub struct FederationSettings {
    /// This app's client id at the provider; required `aud` of assertions
    pub client_id: String,

    /// File holding the confidential client secret
    pub client_secret_file: Option<PathBuf>,

    /// Provider token endpoint used to validate grants
    pub token_url: String,

    /// Provider authorization endpoint
    pub authorization_url: String,

    /// Provider JWKS endpoint
    pub jwks_url: String,

    /// Required `iss` of assertions
    pub issuer: String,

    /// Assertion signature algorithm
    pub algorithm: JwtAlgorithm,

    /// Timeout for each provider call, in seconds
    pub timeout_secs: u64,

    /// Key set cache lifetime in seconds; 0 fetches on every verification
    pub jwks_cache_ttl_secs: u64,
}

impl Default for FederationSettings {
    fn default() -> Self {
        Self {
            client_id: "com.spencerhartland.Physical".to_string(),
            client_secret_file: None,
            token_url: "https://appleid.apple.com/auth/token".to_string(),
            authorization_url: "https://appleid.apple.com/auth/authorize".to_string(),
            jwks_url: "https://appleid.apple.com/auth/keys".to_string(),
            issuer: "https://appleid.apple.com".to_string(),
            algorithm: JwtAlgorithm::RS256,
            timeout_secs: 10,
            jwks_cache_ttl_secs: 0,
        }
    }
}

impl FederationSettings {
    /// Get the provider call timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get the key set cache lifetime as a Duration.
    pub fn jwks_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.jwks_cache_ttl_secs)
    }
}

/// Refresh-token store settings.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// Redis URL; the in-memory store is used when unset
    pub redis_url: Option<String>,

    /// Key prefix for store records
    pub prefix: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            prefix: "physical".to_string(),
        }
    }
}

impl StoreSettings {
    /// Open the configured refresh-token store.
    pub async fn open(&self) -> AuthResult<Arc<dyn RefreshTokenStore>> {
        match &self.redis_url {
            None => {
                tracing::warn!("REDIS_URL not set, refresh tokens are kept in memory");
                Ok(Arc::new(MemoryTokenStore::new()))
            }
            #[cfg(feature = "redis")]
            Some(url) => {
                let store = physical_store::RedisTokenStore::new(url, &self.prefix).await?;
                Ok(Arc::new(store))
            }
            #[cfg(not(feature = "redis"))]
            Some(_) => Err(AuthError::Configuration(
                "REDIS_URL is set but the `redis` feature is disabled".to_string(),
            )),
        }
    }
}

impl AuthConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `TOKEN_ISSUER`: access token issuer (default: https://physical.spencerhartland.com)
    /// - `TOKEN_AUDIENCE`: access token audience (default: com.spencerhartland.Physical)
    /// - `ACCESS_TOKEN_TTL_SECS`: access token lifetime (default: 3600)
    /// - `TOKEN_ALGORITHM`: access token algorithm (default: ES256)
    /// - `TOKEN_LEEWAY_SECS`: tolerated clock skew (default: 0)
    /// - `ACCESS_KEY_ID`: key id of the signing key (default: physical-access-1)
    /// - `PRIVATE_ACCESS_KEY_FILE`: signing key PEM file
    /// - `PUBLIC_ACCESS_KEY_FILE`: verification key PEM file
    /// - `CLIENT_ID`: client id at the identity provider (default: com.spencerhartland.Physical)
    /// - `CLIENT_SECRET_FILE`: file holding the provider client secret
    /// - `VALIDATION_URL`: provider token endpoint (default: Apple)
    /// - `AUTHORIZATION_URL`: provider authorization endpoint (default: Apple)
    /// - `PUBLIC_KEY_URL`: provider JWKS endpoint (default: Apple)
    /// - `ISSUER`: provider assertion issuer (default: https://appleid.apple.com)
    /// - `PUBLIC_KEY_ALGORITHM`: provider assertion algorithm (default: RS256)
    /// - `PROVIDER_TIMEOUT_SECS`: provider call timeout (default: 10)
    /// - `JWKS_CACHE_TTL_SECS`: provider key set cache lifetime (default: 0)
    /// - `REDIS_URL`: refresh-token store (default: in-memory)
    /// - `TOKEN_STORE_PREFIX`: store key prefix (default: physical)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let tokens = TokenSettings::default();
        let keys = KeySettings::default();
        let federation = FederationSettings::default();
        let store = StoreSettings::default();

        Ok(Self {
            tokens: TokenSettings {
                issuer: lookup("TOKEN_ISSUER").unwrap_or(tokens.issuer),
                audience: lookup("TOKEN_AUDIENCE").unwrap_or(tokens.audience),
                access_token_ttl_secs: parse_or(
                    &lookup,
                    "ACCESS_TOKEN_TTL_SECS",
                    tokens.access_token_ttl_secs,
                )?,
                algorithm: parse_or(&lookup, "TOKEN_ALGORITHM", tokens.algorithm)?,
                leeway_secs: parse_or(&lookup, "TOKEN_LEEWAY_SECS", tokens.leeway_secs)?,
            },
            keys: KeySettings {
                key_id: lookup("ACCESS_KEY_ID").unwrap_or(keys.key_id),
                private_key_file: lookup("PRIVATE_ACCESS_KEY_FILE").map(PathBuf::from),
                public_key_file: lookup("PUBLIC_ACCESS_KEY_FILE").map(PathBuf::from),
            },
            federation: FederationSettings {
                client_id: lookup("CLIENT_ID").unwrap_or(federation.client_id),
                client_secret_file: lookup("CLIENT_SECRET_FILE").map(PathBuf::from),
                token_url: lookup("VALIDATION_URL").unwrap_or(federation.token_url),
                authorization_url: lookup("AUTHORIZATION_URL")
                    .unwrap_or(federation.authorization_url),
                jwks_url: lookup("PUBLIC_KEY_URL").unwrap_or(federation.jwks_url),
                issuer: lookup("ISSUER").unwrap_or(federation.issuer),
                algorithm: parse_or(&lookup, "PUBLIC_KEY_ALGORITHM", federation.algorithm)?,
                timeout_secs: parse_or(&lookup, "PROVIDER_TIMEOUT_SECS", federation.timeout_secs)?,
                jwks_cache_ttl_secs: parse_or(
                    &lookup,
                    "JWKS_CACHE_TTL_SECS",
                    federation.jwks_cache_ttl_secs,
                )?,
            },
            store: StoreSettings {
                redis_url: lookup("REDIS_URL").filter(|s| !s.is_empty()),
                prefix: lookup("TOKEN_STORE_PREFIX").unwrap_or(store.prefix),
            },
        })
    }

    /// Validate that everything needed to serve requests is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.keys.private_key_file.is_none() {
            return Err(ConfigError::MissingEnvVar("PRIVATE_ACCESS_KEY_FILE".to_string()));
        }
        if self.keys.public_key_file.is_none() {
            return Err(ConfigError::MissingEnvVar("PUBLIC_ACCESS_KEY_FILE".to_string()));
        }
        if self.federation.client_secret_file.is_none() {
            return Err(ConfigError::MissingEnvVar("CLIENT_SECRET_FILE".to_string()));
        }
        if self.tokens.access_token_ttl_secs <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "ACCESS_TOKEN_TTL_SECS".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.federation.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "PROVIDER_TIMEOUT_SECS".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

impl From<ConfigError> for AuthError {
    fn from(e: ConfigError) -> Self {
        AuthError::Configuration(e.to_string())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AuthConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.tokens.access_token_ttl_secs, 3600);
        assert_eq!(config.tokens.algorithm, JwtAlgorithm::ES256);
        assert_eq!(config.federation.algorithm, JwtAlgorithm::RS256);
        assert_eq!(config.federation.timeout(), Duration::from_secs(10));
        assert_eq!(config.federation.jwks_cache_ttl(), Duration::ZERO);
        assert!(config.store.redis_url.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = AuthConfig::from_lookup(lookup(&[
            ("TOKEN_ISSUER", "https://auth.example.com"),
            ("TOKEN_ALGORITHM", "es384"),
            ("ACCESS_TOKEN_TTL_SECS", "900"),
            ("CLIENT_ID", "com.example.app"),
            ("PUBLIC_KEY_URL", "https://idp.example.com/keys"),
            ("JWKS_CACHE_TTL_SECS", "300"),
            ("REDIS_URL", "redis://localhost:6379"),
        ]))
        .unwrap();

        assert_eq!(config.tokens.issuer, "https://auth.example.com");
        assert_eq!(config.tokens.algorithm, JwtAlgorithm::ES384);
        assert_eq!(config.tokens.access_token_ttl_secs, 900);
        assert_eq!(config.federation.client_id, "com.example.app");
        assert_eq!(config.federation.jwks_url, "https://idp.example.com/keys");
        assert_eq!(config.federation.jwks_cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.store.redis_url.as_deref(), Some("redis://localhost:6379"));
    }

    #[test]
    fn test_invalid_values() {
        let err =
            AuthConfig::from_lookup(lookup(&[("ACCESS_TOKEN_TTL_SECS", "soon")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == "ACCESS_TOKEN_TTL_SECS"
        ));

        let err = AuthConfig::from_lookup(lookup(&[("TOKEN_ALGORITHM", "HS256")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == "TOKEN_ALGORITHM"
        ));
    }

    #[test]
    fn test_validate_requires_key_files_and_secret() {
        let config = AuthConfig::from_lookup(lookup(&[])).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingEnvVar(ref v)) if v == "PRIVATE_ACCESS_KEY_FILE"
        ));

        let config = AuthConfig::from_lookup(lookup(&[
            ("PRIVATE_ACCESS_KEY_FILE", "/keys/private.pem"),
            ("PUBLIC_ACCESS_KEY_FILE", "/keys/public.pem"),
        ]))
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingEnvVar(ref v)) if v == "CLIENT_SECRET_FILE"
        ));

        let config = AuthConfig::from_lookup(lookup(&[
            ("PRIVATE_ACCESS_KEY_FILE", "/keys/private.pem"),
            ("PUBLIC_ACCESS_KEY_FILE", "/keys/public.pem"),
            ("CLIENT_SECRET_FILE", "/keys/client_secret"),
        ]))
        .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_key_settings_provider() {
        let settings = KeySettings::default();
        assert!(matches!(
            settings.provider(JwtAlgorithm::ES256),
            Err(ConfigError::MissingEnvVar(_))
        ));

        let settings = KeySettings {
            private_key_file: Some("/keys/private.pem".into()),
            public_key_file: Some("/keys/public.pem".into()),
            ..KeySettings::default()
        };
        let provider = settings.provider(JwtAlgorithm::ES256).unwrap();
        assert_eq!(provider.algorithm(), JwtAlgorithm::ES256);
    }

    #[tokio::test]
    async fn test_store_defaults_to_memory() {
        let store = StoreSettings::default().open().await;
        assert!(store.is_ok());
    }
}
