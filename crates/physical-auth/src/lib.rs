//! # Physical Authentication
//!
//! This crate is the access-control core of the Physical API: it issues,
//! rotates and verifies bearer credentials, and bridges Sign in with Apple
//! into the service's own credential domain.
//!
//! ## Overview
//!
//! The physical-auth crate handles:
//! - **Issuance**: Signed access tokens (ES256 by default) paired with opaque refresh tokens
//! - **Refresh**: Single-use refresh exchange with token rotation
//! - **Verification**: Stateless signature and claim checks selected by key id
//! - **Federation**: Identity assertion verification against a provider JWKS
//!   and grant validation at the provider's token endpoint
//!
//! ## Features
//!
//! - `redis`: Redis-backed refresh-token store (in-memory otherwise)
//!
//! ## Usage
//!
//! ### Issue and verify
//!
//! ```rust,no_run
//! use physical_auth::{
//!     JwtAlgorithm, KeySource, LocalKeyProvider, TokenIssuer, TokenSettings, TokenVerifier,
//! };
//! use physical_store::MemoryTokenStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> physical_auth::AuthResult<()> {
//! let keys = Arc::new(LocalKeyProvider::pair(
//!     JwtAlgorithm::ES256,
//!     "physical-access-1",
//!     KeySource::File("/run/secrets/access.pem".into()),
//!     KeySource::File("/run/secrets/access.pub".into()),
//! ));
//! let store = Arc::new(MemoryTokenStore::new());
//!
//! let issuer = TokenIssuer::new(TokenSettings::default(), keys.clone(), store);
//! let verifier = TokenVerifier::new(TokenSettings::default(), keys);
//!
//! let pair = issuer.issue("user-42").await?;
//! let claims = verifier.verify(&pair.access_token).await?;
//! assert_eq!(claims.sub, "user-42");
//! # Ok(())
//! # }
//! ```
//!
//! ### From the environment
//!
//! ```rust,no_run
//! use physical_auth::{AuthConfig, AuthService, RefreshRequest};
//!
//! # async fn example(body: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuthConfig::from_env()?;
//! config.validate()?;
//!
//! let store = config.store.open().await?;
//! let service = AuthService::new(&config, store)?;
//!
//! let request = RefreshRequest::from_json(body)?;
//! let pair = service.exchange(&request).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Errors
//!
//! Every operation returns [`AuthError`]. The routing layer maps it to a
//! response with [`AuthError::status_code`] and [`AuthError::public_message`];
//! neither exposes key material or provider response bodies.

pub mod bearer;
pub mod claims;
pub mod clock;
pub mod config;
pub mod credentials;
pub mod error;
pub mod exchange;
pub mod federation;
pub mod issuer;
pub mod jwks;
pub mod keys;
pub mod provider;
pub mod service;
pub mod verifier;

// Re-export main types
pub use bearer::bearer_token;
pub use claims::{AccessClaims, IdentityClaims};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{
    AuthConfig, ConfigError, FederationSettings, KeySettings, StoreSettings, TokenSettings,
};
pub use credentials::{CredentialPair, FederatedCredentials, RefreshRequest};
pub use error::{AuthError, AuthResult, InvalidCredential};
pub use exchange::RefreshExchange;
pub use federation::{FederationRequest, GrantType, IdentityFederationVerifier};
pub use issuer::TokenIssuer;
pub use jwks::JwksKeyProvider;
pub use keys::{
    JwtAlgorithm, KeySource, LocalKeyProvider, SigningKey, SigningKeyProvider, VerificationKey,
    VerificationKeyProvider,
};
pub use provider::{
    Grant, IdentityProviderClient, OAuthIdentityProvider, ProviderTokens, SecretSource,
};
pub use service::AuthService;
pub use verifier::TokenVerifier;
