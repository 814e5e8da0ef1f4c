//! Credential issuance
//!
//! Mints a signed access token and an opaque refresh token for a verified
//! subject. Only the SHA-256 hash of the refresh token is persisted; the raw
//! value leaves this module exactly once, in the returned pair.

use crate::claims::AccessClaims;
use crate::clock::{Clock, SystemClock};
use crate::config::TokenSettings;
use crate::credentials::CredentialPair;
use crate::error::{AuthError, AuthResult};
use crate::keys::SigningKeyProvider;
use jsonwebtoken::{encode, Header};
use physical_store::{RefreshTokenRecord, RefreshTokenStore, TokenHash};
use rand::RngCore;
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// Bytes of entropy in a refresh token.
const REFRESH_TOKEN_BYTES: usize = 32;

/// Issues credential pairs.
pub struct TokenIssuer {
    settings: TokenSettings,
    keys: Arc<dyn SigningKeyProvider>,
    store: Arc<dyn RefreshTokenStore>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Create an issuer using the system clock.
    pub fn new(
        settings: TokenSettings,
        keys: Arc<dyn SigningKeyProvider>,
        store: Arc<dyn RefreshTokenStore>,
    ) -> Self {
        Self {
            settings,
            keys,
            store,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Get the token settings.
    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    /// Issue a credential pair for `subject`.
    ///
    /// The access token is signed before anything is written, so a key
    /// failure leaves the store untouched. A store failure fails the whole
    /// call; no partial pair is returned.
    #[instrument(skip(self))]
    pub async fn issue(&self, subject: &str) -> AuthResult<CredentialPair> {
        if subject.is_empty() {
            return Err(AuthError::MalformedRequest("Subject is empty".to_string()));
        }

        let access_token = self.sign(subject).await?;

        let refresh_token = generate_refresh_token();
        let token_hash = TokenHash::of(&refresh_token);
        debug!(token = token_hash.short(), "Storing refresh token");
        self.store
            .put(RefreshTokenRecord::new(token_hash, subject))
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to store refresh token");
                AuthError::from(e)
            })?;

        Ok(CredentialPair::new(access_token, refresh_token))
    }

    async fn sign(&self, subject: &str) -> AuthResult<String> {
        let key = self.keys.signing_key().await?;

        let claims = AccessClaims::new(
            &self.settings.issuer,
            subject,
            &self.settings.audience,
            self.clock.now(),
            self.settings.access_token_ttl_secs,
        );

        let mut header = Header::new(key.algorithm.into());
        header.kid = Some(key.kid);

        encode(&header, &claims, &key.encoding_key)
            .map_err(|e| AuthError::Configuration(format!("Failed to sign access token: {}", e)))
    }
}

fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
