//! Single-use refresh exchange
//!
//! A refresh token is consumed with one atomic take on the store and a new
//! pair is issued for the recorded subject. Every exchange rotates the
//! refresh token, so a leaked token is good for at most one use.

use crate::credentials::{CredentialPair, RefreshRequest};
use crate::error::{AuthError, AuthResult, InvalidCredential};
use crate::issuer::TokenIssuer;
use physical_store::{RefreshTokenStore, TokenHash};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Exchanges refresh tokens for new credential pairs.
pub struct RefreshExchange {
    store: Arc<dyn RefreshTokenStore>,
    issuer: Arc<TokenIssuer>,
}

impl std::fmt::Debug for RefreshExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshExchange").finish_non_exhaustive()
    }
}

impl RefreshExchange {
    /// Create an exchange over the store the issuer writes to.
    pub fn new(store: Arc<dyn RefreshTokenStore>, issuer: Arc<TokenIssuer>) -> Self {
        Self { store, issuer }
    }

    /// Consume `refresh_token` and issue a new pair for its subject.
    ///
    /// Fails with [`InvalidCredential::UnknownRefreshToken`] when the token
    /// was never issued or has already been exchanged. The old token is
    /// consumed even if issuing the new pair then fails.
    #[instrument(skip_all)]
    pub async fn exchange(&self, refresh_token: &str) -> AuthResult<CredentialPair> {
        if refresh_token.is_empty() {
            return Err(AuthError::MalformedRequest(
                "Refresh token is empty".to_string(),
            ));
        }

        let hash = TokenHash::of(refresh_token);
        let taken = self.store.take(&hash).await.map_err(|e| {
            error!(error = %e, "Failed to consume refresh token");
            AuthError::from(e)
        })?;
        let record = match taken {
            Some(record) => record,
            None => {
                warn!(token = hash.short(), "Refresh token not found");
                return Err(InvalidCredential::UnknownRefreshToken.into());
            }
        };

        info!(token = hash.short(), sub = %record.subject, "Refresh token consumed");
        self.issuer.issue(&record.subject).await
    }

    /// Exchange the token carried by a parsed request body.
    pub async fn exchange_request(&self, request: &RefreshRequest) -> AuthResult<CredentialPair> {
        self.exchange(&request.refresh_token).await
    }
}
