//! Credential service facade
//!
//! Wires the issuer, verifier, refresh exchange and federation verifier
//! around one shared refresh-token store. This is the surface the request
//! routing layer calls.

use crate::claims::AccessClaims;
use crate::config::AuthConfig;
use crate::credentials::{CredentialPair, FederatedCredentials, RefreshRequest};
use crate::error::AuthResult;
use crate::exchange::RefreshExchange;
use crate::federation::{FederationRequest, IdentityFederationVerifier};
use crate::issuer::TokenIssuer;
use crate::jwks::JwksKeyProvider;
use crate::provider::OAuthIdentityProvider;
use crate::verifier::TokenVerifier;
use physical_store::RefreshTokenStore;
use std::sync::Arc;
use tracing::info;

/// Issue, exchange, verify and federate credentials.
#[derive(Debug)]
pub struct AuthService {
    issuer: Arc<TokenIssuer>,
    verifier: TokenVerifier,
    exchange: RefreshExchange,
    federation: IdentityFederationVerifier,
}

impl AuthService {
    /// Build the service from configuration.
    ///
    /// Local keys come from the configured key files and provider keys from
    /// the provider's JWKS endpoint.
    pub fn new(config: &AuthConfig, store: Arc<dyn RefreshTokenStore>) -> AuthResult<Self> {
        let local_keys = Arc::new(config.keys.provider(config.tokens.algorithm)?);

        let issuer = Arc::new(TokenIssuer::new(
            config.tokens.clone(),
            local_keys.clone(),
            store.clone(),
        ));
        let verifier = TokenVerifier::new(config.tokens.clone(), local_keys);

        let federation_settings = &config.federation;
        let provider_keys = JwksKeyProvider::new(
            federation_settings.jwks_url.clone(),
            federation_settings.timeout(),
        )?
        .with_cache_ttl(federation_settings.jwks_cache_ttl());
        let provider = OAuthIdentityProvider::from_settings(federation_settings)?;
        let federation = IdentityFederationVerifier::new(
            federation_settings.client_id.clone(),
            federation_settings.issuer.clone(),
            federation_settings.algorithm,
            Arc::new(provider_keys),
            Arc::new(provider),
            issuer.clone(),
        )
        .with_leeway(config.tokens.leeway_secs);

        info!(
            issuer = %config.tokens.issuer,
            provider = %federation_settings.issuer,
            "Credential service configured"
        );

        Ok(Self::from_parts(issuer, verifier, store, federation))
    }

    /// Assemble the service from prebuilt components.
    ///
    /// `store` must be the store `issuer` writes to.
    pub fn from_parts(
        issuer: Arc<TokenIssuer>,
        verifier: TokenVerifier,
        store: Arc<dyn RefreshTokenStore>,
        federation: IdentityFederationVerifier,
    ) -> Self {
        Self {
            exchange: RefreshExchange::new(store, issuer.clone()),
            issuer,
            verifier,
            federation,
        }
    }

    /// Issue a credential pair for an already verified subject.
    pub async fn issue(&self, subject: &str) -> AuthResult<CredentialPair> {
        self.issuer.issue(subject).await
    }

    /// Exchange a refresh token for a new pair.
    pub async fn exchange(&self, request: &RefreshRequest) -> AuthResult<CredentialPair> {
        self.exchange.exchange_request(request).await
    }

    /// Verify an access token.
    pub async fn verify(&self, token: &str) -> AuthResult<AccessClaims> {
        self.verifier.verify(token).await
    }

    /// Verify the token in an `Authorization` header value.
    pub async fn verify_header(&self, header: Option<&str>) -> AuthResult<AccessClaims> {
        self.verifier.verify_header(header).await
    }

    /// Authenticate a provider sign-in and issue local credentials.
    pub async fn authenticate(
        &self,
        request: &FederationRequest,
    ) -> AuthResult<FederatedCredentials> {
        self.federation.authenticate(request).await
    }
}
