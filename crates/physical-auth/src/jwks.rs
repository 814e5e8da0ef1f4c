//! Remote JWKS key sets
//!
//! Fetches a published `{"keys": [...]}` document and selects verification
//! keys by key id. By default the set is fetched on every lookup. A short
//! cache TTL may be configured; a key id missing from a cached set always
//! forces one fresh fetch before the lookup fails, so provider key rotation
//! is picked up immediately.

use crate::error::{AuthError, AuthResult, InvalidCredential};
use crate::keys::{VerificationKey, VerificationKeyProvider};
use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::DecodingKey;
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

#[derive(Debug)]
struct CachedKeySet {
    keys: JwkSet,
    fetched_at: Instant,
}

/// Verification keys published at a JWKS endpoint.
#[derive(Debug)]
pub struct JwksKeyProvider {
    /// HTTP client instance.
    client: Client,

    /// Key set URL.
    url: String,

    /// How long a fetched set may be reused; `None` disables caching.
    cache_ttl: Option<Duration>,

    cache: RwLock<Option<CachedKeySet>>,
}

impl JwksKeyProvider {
    /// Create a provider for the key set at `url`.
    ///
    /// Every fetch is bounded by `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> AuthResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            cache_ttl: None,
            cache: RwLock::new(None),
        })
    }

    /// Reuse fetched key sets for up to `ttl`.
    ///
    /// A zero TTL keeps caching disabled.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = (!ttl.is_zero()).then_some(ttl);
        self
    }

    /// Get the key set URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the current key set from the endpoint.
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn fetch(&self) -> AuthResult<JwkSet> {
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            warn!(error = %e, "Key set request failed");
            AuthError::UpstreamFailure(format!("Unable to retrieve public keys: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Key set endpoint returned {}", status.as_u16());
            return Err(AuthError::UpstreamFailure(format!(
                "Key set endpoint returned {}",
                status.as_u16()
            )));
        }

        let keys: JwkSet = response.json().await.map_err(|e| {
            AuthError::UpstreamFailure(format!("Unable to decode key set: {}", e))
        })?;
        debug!(keys = keys.keys.len(), "Fetched key set");
        Ok(keys)
    }

    async fn cached(&self) -> Option<JwkSet> {
        let ttl = self.cache_ttl?;
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .filter(|c| c.fetched_at.elapsed() < ttl)
            .map(|c| c.keys.clone())
    }

    async fn refresh(&self) -> AuthResult<JwkSet> {
        let keys = self.fetch().await?;
        if self.cache_ttl.is_some() {
            *self.cache.write().await = Some(CachedKeySet {
                keys: keys.clone(),
                fetched_at: Instant::now(),
            });
        }
        Ok(keys)
    }
}

fn to_verification_key(kid: &str, jwk: &Jwk) -> AuthResult<VerificationKey> {
    let decoding_key = DecodingKey::from_jwk(jwk).map_err(|e| {
        AuthError::UpstreamFailure(format!("Published key {} is unusable: {}", kid, e))
    })?;

    Ok(VerificationKey {
        kid: kid.to_string(),
        decoding_key,
    })
}

#[async_trait]
impl VerificationKeyProvider for JwksKeyProvider {
    async fn verification_key(&self, kid: &str) -> AuthResult<VerificationKey> {
        if let Some(keys) = self.cached().await {
            if let Some(jwk) = keys.find(kid) {
                return to_verification_key(kid, jwk);
            }
            debug!(%kid, "Key id not in cached key set, refreshing");
        }

        let keys = self.refresh().await?;
        let jwk = keys
            .find(kid)
            .ok_or_else(|| InvalidCredential::KeyNotFound(kid.to_string()))?;
        to_verification_key(kid, jwk)
    }
}
