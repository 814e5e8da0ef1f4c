//! Identity provider token endpoint
//!
//! Validates an authorization code or provider refresh token by redeeming it
//! at the provider's OAuth 2.0 token endpoint with this app's confidential
//! client secret.

use crate::config::FederationSettings;
use crate::error::{AuthError, AuthResult, InvalidCredential};
use async_trait::async_trait;
use oauth2::basic::{BasicClient, BasicErrorResponse};
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, HttpRequest, HttpResponse,
    RefreshToken, RequestTokenError, TokenResponse, TokenUrl,
};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Grant presented to the identity provider.
#[derive(Clone, PartialEq, Eq)]
pub enum Grant {
    /// One-time authorization code from a first sign-in
    AuthorizationCode(String),
    /// Provider refresh token from an earlier sign-in
    RefreshToken(String),
}

impl Grant {
    /// Get the OAuth `grant_type` value.
    pub fn grant_type(&self) -> &'static str {
        match self {
            Grant::AuthorizationCode(_) => "authorization_code",
            Grant::RefreshToken(_) => "refresh_token",
        }
    }
}

impl fmt::Debug for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grant::AuthorizationCode(_) => f.write_str("AuthorizationCode([REDACTED])"),
            Grant::RefreshToken(_) => f.write_str("RefreshToken([REDACTED])"),
        }
    }
}

/// Tokens returned by the provider for a validated grant.
#[derive(Clone)]
pub struct ProviderTokens {
    /// Provider access token
    pub access_token: String,

    /// Provider refresh token (returned for authorization codes)
    pub refresh_token: Option<String>,

    /// Access token lifetime in seconds
    pub expires_in: Option<u64>,
}

impl fmt::Debug for ProviderTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderTokens")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Client for the identity provider's token endpoint.
#[async_trait]
pub trait IdentityProviderClient: Send + Sync {
    /// Redeem `grant` at the provider.
    ///
    /// Any non-success answer from the provider is
    /// [`InvalidCredential::AuthorizationRejected`]. An unreachable or slow
    /// endpoint, or a success response that cannot be decoded, is
    /// [`AuthError::UpstreamFailure`].
    async fn validate_grant(&self, grant: &Grant) -> AuthResult<ProviderTokens>;
}

/// Where the confidential client secret comes from.
#[derive(Clone)]
pub enum SecretSource {
    /// Secret held in memory
    Value(String),
    /// File read on every call, so a rotated secret is picked up without a restart
    File(PathBuf),
}

impl fmt::Debug for SecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretSource::Value(_) => f.write_str("Value([REDACTED])"),
            SecretSource::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

impl SecretSource {
    async fn load(&self) -> AuthResult<String> {
        let secret = match self {
            SecretSource::Value(secret) => secret.clone(),
            SecretSource::File(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                AuthError::Configuration(format!(
                    "Unable to read client secret file {}: {}",
                    path.display(),
                    e
                ))
            })?,
        };

        let secret = secret.trim();
        if secret.is_empty() {
            return Err(AuthError::Configuration("Client secret is empty".to_string()));
        }
        Ok(secret.to_string())
    }
}

/// OAuth 2.0 token endpoint client.
///
/// Credentials are sent in the form body, which is what Sign in with Apple
/// expects.
#[derive(Debug, Clone)]
pub struct OAuthIdentityProvider {
    client_id: String,
    client_secret: SecretSource,
    auth_url: AuthUrl,
    token_url: TokenUrl,
    timeout: Duration,
}

impl OAuthIdentityProvider {
    /// Create a client for the given endpoints.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: SecretSource,
        auth_url: &str,
        token_url: &str,
    ) -> AuthResult<Self> {
        let auth_url = AuthUrl::new(auth_url.to_string())
            .map_err(|e| AuthError::Configuration(format!("Invalid authorization URL: {}", e)))?;
        let token_url = TokenUrl::new(token_url.to_string())
            .map_err(|e| AuthError::Configuration(format!("Invalid token URL: {}", e)))?;

        Ok(Self {
            client_id: client_id.into(),
            client_secret,
            auth_url,
            token_url,
            timeout: Duration::from_secs(10),
        })
    }

    /// Create a client from federation settings.
    pub fn from_settings(settings: &FederationSettings) -> AuthResult<Self> {
        let secret_file = settings.client_secret_file.clone().ok_or_else(|| {
            AuthError::Configuration("CLIENT_SECRET_FILE is not set".to_string())
        })?;

        Ok(Self::new(
            settings.client_id.clone(),
            SecretSource::File(secret_file),
            &settings.authorization_url,
            &settings.token_url,
        )?
        .with_timeout(settings.timeout()))
    }

    /// Bound each token request by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn client(&self) -> AuthResult<BasicClient> {
        let secret = self.client_secret.load().await?;

        Ok(BasicClient::new(
            ClientId::new(self.client_id.clone()),
            Some(ClientSecret::new(secret)),
            self.auth_url.clone(),
            Some(self.token_url.clone()),
        )
        .set_auth_type(AuthType::RequestBody))
    }
}

#[async_trait]
impl IdentityProviderClient for OAuthIdentityProvider {
    #[instrument(skip(self), fields(grant_type = grant.grant_type()))]
    async fn validate_grant(&self, grant: &Grant) -> AuthResult<ProviderTokens> {
        let client = self.client().await?;

        let result = match grant {
            Grant::AuthorizationCode(code) => {
                let request = client.exchange_code(AuthorizationCode::new(code.clone()));
                tokio::time::timeout(self.timeout, request.request_async(send_token_request)).await
            }
            Grant::RefreshToken(token) => {
                let token = RefreshToken::new(token.clone());
                let request = client.exchange_refresh_token(&token);
                tokio::time::timeout(self.timeout, request.request_async(send_token_request)).await
            }
        };

        let response = match result {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(map_token_error(e)),
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Token endpoint timed out");
                return Err(AuthError::UpstreamFailure(
                    "Identity provider did not respond in time".to_string(),
                ));
            }
        };

        debug!("Grant validated by identity provider");
        Ok(ProviderTokens {
            access_token: response.access_token().secret().clone(),
            refresh_token: response.refresh_token().map(|t| t.secret().clone()),
            expires_in: response.expires_in().map(|d| d.as_secs()),
        })
    }
}

/// Token endpoint transport outcome.
#[derive(Debug, Error)]
enum TokenEndpointError {
    /// Endpoint could not be reached
    #[error(transparent)]
    Transport(#[from] oauth2::reqwest::Error<reqwest::Error>),

    /// Endpoint answered with a non-success status and no OAuth error body
    #[error("token endpoint returned {0}")]
    Status(u16),
}

/// Send a token request, classifying non-success answers that carry no OAuth
/// error body by their status code.
async fn send_token_request(request: HttpRequest) -> Result<HttpResponse, TokenEndpointError> {
    let response = async_http_client(request).await?;

    let status = response.status_code;
    if !status.is_success()
        && serde_json::from_slice::<BasicErrorResponse>(&response.body).is_err()
    {
        return Err(TokenEndpointError::Status(status.as_u16()));
    }
    Ok(response)
}

fn map_token_error(e: RequestTokenError<TokenEndpointError, BasicErrorResponse>) -> AuthError {
    match e {
        RequestTokenError::ServerResponse(response) => {
            warn!(error = %response.error(), "Identity provider rejected grant");
            InvalidCredential::AuthorizationRejected(response.error().to_string()).into()
        }
        RequestTokenError::Request(TokenEndpointError::Status(status)) => {
            warn!(status, "Identity provider rejected grant");
            InvalidCredential::AuthorizationRejected(format!("token endpoint returned {}", status))
                .into()
        }
        RequestTokenError::Request(TokenEndpointError::Transport(e)) => {
            warn!(error = %e, "Token endpoint request failed");
            AuthError::UpstreamFailure(format!("Token endpoint request failed: {}", e))
        }
        RequestTokenError::Parse(e, _) => {
            AuthError::UpstreamFailure(format!("Unable to decode token endpoint response: {}", e))
        }
        RequestTokenError::Other(message) => {
            AuthError::UpstreamFailure(format!("Unexpected token endpoint response: {}", message))
        }
    }
}
