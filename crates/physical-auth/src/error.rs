//! Error types for credential operations
//!
//! This module defines the closed set of failures that issuance, refresh,
//! verification and federation can produce, and how each maps onto an HTTP
//! response at the routing boundary.

use physical_store::StoreError;
use thiserror::Error;

/// Authentication error types.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Request body or header is missing a field or cannot be parsed
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Token is not a parseable signed token
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Credential failed verification or is unknown
    #[error("Invalid credential: {0}")]
    InvalidCredential(InvalidCredential),

    /// Credential is authentic but past its expiration
    #[error("Credential has expired")]
    ExpiredCredential,

    /// Identity provider or key-set endpoint failed
    #[error("Upstream failure: {0}")]
    UpstreamFailure(String),

    /// Refresh-token store failed
    #[error("Storage failure: {0}")]
    StorageFailure(String),

    /// Key material or secret could not be loaded
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Why a credential was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidCredential {
    /// Signature does not match the verification key
    #[error("invalid signature")]
    Signature,

    /// Issuer claim does not match
    #[error("invalid issuer")]
    Issuer,

    /// Audience claim does not match
    #[error("invalid audience")]
    Audience,

    /// Token declares an algorithm other than the expected one
    #[error("unexpected algorithm")]
    Algorithm,

    /// A required claim is absent
    #[error("missing claim: {0}")]
    MissingClaim(String),

    /// Token header carries no key id
    #[error("missing key id")]
    MissingKeyId,

    /// No verification key is published under the token's key id
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Refresh token was never issued or has already been exchanged
    #[error("unknown refresh token")]
    UnknownRefreshToken,

    /// Identity assertion failed verification for the wrapped reason
    #[error("identity assertion rejected: {0}")]
    AssertionRejected(Box<InvalidCredential>),

    /// Identity assertion is past its expiration
    #[error("expired")]
    Expired,

    /// Identity assertion could not be parsed
    #[error("malformed: {0}")]
    Malformed(String),

    /// Identity provider refused the authorization code or refresh token
    #[error("authorization rejected: {0}")]
    AuthorizationRejected(String),

    /// Any other verification failure
    #[error("{0}")]
    Other(String),
}

impl InvalidCredential {
    /// Whether the failure concerns input presented for exchange (refresh
    /// token, identity assertion, provider grant) rather than an access token.
    pub fn is_exchange_input(&self) -> bool {
        matches!(
            self,
            InvalidCredential::UnknownRefreshToken
                | InvalidCredential::AssertionRejected(_)
                | InvalidCredential::AuthorizationRejected(_)
        )
    }
}

impl From<InvalidCredential> for AuthError {
    fn from(reason: InvalidCredential) -> Self {
        AuthError::InvalidCredential(reason)
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        AuthError::StorageFailure(e.to_string())
    }
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    /// Check if this error should be logged at error level.
    ///
    /// Rejected credentials are expected traffic and are not server errors.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            AuthError::UpstreamFailure(_)
                | AuthError::StorageFailure(_)
                | AuthError::Configuration(_)
        )
    }

    /// Get HTTP status code for this error.
    ///
    /// Rejected exchange input is a bad request; a rejected or expired access
    /// token is unauthorized.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::MalformedRequest(_) | AuthError::MalformedToken(_) => 400,

            AuthError::InvalidCredential(reason) if reason.is_exchange_input() => 400,
            AuthError::InvalidCredential(_) => 401,
            AuthError::ExpiredCredential => 401,

            AuthError::UpstreamFailure(_)
            | AuthError::StorageFailure(_)
            | AuthError::Configuration(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MalformedRequest(_) => "MALFORMED_REQUEST",
            AuthError::MalformedToken(_) => "MALFORMED_TOKEN",
            AuthError::InvalidCredential(_) => "INVALID_CREDENTIAL",
            AuthError::ExpiredCredential => "EXPIRED_CREDENTIAL",
            AuthError::UpstreamFailure(_) => "UPSTREAM_FAILURE",
            AuthError::StorageFailure(_) => "STORAGE_FAILURE",
            AuthError::Configuration(_) => "INTERNAL_ERROR",
        }
    }

    /// User-safe message for API responses.
    ///
    /// Never includes key material, raw provider bodies or backend detail.
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::MalformedRequest(_) => "The request is improperly formatted.",
            AuthError::MalformedToken(_) => "The token could not be parsed.",
            AuthError::InvalidCredential(InvalidCredential::UnknownRefreshToken) => {
                "The refresh token is invalid. Please sign in again."
            }
            AuthError::InvalidCredential(InvalidCredential::AssertionRejected(_)) => {
                "The validity of the identity token could not be verified."
            }
            AuthError::InvalidCredential(InvalidCredential::AuthorizationRejected(_)) => {
                "The authorization could not be validated."
            }
            AuthError::InvalidCredential(_) => "The access token is invalid.",
            AuthError::ExpiredCredential => "The access token has expired.",
            AuthError::UpstreamFailure(_) => "Unable to reach the identity provider.",
            AuthError::StorageFailure(_) | AuthError::Configuration(_) => {
                "An internal error occurred."
            }
        }
    }
}
