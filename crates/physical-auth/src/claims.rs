//! Token claims
//!
//! Claim sets for the access tokens this service signs and for the identity
//! assertions it accepts from the external identity provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Claims carried by an access token.
///
/// The token is self-contained: verifying it needs only the public key
/// selected by the `kid` header, never a store lookup. Claims are immutable
/// once signed.
///
/// Registered claims default when absent so that decoding reaches the
/// required-claim check, which reports the missing claim by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Issuer (this service)
    #[serde(default)]
    pub iss: String,

    /// Subject (opaque user identifier)
    #[serde(default)]
    pub sub: String,

    /// Audience (client identifier)
    #[serde(default)]
    pub aud: String,

    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    #[serde(default)]
    pub exp: i64,
}

impl AccessClaims {
    /// Build claims issued at `issued_at` and valid for `ttl_secs` seconds.
    pub fn new(
        issuer: impl Into<String>,
        subject: impl Into<String>,
        audience: impl Into<String>,
        issued_at: i64,
        ttl_secs: i64,
    ) -> Self {
        Self {
            iss: issuer.into(),
            sub: subject.into(),
            aud: audience.into(),
            iat: issued_at,
            exp: issued_at + ttl_secs,
        }
    }

    /// Get the subject.
    pub fn subject(&self) -> &str {
        &self.sub
    }

    /// Check if the token is expired at `now`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }

    /// Get expiration as DateTime.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }
}

/// Claims read from a verified identity assertion.
///
/// Issuer, audience and expiration are enforced during signature
/// verification; only the fields needed afterwards are kept here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Issuer (identity provider)
    pub iss: String,

    /// Subject as known to the identity provider
    pub sub: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: i64,

    /// Email, when the user shared one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}
