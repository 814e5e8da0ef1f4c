//! Refresh-token ledger records.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Lowercase hex SHA-256 digest of a raw refresh token.
///
/// This is the only form in which a refresh token is ever persisted, so a
/// leaked ledger does not leak usable tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenHash(String);

impl TokenHash {
    /// Hash a raw refresh token.
    pub fn of(raw_token: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(raw_token.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Wrap an already computed digest (e.g. read back from a backend).
    pub fn from_hex(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    /// Get the hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix of the digest, safe for log lines.
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for TokenHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A refresh token that has been issued and not yet exchanged.
///
/// Records are created on issuance and removed on exchange; they are never
/// updated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    /// Digest of the raw token
    #[serde(rename = "tokenHash")]
    pub token_hash: TokenHash,

    /// Subject the token was issued for
    #[serde(rename = "sub")]
    pub subject: String,
}

impl RefreshTokenRecord {
    /// Create a new record.
    pub fn new(token_hash: TokenHash, subject: impl Into<String>) -> Self {
        Self {
            token_hash,
            subject: subject.into(),
        }
    }
}
