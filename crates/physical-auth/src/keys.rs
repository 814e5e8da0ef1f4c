//! Signing and verification key resolution
//!
//! Access tokens are signed with an asymmetric private key and verified
//! against public keys selected by key id. Keys are resolved on every call:
//! key files are re-read, so rotating a file on disk takes effect on the next
//! request without a restart.

use crate::error::{AuthError, AuthResult, InvalidCredential};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Supported JWT algorithms.
///
/// Only asymmetric algorithms are accepted: verifiers hold public keys, never
/// the signing secret.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum JwtAlgorithm {
    /// RSASSA-PKCS1-v1_5 using SHA-256
    RS256,
    /// RSASSA-PKCS1-v1_5 using SHA-384
    RS384,
    /// RSASSA-PKCS1-v1_5 using SHA-512
    RS512,
    /// ECDSA using P-256 and SHA-256
    ES256,
    /// ECDSA using P-384 and SHA-384
    ES384,
}

impl JwtAlgorithm {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            JwtAlgorithm::RS256 => "RS256",
            JwtAlgorithm::RS384 => "RS384",
            JwtAlgorithm::RS512 => "RS512",
            JwtAlgorithm::ES256 => "ES256",
            JwtAlgorithm::ES384 => "ES384",
        }
    }

    fn is_ec(&self) -> bool {
        matches!(self, JwtAlgorithm::ES256 | JwtAlgorithm::ES384)
    }
}

impl From<JwtAlgorithm> for Algorithm {
    fn from(alg: JwtAlgorithm) -> Self {
        match alg {
            JwtAlgorithm::RS256 => Algorithm::RS256,
            JwtAlgorithm::RS384 => Algorithm::RS384,
            JwtAlgorithm::RS512 => Algorithm::RS512,
            JwtAlgorithm::ES256 => Algorithm::ES256,
            JwtAlgorithm::ES384 => Algorithm::ES384,
        }
    }
}

impl FromStr for JwtAlgorithm {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "RS256" => Ok(JwtAlgorithm::RS256),
            "RS384" => Ok(JwtAlgorithm::RS384),
            "RS512" => Ok(JwtAlgorithm::RS512),
            "ES256" => Ok(JwtAlgorithm::ES256),
            "ES384" => Ok(JwtAlgorithm::ES384),
            other => Err(AuthError::Configuration(format!(
                "Unsupported signing algorithm: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for JwtAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where PEM key material comes from.
#[derive(Clone)]
pub enum KeySource {
    /// PEM text held in memory
    Pem(String),
    /// PEM file read on every use
    File(PathBuf),
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Pem(_) => f.write_str("Pem([REDACTED])"),
            KeySource::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

impl KeySource {
    async fn load(&self) -> AuthResult<String> {
        match self {
            KeySource::Pem(pem) => Ok(pem.clone()),
            KeySource::File(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                AuthError::Configuration(format!(
                    "Unable to read key file {}: {}",
                    path.display(),
                    e
                ))
            }),
        }
    }
}

/// Private key used to sign access tokens.
pub struct SigningKey {
    /// Key id written into the token header
    pub kid: String,
    /// Signature algorithm
    pub algorithm: JwtAlgorithm,
    /// Key material
    pub encoding_key: EncodingKey,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .field("encoding_key", &"[REDACTED]")
            .finish()
    }
}

/// Public key used to verify a token signature.
#[derive(Clone)]
pub struct VerificationKey {
    /// Key id the key is published under
    pub kid: String,
    /// Key material
    pub decoding_key: DecodingKey,
}

impl fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationKey")
            .field("kid", &self.kid)
            .finish_non_exhaustive()
    }
}

/// Resolves the current private signing key.
#[async_trait]
pub trait SigningKeyProvider: Send + Sync {
    /// Load the key new tokens are signed with.
    async fn signing_key(&self) -> AuthResult<SigningKey>;
}

/// Resolves public verification keys by key id.
#[async_trait]
pub trait VerificationKeyProvider: Send + Sync {
    /// Load the key published under `kid`.
    ///
    /// Fails with [`InvalidCredential::KeyNotFound`] when no such key exists.
    async fn verification_key(&self, kid: &str) -> AuthResult<VerificationKey>;
}

fn encoding_key(algorithm: JwtAlgorithm, pem: &str) -> AuthResult<EncodingKey> {
    if algorithm.is_ec() {
        EncodingKey::from_ec_pem(pem.as_bytes())
            .map_err(|e| AuthError::Configuration(format!("Invalid EC private key: {}", e)))
    } else {
        EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| AuthError::Configuration(format!("Invalid RSA private key: {}", e)))
    }
}

fn decoding_key(algorithm: JwtAlgorithm, pem: &str) -> AuthResult<DecodingKey> {
    if algorithm.is_ec() {
        DecodingKey::from_ec_pem(pem.as_bytes())
            .map_err(|e| AuthError::Configuration(format!("Invalid EC public key: {}", e)))
    } else {
        DecodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| AuthError::Configuration(format!("Invalid RSA public key: {}", e)))
    }
}

#[derive(Debug, Clone)]
struct LocalKey {
    kid: String,
    source: KeySource,
}

/// Key provider backed by PEM files or inline PEM text.
///
/// Holds one signing key and any number of verification keys, so tokens
/// signed under a retired key id stay verifiable while it is still listed.
///
/// # Example
///
/// ```rust,no_run
/// use physical_auth::keys::{JwtAlgorithm, KeySource, LocalKeyProvider};
///
/// let keys = LocalKeyProvider::new(JwtAlgorithm::ES256)
///     .with_signing_key("access-2", KeySource::File("/run/secrets/access-2.pem".into()))
///     .with_verification_key("access-2", KeySource::File("/run/secrets/access-2.pub".into()))
///     .with_verification_key("access-1", KeySource::File("/run/secrets/access-1.pub".into()));
/// ```
#[derive(Debug, Clone)]
pub struct LocalKeyProvider {
    algorithm: JwtAlgorithm,
    signing: Option<LocalKey>,
    verification: Vec<LocalKey>,
}

impl LocalKeyProvider {
    /// Create a provider with no keys.
    pub fn new(algorithm: JwtAlgorithm) -> Self {
        Self {
            algorithm,
            signing: None,
            verification: Vec::new(),
        }
    }

    /// Create a provider holding one key pair under one key id.
    pub fn pair(
        algorithm: JwtAlgorithm,
        kid: impl Into<String>,
        private_key: KeySource,
        public_key: KeySource,
    ) -> Self {
        let kid = kid.into();
        Self::new(algorithm)
            .with_signing_key(kid.clone(), private_key)
            .with_verification_key(kid, public_key)
    }

    /// Set the signing key.
    pub fn with_signing_key(mut self, kid: impl Into<String>, source: KeySource) -> Self {
        self.signing = Some(LocalKey {
            kid: kid.into(),
            source,
        });
        self
    }

    /// Add a verification key.
    pub fn with_verification_key(mut self, kid: impl Into<String>, source: KeySource) -> Self {
        self.verification.push(LocalKey {
            kid: kid.into(),
            source,
        });
        self
    }

    /// Get the configured algorithm.
    pub fn algorithm(&self) -> JwtAlgorithm {
        self.algorithm
    }
}

#[async_trait]
impl SigningKeyProvider for LocalKeyProvider {
    async fn signing_key(&self) -> AuthResult<SigningKey> {
        let key = self
            .signing
            .as_ref()
            .ok_or_else(|| AuthError::Configuration("No signing key configured".to_string()))?;
        let pem = key.source.load().await?;

        Ok(SigningKey {
            kid: key.kid.clone(),
            algorithm: self.algorithm,
            encoding_key: encoding_key(self.algorithm, &pem)?,
        })
    }
}

#[async_trait]
impl VerificationKeyProvider for LocalKeyProvider {
    async fn verification_key(&self, kid: &str) -> AuthResult<VerificationKey> {
        let key = self
            .verification
            .iter()
            .find(|k| k.kid == kid)
            .ok_or_else(|| InvalidCredential::KeyNotFound(kid.to_string()))?;
        let pem = key.source.load().await?;

        Ok(VerificationKey {
            kid: key.kid.clone(),
            decoding_key: decoding_key(self.algorithm, &pem)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIVATE_KEY: &str = include_str!("../tests/fixtures/access_private.pem");
    const PUBLIC_KEY: &str = include_str!("../tests/fixtures/access_public.pem");

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    #[test]
    fn test_algorithm_parsing() {
        assert_eq!("ES256".parse::<JwtAlgorithm>().unwrap(), JwtAlgorithm::ES256);
        assert_eq!("rs256".parse::<JwtAlgorithm>().unwrap(), JwtAlgorithm::RS256);
        assert!(matches!(
            "HS256".parse::<JwtAlgorithm>(),
            Err(AuthError::Configuration(_))
        ));
        assert_eq!(Algorithm::from(JwtAlgorithm::ES384), Algorithm::ES384);
    }

    #[test]
    fn test_key_source_debug_redacts_pem() {
        let debug = format!("{:?}", KeySource::Pem(PRIVATE_KEY.to_string()));
        assert!(!debug.contains("PRIVATE KEY"));
    }

    #[tokio::test]
    async fn test_inline_pair() {
        let keys = LocalKeyProvider::pair(
            JwtAlgorithm::ES256,
            "k1",
            KeySource::Pem(PRIVATE_KEY.to_string()),
            KeySource::Pem(PUBLIC_KEY.to_string()),
        );

        let signing = keys.signing_key().await.unwrap();
        assert_eq!(signing.kid, "k1");
        assert_eq!(signing.algorithm, JwtAlgorithm::ES256);

        let verification = keys.verification_key("k1").await.unwrap();
        assert_eq!(verification.kid, "k1");
    }

    #[tokio::test]
    async fn test_file_sources() {
        let keys = LocalKeyProvider::pair(
            JwtAlgorithm::ES256,
            "k1",
            KeySource::File(fixture("access_private.pem")),
            KeySource::File(fixture("access_public.pem")),
        );

        assert!(keys.signing_key().await.is_ok());
        assert!(keys.verification_key("k1").await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_kid() {
        let keys = LocalKeyProvider::pair(
            JwtAlgorithm::ES256,
            "k1",
            KeySource::Pem(PRIVATE_KEY.to_string()),
            KeySource::Pem(PUBLIC_KEY.to_string()),
        );

        let err = keys.verification_key("k2").await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::InvalidCredential(InvalidCredential::KeyNotFound(ref kid)) if kid == "k2"
        ));
    }

    #[tokio::test]
    async fn test_missing_signing_key() {
        let keys = LocalKeyProvider::new(JwtAlgorithm::ES256);
        assert!(matches!(
            keys.signing_key().await,
            Err(AuthError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_key_file() {
        let keys = LocalKeyProvider::new(JwtAlgorithm::ES256)
            .with_signing_key("k1", KeySource::File(fixture("does-not-exist.pem")));
        assert!(matches!(
            keys.signing_key().await,
            Err(AuthError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_key_material() {
        let keys = LocalKeyProvider::pair(
            JwtAlgorithm::ES256,
            "k1",
            KeySource::Pem("not-a-key".to_string()),
            KeySource::Pem("not-a-key".to_string()),
        );

        assert!(matches!(
            keys.signing_key().await,
            Err(AuthError::Configuration(_))
        ));
        assert!(matches!(
            keys.verification_key("k1").await,
            Err(AuthError::Configuration(_))
        ));
    }
}
