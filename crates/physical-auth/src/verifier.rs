//! Access token verification
//!
//! Verification is stateless: the token header names the key id, the key
//! provider resolves the public key, and signature plus standard claims are
//! checked without touching the refresh-token store.

use crate::bearer::bearer_token;
use crate::claims::AccessClaims;
use crate::config::TokenSettings;
use crate::error::{AuthError, AuthResult, InvalidCredential};
use crate::keys::{JwtAlgorithm, VerificationKeyProvider};
use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{decode, decode_header, Validation};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Verifies access tokens issued by this service.
pub struct TokenVerifier {
    settings: TokenSettings,
    keys: Arc<dyn VerificationKeyProvider>,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl TokenVerifier {
    /// Create a verifier.
    pub fn new(settings: TokenSettings, keys: Arc<dyn VerificationKeyProvider>) -> Self {
        Self { settings, keys }
    }

    /// Verify a token and return its claims.
    ///
    /// Expired tokens fail with [`AuthError::ExpiredCredential`], unparseable
    /// ones with [`AuthError::MalformedToken`], everything else with
    /// [`AuthError::InvalidCredential`].
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> AuthResult<AccessClaims> {
        let header = decode_header(token).map_err(map_jwt_error)?;
        let kid = header.kid.ok_or(InvalidCredential::MissingKeyId)?;

        let key = self.keys.verification_key(&kid).await?;

        let validation = validation(
            self.settings.algorithm,
            &self.settings.issuer,
            &self.settings.audience,
            self.settings.leeway_secs,
        );
        let data = decode::<AccessClaims>(token, &key.decoding_key, &validation)
            .map_err(map_jwt_error)?;

        debug!(sub = %data.claims.sub, %kid, "Access token verified");
        Ok(data.claims)
    }

    /// Verify the token carried by an `Authorization: Bearer` header value.
    ///
    /// A missing or malformed header is a request error, not an
    /// authentication failure.
    pub async fn verify_header(&self, header: Option<&str>) -> AuthResult<AccessClaims> {
        let token = bearer_token(header)?;
        self.verify(token).await
    }
}

/// Build a validation requiring `exp`, `iss`, `aud` and `sub`.
pub(crate) fn validation(
    algorithm: JwtAlgorithm,
    issuer: &str,
    audience: &str,
    leeway_secs: u64,
) -> Validation {
    let mut validation = Validation::new(algorithm.into());
    validation.set_issuer(&[issuer]);
    validation.set_audience(&[audience]);
    validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
    validation.leeway = leeway_secs;
    validation
}

/// Map a jsonwebtoken failure onto the credential error taxonomy.
pub(crate) fn map_jwt_error(e: JwtError) -> AuthError {
    match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::ExpiredCredential,
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => AuthError::MalformedToken(e.to_string()),
        ErrorKind::InvalidSignature => InvalidCredential::Signature.into(),
        ErrorKind::InvalidIssuer => InvalidCredential::Issuer.into(),
        ErrorKind::InvalidAudience => InvalidCredential::Audience.into(),
        ErrorKind::InvalidAlgorithm | ErrorKind::MissingAlgorithm => {
            InvalidCredential::Algorithm.into()
        }
        ErrorKind::MissingRequiredClaim(claim) => {
            InvalidCredential::MissingClaim(claim.clone()).into()
        }
        _ => InvalidCredential::Other(e.to_string()).into(),
    }
}
