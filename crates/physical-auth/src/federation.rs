//! Identity provider federation
//!
//! Bridges a provider sign-in into local credentials. The identity assertion
//! is verified against the provider's published key set, the accompanying
//! grant is validated at the provider's token endpoint, and only then is a
//! local pair issued for the assertion's subject.

use crate::claims::IdentityClaims;
use crate::credentials::FederatedCredentials;
use crate::error::{AuthError, AuthResult, InvalidCredential};
use crate::issuer::TokenIssuer;
use crate::keys::{JwtAlgorithm, VerificationKeyProvider};
use crate::provider::{Grant, IdentityProviderClient};
use crate::verifier::{map_jwt_error, validation};
use jsonwebtoken::{decode, decode_header};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Recognized grant types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// First sign-in with a one-time authorization code
    AuthorizationCode,
    /// Repeat sign-in with the provider's refresh token
    RefreshToken,
}

impl GrantType {
    /// Parse from the wire value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "authorization_code" => Some(GrantType::AuthorizationCode),
            "refresh_token" => Some(GrantType::RefreshToken),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFederationRequest {
    grant_type: Option<String>,
    identity_token: Option<String>,
    authorization_code: Option<String>,
    refresh_token: Option<String>,
}

/// A validated federation request.
#[derive(Clone)]
pub struct FederationRequest {
    /// Grant to redeem at the provider
    pub grant: Grant,

    /// Identity assertion (signed token) from the provider
    pub identity_token: String,
}

impl fmt::Debug for FederationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FederationRequest")
            .field("grant", &self.grant)
            .field("identity_token", &"[REDACTED]")
            .finish()
    }
}

impl FederationRequest {
    /// Create a request.
    pub fn new(grant: Grant, identity_token: impl Into<String>) -> Self {
        Self {
            grant,
            identity_token: identity_token.into(),
        }
    }

    /// Parse and validate a request body.
    ///
    /// The grant type must be recognized and the field it names
    /// (`authorizationCode` or `refreshToken`) must be present along with
    /// `identityToken`.
    pub fn from_json(body: &[u8]) -> AuthResult<Self> {
        let raw: RawFederationRequest = serde_json::from_slice(body).map_err(|e| {
            AuthError::MalformedRequest(format!("Could not decode the request body: {}", e))
        })?;

        let grant_type = raw.grant_type.ok_or_else(|| missing("grantType"))?;
        let grant = match GrantType::parse(&grant_type) {
            Some(GrantType::AuthorizationCode) => Grant::AuthorizationCode(
                non_empty(raw.authorization_code).ok_or_else(|| missing("authorizationCode"))?,
            ),
            Some(GrantType::RefreshToken) => Grant::RefreshToken(
                non_empty(raw.refresh_token).ok_or_else(|| missing("refreshToken"))?,
            ),
            None => {
                return Err(AuthError::MalformedRequest(format!(
                    "Unrecognized grant type: {}",
                    grant_type
                )))
            }
        };
        let identity_token =
            non_empty(raw.identity_token).ok_or_else(|| missing("identityToken"))?;

        Ok(Self {
            grant,
            identity_token,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn missing(field: &str) -> AuthError {
    AuthError::MalformedRequest(format!("Missing field: {}", field))
}

/// Verifies provider sign-ins and issues local credentials.
pub struct IdentityFederationVerifier {
    audience: String,
    issuer: String,
    algorithm: JwtAlgorithm,
    leeway_secs: u64,
    keys: Arc<dyn VerificationKeyProvider>,
    provider: Arc<dyn IdentityProviderClient>,
    tokens: Arc<TokenIssuer>,
}

impl fmt::Debug for IdentityFederationVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityFederationVerifier")
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl IdentityFederationVerifier {
    /// Create a verifier.
    ///
    /// `audience` is this app's client id at the provider and `issuer` the
    /// provider's assertion issuer.
    pub fn new(
        audience: impl Into<String>,
        issuer: impl Into<String>,
        algorithm: JwtAlgorithm,
        keys: Arc<dyn VerificationKeyProvider>,
        provider: Arc<dyn IdentityProviderClient>,
        tokens: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            audience: audience.into(),
            issuer: issuer.into(),
            algorithm,
            leeway_secs: 0,
            keys,
            provider,
            tokens,
        }
    }

    /// Tolerate `leeway_secs` of clock skew on assertion expiry.
    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway_secs = leeway_secs;
        self
    }

    /// Authenticate a provider sign-in.
    ///
    /// The provider's token endpoint is only called once the assertion has
    /// verified, and local credentials are only issued once the provider has
    /// accepted the grant.
    #[instrument(skip_all, fields(grant_type = request.grant.grant_type()))]
    pub async fn authenticate(
        &self,
        request: &FederationRequest,
    ) -> AuthResult<FederatedCredentials> {
        let identity = self.verify_assertion(&request.identity_token).await?;

        let provider_tokens = self.provider.validate_grant(&request.grant).await?;

        let credentials = self.tokens.issue(&identity.sub).await?;
        info!(sub = %identity.sub, "Federated sign-in succeeded");

        Ok(FederatedCredentials {
            credentials,
            provider_refresh_token: provider_tokens.refresh_token,
        })
    }

    /// Verify an identity assertion and return its claims.
    ///
    /// Any verification failure is [`InvalidCredential::AssertionRejected`]
    /// wrapping the reason, e.g. [`InvalidCredential::KeyNotFound`] or
    /// [`InvalidCredential::Expired`]. Failure to fetch the key set is
    /// [`AuthError::UpstreamFailure`].
    pub async fn verify_assertion(&self, assertion: &str) -> AuthResult<IdentityClaims> {
        self.try_verify_assertion(assertion).await.map_err(|e| {
            let reason = match e {
                AuthError::InvalidCredential(reason) => reason,
                AuthError::ExpiredCredential => InvalidCredential::Expired,
                AuthError::MalformedToken(message) => InvalidCredential::Malformed(message),
                other => return other,
            };
            warn!(%reason, "Identity assertion rejected");
            InvalidCredential::AssertionRejected(Box::new(reason)).into()
        })
    }

    async fn try_verify_assertion(&self, assertion: &str) -> AuthResult<IdentityClaims> {
        let header = decode_header(assertion).map_err(map_jwt_error)?;
        let kid = header.kid.ok_or(InvalidCredential::MissingKeyId)?;

        let key = self.keys.verification_key(&kid).await?;

        let validation = validation(self.algorithm, &self.issuer, &self.audience, self.leeway_secs);
        let data = decode::<IdentityClaims>(assertion, &key.decoding_key, &validation)
            .map_err(map_jwt_error)?;

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(json: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&json).unwrap()
    }

    #[test]
    fn test_parse_authorization_code_request() {
        let body = body(serde_json::json!({
            "grantType": "authorization_code",
            "identityToken": "a.b.c",
            "authorizationCode": "c0de",
        }));

        let request = FederationRequest::from_json(&body).unwrap();

        assert_eq!(request.grant, Grant::AuthorizationCode("c0de".to_string()));
        assert_eq!(request.identity_token, "a.b.c");
    }

    #[test]
    fn test_parse_refresh_token_request() {
        let body = body(serde_json::json!({
            "grantType": "refresh_token",
            "identityToken": "a.b.c",
            "refreshToken": "r1",
        }));

        let request = FederationRequest::from_json(&body).unwrap();

        assert_eq!(request.grant, Grant::RefreshToken("r1".to_string()));
    }

    #[test]
    fn test_unknown_grant_type() {
        let body = body(serde_json::json!({
            "grantType": "password",
            "identityToken": "a.b.c",
            "refreshToken": "r1",
        }));

        let result = FederationRequest::from_json(&body);

        assert!(matches!(
            result,
            Err(AuthError::MalformedRequest(ref m)) if m.contains("password")
        ));
    }

    #[test]
    fn test_grant_field_must_match_type() {
        let body = body(serde_json::json!({
            "grantType": "authorization_code",
            "identityToken": "a.b.c",
            "refreshToken": "r1",
        }));

        let result = FederationRequest::from_json(&body);

        assert!(matches!(
            result,
            Err(AuthError::MalformedRequest(ref m)) if m.contains("authorizationCode")
        ));
    }

    #[test]
    fn test_missing_fields() {
        for body in [
            &br#"{"identityToken":"a.b.c","refreshToken":"r1"}"#[..],
            &br#"{"grantType":"refresh_token","refreshToken":"r1"}"#[..],
            &br#"{"grantType":"refresh_token","identityToken":"","refreshToken":"r1"}"#[..],
            &b"not json"[..],
        ] {
            assert!(matches!(
                FederationRequest::from_json(body),
                Err(AuthError::MalformedRequest(_))
            ));
        }
    }

    #[test]
    fn test_debug_redacts_assertion() {
        let request = FederationRequest::new(Grant::RefreshToken("r1".to_string()), "a.b.c");
        assert!(!format!("{:?}", request).contains("a.b.c"));
    }
}
