//! Credential wire types
//!
//! JSON shapes exchanged with clients: the issued credential pair, the
//! refresh request body, and the federation response.

use crate::error::{AuthError, AuthResult};
use serde::{Deserialize, Serialize};

/// Access token and refresh token issued together.
///
/// A pair is always produced whole; issuance never returns one half.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    /// Signed access token (short-lived)
    pub access_token: String,

    /// Opaque single-use refresh token (hex)
    pub refresh_token: String,
}

impl CredentialPair {
    /// Create a new credential pair.
    pub fn new(access_token: String, refresh_token: String) -> Self {
        Self {
            access_token,
            refresh_token,
        }
    }
}

/// Body of a refresh exchange request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    /// Refresh token issued with the previous pair
    pub refresh_token: String,
}

impl RefreshRequest {
    /// Parse a request body.
    pub fn from_json(body: &[u8]) -> AuthResult<Self> {
        if body.is_empty() {
            return Err(AuthError::MalformedRequest("Request body is empty".to_string()));
        }
        serde_json::from_slice(body).map_err(|e| {
            AuthError::MalformedRequest(format!("Could not decode the request body: {}", e))
        })
    }
}

/// Result of a successful federation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedCredentials {
    /// Locally issued credentials for the verified subject
    #[serde(flatten)]
    pub credentials: CredentialPair,

    /// Identity provider's own refresh token, passed through uninterpreted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_refresh_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_pair_wire_format() {
        let pair = CredentialPair::new("access".to_string(), "refresh".to_string());
        let json = serde_json::to_value(&pair).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"accessToken": "access", "refreshToken": "refresh"})
        );
    }

    #[test]
    fn test_refresh_request_parsing() {
        let request = RefreshRequest::from_json(br#"{"refreshToken": "abc123"}"#).unwrap();
        assert_eq!(request.refresh_token, "abc123");
    }

    #[test]
    fn test_refresh_request_rejects_bad_bodies() {
        assert!(matches!(
            RefreshRequest::from_json(b""),
            Err(AuthError::MalformedRequest(_))
        ));
        assert!(matches!(
            RefreshRequest::from_json(b"{not json"),
            Err(AuthError::MalformedRequest(_))
        ));
        assert!(matches!(
            RefreshRequest::from_json(br#"{"token": "abc"}"#),
            Err(AuthError::MalformedRequest(_))
        ));
    }

    #[test]
    fn test_federated_credentials_flatten() {
        let creds = FederatedCredentials {
            credentials: CredentialPair::new("a".to_string(), "r".to_string()),
            provider_refresh_token: Some("p".to_string()),
        };
        let json = serde_json::to_value(&creds).unwrap();

        assert_eq!(json["accessToken"], "a");
        assert_eq!(json["refreshToken"], "r");
        assert_eq!(json["providerRefreshToken"], "p");

        let creds = FederatedCredentials {
            provider_refresh_token: None,
            ..creds
        };
        let json = serde_json::to_value(&creds).unwrap();
        assert!(json.get("providerRefreshToken").is_none());
    }
}
