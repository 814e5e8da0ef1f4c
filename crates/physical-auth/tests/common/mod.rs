//! Shared fixtures for integration tests.

#![allow(dead_code)]

use jsonwebtoken::{encode, EncodingKey, Header};
use physical_auth::{
    JwtAlgorithm, KeySource, LocalKeyProvider, RefreshExchange, TokenIssuer, TokenSettings,
    TokenVerifier,
};
use physical_store::{MemoryTokenStore, RefreshTokenStore};
use std::path::PathBuf;
use std::sync::Arc;

pub const ACCESS_KID: &str = "physical-access-1";
pub const ROTATED_KID: &str = "physical-access-2";
pub const PROVIDER_KID: &str = "provider-key-1";
pub const CLIENT_ID: &str = "com.spencerhartland.Physical";
pub const PROVIDER_ISSUER: &str = "https://appleid.apple.com";

/// Path of a file under `tests/fixtures`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Contents of a file under `tests/fixtures`.
pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name)).unwrap()
}

/// Key provider holding the primary access key pair.
pub fn access_keys() -> LocalKeyProvider {
    LocalKeyProvider::pair(
        JwtAlgorithm::ES256,
        ACCESS_KID,
        KeySource::File(fixture_path("access_private.pem")),
        KeySource::File(fixture_path("access_public.pem")),
    )
}

/// Issuer, verifier and exchange sharing one in-memory store.
pub struct Harness {
    pub store: Arc<MemoryTokenStore>,
    pub issuer: Arc<TokenIssuer>,
    pub verifier: TokenVerifier,
    pub exchange: RefreshExchange,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryTokenStore::new());
        let keys = Arc::new(access_keys());
        let issuer = Arc::new(TokenIssuer::new(
            TokenSettings::default(),
            keys.clone(),
            store.clone(),
        ));
        Self::assemble(store, issuer, TokenVerifier::new(TokenSettings::default(), keys))
    }

    pub fn assemble(
        store: Arc<MemoryTokenStore>,
        issuer: Arc<TokenIssuer>,
        verifier: TokenVerifier,
    ) -> Self {
        let shared: Arc<dyn RefreshTokenStore> = store.clone();
        Self {
            exchange: RefreshExchange::new(shared, issuer.clone()),
            store,
            issuer,
            verifier,
        }
    }
}

/// Identity assertion claims valid for the next hour.
pub fn identity_claims(subject: &str) -> serde_json::Value {
    let now = chrono::Utc::now().timestamp();
    serde_json::json!({
        "iss": PROVIDER_ISSUER,
        "aud": CLIENT_ID,
        "sub": subject,
        "iat": now,
        "exp": now + 3600,
        "email": "someone@privaterelay.appleid.com",
    })
}

/// Sign `claims` with the provider fixture key under `kid`.
pub fn provider_assertion(kid: &str, claims: &serde_json::Value) -> String {
    let mut header = Header::new(jsonwebtoken::Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(fixture("provider_private.pem").as_bytes()).unwrap();
    encode(&header, claims, &key).unwrap()
}

/// Re-encode the payload of a compact token with `sub` replaced, keeping the
/// existing signature.
pub fn tamper_subject(token: &str, subject: &str) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    let parts: Vec<&str> = token.split('.').collect();
    assert_eq!(parts.len(), 3);

    let mut payload: serde_json::Value =
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
    payload["sub"] = serde_json::Value::String(subject.to_string());
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).unwrap());

    format!("{}.{}.{}", parts[0], payload, parts[2])
}
