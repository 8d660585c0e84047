//! Signed session tokens
//!
//! Tokens are HS256 JWTs with three claims: `payload` (the caller's value
//! serialized to JSON text), `iat` and `exp`. The signer never looks inside
//! the payload; call sites pick their own decode target.

use crate::keys::SigningKey;
use crate::{CryptoError, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<String>,
    iat: i64,
    exp: i64,
}

/// Issues and verifies session tokens under a single HMAC secret
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl TokenSigner {
    /// Create a signer for `key` issuing tokens valid for `ttl`
    pub fn new(key: SigningKey, ttl: Duration) -> Result<Self> {
        let ttl_secs = i64::try_from(ttl.as_secs())
            .map_err(|_| CryptoError::Configuration("token TTL is too large".to_string()))?;
        if ttl_secs <= 0 {
            return Err(CryptoError::Configuration(
                "token TTL must be at least one second".to_string(),
            ));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        Ok(Self {
            encoding: EncodingKey::from_secret(key.as_bytes()),
            decoding: DecodingKey::from_secret(key.as_bytes()),
            validation,
            ttl_secs,
        })
    }

    /// Build a signer from configured key material.
    ///
    /// A missing secret is fatal unless `allow_ephemeral` is set, in which
    /// case a random key is generated and a warning is logged. A secret that
    /// is present but too short is always fatal.
    pub fn from_config(secret: Option<&str>, ttl: Duration, allow_ephemeral: bool) -> Result<Self> {
        let key = match secret.map(str::trim).filter(|s| !s.is_empty()) {
            Some(secret) => SigningKey::from_config(secret)?,
            None if allow_ephemeral => {
                tracing::warn!(
                    "⚠️  No signing secret configured; using an EPHEMERAL key. \
                     Tokens will not survive a restart. Never do this in production!"
                );
                SigningKey::generate()
            }
            None => {
                return Err(CryptoError::MissingKey(
                    "signing secret is not configured; provide a Base64 key of at least \
                     256 bits (generate one with `sentinel-gateway --generate-secret`)"
                        .to_string(),
                ))
            }
        };

        tracing::info!(key_len = key.len(), "Token signing key initialized");
        Self::new(key, ttl)
    }

    /// Issue a token carrying `payload`
    pub fn issue<T: Serialize + ?Sized>(&self, payload: &T) -> Result<String> {
        self.issue_at(payload, Utc::now().timestamp())
    }

    fn issue_at<T: Serialize + ?Sized>(&self, payload: &T, issued_at: i64) -> Result<String> {
        let payload = serde_json::to_string(payload)
            .map_err(|e| CryptoError::Signing(format!("payload is not serializable: {}", e)))?;

        let claims = SessionClaims {
            payload: Some(payload),
            iat: issued_at,
            exp: issued_at + self.ttl_secs,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| CryptoError::Signing(e.to_string()))
    }

    /// Check a token's signature, structure and expiry.
    ///
    /// Never fails; forged, malformed and expired tokens are all `false`.
    pub fn validate(&self, token: &str) -> bool {
        match self.verify(token) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("Token validation failed: {}", e);
                false
            }
        }
    }

    /// Verify a token and deserialize its payload into `T`
    pub fn decode<T: DeserializeOwned>(&self, token: &str) -> Result<T> {
        let claims = self.verify(token)?;
        let payload = claims.payload.ok_or_else(|| {
            CryptoError::InvalidToken("token does not contain a payload claim".to_string())
        })?;

        serde_json::from_str(&payload).map_err(|e| {
            CryptoError::InvalidToken(format!("payload does not match the requested shape: {}", e))
        })
    }

    /// Configured token lifetime
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs as u64)
    }

    fn verify(&self, token: &str) -> Result<SessionClaims> {
        let claims = decode::<SessionClaims>(token.trim(), &self.decoding, &self.validation)
            .map_err(|e| CryptoError::InvalidToken(e.to_string()))?
            .claims;

        if claims.exp <= claims.iat {
            return Err(CryptoError::InvalidToken(
                "token expires before it was issued".to_string(),
            ));
        }
        Ok(claims)
    }
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Identity {
        id: u64,
        username: String,
    }

    fn signer_with(key: &SigningKey, ttl_secs: u64) -> TokenSigner {
        TokenSigner::new(key.clone(), Duration::from_secs(ttl_secs)).unwrap()
    }

    fn signer() -> TokenSigner {
        signer_with(&SigningKey::generate(), 3600)
    }

    #[test]
    fn test_issue_then_validate() {
        let signer = signer();
        let token = signer.issue(&json!({"username": "bob"})).unwrap();
        assert!(signer.validate(&token));
    }

    #[test]
    fn test_decode_typed_payload() {
        let signer = signer();
        let identity = Identity {
            id: 7,
            username: "bob".to_string(),
        };
        let token = signer.issue(&identity).unwrap();
        let decoded: Identity = signer.decode(&token).unwrap();
        assert_eq!(decoded, identity);
    }

    #[test]
    fn test_decode_wrong_shape_is_invalid_token() {
        let signer = signer();
        let token = signer.issue(&json!("just a string")).unwrap();
        let result: Result<Identity> = signer.decode(&token);
        assert!(matches!(result, Err(CryptoError::InvalidToken(_))));
    }

    #[test]
    fn test_expired_token() {
        let signer = signer();
        let issued_at = Utc::now().timestamp() - 7200;
        let token = signer.issue_at(&json!({"username": "bob"}), issued_at).unwrap();

        assert!(!signer.validate(&token));
        let result: Result<serde_json::Value> = signer.decode(&token);
        assert!(matches!(result, Err(CryptoError::InvalidToken(_))));
    }

    #[test]
    fn test_short_ttl_elapses() {
        let signer = signer_with(&SigningKey::generate(), 1);
        let token = signer.issue(&json!({"username": "bob"})).unwrap();
        assert!(signer.validate(&token));

        std::thread::sleep(Duration::from_millis(2100));
        assert!(!signer.validate(&token));
    }

    #[test]
    fn test_forged_token_rejected() {
        let token = signer().issue(&json!({"username": "mallory"})).unwrap();
        assert!(!signer().validate(&token));
    }

    #[test]
    fn test_garbage_rejected() {
        let signer = signer();
        assert!(!signer.validate(""));
        assert!(!signer.validate("not.a.jwt"));
        assert!(!signer.validate("abc"));
    }

    #[test]
    fn test_missing_payload_claim() {
        let key = SigningKey::generate();
        let signer = signer_with(&key, 3600);
        let now = Utc::now().timestamp();
        let claims = json!({"iat": now, "exp": now + 60});
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(key.as_bytes()),
        )
        .unwrap();

        // Structurally valid, so validate accepts it, but there is nothing to decode
        assert!(signer.validate(&token));
        let result: Result<serde_json::Value> = signer.decode(&token);
        match result {
            Err(CryptoError::InvalidToken(msg)) => assert!(msg.contains("payload")),
            other => panic!("expected InvalidToken, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let result = TokenSigner::new(SigningKey::generate(), Duration::from_secs(0));
        assert!(matches!(result, Err(CryptoError::Configuration(_))));
    }

    #[test]
    fn test_from_config_requires_secret() {
        let result = TokenSigner::from_config(None, Duration::from_secs(60), false);
        assert!(matches!(result, Err(CryptoError::MissingKey(_))));

        let result = TokenSigner::from_config(Some("  "), Duration::from_secs(60), false);
        assert!(matches!(result, Err(CryptoError::MissingKey(_))));
    }

    #[test]
    fn test_from_config_ephemeral_only_when_allowed() {
        let signer = TokenSigner::from_config(None, Duration::from_secs(60), true).unwrap();
        let token = signer.issue(&json!({"dev": true})).unwrap();
        assert!(signer.validate(&token));
    }

    #[test]
    fn test_from_config_short_secret_is_fatal_even_in_dev() {
        let result = TokenSigner::from_config(Some("c2hvcnQ="), Duration::from_secs(60), true);
        assert!(matches!(result, Err(CryptoError::InvalidKey(_))));
    }

    #[test]
    fn test_same_secret_shares_tokens() {
        let secret = crate::generate_base64_secret(256);
        let a = TokenSigner::from_config(Some(&secret), Duration::from_secs(60), false).unwrap();
        let b = TokenSigner::from_config(Some(&secret), Duration::from_secs(60), false).unwrap();
        let token = a.issue(&json!({"username": "bob"})).unwrap();
        assert!(b.validate(&token));
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_issue(payload in proptest::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..8)) {
            let signer = signer_with(&SigningKey::from_bytes(&[3u8; 32]).unwrap(), 600);
            let token = signer.issue(&payload).unwrap();
            let decoded: BTreeMap<String, i64> = signer.decode(&token).unwrap();
            prop_assert_eq!(decoded, payload);
        }
    }
}
