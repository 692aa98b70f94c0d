//! Session token codec — HS256 JWT signing and verification.
//!
//! Token states: `Unverified` (parsed) → `Verified` (signature and expiry
//! checked). There is no partially trusted state in between: `verify` either
//! returns the embedded claims unchanged or a [`TokenError`].
//!
//! The algorithm is pinned server-side. The `alg` field of an incoming
//! header is checked against [`PINNED_ALGORITHM`] before any key material is
//! touched, so `none`, `HS512` or an asymmetric algorithm presented by a
//! client is a signature failure, never a negotiation.

use std::collections::HashSet;

use base64::Engine;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Deserialize;

use crate::errors::TokenError;
use crate::models::session::{Identity, SessionClaims};

pub const PINNED_ALGORITHM: Algorithm = Algorithm::HS256;
const PINNED_ALGORITHM_NAME: &str = "HS256";

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// Signs and verifies session tokens with an injected symmetric key.
///
/// Holds no mutable state; share it freely across request workers.
#[derive(Clone)]
pub struct SessionCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    ttl_secs: i64,
}

impl SessionCodec {
    pub fn new(signing_key: &[u8], issuer: impl Into<String>, ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(signing_key),
            decoding: DecodingKey::from_secret(signing_key),
            issuer: issuer.into(),
            ttl_secs,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Build claims for `identity` valid from now for the configured lifetime,
    /// and sign them.
    pub fn issue(&self, identity: Identity) -> Result<(String, SessionClaims), TokenError> {
        let claims = SessionClaims::new(
            identity,
            &self.issuer,
            chrono::Utc::now().timestamp(),
            self.ttl_secs,
        )?;
        let token = self.sign(&claims)?;
        Ok((token, claims))
    }

    pub fn sign(&self, claims: &SessionClaims) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(PINNED_ALGORITHM), claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.verify_at(token, chrono::Utc::now().timestamp())
    }

    /// Verify `token` as of `now` (Unix seconds).
    pub fn verify_at(&self, token: &str, now: i64) -> Result<SessionClaims, TokenError> {
        let header_segment = match token.split('.').collect::<Vec<_>>().as_slice() {
            [header, payload, signature]
                if !header.is_empty() && !payload.is_empty() && !signature.is_empty() =>
            {
                *header
            }
            _ => return Err(TokenError::Malformed),
        };

        let header_bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(header_segment)
            .map_err(|_| TokenError::Malformed)?;
        let header: RawHeader =
            serde_json::from_slice(&header_bytes).map_err(|_| TokenError::Malformed)?;
        if header.alg != PINNED_ALGORITHM_NAME {
            tracing::warn!(alg = %header.alg, "session token presented with unexpected algorithm");
            return Err(TokenError::SignatureInvalid);
        }

        // Expiry is checked below against `now` with no leeway
        let mut validation = Validation::new(PINNED_ALGORITHM);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["exp".to_string()]);

        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::SignatureInvalid
                }
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })?;

        if now >= data.claims.expires_at {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    const KEY: &[u8] = b"test-signing-key-0123456789abcdef";

    fn codec() -> SessionCodec {
        SessionCodec::new(KEY, "keysmith", 86_400)
    }

    fn identity() -> Identity {
        Identity {
            subject_id: "user-123".into(),
            email: "qa@example.com".into(),
            roles: BTreeSet::from(["admin".to_string(), "tester".to_string()]),
        }
    }

    fn engine() -> base64::engine::GeneralPurpose {
        base64::engine::general_purpose::URL_SAFE_NO_PAD
    }

    /// Flip the first character of the signature segment.
    fn tamper(token: &str) -> String {
        let (head, sig) = token.rsplit_once('.').unwrap();
        let mut chars: Vec<char> = sig.chars().collect();
        chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
        format!("{}.{}", head, chars.into_iter().collect::<String>())
    }

    #[test]
    fn test_round_trip_returns_claims_unchanged() {
        let codec = codec();
        let (token, claims) = codec.issue(identity()).unwrap();
        assert_eq!(claims.expires_at - claims.issued_at, 86_400);
        assert_eq!(codec.verify(&token).unwrap(), claims);
        assert!(claims.has_role("tester"));
    }

    #[test]
    fn test_wire_format_uses_registered_claim_names() {
        let codec = codec();
        let (token, _) = codec.issue(identity()).unwrap();
        let payload = token.split('.').nth(1).unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&engine().decode(payload).unwrap()).unwrap();
        assert_eq!(json["user_id"], "user-123");
        assert_eq!(json["iss"], "keysmith");
        assert!(json["exp"].is_i64());
        assert!(json["iat"].is_i64());

        let header = token.split('.').next().unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&engine().decode(header).unwrap()).unwrap();
        assert_eq!(json["alg"], "HS256");
    }

    #[test]
    fn test_different_key_is_signature_invalid() {
        let (token, _) = codec().issue(identity()).unwrap();
        let other = SessionCodec::new(b"another-signing-key-0123456789abc", "keysmith", 86_400);
        assert_eq!(other.verify(&token), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn test_tampered_signature_is_signature_invalid() {
        let (token, _) = codec().issue(identity()).unwrap();
        assert_eq!(codec().verify(&tamper(&token)), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let codec = codec();
        let (token, claims) = codec.issue(identity()).unwrap();
        let mut forged = claims.clone();
        forged.roles.insert("superuser".into());
        let forged_payload = engine().encode(serde_json::to_vec(&forged).unwrap());
        let parts: Vec<&str> = token.split('.').collect();
        let spliced = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
        assert_eq!(codec.verify(&spliced), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn test_expired_even_with_valid_signature() {
        let codec = codec();
        let claims = SessionClaims::new(identity(), "keysmith", 1_000_000, 60).unwrap();
        let token = codec.sign(&claims).unwrap();

        assert_eq!(codec.verify_at(&token, 1_000_059).unwrap(), claims);
        assert_eq!(codec.verify_at(&token, 1_000_060), Err(TokenError::Expired));
        assert_eq!(codec.verify_at(&token, 1_000_061), Err(TokenError::Expired));
        assert_eq!(codec.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_issue_with_unrepresentable_lifetime_fails_cleanly() {
        let codec = SessionCodec::new(KEY, "keysmith", i64::MAX);
        assert!(matches!(codec.issue(identity()), Err(TokenError::Signing(_))));
    }

    #[test]
    fn test_other_hmac_algorithm_is_signature_invalid() {
        let claims = SessionClaims::new(identity(), "keysmith", chrono::Utc::now().timestamp(), 600).unwrap();
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(KEY),
        )
        .unwrap();
        assert_eq!(codec().verify(&token), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn test_alg_none_is_signature_invalid() {
        let claims = SessionClaims::new(identity(), "keysmith", chrono::Utc::now().timestamp(), 600).unwrap();
        let header = engine().encode(r#"{"alg":"none","typ":"JWT"}"#);
        let payload = engine().encode(serde_json::to_vec(&claims).unwrap());
        let token = format!("{}.{}.x", header, payload);
        assert_eq!(codec().verify(&token), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn test_malformed_tokens() {
        let codec = codec();
        for token in [
            "",
            "not-a-jwt",
            "a.b",
            "a.b.c.d",
            "..",
            "!!!.payload.sig",
            &format!("{}.e30.sig", engine().encode("not json")),
        ] {
            assert_eq!(codec.verify(token), Err(TokenError::Malformed), "token: {token:?}");
        }
    }

    #[test]
    fn test_missing_claims_is_malformed() {
        let header = Header::new(Algorithm::HS256);
        let token = jsonwebtoken::encode(
            &header,
            &serde_json::json!({"user_id": "u1", "exp": 9_999_999_999i64}),
            &EncodingKey::from_secret(KEY),
        )
        .unwrap();
        assert_eq!(codec().verify(&token), Err(TokenError::Malformed));
    }
}
