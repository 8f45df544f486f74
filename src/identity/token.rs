//! Stateless bearer tokens: HS256-signed compact JWTs carrying the identity claims.
//!
//! Verification order is fixed: the HMAC over the raw segments, then header and
//! claims decoding, then expiry.
//! Expiry is inclusive, so a token whose `exp` equals the current second is rejected.

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::record::Identity;

pub const TOKEN_TYPE: &str = "Bearer";
pub const DEFAULT_TTL_SECS: u64 = 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Identity id.
    pub sub: String,
    pub handle: String,
    /// Display name.
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token signature mismatch")]
    Signature,
    #[error("token expired")]
    Expired,
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("token encoding failed: {0}")]
    Encoding(String),
}

impl TokenError {
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::Signature => "signature",
            TokenError::Expired => "expired",
            TokenError::Malformed(_) => "malformed",
            TokenError::Encoding(_) => "encoding",
        }
    }
}

/// Signing key material and lifetime, built from configuration and handed to the codec.
#[derive(Clone)]
pub struct TokenSettings {
    pub secret: String,
    pub ttl_secs: u64,
}

impl TokenSettings {
    pub fn new(secret: impl Into<String>, ttl_secs: u64) -> Self {
        Self { secret: secret.into(), ttl_secs }
    }
}

impl std::fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSettings").field("secret", &"<redacted>").field("ttl_secs", &self.ttl_secs).finish()
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
    pub expires_in: u64,
}

#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: u64,
}

impl TokenCodec {
    pub fn new(settings: &TokenSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // expiry is checked by hand after the signature so the boundary is inclusive
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims.clear();
        Self {
            encoding: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation,
            ttl_secs: settings.ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> u64 { self.ttl_secs }

    pub fn issue(&self, identity: &Identity) -> Result<IssuedToken, TokenError> {
        self.issue_at(identity, Utc::now())
    }

    pub fn issue_at(&self, identity: &Identity, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let iat = now.timestamp();
        let claims = Claims {
            sub: identity.id.clone(),
            handle: identity.handle.clone(),
            name: identity.display_name.clone(),
            iat,
            exp: iat.saturating_add(i64::try_from(self.ttl_secs).unwrap_or(i64::MAX)),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;
        Ok(IssuedToken { token, claims, expires_in: self.ttl_secs })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let mut segments = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (segments.next(), segments.next(), segments.next(), segments.next())
        else {
            return Err(TokenError::Malformed("expected header.payload.signature".into()));
        };
        // HMAC over the raw `header.payload` bytes before either segment is decoded
        let message = &token[..header.len() + 1 + payload.len()];
        let signed = jsonwebtoken::crypto::verify(signature, message.as_bytes(), &self.decoding, Algorithm::HS256)
            .map_err(|e| TokenError::Malformed(e.to_string()))?;
        if !signed {
            return Err(TokenError::Signature);
        }

        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::Signature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed(e.to_string()),
        })?;
        let claims = data.claims;
        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const KEY: &str = "test-signing-key-that-is-at-least-32-bytes";

    fn identity() -> Identity {
        Identity::new("user@example.com".into(), "alice".into(), "hash".into(), Utc::now())
    }

    fn codec(ttl: u64) -> TokenCodec {
        TokenCodec::new(&TokenSettings::new(KEY, ttl))
    }

    // Flip one character in the middle of the payload segment.
    fn tamper_payload(token: &str) -> String {
        let mut parts: Vec<String> = token.split('.').map(String::from).collect();
        let mid = parts[1].len() / 2;
        flip(&mut parts[1], mid);
        parts.join(".")
    }

    fn flip(segment: &mut String, at: usize) {
        let old = segment.as_bytes()[at] as char;
        let new = if old == 'A' { "B" } else { "A" };
        segment.replace_range(at..at + 1, new);
    }

    #[test]
    fn round_trip_preserves_identity_claims() {
        let c = codec(DEFAULT_TTL_SECS);
        let ident = identity();
        let issued = c.issue(&ident).unwrap();
        assert_eq!(issued.expires_in, 3600);
        assert_eq!(issued.token.split('.').count(), 3);
        let claims = c.verify(&issued.token).unwrap();
        assert_eq!(claims.sub, ident.id);
        assert_eq!(claims.handle, ident.handle);
        assert_eq!(claims.name, ident.display_name);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims, issued.claims);
    }

    #[test]
    fn verify_is_idempotent() {
        let c = codec(DEFAULT_TTL_SECS);
        let issued = c.issue(&identity()).unwrap();
        let a = c.verify(&issued.token).unwrap();
        let b = c.verify(&issued.token).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn expired_token_rejected() {
        let c = codec(DEFAULT_TTL_SECS);
        let issued = c.issue_at(&identity(), Utc::now() - Duration::hours(2)).unwrap();
        assert_eq!(c.verify(&issued.token), Err(TokenError::Expired));
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let c = codec(60);
        let t0 = Utc::now();
        let issued = c.issue_at(&identity(), t0).unwrap();
        assert!(c.verify_at(&issued.token, t0 + Duration::seconds(59)).is_ok());
        assert_eq!(c.verify_at(&issued.token, t0 + Duration::seconds(60)), Err(TokenError::Expired));
        assert_eq!(c.verify_at(&issued.token, t0 + Duration::seconds(61)), Err(TokenError::Expired));
    }

    #[test]
    fn tampered_token_rejected_by_signature() {
        let c = codec(DEFAULT_TTL_SECS);
        let issued = c.issue(&identity()).unwrap();
        let bad = tamper_payload(&issued.token);
        assert_ne!(bad, issued.token);
        assert_eq!(c.verify(&bad), Err(TokenError::Signature));
    }

    #[test]
    fn every_header_byte_is_signature_covered() {
        let c = codec(DEFAULT_TTL_SECS);
        let issued = c.issue(&identity()).unwrap();
        let parts: Vec<String> = issued.token.split('.').map(String::from).collect();
        for at in 0..parts[0].len() {
            let mut altered = parts.clone();
            flip(&mut altered[0], at);
            let bad = altered.join(".");
            assert_eq!(c.verify(&bad), Err(TokenError::Signature), "header byte {at}");
        }
    }

    #[test]
    fn altered_signature_rejected() {
        let c = codec(DEFAULT_TTL_SECS);
        let issued = c.issue(&identity()).unwrap();
        let mut parts: Vec<String> = issued.token.split('.').map(String::from).collect();
        flip(&mut parts[2], 0);
        assert_eq!(c.verify(&parts.join(".")), Err(TokenError::Signature));
    }

    #[test]
    fn signature_checked_before_expiry() {
        let c = codec(DEFAULT_TTL_SECS);
        let issued = c.issue_at(&identity(), Utc::now() - Duration::hours(2)).unwrap();
        assert_eq!(c.verify(&tamper_payload(&issued.token)), Err(TokenError::Signature));
    }

    #[test]
    fn other_key_rejected() {
        let issued = codec(DEFAULT_TTL_SECS).issue(&identity()).unwrap();
        let other = TokenCodec::new(&TokenSettings::new("a-completely-different-signing-key-0123", DEFAULT_TTL_SECS));
        assert_eq!(other.verify(&issued.token), Err(TokenError::Signature));
    }

    #[test]
    fn malformed_tokens() {
        let c = codec(DEFAULT_TTL_SECS);
        for bad in ["", "abc", "a.b", "a.b.c.d", "....."] {
            match c.verify(bad) {
                Err(TokenError::Malformed(_)) => {}
                other => panic!("{bad:?} gave {other:?}"),
            }
        }
        // three segments but unsigned: never reaches the claims
        assert_eq!(c.verify("not.a.token"), Err(TokenError::Signature));
    }

    #[test]
    fn signed_garbage_claims_are_malformed() {
        let c = codec(DEFAULT_TTL_SECS);
        // {"alg":"HS256","typ":"JWT"} . "not json"
        let message = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.bm90IGpzb24";
        let sig = jsonwebtoken::crypto::sign(message.as_bytes(), &EncodingKey::from_secret(KEY.as_bytes()), Algorithm::HS256)
            .unwrap();
        match c.verify(&format!("{message}.{sig}")) {
            Err(TokenError::Malformed(_)) => {}
            other => panic!("gave {other:?}"),
        }
    }

    #[test]
    fn settings_debug_redacts_secret() {
        let s = format!("{:?}", TokenSettings::new(KEY, 5));
        assert!(!s.contains(KEY));
    }
}
