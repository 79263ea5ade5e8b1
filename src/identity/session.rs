//! Signed session tokens: compact JWS, HMAC-SHA256, base64url without padding.
//!
//! Verification order matters. The header's `alg` is checked before any MAC work, the
//! MAC is computed over the exact `header.payload` text received (never a re-encoding),
//! and only then is the payload parsed and its expiry checked. Every failure reaches the
//! caller as the same `AuthError`; the reason is logged at debug level only.

use anyhow::{anyhow, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use super::principal::{Claims, IdentityRef};
use crate::config::TokenConfig;

type HmacSha256 = Hmac<Sha256>;

const ALG: &str = "HS256";

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("invalid session token")]
pub struct AuthError;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

/// Issues and verifies session tokens with the one process-wide secret.
#[derive(Clone)]
pub struct TokenService {
    mac: HmacSha256,
    ttl_secs: i64,
}

impl TokenService {
    pub fn new(cfg: &TokenConfig) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(cfg.secret.as_bytes()).map_err(|e| anyhow!("token key rejected: {e}"))?;
        Ok(Self { mac, ttl_secs: cfg.ttl_secs })
    }

    pub fn ttl_secs(&self) -> i64 { self.ttl_secs }

    pub fn issue(&self, identity: &IdentityRef) -> Result<String> {
        self.issue_at(identity, Utc::now().timestamp())
    }

    pub(crate) fn issue_at(&self, identity: &IdentityRef, now: i64) -> Result<String> {
        let header = Header { alg: ALG.to_string(), typ: Some("JWT".to_string()) };
        let claims = Claims { sub: identity.clone(), iat: now, exp: now + self.ttl_secs };
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?)
        );
        let sig = self.sign(signing_input.as_bytes());
        Ok(format!("{signing_input}.{sig}"))
    }

    fn sign(&self, input: &[u8]) -> String {
        let mut mac = self.mac.clone();
        mac.update(input);
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    pub(crate) fn verify_at(&self, token: &str, now: i64) -> Result<Claims, AuthError> {
        self.check(token, now).map_err(|reason| {
            tracing::debug!(target: "teller::auth", "token rejected: {reason}");
            AuthError
        })
    }

    fn check(&self, token: &str, now: i64) -> Result<Claims, &'static str> {
        let mut parts = token.split('.');
        let (Some(h), Some(p), Some(s), None) = (parts.next(), parts.next(), parts.next(), parts.next()) else {
            return Err("segment count");
        };

        let header_bytes = URL_SAFE_NO_PAD.decode(h).map_err(|_| "header encoding")?;
        let header: Header = serde_json::from_slice(&header_bytes).map_err(|_| "header json")?;
        if header.alg != ALG {
            return Err("algorithm");
        }

        let sig = URL_SAFE_NO_PAD.decode(s).map_err(|_| "signature encoding")?;
        let mut mac = self.mac.clone();
        mac.update(&token.as_bytes()[..h.len() + 1 + p.len()]);
        mac.verify_slice(&sig).map_err(|_| "signature")?;

        let payload = URL_SAFE_NO_PAD.decode(p).map_err(|_| "payload encoding")?;
        let claims: Claims = serde_json::from_slice(&payload).map_err(|_| "payload json")?;
        if now >= claims.exp {
            return Err("expired");
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str, ttl_secs: i64) -> TokenService {
        TokenService::new(&TokenConfig { secret: secret.to_string(), ttl_secs }).unwrap()
    }

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn issue_then_verify_returns_claims() {
        let svc = service(SECRET, 900);
        let id = IdentityRef::AccountNumber(123456);
        let token = svc.issue_at(&id, 1_000).unwrap();
        let claims = svc.verify_at(&token, 1_000).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.iat, 1_000);
        assert_eq!(claims.exp, 1_900);
        assert_eq!(token.matches('.').count(), 2);
        assert!(!token.contains('='));
    }

    #[test]
    fn expiry_is_exclusive() {
        let svc = service(SECRET, 60);
        let token = svc.issue_at(&IdentityRef::Username("$A.B#1000".into()), 100).unwrap();
        assert!(svc.verify_at(&token, 159).is_ok());
        assert_eq!(svc.verify_at(&token, 160), Err(AuthError));
        assert_eq!(svc.verify_at(&token, 10_000), Err(AuthError));
    }

    #[test]
    fn zero_ttl_token_is_already_expired() {
        let svc = service(SECRET, 0);
        let token = svc.issue(&IdentityRef::AccountNumber(111111)).unwrap();
        assert_eq!(svc.verify(&token), Err(AuthError));
    }

    #[test]
    fn any_single_bit_flip_is_rejected() {
        let svc = service(SECRET, 900);
        let token = svc.issue_at(&IdentityRef::AccountNumber(222222), 0).unwrap();
        let bytes = token.as_bytes();
        for i in 0..bytes.len() {
            let mut tampered = bytes.to_vec();
            tampered[i] ^= 1;
            let Ok(t) = String::from_utf8(tampered) else { continue };
            assert_eq!(svc.verify_at(&t, 0), Err(AuthError), "flip at byte {i} accepted");
        }
    }

    #[test]
    fn other_secret_is_rejected() {
        let a = service(SECRET, 900);
        let b = service("fedcba9876543210fedcba9876543210", 900);
        let token = a.issue_at(&IdentityRef::AccountNumber(333333), 0).unwrap();
        assert_eq!(b.verify_at(&token, 0), Err(AuthError));
    }

    #[test]
    fn foreign_algorithms_are_rejected() {
        let svc = service(SECRET, 900);
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"444444","iat":0,"exp":9999999999}"#);

        let none_header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        assert_eq!(svc.verify_at(&format!("{none_header}.{payload}."), 0), Err(AuthError));

        // correctly MACed but labelled with another algorithm
        let hs512 = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS512","typ":"JWT"}"#);
        let input = format!("{hs512}.{payload}");
        let sig = svc.sign(input.as_bytes());
        assert_eq!(svc.verify_at(&format!("{input}.{sig}"), 0), Err(AuthError));

        // same thing labelled HS256 passes, proving only the label differed
        let hs256 = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let input = format!("{hs256}.{payload}");
        let sig = svc.sign(input.as_bytes());
        assert!(svc.verify_at(&format!("{input}.{sig}"), 0).is_ok());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let svc = service(SECRET, 900);
        let good = svc.issue_at(&IdentityRef::AccountNumber(555555), 0).unwrap();
        let extra = format!("{good}.extra");
        for bad in ["", ".", "..", "a.b.c", "a.b.c.d", extra.as_str(), &good[..good.len() - 4]] {
            assert_eq!(svc.verify_at(bad, 0), Err(AuthError), "accepted {bad:?}");
        }

        // valid MAC over a payload that is not claims
        let h = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256"}"#);
        let p = URL_SAFE_NO_PAD.encode(b"not json");
        let input = format!("{h}.{p}");
        let sig = svc.sign(input.as_bytes());
        assert_eq!(svc.verify_at(&format!("{input}.{sig}"), 0), Err(AuthError));
    }
}
