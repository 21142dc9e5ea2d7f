//! Token minting and verification
//!
//! Compact three-segment envelope `header.payload.signature`, each
//! segment base64url without padding. The signature is HMAC-SHA256 over
//! `header.payload` under a secret shared between the issuer and the
//! signaling endpoint. Verification is stateless: no store lookup on the
//! hot path, and the `jti` claim survives so a revocation list can veto
//! individual grants later.

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use crosstalk_protocol::Role;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::claims::GrantClaims;
use crate::error::GrantError;

type HmacSha256 = Hmac<Sha256>;

/// The only header this issuer mints and the only header the verifier
/// accepts. The `alg` a presented token claims is never consulted.
const HEADER_JSON: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Signs and verifies grant tokens under a shared secret
pub struct GrantSigner {
    secret: Zeroizing<Vec<u8>>,
}

/// A freshly minted grant
#[derive(Debug, Clone)]
pub struct IssuedGrant {
    /// Compact token for the client
    pub token: String,
    /// The claims that were signed
    pub claims: GrantClaims,
}

impl GrantSigner {
    /// Create a signer from the shared signing secret
    pub fn new(secret: &[u8]) -> Self {
        Self {
            secret: Zeroizing::new(secret.to_vec()),
        }
    }

    /// Mint a grant for `(tenant, room, user, role)` valid for `ttl`.
    ///
    /// The caller must already have authenticated the tenant and checked
    /// room ownership; this only enforces claim well-formedness.
    pub fn issue(
        &self,
        app_id: &str,
        room_id: &str,
        user_id: &str,
        role: Role,
        ttl: Duration,
    ) -> Result<IssuedGrant, GrantError> {
        let iat = Utc::now().timestamp();
        let exp = iat + ttl.as_secs() as i64;
        let claims = GrantClaims {
            jti: generate_grant_id(),
            app_id: app_id.to_string(),
            room_id: room_id.to_string(),
            user_id: user_id.to_string(),
            role,
            iat,
            exp,
        };
        claims.validate()?;
        let token = self.sign(&claims)?;
        Ok(IssuedGrant { token, claims })
    }

    /// Sign an arbitrary claim set into a compact token.
    ///
    /// Does not validate the claims; `issue` is the checked entry point.
    pub fn sign(&self, claims: &GrantClaims) -> Result<String, GrantError> {
        let payload = serde_json::to_vec(claims)
            .map_err(|e| GrantError::Invalid(format!("encode claims: {}", e)))?;

        let header_b64 = URL_SAFE_NO_PAD.encode(HEADER_JSON);
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload);
        let signing_input = format!("{}.{}", header_b64, payload_b64);

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| GrantError::Invalid(format!("bad signing key: {}", e)))?;
        mac.update(signing_input.as_bytes());
        let sig_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{}.{}", signing_input, sig_b64))
    }

    /// Verify a presented token and return its claims.
    ///
    /// Rejects in order: envelope shape, header (must be the canonical
    /// HS256 header), signature (constant-time), claim decoding, claim
    /// well-formedness, then time bounds. A token whose `exp` equals the
    /// current second is already expired.
    pub fn verify(&self, token: &str) -> Result<GrantClaims, GrantError> {
        let mut parts = token.split('.');
        let (header_b64, payload_b64, sig_b64) = match (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) {
            (Some(h), Some(p), Some(s), None) => (h, p, s),
            _ => return Err(GrantError::Invalid("not a three-segment token".to_string())),
        };

        if header_b64 != URL_SAFE_NO_PAD.encode(HEADER_JSON) {
            return Err(GrantError::Invalid("unrecognized header".to_string()));
        }

        let sig = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| GrantError::Invalid("bad signature encoding".to_string()))?;

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| GrantError::Invalid(format!("bad signing key: {}", e)))?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(payload_b64.as_bytes());
        mac.verify_slice(&sig)
            .map_err(|_| GrantError::Invalid("signature mismatch".to_string()))?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| GrantError::Invalid("bad payload encoding".to_string()))?;
        let claims: GrantClaims = serde_json::from_slice(&payload)
            .map_err(|e| GrantError::Invalid(format!("malformed claims: {}", e)))?;

        claims.validate()?;

        let now = Utc::now().timestamp();
        if now < claims.iat {
            return Err(GrantError::Invalid("not yet valid".to_string()));
        }
        if now >= claims.exp {
            return Err(GrantError::Expired);
        }

        Ok(claims)
    }
}

/// 128-bit random grant id, hex encoded
fn generate_grant_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-signing-secret";

    fn signer() -> GrantSigner {
        GrantSigner::new(SECRET)
    }

    fn fresh_claims() -> GrantClaims {
        let now = Utc::now().timestamp();
        GrantClaims {
            jti: generate_grant_id(),
            app_id: "t1".to_string(),
            room_id: "r1".to_string(),
            user_id: "alice".to_string(),
            role: Role::Host,
            iat: now,
            exp: now + 3600,
        }
    }

    #[test]
    fn test_issue_then_verify_round_trip() {
        let s = signer();
        let issued = s
            .issue("t1", "r1", "alice", Role::Host, Duration::from_secs(3600))
            .unwrap();
        let claims = s.verify(&issued.token).unwrap();
        assert_eq!(claims, issued.claims);
        assert_eq!(claims.jti.len(), 32);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_jti_is_unique_per_issue() {
        let s = signer();
        let a = s
            .issue("t1", "r1", "alice", Role::Host, Duration::from_secs(60))
            .unwrap();
        let b = s
            .issue("t1", "r1", "alice", Role::Host, Duration::from_secs(60))
            .unwrap();
        assert_ne!(a.claims.jti, b.claims.jti);
    }

    #[test]
    fn test_payload_segment_decodes_to_claims() {
        let s = signer();
        let issued = s
            .issue("t1", "r1", "alice", Role::Viewer, Duration::from_secs(60))
            .unwrap();
        let payload_b64 = issued.token.split('.').nth(1).unwrap();
        let payload = URL_SAFE_NO_PAD.decode(payload_b64).unwrap();
        let decoded: GrantClaims = serde_json::from_slice(&payload).unwrap();
        assert_eq!(decoded, issued.claims);
    }

    #[test]
    fn test_wrong_key_rejected() {
        let issued = signer()
            .issue("t1", "r1", "alice", Role::Host, Duration::from_secs(60))
            .unwrap();
        let other = GrantSigner::new(b"a-different-secret");
        assert!(matches!(
            other.verify(&issued.token),
            Err(GrantError::Invalid(_))
        ));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let s = signer();
        let issued = s
            .issue("t1", "r1", "alice", Role::Participant, Duration::from_secs(60))
            .unwrap();
        let mut claims = issued.claims.clone();
        claims.room_id = "another-room".to_string();
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());

        let mut parts: Vec<&str> = issued.token.split('.').collect();
        parts[1] = &forged_payload;
        let forged = parts.join(".");
        assert!(matches!(s.verify(&forged), Err(GrantError::Invalid(_))));
    }

    #[test]
    fn test_alg_none_header_rejected() {
        // A token re-enveloped with an attacker-chosen header must fail
        // even when its signature segment is internally consistent.
        let s = signer();
        let claims = fresh_claims();
        let header_b64 = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let payload_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        let forged = format!("{}.{}.", header_b64, payload_b64);
        assert!(matches!(s.verify(&forged), Err(GrantError::Invalid(_))));
    }

    #[test]
    fn test_exp_exactly_now_is_expired() {
        let s = signer();
        let now = Utc::now().timestamp();
        let mut claims = fresh_claims();
        claims.iat = now - 10;
        claims.exp = now;
        let token = s.sign(&claims).unwrap();
        assert!(matches!(s.verify(&token), Err(GrantError::Expired)));
    }

    #[test]
    fn test_past_exp_is_expired() {
        let s = signer();
        let now = Utc::now().timestamp();
        let mut claims = fresh_claims();
        claims.iat = now - 120;
        claims.exp = now - 60;
        let token = s.sign(&claims).unwrap();
        assert!(matches!(s.verify(&token), Err(GrantError::Expired)));
    }

    #[test]
    fn test_future_iat_rejected() {
        let s = signer();
        let now = Utc::now().timestamp();
        let mut claims = fresh_claims();
        claims.iat = now + 600;
        claims.exp = now + 1200;
        let token = s.sign(&claims).unwrap();
        assert!(matches!(s.verify(&token), Err(GrantError::Invalid(_))));
    }

    #[test]
    fn test_unknown_role_rejected() {
        let s = signer();
        let claims = fresh_claims();
        let mut payload = serde_json::to_value(&claims).unwrap();
        payload["role"] = serde_json::json!("admin");

        // Re-sign the doctored payload with the real key so only the
        // claim decoding can reject it.
        let header_b64 = URL_SAFE_NO_PAD.encode(HEADER_JSON);
        let payload_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).unwrap());
        let signing_input = format!("{}.{}", header_b64, payload_b64);
        let mut mac = HmacSha256::new_from_slice(SECRET).unwrap();
        mac.update(signing_input.as_bytes());
        let sig_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        let token = format!("{}.{}", signing_input, sig_b64);

        assert!(matches!(s.verify(&token), Err(GrantError::Invalid(_))));
    }

    #[test]
    fn test_empty_user_id_rejected_at_verify() {
        let s = signer();
        let mut claims = fresh_claims();
        claims.user_id.clear();
        let token = s.sign(&claims).unwrap();
        assert!(matches!(s.verify(&token), Err(GrantError::Invalid(_))));
    }

    #[test]
    fn test_issue_rejects_empty_user_id() {
        let s = signer();
        assert!(s
            .issue("t1", "r1", "", Role::Host, Duration::from_secs(60))
            .is_err());
    }

    #[test]
    fn test_two_segment_token_rejected() {
        assert!(matches!(
            signer().verify("abc.def"),
            Err(GrantError::Invalid(_))
        ));
    }
}
