use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use sha2::{Sha256, Sha512};

type HmacSha256 = Hmac<Sha256>;

/// Claim mapping carried inside a token body.
pub type Claims = serde_json::Map<String, serde_json::Value>;

/// Default token lifetime: 2 hours.
pub const DEFAULT_TTL_SECS: u64 = 7200;

const PBKDF2_ROUNDS: u32 = 100_000;
const DERIVED_KEY_LEN: usize = 64;
const SALT_LEN: usize = 16;

/// Why a presented token was rejected. The HTTP boundary collapses all three
/// into one generic unauthorized response; the distinction exists for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyError {
    /// Not exactly three non-empty dot-separated parts, or an undecodable body.
    InvalidFormat,
    /// Recomputed signature does not match the presented one.
    InvalidSignature,
    /// The `exp` claim lies strictly in the past.
    Expired,
}

impl std::fmt::Display for VerifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFormat => f.write_str("malformed token"),
            Self::InvalidSignature => f.write_str("signature mismatch"),
            Self::Expired => f.write_str("token expired"),
        }
    }
}

/// Issues and verifies signed, expiring bearer tokens for the dashboard.
/// Stateless: validity is fully determined by signature and expiry, the
/// server keeps no record of issued tokens.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
}

impl TokenService {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Issue a token over `claims`, valid for `ttl_seconds` from now.
    /// The body gains an absolute `exp` claim in whole seconds since epoch.
    pub fn issue(&self, claims: &Claims, ttl_seconds: u64) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);

        let mut body = claims.clone();
        body.insert("exp".to_owned(), (now() + ttl_seconds as i64).into());
        let body = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&serde_json::Value::Object(body))
                .expect("claim maps always serialize"),
        );

        let signature = self.sign(&format!("{header}.{body}"));
        format!("{header}.{body}.{signature}")
    }

    /// Verify a presented token against the current clock and return its
    /// claims (including `username` and `exp`).
    pub fn verify(&self, token: &str) -> Result<Claims, VerifyError> {
        self.verify_at(token, now())
    }

    /// Clock-injected verification; `verify` passes the current time.
    fn verify_at(&self, token: &str, now: i64) -> Result<Claims, VerifyError> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(VerifyError::InvalidFormat);
        }
        let (header, body, signature) = (parts[0], parts[1], parts[2]);

        let expected = self.sign(&format!("{header}.{body}"));
        if !constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
            return Err(VerifyError::InvalidSignature);
        }

        let body = URL_SAFE_NO_PAD
            .decode(body)
            .map_err(|_| VerifyError::InvalidFormat)?;
        let claims = match serde_json::from_slice(&body) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => return Err(VerifyError::InvalidFormat),
        };

        if let Some(exp) = claims.get("exp").and_then(|v| v.as_i64()) {
            if exp < now {
                return Err(VerifyError::Expired);
            }
        }
        Ok(claims)
    }

    /// URL-safe base64 of HMAC-SHA256 over the signing input.
    fn sign(&self, signing_input: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(signing_input.as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }
}

// ── Password hashing ─────────────────────────────────────────────────────────

/// Hash a password into the stored form `salt:derivedKeyHex`.
/// Salt is 16 random bytes hex-encoded; the key is PBKDF2-HMAC-SHA512 over
/// the hex salt string, 100k rounds, 64-byte output.
pub fn hash_password(plain: &str) -> String {
    use rand::Rng;
    let mut salt_bytes = [0u8; SALT_LEN];
    rand::thread_rng().fill(&mut salt_bytes);
    let salt = hex::encode(salt_bytes);

    let derived = derive_key(plain, &salt);
    format!("{salt}:{derived}")
}

/// Check a password against a stored form. Returns false on any malformed
/// stored form rather than erroring, so absent credentials just fail login.
pub fn verify_password(plain: &str, stored: &str) -> bool {
    let Some((salt, expected)) = stored.split_once(':') else {
        return false;
    };
    if salt.is_empty() || expected.is_empty() {
        return false;
    }
    let derived = derive_key(plain, salt);
    constant_time_eq(derived.as_bytes(), expected.as_bytes())
}

fn derive_key(plain: &str, salt: &str) -> String {
    let mut out = [0u8; DERIVED_KEY_LEN];
    pbkdf2_hmac::<Sha512>(plain.as_bytes(), salt.as_bytes(), PBKDF2_ROUNDS, &mut out);
    hex::encode(out)
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret")
    }

    fn admin_claims() -> Claims {
        let mut claims = Claims::new();
        claims.insert("username".into(), "admin".into());
        claims
    }

    #[test]
    fn round_trip_returns_claims_plus_exp() {
        let svc = service();
        let token = svc.issue(&admin_claims(), DEFAULT_TTL_SECS);

        let claims = svc.verify(&token).unwrap();
        assert_eq!(claims["username"], "admin");
        assert!(claims["exp"].as_i64().unwrap() > now());
    }

    #[test]
    fn tampering_with_any_part_is_rejected() {
        let svc = service();
        let token = svc.issue(&admin_claims(), DEFAULT_TTL_SECS);
        let parts: Vec<&str> = token.split('.').collect();

        for i in 0..3 {
            let mut tampered = parts.clone();
            let flipped = if tampered[i].starts_with('A') {
                format!("B{}", &tampered[i][1..])
            } else {
                format!("A{}", &tampered[i][1..])
            };
            tampered[i] = &flipped;
            let err = svc.verify(&tampered.join(".")).unwrap_err();
            assert_eq!(err, VerifyError::InvalidSignature, "part {i}");
        }
    }

    #[test]
    fn wrong_shape_is_invalid_format() {
        let svc = service();
        for bad in ["", "abc", "a.b", "a.b.c.d", "a..c", ".b.c", "a.b."] {
            assert_eq!(svc.verify(bad).unwrap_err(), VerifyError::InvalidFormat);
        }
    }

    #[test]
    fn different_secret_fails_signature() {
        let token = service().issue(&admin_claims(), DEFAULT_TTL_SECS);
        let other = TokenService::new("other-secret");
        assert_eq!(
            other.verify(&token).unwrap_err(),
            VerifyError::InvalidSignature
        );
    }

    #[test]
    fn zero_ttl_token_expires() {
        let svc = service();
        let token = svc.issue(&admin_claims(), 0);
        // One second past issuance the exp claim is strictly in the past.
        assert_eq!(
            svc.verify_at(&token, now() + 1).unwrap_err(),
            VerifyError::Expired
        );
    }

    #[test]
    fn token_without_exp_claim_still_verifies() {
        let svc = service();
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(r#"{"username":"admin"}"#);
        let signature = svc.sign(&format!("{header}.{body}"));
        let claims = svc.verify(&format!("{header}.{body}.{signature}")).unwrap();
        assert_eq!(claims["username"], "admin");
    }

    #[test]
    fn password_round_trip() {
        let stored = hash_password("s3cret كلمة");
        assert!(verify_password("s3cret كلمة", &stored));
        assert!(!verify_password("wrong", &stored));
    }

    #[test]
    fn stored_form_is_salt_colon_hex() {
        let stored = hash_password("pw");
        let (salt, key) = stored.split_once(':').unwrap();
        assert_eq!(salt.len(), SALT_LEN * 2);
        assert_eq!(key.len(), DERIVED_KEY_LEN * 2);
        assert!(salt.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn salts_are_random() {
        assert_ne!(hash_password("pw"), hash_password("pw"));
    }

    #[test]
    fn malformed_stored_forms_never_panic() {
        assert!(!verify_password("pw", ""));
        assert!(!verify_password("pw", "garbage"));
        assert!(!verify_password("pw", ":"));
        assert!(!verify_password("pw", "salt:"));
        assert!(!verify_password("pw", ":key"));
    }
}
