//! Cookie signing and verification
//!
//! The signer embeds a session identifier in a small JSON payload, signs
//! the serialized bytes with HMAC-SHA256 under the shared secret, and
//! emits `base64url(payload).base64url(signature)`. Verification
//! recomputes the signature and compares in constant time, so tampered or
//! foreign cookies are rejected without leaking timing information.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

use crate::config::SessionConfig;
use crate::error::{Result, TidegateError};

type HmacSha256 = Hmac<Sha256>;

/// Why a signed cookie value failed verification.
///
/// Verification failures are expected traffic (stale browsers, tampering,
/// other deployments' cookies) and are handled by issuing a new session,
/// never surfaced to the client as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("malformed cookie value")]
    Malformed,
    #[error("signature mismatch")]
    SignatureMismatch,
    #[error("signature expired")]
    Expired,
}

/// Signs and verifies session-identifier cookies with a symmetric secret.
///
/// Shared read-only across concurrent requests.
#[derive(Clone)]
pub struct CookieSigner {
    secret: Vec<u8>,
    cookie_name: String,
    /// Expiry window in seconds; 0 disables the check.
    max_age: u64,
}

impl CookieSigner {
    /// Create a signer from the session configuration.
    ///
    /// # Errors
    ///
    /// Fails when `config.secret_key` is absent. Callers should treat this
    /// as a startup error, not a request-time condition.
    pub fn new(config: &SessionConfig) -> Result<Self> {
        let secret = config.secret_key.as_ref().ok_or_else(|| {
            TidegateError::internal(
                "Session signing requires a secret key. \
                Set TIDEGATE_SESSION_SECRET_KEY or config.secret_key. \
                Generate one with: openssl rand -hex 32",
            )
        })?;

        Ok(Self {
            secret: secret.as_bytes().to_vec(),
            cookie_name: config.cookie_name.clone(),
            max_age: config.cookie_max_age_seconds,
        })
    }

    /// Sign a session identifier into an opaque cookie value.
    pub fn sign(&self, session_id: &str) -> String {
        let mut payload = serde_json::Map::new();
        payload.insert(
            self.cookie_name.clone(),
            serde_json::Value::String(session_id.to_string()),
        );
        payload.insert("iat".to_string(), serde_json::Value::from(unix_now()));

        let payload_bytes =
            serde_json::to_vec(&serde_json::Value::Object(payload)).expect("payload is a string map");
        let signature = self.compute_signature(&payload_bytes);

        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload_bytes),
            URL_SAFE_NO_PAD.encode(signature)
        )
    }

    /// Verify a signed cookie value and extract the session identifier.
    ///
    /// Returns the embedded identifier on success. All malformed shapes
    /// (missing separator, bad base64, bad JSON, missing fields) report
    /// [`VerifyError::Malformed`]; a valid shape with a wrong signature
    /// reports [`VerifyError::SignatureMismatch`]; a correctly signed
    /// payload older than the configured window reports
    /// [`VerifyError::Expired`].
    pub fn verify(&self, value: &str) -> std::result::Result<String, VerifyError> {
        let (payload_b64, signature_b64) =
            value.split_once('.').ok_or(VerifyError::Malformed)?;
        if payload_b64.is_empty() || signature_b64.is_empty() || signature_b64.contains('.') {
            return Err(VerifyError::Malformed);
        }

        let payload_bytes = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| VerifyError::Malformed)?;
        let provided = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| VerifyError::Malformed)?;

        let expected = self.compute_signature(&payload_bytes);
        if !constant_time_compare(&expected, &provided) {
            return Err(VerifyError::SignatureMismatch);
        }

        let payload: serde_json::Value =
            serde_json::from_slice(&payload_bytes).map_err(|_| VerifyError::Malformed)?;

        if self.max_age > 0 {
            let iat = payload
                .get("iat")
                .and_then(serde_json::Value::as_u64)
                .ok_or(VerifyError::Malformed)?;
            if unix_now().saturating_sub(iat) > self.max_age {
                return Err(VerifyError::Expired);
            }
        }

        payload
            .get(&self.cookie_name)
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or(VerifyError::Malformed)
    }

    /// Sign an arbitrary opaque token as `value.base64url(signature)`.
    ///
    /// For one-off tokens (email verification, CSRF) that share the cookie
    /// signer's HMAC discipline without the payload envelope.
    pub fn sign_token(&self, value: &str) -> String {
        let signature = self.compute_signature(value.as_bytes());
        format!("{}.{}", value, URL_SAFE_NO_PAD.encode(signature))
    }

    /// Verify a token produced by [`CookieSigner::sign_token`], returning
    /// the original value.
    pub fn verify_token(&self, token: &str) -> std::result::Result<String, VerifyError> {
        let (value, signature_b64) = token.rsplit_once('.').ok_or(VerifyError::Malformed)?;
        let provided = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| VerifyError::Malformed)?;

        let expected = self.compute_signature(value.as_bytes());
        if !constant_time_compare(&expected, &provided) {
            return Err(VerifyError::SignatureMismatch);
        }

        Ok(value.to_string())
    }

    fn compute_signature(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Constant-time comparison to prevent timing attacks
///
/// Uses the `subtle` crate, which resists compiler optimizations that
/// would reintroduce timing-leaking branches.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
