//! Slack request signature verification.
//!
//! Slack signs every request with HMAC-SHA256 over
//! `v0:<timestamp>:<raw body>` using the app's signing secret and sends
//! the result as `v0=<hex>` in `X-Slack-Signature`.

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;
use thiserror::Error;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
pub const SIGNATURE_HEADER: &str = "x-slack-signature";
const VERSION: &str = "v0";

/// Why a request was rejected. Never includes the expected signature.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),

    #[error("malformed timestamp header")]
    InvalidTimestamp,

    #[error("request timestamp outside the allowed window")]
    Stale,

    #[error("malformed signature header")]
    InvalidSignature,

    #[error("signature mismatch")]
    SignatureMismatch,
}

pub struct RequestVerifier {
    signing_secret: Zeroizing<String>,
    tolerance: Duration,
    skip: bool,
}

impl std::fmt::Debug for RequestVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestVerifier")
            .field("tolerance", &self.tolerance)
            .field("skip", &self.skip)
            .finish_non_exhaustive()
    }
}

impl RequestVerifier {
    pub fn new(signing_secret: &str, tolerance: Duration) -> Self {
        Self {
            signing_secret: Zeroizing::new(signing_secret.to_string()),
            tolerance,
            skip: false,
        }
    }

    /// Accept every request unchecked. Test harnesses only; the only way
    /// to reach this from the binary is `slack.skip_signature_validation`.
    pub fn skip_verification(mut self) -> Self {
        self.skip = true;
        self
    }

    pub fn is_skipping(&self) -> bool {
        self.skip
    }

    /// `v0=<hex>` signature for a timestamp and body.
    pub fn sign(&self, timestamp: i64, body: &[u8]) -> String {
        let mac = self.mac(timestamp, body);
        format!("{}={}", VERSION, hex::encode(mac.finalize().into_bytes()))
    }

    /// Verify against the current wall clock.
    pub fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), VerifyError> {
        self.verify_at(headers, body, chrono::Utc::now().timestamp())
    }

    pub fn verify_at(&self, headers: &HeaderMap, body: &[u8], now: i64) -> Result<(), VerifyError> {
        if self.skip {
            return Ok(());
        }

        let timestamp = header(headers, TIMESTAMP_HEADER)?
            .trim()
            .parse::<i64>()
            .map_err(|_| VerifyError::InvalidTimestamp)?;
        if now.abs_diff(timestamp) > self.tolerance.as_secs() {
            return Err(VerifyError::Stale);
        }

        let signature = header(headers, SIGNATURE_HEADER)?;
        let digest = signature
            .strip_prefix("v0=")
            .and_then(|hex_sig| hex::decode(hex_sig).ok())
            .ok_or(VerifyError::InvalidSignature)?;

        // verify_slice compares in constant time
        self.mac(timestamp, body)
            .verify_slice(&digest)
            .map_err(|_| VerifyError::SignatureMismatch)
    }

    fn mac(&self, timestamp: i64, body: &[u8]) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(self.signing_secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(VERSION.as_bytes());
        mac.update(b":");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b":");
        mac.update(body);
        mac
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, VerifyError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or(VerifyError::MissingHeader(name))
}
