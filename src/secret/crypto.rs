//! Per-secret encryption.
//!
//! Uses:
//! - 128-bit random secret IDs (the only key material, never stored)
//! - BLAKE3 key derivation from the secret ID
//! - ChaCha20-Poly1305 for authenticated encryption
//! - SHA-256 of the secret ID as the storage key

use base64::{
    engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD},
    Engine,
};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;
use zeroize::Zeroizing;

const KEY_CONTEXT: &str = "secretmessage 2024-01-01 secret message encryption key";
const SECRET_ID_BYTES: usize = 16;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Cryptographic errors
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid base64 encoding: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Ciphertext too short")]
    Truncated,

    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed - invalid ciphertext or wrong key")]
    DecryptionFailed,
}

/// Result type for crypto operations
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Identifier of one secret.
///
/// Doubles as the decryption key, so it is zeroized on drop and never
/// printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretId(Zeroizing<String>);

impl SecretId {
    /// Generate a fresh identifier from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; SECRET_ID_BYTES]);
        OsRng.fill_bytes(&mut bytes[..]);
        Self(Zeroizing::new(URL_SAFE_NO_PAD.encode(&bytes[..])))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under which this secret's ciphertext is stored.
    pub fn storage_key(&self) -> String {
        hash(self.as_str())
    }
}

impl From<String> for SecretId {
    fn from(value: String) -> Self {
        Self(Zeroizing::new(value))
    }
}

impl From<&str> for SecretId {
    fn from(value: &str) -> Self {
        Self(Zeroizing::new(value.to_string()))
    }
}

impl fmt::Debug for SecretId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretId(<redacted>)")
    }
}

/// One-way hash used for storage keys (hex SHA-256).
pub fn hash(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// Short hash for log correlation.
pub fn fingerprint(value: &str) -> String {
    let mut digest = hash(value);
    digest.truncate(12);
    digest
}

fn cipher_for(secret_id: &SecretId) -> ChaCha20Poly1305 {
    let key = Zeroizing::new(blake3::derive_key(KEY_CONTEXT, secret_id.as_str().as_bytes()));
    ChaCha20Poly1305::new(Key::from_slice(&key[..]))
}

/// Encrypt `plaintext` under the key derived from `secret_id`.
///
/// Output is base64 of `nonce || ciphertext || tag`.
pub fn encrypt(plaintext: &str, secret_id: &SecretId) -> CryptoResult<String> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher_for(secret_id)
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(sealed))
}

/// Decrypt a value produced by [`encrypt`].
///
/// Any tampering, truncation or wrong `secret_id` yields an error, never
/// partial plaintext.
pub fn decrypt(sealed: &str, secret_id: &SecretId) -> CryptoResult<String> {
    let sealed = BASE64.decode(sealed)?;
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::Truncated);
    }
    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    let plaintext = cipher_for(secret_id)
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailed)
}
