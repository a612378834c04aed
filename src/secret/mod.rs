//! Secret encryption and storage.
//!
//! ## Security Model
//!
//! - Each secret gets a fresh random ID that is both its handle and its key
//! - The ciphertext is stored under a SHA-256 hash of the ID, so the store
//!   alone never yields anything decryptable
//! - The ID only ever travels inside the Slack callback ID

pub mod crypto;
pub mod redis;
pub mod store;

pub use crypto::{decrypt, encrypt, fingerprint, CryptoError, SecretId};
pub use redis::RedisStore;
pub use store::{MemoryStore, SecretStore, SharedSecretStore, StoreError, StoreResult};
