//! Storage for encrypted secrets and per-team access tokens.
//!
//! Secrets are addressed by their storage key (a hash of the secret ID),
//! never by the secret ID itself. Ciphertext is opaque to every backend.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;

/// Backend failures. A missing key is not an error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store operation timed out")]
    Timeout,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value backend used by the exchange engine.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Unconditional upsert.
    async fn put(&self, storage_key: &str, ciphertext: &str) -> StoreResult<()>;

    /// `None` when the secret was deleted or never existed.
    async fn get(&self, storage_key: &str) -> StoreResult<Option<String>>;

    /// Idempotent; deleting an absent key succeeds.
    async fn delete(&self, storage_key: &str) -> StoreResult<()>;

    /// `None` when the team has not installed (or must reinstall) the app.
    async fn team_access_token(&self, team_id: &str) -> StoreResult<Option<String>>;
}

/// Shared store handle for use across the application.
pub type SharedSecretStore = Arc<dyn SecretStore>;

/// In-memory store (non-persistent).
#[derive(Debug, Default)]
pub struct MemoryStore {
    secrets: DashMap<String, String>,
    team_tokens: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a team's access token, as the installation flow would.
    pub fn set_team_access_token(&self, team_id: &str, token: &str) {
        self.team_tokens
            .insert(team_id.to_string(), token.to_string());
    }

    pub fn remove_team_access_token(&self, team_id: &str) {
        self.team_tokens.remove(team_id);
    }

    /// Number of stored secrets
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn put(&self, storage_key: &str, ciphertext: &str) -> StoreResult<()> {
        self.secrets
            .insert(storage_key.to_string(), ciphertext.to_string());
        Ok(())
    }

    async fn get(&self, storage_key: &str) -> StoreResult<Option<String>> {
        Ok(self.secrets.get(storage_key).map(|v| v.value().clone()))
    }

    async fn delete(&self, storage_key: &str) -> StoreResult<()> {
        self.secrets.remove(storage_key);
        Ok(())
    }

    async fn team_access_token(&self, team_id: &str) -> StoreResult<Option<String>> {
        Ok(self.team_tokens.get(team_id).map(|v| v.value().clone()))
    }
}
