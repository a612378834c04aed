use crate::secret::{fingerprint, SecretStore, StoreResult};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use zeroize::Zeroizing;

/// Handle for calling the Slack API on behalf of one team.
pub struct TeamClient {
    team_id: String,
    token: Zeroizing<String>,
}

impl TeamClient {
    pub fn new(team_id: &str, token: String) -> Self {
        Self {
            team_id: team_id.to_string(),
            token: Zeroizing::new(token),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn team_fingerprint(&self) -> String {
        fingerprint(&self.team_id)
    }
}

impl std::fmt::Debug for TeamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeamClient")
            .field("team_id", &self.team_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Per-team API clients, built lazily from stored access tokens.
///
/// Lookups of an existing client take no lock; building one holds
/// `build_lock` so concurrent requests for the same team build it once.
/// Entries are never evicted on their own; callers evict after Slack
/// rejects a token.
#[derive(Debug, Default)]
pub struct TeamClientCache {
    clients: DashMap<String, Arc<TeamClient>>,
    build_lock: Mutex<()>,
}

impl TeamClientCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached client or build one from the team's stored token.
    ///
    /// Returns `None` when the team has no token (it needs to reinstall).
    pub async fn get_or_build(
        &self,
        store: &dyn SecretStore,
        team_id: &str,
    ) -> StoreResult<Option<Arc<TeamClient>>> {
        if team_id.is_empty() {
            return Ok(None);
        }
        if let Some(client) = self.get(team_id) {
            return Ok(Some(client));
        }

        let _guard = self.build_lock.lock().await;
        // Another request may have built it while we waited
        if let Some(client) = self.get(team_id) {
            return Ok(Some(client));
        }

        let Some(token) = store.team_access_token(team_id).await? else {
            return Ok(None);
        };
        let client = Arc::new(TeamClient::new(team_id, token));
        self.clients.insert(team_id.to_string(), Arc::clone(&client));
        Ok(Some(client))
    }

    pub fn get(&self, team_id: &str) -> Option<Arc<TeamClient>> {
        self.clients.get(team_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Drop a client whose token Slack rejected; the next lookup rebuilds it.
    pub fn evict(&self, team_id: &str) {
        self.clients.remove(team_id);
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
