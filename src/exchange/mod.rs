//! Secret exchange engine.
//!
//! Drives a secret through `Nonexistent -> Stored -> Deleted`:
//! - a slash command with text creates it
//! - `send_secret:<id>` / `get_secret:<id>` reveal it (non-destructive)
//! - `delete_secret:<id>` removes it; there is no way back to `Stored`
//!
//! Every error is turned into a Slack message here; nothing propagates
//! past the request.

pub mod messages;

use crate::error::{AppError, AppResult};
use crate::secret::{decrypt, encrypt, fingerprint, SecretId, SharedSecretStore};
use crate::slack::{Notifier, NotifyError, TeamClientCache};
use secretmessage_types::{CallbackId, InteractionCallback, Message, SlashCommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use zeroize::Zeroizing;

/// Outcome of the post-create installation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStatus {
    /// The team has a token Slack accepts.
    Installed,
    /// No usable token; the user was asked to reinstall.
    ReinstallRequested,
}

#[derive(Clone)]
pub struct ExchangeEngine {
    store: SharedSecretStore,
    notifier: Arc<dyn Notifier>,
    clients: Arc<TeamClientCache>,
    reinstall_url: Arc<str>,
    notice_timeout: Duration,
}

impl std::fmt::Debug for ExchangeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeEngine")
            .field("cached_clients", &self.clients.len())
            .field("reinstall_url", &self.reinstall_url)
            .field("notice_timeout", &self.notice_timeout)
            .finish_non_exhaustive()
    }
}

impl ExchangeEngine {
    /// # Arguments
    /// * `reinstall_url` - Link offered when a team's token is unusable
    /// * `notice_timeout` - Upper bound for the detached installation check
    pub fn new(
        store: SharedSecretStore,
        notifier: Arc<dyn Notifier>,
        clients: Arc<TeamClientCache>,
        reinstall_url: impl Into<String>,
        notice_timeout: Duration,
    ) -> Self {
        Self {
            store,
            notifier,
            clients,
            reinstall_url: Arc::from(reinstall_url.into()),
            notice_timeout,
        }
    }

    /// Handle `/secret <text>`.
    ///
    /// On success the in-channel message is returned for the synchronous
    /// response and the installation check runs in the background.
    pub async fn handle_slash(&self, command: &SlashCommand) -> Message {
        match self.create_secret(&command.text, &command.user_name).await {
            Ok(message) => {
                self.spawn_installation_check(
                    command.team_id.clone(),
                    command.response_url.clone(),
                );
                message
            }
            Err(AppError::EmptySecretText) => {
                debug!(team = %fingerprint(&command.team_id), "Slash command without text");
                AppError::EmptySecretText.into_slack_message()
            }
            Err(err) => {
                error!(
                    team = %fingerprint(&command.team_id),
                    user = %fingerprint(&command.user_id),
                    code = err.code(),
                    "Failed to create secret: {}",
                    err
                );
                err.into_slack_message()
            }
        }
    }

    /// Handle a button click routed by its callback ID.
    pub async fn handle_interaction(&self, callback: &InteractionCallback) -> Message {
        let callback_id: CallbackId = match callback.callback_id.parse() {
            Ok(id) => id,
            Err(e) => {
                warn!(team = %fingerprint(callback.team_id()), "Unrecognised callback id: {}", e);
                return AppError::validation("This action is not supported.").into_slack_message();
            }
        };

        let action = callback_id.action;
        let secret_id = SecretId::from(callback_id.into_secret_id());
        let result = if action.is_reveal() {
            self.reveal_secret(&secret_id).await
        } else {
            self.delete_secret(&secret_id).await
        };

        result.unwrap_or_else(|err| {
            match &err {
                AppError::NotFound => debug!(action = action.as_str(), "Secret not found"),
                _ => error!(
                    action = action.as_str(),
                    code = err.code(),
                    "Interaction failed: {}",
                    err
                ),
            }
            err.into_slack_message()
        })
    }

    /// Encrypt and store a new secret, returning the announcement.
    ///
    /// Nothing is announced unless the ciphertext was stored.
    pub async fn create_secret(&self, text: &str, user_name: &str) -> AppResult<Message> {
        if text.is_empty() {
            return Err(AppError::EmptySecretText);
        }

        let secret_id = SecretId::generate();
        let storage_key = secret_id.storage_key();
        let sealed = encrypt(text, &secret_id)?;
        self.store.put(&storage_key, &sealed).await?;

        info!(key = %&storage_key[..12], "Secret stored");
        Ok(messages::secret_created(user_name, secret_id.as_str()))
    }

    /// Decrypt a stored secret. The entry stays in place.
    pub async fn reveal_secret(&self, secret_id: &SecretId) -> AppResult<Message> {
        let sealed = self
            .store
            .get(&secret_id.storage_key())
            .await?
            .ok_or(AppError::NotFound)?;
        let plaintext = Zeroizing::new(decrypt(&sealed, secret_id)?);

        Ok(messages::secret_revealed(&plaintext, secret_id.as_str()))
    }

    /// Remove a secret. Deleting twice gives the same answer.
    pub async fn delete_secret(&self, secret_id: &SecretId) -> AppResult<Message> {
        let storage_key = secret_id.storage_key();
        self.store.delete(&storage_key).await?;

        info!(key = %&storage_key[..12], "Secret deleted");
        Ok(messages::secret_deleted())
    }

    /// Make sure the team still has a working token; if not, ask the user
    /// to reinstall through the command's response URL.
    pub async fn check_installation(
        &self,
        team_id: &str,
        response_url: &str,
    ) -> AppResult<InstallStatus> {
        if self.team_token_accepted(team_id).await? {
            return Ok(InstallStatus::Installed);
        }

        warn!(
            team = %fingerprint(team_id),
            "No usable access token for team, sending the reinstall message"
        );
        self.notifier
            .send_response_url(response_url, &messages::reinstall_notice(&self.reinstall_url))
            .await?;
        Ok(InstallStatus::ReinstallRequested)
    }

    async fn team_token_accepted(&self, team_id: &str) -> AppResult<bool> {
        // A rejected client is evicted and rebuilt from the store once
        for _ in 0..2 {
            let Some(client) = self
                .clients
                .get_or_build(self.store.as_ref(), team_id)
                .await?
            else {
                return Ok(false);
            };

            match self.notifier.auth_test(&client).await {
                Ok(()) => return Ok(true),
                Err(NotifyError::Unauthorized(code)) => {
                    info!(
                        team = %client.team_fingerprint(),
                        code = %code,
                        "Team token rejected, rebuilding client"
                    );
                    self.clients.evict(team_id);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(false)
    }

    fn spawn_installation_check(&self, team_id: String, response_url: String) {
        if response_url.is_empty() {
            return;
        }

        let engine = self.clone();
        tokio::spawn(async move {
            let team = fingerprint(&team_id);
            let check = engine.check_installation(&team_id, &response_url);
            let outcome = tokio::time::timeout(engine.notice_timeout, check)
                .await
                .unwrap_or_else(|_| Err(AppError::internal("installation check timed out")));
            match outcome {
                Ok(status) => debug!(team = %team, ?status, "Installation check finished"),
                Err(err) => warn!(
                    team = %team,
                    code = err.code(),
                    "Installation check failed: {}",
                    err
                ),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::{MemoryStore, SecretStore, StoreError, StoreResult};
    use crate::slack::TeamClient;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records response URL posts; tokens listed in `revoked` fail auth.test.
    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, Message)>>,
        revoked: Vec<String>,
    }

    impl RecordingNotifier {
        fn revoking(token: &str) -> Self {
            Self {
                revoked: vec![token.to_string()],
                ..Self::default()
            }
        }

        fn sent(&self) -> Vec<(String, Message)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send_response_url(&self, response_url: &str, message: &Message) -> Result<(), NotifyError> {
            self.sent
                .lock()
                .unwrap()
                .push((response_url.to_string(), message.clone()));
            Ok(())
        }

        async fn auth_test(&self, client: &TeamClient) -> Result<(), NotifyError> {
            if self.revoked.iter().any(|t| t == client.token()) {
                Err(NotifyError::Unauthorized("token_revoked".to_string()))
            } else {
                Ok(())
            }
        }
    }

    /// Backend that is always down.
    struct DownStore;

    #[async_trait]
    impl SecretStore for DownStore {
        async fn put(&self, _: &str, _: &str) -> StoreResult<()> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
        async fn get(&self, _: &str) -> StoreResult<Option<String>> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
        async fn delete(&self, _: &str) -> StoreResult<()> {
            Err(StoreError::Timeout)
        }
        async fn team_access_token(&self, _: &str) -> StoreResult<Option<String>> {
            Err(StoreError::Timeout)
        }
    }

    fn engine_with(
        store: Arc<MemoryStore>,
        notifier: Arc<RecordingNotifier>,
    ) -> (ExchangeEngine, Arc<TeamClientCache>) {
        let clients = Arc::new(TeamClientCache::new());
        let engine = ExchangeEngine::new(
            store,
            notifier,
            Arc::clone(&clients),
            "https://secretmessage.example.com/auth/slack",
            Duration::from_secs(5),
        );
        (engine, clients)
    }

    fn secret_id_of(message: &Message) -> SecretId {
        let callback: CallbackId = message.attachments[0].callback_id.parse().unwrap();
        SecretId::from(callback.into_secret_id())
    }

    fn interaction(callback_id: String) -> InteractionCallback {
        InteractionCallback {
            callback_id,
            ..InteractionCallback::default()
        }
    }

    #[tokio::test]
    async fn test_create_stores_under_hashed_key() {
        let store = Arc::new(MemoryStore::new());
        let (engine, _) = engine_with(Arc::clone(&store), Arc::new(RecordingNotifier::default()));

        let message = engine.create_secret("this is my secret", "imafish").await.unwrap();
        assert_eq!(message.attachments[0].title, "imafish sent a secret message");

        let secret_id = secret_id_of(&message);
        assert!(store.get(secret_id.as_str()).await.unwrap().is_none());
        let sealed = store.get(&secret_id.storage_key()).await.unwrap().unwrap();
        assert_eq!(decrypt(&sealed, &secret_id).unwrap(), "this is my secret");
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected_without_storing() {
        let store = Arc::new(MemoryStore::new());
        let (engine, _) = engine_with(Arc::clone(&store), Arc::new(RecordingNotifier::default()));

        let err = engine.create_secret("", "imafish").await.unwrap_err();
        assert!(matches!(err, AppError::EmptySecretText));

        let command = SlashCommand {
            user_name: "imafish".to_string(),
            ..SlashCommand::default()
        };
        let message = engine.handle_slash(&command).await;
        assert!(message.is_ephemeral());
        assert_eq!(message.attachments[0].title, "Error: secret text is empty");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_sends_no_announcement() {
        let engine = ExchangeEngine::new(
            Arc::new(DownStore),
            Arc::new(RecordingNotifier::default()),
            Arc::new(TeamClientCache::new()),
            "https://secretmessage.example.com/auth/slack",
            Duration::from_secs(5),
        );
        let command = SlashCommand {
            text: "this is my secret".to_string(),
            user_name: "imafish".to_string(),
            ..SlashCommand::default()
        };

        let message = engine.handle_slash(&command).await;
        assert!(message.is_ephemeral());
        assert_eq!(message.attachments[0].title, ":x: Sorry, an error occurred");
        assert_eq!(message.attachments[0].callback_id, "store_error");
    }

    #[tokio::test]
    async fn test_reveal_is_repeatable() {
        let store = Arc::new(MemoryStore::new());
        let (engine, _) = engine_with(Arc::clone(&store), Arc::new(RecordingNotifier::default()));
        let created = engine.create_secret("this is my secret", "imafish").await.unwrap();
        let secret_id = secret_id_of(&created);

        let first = engine
            .handle_interaction(&interaction(format!("get_secret:{}", secret_id.as_str())))
            .await;
        let second = engine
            .handle_interaction(&interaction(format!("send_secret:{}", secret_id.as_str())))
            .await;

        assert_eq!(first, second);
        assert_eq!(first.attachments[0].title, "Secret message");
        assert_eq!(first.attachments[0].text, "this is my secret");
        assert_eq!(
            first.attachments[0].callback_id,
            format!("delete_secret:{}", secret_id.as_str())
        );
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let (engine, _) = engine_with(Arc::clone(&store), Arc::new(RecordingNotifier::default()));
        let created = engine.create_secret("this is my secret", "imafish").await.unwrap();
        let delete = interaction(format!("delete_secret:{}", secret_id_of(&created).as_str()));

        let first = engine.handle_interaction(&delete).await;
        let second = engine.handle_interaction(&delete).await;
        assert_eq!(first, Message::delete_original());
        assert_eq!(first, second);
        assert!(store.is_empty());

        // Deleted is terminal
        let reveal = interaction(format!("get_secret:{}", secret_id_of(&created).as_str()));
        let message = engine.handle_interaction(&reveal).await;
        assert_eq!(message.attachments[0].callback_id, "secret_not_found");
    }

    #[tokio::test]
    async fn test_unknown_secret_is_not_found() {
        let (engine, _) = engine_with(
            Arc::new(MemoryStore::new()),
            Arc::new(RecordingNotifier::default()),
        );
        let id = SecretId::generate();
        let err = engine.reveal_secret(&id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn test_whitespace_text_is_a_secret() {
        let store = Arc::new(MemoryStore::new());
        let (engine, _) = engine_with(Arc::clone(&store), Arc::new(RecordingNotifier::default()));

        let created = engine.create_secret("   ", "imafish").await.unwrap();
        let revealed = engine.reveal_secret(&secret_id_of(&created)).await.unwrap();
        assert_eq!(revealed.attachments[0].text, "   ");
    }

    #[tokio::test]
    async fn test_undecryptable_secret_is_generic_error() {
        let store = Arc::new(MemoryStore::new());
        let (engine, _) = engine_with(Arc::clone(&store), Arc::new(RecordingNotifier::default()));
        let secret_id = SecretId::generate();
        store
            .put(&secret_id.storage_key(), "bm90IGEgc2VhbGVkIHNlY3JldCBhdCBhbGw")
            .await
            .unwrap();

        let err = engine.reveal_secret(&secret_id).await.unwrap_err();
        assert!(matches!(err, AppError::Crypto(_)));

        let message = engine
            .handle_interaction(&interaction(format!("get_secret:{}", secret_id.as_str())))
            .await;
        assert!(message.is_ephemeral());
        assert_eq!(message.attachments[0].title, ":x: Sorry, an error occurred");
        assert_eq!(message.attachments[0].callback_id, "crypto_error");
        assert!(!message.attachments[0].text.contains("bm90"));
        // The entry is left alone
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_callback_is_reported() {
        let (engine, _) = engine_with(
            Arc::new(MemoryStore::new()),
            Arc::new(RecordingNotifier::default()),
        );
        let message = engine
            .handle_interaction(&interaction("launch_rockets:abc".to_string()))
            .await;
        assert!(message.is_ephemeral());
        assert_eq!(message.attachments[0].callback_id, "validation_error");
    }

    #[tokio::test]
    async fn test_missing_token_requests_reinstall() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (engine, _) = engine_with(Arc::new(MemoryStore::new()), Arc::clone(&notifier));

        let status = engine
            .check_installation("T1234ABCD", "https://hooks.slack.com/commands/1")
            .await
            .unwrap();
        assert_eq!(status, InstallStatus::ReinstallRequested);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "https://hooks.slack.com/commands/1");
        assert!(sent[0].1.is_ephemeral());
        assert!(sent[0]
            .1
            .text
            .as_deref()
            .unwrap()
            .contains("https://secretmessage.example.com/auth/slack"));
    }

    #[tokio::test]
    async fn test_valid_token_sends_nothing() {
        let store = Arc::new(MemoryStore::new());
        store.set_team_access_token("T1234ABCD", "xoxb-good");
        let notifier = Arc::new(RecordingNotifier::default());
        let (engine, clients) = engine_with(store, Arc::clone(&notifier));

        let status = engine
            .check_installation("T1234ABCD", "https://hooks.slack.com/commands/1")
            .await
            .unwrap();
        assert_eq!(status, InstallStatus::Installed);
        assert!(notifier.sent().is_empty());
        assert_eq!(clients.len(), 1);
    }

    #[tokio::test]
    async fn test_revoked_client_is_rebuilt() {
        let store = Arc::new(MemoryStore::new());
        store.set_team_access_token("T1234ABCD", "xoxb-revoked");
        let notifier = Arc::new(RecordingNotifier::revoking("xoxb-revoked"));
        let (engine, clients) = engine_with(Arc::clone(&store), Arc::clone(&notifier));

        // Cache the stale client, then the team reinstalls
        clients.get_or_build(store.as_ref(), "T1234ABCD").await.unwrap();
        store.set_team_access_token("T1234ABCD", "xoxb-fresh");

        let status = engine
            .check_installation("T1234ABCD", "https://hooks.slack.com/commands/1")
            .await
            .unwrap();
        assert_eq!(status, InstallStatus::Installed);
        assert_eq!(clients.get("T1234ABCD").unwrap().token(), "xoxb-fresh");
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_uninstalled_team_is_evicted() {
        let store = Arc::new(MemoryStore::new());
        store.set_team_access_token("T1234ABCD", "xoxb-revoked");
        let notifier = Arc::new(RecordingNotifier::revoking("xoxb-revoked"));
        let (engine, clients) = engine_with(Arc::clone(&store), Arc::clone(&notifier));

        // Cached while installed, then the team removes the app
        clients.get_or_build(store.as_ref(), "T1234ABCD").await.unwrap();
        store.remove_team_access_token("T1234ABCD");

        let status = engine
            .check_installation("T1234ABCD", "https://hooks.slack.com/commands/1")
            .await
            .unwrap();
        assert_eq!(status, InstallStatus::ReinstallRequested);
        assert!(clients.get("T1234ABCD").is_none());
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_revoked_token_without_reinstall() {
        let store = Arc::new(MemoryStore::new());
        store.set_team_access_token("T1234ABCD", "xoxb-revoked");
        let notifier = Arc::new(RecordingNotifier::revoking("xoxb-revoked"));
        let (engine, _) = engine_with(store, Arc::clone(&notifier));

        let status = engine
            .check_installation("T1234ABCD", "https://hooks.slack.com/commands/1")
            .await
            .unwrap();
        assert_eq!(status, InstallStatus::ReinstallRequested);
        assert_eq!(notifier.sent().len(), 1);
    }
}
