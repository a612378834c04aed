//! Slack plumbing: inbound request verification, outbound delivery and
//! per-team API clients.

pub mod cache;
pub mod client;
pub mod verify;

pub use cache::{TeamClient, TeamClientCache};
pub use client::{NotifyError, SlackClient};
pub use verify::{RequestVerifier, VerifyError};

use async_trait::async_trait;
use secretmessage_types::Message;

/// Outbound side of Slack, as seen by the exchange engine.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Post a message to a one-time `response_url`. No token needed.
    async fn send_response_url(&self, response_url: &str, message: &Message) -> Result<(), NotifyError>;

    /// Check that a team's token is still accepted by Slack.
    async fn auth_test(&self, client: &TeamClient) -> Result<(), NotifyError>;
}
