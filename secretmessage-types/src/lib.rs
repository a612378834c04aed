//! Slack wire types for the secret message bot.
//!
//! This crate holds the serde representations of what Slack sends us
//! (slash commands, interaction callbacks) and what we send back
//! (messages with attachments). It performs no I/O.

pub mod callback;
pub mod message;

pub use callback::{CallbackAction, CallbackId, CallbackIdError};
pub use message::{Attachment, AttachmentAction, Message, ResponseType};

use serde::Deserialize;

/// Form body of a slash command invocation (`POST /slash`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlashCommand {
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub team_domain: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub response_url: String,
    #[serde(default)]
    pub trigger_id: String,
}

/// JSON document carried in the `payload` form field of `POST /interactive`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InteractionCallback {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub callback_id: String,
    #[serde(default)]
    pub team: Option<TeamRef>,
    #[serde(default)]
    pub user: Option<UserRef>,
    #[serde(default)]
    pub response_url: String,
}

impl InteractionCallback {
    pub fn team_id(&self) -> &str {
        self.team.as_ref().map(|t| t.id.as_str()).unwrap_or_default()
    }

    pub fn user_id(&self) -> &str {
        self.user.as_ref().map(|u| u.id.as_str()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub domain: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}
