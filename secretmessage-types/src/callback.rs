//! Callback IDs of the form `<action>:<secret id>`.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The operation a UI action requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackAction {
    /// Carried by the "Read message" button of a freshly created secret.
    SendSecret,
    GetSecret,
    DeleteSecret,
}

impl CallbackAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SendSecret => "send_secret",
            Self::GetSecret => "get_secret",
            Self::DeleteSecret => "delete_secret",
        }
    }

    /// Both the creation button and an explicit get reveal the secret.
    pub fn is_reveal(&self) -> bool {
        matches!(self, Self::SendSecret | Self::GetSecret)
    }
}

impl FromStr for CallbackAction {
    type Err = CallbackIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "send_secret" => Ok(Self::SendSecret),
            "get_secret" => Ok(Self::GetSecret),
            "delete_secret" => Ok(Self::DeleteSecret),
            _ => Err(CallbackIdError::UnknownAction),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackIdError {
    #[error("callback id has no action separator")]
    MissingSeparator,

    #[error("unknown callback action")]
    UnknownAction,

    #[error("callback id has an empty secret id")]
    EmptySecretId,
}

/// Parsed callback ID.
///
/// The secret id is key material; `Debug` never prints it.
#[derive(Clone, PartialEq, Eq)]
pub struct CallbackId {
    pub action: CallbackAction,
    secret_id: String,
}

impl CallbackId {
    pub fn new(action: CallbackAction, secret_id: impl Into<String>) -> Self {
        Self {
            action,
            secret_id: secret_id.into(),
        }
    }

    pub fn secret_id(&self) -> &str {
        &self.secret_id
    }

    pub fn into_secret_id(self) -> String {
        self.secret_id
    }
}

impl FromStr for CallbackId {
    type Err = CallbackIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (action, secret_id) = s.split_once(':').ok_or(CallbackIdError::MissingSeparator)?;
        let action = action.parse()?;
        if secret_id.is_empty() {
            return Err(CallbackIdError::EmptySecretId);
        }
        Ok(Self::new(action, secret_id))
    }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.action.as_str(), self.secret_id)
    }
}

impl fmt::Debug for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackId")
            .field("action", &self.action)
            .field("secret_id", &"<redacted>")
            .finish()
    }
}
