use crate::exchange::messages;
use crate::secret::{CryptoError, StoreError};
use crate::slack::NotifyError;
use secretmessage_types::Message;
use thiserror::Error;

/// Application-wide error types
#[derive(Error, Debug)]
pub enum AppError {
    /// User-correctable input problem; the text is shown to the user.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Secret text is empty")]
    EmptySecretText,

    #[error("Authentication required")]
    Authentication,

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Secret not found")]
    NotFound,

    #[error("Slack delivery error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Short machine-readable code, safe to log and to show.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::EmptySecretText => "secret_text_empty",
            Self::Authentication => "authentication_error",
            Self::Crypto(_) => "crypto_error",
            Self::Store(_) => "store_error",
            Self::NotFound => "secret_not_found",
            Self::Notify(_) => "send_message_error",
            Self::Config(_) => "config_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Render the error as the ephemeral message the user sees.
    ///
    /// Only validation errors carry their own text; everything internal
    /// collapses into one generic message.
    pub fn into_slack_message(self) -> Message {
        match self {
            Self::Validation(text) => {
                messages::error("Error: invalid request", &text, "validation_error")
            }
            Self::EmptySecretText => messages::empty_secret_text(),
            Self::NotFound => messages::secret_not_found(),
            Self::Authentication => messages::error(
                ":x: Sorry, an error occurred",
                "This request could not be verified",
                "authentication_error",
            ),
            other => messages::generic_error(other.code()),
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convert AppError to HTTP status codes for web responses
impl AppError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::Validation(_) | Self::EmptySecretText => StatusCode::BAD_REQUEST,
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::Crypto(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Notify(_) => StatusCode::BAD_GATEWAY,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        // Internal details stay in the logs
        let error = match &self {
            Self::Validation(_) | Self::EmptySecretText | Self::Authentication | Self::NotFound => {
                self.to_string()
            }
            _ => "Internal error".to_string(),
        };
        let body = serde_json::json!({
            "error": error,
            "code": status.as_u16()
        });
        (status, axum::Json(body)).into_response()
    }
}
