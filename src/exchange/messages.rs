//! Slack messages sent by the exchange engine.

use secretmessage_types::{Attachment, AttachmentAction, CallbackAction, CallbackId, Message};

const SECRET_COLOR: &str = "#6D5692";
const ERROR_COLOR: &str = "#FF0000";

/// In-channel announcement with a button that reveals the secret.
pub fn secret_created(user_name: &str, secret_id: &str) -> Message {
    let title = format!("{} sent a secret message", user_name);
    Message::in_channel().with_attachment(
        Attachment::titled(title)
            .callback_id(CallbackId::new(CallbackAction::SendSecret, secret_id).to_string())
            .color(SECRET_COLOR)
            .action(AttachmentAction::button("readMessage", ":envelope: Read message")),
    )
}

/// The decrypted secret, shown only to whoever clicked, with a delete button.
pub fn secret_revealed(plaintext: &str, secret_id: &str) -> Message {
    Message::ephemeral().with_attachment(
        Attachment::titled("Secret message")
            .text(plaintext)
            .callback_id(CallbackId::new(CallbackAction::DeleteSecret, secret_id).to_string())
            .color(SECRET_COLOR)
            .action(AttachmentAction::button("removeMessage", ":x: Delete message").danger()),
    )
}

pub fn secret_deleted() -> Message {
    Message::delete_original()
}

pub fn secret_not_found() -> Message {
    error(
        ":x: Sorry, this secret is no longer available",
        "It has already been deleted, or it never existed.",
        "secret_not_found",
    )
}

pub fn empty_secret_text() -> Message {
    error(
        "Error: secret text is empty",
        "It looks like you tried to send a secret but forgot to provide the secret's text. You can send a secret like this: `/secret I am scared of heights`",
        "secret_text_empty",
    )
}

/// Sent when the team's stored token is missing or rejected.
pub fn reinstall_notice(reinstall_url: &str) -> Message {
    Message::ephemeral().with_text(format!(
        ":wave: Hey, we're working hard updating Secret Message. In order to keep using the app, <{}|please click here to reinstall>",
        reinstall_url
    ))
}

pub fn generic_error(code: &str) -> Message {
    error(
        ":x: Sorry, an error occurred",
        "An error occurred while handling your secret. Please try again.",
        code,
    )
}

/// Ephemeral error attachment
pub fn error(title: &str, text: &str, callback_id: &str) -> Message {
    Message::ephemeral().with_attachment(
        Attachment::titled(title)
            .text(text)
            .callback_id(callback_id)
            .color(ERROR_COLOR),
    )
}
