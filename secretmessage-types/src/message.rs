//! Outbound Slack messages (legacy attachment format).

use serde::{Deserialize, Serialize};

/// Who gets to see a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// Posted to the whole channel.
    InChannel,
    /// Visible to the invoking user only.
    Ephemeral,
}

/// A message body returned to Slack, either synchronously or via a
/// `response_url`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_type: Option<ResponseType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub replace_original: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub delete_original: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Message {
    pub fn in_channel() -> Self {
        Self {
            response_type: Some(ResponseType::InChannel),
            ..Self::default()
        }
    }

    pub fn ephemeral() -> Self {
        Self {
            response_type: Some(ResponseType::Ephemeral),
            ..Self::default()
        }
    }

    /// Instructs Slack to remove the message the action was attached to.
    pub fn delete_original() -> Self {
        Self {
            delete_original: true,
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn is_ephemeral(&self) -> bool {
        self.response_type == Some(ResponseType::Ephemeral)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub fallback: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub callback_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub color: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<AttachmentAction>,
}

impl Attachment {
    /// Attachment whose title doubles as the notification fallback.
    pub fn titled(title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            fallback: title.clone(),
            title,
            ..Self::default()
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn callback_id(mut self, callback_id: impl Into<String>) -> Self {
        self.callback_id = callback_id.into();
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn action(mut self, action: AttachmentAction) -> Self {
        self.actions.push(action);
        self
    }
}

/// An interactive button on an attachment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttachmentAction {
    pub name: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

impl AttachmentAction {
    pub fn button(name: impl Into<String>, text: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            value: name.clone(),
            name,
            text: text.into(),
            kind: "button".to_string(),
            style: None,
        }
    }

    pub fn danger(mut self) -> Self {
        self.style = Some("danger".to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_delete_original_serializes_minimal() {
        let value = serde_json::to_value(Message::delete_original()).unwrap();
        assert_eq!(value, json!({ "delete_original": true }));
    }

    #[test]
    fn test_ephemeral_with_attachment() {
        let msg = Message::ephemeral().with_attachment(
            Attachment::titled("Oops")
                .text("details")
                .callback_id("some_error")
                .color("#FF0000"),
        );
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["response_type"], "ephemeral");
        assert_eq!(value["attachments"][0]["title"], "Oops");
        assert_eq!(value["attachments"][0]["fallback"], "Oops");
        assert!(value.get("delete_original").is_none());
        assert!(value["attachments"][0].get("actions").is_none());
    }

    #[test]
    fn test_button_wire_shape() {
        let value =
            serde_json::to_value(AttachmentAction::button("removeMessage", "Delete").danger())
                .unwrap();
        assert_eq!(
            value,
            json!({
                "name": "removeMessage",
                "text": "Delete",
                "type": "button",
                "value": "removeMessage",
                "style": "danger"
            })
        );
    }
}
