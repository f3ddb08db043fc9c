//! Common data models for conversations and streaming output.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Role of the message sender.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A URL-addressed image attached to a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageUrl {
    pub url: String,
}

/// One piece of a multi-part message body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MessagePart {
    Text {
        text: String,
    },
    ImageUrl {
        #[serde(rename = "imageUrl")]
        image_url: ImageUrl,
    },
}

/// Message body: either a plain string or a list of parts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<MessagePart>),
}

impl MessageContent {
    /// Flatten the content to plain text. Image parts contribute nothing.
    pub fn render(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    MessagePart::Text { text } => Some(text.as_str()),
                    MessagePart::ImageUrl { .. } => None,
                })
                .join(""),
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    /// Build a plain-text message.
    pub fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Flatten the message body to plain text.
    pub fn render(&self) -> String {
        self.content.render()
    }
}

/// Flatten a whole conversation into one newline-joined text block.
///
/// This is the shape the agent protocol expects in its outbound payload.
pub fn flatten_messages(messages: &[Message]) -> String {
    messages.iter().map(Message::render).join("\n")
}

/// Reason for finishing the response generation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Error,
}

/// Provider-agnostic response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Generated messages (typically one assistant message)
    pub data: Vec<Message>,

    /// Finish reason for the response generation
    pub finish: FinishReason,
}

/// Streaming response chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StreamChunk {
    /// Message data chunk
    Data(Message),

    /// Finish reason
    Finish(FinishReason),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_plain_text() {
        let message = Message::text(Role::User, "hello");
        assert_eq!(message.render(), "hello");
    }

    #[test]
    fn test_render_parts_skips_images() {
        let message = Message {
            role: Role::User,
            content: MessageContent::Parts(vec![
                MessagePart::Text {
                    text: "look: ".to_string(),
                },
                MessagePart::ImageUrl {
                    image_url: ImageUrl {
                        url: "https://example.com/cat.png".to_string(),
                    },
                },
                MessagePart::Text {
                    text: "a cat".to_string(),
                },
            ]),
        };
        assert_eq!(message.render(), "look: a cat");
    }

    #[test]
    fn test_flatten_messages_joins_with_newlines() {
        let messages = vec![
            Message::text(Role::User, "first"),
            Message::text(Role::Assistant, "second"),
        ];
        assert_eq!(flatten_messages(&messages), "first\nsecond");
    }

    #[test]
    fn test_message_part_wire_shape() {
        let part = MessagePart::ImageUrl {
            image_url: ImageUrl {
                url: "https://example.com/cat.png".to_string(),
            },
        };
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["type"], "imageUrl");
        assert_eq!(json["imageUrl"]["url"], "https://example.com/cat.png");
    }
}
