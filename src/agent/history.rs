//! Message history builder
//!
//! Turns the host's stored conversation into the message list for the first
//! model call of a run.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::llm::{ContentPart, Message};

/// Role of a stored conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
    System,
    /// Error notice shown to the user, never replayed to the model
    Error,
}

/// A prior conversation turn as kept by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Error, content)
    }
}

/// An image pasted by the user, base64 encoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttachment {
    /// MIME type, e.g. `image/png`
    pub media_type: String,
    /// Base64 payload
    pub data: String,
}

impl ImageAttachment {
    /// Wrap an already encoded image
    pub fn new(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            data: data.into(),
        }
    }

    /// Encode raw image bytes
    pub fn from_bytes(media_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(media_type, STANDARD.encode(bytes))
    }

    /// `data:` URL for the image part
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// Assemble the initial message list of a run
///
/// System prompt first, then the replayable prior turns in order, then the
/// new user turn. Images turn the user turn into text-then-images parts.
pub fn build_messages(
    system_prompt: &str,
    prior_turns: &[ChatTurn],
    user_text: &str,
    images: &[ImageAttachment],
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(prior_turns.len() + 2);
    messages.push(Message::system(system_prompt));

    messages.extend(prior_turns.iter().filter_map(|turn| match turn.role {
        TurnRole::User => Some(Message::user(turn.content.clone())),
        TurnRole::Assistant => Some(Message::assistant(turn.content.clone())),
        TurnRole::System | TurnRole::Error => None,
    }));

    if images.is_empty() {
        messages.push(Message::user(user_text));
    } else {
        let mut parts = Vec::with_capacity(images.len() + 1);
        parts.push(ContentPart::text(user_text));
        parts.extend(images.iter().map(|image| ContentPart::image(image.data_url())));
        messages.push(Message::user_with_parts(parts));
    }

    messages
}
