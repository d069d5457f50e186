//! Chat message types shared by the agent loop and model clients
//!
//! These follow the chat-completions shape: a message is tagged by role, user
//! turns may carry image parts, assistant turns may carry tool calls and tool
//! results are correlated by `tool_call_id`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Messages
// ============================================================================

/// A message in the conversation sent to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    /// System prompt
    System { content: String },

    /// User turn, plain text or multimodal parts
    User { content: UserContent },

    /// Assistant turn, optionally requesting tool calls
    Assistant {
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRequest>,
    },

    /// Result of a single tool call
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl Message {
    /// Create a system message
    pub fn system(text: impl Into<String>) -> Self {
        Message::System {
            content: text.into(),
        }
    }

    /// Create a plain-text user message
    pub fn user(text: impl Into<String>) -> Self {
        Message::User {
            content: UserContent::Text(text.into()),
        }
    }

    /// Create a user message from content parts
    pub fn user_with_parts(parts: Vec<ContentPart>) -> Self {
        Message::User {
            content: UserContent::Parts(parts),
        }
    }

    /// Create a plain-text assistant message
    pub fn assistant(text: impl Into<String>) -> Self {
        Message::Assistant {
            content: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    /// Create an assistant message carrying a tool-call batch
    ///
    /// Empty text is stored as `None`.
    pub fn assistant_with_tool_calls(text: &str, tool_calls: Vec<ToolCallRequest>) -> Self {
        Message::Assistant {
            content: if text.is_empty() {
                None
            } else {
                Some(text.to_string())
            },
            tool_calls,
        }
    }

    /// Create a tool result message
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Message::Tool {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }

    /// Role name as used on the wire
    pub fn role(&self) -> &'static str {
        match self {
            Message::System { .. } => "system",
            Message::User { .. } => "user",
            Message::Assistant { .. } => "assistant",
            Message::Tool { .. } => "tool",
        }
    }

    /// Get the text content if this message has a single text body
    pub fn text(&self) -> Option<&str> {
        match self {
            Message::System { content } | Message::Tool { content, .. } => Some(content),
            Message::User {
                content: UserContent::Text(text),
            } => Some(text),
            Message::User { .. } => None,
            Message::Assistant { content, .. } => content.as_deref(),
        }
    }

    /// Get the tool calls of an assistant message
    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        match self {
            Message::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}

/// User message content - either a simple string or ordered parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserContent {
    /// Simple text content
    Text(String),
    /// Text and image parts, in order
    Parts(Vec<ContentPart>),
}

/// A part of a multimodal user message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text part
    Text { text: String },
    /// Image reference part
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    /// Create a text part
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    /// Create an image part that lets the model choose its fidelity
    pub fn image(url: impl Into<String>) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: url.into(),
                detail: ImageDetail::Auto,
            },
        }
    }
}

/// Image reference (URL or data URL)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    /// URL of the image, usually a `data:` URL
    pub url: String,
    /// Processing fidelity hint
    #[serde(default)]
    pub detail: ImageDetail,
}

/// Image processing fidelity hint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    /// Model decides
    #[default]
    Auto,
    /// Low resolution
    Low,
    /// High resolution
    High,
}

// ============================================================================
// Tool Calls
// ============================================================================

/// A tool call requested by the model
///
/// `arguments` is the raw JSON text produced by the model. It is untrusted and
/// only the tool dispatcher decodes it for real.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Call id, unique within one model turn
    pub id: String,
    /// Tool name
    pub name: String,
    /// Serialized JSON arguments
    pub arguments: String,
}

impl ToolCallRequest {
    /// Create a new tool call request
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Parse the arguments for tracing
    ///
    /// Never fails: malformed or non-object arguments become an empty object.
    pub fn parsed_arguments(&self) -> Value {
        match serde_json::from_str::<Value>(&self.arguments) {
            Ok(value @ Value::Object(_)) => value,
            _ => Value::Object(Map::new()),
        }
    }
}

// ============================================================================
// Tool Definitions
// ============================================================================

/// Tool definition advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,

    /// Tool description
    pub description: String,

    /// JSON schema of the arguments object
    pub parameters: Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}
