//! Chat client trait
//!
//! Abstracts the streaming model interface so that any backend can drive the
//! agent loop. The loop only consumes this contract.

use anyhow::Result;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

use super::types::{Message, ToolCallRequest, ToolDefinition};

/// A request for one model turn
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Full message list, system prompt first
    pub messages: Vec<Message>,
    /// Tool catalog; `None` means no tool capability is advertised
    pub tools: Option<Vec<ToolDefinition>>,
}

impl ChatRequest {
    /// Create a new request
    pub fn new(messages: Vec<Message>, tools: Option<Vec<ToolDefinition>>) -> Self {
        Self { messages, tools }
    }
}

/// Event produced by a streaming model turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StreamEvent {
    /// Incremental text
    TextDelta(String),
    /// The parsed tool-call batch of this turn
    ToolCalls(Vec<ToolCallRequest>),
    /// The turn finished
    Done,
    /// Terminal error reported by the stream
    Error(String),
}

/// Boxed stream of model events
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// Trait for streaming chat clients
///
/// Implementations must stop producing events promptly once `cancel` fires;
/// how they do so (error item or end of stream) is up to them.
#[async_trait::async_trait]
pub trait ChatClient: Send + Sync {
    /// Start a streaming model turn
    async fn stream_chat(&self, request: ChatRequest, cancel: &CancellationToken) -> Result<ChatStream>;

    /// Get the current model name
    fn model(&self) -> String;
}
