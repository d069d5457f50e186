//! OpenAI-compatible streaming chat client
//!
//! Talks to any `/chat/completions` endpoint that speaks the OpenAI
//! server-sent-events format. Text deltas are forwarded as they arrive; tool
//! call fragments are accumulated by index and emitted as a single batch when
//! the model finishes its turn.

use std::collections::BTreeMap;

use anyhow::{anyhow, Context, Result};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use super::provider::{ChatClient, ChatRequest, ChatStream, StreamEvent};
use super::types::{Message, ToolCallRequest, ToolDefinition};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Streaming client for OpenAI-compatible chat completion APIs
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: Option<f32>,
}

impl OpenAiClient {
    /// Create a client for the default OpenAI endpoint
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::new_with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client for a custom endpoint (e.g. a local server)
    pub fn new_with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
        }
    }

    /// Create a client from environment variables
    ///
    /// Reads `OPENAI_API_KEY` (required), `OPENAI_BASE_URL` and `OPENAI_MODEL`.
    pub fn from_env() -> Result<Self> {
        tracing::info!("Creating OpenAI client from environment");

        let api_key = std::env::var("OPENAI_API_KEY")
            .context("Failed to create OpenAI client. Make sure OPENAI_API_KEY is set")?;
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let mut client = Self::new_with_base_url(api_key, base_url);
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            client = client.with_model(model);
        }

        tracing::info!("Using model: {}", client.model);
        Ok(client)
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Build the JSON request body for a model turn
    pub fn build_request_body(&self, request: &ChatRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "stream": true,
            "messages": request.messages.iter().map(wire_message).collect::<Vec<_>>(),
        });

        if let Some(tools) = &request.tools {
            body["tools"] = Value::Array(tools.iter().map(wire_tool).collect());
        }
        if let Some(temperature) = self.temperature {
            body["temperature"] = json!(temperature);
        }

        body
    }
}

#[async_trait::async_trait]
impl ChatClient for OpenAiClient {
    async fn stream_chat(&self, request: ChatRequest, cancel: &CancellationToken) -> Result<ChatStream> {
        let body = self.build_request_body(&request);

        tracing::info!(
            "[OpenAiClient] Streaming {} messages to {} ({} tools)",
            request.messages.len(),
            self.model,
            request.tools.as_ref().map(|t| t.len()).unwrap_or(0)
        );

        let send = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send();

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(anyhow!("Request aborted")),
            response = send => response.context("Failed to send chat request")?,
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!("[OpenAiClient] Request failed with status {}: {}", status, text);
            return Err(anyhow!("Chat request failed with status {}: {}", status, text));
        }

        let cancel = cancel.clone();
        let bytes = response.bytes_stream();

        let stream = async_stream::stream! {
            futures::pin_mut!(bytes);
            let mut lines = SseLineBuffer::default();
            let mut decoder = StreamDecoder::default();

            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    next = bytes.next() => Some(next),
                };

                let chunk = match next {
                    None => {
                        tracing::info!("[OpenAiClient] Stream aborted");
                        yield Err::<StreamEvent, anyhow::Error>(anyhow!("Request aborted"));
                        return;
                    }
                    Some(next) => next,
                };

                let chunk = match chunk {
                    Some(Ok(chunk)) => chunk,
                    Some(Err(e)) => {
                        yield Err(anyhow::Error::new(e).context("Failed to read stream chunk"));
                        return;
                    }
                    None => break,
                };

                for data in lines.push(&chunk) {
                    match decoder.decode(&data) {
                        Ok(events) => {
                            for event in events {
                                yield Ok(event);
                            }
                        }
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }

                if decoder.is_done() {
                    break;
                }
            }

            if let Some(data) = lines.finish().filter(|_| !decoder.is_done()) {
                match decoder.decode(&data) {
                    Ok(events) => {
                        for event in events {
                            yield Ok(event);
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }

            for event in decoder.finish() {
                yield Ok(event);
            }
        };

        Ok(Box::pin(stream))
    }

    fn model(&self) -> String {
        self.model.clone()
    }
}

// ============================================================================
// Wire Format
// ============================================================================

fn wire_message(message: &Message) -> Value {
    match message {
        Message::System { content } => json!({"role": "system", "content": content}),
        Message::User { content } => json!({"role": "user", "content": content}),
        Message::Assistant {
            content,
            tool_calls,
        } => {
            let mut value = json!({"role": "assistant", "content": content});
            if !tool_calls.is_empty() {
                value["tool_calls"] = Value::Array(tool_calls.iter().map(wire_tool_call).collect());
            }
            value
        }
        Message::Tool {
            tool_call_id,
            content,
        } => json!({"role": "tool", "tool_call_id": tool_call_id, "content": content}),
    }
}

fn wire_tool_call(call: &ToolCallRequest) -> Value {
    json!({
        "id": call.id,
        "type": "function",
        "function": {"name": call.name, "arguments": call.arguments},
    })
}

fn wire_tool(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        },
    })
}

// ============================================================================
// SSE Decoding
// ============================================================================

/// Splits a byte stream into SSE `data:` payloads
///
/// Bytes are buffered until a full line is available so multi-byte characters
/// split across network chunks decode correctly.
#[derive(Debug, Default)]
struct SseLineBuffer {
    buffer: Vec<u8>,
}

impl SseLineBuffer {
    /// Feed a chunk, returning every complete `data:` payload
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(data) = data_payload(&String::from_utf8_lossy(&line)) {
                payloads.push(data);
            }
        }
        payloads
    }

    /// Flush a trailing line that had no newline
    fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buffer);
        data_payload(&String::from_utf8_lossy(&line))
    }
}

fn data_payload(line: &str) -> Option<String> {
    let line = line.trim_end_matches(|c| c == '\r' || c == '\n');
    let data = line.strip_prefix("data:")?.trim_start();
    if data.is_empty() {
        None
    } else {
        Some(data.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    error: Option<ErrorPayload>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: Option<ChunkDelta>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallDelta {
    #[serde(default)]
    index: usize,
    id: Option<String>,
    function: Option<FunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct FunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    message: String,
}

#[derive(Debug, Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// Turns SSE payloads into [`StreamEvent`]s
#[derive(Debug, Default)]
struct StreamDecoder {
    pending: BTreeMap<usize, PartialToolCall>,
    done: bool,
}

impl StreamDecoder {
    fn is_done(&self) -> bool {
        self.done
    }

    fn decode(&mut self, data: &str) -> Result<Vec<StreamEvent>> {
        if data == "[DONE]" {
            return Ok(self.finish());
        }

        let payload: ChunkPayload =
            serde_json::from_str(data).with_context(|| format!("Invalid stream chunk: {}", data))?;

        if let Some(error) = payload.error {
            return Ok(vec![StreamEvent::Error(error.message)]);
        }

        let mut events = Vec::new();
        for choice in payload.choices {
            if let Some(delta) = choice.delta {
                if let Some(text) = delta.content.filter(|t| !t.is_empty()) {
                    events.push(StreamEvent::TextDelta(text));
                }
                for fragment in delta.tool_calls.unwrap_or_default() {
                    self.apply(fragment);
                }
            }
            if choice.finish_reason.is_some() {
                events.extend(self.flush_tool_calls());
            }
        }
        Ok(events)
    }

    fn apply(&mut self, fragment: ToolCallDelta) {
        let call = self.pending.entry(fragment.index).or_default();
        if let Some(id) = fragment.id.filter(|id| !id.is_empty()) {
            call.id = id;
        }
        if let Some(function) = fragment.function {
            if let Some(name) = function.name.filter(|n| !n.is_empty()) {
                call.name = name;
            }
            if let Some(arguments) = function.arguments {
                call.arguments.push_str(&arguments);
            }
        }
    }

    fn flush_tool_calls(&mut self) -> Option<StreamEvent> {
        if self.pending.is_empty() {
            return None;
        }
        let batch = std::mem::take(&mut self.pending)
            .into_iter()
            .map(|(index, call)| {
                let id = if call.id.is_empty() {
                    format!("call_{}", index)
                } else {
                    call.id
                };
                ToolCallRequest::new(id, call.name, call.arguments)
            })
            .collect();
        Some(StreamEvent::ToolCalls(batch))
    }

    /// End of the turn: flush any pending batch and emit `Done` once
    fn finish(&mut self) -> Vec<StreamEvent> {
        if self.done {
            return Vec::new();
        }
        self.done = true;
        let mut events: Vec<StreamEvent> = self.flush_tool_calls().into_iter().collect();
        events.push(StreamEvent::Done);
        events
    }
}
