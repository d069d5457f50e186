//! Run observer
//!
//! A run reports progress only through an [`AgentObserver`]. Every callback
//! has a no-op default so hosts implement just what they render.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use crate::core::{AgentError, AgentEvent};
use crate::llm::ToolCallRequest;
use crate::tools::ToolExecutionOutcome;

/// Receiver of run progress callbacks
///
/// Callbacks are invoked from the run's task, in order, never concurrently.
/// Exactly one of `on_complete` or `on_error` is called per run.
pub trait AgentObserver: Send + Sync {
    /// A model iteration started (1-based)
    fn on_iteration_started(&self, _iteration: usize) {}

    /// A text fragment arrived from the model
    fn on_token(&self, _token: &str) {}

    /// A tool call is about to be dispatched
    fn on_tool_call_started(&self, _call: &ToolCallRequest) {}

    /// A tool call finished
    fn on_tool_call_completed(&self, _call: &ToolCallRequest, _outcome: &ToolExecutionOutcome) {}

    /// The full response text changed in a way tokens alone don't express
    fn on_message_update(&self, _text: &str) {}

    /// The run finished with this final text
    fn on_complete(&self, _final_text: &str) {}

    /// The run failed
    fn on_error(&self, _error: &AgentError) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl AgentObserver for NoopObserver {}

/// Observer that forwards every callback as an [`AgentEvent`]
///
/// Each subscriber gets its own unbounded queue, so a slow reader never loses
/// events and always sees them in callback order. Events sent while nobody is
/// subscribed are dropped.
#[derive(Debug, Clone, Default)]
pub struct ChannelObserver {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<AgentEvent>>>>,
}

impl ChannelObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events sent from now on
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<AgentEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    fn send(&self, event: AgentEvent) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        if subscribers.is_empty() {
            tracing::trace!("[ChannelObserver] No subscribers, event dropped");
        }
    }
}

impl AgentObserver for ChannelObserver {
    fn on_iteration_started(&self, iteration: usize) {
        self.send(AgentEvent::IterationStarted(iteration));
    }

    fn on_token(&self, token: &str) {
        self.send(AgentEvent::token(token));
    }

    fn on_tool_call_started(&self, call: &ToolCallRequest) {
        self.send(AgentEvent::ToolCallStarted(call.clone()));
    }

    fn on_tool_call_completed(&self, call: &ToolCallRequest, outcome: &ToolExecutionOutcome) {
        self.send(AgentEvent::ToolCallCompleted {
            call: call.clone(),
            outcome: outcome.clone(),
        });
    }

    fn on_message_update(&self, text: &str) {
        self.send(AgentEvent::MessageUpdate(text.to_string()));
    }

    fn on_complete(&self, final_text: &str) {
        self.send(AgentEvent::Complete(final_text.to_string()));
    }

    fn on_error(&self, error: &AgentError) {
        self.send(AgentEvent::error(error.to_string()));
    }
}
