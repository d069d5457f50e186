//! Progress events emitted by an agent run

use serde::{Deserialize, Serialize};

use crate::llm::ToolCallRequest;
use crate::tools::ToolExecutionOutcome;

/// A progress event, one per observer callback
///
/// Produced by [`ChannelObserver`](crate::agent::ChannelObserver) for hosts
/// that prefer message passing over implementing the observer trait.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AgentEvent {
    /// A new iteration started
    IterationStarted(usize),

    /// Incremental text output
    Token(String),

    /// Tool execution starting
    ToolCallStarted(ToolCallRequest),

    /// Tool execution completed
    ToolCallCompleted {
        /// The call that was executed
        call: ToolCallRequest,
        /// Its outcome
        outcome: ToolExecutionOutcome,
    },

    /// The full response text was replaced
    MessageUpdate(String),

    /// The run completed with this final text
    Complete(String),

    /// The run failed
    Error(String),
}

impl AgentEvent {
    /// Create a token event
    pub fn token(text: impl Into<String>) -> Self {
        AgentEvent::Token(text.into())
    }

    /// Create an error event
    pub fn error(msg: impl Into<String>) -> Self {
        AgentEvent::Error(msg.into())
    }

    /// Check if this is the last event of a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentEvent::Complete(_) | AgentEvent::Error(_))
    }

    /// Check if this is a tool-related event
    pub fn is_tool(&self) -> bool {
        matches!(
            self,
            AgentEvent::ToolCallStarted(_) | AgentEvent::ToolCallCompleted { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_checks() {
        assert!(AgentEvent::Complete("done".into()).is_terminal());
        assert!(AgentEvent::error("oops").is_terminal());
        assert!(!AgentEvent::token("hi").is_terminal());
        assert!(!AgentEvent::IterationStarted(1).is_terminal());

        let call = ToolCallRequest::new("a", "search", "{}");
        assert!(AgentEvent::ToolCallStarted(call.clone()).is_tool());
        assert!(AgentEvent::ToolCallCompleted {
            call,
            outcome: ToolExecutionOutcome::failure("nope"),
        }
        .is_tool());
        assert!(!AgentEvent::token("hi").is_tool());
    }
}
