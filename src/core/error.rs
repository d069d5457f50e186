//! Agent error types

use thiserror::Error;

/// Errors that terminate an agent run
///
/// Tool failures are not errors: they come back as a failed
/// [`ToolExecutionOutcome`](crate::tools::ToolExecutionOutcome) and are fed
/// to the model. Only the variants below end a run.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The run was cancelled by the user
    #[error("Agent run cancelled")]
    Cancelled,

    /// The model stream reported a terminal error
    #[error("Model stream error: {0}")]
    Stream(String),

    /// The model client failed (transport, HTTP status, decoding)
    #[error("Model request failed: {0}")]
    Provider(#[source] anyhow::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AgentError {
    /// Create a stream error from a message
    pub fn stream(msg: impl Into<String>) -> Self {
        AgentError::Stream(msg.into())
    }

    /// Whether this error is a user cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AgentError::Cancelled)
    }
}

/// Result type alias for agent operations
pub type AgentResult<T> = Result<T, AgentError>;
