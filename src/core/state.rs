//! Loop state types

use serde::{Deserialize, Serialize};

/// Phase of a single agent run
///
/// A run moves `BuildingPrompt -> Iterating -> StreamingModel ->
/// (ExecutingTools -> Iterating ...)` and ends in exactly one terminal phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopState {
    /// Assembling the initial message list
    BuildingPrompt,

    /// Starting an iteration (cancellation gate, span bookkeeping)
    Iterating {
        /// 1-based iteration number
        iteration: usize,
    },

    /// Waiting on the model stream
    StreamingModel,

    /// Executing a tool call
    ExecutingTools {
        /// Name of the tool being executed
        tool_name: String,
        /// ID of the tool call
        tool_call_id: String,
    },

    /// The model answered without requesting tools
    Complete,

    /// The iteration cap was reached
    MaxIterations,

    /// The run was cancelled
    Aborted,

    /// The run failed
    Failed {
        /// Error message
        message: String,
    },
}

impl LoopState {
    /// Check if the run has ended
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LoopState::Complete
                | LoopState::MaxIterations
                | LoopState::Aborted
                | LoopState::Failed { .. }
        )
    }

    /// Check if the run ended without an error
    pub fn is_success(&self) -> bool {
        matches!(self, LoopState::Complete | LoopState::MaxIterations)
    }

    /// Create an executing tool state
    pub fn executing_tool(name: impl Into<String>, id: impl Into<String>) -> Self {
        LoopState::ExecutingTools {
            tool_name: name.into(),
            tool_call_id: id.into(),
        }
    }

    /// Create a failed state
    pub fn failed(msg: impl Into<String>) -> Self {
        LoopState::Failed {
            message: msg.into(),
        }
    }
}

impl Default for LoopState {
    fn default() -> Self {
        LoopState::BuildingPrompt
    }
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopState::BuildingPrompt => write!(f, "Building prompt"),
            LoopState::Iterating { iteration } => write!(f, "Iteration {}", iteration),
            LoopState::StreamingModel => write!(f, "Streaming model"),
            LoopState::ExecutingTools { tool_name, .. } => {
                write!(f, "Executing tool: {}", tool_name)
            }
            LoopState::Complete => write!(f, "Complete"),
            LoopState::MaxIterations => write!(f, "Max iterations reached"),
            LoopState::Aborted => write!(f, "Aborted"),
            LoopState::Failed { message } => write!(f, "Failed: {}", message),
        }
    }
}
