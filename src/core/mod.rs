//! Core types for the agent runner
//!
//! This module provides the fundamental types used throughout the crate:
//! - `ToolContext` - Per-run state passed to the tool dispatcher
//! - `LoopState` - Phase of an agent run
//! - `AgentEvent` - Progress events
//! - `AgentError` - Error types

pub mod context;
pub mod error;
pub mod output;
pub mod state;

pub use context::ToolContext;
pub use error::{AgentError, AgentResult};
pub use output::AgentEvent;
pub use state::LoopState;
