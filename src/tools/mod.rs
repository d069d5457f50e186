//! Tool system for the agent runner
//!
//! This module provides:
//! - `ToolDispatcher` trait - The contract the agent loop executes tools through
//! - `ToolExecutionOutcome` - Result of one dispatch
//! - `Tool` trait - Interface for implementing individual tools
//! - `ToolRegistry` - Name-keyed registry implementing `ToolDispatcher`

mod dispatcher;
mod registry;
mod tool;

pub use crate::core::ToolContext;
pub use dispatcher::{ToolDispatcher, ToolExecutionOutcome};
pub use registry::ToolRegistry;
pub use tool::Tool;
