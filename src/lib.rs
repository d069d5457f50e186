//! Agentic Runner
//!
//! A bounded agent loop: stream a model turn, dispatch any requested tool
//! calls one at a time, feed the results back and repeat until the model
//! answers in plain text or the iteration cap is hit.

pub mod agent;
pub mod core;
pub mod llm;
pub mod permissions;
pub mod tools;
pub mod tracer;

// Optional components
pub mod cli;
pub mod logging;

pub use agent::{AgentConfig, AgentObserver, AgentRunner, RunOptions, RunRequest};
pub use core::{AgentError, AgentResult};
