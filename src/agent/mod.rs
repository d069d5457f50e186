//! Agent loop
//!
//! - `AgentRunner` - Drives one user turn through model and tool iterations
//! - `AgentConfig` / `RunOptions` - Stored defaults and per-run overrides
//! - `AgentObserver` - Progress callbacks
//! - `build_messages` - Prompt assembly from stored history

pub mod config;
pub mod feedback;
pub mod history;
pub mod observer;
pub mod runner;


pub use config::{AgentConfig, RunOptions, DEFAULT_MAX_TOOL_ITERATIONS};
pub use history::{build_messages, ChatTurn, ImageAttachment, TurnRole};
pub use observer::{AgentObserver, ChannelObserver, NoopObserver};
pub use runner::{AgentRunner, RunRequest};
