//! Terminal front end for the agent runner

mod console;
mod renderer;

pub use console::{Console, ConsolePermissionHandler, PermissionChoice};
pub use renderer::ConsoleRenderer;
