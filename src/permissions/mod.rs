//! Permission system for tool execution
//!
//! A [`PermissionHandler`] is asked before a tool that requires permission
//! runs. It may suspend for as long as it likes (e.g. waiting on a user
//! prompt) and answers with a plain allow/deny.
//!
//! ## Example
//!
//! ```rust,ignore
//! use agentic_runner::permissions::{permission_fn, AllowListPermissions};
//! use std::sync::Arc;
//!
//! let prompt = permission_fn(|_call_id, tool| async move { tool != "delete_file" });
//! let perms = Arc::new(AllowListPermissions::with_tools(["read_file"]).with_fallback(prompt));
//! ```

mod manager;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

pub use manager::AllowListPermissions;

/// Decides whether a tool call may run
#[async_trait]
pub trait PermissionHandler: Send + Sync {
    /// Ask for permission to run `tool_name` for the call `tool_call_id`
    async fn request_permission(&self, tool_call_id: &str, tool_name: &str) -> bool;
}

/// Adapts an async closure into a [`PermissionHandler`]
pub struct FnPermissionHandler<F> {
    func: F,
}

impl<F, Fut> FnPermissionHandler<F>
where
    F: Fn(String, String) -> Fut + Send + Sync,
    Fut: Future<Output = bool> + Send,
{
    /// Wrap a closure taking `(tool_call_id, tool_name)`
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F, Fut> PermissionHandler for FnPermissionHandler<F>
where
    F: Fn(String, String) -> Fut + Send + Sync,
    Fut: Future<Output = bool> + Send,
{
    async fn request_permission(&self, tool_call_id: &str, tool_name: &str) -> bool {
        (self.func)(tool_call_id.to_string(), tool_name.to_string()).await
    }
}

/// Build a shared permission handler from an async closure
pub fn permission_fn<F, Fut>(func: F) -> Arc<dyn PermissionHandler>
where
    F: Fn(String, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    Arc::new(FnPermissionHandler::new(func))
}
