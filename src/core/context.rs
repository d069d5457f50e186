//! Tool context - per-run state handed to the tool dispatcher

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::permissions::PermissionHandler;

/// Context passed to every tool dispatch
///
/// Carries the merged run configuration that tools and the dispatcher need:
/// the optional interactive permission handler, the run's cancellation token
/// and the trace session id.
#[derive(Clone)]
pub struct ToolContext {
    /// Trace session id of the run
    pub session_id: String,

    /// Optional permission handler (may prompt the user)
    pub permission_handler: Option<Arc<dyn PermissionHandler>>,

    /// Cancellation token of the run
    pub cancel: CancellationToken,
}

impl ToolContext {
    /// Create a new context
    pub fn new(session_id: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            session_id: session_id.into(),
            permission_handler: None,
            cancel,
        }
    }

    /// Set the permission handler
    pub fn with_permission_handler(mut self, handler: Option<Arc<dyn PermissionHandler>>) -> Self {
        self.permission_handler = handler;
        self
    }

    /// Check whether the run has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Ask the permission handler whether a tool call may run
    ///
    /// Returns `true` when no handler is configured.
    pub async fn request_permission(&self, tool_call_id: &str, tool_name: &str) -> bool {
        match &self.permission_handler {
            Some(handler) => handler.request_permission(tool_call_id, tool_name).await,
            None => true,
        }
    }
}

impl fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolContext")
            .field("session_id", &self.session_id)
            .field("has_permission_handler", &self.permission_handler.is_some())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
