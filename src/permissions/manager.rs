//! Allow-list permission gate
//!
//! Tools on the allow list run without asking. Everything else goes to the
//! fallback handler (usually an interactive prompt) or is denied when there
//! is none.

use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use super::PermissionHandler;

/// Permission handler that auto-approves allow-listed tools
///
/// Rules live behind a lock so an `Arc<AllowListPermissions>` can be shared
/// between the host (which adds rules when the user says "always allow")
/// and running agents, which see the new rules immediately.
#[derive(Default)]
pub struct AllowListPermissions {
    allowed: RwLock<BTreeSet<String>>,
    fallback: Option<Arc<dyn PermissionHandler>>,
}

impl AllowListPermissions {
    /// Create an empty allow list that denies everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with initial allowed tools
    pub fn with_tools<I, S>(tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: RwLock::new(tools.into_iter().map(Into::into).collect()),
            fallback: None,
        }
    }

    /// Ask this handler for tools that are not on the list
    pub fn with_fallback(mut self, fallback: Arc<dyn PermissionHandler>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Allow a tool for the rest of the session
    pub fn allow_tool(&self, tool_name: impl Into<String>) {
        let tool_name = tool_name.into();
        let mut allowed = self.allowed.write().unwrap_or_else(PoisonError::into_inner);
        if allowed.insert(tool_name.clone()) {
            tracing::info!("[Permissions] Adding allow rule for {}", tool_name);
        }
    }

    /// Remove a tool from the list
    pub fn revoke_tool(&self, tool_name: &str) -> bool {
        self.allowed
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(tool_name)
    }

    /// Check if a tool is on the list
    pub fn is_allowed(&self, tool_name: &str) -> bool {
        self.allowed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(tool_name)
    }

    /// Get all allowed tools, sorted
    pub fn allowed_tools(&self) -> Vec<String> {
        self.allowed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PermissionHandler for AllowListPermissions {
    async fn request_permission(&self, tool_call_id: &str, tool_name: &str) -> bool {
        if self.is_allowed(tool_name) {
            tracing::debug!("[Permissions] {} allowed by rule", tool_name);
            return true;
        }

        match &self.fallback {
            Some(fallback) => fallback.request_permission(tool_call_id, tool_name).await,
            None => {
                tracing::info!("[Permissions] {} denied (no rule, no fallback)", tool_name);
                false
            }
        }
    }
}
