//! Tool dispatcher contract
//!
//! The agent loop never calls tools directly. It asks a [`ToolDispatcher`] for
//! the catalog, hands it one call at a time and receives a
//! [`ToolExecutionOutcome`] back. Failures are data: a dispatcher must not
//! panic or return an error for a failed tool.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::ToolContext;
use crate::llm::{ToolCallRequest, ToolDefinition};

/// Outcome of a single tool dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExecutionOutcome {
    /// Whether the tool succeeded
    pub success: bool,

    /// Structured result data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Human-readable summary of the result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Error message when `success` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolExecutionOutcome {
    /// Successful outcome carrying structured data
    pub fn with_data(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            summary: None,
            error: None,
        }
    }

    /// Successful outcome carrying a text summary
    pub fn with_summary(summary: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            summary: Some(summary.into()),
            error: None,
        }
    }

    /// Failed outcome
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            summary: None,
            error: Some(error.into()),
        }
    }

    /// Attach a summary to an outcome
    pub fn summarized(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Error message, or a generic one when the dispatcher left it empty
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or("Tool execution failed")
    }
}

/// Source of tools for the agent loop
#[async_trait]
pub trait ToolDispatcher: Send + Sync {
    /// Tool definitions to advertise to the model
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Run one tool call to completion
    async fn dispatch(&self, call: &ToolCallRequest, ctx: &ToolContext) -> ToolExecutionOutcome;

    /// Render a successful outcome as tool-message content for the model
    fn format_result(&self, outcome: &ToolExecutionOutcome) -> String {
        if let Some(summary) = &outcome.summary {
            return summary.clone();
        }
        match &outcome.data {
            Some(data) => json!({"success": true, "data": data}).to_string(),
            None => json!({"success": true}).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Empty;

    #[async_trait]
    impl ToolDispatcher for Empty {
        fn definitions(&self) -> Vec<ToolDefinition> {
            Vec::new()
        }

        async fn dispatch(&self, call: &ToolCallRequest, _ctx: &ToolContext) -> ToolExecutionOutcome {
            ToolExecutionOutcome::failure(format!("Unknown tool: {}", call.name))
        }
    }

    #[test]
    fn test_outcome_constructors() {
        let ok = ToolExecutionOutcome::with_summary("done");
        assert!(ok.success);
        assert_eq!(ok.summary.as_deref(), Some("done"));

        let failed = ToolExecutionOutcome::failure("boom");
        assert!(!failed.success);
        assert_eq!(failed.error_message(), "boom");
    }

    #[test]
    fn test_default_format_prefers_summary() {
        let outcome = ToolExecutionOutcome::with_data(json!({"n": 1})).summarized("one result");
        assert_eq!(Empty.format_result(&outcome), "one result");
    }

    #[test]
    fn test_default_format_data_and_bare_success() {
        let outcome = ToolExecutionOutcome::with_data(json!({"n": 1}));
        let value: Value = serde_json::from_str(&Empty.format_result(&outcome)).unwrap();
        assert_eq!(value, json!({"success": true, "data": {"n": 1}}));

        let bare = ToolExecutionOutcome {
            success: true,
            data: None,
            summary: None,
            error: None,
        };
        assert_eq!(Empty.format_result(&bare), r#"{"success":true}"#);
    }

    #[test]
    fn test_outcome_serialization_skips_empty_fields() {
        let json = serde_json::to_value(ToolExecutionOutcome::failure("x")).unwrap();
        assert_eq!(json, json!({"success": false, "error": "x"}));
    }
}
