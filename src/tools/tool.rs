//! Tool trait definition
//!
//! All tools held by the [`ToolRegistry`](super::ToolRegistry) implement this
//! trait to provide a consistent interface.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use super::dispatcher::ToolExecutionOutcome;
use crate::core::ToolContext;
use crate::llm::ToolDefinition;

/// Trait for tools that the agent can use
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the name of this tool
    fn name(&self) -> &str;

    /// Get a description of this tool
    fn description(&self) -> &str;

    /// JSON schema of the arguments object
    fn parameters(&self) -> Value;

    /// Get the tool definition advertised to the model
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.parameters())
    }

    /// Execute the tool with decoded arguments
    ///
    /// `args` is always a JSON object. Returning `Err` is reported to the
    /// model as a failed outcome; it never aborts the run.
    async fn execute(&self, args: &Value, ctx: &ToolContext) -> Result<ToolExecutionOutcome>;

    /// Check if this tool requires permission before execution
    ///
    /// Default is true - tools should generally require permission.
    fn requires_permission(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the input"
        }

        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {"text": {"type": "string"}}})
        }

        async fn execute(&self, args: &Value, _ctx: &ToolContext) -> Result<ToolExecutionOutcome> {
            Ok(ToolExecutionOutcome::with_summary(
                args["text"].as_str().unwrap_or_default(),
            ))
        }
    }

    #[test]
    fn test_default_definition() {
        let def = Echo.definition();
        assert_eq!(def.name, "echo");
        assert_eq!(def.description, "Echo the input");
        assert_eq!(def.parameters["type"], "object");
        assert!(Echo.requires_permission());
    }

    #[tokio::test]
    async fn test_execute() {
        let ctx = ToolContext::new("trace_1", CancellationToken::new());
        let outcome = Echo.execute(&json!({"text": "hi"}), &ctx).await.unwrap();
        assert_eq!(outcome.summary.as_deref(), Some("hi"));
    }
}
