//! Tool result feedback
//!
//! Converts dispatch outcomes into `tool` messages. Failures carry a fixed
//! guidance text so the model can correct itself on the next iteration.

use serde_json::json;

use crate::llm::{Message, ToolCallRequest};
use crate::tools::{ToolDispatcher, ToolExecutionOutcome};

/// Guidance sent to the model with every failed tool call
pub const FAILURE_GUIDANCE: &str = "The tool call failed. Review the error, then retry with \
corrected arguments, try a different approach, or explain the problem to the user.";

/// Content of the tool message for a failed outcome
pub fn failure_payload(outcome: &ToolExecutionOutcome) -> String {
    json!({
        "success": false,
        "error": outcome.error_message(),
        "guidance": FAILURE_GUIDANCE,
    })
    .to_string()
}

/// Build one tool message per call, in call order
pub fn tool_messages(
    dispatcher: &dyn ToolDispatcher,
    results: &[(ToolCallRequest, ToolExecutionOutcome)],
) -> Vec<Message> {
    results
        .iter()
        .map(|(call, outcome)| {
            let content = if outcome.success {
                dispatcher.format_result(outcome)
            } else {
                failure_payload(outcome)
            };
            Message::tool(call.id.clone(), content)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ToolContext;
    use crate::llm::ToolDefinition;
    use async_trait::async_trait;
    use serde_json::Value;

    struct Upper;

    #[async_trait]
    impl ToolDispatcher for Upper {
        fn definitions(&self) -> Vec<ToolDefinition> {
            Vec::new()
        }

        async fn dispatch(&self, _call: &ToolCallRequest, _ctx: &ToolContext) -> ToolExecutionOutcome {
            ToolExecutionOutcome::with_summary("unused")
        }

        fn format_result(&self, outcome: &ToolExecutionOutcome) -> String {
            outcome.summary.clone().unwrap_or_default().to_uppercase()
        }
    }

    #[test]
    fn test_failure_payload_shape() {
        let payload = failure_payload(&ToolExecutionOutcome::failure("Could not find it."));
        let value: Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "Could not find it.");
        assert_eq!(value["guidance"], FAILURE_GUIDANCE);
    }

    #[test]
    fn test_messages_keep_order_and_use_dispatcher_format() {
        let results = vec![
            (
                ToolCallRequest::new("a", "search", "{}"),
                ToolExecutionOutcome::with_summary("found"),
            ),
            (
                ToolCallRequest::new("b", "fetch", "{}"),
                ToolExecutionOutcome::failure("timeout"),
            ),
        ];

        let messages = tool_messages(&Upper, &results);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], Message::tool("a", "FOUND"));

        let Message::Tool {
            tool_call_id,
            content,
        } = &messages[1]
        else {
            panic!("expected tool message");
        };
        assert_eq!(tool_call_id, "b");
        assert!(content.contains("\"success\":false"));
        assert!(content.contains("timeout"));
    }
}
