//! Tool registry for managing available tools
//!
//! The registry holds all tools that are available to the agent and is the
//! stock [`ToolDispatcher`]: it resolves calls by name, decodes arguments,
//! gates on permission and turns every failure into an outcome.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::dispatcher::{ToolDispatcher, ToolExecutionOutcome};
use super::tool::Tool;
use crate::core::ToolContext;
use crate::llm::{ToolCallRequest, ToolDefinition};

/// Registry that holds all available tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_arc(Arc::new(tool));
    }

    /// Register a shared tool
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        tracing::info!("[ToolRegistry] Registering tool: {}", name);
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!("[ToolRegistry] Replaced existing tool: {}", name);
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Check if a tool requires permission
    pub fn requires_permission(&self, name: &str) -> bool {
        self.tools
            .get(name)
            .map(|t| t.requires_permission())
            .unwrap_or(true)
    }

    /// Get the list of tool names, sorted
    pub fn tool_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_arguments(raw: &str) -> Result<Value, String> {
    let raw = if raw.trim().is_empty() { "{}" } else { raw };
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(other) => Err(format!(
            "Invalid arguments: expected a JSON object, got {}",
            json_kind(&other)
        )),
        Err(e) => Err(format!("Invalid arguments: {}", e)),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl ToolDispatcher for ToolRegistry {
    fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> =
            self.tools.values().map(|t| t.definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    async fn dispatch(&self, call: &ToolCallRequest, ctx: &ToolContext) -> ToolExecutionOutcome {
        let Some(tool) = self.get(&call.name) else {
            tracing::warn!("[ToolRegistry] Unknown tool requested: {}", call.name);
            return ToolExecutionOutcome::failure(format!("Unknown tool: {}", call.name));
        };

        let args = match decode_arguments(&call.arguments) {
            Ok(args) => args,
            Err(message) => {
                tracing::warn!("[ToolRegistry] {} for tool {}", message, call.name);
                return ToolExecutionOutcome::failure(message);
            }
        };

        if tool.requires_permission() && ctx.permission_handler.is_some() {
            tracing::debug!("[ToolRegistry] Requesting permission for {}", call.name);
            if !ctx.request_permission(&call.id, &call.name).await {
                tracing::info!("[ToolRegistry] Permission denied for {}", call.name);
                return ToolExecutionOutcome::failure(format!(
                    "User denied permission for: {}",
                    call.name
                ));
            }
        }

        tracing::info!("[ToolRegistry] Executing tool: {}", call.name);
        tracing::debug!("[ToolRegistry] Input: {}", args);

        match tool.execute(&args, ctx).await {
            Ok(outcome) => {
                tracing::debug!(
                    "[ToolRegistry] Tool {} completed. Success: {}",
                    call.name,
                    outcome.success
                );
                outcome
            }
            Err(e) => {
                tracing::warn!("[ToolRegistry] Tool {} failed: {:#}", call.name, e);
                ToolExecutionOutcome::failure(format!("Tool execution failed: {:#}", e))
            }
        }
    }
}
