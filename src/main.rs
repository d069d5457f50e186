use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use agentic_runner::agent::{AgentConfig, AgentRunner, ChatTurn, RunOptions, RunRequest};
use agentic_runner::cli::{Console, ConsolePermissionHandler, ConsoleRenderer};
use agentic_runner::core::ToolContext;
use agentic_runner::llm::{ChatClient, OpenAiClient};
use agentic_runner::logging;
use agentic_runner::permissions::AllowListPermissions;
use agentic_runner::tools::{Tool, ToolExecutionOutcome, ToolRegistry};
use agentic_runner::tracer::InMemoryTracer;

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Use the available tools when they help answer the user.";

/// Demo tool: reports the current local time
struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Get the current local date and time"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "format": {
                    "type": "string",
                    "description": "Optional strftime format, defaults to RFC 3339"
                }
            }
        })
    }

    async fn execute(&self, args: &Value, _ctx: &ToolContext) -> Result<ToolExecutionOutcome> {
        let now = chrono::Local::now();
        let text = match args.get("format").and_then(|v| v.as_str()) {
            Some(format) => {
                let items: Vec<_> = chrono::format::StrftimeItems::new(format).collect();
                if items.contains(&chrono::format::Item::Error) {
                    return Ok(ToolExecutionOutcome::failure(format!(
                        "Invalid time format: {}",
                        format
                    )));
                }
                now.format_with_items(items.into_iter()).to_string()
            }
            None => now.to_rfc3339(),
        };
        Ok(ToolExecutionOutcome::with_data(json!({ "time": text })).summarized(text))
    }

    fn requires_permission(&self) -> bool {
        false
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Keep the guard alive so file logs are flushed on exit
    let _log_guard = logging::init_logging()?;

    tracing::info!("=== Agentic Runner Starting ===");

    let client = Arc::new(OpenAiClient::from_env()?);
    let model = client.model();

    let mut registry = ToolRegistry::new();
    registry.register(CurrentTimeTool);
    tracing::info!("Registered {} tools", registry.len());

    let console = Console::new();
    let remembered = Arc::new(AllowListPermissions::new());
    let permissions = Arc::new(ConsolePermissionHandler::new(console, remembered));

    let config = match std::env::var("AGENT_SETTINGS") {
        Ok(path) => AgentConfig::load_settings(path)?,
        Err(_) => AgentConfig::new(),
    }
    .with_env_overrides()?
    .with_permission_handler(permissions);

    let tracer = match std::env::var("AGENT_TRACE_DIR") {
        Ok(dir) => InMemoryTracer::new().with_export_dir(dir),
        Err(_) => InMemoryTracer::new(),
    };

    let runner = AgentRunner::new(client, Arc::new(registry))
        .with_tracer(Arc::new(tracer))
        .with_config(config);
    let renderer = ConsoleRenderer::new(console);

    // In-memory conversation store for this session
    let mut history: Vec<ChatTurn> = Vec::new();

    console.print_banner(&model);

    loop {
        let Some(input) = tokio::task::spawn_blocking(move || console.read_input()).await?? else {
            break;
        };

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            console.print_system("Shutting down...");
            break;
        }
        if input.is_empty() {
            continue;
        }

        let cancel = CancellationToken::new();
        let interrupt = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };

        let request = RunRequest::new(input.clone(), SYSTEM_PROMPT)
            .with_history(history.clone())
            .with_options(RunOptions::new().with_tools(true));

        let result = runner.run(request, &renderer, &cancel).await;
        interrupt.abort();

        history.push(ChatTurn::user(input));
        match result {
            Ok(()) => {
                if let Some(text) = renderer.take_final_text() {
                    history.push(ChatTurn::assistant(text));
                }
            }
            Err(e) => history.push(ChatTurn::error(e.to_string())),
        }

        console.println();
    }

    tracing::info!("=== Agentic Runner Shutting Down ===");

    Ok(())
}
