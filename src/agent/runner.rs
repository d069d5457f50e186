//! Agent Runner
//!
//! The bounded agent loop:
//! - Prompt assembly from stored history
//! - Model turn streamed to the observer
//! - Sequential tool dispatch with tracing
//! - Failure feedback so the model can self-correct
//! - Termination on a text answer, the iteration cap, an error or cancellation

use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use super::config::{AgentConfig, RunOptions};
use super::feedback;
use super::history::{build_messages, ChatTurn, ImageAttachment};
use super::observer::AgentObserver;
use crate::core::{AgentError, AgentResult, LoopState, ToolContext};
use crate::llm::{ChatClient, ChatRequest, Message, StreamEvent, ToolCallRequest, ToolDefinition};
use crate::tools::{ToolDispatcher, ToolExecutionOutcome};
use crate::tracer::{NoopTracer, Tracer};

/// One user turn to run
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// The new user message
    pub user_text: String,
    /// System prompt for this run
    pub system_prompt: String,
    /// Prior conversation, oldest first
    pub history: Vec<ChatTurn>,
    /// Per-run options
    pub options: RunOptions,
}

impl RunRequest {
    pub fn new(user_text: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            user_text: user_text.into(),
            system_prompt: system_prompt.into(),
            history: Vec::new(),
            options: RunOptions::default(),
        }
    }

    pub fn with_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }
}

/// How the loop ended when it did not fail
enum Termination {
    Complete,
    MaxIterations,
}

/// Whether the loop should call the model again
enum IterationResult {
    Finished,
    Continue,
}

/// Loop-private state of one run
struct RunState {
    session_id: String,
    text: String,
    iteration: usize,
    messages: Vec<Message>,
    state: LoopState,
}

impl RunState {
    fn transition(&mut self, next: LoopState) {
        tracing::debug!("[AgentRunner] {} -> {}", self.state, next);
        self.state = next;
    }
}

/// Drives one user turn to a terminal outcome
///
/// # Example
///
/// ```ignore
/// let runner = AgentRunner::new(client, Arc::new(registry))
///     .with_tracer(Arc::new(InMemoryTracer::new()))
///     .with_config(AgentConfig::from_env()?);
///
/// let request = RunRequest::new("What time is it?", "You are helpful")
///     .with_options(RunOptions::new().with_tools(true));
/// runner.run(request, &observer, &CancellationToken::new()).await?;
/// ```
pub struct AgentRunner {
    client: Arc<dyn ChatClient>,
    dispatcher: Arc<dyn ToolDispatcher>,
    tracer: Arc<dyn Tracer>,
    config: AgentConfig,
}

impl AgentRunner {
    /// Create a runner with default configuration and no tracing
    pub fn new(client: Arc<dyn ChatClient>, dispatcher: Arc<dyn ToolDispatcher>) -> Self {
        Self {
            client,
            dispatcher,
            tracer: Arc::new(NoopTracer),
            config: AgentConfig::default(),
        }
    }

    pub fn with_tracer(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Stored configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run one user turn
    ///
    /// Progress and the final answer go to `observer`. The returned error is
    /// the same one passed to `observer.on_error`.
    pub async fn run(
        &self,
        request: RunRequest,
        observer: &dyn AgentObserver,
        cancel: &CancellationToken,
    ) -> AgentResult<()> {
        let config = self.config.merged_with(&request.options);
        let max_iterations = config.max_tool_iterations;

        let tools = if request.options.enable_tools {
            Some(self.dispatcher.definitions()).filter(|defs| !defs.is_empty())
        } else {
            None
        };

        let images: &[ImageAttachment] = if request.options.include_images {
            request.options.pasted_images.as_slice()
        } else {
            &[]
        };
        let messages = build_messages(
            &request.system_prompt,
            &request.history,
            &request.user_text,
            images,
        );

        let session_id = new_session_id();
        tracing::info!(
            "[AgentRunner] Starting run {} ({} messages, {} tools, max {} iterations)",
            session_id,
            messages.len(),
            tools.as_ref().map(|t| t.len()).unwrap_or(0),
            max_iterations
        );
        self.tracer.start_session(&session_id, &request.user_text);

        let ctx = ToolContext::new(session_id.clone(), cancel.clone())
            .with_permission_handler(config.permission_handler.clone());

        let mut run = RunState {
            session_id,
            text: String::new(),
            iteration: 0,
            messages,
            state: LoopState::BuildingPrompt,
        };

        match self
            .drive(&mut run, tools, &ctx, observer, cancel, max_iterations)
            .await
        {
            Ok(termination) => {
                match termination {
                    Termination::Complete => run.transition(LoopState::Complete),
                    Termination::MaxIterations => {
                        tracing::warn!(
                            "[AgentRunner] Max tool iterations ({}) reached",
                            max_iterations
                        );
                        run.transition(LoopState::MaxIterations);
                        run.text.push_str(&format!(
                            "\n\nStopped: reached maximum tool call iterations ({})",
                            max_iterations
                        ));
                        observer.on_message_update(&run.text);
                    }
                }

                if let Some(trace) = self.tracer.end_session(&run.session_id, true) {
                    if config.log_execution_summary {
                        tracing::info!("{}", self.tracer.execution_summary(&trace));
                    }
                }

                tracing::info!(
                    "[AgentRunner] Run {} finished after {} iteration(s)",
                    run.session_id,
                    run.iteration
                );
                observer.on_complete(&run.text);
                Ok(())
            }
            Err(err) => {
                if err.is_cancelled() {
                    tracing::info!("[AgentRunner] Run {} cancelled", run.session_id);
                    run.transition(LoopState::Aborted);
                } else {
                    tracing::error!("[AgentRunner] Run {} failed: {}", run.session_id, err);
                    run.transition(LoopState::failed(err.to_string()));
                }

                self.tracer.end_session(&run.session_id, false);
                observer.on_error(&err);
                Err(err)
            }
        }
    }

    async fn drive(
        &self,
        run: &mut RunState,
        tools: Option<Vec<ToolDefinition>>,
        ctx: &ToolContext,
        observer: &dyn AgentObserver,
        cancel: &CancellationToken,
        max_iterations: usize,
    ) -> AgentResult<Termination> {
        while run.iteration < max_iterations {
            if cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }

            run.iteration += 1;
            let iteration = run.iteration;
            run.transition(LoopState::Iterating { iteration });

            self.tracer.start_iteration(&run.session_id, iteration);
            observer.on_iteration_started(iteration);

            let result = self
                .iterate(run, tools.as_ref(), ctx, observer, cancel)
                .await;
            self.tracer.end_iteration(&run.session_id, iteration);

            if let IterationResult::Finished = result? {
                return Ok(Termination::Complete);
            }
        }

        Ok(Termination::MaxIterations)
    }

    async fn iterate(
        &self,
        run: &mut RunState,
        tools: Option<&Vec<ToolDefinition>>,
        ctx: &ToolContext,
        observer: &dyn AgentObserver,
        cancel: &CancellationToken,
    ) -> AgentResult<IterationResult> {
        run.transition(LoopState::StreamingModel);
        tracing::info!(
            "[AgentRunner] Calling model with {} messages (iteration {})",
            run.messages.len(),
            run.iteration
        );

        let request = ChatRequest::new(run.messages.clone(), tools.cloned());
        let (text, tool_calls) = self
            .stream_turn(request, &mut run.text, observer, cancel)
            .await?;

        if tool_calls.is_empty() {
            return Ok(IterationResult::Finished);
        }

        tracing::info!(
            "[AgentRunner] Model requested {} tool call(s)",
            tool_calls.len()
        );
        run.messages
            .push(Message::assistant_with_tool_calls(&text, tool_calls.clone()));

        let mut results: Vec<(ToolCallRequest, ToolExecutionOutcome)> =
            Vec::with_capacity(tool_calls.len());

        for call in tool_calls {
            run.transition(LoopState::executing_tool(&call.name, &call.id));
            observer.on_tool_call_started(&call);

            self.tracer.start_tool_span(
                &run.session_id,
                &call.id,
                &call.name,
                &call.parsed_arguments(),
            );
            let outcome = self.dispatcher.dispatch(&call, ctx).await;
            self.tracer.end_tool_span(&run.session_id, &call.id, &outcome);

            if outcome.success {
                tracing::debug!("[AgentRunner] Tool {} ({}) succeeded", call.name, call.id);
            } else {
                tracing::warn!(
                    "[AgentRunner] Tool {} ({}) failed: {}",
                    call.name,
                    call.id,
                    outcome.error_message()
                );
            }
            observer.on_tool_call_completed(&call, &outcome);
            results.push((call, outcome));

            if cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
        }

        run.messages
            .extend(feedback::tool_messages(self.dispatcher.as_ref(), &results));
        Ok(IterationResult::Continue)
    }

    /// Consume one model turn, returning its text and tool-call batch
    async fn stream_turn(
        &self,
        request: ChatRequest,
        run_text: &mut String,
        observer: &dyn AgentObserver,
        cancel: &CancellationToken,
    ) -> AgentResult<(String, Vec<ToolCallRequest>)> {
        let mut stream = self
            .client
            .stream_chat(request, cancel)
            .await
            .map_err(|e| client_error(e, cancel))?;

        let mut text = String::new();
        let mut tool_calls: Option<Vec<ToolCallRequest>> = None;

        while let Some(event) = stream.next().await {
            match event {
                Ok(StreamEvent::TextDelta(delta)) => {
                    text.push_str(&delta);
                    run_text.push_str(&delta);
                    observer.on_token(&delta);
                }
                Ok(StreamEvent::ToolCalls(batch)) => {
                    if let Some(previous) = &tool_calls {
                        tracing::warn!(
                            "[AgentRunner] Second tool-call batch in one turn, replacing {} call(s) with {}",
                            previous.len(),
                            batch.len()
                        );
                    }
                    tool_calls = Some(batch);
                }
                Ok(StreamEvent::Done) => {
                    tracing::debug!("[AgentRunner] Stream complete");
                    break;
                }
                Ok(StreamEvent::Error(message)) => {
                    tracing::error!("[AgentRunner] Stream error: {}", message);
                    return Err(AgentError::Stream(message));
                }
                Err(e) => return Err(client_error(e, cancel)),
            }
        }

        if cancel.is_cancelled() {
            return Err(AgentError::Cancelled);
        }

        Ok((text, tool_calls.unwrap_or_default()))
    }
}

/// Map a model client failure, treating failures caused by cancellation as such
fn client_error(error: anyhow::Error, cancel: &CancellationToken) -> AgentError {
    if cancel.is_cancelled() {
        AgentError::Cancelled
    } else {
        AgentError::Provider(error)
    }
}

/// Fresh trace session id: `trace_<unix-millis>_<8 hex>`
fn new_session_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("trace_{}_{}", millis, &suffix[..8])
}

#[cfg(test)]
mod id_tests {
    use super::new_session_id;

    #[test]
    fn test_session_id_format() {
        let id = new_session_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "trace");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(new_session_id(), id);
    }
}
