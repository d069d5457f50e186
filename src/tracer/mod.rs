//! Execution tracing
//!
//! The agent loop reports a parallel, structured record of every run to a
//! [`Tracer`]: one session per run, one span per iteration and one span per
//! tool call. Recorders are fire-and-forget and must never fail the run.

pub mod memory;

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::ToolExecutionOutcome;

pub use memory::InMemoryTracer;

/// Terminal status of a trace session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStatus {
    /// Session still open
    Running,
    /// Run completed (naturally or at the iteration cap)
    Success,
    /// Run failed or was cancelled
    Failure,
}

/// One model iteration of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationSpan {
    pub iteration: usize,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// One tool call of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpan {
    pub tool_call_id: String,
    pub name: String,
    pub arguments: Value,
    /// Iteration the call belongs to
    pub iteration: Option<usize>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub outcome: Option<ToolExecutionOutcome>,
}

impl ToolSpan {
    /// Whether the span is still waiting for its outcome
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Whether the tool finished successfully
    pub fn succeeded(&self) -> bool {
        self.outcome.as_ref().map(|o| o.success).unwrap_or(false)
    }
}

/// Full record of one agent run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTrace {
    pub session_id: String,
    pub user_input: String,
    pub status: TraceStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub iterations: Vec<IterationSpan>,
    pub tool_spans: Vec<ToolSpan>,
}

impl ExecutionTrace {
    /// Start a new running trace
    pub fn new(session_id: impl Into<String>, user_input: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_input: user_input.into(),
            status: TraceStatus::Running,
            started_at: Utc::now(),
            ended_at: None,
            iterations: Vec::new(),
            tool_spans: Vec::new(),
        }
    }

    /// Wall-clock duration in milliseconds (up to now while running)
    pub fn duration_ms(&self) -> i64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds()
    }

    /// Number of tool calls that did not succeed
    pub fn failed_tool_calls(&self) -> usize {
        self.tool_spans.iter().filter(|s| !s.succeeded()).count()
    }
}

/// Render the human-readable summary of a trace
pub fn format_summary(trace: &ExecutionTrace) -> String {
    let status = match trace.status {
        TraceStatus::Running => "running",
        TraceStatus::Success => "success",
        TraceStatus::Failure => "failure",
    };

    let mut out = format!(
        "Trace {}: {}, {} iteration(s), {} tool call(s) ({} failed), {}ms",
        trace.session_id,
        status,
        trace.iterations.len(),
        trace.tool_spans.len(),
        trace.failed_tool_calls(),
        trace.duration_ms()
    );

    for (i, span) in trace.tool_spans.iter().enumerate() {
        let _ = write!(out, "\n  [{}] {} ({}) ", i + 1, span.name, span.tool_call_id);
        match &span.outcome {
            Some(outcome) if outcome.success => {
                out.push_str("ok");
                if let Some(summary) = &outcome.summary {
                    let _ = write!(out, ": {}", summary);
                }
            }
            Some(outcome) => {
                let _ = write!(out, "failed: {}", outcome.error_message());
            }
            None => out.push_str("unfinished"),
        }
    }

    out
}

/// Receiver of execution trace events
///
/// Session ids are unique per run, so one tracer may be shared by
/// concurrent runs.
pub trait Tracer: Send + Sync {
    /// Open a session for a run
    fn start_session(&self, session_id: &str, user_input: &str);

    /// Open an iteration span
    fn start_iteration(&self, session_id: &str, iteration: usize);

    /// Close an iteration span
    fn end_iteration(&self, session_id: &str, iteration: usize);

    /// Open a tool span
    fn start_tool_span(&self, session_id: &str, tool_call_id: &str, name: &str, arguments: &Value);

    /// Close a tool span with its outcome
    fn end_tool_span(&self, session_id: &str, tool_call_id: &str, outcome: &ToolExecutionOutcome);

    /// Close the session, returning the finished trace if one was recorded
    fn end_session(&self, session_id: &str, success: bool) -> Option<ExecutionTrace>;

    /// Human-readable summary of a finished trace
    fn execution_summary(&self, trace: &ExecutionTrace) -> String {
        format_summary(trace)
    }
}

/// Tracer that records nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

impl Tracer for NoopTracer {
    fn start_session(&self, _session_id: &str, _user_input: &str) {}

    fn start_iteration(&self, _session_id: &str, _iteration: usize) {}

    fn end_iteration(&self, _session_id: &str, _iteration: usize) {}

    fn start_tool_span(&self, _session_id: &str, _tool_call_id: &str, _name: &str, _arguments: &Value) {}

    fn end_tool_span(&self, _session_id: &str, _tool_call_id: &str, _outcome: &ToolExecutionOutcome) {}

    fn end_session(&self, _session_id: &str, _success: bool) -> Option<ExecutionTrace> {
        None
    }
}
