//! In-memory tracer with optional JSON export

use std::collections::{HashMap, VecDeque};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde_json::Value;

use super::{ExecutionTrace, IterationSpan, ToolSpan, TraceStatus, Tracer};
use crate::core::AgentResult;
use crate::tools::ToolExecutionOutcome;

const DEFAULT_MAX_COMPLETED: usize = 32;

#[derive(Debug, Default)]
struct TracerState {
    active: HashMap<String, ExecutionTrace>,
    completed: VecDeque<ExecutionTrace>,
}

/// Tracer that keeps traces in memory
///
/// Open sessions live in a map keyed by session id. Finished sessions move to
/// a bounded list (oldest dropped first) and, when an export directory is
/// set, are written to `<dir>/<session_id>.json`.
pub struct InMemoryTracer {
    state: Mutex<TracerState>,
    max_completed: usize,
    export_dir: Option<PathBuf>,
}

impl InMemoryTracer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_COMPLETED)
    }

    /// Keep at most `max_completed` finished traces
    pub fn with_capacity(max_completed: usize) -> Self {
        Self {
            state: Mutex::new(TracerState::default()),
            max_completed: max_completed.max(1),
            export_dir: None,
        }
    }

    /// Export every finished trace as pretty JSON into `dir`
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = Some(dir.into());
        self
    }

    fn lock(&self) -> MutexGuard<'_, TracerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a trace, open or finished
    pub fn trace(&self, session_id: &str) -> Option<ExecutionTrace> {
        let state = self.lock();
        state.active.get(session_id).cloned().or_else(|| {
            state
                .completed
                .iter()
                .rev()
                .find(|t| t.session_id == session_id)
                .cloned()
        })
    }

    /// Finished traces, oldest first
    pub fn completed_traces(&self) -> Vec<ExecutionTrace> {
        self.lock().completed.iter().cloned().collect()
    }

    /// Number of sessions still open
    pub fn active_sessions(&self) -> usize {
        self.lock().active.len()
    }

    fn with_active<F>(&self, session_id: &str, f: F)
    where
        F: FnOnce(&mut ExecutionTrace),
    {
        match self.lock().active.get_mut(session_id) {
            Some(trace) => f(trace),
            None => tracing::warn!("[Tracer] Event for unknown session {}", session_id),
        }
    }

    /// Write a finished trace, off the async worker threads when a runtime
    /// is available
    fn export(&self, trace: &ExecutionTrace) {
        let Some(dir) = &self.export_dir else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let dir = dir.clone();
                let trace = trace.clone();
                handle.spawn_blocking(move || log_export(&dir, &trace));
            }
            Err(_) => log_export(dir, trace),
        }
    }
}

impl Default for InMemoryTracer {
    fn default() -> Self {
        Self::new()
    }
}

fn log_export(dir: &Path, trace: &ExecutionTrace) {
    match write_trace(dir, trace) {
        Ok(path) => tracing::debug!("[Tracer] Exported trace to {:?}", path),
        Err(e) => tracing::warn!(
            "[Tracer] Failed to export trace {}: {}",
            trace.session_id,
            e
        ),
    }
}

fn write_trace(dir: &Path, trace: &ExecutionTrace) -> AgentResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.json", trace.session_id));
    let writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(writer, trace)?;
    Ok(path)
}

impl Tracer for InMemoryTracer {
    fn start_session(&self, session_id: &str, user_input: &str) {
        tracing::debug!("[Tracer] Session started: {}", session_id);
        let mut state = self.lock();
        if state.active.contains_key(session_id) {
            tracing::warn!("[Tracer] Session {} already open, ignoring restart", session_id);
            return;
        }
        state
            .active
            .insert(session_id.to_string(), ExecutionTrace::new(session_id, user_input));
    }

    fn start_iteration(&self, session_id: &str, iteration: usize) {
        self.with_active(session_id, |trace| {
            trace.iterations.push(IterationSpan {
                iteration,
                started_at: Utc::now(),
                ended_at: None,
            });
        });
    }

    fn end_iteration(&self, session_id: &str, iteration: usize) {
        self.with_active(session_id, |trace| {
            match trace
                .iterations
                .iter_mut()
                .rev()
                .find(|s| s.iteration == iteration && s.ended_at.is_none())
            {
                Some(span) => span.ended_at = Some(Utc::now()),
                None => tracing::warn!("[Tracer] No open iteration {} to end", iteration),
            }
        });
    }

    fn start_tool_span(&self, session_id: &str, tool_call_id: &str, name: &str, arguments: &Value) {
        self.with_active(session_id, |trace| {
            let iteration = trace.iterations.last().map(|s| s.iteration);
            trace.tool_spans.push(ToolSpan {
                tool_call_id: tool_call_id.to_string(),
                name: name.to_string(),
                arguments: arguments.clone(),
                iteration,
                started_at: Utc::now(),
                ended_at: None,
                outcome: None,
            });
        });
    }

    fn end_tool_span(&self, session_id: &str, tool_call_id: &str, outcome: &ToolExecutionOutcome) {
        self.with_active(session_id, |trace| {
            match trace
                .tool_spans
                .iter_mut()
                .rev()
                .find(|s| s.tool_call_id == tool_call_id && s.is_open())
            {
                Some(span) => {
                    span.ended_at = Some(Utc::now());
                    span.outcome = Some(outcome.clone());
                }
                None => tracing::warn!("[Tracer] No open tool span {} to end", tool_call_id),
            }
        });
    }

    fn end_session(&self, session_id: &str, success: bool) -> Option<ExecutionTrace> {
        let finished = {
            let mut state = self.lock();
            let Some(mut trace) = state.active.remove(session_id) else {
                tracing::warn!("[Tracer] end_session for unknown or ended session {}", session_id);
                return None;
            };

            trace.status = if success {
                TraceStatus::Success
            } else {
                TraceStatus::Failure
            };
            trace.ended_at = Some(Utc::now());

            state.completed.push_back(trace.clone());
            while state.completed.len() > self.max_completed {
                state.completed.pop_front();
            }
            trace
        };

        tracing::debug!(
            "[Tracer] Session ended: {} ({:?})",
            finished.session_id,
            finished.status
        );
        self.export(&finished);
        Some(finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run_session(tracer: &InMemoryTracer, id: &str) -> Option<ExecutionTrace> {
        tracer.start_session(id, "question");
        tracer.start_iteration(id, 1);
        tracer.start_tool_span(id, "call_1", "search", &json!({"q": "x"}));
        tracer.end_tool_span(id, "call_1", &ToolExecutionOutcome::with_summary("found"));
        tracer.end_iteration(id, 1);
        tracer.end_session(id, true)
    }

    #[test]
    fn test_records_nested_spans() {
        let tracer = InMemoryTracer::new();
        let trace = run_session(&tracer, "s1").unwrap();

        assert_eq!(trace.status, TraceStatus::Success);
        assert_eq!(trace.user_input, "question");
        assert_eq!(trace.iterations.len(), 1);
        assert!(trace.iterations[0].ended_at.is_some());
        assert_eq!(trace.tool_spans.len(), 1);
        assert_eq!(trace.tool_spans[0].iteration, Some(1));
        assert_eq!(trace.tool_spans[0].arguments, json!({"q": "x"}));
        assert!(trace.tool_spans[0].succeeded());
        assert_eq!(tracer.active_sessions(), 0);
    }

    #[test]
    fn test_terminal_status_set_once() {
        let tracer = InMemoryTracer::new();
        tracer.start_session("s1", "q");
        assert!(tracer.end_session("s1", false).is_some());
        assert!(tracer.end_session("s1", true).is_none());
        assert_eq!(tracer.trace("s1").unwrap().status, TraceStatus::Failure);
    }

    #[test]
    fn test_unknown_session_is_ignored() {
        let tracer = InMemoryTracer::new();
        tracer.start_iteration("missing", 1);
        tracer.end_tool_span("missing", "x", &ToolExecutionOutcome::failure("x"));
        assert!(tracer.end_session("missing", true).is_none());
        assert!(tracer.trace("missing").is_none());
    }

    #[test]
    fn test_completed_list_is_bounded() {
        let tracer = InMemoryTracer::with_capacity(2);
        for id in ["a", "b", "c"] {
            run_session(&tracer, id);
        }
        let ids: Vec<String> = tracer
            .completed_traces()
            .into_iter()
            .map(|t| t.session_id)
            .collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_export_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let export_dir = dir.path().join("traces");
        let tracer = InMemoryTracer::new().with_export_dir(&export_dir);

        run_session(&tracer, "trace_export").unwrap();

        let content = fs::read_to_string(export_dir.join("trace_export.json")).unwrap();
        let exported: ExecutionTrace = serde_json::from_str(&content).unwrap();
        assert_eq!(exported.session_id, "trace_export");
        assert_eq!(exported.status, TraceStatus::Success);
        assert_eq!(exported.tool_spans[0].name, "search");
    }

    #[tokio::test]
    async fn test_export_inside_runtime_runs_off_the_caller() {
        let dir = tempfile::tempdir().unwrap();
        let tracer = InMemoryTracer::new().with_export_dir(dir.path());

        let trace = run_session(&tracer, "trace_async").unwrap();
        assert_eq!(trace.status, TraceStatus::Success);

        let path = dir.path().join("trace_async.json");
        let mut exported = None;
        for _ in 0..200 {
            if let Ok(content) = fs::read_to_string(&path) {
                if let Ok(parsed) = serde_json::from_str::<ExecutionTrace>(&content) {
                    exported = Some(parsed);
                    break;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(exported.unwrap().session_id, "trace_async");
    }

    #[test]
    fn test_export_failure_does_not_lose_trace() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, "x").unwrap();
        let tracer = InMemoryTracer::new().with_export_dir(&blocker);

        assert!(run_session(&tracer, "s1").is_some());
        assert_eq!(tracer.completed_traces().len(), 1);
    }
}
