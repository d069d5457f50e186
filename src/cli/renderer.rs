//! Console Renderer - renders a run's progress to the terminal
//!
//! The `ConsoleRenderer` is an opt-in [`AgentObserver`] that prints streaming
//! text and tool activity. It can be replaced with any other observer (a UI
//! bridge, a [`ChannelObserver`](crate::agent::ChannelObserver), ...).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::agent::AgentObserver;
use crate::core::AgentError;
use crate::llm::ToolCallRequest;
use crate::tools::ToolExecutionOutcome;

use super::console::Console;

/// Terminal observer for agent runs
///
/// # Example
///
/// ```ignore
/// let renderer = ConsoleRenderer::new(Console::new());
/// runner.run(request, &renderer, &cancel).await?;
/// ```
pub struct ConsoleRenderer {
    console: Console,
    show_tools: bool,
    in_text: AtomicBool,
    printed: Mutex<String>,
    completed: Mutex<Option<String>>,
}

impl ConsoleRenderer {
    pub fn new(console: Console) -> Self {
        Self {
            console,
            show_tools: true,
            in_text: AtomicBool::new(false),
            printed: Mutex::new(String::new()),
            completed: Mutex::new(None),
        }
    }

    /// Set whether to show tool execution details
    pub fn show_tools(mut self, show: bool) -> Self {
        self.show_tools = show;
        self
    }

    /// Final text of the last completed run, if not taken yet
    pub fn take_final_text(&self) -> Option<String> {
        self.completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Get the underlying console
    pub fn console(&self) -> &Console {
        &self.console
    }

    fn start_text(&self) {
        if !self.in_text.swap(true, Ordering::SeqCst) {
            self.console.print_assistant_prefix();
        }
    }

    fn end_text(&self) {
        if self.in_text.swap(false, Ordering::SeqCst) {
            self.console.println();
        }
    }

    fn reset(&self) {
        self.end_text();
        self.printed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl AgentObserver for ConsoleRenderer {
    fn on_iteration_started(&self, iteration: usize) {
        tracing::debug!("[ConsoleRenderer] Iteration {}", iteration);
    }

    fn on_token(&self, token: &str) {
        self.start_text();
        self.console.print_assistant_chunk(token);
        self.printed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_str(token);
    }

    fn on_tool_call_started(&self, call: &ToolCallRequest) {
        self.end_text();
        if self.show_tools {
            self.console
                .print_tool_action(&call.name, &call.parsed_arguments().to_string());
        }
    }

    fn on_tool_call_completed(&self, _call: &ToolCallRequest, outcome: &ToolExecutionOutcome) {
        if !self.show_tools {
            return;
        }
        if outcome.success {
            let text = match (&outcome.summary, &outcome.data) {
                (Some(summary), _) => summary.clone(),
                (None, Some(data)) => data.to_string(),
                (None, None) => "ok".to_string(),
            };
            self.console.print_tool_result(&text, false);
        } else {
            self.console.print_tool_result(outcome.error_message(), true);
        }
    }

    fn on_message_update(&self, text: &str) {
        let mut printed = self.printed.lock().unwrap_or_else(PoisonError::into_inner);
        match text.strip_prefix(printed.as_str()) {
            Some(rest) => {
                self.start_text();
                self.console.print_assistant_chunk(rest);
            }
            None => {
                self.end_text();
                self.start_text();
                self.console.print_assistant_chunk(text);
            }
        }
        *printed = text.to_string();
    }

    fn on_complete(&self, final_text: &str) {
        self.reset();
        *self.completed.lock().unwrap_or_else(PoisonError::into_inner) = Some(final_text.to_string());
    }

    fn on_error(&self, error: &AgentError) {
        self.reset();
        if error.is_cancelled() {
            self.console.print_system("Stopped.");
        } else {
            self.console.print_error(&error.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracks_printed_text_and_final_answer() {
        let renderer = ConsoleRenderer::new(Console::new()).show_tools(false);

        renderer.on_token("Work");
        renderer.on_token("ing.");
        assert_eq!(*renderer.printed.lock().unwrap(), "Working.");

        renderer.on_message_update("Working.\n\nStopped");
        assert_eq!(*renderer.printed.lock().unwrap(), "Working.\n\nStopped");

        renderer.on_complete("Working.\n\nStopped");
        assert!(renderer.printed.lock().unwrap().is_empty());
        assert_eq!(renderer.take_final_text().as_deref(), Some("Working.\n\nStopped"));
        assert!(renderer.take_final_text().is_none());
    }

    #[test]
    fn test_error_leaves_no_final_text() {
        let renderer = ConsoleRenderer::new(Console::new());
        renderer.on_token("partial");
        renderer.on_error(&AgentError::Cancelled);
        assert!(renderer.take_final_text().is_none());
        assert!(!renderer.in_text.load(Ordering::SeqCst));
    }
}
