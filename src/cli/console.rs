use colored::*;
use std::io::{self, Write};
use std::sync::Arc;

use async_trait::async_trait;

use crate::permissions::{AllowListPermissions, PermissionHandler};

const MAX_TOOL_OUTPUT: usize = 500;

/// The user's answer to a permission prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionChoice {
    /// Allow this call
    Allow,
    /// Deny this call
    Deny,
    /// Allow this tool for the rest of the session
    AlwaysAllow,
}

impl PermissionChoice {
    /// Parse a typed answer; anything unrecognised denies
    pub fn parse(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "y" | "yes" => PermissionChoice::Allow,
            "a" | "always" => PermissionChoice::AlwaysAllow,
            _ => PermissionChoice::Deny,
        }
    }

    pub fn is_allowed(self) -> bool {
        !matches!(self, PermissionChoice::Deny)
    }
}

/// Console handles all terminal I/O with colored formatting
#[derive(Debug, Clone, Copy)]
pub struct Console {
    user_color: Color,
    assistant_color: Color,
    tool_color: Color,
}

impl Console {
    /// Create a new Console with default colors
    pub fn new() -> Self {
        Self {
            user_color: Color::Cyan,
            assistant_color: Color::Green,
            tool_color: Color::Magenta,
        }
    }

    /// Create a new Console with custom colors
    pub fn with_colors(user_color: Color, assistant_color: Color, tool_color: Color) -> Self {
        Self {
            user_color,
            assistant_color,
            tool_color,
        }
    }

    /// Print an assistant message prefix (without newline)
    pub fn print_assistant_prefix(&self) {
        print!("{} ", "Assistant:".color(self.assistant_color).bold());
        let _ = io::stdout().flush();
    }

    /// Print a chunk of assistant response (for streaming)
    pub fn print_assistant_chunk(&self, chunk: &str) {
        print!("{}", chunk.color(self.assistant_color));
        let _ = io::stdout().flush();
    }

    /// Print a newline
    pub fn println(&self) {
        println!();
    }

    /// Print a system message (errors, info, etc.)
    pub fn print_system(&self, message: &str) {
        println!("{} {}", "System:".yellow().bold(), message);
    }

    /// Print an error message
    pub fn print_error(&self, error: &str) {
        eprintln!("{} {}", "Error:".red().bold(), error);
    }

    /// Read a line of input from the user
    ///
    /// Returns `None` at end of input.
    pub fn read_input(&self) -> io::Result<Option<String>> {
        print!("{} ", ">".color(self.user_color).bold());
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        Ok(Some(input.trim().to_string()))
    }

    /// Print a welcome banner
    pub fn print_banner(&self, model: &str) {
        println!("{}", "=".repeat(60).bright_blue());
        println!(
            "{}",
            format!("  Agentic Runner - {}", model).bright_blue().bold()
        );
        println!("{}", "=".repeat(60).bright_blue());
        println!();
        println!("Type your message and press Enter. Ctrl-C stops the current answer.");
        println!("Type 'exit' or 'quit' to end the session.");
        println!();
    }

    /// Print a tool action message
    pub fn print_tool_action(&self, tool_name: &str, action: &str) {
        println!(
            "{} {} {}",
            "Tool:".color(self.tool_color).bold(),
            format!("[{}]", tool_name).color(self.tool_color),
            action
        );
    }

    /// Print a tool result
    pub fn print_tool_result(&self, result: &str, is_error: bool) {
        if is_error {
            println!("{} {}", "Tool Error:".red().bold(), result);
        } else {
            println!("{}", truncate(result, MAX_TOOL_OUTPUT).bright_black());
        }
    }

    /// Ask for permission to run a tool (blocks on stdin)
    pub fn ask_permission(&self, tool_name: &str) -> io::Result<PermissionChoice> {
        println!();
        println!("{}", "─".repeat(60).yellow());
        println!(
            "{} The agent wants to use tool: {}",
            "Permission Required".yellow().bold(),
            tool_name.color(self.tool_color).bold()
        );
        println!("  [y] Allow this call");
        println!("  [n] Deny this call");
        println!("  [a] Always allow this tool");
        println!("{}", "─".repeat(60).yellow());
        print!("{} ", "Your choice (y/n/a):".yellow().bold());
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let choice = PermissionChoice::parse(&input);

        match choice {
            PermissionChoice::Allow => println!("{}", "Allowed".green()),
            PermissionChoice::Deny => println!("{}", "Denied".red()),
            PermissionChoice::AlwaysAllow => {
                println!("{}", format!("Always allowing tool: {}", tool_name).green())
            }
        }
        println!();

        Ok(choice)
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{}...\n(output truncated)", head)
}

/// Permission handler that asks on the terminal
///
/// Tools the user chose to always allow are remembered in the shared
/// allow list and never prompted again.
pub struct ConsolePermissionHandler {
    console: Console,
    remembered: Arc<AllowListPermissions>,
}

impl ConsolePermissionHandler {
    pub fn new(console: Console, remembered: Arc<AllowListPermissions>) -> Self {
        Self {
            console,
            remembered,
        }
    }
}

#[async_trait]
impl PermissionHandler for ConsolePermissionHandler {
    async fn request_permission(&self, tool_call_id: &str, tool_name: &str) -> bool {
        if self.remembered.is_allowed(tool_name) {
            return true;
        }

        let console = self.console;
        let name = tool_name.to_string();
        let answer = tokio::task::spawn_blocking(move || console.ask_permission(&name)).await;

        match answer {
            Ok(Ok(choice)) => {
                tracing::info!(
                    "[Console] Permission for {} ({}): {:?}",
                    tool_name,
                    tool_call_id,
                    choice
                );
                if choice == PermissionChoice::AlwaysAllow {
                    self.remembered.allow_tool(tool_name);
                }
                choice.is_allowed()
            }
            Ok(Err(e)) => {
                tracing::warn!("[Console] Failed to read permission answer: {}", e);
                false
            }
            Err(e) => {
                tracing::warn!("[Console] Permission prompt task failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_choice_parse() {
        assert_eq!(PermissionChoice::parse("y\n"), PermissionChoice::Allow);
        assert_eq!(PermissionChoice::parse(" YES "), PermissionChoice::Allow);
        assert_eq!(PermissionChoice::parse("a"), PermissionChoice::AlwaysAllow);
        assert_eq!(PermissionChoice::parse("n"), PermissionChoice::Deny);
        assert_eq!(PermissionChoice::parse("whatever"), PermissionChoice::Deny);
        assert!(!PermissionChoice::Deny.is_allowed());
        assert!(PermissionChoice::AlwaysAllow.is_allowed());
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        let long = "é".repeat(20);
        assert_eq!(truncate(&long, 3), "ééé...\n(output truncated)");
    }

    #[tokio::test]
    async fn test_remembered_tools_skip_prompt() {
        let rules = Arc::new(AllowListPermissions::with_tools(["current_time"]));
        let handler = ConsolePermissionHandler::new(Console::new(), rules);
        assert!(handler.request_permission("1", "current_time").await);
    }
}
