//! Agent Configuration
//!
//! Stored defaults for the [`AgentRunner`](super::AgentRunner) and the
//! per-run options that override them.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use super::history::ImageAttachment;
use crate::core::{AgentError, AgentResult};
use crate::permissions::PermissionHandler;

/// Default cap on model iterations per run
pub const DEFAULT_MAX_TOOL_ITERATIONS: usize = 10;

const ENV_MAX_TOOL_ITERATIONS: &str = "AGENT_MAX_TOOL_ITERATIONS";
const ENV_LOG_SUMMARY: &str = "AGENT_LOG_SUMMARY";

/// Stored configuration for an agent runner
///
/// Use the builder pattern to configure the agent:
///
/// ```ignore
/// let config = AgentConfig::new()
///     .with_max_tool_iterations(20)
///     .with_permission_handler(handler)
///     .with_execution_summary(true);
/// ```
#[derive(Clone)]
pub struct AgentConfig {
    /// Maximum number of model iterations per run (prevents infinite loops)
    pub max_tool_iterations: usize,

    /// Permission handler used when a run does not bring its own
    pub permission_handler: Option<Arc<dyn PermissionHandler>>,

    /// Whether to log the trace summary when a run finishes
    pub log_execution_summary: bool,
}

impl AgentConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self {
            max_tool_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
            permission_handler: None,
            log_execution_summary: false,
        }
    }

    /// Set maximum tool iterations per run
    ///
    /// A cap of 0 would never call the model, so it is raised to 1.
    pub fn with_max_tool_iterations(mut self, max: usize) -> Self {
        self.max_tool_iterations = clamp_iterations(max);
        self
    }

    /// Set the default permission handler
    pub fn with_permission_handler(mut self, handler: Arc<dyn PermissionHandler>) -> Self {
        self.permission_handler = Some(handler);
        self
    }

    /// Enable or disable logging of the execution summary
    pub fn with_execution_summary(mut self, enabled: bool) -> Self {
        self.log_execution_summary = enabled;
        self
    }

    /// Effective configuration for one run
    ///
    /// The run's permission handler and iteration cap replace the stored ones
    /// when given.
    pub fn merged_with(&self, options: &RunOptions) -> AgentConfig {
        let mut merged = self.clone();
        if let Some(handler) = &options.permission_handler {
            merged.permission_handler = Some(handler.clone());
        }
        if let Some(max) = options.max_tool_iterations {
            merged.max_tool_iterations = clamp_iterations(max);
        }
        merged
    }

    /// Load stored defaults from a JSON settings file
    ///
    /// Missing fields keep their defaults and unknown fields are ignored.
    pub fn load_settings(path: impl AsRef<Path>) -> AgentResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let settings: AgentSettings = serde_json::from_str(&content)?;

        tracing::info!("[AgentConfig] Loaded settings from {:?}", path);
        Ok(Self::new().with_settings(settings))
    }

    /// Create a configuration from environment variables
    ///
    /// Reads `AGENT_MAX_TOOL_ITERATIONS` and `AGENT_LOG_SUMMARY`.
    pub fn from_env() -> AgentResult<Self> {
        Self::new().with_env_overrides()
    }

    /// Apply environment variable overrides on top of this configuration
    pub fn with_env_overrides(self) -> AgentResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_settings(mut self, settings: AgentSettings) -> Self {
        if let Some(max) = settings.max_tool_iterations {
            self = self.with_max_tool_iterations(max);
        }
        if let Some(enabled) = settings.log_execution_summary {
            self.log_execution_summary = enabled;
        }
        self
    }

    fn with_overrides<F>(mut self, lookup: F) -> AgentResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MAX_TOOL_ITERATIONS) {
            let max = raw.trim().parse::<usize>().map_err(|_| {
                AgentError::InvalidConfig(format!(
                    "{} must be a non-negative integer, got '{}'",
                    ENV_MAX_TOOL_ITERATIONS, raw
                ))
            })?;
            self = self.with_max_tool_iterations(max);
        }

        if let Some(raw) = lookup(ENV_LOG_SUMMARY) {
            self.log_execution_summary = parse_flag(&raw).ok_or_else(|| {
                AgentError::InvalidConfig(format!(
                    "{} must be a boolean, got '{}'",
                    ENV_LOG_SUMMARY, raw
                ))
            })?;
        }

        Ok(self)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConfig")
            .field("max_tool_iterations", &self.max_tool_iterations)
            .field("has_permission_handler", &self.permission_handler.is_some())
            .field("log_execution_summary", &self.log_execution_summary)
            .finish()
    }
}

/// On-disk settings file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AgentSettings {
    max_tool_iterations: Option<usize>,
    log_execution_summary: Option<bool>,
}

fn clamp_iterations(max: usize) -> usize {
    if max == 0 {
        tracing::warn!("[AgentConfig] max_tool_iterations of 0 raised to 1");
        1
    } else {
        max
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Per-run options supplied by the host
#[derive(Clone, Default)]
pub struct RunOptions {
    /// Advertise the tool catalog to the model
    pub enable_tools: bool,

    /// Attach `pasted_images` to the new user turn
    pub include_images: bool,

    /// Images pasted by the user for this turn
    pub pasted_images: Vec<ImageAttachment>,

    /// Permission handler for this run only
    pub permission_handler: Option<Arc<dyn PermissionHandler>>,

    /// Iteration cap for this run only
    pub max_tool_iterations: Option<usize>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tools(mut self, enabled: bool) -> Self {
        self.enable_tools = enabled;
        self
    }

    /// Attach images to the user turn
    pub fn with_images(mut self, images: Vec<ImageAttachment>) -> Self {
        self.include_images = true;
        self.pasted_images = images;
        self
    }

    pub fn with_permission_handler(mut self, handler: Arc<dyn PermissionHandler>) -> Self {
        self.permission_handler = Some(handler);
        self
    }

    pub fn with_max_tool_iterations(mut self, max: usize) -> Self {
        self.max_tool_iterations = Some(max);
        self
    }
}

impl std::fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunOptions")
            .field("enable_tools", &self.enable_tools)
            .field("include_images", &self.include_images)
            .field("pasted_images", &self.pasted_images.len())
            .field("has_permission_handler", &self.permission_handler.is_some())
            .field("max_tool_iterations", &self.max_tool_iterations)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::permission_fn;
    use std::collections::HashMap;

    #[test]
    fn test_agent_config_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.max_tool_iterations, 10);
        assert!(config.permission_handler.is_none());
        assert!(!config.log_execution_summary);
    }

    #[test]
    fn test_zero_cap_is_clamped() {
        let config = AgentConfig::new().with_max_tool_iterations(0);
        assert_eq!(config.max_tool_iterations, 1);

        let merged = AgentConfig::new().merged_with(&RunOptions::new().with_max_tool_iterations(0));
        assert_eq!(merged.max_tool_iterations, 1);
    }

    #[tokio::test]
    async fn test_merge_prefers_run_options() {
        let stored = AgentConfig::new()
            .with_max_tool_iterations(5)
            .with_permission_handler(permission_fn(|_, _| async { false }));

        let merged = stored.merged_with(&RunOptions::new());
        assert_eq!(merged.max_tool_iterations, 5);
        assert!(!merged
            .permission_handler
            .as_ref()
            .unwrap()
            .request_permission("1", "x")
            .await);

        let options = RunOptions::new()
            .with_max_tool_iterations(2)
            .with_permission_handler(permission_fn(|_, _| async { true }));
        let merged = stored.merged_with(&options);
        assert_eq!(merged.max_tool_iterations, 2);
        assert!(merged
            .permission_handler
            .as_ref()
            .unwrap()
            .request_permission("1", "x")
            .await);

        assert_eq!(stored.max_tool_iterations, 5);
    }

    #[test]
    fn test_load_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"max_tool_iterations": 4, "theme": "dark", "log_execution_summary": true}"#,
        )
        .unwrap();

        let config = AgentConfig::load_settings(&path).unwrap();
        assert_eq!(config.max_tool_iterations, 4);
        assert!(config.log_execution_summary);
    }

    #[test]
    fn test_load_settings_missing_fields_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{}").unwrap();
        assert_eq!(AgentConfig::load_settings(&path).unwrap().max_tool_iterations, 10);

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            AgentConfig::load_settings(&path),
            Err(AgentError::Serialization(_))
        ));

        assert!(matches!(
            AgentConfig::load_settings(dir.path().join("missing.json")),
            Err(AgentError::Io(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("AGENT_MAX_TOOL_ITERATIONS", " 7 "),
            ("AGENT_LOG_SUMMARY", "yes"),
        ]
        .into_iter()
        .collect();

        let config = AgentConfig::new()
            .with_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.max_tool_iterations, 7);
        assert!(config.log_execution_summary);

        let untouched = AgentConfig::new().with_overrides(|_| None).unwrap();
        assert_eq!(untouched.max_tool_iterations, 10);
    }

    #[test]
    fn test_invalid_overrides() {
        let result = AgentConfig::new().with_overrides(|key| {
            (key == "AGENT_MAX_TOOL_ITERATIONS").then(|| "many".to_string())
        });
        assert!(matches!(result, Err(AgentError::InvalidConfig(_))));

        let result = AgentConfig::new()
            .with_overrides(|key| (key == "AGENT_LOG_SUMMARY").then(|| "maybe".to_string()));
        assert!(matches!(result, Err(AgentError::InvalidConfig(_))));
    }
}
