//! Tool registry records
//!
//! Tools declare external capabilities. Execution is out of scope: a tool
//! row represents the intent to call something, its enablement, and its
//! launch configuration. Custom tools can be created by pasting a
//! configuration blob in any of the common shapes.

use std::collections::HashMap;

use eyre::{Result, bail};
use serde::{Deserialize, Serialize};
use voxstore::{Record, new_id, now_ms};

/// Tool execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    #[default]
    Ready,
    Executing,
    Error,
}

impl std::fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::Executing => write!(f, "executing"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Launch configuration for a custom tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ToolConfig {
    /// Command to launch
    pub command: String,

    /// Command arguments
    #[serde(default)]
    pub args: Vec<String>,

    /// Environment mapping
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// A declared external capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Unique identifier
    pub id: String,

    /// Owning project
    pub project_id: Option<String>,

    /// Tool name
    pub name: String,

    /// Category label (search, filesystem, custom, ...)
    pub category: String,

    /// Whether the tool is available to the orchestrator
    pub is_enabled: bool,

    /// Whether the tool needs credentials before use
    pub requires_credential: bool,

    /// Current status
    pub status: ToolStatus,

    /// Launch configuration for custom tools
    pub config: Option<ToolConfig>,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Tool {
    /// Create an enabled, ready tool
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        let now = now_ms();
        Self {
            id: new_id(),
            project_id: None,
            name: name.into(),
            category: category.into(),
            is_enabled: true,
            requires_credential: false,
            status: ToolStatus::Ready,
            config: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the owning project
    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Attach a launch configuration
    pub fn with_config(mut self, config: ToolConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Mark the tool as needing credentials
    pub fn with_credential_required(mut self) -> Self {
        self.requires_credential = true;
        self
    }

    /// Toggle enablement
    pub fn set_enabled(&mut self, enabled: bool) {
        self.is_enabled = enabled;
        self.updated_at = now_ms();
    }
}

impl Record for Tool {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn table_name() -> &'static str {
        "tools"
    }
}

/// Result of parsing a pasted configuration blob
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedToolConfig {
    /// Tool name, when the blob carried one
    pub name: Option<String>,

    /// The launch configuration
    pub config: ToolConfig,
}

/// Parse a pasted tool configuration blob
///
/// Accepts the three shapes seen in the wild:
/// - `{"mcpServers": {"name": {"command": ..., "args": [...], "env": {...}}}}`
/// - `{"name": {"command": ..., ...}}`
/// - `{"command": ..., ...}` (bare config, no name)
pub fn parse_tool_config(blob: &str) -> Result<ParsedToolConfig> {
    let parsed: serde_json::Value = serde_json::from_str(blob)?;

    let (name, config_value) = if let Some(servers) = parsed.get("mcpServers").and_then(|v| v.as_object()) {
        match servers.iter().next() {
            Some((key, value)) => (Some(key.clone()), value.clone()),
            None => bail!("mcpServers block is empty"),
        }
    } else if parsed.get("command").is_some() {
        (None, parsed)
    } else if let Some(obj) = parsed.as_object() {
        match obj.iter().find(|(_, v)| v.is_object()) {
            Some((key, value)) => (Some(key.clone()), value.clone()),
            None => bail!("No tool configuration found in pasted JSON"),
        }
    } else {
        bail!("Pasted JSON is not a tool configuration");
    };

    let config: ToolConfig = serde_json::from_value(config_value)?;
    if config.command.is_empty() {
        bail!("Tool configuration is missing a command");
    }

    Ok(ParsedToolConfig { name, config })
}
