//! Vox configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main Vox configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Orchestrator endpoint configuration
    pub orchestrator: OrchestratorConfig,

    /// Workspace identity (project and conversation scoping)
    pub workspace: WorkspaceConfig,

    /// Storage configuration
    pub storage: StorageConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if std::env::var(&self.orchestrator.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "Orchestrator API key not found. Set the {} environment variable.",
                self.orchestrator.api_key_env
            ));
        }
        Ok(())
    }

    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.orchestrator.api_key_env)
            .map_err(|_| eyre::eyre!("{} is not set", self.orchestrator.api_key_env))
    }

    /// Path of the SQLite database file
    pub fn store_path(&self) -> PathBuf {
        match &self.storage.path {
            Some(path) => path.clone(),
            None => dirs::data_dir()
                .map(|d| d.join("vox"))
                .unwrap_or_else(|| PathBuf::from(".vox"))
                .join("vox.db"),
        }
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .vox.yml
        let local_config = PathBuf::from(".vox.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/vox/vox.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("vox").join("vox.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Orchestrator endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Streaming chat endpoint URL
    pub endpoint: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key_env: "VOX_API_KEY".to_string(),
            timeout_ms: 120_000,
        }
    }
}

/// Workspace identity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Project all records are scoped to
    #[serde(rename = "project-id")]
    pub project_id: String,

    /// Conversation the console drives
    #[serde(rename = "conversation-id")]
    pub conversation_id: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            project_id: "default".to_string(),
            conversation_id: "default".to_string(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path; defaults to the XDG data directory
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.orchestrator.api_key_env, "VOX_API_KEY");
        assert_eq!(config.workspace.project_id, "default");
        assert_eq!(config.workspace.conversation_id, "default");
        assert!(config.storage.path.is_none());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
orchestrator:
  endpoint: https://orc.example.com/chat
  api-key-env: MY_KEY
  timeout-ms: 60000

workspace:
  project-id: acme
  conversation-id: sprint-12

storage:
  path: /tmp/vox-test.db
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.orchestrator.endpoint, "https://orc.example.com/chat");
        assert_eq!(config.orchestrator.api_key_env, "MY_KEY");
        assert_eq!(config.orchestrator.timeout_ms, 60000);
        assert_eq!(config.workspace.project_id, "acme");
        assert_eq!(config.store_path(), PathBuf::from("/tmp/vox-test.db"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
workspace:
  conversation-id: side-quest
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.workspace.conversation_id, "side-quest");
        assert_eq!(config.workspace.project_id, "default");
        assert_eq!(config.orchestrator.api_key_env, "VOX_API_KEY");
    }
}
