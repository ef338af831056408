//! Agent roster records
//!
//! Agents are named specialist personas. They are bookkeeping only in this
//! scope: status and token counters, no autonomous execution.

use serde::{Deserialize, Serialize};
use voxstore::{Record, new_id, now_ms};

/// Agent availability status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Active,
    #[default]
    Idle,
    Working,
    Error,
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Idle => write!(f, "idle"),
            Self::Working => write!(f, "working"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A named specialist persona
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Unique identifier
    pub id: String,

    /// Owning project
    pub project_id: Option<String>,

    /// Display name (unique within a roster by convention)
    pub name: String,

    /// Role label shown in the roster panel
    pub role: String,

    /// Optional avatar glyph
    pub avatar: Option<String>,

    /// Current status
    pub status: AgentStatus,

    /// Cumulative tokens attributed to this agent
    pub tokens_used: i64,

    /// Optional per-agent system prompt
    pub system_prompt: Option<String>,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Agent {
    /// Create a new idle agent
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        let now = now_ms();
        Self {
            id: new_id(),
            project_id: None,
            name: name.into(),
            role: role.into(),
            avatar: None,
            status: AgentStatus::Idle,
            tokens_used: 0,
            system_prompt: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the owning project
    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Set the avatar glyph
    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    /// Update the status
    pub fn set_status(&mut self, status: AgentStatus) {
        self.status = status;
        self.updated_at = now_ms();
    }

    /// Add to the token counter
    pub fn add_tokens(&mut self, tokens: i64) {
        self.tokens_used += tokens;
        self.updated_at = now_ms();
    }
}

impl Record for Agent {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn table_name() -> &'static str {
        "agents"
    }
}

/// The default roster seeded on first run
pub fn default_roster(project_id: &str) -> Vec<Agent> {
    vec![
        Agent::new("Atlas", "Researcher").with_project(project_id).with_avatar("🔭"),
        Agent::new("Nova", "Coder").with_project(project_id).with_avatar("⚙"),
        Agent::new("Echo", "Copywriter").with_project(project_id).with_avatar("✎"),
        Agent::new("Sentinel", "Reviewer").with_project(project_id).with_avatar("🛡"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_new_defaults() {
        let agent = Agent::new("Atlas", "Researcher");
        assert_eq!(agent.status, AgentStatus::Idle);
        assert_eq!(agent.tokens_used, 0);
        assert!(agent.project_id.is_none());
    }

    #[test]
    fn test_agent_add_tokens() {
        let mut agent = Agent::new("Atlas", "Researcher");
        agent.add_tokens(100);
        agent.add_tokens(50);
        assert_eq!(agent.tokens_used, 150);
    }

    #[test]
    fn test_default_roster() {
        let roster = default_roster("proj-1");
        assert_eq!(roster.len(), 4);
        assert!(roster.iter().all(|a| a.project_id.as_deref() == Some("proj-1")));
        assert!(roster.iter().any(|a| a.name == "Sentinel"));
    }

    #[test]
    fn test_agent_status_serde() {
        let json = serde_json::to_string(&AgentStatus::Working).unwrap();
        assert_eq!(json, "\"working\"");
    }
}
