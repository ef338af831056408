//! Artifact records
//!
//! Artifacts are versioned deliverables attached to a conversation. Every
//! content change bumps the version by one; history is not kept, only the
//! counter.

use serde::{Deserialize, Serialize};
use voxstore::{Record, new_id, now_ms};

/// How artifact content should be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Markdown,
    Code,
    Table,
}

impl ContentType {
    /// Parse a wire value; unknown values render as markdown
    pub fn from_wire(value: &str) -> Self {
        match value {
            "code" => Self::Code,
            "table" => Self::Table,
            _ => Self::Markdown,
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Markdown => write!(f, "markdown"),
            Self::Code => write!(f, "code"),
            Self::Table => write!(f, "table"),
        }
    }
}

/// A versioned deliverable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Unique identifier
    pub id: String,

    /// Owning project
    pub project_id: Option<String>,

    /// Owning conversation
    pub conversation_id: Option<String>,

    /// Display title
    pub title: String,

    /// Artifact body
    pub content: String,

    /// How the body should be rendered
    pub content_type: ContentType,

    /// Version counter, starts at 1
    pub version: i64,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Artifact {
    /// Create a version-1 artifact
    pub fn new(title: impl Into<String>, content: impl Into<String>, content_type: ContentType) -> Self {
        let now = now_ms();
        Self {
            id: new_id(),
            project_id: None,
            conversation_id: None,
            title: title.into(),
            content: content.into(),
            content_type,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the owning project
    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Set the owning conversation
    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    /// Replace the content; the version advances by exactly one
    pub fn update_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.version += 1;
        self.updated_at = now_ms();
    }
}

impl Record for Artifact {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn table_name() -> &'static str {
        "artifacts"
    }
}
