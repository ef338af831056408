//! Task records
//!
//! Tasks come from the materializer (bulk, parsed out of orchestrator
//! output) or from the direct `Task: ...` shorthand. The assignee decides
//! the default status: a task waiting on a human is not actionable by the
//! automated side, so it starts blocked.

use serde::{Deserialize, Serialize};
use voxstore::{Record, new_id, now_ms};

/// Task workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Blocked,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Blocked => write!(f, "blocked"),
        }
    }
}

/// Who a task is assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Assignee {
    Human,
    #[default]
    Vox,
}

impl Assignee {
    /// Default status for a freshly created task with this assignee
    pub fn default_status(self) -> TaskStatus {
        match self {
            Self::Human => TaskStatus::Blocked,
            Self::Vox => TaskStatus::Pending,
        }
    }

    /// Parse a wire value; anything other than "human" means the
    /// orchestrator keeps the task
    pub fn from_wire(value: &str) -> Self {
        if value == "human" { Self::Human } else { Self::Vox }
    }
}

impl std::fmt::Display for Assignee {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Human => write!(f, "human"),
            Self::Vox => write!(f, "vox"),
        }
    }
}

/// A unit of work tracked in the task console
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: String,

    /// Owning project
    pub project_id: Option<String>,

    /// Owning conversation
    pub conversation_id: Option<String>,

    /// Short action phrase
    pub title: String,

    /// Optional context
    pub description: Option<String>,

    /// Workflow status
    pub status: TaskStatus,

    /// Current assignee
    pub assignee: Assignee,

    /// Position in the task list
    pub order_index: i64,

    /// Parent task for hierarchy (present in the schema, unused by extraction)
    pub parent_task_id: Option<String>,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Task {
    /// Create a task; status defaults from the assignee
    pub fn new(title: impl Into<String>, description: Option<String>, assignee: Assignee) -> Self {
        let now = now_ms();
        Self {
            id: new_id(),
            project_id: None,
            conversation_id: None,
            title: title.into(),
            description,
            status: assignee.default_status(),
            assignee,
            order_index: 0,
            parent_task_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the owning conversation
    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    /// Set the owning project
    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Set the position in the task list
    pub fn with_order_index(mut self, order_index: i64) -> Self {
        self.order_index = order_index;
        self
    }

    /// Update the status
    pub fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
        self.updated_at = now_ms();
    }

    /// Reassign the task; the status resets to the assignee's default
    pub fn set_assignee(&mut self, assignee: Assignee) {
        self.assignee = assignee;
        self.status = assignee.default_status();
        self.updated_at = now_ms();
    }
}

impl Record for Task {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn table_name() -> &'static str {
        "tasks"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_from_assignee() {
        assert_eq!(Assignee::Human.default_status(), TaskStatus::Blocked);
        assert_eq!(Assignee::Vox.default_status(), TaskStatus::Pending);

        let task = Task::new("Confirm pricing", None, Assignee::Human);
        assert_eq!(task.status, TaskStatus::Blocked);

        let task = Task::new("Draft copy", None, Assignee::Vox);
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn test_assignee_from_wire() {
        assert_eq!(Assignee::from_wire("human"), Assignee::Human);
        assert_eq!(Assignee::from_wire("vox"), Assignee::Vox);
        // Unknown values fall back to the orchestrator side
        assert_eq!(Assignee::from_wire("robot"), Assignee::Vox);
    }

    #[test]
    fn test_set_assignee_resets_status() {
        let mut task = Task::new("Review PR", None, Assignee::Vox);
        task.set_status(TaskStatus::InProgress);

        task.set_assignee(Assignee::Human);
        assert_eq!(task.status, TaskStatus::Blocked);

        task.set_assignee(Assignee::Vox);
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn test_task_status_serde_snake_case() {
        assert_eq!(serde_json::to_string(&TaskStatus::InProgress).unwrap(), "\"in_progress\"");
    }
}
