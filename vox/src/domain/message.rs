//! Conversation messages and plan steps
//!
//! A message's content grows in memory while a response streams; it is
//! persisted once, whole, when the stream completes. Plan steps are
//! separate rows keyed by message id, ordered by insertion.

use serde::{Deserialize, Serialize};
use voxstore::{Record, new_id, now_ms};

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Orchestrator,
    System,
    Agent,
}

/// A conversation message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier
    pub id: String,

    /// Owning conversation
    pub conversation_id: String,

    /// Author role
    pub role: MessageRole,

    /// Message text
    pub content: String,

    /// Originating agent, when role is `Agent`
    pub agent_id: Option<String>,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Message {
    /// Create a message with the given role
    pub fn new(conversation_id: impl Into<String>, role: MessageRole, content: impl Into<String>) -> Self {
        let now = now_ms();
        Self {
            id: new_id(),
            conversation_id: conversation_id.into(),
            role,
            content: content.into(),
            agent_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a user turn
    pub fn user(conversation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(conversation_id, MessageRole::User, content)
    }

    /// Create an orchestrator reply
    pub fn orchestrator(conversation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(conversation_id, MessageRole::Orchestrator, content)
    }
}

impl Record for Message {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn table_name() -> &'static str {
        "messages"
    }
}

/// Status of a single plan step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PlanStepStatus {
    #[default]
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
}

/// One item of a model-declared execution checklist
///
/// Produced only by parsing a structured block out of streamed text;
/// never user-edited directly. Order is execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Unique identifier
    pub id: String,

    /// Message this step belongs to
    pub message_id: String,

    /// Step label
    pub label: String,

    /// Current status
    pub status: PlanStepStatus,

    /// Agent assigned by the orchestrator, if the name resolved
    pub agent_id: Option<String>,

    /// Position within the plan
    pub order_index: i64,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl PlanStep {
    /// Create a persisted plan step row
    pub fn new(
        message_id: impl Into<String>,
        label: impl Into<String>,
        status: PlanStepStatus,
        agent_id: Option<String>,
        order_index: i64,
    ) -> Self {
        let now = now_ms();
        Self {
            id: new_id(),
            message_id: message_id.into(),
            label: label.into(),
            status,
            agent_id,
            order_index,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Record for PlanStep {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn table_name() -> &'static str {
        "plan_steps"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let msg = Message::user("conv-1", "hello");
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.conversation_id, "conv-1");

        let msg = Message::orchestrator("conv-1", "reply");
        assert_eq!(msg.role, MessageRole::Orchestrator);
    }

    #[test]
    fn test_plan_step_status_serde() {
        // The wire format uses a hyphen, not snake_case
        assert_eq!(
            serde_json::to_string(&PlanStepStatus::InProgress).unwrap(),
            "\"in-progress\""
        );
        let status: PlanStepStatus = serde_json::from_str("\"in-progress\"").unwrap();
        assert_eq!(status, PlanStepStatus::InProgress);
    }

    #[test]
    fn test_plan_step_new() {
        let step = PlanStep::new("msg-1", "Research options", PlanStepStatus::Pending, None, 0);
        assert_eq!(step.message_id, "msg-1");
        assert_eq!(step.order_index, 0);
        assert!(step.agent_id.is_none());
    }
}
