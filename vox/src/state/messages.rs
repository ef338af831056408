//! Command and error types for the state actor

use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::{Agent, AgentStatus, Artifact, Assignee, Message, PlanStep, Task, TaskStatus, Tool};

/// Errors from state operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("State channel closed")]
    ChannelError,
}

/// Standard response type for state operations
pub type StateResponse<T> = Result<T, StateError>;

/// Commands processed by the state actor
#[derive(Debug)]
pub enum StateCommand {
    // Agents
    CreateAgent {
        agent: Agent,
        reply: oneshot::Sender<StateResponse<String>>,
    },
    ListAgents {
        project_id: Option<String>,
        reply: oneshot::Sender<StateResponse<Vec<Agent>>>,
    },
    UpdateAgentStatus {
        id: String,
        status: AgentStatus,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    AddAgentTokens {
        id: String,
        tokens: i64,
        reply: oneshot::Sender<StateResponse<()>>,
    },

    // Messages
    CreateMessage {
        message: Message,
        reply: oneshot::Sender<StateResponse<String>>,
    },
    ListMessages {
        conversation_id: String,
        reply: oneshot::Sender<StateResponse<Vec<Message>>>,
    },

    // Plan steps
    CreatePlanSteps {
        steps: Vec<PlanStep>,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    ListPlanSteps {
        message_id: String,
        reply: oneshot::Sender<StateResponse<Vec<PlanStep>>>,
    },

    // Tasks
    CreateTask {
        task: Task,
        reply: oneshot::Sender<StateResponse<String>>,
    },
    CreateTasks {
        tasks: Vec<Task>,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    ListTasks {
        conversation_id: Option<String>,
        reply: oneshot::Sender<StateResponse<Vec<Task>>>,
    },
    CountTasks {
        conversation_id: Option<String>,
        reply: oneshot::Sender<StateResponse<u64>>,
    },
    UpdateTaskStatus {
        id: String,
        status: TaskStatus,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    UpdateTaskAssignee {
        id: String,
        assignee: Assignee,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    DeleteTask {
        id: String,
        reply: oneshot::Sender<StateResponse<bool>>,
    },

    // Tools
    CreateTool {
        tool: Tool,
        reply: oneshot::Sender<StateResponse<String>>,
    },
    ListTools {
        reply: oneshot::Sender<StateResponse<Vec<Tool>>>,
    },
    SetToolEnabled {
        id: String,
        enabled: bool,
        reply: oneshot::Sender<StateResponse<()>>,
    },

    // Artifacts
    CreateArtifact {
        artifact: Artifact,
        reply: oneshot::Sender<StateResponse<String>>,
    },
    ListArtifacts {
        conversation_id: Option<String>,
        reply: oneshot::Sender<StateResponse<Vec<Artifact>>>,
    },
    UpdateArtifactContent {
        id: String,
        content: String,
        reply: oneshot::Sender<StateResponse<i64>>,
    },

    Shutdown,
}
