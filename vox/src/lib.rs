//! Vox - multi-agent operator console
//!
//! Vox drives a single supervising orchestrator over a streaming chat
//! endpoint and turns its output into persisted work: messages, execution
//! plans, tasks, and versioned artifacts, all rendered live in a
//! multi-panel terminal console.
//!
//! # Core flow
//!
//! - **Decode**: the endpoint streams event-stream framed bytes; the
//!   decoder turns arbitrary network chunks into content deltas
//! - **Extract**: the growing message text is rescanned for an embedded
//!   JSON block (a task list or an execution plan) as it streams
//! - **Persist**: on completion the message, plan steps, and materialized
//!   tasks land in the store; panels reconcile through a change feed
//!
//! # Modules
//!
//! - [`orchestrator`] - endpoint client, SSE decoding, block extraction
//! - [`planning`] - task materialization and the `Task:` shorthand
//! - [`state`] - the state actor and change feed
//! - [`domain`] - persisted record types
//! - [`tui`] - the console itself
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod orchestrator;
pub mod planning;
pub mod state;
pub mod tui;

// Re-export commonly used types
pub use config::{Config, OrchestratorConfig, StorageConfig, WorkspaceConfig};
pub use domain::{
    Agent, AgentStatus, Artifact, Assignee, ContentType, Message, MessageRole, PlanStep, PlanStepStatus, Task,
    TaskStatus, Tool, ToolConfig, ToolStatus, default_roster, parse_tool_config,
};
pub use orchestrator::{
    BlockExtractor, ChatMessage, ChatRole, Notice, NoticeLevel, OrchestratorError, PlanStepDraft, SessionController,
    SessionEvent, SessionStatus, SseDecoder, StructuredBlock, TaskDraft,
};
pub use planning::{TaskMaterializer, parse_direct_task};
pub use state::{ChangeEvent, ChangeOp, StateError, StateManager, StateResponse, apply_change};
