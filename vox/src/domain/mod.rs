//! Domain types for the Vox console
//!
//! Everything here is a persisted record (see `voxstore::Record`).
//! Entities are owned by the store; in-process copies are transient and
//! reconciled through the change feed.

mod agent;
mod artifact;
mod message;
mod task;
mod tool;

pub use agent::{Agent, AgentStatus, default_roster};
pub use artifact::{Artifact, ContentType};
pub use message::{Message, MessageRole, PlanStep, PlanStepStatus};
pub use task::{Assignee, Task, TaskStatus};
pub use tool::{ParsedToolConfig, Tool, ToolConfig, ToolStatus, parse_tool_config};
