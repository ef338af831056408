//! Orchestrator client: request wiring, SSE decoding, block extraction

mod error;
mod extract;
mod session;
mod sse;

pub use error::{Notice, NoticeLevel, OrchestratorError};
pub use extract::{BlockExtractor, BlockKind, PlanStepDraft, StructuredBlock, TaskDraft};
pub use session::{SessionController, SessionEvent, SessionStatus};
pub use sse::SseDecoder;

use serde::{Deserialize, Serialize};

/// Role of a chat turn on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of conversation history sent with a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}
