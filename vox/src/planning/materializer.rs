//! Task materialization
//!
//! Turns extracted task drafts into persisted task rows. Order indices
//! continue from the conversation's current task count so repeated
//! extractions append instead of interleaving.

use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::domain::{Assignee, Task};
use crate::orchestrator::TaskDraft;
use crate::state::{StateManager, StateResponse};

static DIRECT_TASK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^task:\s*(.+)$").expect("direct task pattern is valid"));

/// Recognize the `Task: <title>` input shorthand
///
/// Returns the title when the input is a direct task add rather than a
/// message for the orchestrator.
pub fn parse_direct_task(input: &str) -> Option<&str> {
    DIRECT_TASK
        .captures(input.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|title| !title.is_empty())
}

/// Creates persisted tasks for one conversation
#[derive(Clone)]
pub struct TaskMaterializer {
    state: StateManager,
    conversation_id: String,
}

impl TaskMaterializer {
    pub fn new(state: StateManager, conversation_id: impl Into<String>) -> Self {
        Self {
            state,
            conversation_id: conversation_id.into(),
        }
    }

    /// Persist a batch of extracted drafts
    ///
    /// Each draft becomes a task with the status its assignee implies;
    /// order indices continue from the existing count.
    pub async fn materialize(&self, drafts: &[TaskDraft]) -> StateResponse<Vec<Task>> {
        if drafts.is_empty() {
            return Ok(Vec::new());
        }
        let start = self.state.count_tasks(Some(&self.conversation_id)).await? as i64;

        let tasks: Vec<Task> = drafts
            .iter()
            .enumerate()
            .map(|(i, draft)| {
                Task::new(draft.title.clone(), draft.description.clone(), draft.assignee)
                    .with_conversation(&self.conversation_id)
                    .with_order_index(start + i as i64)
            })
            .collect();

        self.state.create_tasks(tasks.clone()).await?;
        info!(count = tasks.len(), start, "Materialized tasks");
        Ok(tasks)
    }

    /// Persist a single directly-added task
    pub async fn add_direct(
        &self,
        title: &str,
        description: Option<String>,
        assignee: Assignee,
    ) -> StateResponse<Task> {
        debug!(%title, %assignee, "add_direct: called");
        let order_index = self.state.count_tasks(Some(&self.conversation_id)).await? as i64;
        let task = Task::new(title, description, assignee)
            .with_conversation(&self.conversation_id)
            .with_order_index(order_index);
        self.state.create_task(task.clone()).await?;
        Ok(task)
    }
}
