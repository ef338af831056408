//! In-memory console state
//!
//! Panels render from these local copies. They are kept current two ways:
//! the change feed (persisted truth) and session events (ahead-of-persisted
//! streaming state). The streaming message lives in `stream_content` until
//! the session completes and the persisted row arrives.

use crate::domain::{Agent, Artifact, Message, PlanStep, Task, TaskStatus, Tool};
use crate::orchestrator::{Notice, PlanStepDraft, SessionEvent};
use crate::state::{ChangeEvent, apply_change};

/// Which panel has keyboard focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Panel {
    #[default]
    Input,
    Tasks,
    Tools,
}

impl Panel {
    pub fn next(self) -> Self {
        match self {
            Self::Input => Self::Tasks,
            Self::Tasks => Self::Tools,
            Self::Tools => Self::Input,
        }
    }
}

/// Everything the views render from
#[derive(Default)]
pub struct AppState {
    /// Conversation local-only messages are attributed to
    pub conversation_id: String,

    pub agents: Vec<Agent>,
    pub messages: Vec<Message>,
    pub plan_steps: Vec<PlanStep>,
    pub tasks: Vec<Task>,
    pub tools: Vec<Tool>,
    pub artifacts: Vec<Artifact>,

    /// Command input buffer
    pub input: String,
    pub focus: Panel,
    pub selected_task: usize,
    pub selected_tool: usize,

    /// Latest user-facing notification
    pub notice: Option<Notice>,

    /// Live streaming state
    pub streaming: bool,
    pub stream_content: String,
    pub stream_plan: Vec<PlanStepDraft>,

    pub should_quit: bool,
}

impl AppState {
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            ..Self::default()
        }
    }

    /// Fold a change feed event into the matching collection
    pub fn apply_change(&mut self, event: &ChangeEvent) {
        match event.table {
            "agents" => apply_change(&mut self.agents, event),
            "messages" => apply_change(&mut self.messages, event),
            "plan_steps" => apply_change(&mut self.plan_steps, event),
            "tasks" => apply_change(&mut self.tasks, event),
            "tools" => apply_change(&mut self.tools, event),
            "artifacts" => apply_change(&mut self.artifacts, event),
            _ => {}
        }
        self.clamp_selections();
    }

    /// Fold a streaming session event into the live view
    pub fn apply_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Delta(delta) => {
                self.stream_content.push_str(&delta);
            }
            SessionEvent::Plan(steps) => {
                self.stream_plan = steps;
            }
            SessionEvent::Tasks(_) => {
                // Materialized tasks arrive through the change feed
            }
            SessionEvent::Completed { .. } => {
                // The persisted message arrives through the change feed
                self.streaming = false;
                self.stream_content.clear();
                self.stream_plan.clear();
            }
            SessionEvent::Failed { notice, content } => {
                // The substituted reply is never persisted, so it stays in
                // the stream as a local message, after whatever partial
                // content already rendered
                let mut body = std::mem::take(&mut self.stream_content);
                if !body.is_empty() {
                    body.push_str("\n\n");
                }
                body.push_str(&content);
                self.messages.push(Message::orchestrator(&self.conversation_id, body));
                self.streaming = false;
                self.stream_plan.clear();
                self.notice = Some(notice);
            }
        }
    }

    /// The artifact surfaced in the viewer: most recently updated
    pub fn current_artifact(&self) -> Option<&Artifact> {
        self.artifacts.iter().max_by_key(|a| a.updated_at)
    }

    /// Completed vs total tasks, for the sprint gauge
    pub fn task_progress(&self) -> (usize, usize) {
        let done = self
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count();
        (done, self.tasks.len())
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.tasks.get(self.selected_task)
    }

    pub fn selected_tool(&self) -> Option<&Tool> {
        self.tools.get(self.selected_tool)
    }

    pub fn select_next(&mut self) {
        match self.focus {
            Panel::Tasks if !self.tasks.is_empty() => {
                self.selected_task = (self.selected_task + 1).min(self.tasks.len() - 1);
            }
            Panel::Tools if !self.tools.is_empty() => {
                self.selected_tool = (self.selected_tool + 1).min(self.tools.len() - 1);
            }
            _ => {}
        }
    }

    pub fn select_prev(&mut self) {
        match self.focus {
            Panel::Tasks => self.selected_task = self.selected_task.saturating_sub(1),
            Panel::Tools => self.selected_tool = self.selected_tool.saturating_sub(1),
            Panel::Input => {}
        }
    }

    fn clamp_selections(&mut self) {
        if !self.tasks.is_empty() {
            self.selected_task = self.selected_task.min(self.tasks.len() - 1);
        } else {
            self.selected_task = 0;
        }
        if !self.tools.is_empty() {
            self.selected_tool = self.selected_tool.min(self.tools.len() - 1);
        } else {
            self.selected_tool = 0;
        }
    }
}
