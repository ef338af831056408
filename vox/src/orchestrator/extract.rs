//! Structured-block extraction from streamed orchestrator text
//!
//! The orchestrator embeds at most one JSON block per message, either a
//! task list or an execution plan. The extractor is rescanned against the
//! whole accumulated text after every delta: it finds the earliest marker,
//! walks a string-aware balanced scan to see whether the object is
//! complete yet, and emits each completed block exactly once.

use crate::domain::{Assignee, PlanStepStatus};
use serde::Deserialize;

const TASKS_MARKER: &str = "{\"tasks\"";
const PLAN_MARKER: &str = "{\"plan\"";

/// Which block shape a message carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Tasks,
    Plan,
}

/// An unpersisted task parsed out of a tasks block
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub assignee: Assignee,
}

/// An unpersisted plan step parsed out of a plan block
#[derive(Debug, Clone, PartialEq)]
pub struct PlanStepDraft {
    /// Synthesized per-message id (`s1`, `s2`, ...)
    pub id: String,
    pub label: String,
    pub agent: Option<String>,
    pub status: PlanStepStatus,
}

/// A completed, parsed structured block
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredBlock {
    Tasks(Vec<TaskDraft>),
    Plan(Vec<PlanStepDraft>),
}

#[derive(Debug, Deserialize)]
struct TasksWire {
    tasks: Vec<TaskWire>,
}

#[derive(Debug, Deserialize)]
struct TaskWire {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    assignee: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlanWire {
    plan: Vec<PlanStepWire>,
}

#[derive(Debug, Deserialize)]
struct PlanStepWire {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    agent: Option<String>,
}

/// Return the shortest balanced JSON object at the start of `text`,
/// or `None` if it has not closed yet
fn balanced_block(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Per-message extractor state
///
/// The first successfully parsed block locks the kind for the rest of the
/// message; the raw text of the last emitted block suppresses re-emission
/// on later rescans.
#[derive(Debug, Default)]
pub struct BlockExtractor {
    locked: Option<BlockKind>,
    last_emitted: Option<String>,
}

impl BlockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rescan the full accumulated message text
    ///
    /// Returns a block only when one has newly completed since the last
    /// call that returned `Some`.
    pub fn scan(&mut self, content: &str) -> Option<StructuredBlock> {
        let candidates: &[(BlockKind, &str)] = match self.locked {
            Some(BlockKind::Tasks) => &[(BlockKind::Tasks, TASKS_MARKER)],
            Some(BlockKind::Plan) => &[(BlockKind::Plan, PLAN_MARKER)],
            None => &[
                (BlockKind::Tasks, TASKS_MARKER),
                (BlockKind::Plan, PLAN_MARKER),
            ],
        };

        let (kind, start) = candidates
            .iter()
            .filter_map(|(kind, marker)| content.find(marker).map(|i| (*kind, i)))
            .min_by_key(|(_, i)| *i)?;

        let block = balanced_block(&content[start..])?;
        if self.last_emitted.as_deref() == Some(block) {
            return None;
        }

        let parsed = match kind {
            BlockKind::Tasks => {
                let wire: TasksWire = serde_json::from_str(block).ok()?;
                StructuredBlock::Tasks(
                    wire.tasks
                        .into_iter()
                        .map(|task| TaskDraft {
                            title: task.title.unwrap_or_else(|| "Untitled Task".to_string()),
                            description: task.description,
                            assignee: task
                                .assignee
                                .as_deref()
                                .map(Assignee::from_wire)
                                .unwrap_or_default(),
                        })
                        .collect(),
                )
            }
            BlockKind::Plan => {
                let wire: PlanWire = serde_json::from_str(block).ok()?;
                StructuredBlock::Plan(
                    wire.plan
                        .into_iter()
                        .enumerate()
                        .map(|(i, step)| PlanStepDraft {
                            id: format!("s{}", i + 1),
                            label: step.label.unwrap_or_else(|| format!("Step {}", i + 1)),
                            agent: step.agent,
                            status: PlanStepStatus::Pending,
                        })
                        .collect(),
                )
            }
        };

        self.locked = Some(kind);
        self.last_emitted = Some(block.to_string());
        Some(parsed)
    }
}
