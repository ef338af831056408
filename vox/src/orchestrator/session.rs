//! Streaming session controller
//!
//! Owns one request/response cycle against the orchestrator endpoint:
//! sends the conversation history, drives the SSE decoder and block
//! extractor over the response body, forwards render events to the
//! caller, and persists the finished message on completion. At most one
//! session is in flight per controller.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::domain::{Message, PlanStep};
use crate::planning::TaskMaterializer;
use crate::state::StateManager;

use super::error::{Notice, OrchestratorError};
use super::extract::{BlockExtractor, PlanStepDraft, StructuredBlock, TaskDraft};
use super::sse::SseDecoder;
use super::{ChatMessage, ChatRole};

/// Where the controller is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionStatus {
    Idle = 0,
    Requesting = 1,
    Streaming = 2,
}

impl SessionStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Requesting,
            2 => Self::Streaming,
            _ => Self::Idle,
        }
    }
}

/// Render events emitted while a session runs
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A content delta arrived; append it to the live message
    Delta(String),
    /// A plan block completed in the stream
    Plan(Vec<PlanStepDraft>),
    /// A tasks block completed in the stream
    Tasks(Vec<TaskDraft>),
    /// The stream finished; `content` is the whole message
    Completed { content: String },
    /// The session failed; `content` replaces the streamed message
    Failed { notice: Notice, content: String },
}

struct Inner {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    state: StateManager,
    materializer: TaskMaterializer,
    conversation_id: String,
    project_id: Option<String>,
    status: AtomicU8,
}

/// Controller for one conversation's streaming sessions
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        state: StateManager,
        conversation_id: impl Into<String>,
    ) -> Self {
        let conversation_id = conversation_id.into();
        Self {
            inner: Arc::new(Inner {
                http: reqwest::Client::new(),
                endpoint: endpoint.into(),
                api_key: api_key.into(),
                materializer: TaskMaterializer::new(state.clone(), conversation_id.clone()),
                state,
                conversation_id,
                project_id: None,
                status: AtomicU8::new(SessionStatus::Idle as u8),
            }),
        }
    }

    /// Scope agent-name resolution to a project
    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        let inner = Arc::get_mut(&mut self.inner).expect("with_project before the controller is shared");
        inner.project_id = Some(project_id.into());
        self
    }

    /// Apply a request timeout to the underlying HTTP client
    pub fn with_timeout(mut self, timeout: std::time::Duration) -> eyre::Result<Self> {
        let inner = Arc::get_mut(&mut self.inner).expect("with_timeout before the controller is shared");
        inner.http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus::from_u8(self.inner.status.load(Ordering::SeqCst))
    }

    /// Run one session: persist the user turn, stream the reply, finalize
    ///
    /// Returns false without side effects when the input is empty or a
    /// session is already in flight.
    pub async fn send(
        &self,
        input: &str,
        history: Vec<ChatMessage>,
        events: mpsc::Sender<SessionEvent>,
    ) -> bool {
        let input = input.trim();
        if input.is_empty() {
            debug!("send: empty input ignored");
            return false;
        }
        if self
            .inner
            .status
            .compare_exchange(
                SessionStatus::Idle as u8,
                SessionStatus::Requesting as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            debug!("send: a session is already in flight, ignoring");
            return false;
        }

        self.run(input, history, &events).await;
        self.inner.status.store(SessionStatus::Idle as u8, Ordering::SeqCst);
        true
    }

    async fn run(&self, input: &str, mut history: Vec<ChatMessage>, events: &mpsc::Sender<SessionEvent>) {
        let inner = &self.inner;

        // The user turn is persisted up front; a later failure replaces the
        // reply, not the question
        let user_message = Message::user(&inner.conversation_id, input);
        if let Err(e) = inner.state.create_message(user_message).await {
            warn!(error = %e, "Failed to persist user message");
        }

        history.push(ChatMessage {
            role: ChatRole::User,
            content: input.to_string(),
        });
        let body = serde_json::json!({ "messages": history });

        debug!(endpoint = %inner.endpoint, turns = history.len(), "Sending orchestrator request");
        let response = match inner
            .http
            .post(&inner.endpoint)
            .bearer_auth(&inner.api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.fail(events, OrchestratorError::Network(e)).await;
                return;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.ok().and_then(|text| error_message(&text));
            self.fail(events, OrchestratorError::from_status(status.as_u16(), message))
                .await;
            return;
        }

        inner.status.store(SessionStatus::Streaming as u8, Ordering::SeqCst);

        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        let mut extractor = BlockExtractor::new();
        let mut content = String::new();
        let mut plan: Option<Vec<PlanStepDraft>> = None;
        let mut tasks: Option<Vec<TaskDraft>> = None;

        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(error = %e, "Stream read failed mid-response");
                    self.fail(events, OrchestratorError::Network(e)).await;
                    return;
                }
            };

            let deltas = decoder.feed(&bytes);
            for delta in deltas {
                content.push_str(&delta);
                let _ = events.send(SessionEvent::Delta(delta)).await;
            }
            if let Some(block) = extractor.scan(&content) {
                match block {
                    StructuredBlock::Plan(steps) => {
                        let _ = events.send(SessionEvent::Plan(steps.clone())).await;
                        plan = Some(steps);
                    }
                    StructuredBlock::Tasks(drafts) => {
                        let _ = events.send(SessionEvent::Tasks(drafts.clone())).await;
                        tasks = Some(drafts);
                    }
                }
            }
            if decoder.is_done() {
                break;
            }
        }

        for delta in decoder.flush() {
            content.push_str(&delta);
            let _ = events.send(SessionEvent::Delta(delta)).await;
        }
        if let Some(block) = extractor.scan(&content) {
            match block {
                StructuredBlock::Plan(steps) => {
                    let _ = events.send(SessionEvent::Plan(steps.clone())).await;
                    plan = Some(steps);
                }
                StructuredBlock::Tasks(drafts) => {
                    let _ = events.send(SessionEvent::Tasks(drafts.clone())).await;
                    tasks = Some(drafts);
                }
            }
        }

        info!(chars = content.len(), has_plan = plan.is_some(), has_tasks = tasks.is_some(), "Session completed");
        let _ = events
            .send(SessionEvent::Completed { content: content.clone() })
            .await;

        if content.is_empty() {
            return;
        }
        self.persist(content, plan, tasks).await;
    }

    async fn fail(&self, events: &mpsc::Sender<SessionEvent>, error: OrchestratorError) {
        warn!(error = %error, "Session failed");
        let notice = error.notice();
        let content = notice.body.clone();
        let _ = events.send(SessionEvent::Failed { notice, content }).await;
    }

    async fn persist(
        &self,
        content: String,
        plan: Option<Vec<PlanStepDraft>>,
        tasks: Option<Vec<TaskDraft>>,
    ) {
        let inner = &self.inner;

        // Rough chars-per-token estimate, credited to the agents the plan names
        let reply_tokens = (content.len() / 4).max(1) as i64;

        let message = Message::orchestrator(&inner.conversation_id, content);
        let message_id = message.id.clone();
        match inner.state.create_message(message).await {
            Ok(_) => {
                if let Some(drafts) = plan {
                    let mut steps = Vec::with_capacity(drafts.len());
                    let mut credited: Vec<String> = Vec::new();
                    for (i, draft) in drafts.iter().enumerate() {
                        let agent_id = self.resolve_agent(draft.agent.as_deref()).await;
                        if let Some(id) = &agent_id
                            && !credited.contains(id)
                        {
                            credited.push(id.clone());
                        }
                        steps.push(PlanStep::new(
                            &message_id,
                            &draft.label,
                            draft.status,
                            agent_id,
                            i as i64,
                        ));
                    }
                    if let Err(e) = inner.state.create_plan_steps(steps).await {
                        warn!(error = %e, %message_id, "Failed to persist plan steps");
                    }
                    for agent_id in credited {
                        if let Err(e) = inner.state.add_agent_tokens(&agent_id, reply_tokens).await {
                            warn!(error = %e, %agent_id, "Failed to credit agent tokens");
                        }
                    }
                }
            }
            Err(e) => warn!(error = %e, "Failed to persist orchestrator message"),
        }

        if let Some(drafts) = tasks
            && let Err(e) = inner.materializer.materialize(&drafts).await
        {
            warn!(error = %e, "Failed to materialize tasks");
        }
    }

    /// Agent names come from model output; an unknown name is stored as a
    /// null association rather than an error
    async fn resolve_agent(&self, name: Option<&str>) -> Option<String> {
        let name = name?;
        match self.inner.state.find_agent(self.inner.project_id.as_deref(), name).await {
            Ok(Some(agent)) => Some(agent.id),
            Ok(None) => {
                debug!(%name, "Plan step names an unknown agent");
                None
            }
            Err(e) => {
                warn!(error = %e, %name, "Agent lookup failed");
                None
            }
        }
    }
}

/// Pull a human-readable error out of a JSON error body
fn error_message(text: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    match value.get("error")? {
        serde_json::Value::String(s) => Some(s.clone()),
        obj => obj.get("message")?.as_str().map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_input_is_ignored() {
        let state = StateManager::spawn_in_memory().unwrap();
        let controller = SessionController::new("http://localhost:1", "key", state.clone(), "conv-1");
        let (tx, mut rx) = mpsc::channel(8);

        assert!(!controller.send("   ", Vec::new(), tx).await);
        assert_eq!(controller.status(), SessionStatus::Idle);
        assert!(rx.try_recv().is_err());

        state.shutdown().await.unwrap();
    }

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(error_message(r#"{"error": "nope"}"#).as_deref(), Some("nope"));
        assert_eq!(
            error_message(r#"{"error": {"message": "nested"}}"#).as_deref(),
            Some("nested")
        );
        assert!(error_message("not json").is_none());
        assert!(error_message(r#"{"other": 1}"#).is_none());
    }
}
