//! Console main loop
//!
//! Single loop of control: terminal events, the change feed, and session
//! events all land here and mutate [`AppState`] before the next draw. The
//! streaming session itself runs on a spawned task and reports back over
//! its event channel.

use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use eyre::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::warn;

use crate::domain::Assignee;
use crate::orchestrator::{ChatMessage, ChatRole, Notice, SessionController, SessionEvent, SessionStatus};
use crate::planning::{TaskMaterializer, parse_direct_task};
use crate::state::StateManager;

use super::events::{Event, EventHandler};
use super::state::{AppState, Panel};
use super::views;
use super::Tui;

pub struct TuiRunner {
    terminal: Tui,
    state: StateManager,
    session: SessionController,
    materializer: TaskMaterializer,
    app: AppState,
    project_id: String,
    conversation_id: String,
}

impl TuiRunner {
    pub fn new(
        terminal: Tui,
        state: StateManager,
        session: SessionController,
        project_id: impl Into<String>,
        conversation_id: impl Into<String>,
    ) -> Self {
        let conversation_id = conversation_id.into();
        Self {
            terminal,
            materializer: TaskMaterializer::new(state.clone(), conversation_id.clone()),
            state,
            session,
            app: AppState::new(conversation_id.clone()),
            project_id: project_id.into(),
            conversation_id,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        self.load().await?;

        let mut events = EventHandler::new(Duration::from_millis(100));
        let mut changes = self.state.subscribe_changes();
        let (session_tx, mut session_rx) = mpsc::channel::<SessionEvent>(256);

        loop {
            self.terminal.draw(|frame| views::render(&self.app, frame))?;

            tokio::select! {
                event = events.next() => {
                    match event? {
                        Event::Key(key) => self.handle_key(key, &session_tx).await,
                        Event::Resize(..) | Event::Tick => {}
                    }
                }
                change = changes.recv() => {
                    match change {
                        Ok(event) => self.app.apply_change(&event),
                        // Missed events; reload everything from the store
                        Err(broadcast::error::RecvError::Lagged(_)) => self.load().await?,
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                Some(event) = session_rx.recv() => {
                    self.app.apply_session_event(event);
                }
            }

            if self.app.should_quit {
                break;
            }
        }
        Ok(())
    }

    /// Load every panel's collection from the store
    async fn load(&mut self) -> Result<()> {
        self.app.agents = self.state.ensure_default_agents(&self.project_id).await?;
        self.app.messages = self.state.list_messages(&self.conversation_id).await?;
        self.app.plan_steps.clear();
        for message in &self.app.messages {
            self.app
                .plan_steps
                .extend(self.state.list_plan_steps(&message.id).await?);
        }
        self.app.tasks = self.state.list_tasks(Some(&self.conversation_id)).await?;
        self.app.tools = self.state.list_tools().await?;
        self.app.artifacts = self.state.list_artifacts(Some(&self.conversation_id)).await?;
        Ok(())
    }

    async fn handle_key(&mut self, key: KeyEvent, session_tx: &mpsc::Sender<SessionEvent>) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.app.should_quit = true;
            return;
        }
        match key.code {
            KeyCode::Tab => {
                self.app.focus = self.app.focus.next();
                return;
            }
            KeyCode::Esc => {
                self.app.notice = None;
                self.app.focus = Panel::Input;
                return;
            }
            _ => {}
        }

        match self.app.focus {
            Panel::Input => self.handle_input_key(key, session_tx).await,
            Panel::Tasks => self.handle_task_key(key).await,
            Panel::Tools => self.handle_tool_key(key).await,
        }
    }

    async fn handle_input_key(&mut self, key: KeyEvent, session_tx: &mpsc::Sender<SessionEvent>) {
        match key.code {
            KeyCode::Char(c) => self.app.input.push(c),
            KeyCode::Backspace => {
                self.app.input.pop();
            }
            KeyCode::Enter => self.submit(session_tx).await,
            _ => {}
        }
    }

    async fn handle_task_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.app.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.app.select_prev(),
            KeyCode::Char('d') => {
                if let Some(task) = self.app.selected_task() {
                    let id = task.id.clone();
                    if let Err(e) = self.state.update_task_status(&id, crate::domain::TaskStatus::Completed).await {
                        warn!(error = %e, "Failed to complete task");
                    }
                }
            }
            KeyCode::Char('a') => {
                if let Some(task) = self.app.selected_task() {
                    let id = task.id.clone();
                    let next = match task.assignee {
                        Assignee::Human => Assignee::Vox,
                        Assignee::Vox => Assignee::Human,
                    };
                    if let Err(e) = self.state.update_task_assignee(&id, next).await {
                        warn!(error = %e, "Failed to reassign task");
                    }
                }
            }
            KeyCode::Char('x') | KeyCode::Delete => {
                if let Some(task) = self.app.selected_task() {
                    let id = task.id.clone();
                    if let Err(e) = self.state.delete_task(&id).await {
                        warn!(error = %e, "Failed to delete task");
                    }
                }
            }
            KeyCode::Char('q') => self.app.should_quit = true,
            _ => {}
        }
    }

    async fn handle_tool_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.app.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.app.select_prev(),
            KeyCode::Char(' ') | KeyCode::Enter => {
                if let Some(tool) = self.app.selected_tool() {
                    let id = tool.id.clone();
                    let enabled = !tool.is_enabled;
                    if let Err(e) = self.state.set_tool_enabled(&id, enabled).await {
                        warn!(error = %e, "Failed to toggle tool");
                    }
                }
            }
            KeyCode::Char('q') => self.app.should_quit = true,
            _ => {}
        }
    }

    async fn submit(&mut self, session_tx: &mpsc::Sender<SessionEvent>) {
        let input = std::mem::take(&mut self.app.input);
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return;
        }
        self.app.notice = None;

        // `Task: ...` adds a human task directly, no orchestrator round trip
        if let Some(title) = parse_direct_task(trimmed) {
            if let Err(e) = self.materializer.add_direct(title, None, Assignee::Human).await {
                warn!(error = %e, "Failed to add task");
                self.app.notice = Some(Notice::error("Task Error", e.to_string()));
            }
            return;
        }

        if self.session.status() != SessionStatus::Idle {
            // Keep the draft; a session is already streaming
            self.app.input = input;
            self.app.notice = Some(Notice::info("Busy", "Wait for the current response to finish."));
            return;
        }

        let history: Vec<ChatMessage> = self
            .app
            .messages
            .iter()
            .map(|m| ChatMessage {
                role: match m.role {
                    crate::domain::MessageRole::User => ChatRole::User,
                    _ => ChatRole::Assistant,
                },
                content: m.content.clone(),
            })
            .collect();

        self.app.streaming = true;
        self.app.stream_content.clear();
        self.app.stream_plan.clear();

        let session = self.session.clone();
        let tx = session_tx.clone();
        let prompt = trimmed.to_string();
        tokio::spawn(async move {
            session.send(&prompt, history, tx).await;
        });
    }
}
