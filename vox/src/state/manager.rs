//! StateManager - actor that owns the record store
//!
//! All persistence goes through one actor task; callers hold a cloneable
//! handle and talk to it over channels. Successful mutations are broadcast
//! on the change feed so panels can reconcile their local copies.

use std::path::Path;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info};
use voxstore::{Filter, Order, Store};

use crate::domain::{
    Agent, AgentStatus, Artifact, Assignee, Message, PlanStep, Task, TaskStatus, Tool, default_roster,
};

use super::messages::{StateCommand, StateError, StateResponse};
use super::sync::ChangeEvent;

/// Handle to send commands to the state actor
#[derive(Clone)]
pub struct StateManager {
    tx: mpsc::Sender<StateCommand>,
    change_tx: broadcast::Sender<ChangeEvent>,
}

impl StateManager {
    /// Spawn the state actor over a store at the given path
    pub fn spawn(store_path: impl AsRef<Path>) -> eyre::Result<Self> {
        debug!(store_path = %store_path.as_ref().display(), "spawn: called");
        let store = Store::open(store_path.as_ref())?;
        Ok(Self::spawn_with_store(store))
    }

    /// Spawn the state actor over an in-memory store
    pub fn spawn_in_memory() -> eyre::Result<Self> {
        Ok(Self::spawn_with_store(Store::open_in_memory()?))
    }

    fn spawn_with_store(store: Store) -> Self {
        let (tx, rx) = mpsc::channel(256);
        let (change_tx, _) = broadcast::channel(256);

        tokio::spawn(actor_loop(store, rx, change_tx.clone()));
        info!("StateManager spawned");

        Self { tx, change_tx }
    }

    /// Subscribe to the change feed
    pub fn subscribe_changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.change_tx.subscribe()
    }

    async fn send<T>(
        &self,
        cmd: StateCommand,
        reply_rx: oneshot::Receiver<StateResponse<T>>,
    ) -> StateResponse<T> {
        self.tx.send(cmd).await.map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    // === Agent operations ===

    /// Create an agent
    pub async fn create_agent(&self, agent: Agent) -> StateResponse<String> {
        debug!(agent_id = %agent.id, name = %agent.name, "create_agent: called");
        let (reply, reply_rx) = oneshot::channel();
        self.send(StateCommand::CreateAgent { agent, reply }, reply_rx).await
    }

    /// List agents, optionally scoped to a project
    pub async fn list_agents(&self, project_id: Option<&str>) -> StateResponse<Vec<Agent>> {
        debug!(?project_id, "list_agents: called");
        let (reply, reply_rx) = oneshot::channel();
        self.send(
            StateCommand::ListAgents {
                project_id: project_id.map(str::to_string),
                reply,
            },
            reply_rx,
        )
        .await
    }

    /// Update an agent's status
    pub async fn update_agent_status(&self, id: &str, status: AgentStatus) -> StateResponse<()> {
        debug!(%id, %status, "update_agent_status: called");
        let (reply, reply_rx) = oneshot::channel();
        self.send(
            StateCommand::UpdateAgentStatus { id: id.to_string(), status, reply },
            reply_rx,
        )
        .await
    }

    /// Add to an agent's token counter
    pub async fn add_agent_tokens(&self, id: &str, tokens: i64) -> StateResponse<()> {
        debug!(%id, tokens, "add_agent_tokens: called");
        let (reply, reply_rx) = oneshot::channel();
        self.send(
            StateCommand::AddAgentTokens { id: id.to_string(), tokens, reply },
            reply_rx,
        )
        .await
    }

    /// Resolve an agent name to its record, if one exists
    pub async fn find_agent(&self, project_id: Option<&str>, name: &str) -> StateResponse<Option<Agent>> {
        debug!(?project_id, %name, "find_agent: called");
        let agents = self.list_agents(project_id).await?;
        Ok(agents.into_iter().find(|a| a.name == name))
    }

    /// Seed the default roster if the project has no agents yet
    pub async fn ensure_default_agents(&self, project_id: &str) -> StateResponse<Vec<Agent>> {
        debug!(%project_id, "ensure_default_agents: called");
        let existing = self.list_agents(Some(project_id)).await?;
        if !existing.is_empty() {
            return Ok(existing);
        }
        let roster = default_roster(project_id);
        for agent in &roster {
            self.create_agent(agent.clone()).await?;
        }
        info!(%project_id, count = roster.len(), "Seeded default agent roster");
        Ok(roster)
    }

    // === Message operations ===

    /// Persist a conversation message
    pub async fn create_message(&self, message: Message) -> StateResponse<String> {
        debug!(message_id = %message.id, role = ?message.role, "create_message: called");
        let (reply, reply_rx) = oneshot::channel();
        self.send(StateCommand::CreateMessage { message, reply }, reply_rx).await
    }

    /// List a conversation's messages in creation order
    pub async fn list_messages(&self, conversation_id: &str) -> StateResponse<Vec<Message>> {
        debug!(%conversation_id, "list_messages: called");
        let (reply, reply_rx) = oneshot::channel();
        self.send(
            StateCommand::ListMessages {
                conversation_id: conversation_id.to_string(),
                reply,
            },
            reply_rx,
        )
        .await
    }

    // === Plan step operations ===

    /// Persist a batch of plan steps atomically
    pub async fn create_plan_steps(&self, steps: Vec<PlanStep>) -> StateResponse<()> {
        debug!(count = steps.len(), "create_plan_steps: called");
        let (reply, reply_rx) = oneshot::channel();
        self.send(StateCommand::CreatePlanSteps { steps, reply }, reply_rx).await
    }

    /// List a message's plan steps in plan order
    pub async fn list_plan_steps(&self, message_id: &str) -> StateResponse<Vec<PlanStep>> {
        debug!(%message_id, "list_plan_steps: called");
        let (reply, reply_rx) = oneshot::channel();
        self.send(
            StateCommand::ListPlanSteps { message_id: message_id.to_string(), reply },
            reply_rx,
        )
        .await
    }

    // === Task operations ===

    /// Create a single task
    pub async fn create_task(&self, task: Task) -> StateResponse<String> {
        debug!(task_id = %task.id, title = %task.title, "create_task: called");
        let (reply, reply_rx) = oneshot::channel();
        self.send(StateCommand::CreateTask { task, reply }, reply_rx).await
    }

    /// Create a batch of tasks atomically
    pub async fn create_tasks(&self, tasks: Vec<Task>) -> StateResponse<()> {
        debug!(count = tasks.len(), "create_tasks: called");
        let (reply, reply_rx) = oneshot::channel();
        self.send(StateCommand::CreateTasks { tasks, reply }, reply_rx).await
    }

    /// List tasks in list order, optionally scoped to a conversation
    pub async fn list_tasks(&self, conversation_id: Option<&str>) -> StateResponse<Vec<Task>> {
        debug!(?conversation_id, "list_tasks: called");
        let (reply, reply_rx) = oneshot::channel();
        self.send(
            StateCommand::ListTasks {
                conversation_id: conversation_id.map(str::to_string),
                reply,
            },
            reply_rx,
        )
        .await
    }

    /// Count tasks, optionally scoped to a conversation
    pub async fn count_tasks(&self, conversation_id: Option<&str>) -> StateResponse<u64> {
        debug!(?conversation_id, "count_tasks: called");
        let (reply, reply_rx) = oneshot::channel();
        self.send(
            StateCommand::CountTasks {
                conversation_id: conversation_id.map(str::to_string),
                reply,
            },
            reply_rx,
        )
        .await
    }

    /// Update a task's status
    pub async fn update_task_status(&self, id: &str, status: TaskStatus) -> StateResponse<()> {
        debug!(%id, %status, "update_task_status: called");
        let (reply, reply_rx) = oneshot::channel();
        self.send(
            StateCommand::UpdateTaskStatus { id: id.to_string(), status, reply },
            reply_rx,
        )
        .await
    }

    /// Reassign a task; its status resets to the assignee's default
    pub async fn update_task_assignee(&self, id: &str, assignee: Assignee) -> StateResponse<()> {
        debug!(%id, %assignee, "update_task_assignee: called");
        let (reply, reply_rx) = oneshot::channel();
        self.send(
            StateCommand::UpdateTaskAssignee { id: id.to_string(), assignee, reply },
            reply_rx,
        )
        .await
    }

    /// Delete a task, returning whether it existed
    pub async fn delete_task(&self, id: &str) -> StateResponse<bool> {
        debug!(%id, "delete_task: called");
        let (reply, reply_rx) = oneshot::channel();
        self.send(StateCommand::DeleteTask { id: id.to_string(), reply }, reply_rx).await
    }

    // === Tool operations ===

    /// Register a tool
    pub async fn create_tool(&self, tool: Tool) -> StateResponse<String> {
        debug!(tool_id = %tool.id, name = %tool.name, "create_tool: called");
        let (reply, reply_rx) = oneshot::channel();
        self.send(StateCommand::CreateTool { tool, reply }, reply_rx).await
    }

    /// List all tools
    pub async fn list_tools(&self) -> StateResponse<Vec<Tool>> {
        debug!("list_tools: called");
        let (reply, reply_rx) = oneshot::channel();
        self.send(StateCommand::ListTools { reply }, reply_rx).await
    }

    /// Toggle a tool's enablement
    pub async fn set_tool_enabled(&self, id: &str, enabled: bool) -> StateResponse<()> {
        debug!(%id, enabled, "set_tool_enabled: called");
        let (reply, reply_rx) = oneshot::channel();
        self.send(
            StateCommand::SetToolEnabled { id: id.to_string(), enabled, reply },
            reply_rx,
        )
        .await
    }

    // === Artifact operations ===

    /// Create an artifact
    pub async fn create_artifact(&self, artifact: Artifact) -> StateResponse<String> {
        debug!(artifact_id = %artifact.id, title = %artifact.title, "create_artifact: called");
        let (reply, reply_rx) = oneshot::channel();
        self.send(StateCommand::CreateArtifact { artifact, reply }, reply_rx).await
    }

    /// List artifacts, most recently updated first
    pub async fn list_artifacts(&self, conversation_id: Option<&str>) -> StateResponse<Vec<Artifact>> {
        debug!(?conversation_id, "list_artifacts: called");
        let (reply, reply_rx) = oneshot::channel();
        self.send(
            StateCommand::ListArtifacts {
                conversation_id: conversation_id.map(str::to_string),
                reply,
            },
            reply_rx,
        )
        .await
    }

    /// Replace an artifact's content, returning the new version
    ///
    /// This is the only write path for artifact content; the version bump
    /// happens inside the actor so it can never be skipped or applied twice.
    pub async fn update_artifact_content(&self, id: &str, content: &str) -> StateResponse<i64> {
        debug!(%id, "update_artifact_content: called");
        let (reply, reply_rx) = oneshot::channel();
        self.send(
            StateCommand::UpdateArtifactContent {
                id: id.to_string(),
                content: content.to_string(),
                reply,
            },
            reply_rx,
        )
        .await
    }

    /// Shutdown the state actor
    pub async fn shutdown(&self) -> Result<(), StateError> {
        debug!("shutdown: called");
        self.tx
            .send(StateCommand::Shutdown)
            .await
            .map_err(|_| StateError::ChannelError)
    }
}

fn store_err(e: voxstore::StoreError) -> StateError {
    match e {
        voxstore::StoreError::NotFound(what) => StateError::NotFound(what),
        other => StateError::StoreError(other.to_string()),
    }
}

fn emit(change_tx: &broadcast::Sender<ChangeEvent>, event: Option<ChangeEvent>) {
    if let Some(event) = event {
        let _ = change_tx.send(event);
    }
}

/// The actor loop that owns the store and processes commands
async fn actor_loop(
    mut store: Store,
    mut rx: mpsc::Receiver<StateCommand>,
    change_tx: broadcast::Sender<ChangeEvent>,
) {
    debug!("state actor started");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            StateCommand::CreateAgent { agent, reply } => {
                let result = store.insert(&agent).map_err(store_err).map(|_| agent.id.clone());
                if result.is_ok() {
                    emit(&change_tx, ChangeEvent::inserted(&agent));
                }
                let _ = reply.send(result);
            }

            StateCommand::ListAgents { project_id, reply } => {
                let filter = project_id.map(|p| Filter::text("project_id", p));
                let result = store
                    .list::<Agent>(filter.as_ref(), Some(&Order::asc("created_at")))
                    .map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::UpdateAgentStatus { id, status, reply } => {
                let result = mutate::<Agent>(&store, &id, |agent| agent.set_status(status));
                if let Ok(agent) = &result {
                    emit(&change_tx, ChangeEvent::updated(agent));
                }
                let _ = reply.send(result.map(|_| ()));
            }

            StateCommand::AddAgentTokens { id, tokens, reply } => {
                let result = mutate::<Agent>(&store, &id, |agent| agent.add_tokens(tokens));
                if let Ok(agent) = &result {
                    emit(&change_tx, ChangeEvent::updated(agent));
                }
                let _ = reply.send(result.map(|_| ()));
            }

            StateCommand::CreateMessage { message, reply } => {
                let result = store.insert(&message).map_err(store_err).map(|_| message.id.clone());
                if result.is_ok() {
                    emit(&change_tx, ChangeEvent::inserted(&message));
                }
                let _ = reply.send(result);
            }

            StateCommand::ListMessages { conversation_id, reply } => {
                let filter = Filter::text("conversation_id", conversation_id);
                let result = store
                    .list::<Message>(Some(&filter), Some(&Order::asc("created_at")))
                    .map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::CreatePlanSteps { steps, reply } => {
                let result = store.insert_many(&steps).map_err(store_err);
                if result.is_ok() {
                    for step in &steps {
                        emit(&change_tx, ChangeEvent::inserted(step));
                    }
                }
                let _ = reply.send(result);
            }

            StateCommand::ListPlanSteps { message_id, reply } => {
                let filter = Filter::text("message_id", message_id);
                let result = store
                    .list::<PlanStep>(Some(&filter), Some(&Order::asc("order_index")))
                    .map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::CreateTask { task, reply } => {
                let result = store.insert(&task).map_err(store_err).map(|_| task.id.clone());
                if result.is_ok() {
                    emit(&change_tx, ChangeEvent::inserted(&task));
                }
                let _ = reply.send(result);
            }

            StateCommand::CreateTasks { tasks, reply } => {
                let result = store.insert_many(&tasks).map_err(store_err);
                if result.is_ok() {
                    for task in &tasks {
                        emit(&change_tx, ChangeEvent::inserted(task));
                    }
                }
                let _ = reply.send(result);
            }

            StateCommand::ListTasks { conversation_id, reply } => {
                let filter = conversation_id.map(|c| Filter::text("conversation_id", c));
                let result = store
                    .list::<Task>(filter.as_ref(), Some(&Order::asc("order_index")))
                    .map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::CountTasks { conversation_id, reply } => {
                let filter = conversation_id.map(|c| Filter::text("conversation_id", c));
                let result = store.count::<Task>(filter.as_ref()).map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::UpdateTaskStatus { id, status, reply } => {
                let result = mutate::<Task>(&store, &id, |task| task.set_status(status));
                if let Ok(task) = &result {
                    emit(&change_tx, ChangeEvent::updated(task));
                }
                let _ = reply.send(result.map(|_| ()));
            }

            StateCommand::UpdateTaskAssignee { id, assignee, reply } => {
                let result = mutate::<Task>(&store, &id, |task| task.set_assignee(assignee));
                if let Ok(task) = &result {
                    emit(&change_tx, ChangeEvent::updated(task));
                }
                let _ = reply.send(result.map(|_| ()));
            }

            StateCommand::DeleteTask { id, reply } => {
                let result = store.delete::<Task>(&id).map_err(store_err);
                if let Ok(true) = result {
                    emit(&change_tx, Some(ChangeEvent::deleted::<Task>(&id)));
                }
                let _ = reply.send(result);
            }

            StateCommand::CreateTool { tool, reply } => {
                let result = store.insert(&tool).map_err(store_err).map(|_| tool.id.clone());
                if result.is_ok() {
                    emit(&change_tx, ChangeEvent::inserted(&tool));
                }
                let _ = reply.send(result);
            }

            StateCommand::ListTools { reply } => {
                let result = store
                    .list::<Tool>(None, Some(&Order::asc("created_at")))
                    .map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::SetToolEnabled { id, enabled, reply } => {
                let result = mutate::<Tool>(&store, &id, |tool| tool.set_enabled(enabled));
                if let Ok(tool) = &result {
                    emit(&change_tx, ChangeEvent::updated(tool));
                }
                let _ = reply.send(result.map(|_| ()));
            }

            StateCommand::CreateArtifact { artifact, reply } => {
                let result = store.insert(&artifact).map_err(store_err).map(|_| artifact.id.clone());
                if result.is_ok() {
                    emit(&change_tx, ChangeEvent::inserted(&artifact));
                }
                let _ = reply.send(result);
            }

            StateCommand::ListArtifacts { conversation_id, reply } => {
                let filter = conversation_id.map(|c| Filter::text("conversation_id", c));
                let result = store
                    .list::<Artifact>(filter.as_ref(), Some(&Order::desc("updated_at")))
                    .map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::UpdateArtifactContent { id, content, reply } => {
                let result = mutate::<Artifact>(&store, &id, |artifact| artifact.update_content(content));
                match result {
                    Ok(artifact) => {
                        let version = artifact.version;
                        emit(&change_tx, ChangeEvent::updated(&artifact));
                        let _ = reply.send(Ok(version));
                    }
                    Err(e) => {
                        let _ = reply.send(Err(e));
                    }
                }
            }

            StateCommand::Shutdown => {
                info!("state actor shutting down");
                break;
            }
        }
    }

    debug!("state actor stopped");
}

/// Load a record, apply a mutation, write it back
fn mutate<R: voxstore::Record>(
    store: &Store,
    id: &str,
    f: impl FnOnce(&mut R),
) -> Result<R, StateError> {
    let mut record: R = store
        .get(id)
        .map_err(store_err)?
        .ok_or_else(|| StateError::NotFound(format!("{}/{id}", R::table_name())))?;
    f(&mut record);
    store.update(&record).map_err(store_err)?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContentType, MessageRole, PlanStepStatus};
    use crate::state::sync::ChangeOp;

    #[tokio::test]
    async fn test_agent_roster_seeding_is_idempotent() {
        let manager = StateManager::spawn_in_memory().unwrap();

        let roster = manager.ensure_default_agents("proj-1").await.unwrap();
        assert_eq!(roster.len(), 4);

        let again = manager.ensure_default_agents("proj-1").await.unwrap();
        assert_eq!(again.len(), 4);
        assert_eq!(manager.list_agents(Some("proj-1")).await.unwrap().len(), 4);

        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_find_agent_resolves_exact_name() {
        let manager = StateManager::spawn_in_memory().unwrap();
        manager.ensure_default_agents("proj-1").await.unwrap();

        let atlas = manager.find_agent(Some("proj-1"), "Atlas").await.unwrap();
        assert!(atlas.is_some());

        let nobody = manager.find_agent(Some("proj-1"), "Nemo").await.unwrap();
        assert!(nobody.is_none());

        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_message_and_plan_step_persistence() {
        let manager = StateManager::spawn_in_memory().unwrap();

        let message = Message::new("conv-1", MessageRole::Orchestrator, "reply");
        let message_id = manager.create_message(message).await.unwrap();

        let steps = vec![
            PlanStep::new(&message_id, "Research", PlanStepStatus::Pending, None, 0),
            PlanStep::new(&message_id, "Write", PlanStepStatus::Pending, None, 1),
        ];
        manager.create_plan_steps(steps).await.unwrap();

        let loaded = manager.list_plan_steps(&message_id).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].label, "Research");
        assert_eq!(loaded[1].order_index, 1);

        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_task_count_scoped_by_conversation() {
        let manager = StateManager::spawn_in_memory().unwrap();

        let t1 = Task::new("A", None, Assignee::Vox).with_conversation("conv-1");
        let t2 = Task::new("B", None, Assignee::Vox).with_conversation("conv-1");
        let t3 = Task::new("C", None, Assignee::Vox).with_conversation("conv-2");
        manager.create_tasks(vec![t1, t2]).await.unwrap();
        manager.create_task(t3).await.unwrap();

        assert_eq!(manager.count_tasks(Some("conv-1")).await.unwrap(), 2);
        assert_eq!(manager.count_tasks(None).await.unwrap(), 3);

        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_artifact_version_increments_through_actor() {
        let manager = StateManager::spawn_in_memory().unwrap();

        let artifact = Artifact::new("Doc", "v1", ContentType::Markdown);
        let id = manager.create_artifact(artifact).await.unwrap();

        assert_eq!(manager.update_artifact_content(&id, "v2").await.unwrap(), 2);
        assert_eq!(manager.update_artifact_content(&id, "v3").await.unwrap(), 3);

        let listed = manager.list_artifacts(None).await.unwrap();
        assert_eq!(listed[0].version, 3);

        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_update_missing_task_is_not_found() {
        let manager = StateManager::spawn_in_memory().unwrap();
        manager.create_task(Task::new("A", None, Assignee::Vox)).await.unwrap();

        let err = manager.update_task_status("missing", TaskStatus::Completed).await.unwrap_err();
        assert!(matches!(err, StateError::NotFound(_)));

        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_change_feed_carries_mutations() {
        let manager = StateManager::spawn_in_memory().unwrap();
        let mut changes = manager.subscribe_changes();

        let task = Task::new("A", None, Assignee::Vox);
        let id = manager.create_task(task).await.unwrap();

        let event = changes.recv().await.unwrap();
        assert_eq!(event.table, "tasks");
        assert_eq!(event.op, ChangeOp::Insert);
        assert_eq!(event.id, id);

        manager.update_task_status(&id, TaskStatus::Completed).await.unwrap();
        let event = changes.recv().await.unwrap();
        assert_eq!(event.op, ChangeOp::Update);

        manager.delete_task(&id).await.unwrap();
        let event = changes.recv().await.unwrap();
        assert_eq!(event.op, ChangeOp::Delete);

        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_tool_toggle_round_trip() {
        let manager = StateManager::spawn_in_memory().unwrap();

        let tool = Tool::new("search", "search");
        let id = manager.create_tool(tool).await.unwrap();

        manager.set_tool_enabled(&id, false).await.unwrap();
        let tools = manager.list_tools().await.unwrap();
        assert!(!tools[0].is_enabled);

        manager.shutdown().await.unwrap();
    }
}
