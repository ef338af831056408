//! Vox - multi-agent operator console
//!
//! CLI entry point for the console and one-shot commands.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tokio::sync::mpsc;
use tracing::info;

use vox::cli::{ArtifactCommand, Cli, Command, OutputFormat, TaskCommand, ToolCommand};
use vox::config::Config;
use vox::domain::{Assignee, Tool, parse_tool_config};
use vox::orchestrator::{SessionController, SessionEvent};
use vox::planning::TaskMaterializer;
use vox::state::StateManager;
use vox::tui;

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vox")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Write to the log file, never stdout/stderr - the TUI owns the terminal
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(log_dir.join("vox.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(endpoint = %config.orchestrator.endpoint, "Vox loaded config");

    match cli.command {
        Some(Command::Console) | None => cmd_console(&config).await,
        Some(Command::Ask { prompt }) => cmd_ask(&config, &prompt).await,
        Some(Command::Task { command }) => cmd_task(&config, command).await,
        Some(Command::Agents { format }) => cmd_agents(&config, format).await,
        Some(Command::Tools { command }) => cmd_tools(&config, command).await,
        Some(Command::Artifacts { command }) => cmd_artifacts(&config, command).await,
    }
}

fn spawn_state(config: &Config) -> Result<StateManager> {
    StateManager::spawn(config.store_path()).context("Failed to spawn StateManager")
}

fn build_session(config: &Config, state: StateManager) -> Result<SessionController> {
    SessionController::new(
        &config.orchestrator.endpoint,
        config.api_key()?,
        state,
        &config.workspace.conversation_id,
    )
    .with_project(&config.workspace.project_id)
    .with_timeout(std::time::Duration::from_millis(config.orchestrator.timeout_ms))
}

/// Launch the interactive console
async fn cmd_console(config: &Config) -> Result<()> {
    config.validate()?;

    let state = spawn_state(config)?;
    let session = build_session(config, state.clone())?;

    tui::run(
        state,
        session,
        &config.workspace.project_id,
        &config.workspace.conversation_id,
    )
    .await
}

/// One prompt, streamed to stdout
async fn cmd_ask(config: &Config, prompt: &str) -> Result<()> {
    config.validate()?;

    let state = spawn_state(config)?;
    state.ensure_default_agents(&config.workspace.project_id).await?;
    let session = build_session(config, state.clone())?;

    let (tx, mut rx) = mpsc::channel::<SessionEvent>(256);
    let prompt = prompt.to_string();
    let sender = session.clone();
    let handle = tokio::spawn(async move { sender.send(&prompt, Vec::new(), tx).await });

    while let Some(event) = rx.recv().await {
        match event {
            SessionEvent::Delta(delta) => {
                use std::io::Write;
                print!("{delta}");
                std::io::stdout().flush()?;
            }
            SessionEvent::Plan(steps) => {
                println!();
                println!("{}", "Plan:".bold());
                for (i, step) in steps.iter().enumerate() {
                    let agent = step.agent.as_deref().map(|a| format!(" @{a}")).unwrap_or_default();
                    println!("  {}. {}{}", i + 1, step.label, agent.green());
                }
            }
            SessionEvent::Tasks(drafts) => {
                println!();
                println!("{}", "Tasks:".bold());
                for draft in &drafts {
                    println!("  - {} [{}]", draft.title, draft.assignee.to_string().cyan());
                }
            }
            SessionEvent::Completed { .. } => {
                println!();
                break;
            }
            SessionEvent::Failed { notice, .. } => {
                eprintln!("{}: {}", notice.title.red().bold(), notice.body);
                std::process::exit(1);
            }
        }
    }

    handle.await?;
    Ok(())
}

/// Task management subcommands
async fn cmd_task(config: &Config, command: TaskCommand) -> Result<()> {
    let state = spawn_state(config)?;
    let conversation = config.workspace.conversation_id.as_str();
    let materializer = TaskMaterializer::new(state.clone(), conversation);

    match command {
        TaskCommand::Add { title, assignee, description } => {
            let assignee = Assignee::from_wire(&assignee);
            let task = materializer.add_direct(&title, description, assignee).await?;
            println!("Created task {} ({})", task.id.bold(), task.status);
        }
        TaskCommand::List { format } => {
            let tasks = state.list_tasks(Some(conversation)).await?;
            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&tasks)?);
                return Ok(());
            }
            if tasks.is_empty() {
                println!("No tasks yet.");
                return Ok(());
            }
            for task in tasks {
                let status = match task.status {
                    vox::TaskStatus::Completed => task.status.to_string().green(),
                    vox::TaskStatus::Blocked => task.status.to_string().red(),
                    vox::TaskStatus::InProgress => task.status.to_string().cyan(),
                    vox::TaskStatus::Pending => task.status.to_string().yellow(),
                };
                println!("{}  {:<12} [{}] {}", task.id, status, task.assignee, task.title);
            }
        }
        TaskCommand::Done { id } => {
            state.update_task_status(&id, vox::TaskStatus::Completed).await?;
            println!("Task {} completed", id.bold());
        }
        TaskCommand::Assign { id, assignee } => {
            let assignee = Assignee::from_wire(&assignee);
            state.update_task_assignee(&id, assignee).await?;
            println!("Task {} assigned to {}", id.bold(), assignee);
        }
        TaskCommand::Rm { id } => {
            if state.delete_task(&id).await? {
                println!("Task {} deleted", id.bold());
            } else {
                println!("No task with id {id}");
            }
        }
    }
    Ok(())
}

/// Show the agent roster
async fn cmd_agents(config: &Config, format: OutputFormat) -> Result<()> {
    let state = spawn_state(config)?;
    let agents = state.ensure_default_agents(&config.workspace.project_id).await?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&agents)?);
        return Ok(());
    }

    for agent in agents {
        let status = match agent.status {
            vox::AgentStatus::Active | vox::AgentStatus::Working => agent.status.to_string().green(),
            vox::AgentStatus::Idle => agent.status.to_string().dimmed(),
            vox::AgentStatus::Error => agent.status.to_string().red(),
        };
        let avatar = agent.avatar.as_deref().unwrap_or("·");
        println!(
            "{avatar} {:<10} {:<12} {status}  {} tok",
            agent.name.bold(),
            agent.role,
            agent.tokens_used
        );
    }
    Ok(())
}

/// Tool management subcommands
async fn cmd_tools(config: &Config, command: ToolCommand) -> Result<()> {
    let state = spawn_state(config)?;

    match command {
        ToolCommand::List { format } => {
            let tools = state.list_tools().await?;
            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&tools)?);
                return Ok(());
            }
            if tools.is_empty() {
                println!("No tools registered.");
                return Ok(());
            }
            for tool in tools {
                let enabled = if tool.is_enabled { "enabled".green() } else { "disabled".dimmed() };
                println!("{}  {:<16} ({})  {enabled}", tool.id, tool.name.bold(), tool.category);
            }
        }
        ToolCommand::Add { config_json, category } => {
            let parsed = parse_tool_config(&config_json)?;
            let name = parsed.name.unwrap_or_else(|| "custom-tool".to_string());
            let mut tool = Tool::new(name, category)
                .with_project(&config.workspace.project_id)
                .with_config(parsed.config.clone());
            if !parsed.config.env.is_empty() {
                tool = tool.with_credential_required();
            }
            let id = state.create_tool(tool).await?;
            println!("Registered tool {}", id.bold());
        }
        ToolCommand::Toggle { id } => {
            let tools = state.list_tools().await?;
            let tool = tools
                .iter()
                .find(|t| t.id == id)
                .ok_or_else(|| eyre::eyre!("No tool with id {id}"))?;
            state.set_tool_enabled(&id, !tool.is_enabled).await?;
            println!(
                "Tool {} is now {}",
                id.bold(),
                if tool.is_enabled { "disabled" } else { "enabled" }
            );
        }
    }
    Ok(())
}

/// Artifact subcommands
async fn cmd_artifacts(config: &Config, command: ArtifactCommand) -> Result<()> {
    let state = spawn_state(config)?;
    let conversation = config.workspace.conversation_id.as_str();

    match command {
        ArtifactCommand::List { format } => {
            let artifacts = state.list_artifacts(Some(conversation)).await?;
            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&artifacts)?);
                return Ok(());
            }
            if artifacts.is_empty() {
                println!("No artifacts yet.");
                return Ok(());
            }
            for artifact in artifacts {
                println!(
                    "{}  {} v{} ({})",
                    artifact.id,
                    artifact.title.bold(),
                    artifact.version,
                    artifact.content_type
                );
            }
        }
        ArtifactCommand::Show { id } => {
            let artifacts = state.list_artifacts(None).await?;
            let artifact = artifacts
                .iter()
                .find(|a| a.id == id)
                .ok_or_else(|| eyre::eyre!("No artifact with id {id}"))?;
            println!("{} v{}", artifact.title.bold(), artifact.version);
            println!();
            println!("{}", artifact.content);
        }
        ArtifactCommand::New { title, content, content_type } => {
            let artifact = vox::Artifact::new(title, content, vox::ContentType::from_wire(&content_type))
                .with_project(&config.workspace.project_id)
                .with_conversation(conversation);
            let id = state.create_artifact(artifact).await?;
            println!("Created artifact {}", id.bold());
        }
        ArtifactCommand::Update { id, content } => {
            let version = state.update_artifact_content(&id, &content).await?;
            println!("Artifact {} is now v{version}", id.bold());
        }
    }
    Ok(())
}
