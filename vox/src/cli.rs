//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// Vox - multi-agent operator console
#[derive(Parser)]
#[command(
    name = "vox",
    about = "Operator console for an orchestrator-driven agent workspace",
    version,
    after_help = "Logs are written to: ~/.local/share/vox/logs/vox.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Launch the interactive console (default)
    Console,

    /// Send one prompt to the orchestrator and stream the reply to stdout
    Ask {
        /// The prompt text
        prompt: String,
    },

    /// Manage tasks
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },

    /// Show the agent roster
    Agents {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Manage tools
    Tools {
        #[command(subcommand)]
        command: ToolCommand,
    },

    /// Browse artifacts
    Artifacts {
        #[command(subcommand)]
        command: ArtifactCommand,
    },
}

/// Task subcommands
#[derive(Subcommand)]
pub enum TaskCommand {
    /// Add a task directly
    Add {
        /// Task title
        title: String,

        /// Assign to "human" or "vox"
        #[arg(short, long, default_value = "vox")]
        assignee: String,

        /// Optional description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List tasks in the current conversation
    List {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Mark a task completed
    Done {
        /// Task id
        id: String,
    },

    /// Reassign a task
    Assign {
        /// Task id
        id: String,

        /// "human" or "vox"
        assignee: String,
    },

    /// Delete a task
    Rm {
        /// Task id
        id: String,
    },
}

/// Tool subcommands
#[derive(Subcommand)]
pub enum ToolCommand {
    /// List registered tools
    List {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Register a tool from a pasted configuration blob
    Add {
        /// JSON configuration (mcpServers wrapper, name-keyed, or bare)
        config_json: String,

        /// Category label
        #[arg(long, default_value = "custom")]
        category: String,
    },

    /// Enable or disable a tool
    Toggle {
        /// Tool id
        id: String,
    },
}

/// Artifact subcommands
#[derive(Subcommand)]
pub enum ArtifactCommand {
    /// List artifacts, newest first
    List {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print an artifact's content
    Show {
        /// Artifact id
        id: String,
    },

    /// Create an artifact
    New {
        /// Display title
        title: String,

        /// Initial content
        content: String,

        /// Content type: markdown, code, or table
        #[arg(short = 't', long, default_value = "markdown")]
        content_type: String,
    },

    /// Replace an artifact's content (bumps the version)
    Update {
        /// Artifact id
        id: String,

        /// New content
        content: String,
    },
}

/// Output format for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown output format: {s}. Valid formats: text, json")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_no_command() {
        let cli = Cli::parse_from(["vox"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_parse_ask() {
        let cli = Cli::parse_from(["vox", "ask", "plan the launch"]);
        match cli.command {
            Some(Command::Ask { prompt }) => assert_eq!(prompt, "plan the launch"),
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_cli_parse_task_add_defaults() {
        let cli = Cli::parse_from(["vox", "task", "add", "buy milk"]);
        match cli.command {
            Some(Command::Task {
                command: TaskCommand::Add { title, assignee, description },
            }) => {
                assert_eq!(title, "buy milk");
                assert_eq!(assignee, "vox");
                assert!(description.is_none());
            }
            _ => panic!("expected task add"),
        }
    }

    #[test]
    fn test_cli_parse_task_assign() {
        let cli = Cli::parse_from(["vox", "task", "assign", "t-1", "human"]);
        match cli.command {
            Some(Command::Task {
                command: TaskCommand::Assign { id, assignee },
            }) => {
                assert_eq!(id, "t-1");
                assert_eq!(assignee, "human");
            }
            _ => panic!("expected task assign"),
        }
    }

    #[test]
    fn test_cli_parse_global_config() {
        let cli = Cli::parse_from(["vox", "--config", "/tmp/vox.yml", "agents"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/vox.yml")));
        assert!(matches!(cli.command, Some(Command::Agents { .. })));
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>(), Ok(OutputFormat::Text));
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_cli_parse_task_list_format() {
        let cli = Cli::parse_from(["vox", "task", "list", "--format", "json"]);
        match cli.command {
            Some(Command::Task {
                command: TaskCommand::List { format },
            }) => assert_eq!(format, OutputFormat::Json),
            _ => panic!("expected task list"),
        }
    }

    #[test]
    fn test_cli_parse_tools_add() {
        let cli = Cli::parse_from(["vox", "tools", "add", "{\"command\": \"x\"}", "--category", "search"]);
        match cli.command {
            Some(Command::Tools {
                command: ToolCommand::Add { config_json, category },
            }) => {
                assert!(config_json.contains("command"));
                assert_eq!(category, "search");
            }
            _ => panic!("expected tools add"),
        }
    }
}
