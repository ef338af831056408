//! Orchestrator API error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the orchestrator endpoint
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Rate limited by the orchestrator endpoint")]
    RateLimited,

    #[error("Orchestrator endpoint requires credits")]
    CreditsRequired,

    #[error("Orchestrator API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl OrchestratorError {
    /// Map an HTTP status to the matching error category
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        match status {
            429 => Self::RateLimited,
            402 => Self::CreditsRequired,
            _ => Self::Api {
                status,
                message: message.unwrap_or_else(|| "Failed to get a response".to_string()),
            },
        }
    }

    /// Render as a user-facing notice
    pub fn notice(&self) -> Notice {
        match self {
            Self::RateLimited => Notice::warning(
                "Rate Limited",
                "The orchestrator is receiving too many requests. Wait a moment and try again.",
            ),
            Self::CreditsRequired => Notice::warning(
                "Credits Required",
                "The orchestrator endpoint needs more credits to continue.",
            ),
            Self::Api { message, .. } => Notice::error("Orchestrator Error", message.clone()),
            Self::Network(_) => Notice::error("Connection Error", "Could not reach the orchestrator endpoint."),
        }
    }
}

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A short user-facing notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub body: String,
}

impl Notice {
    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, title: title.into(), body: body.into() }
    }

    pub fn warning(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, title: title.into(), body: body.into() }
    }

    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, title: title.into(), body: body.into() }
    }
}
