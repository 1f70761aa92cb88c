//! Error types for ecs-task
//!
//! Every remote failure surfaces here. The runner translates a few
//! well-known kinds (missing task definition, missing cluster) into
//! ordinary return values; everything else propagates to the caller.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Message the orchestration service returns when a task definition
/// family has never been registered.
pub const MISSING_TASK_DEFINITION_MESSAGE: &str = "Unable to describe task definition.";

/// ecs-task error type
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // Remote services
    // ========================================================================
    #[error("Cluster not found: {0}")]
    ClusterNotFound(String),

    #[error("API error: {service} - {code}: {message}")]
    Api {
        service: String,
        code: String,
        message: String,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    // ========================================================================
    // Runner lifecycle
    // ========================================================================
    #[error("Task has not been started")]
    NotStarted,

    #[error("Task already started: {0}")]
    AlreadyStarted(String),

    // ========================================================================
    // External conversions
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// API error helper
    pub fn api(
        service: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Api {
            service: service.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    /// True when the service reported that the task definition family does
    /// not exist. Matched on the message, which is all the service gives us.
    pub fn is_missing_task_definition(&self) -> bool {
        matches!(self, Error::Api { message, .. } if message == MISSING_TASK_DEFINITION_MESSAGE)
    }

    pub fn is_cluster_not_found(&self) -> bool {
        matches!(self, Error::ClusterNotFound(_))
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
