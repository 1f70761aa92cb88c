//! # ecs-task-foundation
//!
//! Foundation layer for ecs-task:
//! - Error: the shared error type and `Result` alias
//! - Config: `RunnerConfig` (cluster, image, command, resources, logging)
//! - Logging: tracing subscriber bootstrap for hosts

pub mod config;
pub mod error;
pub mod logging;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result, MISSING_TASK_DEFINITION_MESSAGE};

// ============================================================================
// Config
// ============================================================================
pub use config::{
    Credentials, EnvVar, LogGroupWait, RunnerConfig, PROJECT_DIR, RUNNER_CONFIG_FILE,
};
