//! Config - runner settings
//!
//! - `runner.rs` - RunnerConfig and its JSON loading

mod runner;

pub use runner::{
    Credentials, EnvVar, LogGroupWait, RunnerConfig, PROJECT_DIR, RUNNER_CONFIG_FILE,
};
