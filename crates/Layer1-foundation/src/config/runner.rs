//! Runner Configuration - everything needed to launch one container task
//!
//! Loaded from `runner.json` (project `.ecs-task/` or the global config dir)
//! or built in code with the `with_*` methods.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Runner settings file name
pub const RUNNER_CONFIG_FILE: &str = "runner.json";

/// Project-local settings directory
pub const PROJECT_DIR: &str = ".ecs-task";

/// Static credentials for the remote services
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// One environment variable injected into the container
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Bounded wait for the log group to become visible after creation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LogGroupWait {
    /// Extra existence checks after the first one
    pub max_retries: u32,
    /// Delay between checks (milliseconds)
    pub interval_ms: u64,
}

impl Default for LogGroupWait {
    fn default() -> Self {
        Self {
            max_retries: 60,
            interval_ms: 1000,
        }
    }
}

impl LogGroupWait {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Configuration of a single task runner
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunnerConfig {
    /// Target cluster
    #[serde(default = "default_cluster")]
    pub cluster: String,

    /// Container image reference
    #[serde(default = "default_image")]
    pub image: String,

    /// Shell command run inside the container
    #[serde(default = "default_command")]
    pub command: String,

    /// Logical name; derived from the image when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Explicit log group; derived from cluster and image when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_group: Option<String>,

    #[serde(default)]
    pub environment: Vec<EnvVar>,

    #[serde(default = "default_region")]
    pub region: String,

    /// Falls back to the ambient credential chain when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,

    /// Hard memory limit (MiB)
    #[serde(default = "default_memory")]
    pub memory: i32,

    /// CPU units, 0 = shared
    #[serde(default)]
    pub cpu: i32,

    /// Entrypoint prefix; the command is appended as the last argument
    #[serde(default = "default_shell")]
    pub shell: Vec<String>,

    #[serde(default)]
    pub log_group_wait: LogGroupWait,
}

fn default_cluster() -> String {
    "default".to_string()
}

fn default_image() -> String {
    "alpine".to_string()
}

fn default_command() -> String {
    "hostname".to_string()
}

fn default_region() -> String {
    "ap-northeast-1".to_string()
}

fn default_memory() -> i32 {
    300
}

fn default_shell() -> Vec<String> {
    vec!["/bin/sh".to_string(), "-c".to_string()]
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            cluster: default_cluster(),
            image: default_image(),
            command: default_command(),
            name: None,
            log_group: None,
            environment: Vec::new(),
            region: default_region(),
            credentials: None,
            memory: default_memory(),
            cpu: 0,
            shell: default_shell(),
            log_group_wait: LogGroupWait::default(),
        }
    }
}

impl RunnerConfig {
    pub fn new(
        cluster: impl Into<String>,
        image: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            cluster: cluster.into(),
            image: image.into(),
            command: command.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_log_group(mut self, log_group: impl Into<String>) -> Self {
        self.log_group = Some(log_group.into());
        self
    }

    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.push(EnvVar::new(name, value));
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_memory(mut self, memory: i32) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_cpu(mut self, cpu: i32) -> Self {
        self.cpu = cpu;
        self
    }

    pub fn with_shell(mut self, shell: Vec<String>) -> Self {
        self.shell = shell;
        self
    }

    pub fn with_log_group_wait(mut self, wait: LogGroupWait) -> Self {
        self.log_group_wait = wait;
        self
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// `<root>/.ecs-task/runner.json`
    pub fn project_path(root: impl AsRef<Path>) -> PathBuf {
        root.as_ref().join(PROJECT_DIR).join(RUNNER_CONFIG_FILE)
    }

    /// `<config dir>/ecs-task/runner.json`
    pub fn global_path() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Cannot find config directory".to_string()))?;
        Ok(dir.join("ecs-task").join(RUNNER_CONFIG_FILE))
    }

    /// Load and validate a JSON settings file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        debug!(path = %path.display(), cluster = %config.cluster, "loaded runner config");
        Ok(config)
    }

    /// Like `load`, but a missing file yields the defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no runner config, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Write as pretty JSON, creating the parent directory when needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create {}: {}", parent.display(), e)))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write {}: {}", path.display(), e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.cluster.trim().is_empty() {
            return Err(Error::Config("cluster must not be empty".into()));
        }
        if self.image.trim().is_empty() {
            return Err(Error::Config("image must not be empty".into()));
        }
        if self.command.trim().is_empty() {
            return Err(Error::Config("command must not be empty".into()));
        }
        if self.shell.is_empty() {
            return Err(Error::Config("shell prefix must not be empty".into()));
        }
        if self.memory <= 0 {
            return Err(Error::Config(format!("invalid memory limit: {}", self.memory)));
        }
        Ok(())
    }
}
