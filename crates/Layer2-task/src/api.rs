//! Remote capabilities consumed by the runner
//!
//! Two services are involved:
//! - `OrchestrationApi` - task definitions and task instances
//! - `LogStorageApi` - log groups, log streams and their events
//!
//! Both are trait objects so the runner can be driven by the AWS SDK
//! (feature `aws`) or by an in-memory fake.

use async_trait::async_trait;
use ecs_task_foundation::{EnvVar, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

// ============================================================================
// Task definitions
// ============================================================================

/// Network mode of a task definition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    #[default]
    Bridge,
}

impl NetworkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bridge => "bridge",
        }
    }
}

/// Container log routing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConfiguration {
    pub log_driver: String,
    pub options: BTreeMap<String, String>,
}

impl LogConfiguration {
    /// `awslogs` driver writing to `group` in `region`
    pub fn awslogs(group: &str, region: &str, stream_prefix: &str) -> Self {
        let mut options = BTreeMap::new();
        options.insert("awslogs-group".to_string(), group.to_string());
        options.insert("awslogs-region".to_string(), region.to_string());
        options.insert("awslogs-stream-prefix".to_string(), stream_prefix.to_string());
        Self {
            log_driver: "awslogs".to_string(),
            options,
        }
    }
}

/// One container of a task definition. Links, port mappings, volumes
/// and mount points are always registered empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDefinition {
    pub name: String,
    pub image: String,
    pub cpu: i32,
    pub memory: i32,
    pub essential: bool,
    pub environment: Vec<EnvVar>,
    pub log_configuration: LogConfiguration,
}

/// Task definition registration request. Volumes and placement
/// constraints are always registered empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinitionSpec {
    pub family: String,
    pub network_mode: NetworkMode,
    pub container_definitions: Vec<ContainerDefinition>,
}

// ============================================================================
// Task instances
// ============================================================================

/// Per-container override applied at launch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerOverride {
    pub name: String,
    pub command: Vec<String>,
}

/// Failure entry reported alongside a run/describe response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Failure {
    pub fn new(arn: Option<&str>, reason: impl Into<String>) -> Self {
        Self {
            arn: arn.map(str::to_string),
            reason: Some(reason.into()),
            detail: None,
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({})",
            self.reason.as_deref().unwrap_or("unknown reason"),
            self.arn.as_deref().unwrap_or("-")
        )
    }
}

/// Result of a run request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunTaskOutput {
    pub task_arns: Vec<String>,
    pub failures: Vec<Failure>,
}

/// Container state inside a described task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerState {
    pub name: String,
    pub exit_code: Option<i32>,
    pub reason: Option<String>,
}

/// Described task instance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDescription {
    pub task_arn: String,
    pub last_status: String,
    pub stopped_reason: Option<String>,
    pub containers: Vec<ContainerState>,
}

/// Result of a describe request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescribeTasksOutput {
    pub tasks: Vec<TaskDescription>,
    pub failures: Vec<Failure>,
}

// ============================================================================
// Logs
// ============================================================================

/// One log message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub message: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl LogEvent {
    pub fn new(message: impl Into<String>, timestamp: i64) -> Self {
        Self {
            message: message.into(),
            timestamp,
        }
    }
}

// ============================================================================
// Capabilities
// ============================================================================

/// Task definition and task instance operations
#[async_trait]
pub trait OrchestrationApi: Send + Sync {
    /// ARN of the latest active revision of `family`.
    ///
    /// A family that was never registered yields an `Error::Api` whose
    /// message is `MISSING_TASK_DEFINITION_MESSAGE`.
    async fn describe_task_definition(&self, family: &str) -> Result<String>;

    /// Whether the service knows `cluster`. Callers treat an error as
    /// "unknown", not as "missing".
    async fn cluster_exists(&self, cluster: &str) -> Result<bool>;

    /// Register a new revision, returning its ARN
    async fn register_task_definition(&self, spec: &TaskDefinitionSpec) -> Result<String>;

    /// Launch `count` instances. A missing cluster is `Error::ClusterNotFound`.
    async fn run_task(
        &self,
        cluster: &str,
        task_definition: &str,
        count: i32,
        overrides: &[ContainerOverride],
    ) -> Result<RunTaskOutput>;

    async fn stop_task(&self, cluster: &str, task_arn: &str, reason: &str) -> Result<()>;

    async fn describe_tasks(&self, cluster: &str, task_arns: &[String])
        -> Result<DescribeTasksOutput>;
}

/// Log group and log event operations
#[async_trait]
pub trait LogStorageApi: Send + Sync {
    /// Names of log groups starting with `prefix`
    async fn describe_log_groups(&self, prefix: &str) -> Result<Vec<String>>;

    async fn create_log_group(&self, name: &str) -> Result<()>;

    /// Names of streams in `group` starting with `prefix`
    async fn describe_log_streams(&self, group: &str, prefix: &str) -> Result<Vec<String>>;

    /// Events of one stream with `timestamp >= start_time`, in stream order
    async fn get_log_events(
        &self,
        group: &str,
        stream: &str,
        start_time: i64,
    ) -> Result<Vec<LogEvent>>;
}

/// The pair of remote clients a runner talks to
#[derive(Clone)]
pub struct RemoteClients {
    pub orchestration: Arc<dyn OrchestrationApi>,
    pub logs: Arc<dyn LogStorageApi>,
}

impl RemoteClients {
    pub fn new(orchestration: Arc<dyn OrchestrationApi>, logs: Arc<dyn LogStorageApi>) -> Self {
        Self {
            orchestration,
            logs,
        }
    }
}

impl std::fmt::Debug for RemoteClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClients").finish_non_exhaustive()
    }
}
