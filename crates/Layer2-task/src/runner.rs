//! TaskRunner - launch one container task and follow it to completion
//!
//! Lifecycle of a runner:
//!
//! ```text
//! new ──► start ──► is_finished* ──► exit_status / get_logs
//!            │
//!            └──► stop (any time after start)
//! ```
//!
//! The task definition is looked up by its family name first and only
//! registered when missing, so repeated runs of the same image reuse one
//! family. A runner launches at most once.

use crate::api::{
    ContainerDefinition, ContainerOverride, LogConfiguration, LogEvent, NetworkMode,
    RemoteClients, TaskDefinitionSpec,
};
use crate::naming::{self, ConsoleLinks, LOG_STREAM_PREFIX};
use crate::retry::{poll_until, RetryPolicy, Sleeper, TokioSleeper};
use crate::state::TaskStatus;
use crate::task::ExitStatus;
use ecs_task_foundation::{Error, Result, RunnerConfig};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Reason attached to stop requests
pub const STOP_REASON: &str = "stop by ecs_task command";

/// Stop reason of a task whose container simply exited
pub const BENIGN_STOP_REASON: &str = "Essential container in task exited";

/// Launches and inspects a single task instance
pub struct TaskRunner {
    config: RunnerConfig,
    clients: RemoteClients,
    sleeper: Arc<dyn Sleeper>,
    task_arn: Option<String>,
}

impl std::fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRunner")
            .field("cluster", &self.config.cluster)
            .field("image", &self.config.image)
            .field("task_arn", &self.task_arn)
            .finish_non_exhaustive()
    }
}

impl TaskRunner {
    pub fn new(config: RunnerConfig, clients: RemoteClients) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            clients,
            sleeper: Arc::new(TokioSleeper),
            task_arn: None,
        })
    }

    /// Runner backed by the AWS SDK clients built from `config`
    #[cfg(feature = "aws")]
    pub async fn connect(config: RunnerConfig) -> Result<Self> {
        let clients = crate::aws::AwsClients::connect(&config).await?;
        Self::new(config, clients.into_remote())
    }

    /// Replace the sleep used while waiting on eventually consistent state
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// ARN of the launched task, `None` until `start` succeeds
    pub fn task_arn(&self) -> Option<&str> {
        self.task_arn.as_deref()
    }

    pub fn short_task_id(&self) -> Option<&str> {
        self.task_arn.as_deref().map(naming::short_task_id)
    }

    // ========================================================================
    // Naming
    // ========================================================================

    /// Task definition family, also used as the container name
    pub fn task_name(&self) -> String {
        naming::task_name(self.config.name.as_deref(), &self.config.image)
    }

    pub fn log_group_path(&self) -> String {
        match &self.config.log_group {
            Some(group) => group.clone(),
            None => naming::default_log_group(&self.config.cluster, &self.config.image),
        }
    }

    /// Stream the task's container writes to; `None` before launch
    pub fn log_stream_name(&self) -> Option<String> {
        self.task_arn
            .as_deref()
            .map(|arn| naming::log_stream_name(&self.task_name(), arn))
    }

    pub fn console_links(&self) -> Option<ConsoleLinks> {
        let arn = self.task_arn.as_deref()?;
        let stream = naming::log_stream_name(&self.task_name(), arn);
        Some(ConsoleLinks::new(
            &self.config.region,
            &self.config.cluster,
            arn,
            &self.log_group_path(),
            &stream,
        ))
    }

    // ========================================================================
    // Launch
    // ========================================================================

    /// Launch the task.
    ///
    /// `Ok(false)` covers the failures a host reports to the user: missing
    /// cluster, log group never visible, per-task launch failures.
    ///
    /// The cluster is checked before anything is registered. When that
    /// check itself fails the launch goes ahead and a missing cluster is
    /// caught from the run request instead.
    pub async fn start(&mut self, verbose: bool) -> Result<bool> {
        if let Some(arn) = &self.task_arn {
            return Err(Error::AlreadyStarted(arn.clone()));
        }

        let cluster = self.config.cluster.clone();
        match self.clients.orchestration.cluster_exists(&cluster).await {
            Ok(true) => {}
            Ok(false) => {
                error!(cluster = %cluster, "cluster not found: {}", cluster);
                return Ok(false);
            }
            // Unknown; the launch itself reports a missing cluster
            Err(e) => warn!(cluster = %cluster, "cluster lookup failed: {}", e),
        }

        let task_definition = match self.find_task_definition().await? {
            Some(arn) => arn,
            None => match self.ensure_task_definition().await? {
                Some(arn) => arn,
                None => return Ok(false),
            },
        };

        let mut command = self.config.shell.clone();
        command.push(self.config.command.clone());
        let overrides = [ContainerOverride {
            name: self.task_name(),
            command,
        }];

        let output = match self
            .clients
            .orchestration
            .run_task(&cluster, &task_definition, 1, &overrides)
            .await
        {
            Ok(output) => output,
            Err(e) if e.is_cluster_not_found() => {
                error!(cluster = %cluster, "cluster not found: {}", cluster);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        if !output.failures.is_empty() {
            for failure in &output.failures {
                error!(cluster = %cluster, "task launch failed: {}", failure);
            }
            return Ok(false);
        }

        let Some(task_arn) = output.task_arns.into_iter().next() else {
            error!(cluster = %cluster, "run request returned no task");
            return Ok(false);
        };

        info!(cluster = %cluster, task_arn = %task_arn, "task started");
        self.task_arn = Some(task_arn);

        if verbose {
            if let Some(links) = self.console_links() {
                eprintln!("Task Details:");
                eprintln!("{}", links.task_details);
                eprintln!("Task Logs:");
                eprintln!("{}", links.task_logs);
            }
        }

        Ok(true)
    }

    /// ARN of the registered family, `None` when it was never registered
    async fn find_task_definition(&self) -> Result<Option<String>> {
        let family = self.task_name();
        match self
            .clients
            .orchestration
            .describe_task_definition(&family)
            .await
        {
            Ok(arn) => {
                debug!(family = %family, arn = %arn, "reusing task definition");
                Ok(Some(arn))
            }
            Err(e) if e.is_missing_task_definition() => {
                debug!(family = %family, "task definition not registered yet");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Make sure the log group exists, then register a task definition.
    ///
    /// `Ok(None)` when the log group never became visible; nothing is
    /// registered in that case.
    pub async fn ensure_task_definition(&self) -> Result<Option<String>> {
        let group = self.log_group_path();
        if !self.ensure_log_group(&group).await? {
            error!(log_group = %group, "cannot create log group");
            return Ok(None);
        }

        let spec = self.task_definition_spec(&group);
        debug!(
            family = %spec.family,
            command = %naming::sanitize_command(&self.config.command),
            "registering task definition"
        );
        let arn = self
            .clients
            .orchestration
            .register_task_definition(&spec)
            .await?;
        info!(family = %spec.family, arn = %arn, "task definition registered");
        Ok(Some(arn))
    }

    /// Registration request for this runner's single container
    pub fn task_definition_spec(&self, log_group: &str) -> TaskDefinitionSpec {
        let name = self.task_name();
        TaskDefinitionSpec {
            family: name.clone(),
            network_mode: NetworkMode::Bridge,
            container_definitions: vec![ContainerDefinition {
                name,
                image: self.config.image.clone(),
                cpu: self.config.cpu,
                memory: self.config.memory,
                essential: true,
                environment: self.config.environment.clone(),
                log_configuration: LogConfiguration::awslogs(
                    log_group,
                    &self.config.region,
                    LOG_STREAM_PREFIX,
                ),
            }],
        }
    }

    async fn ensure_log_group(&self, group: &str) -> Result<bool> {
        if self.log_group_exists(group).await {
            return Ok(true);
        }

        self.clients.logs.create_log_group(group).await?;
        info!(log_group = %group, "log group created");

        let policy = RetryPolicy::from(self.config.log_group_wait);
        poll_until(&policy, self.sleeper.as_ref(), "log group visibility", move || async move {
            Ok::<_, Error>(self.log_group_exists(group).await)
        })
        .await
    }

    /// Lookup errors count as "not there yet"
    async fn log_group_exists(&self, group: &str) -> bool {
        match self.clients.logs.describe_log_groups(group).await {
            Ok(groups) => !groups.is_empty(),
            Err(e) => {
                debug!(log_group = %group, "log group lookup failed: {}", e);
                false
            }
        }
    }

    // ========================================================================
    // Control / inspection
    // ========================================================================

    /// Ask the service to stop the task. Does not wait for it.
    pub async fn stop(&self) -> Result<()> {
        let arn = self.task_arn.as_deref().ok_or(Error::NotStarted)?;
        self.clients
            .orchestration
            .stop_task(&self.config.cluster, arn, STOP_REASON)
            .await?;
        info!(task_arn = %arn, "stop requested");
        Ok(())
    }

    /// A runner that never launched counts as finished. A task the service
    /// cannot find (yet) counts as still running.
    pub async fn is_finished(&self) -> Result<bool> {
        let Some(arn) = self.task_arn.as_deref() else {
            warn!("task has not been started");
            return Ok(true);
        };

        let described = self
            .clients
            .orchestration
            .describe_tasks(&self.config.cluster, &[arn.to_string()])
            .await?;

        if described.tasks.is_empty() {
            warn!(task_arn = %arn, "missing task");
            return Ok(false);
        }

        Ok(described
            .tasks
            .iter()
            .all(|task| TaskStatus::parse(&task.last_status).is_terminal()))
    }

    /// Exit status of the first container, `None` while the task is not
    /// stopped or when it cannot be described.
    pub async fn exit_status(&self) -> Result<Option<ExitStatus>> {
        let Some(arn) = self.task_arn.as_deref() else {
            warn!("task has not been started");
            return Ok(None);
        };

        let described = self
            .clients
            .orchestration
            .describe_tasks(&self.config.cluster, &[arn.to_string()])
            .await?;

        let Some(task) = described.tasks.first() else {
            warn!(task_arn = %arn, "cannot find task");
            return Ok(None);
        };

        let status = TaskStatus::parse(&task.last_status);
        if !status.is_terminal() {
            debug!(task_arn = %arn, status = %status, "task not stopped yet");
            return Ok(None);
        }

        if let Some(reason) = task.stopped_reason.as_deref() {
            if reason != BENIGN_STOP_REASON {
                warn!(task_arn = %arn, "task stopped: {}", reason);
            }
        }

        Ok(ExitStatus::from_description(task, &described))
    }

    /// Log events newer than `start_after` (epoch milliseconds), stream by
    /// stream in service order.
    pub async fn get_logs(&self, start_after: i64) -> Result<Vec<LogEvent>> {
        let Some(arn) = self.task_arn.as_deref() else {
            warn!("task has not been started");
            return Ok(Vec::new());
        };

        let group = self.log_group_path();
        let prefix = naming::log_stream_name(&self.task_name(), arn);
        let streams = self
            .clients
            .logs
            .describe_log_streams(&group, &prefix)
            .await?;

        let mut result = Vec::new();
        for stream in &streams {
            let events = self
                .clients
                .logs
                .get_log_events(&group, stream, start_after.saturating_add(1))
                .await?;
            result.extend(events.into_iter().filter(|e| e.timestamp > start_after));
        }

        debug!(log_group = %group, streams = streams.len(), events = result.len(), "fetched logs");
        Ok(result)
    }

    /// Poll `is_finished` within `policy`. `Ok(false)` if the budget ran out.
    pub async fn wait_until_finished(&self, policy: &RetryPolicy) -> Result<bool> {
        poll_until(policy, self.sleeper.as_ref(), "task completion", move || async move {
            self.is_finished().await
        })
        .await
    }
}
