//! AWS SDK backed remote clients (feature `aws`)
//!
//! ECS implements `OrchestrationApi`, CloudWatch Logs implements
//! `LogStorageApi`. Service errors keep their code and message so the
//! runner can recognise the missing task definition case.

use crate::api::{
    ContainerOverride, ContainerState, DescribeTasksOutput, Failure, LogEvent, LogStorageApi,
    OrchestrationApi, RemoteClients, RunTaskOutput, TaskDefinitionSpec, TaskDescription,
};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ecs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ecs::types as ecs;
use ecs_task_foundation::{Error, Result, RunnerConfig};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// ECS + CloudWatch Logs clients sharing one SDK configuration
#[derive(Debug, Clone)]
pub struct AwsClients {
    ecs: aws_sdk_ecs::Client,
    logs: aws_sdk_cloudwatchlogs::Client,
}

impl AwsClients {
    /// Explicit credentials when configured, the default provider chain
    /// otherwise.
    pub async fn connect(config: &RunnerConfig) -> Result<Self> {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));

        if let Some(credentials) = &config.credentials {
            debug!(access_key_id = %credentials.access_key_id, "using static credentials");
            loader = loader.credentials_provider(aws_sdk_ecs::config::Credentials::new(
                credentials.access_key_id.clone(),
                credentials.secret_access_key.clone(),
                None,
                None,
                "ecs-task",
            ));
        }

        let shared = loader.load().await;
        Ok(Self {
            ecs: aws_sdk_ecs::Client::new(&shared),
            logs: aws_sdk_cloudwatchlogs::Client::new(&shared),
        })
    }

    pub fn into_remote(self) -> RemoteClients {
        let clients = Arc::new(self);
        RemoteClients::new(clients.clone(), clients)
    }
}

fn sdk_error<E, R>(service: &str, err: SdkError<E, R>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    match err {
        SdkError::ServiceError(context) => {
            let e = context.into_err();
            Error::api(
                service,
                e.code().unwrap_or("Unknown"),
                e.message().unwrap_or_default(),
            )
        }
        other => Error::Transport(format!("{}", DisplayErrorContext(&other))),
    }
}

fn failure(f: &ecs::Failure) -> Failure {
    Failure {
        arn: f.arn().map(str::to_string),
        reason: f.reason().map(str::to_string),
        detail: f.detail().map(str::to_string),
    }
}

#[async_trait]
impl OrchestrationApi for AwsClients {
    async fn describe_task_definition(&self, family: &str) -> Result<String> {
        let output = self
            .ecs
            .describe_task_definition()
            .task_definition(family)
            .send()
            .await
            .map_err(|e| sdk_error("ecs", e))?;

        output
            .task_definition()
            .and_then(|definition| definition.task_definition_arn())
            .map(str::to_string)
            .ok_or_else(|| Error::api("ecs", "InvalidResponse", "task definition without ARN"))
    }

    async fn cluster_exists(&self, cluster: &str) -> Result<bool> {
        let output = self
            .ecs
            .describe_clusters()
            .clusters(cluster)
            .send()
            .await
            .map_err(|e| sdk_error("ecs", e))?;

        // Unknown names come back as MISSING failures, not as clusters
        Ok(!output.clusters().is_empty())
    }

    async fn register_task_definition(&self, spec: &TaskDefinitionSpec) -> Result<String> {
        let mut containers = Vec::with_capacity(spec.container_definitions.len());
        for container in &spec.container_definitions {
            let log_configuration = ecs::LogConfiguration::builder()
                .log_driver(ecs::LogDriver::from(
                    container.log_configuration.log_driver.as_str(),
                ))
                .set_options(Some(
                    container
                        .log_configuration
                        .options
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect::<HashMap<_, _>>(),
                ))
                .build()
                .map_err(|e| Error::Internal(format!("invalid log configuration: {}", e)))?;

            let environment = container
                .environment
                .iter()
                .map(|var| {
                    ecs::KeyValuePair::builder()
                        .name(&var.name)
                        .value(&var.value)
                        .build()
                })
                .collect::<Vec<_>>();

            containers.push(
                ecs::ContainerDefinition::builder()
                    .name(&container.name)
                    .image(&container.image)
                    .cpu(container.cpu)
                    .memory(container.memory)
                    .essential(container.essential)
                    .set_environment(Some(environment))
                    .set_links(Some(vec![]))
                    .set_port_mappings(Some(vec![]))
                    .set_volumes_from(Some(vec![]))
                    .set_mount_points(Some(vec![]))
                    .log_configuration(log_configuration)
                    .build(),
            );
        }

        let output = self
            .ecs
            .register_task_definition()
            .family(&spec.family)
            .network_mode(ecs::NetworkMode::from(spec.network_mode.as_str()))
            .set_container_definitions(Some(containers))
            .set_volumes(Some(vec![]))
            .set_placement_constraints(Some(vec![]))
            .send()
            .await
            .map_err(|e| sdk_error("ecs", e))?;

        output
            .task_definition()
            .and_then(|definition| definition.task_definition_arn())
            .map(str::to_string)
            .ok_or_else(|| Error::api("ecs", "InvalidResponse", "registered definition without ARN"))
    }

    async fn run_task(
        &self,
        cluster: &str,
        task_definition: &str,
        count: i32,
        overrides: &[ContainerOverride],
    ) -> Result<RunTaskOutput> {
        let mut task_override = ecs::TaskOverride::builder();
        for o in overrides {
            task_override = task_override.container_overrides(
                ecs::ContainerOverride::builder()
                    .name(&o.name)
                    .set_command(Some(o.command.clone()))
                    .build(),
            );
        }

        let result = self
            .ecs
            .run_task()
            .cluster(cluster)
            .task_definition(task_definition)
            .count(count)
            .overrides(task_override.build())
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                let missing_cluster = e
                    .as_service_error()
                    .map(|se| se.is_cluster_not_found_exception())
                    .unwrap_or(false);
                if missing_cluster {
                    return Err(Error::ClusterNotFound(cluster.to_string()));
                }
                return Err(sdk_error("ecs", e));
            }
        };

        Ok(RunTaskOutput {
            task_arns: output
                .tasks()
                .iter()
                .filter_map(|task| task.task_arn().map(str::to_string))
                .collect(),
            failures: output.failures().iter().map(failure).collect(),
        })
    }

    async fn stop_task(&self, cluster: &str, task_arn: &str, reason: &str) -> Result<()> {
        self.ecs
            .stop_task()
            .cluster(cluster)
            .task(task_arn)
            .reason(reason)
            .send()
            .await
            .map_err(|e| sdk_error("ecs", e))?;
        Ok(())
    }

    async fn describe_tasks(
        &self,
        cluster: &str,
        task_arns: &[String],
    ) -> Result<DescribeTasksOutput> {
        let output = self
            .ecs
            .describe_tasks()
            .cluster(cluster)
            .set_tasks(Some(task_arns.to_vec()))
            .send()
            .await
            .map_err(|e| sdk_error("ecs", e))?;

        let tasks = output
            .tasks()
            .iter()
            .map(|task| TaskDescription {
                task_arn: task.task_arn().unwrap_or_default().to_string(),
                last_status: task.last_status().unwrap_or_default().to_string(),
                stopped_reason: task.stopped_reason().map(str::to_string),
                containers: task
                    .containers()
                    .iter()
                    .map(|c| ContainerState {
                        name: c.name().unwrap_or_default().to_string(),
                        exit_code: c.exit_code(),
                        reason: c.reason().map(str::to_string),
                    })
                    .collect(),
            })
            .collect();

        Ok(DescribeTasksOutput {
            tasks,
            failures: output.failures().iter().map(failure).collect(),
        })
    }
}

#[async_trait]
impl LogStorageApi for AwsClients {
    async fn describe_log_groups(&self, prefix: &str) -> Result<Vec<String>> {
        let output = self
            .logs
            .describe_log_groups()
            .log_group_name_prefix(prefix)
            .send()
            .await
            .map_err(|e| sdk_error("logs", e))?;

        Ok(output
            .log_groups()
            .iter()
            .filter_map(|group| group.log_group_name().map(str::to_string))
            .collect())
    }

    async fn create_log_group(&self, name: &str) -> Result<()> {
        self.logs
            .create_log_group()
            .log_group_name(name)
            .send()
            .await
            .map_err(|e| sdk_error("logs", e))?;
        Ok(())
    }

    async fn describe_log_streams(&self, group: &str, prefix: &str) -> Result<Vec<String>> {
        let output = self
            .logs
            .describe_log_streams()
            .log_group_name(group)
            .log_stream_name_prefix(prefix)
            .send()
            .await
            .map_err(|e| sdk_error("logs", e))?;

        Ok(output
            .log_streams()
            .iter()
            .filter_map(|stream| stream.log_stream_name().map(str::to_string))
            .collect())
    }

    async fn get_log_events(
        &self,
        group: &str,
        stream: &str,
        start_time: i64,
    ) -> Result<Vec<LogEvent>> {
        let output = self
            .logs
            .get_log_events()
            .log_group_name(group)
            .log_stream_name(stream)
            .start_time(start_time)
            .start_from_head(true)
            .send()
            .await
            .map_err(|e| sdk_error("logs", e))?;

        Ok(output
            .events()
            .iter()
            .map(|event| {
                LogEvent::new(
                    event.message().unwrap_or_default(),
                    event.timestamp().unwrap_or_default(),
                )
            })
            .collect())
    }
}
