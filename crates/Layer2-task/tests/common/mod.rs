//! In-memory stand-ins for the orchestration and log services

#![allow(dead_code)]

use async_trait::async_trait;
use ecs_task::{
    ContainerOverride, ContainerState, DescribeTasksOutput, Error, Failure, LogEvent,
    LogStorageApi, OrchestrationApi, RemoteClients, Result, RunTaskOutput, Sleeper,
    TaskDefinitionSpec, TaskDescription,
};
use ecs_task_foundation::MISSING_TASK_DEFINITION_MESSAGE;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
pub struct State {
    pub clusters: HashSet<String>,
    pub definitions: HashMap<String, String>,
    pub registered: Vec<TaskDefinitionSpec>,
    pub runs: Vec<(String, String, Vec<ContainerOverride>)>,
    pub stops: Vec<(String, String, String)>,
    pub tasks: BTreeMap<String, TaskDescription>,
    pub describe_failures: Vec<Failure>,

    pub log_groups: HashSet<String>,
    pub created_log_groups: Vec<String>,
    pub streams: BTreeMap<(String, String), Vec<LogEvent>>,

    // failure injection
    pub definition_error: Option<String>,
    pub cluster_lookup_error: Option<String>,
    pub run_failures: Vec<Failure>,
    pub run_cluster_missing: bool,
    pub hide_tasks: bool,
    pub log_group_never_visible: bool,
    pub log_group_hidden_checks: u32,

    next_task: u32,
}

/// Both remote services backed by one shared state
#[derive(Default)]
pub struct FakeCloud {
    pub state: Mutex<State>,
}

impl FakeCloud {
    pub fn with_cluster(cluster: &str) -> Arc<Self> {
        let cloud = Self::default();
        cloud.state.lock().unwrap().clusters.insert(cluster.to_string());
        Arc::new(cloud)
    }

    pub fn clients(self: &Arc<Self>) -> RemoteClients {
        RemoteClients::new(self.clone(), self.clone())
    }

    pub fn update(&self, f: impl FnOnce(&mut State)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn registered_count(&self) -> usize {
        self.state.lock().unwrap().registered.len()
    }

    pub fn run_count(&self) -> usize {
        self.state.lock().unwrap().runs.len()
    }

    pub fn set_status(&self, arn: &str, status: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(task) = state.tasks.get_mut(arn) {
            task.last_status = status.to_string();
        }
    }

    /// Mark the task stopped with one container result
    pub fn finish(&self, arn: &str, exit_code: Option<i32>, reason: Option<&str>, stopped_reason: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(task) = state.tasks.get_mut(arn) {
            task.last_status = "STOPPED".to_string();
            task.stopped_reason = Some(stopped_reason.to_string());
            if let Some(container) = task.containers.first_mut() {
                container.exit_code = exit_code;
                container.reason = reason.map(str::to_string);
            }
        }
    }

    pub fn push_log(&self, group: &str, stream: &str, message: &str, timestamp: i64) {
        let mut state = self.state.lock().unwrap();
        state
            .streams
            .entry((group.to_string(), stream.to_string()))
            .or_default()
            .push(LogEvent::new(message, timestamp));
    }
}

#[async_trait]
impl OrchestrationApi for FakeCloud {
    async fn describe_task_definition(&self, family: &str) -> Result<String> {
        let state = self.state.lock().unwrap();
        if let Some(message) = &state.definition_error {
            return Err(Error::api("ecs", "AccessDeniedException", message.clone()));
        }
        state
            .definitions
            .get(family)
            .cloned()
            .ok_or_else(|| Error::api("ecs", "ClientException", MISSING_TASK_DEFINITION_MESSAGE))
    }

    async fn cluster_exists(&self, cluster: &str) -> Result<bool> {
        let state = self.state.lock().unwrap();
        if let Some(message) = &state.cluster_lookup_error {
            return Err(Error::api("ecs", "AccessDeniedException", message.clone()));
        }
        Ok(state.clusters.contains(cluster))
    }

    async fn register_task_definition(&self, spec: &TaskDefinitionSpec) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.registered.push(spec.clone());
        let arn = format!(
            "arn:aws:ecs:ap-northeast-1:123456789012:task-definition/{}:{}",
            spec.family,
            state.registered.len()
        );
        state.definitions.insert(spec.family.clone(), arn.clone());
        Ok(arn)
    }

    async fn run_task(
        &self,
        cluster: &str,
        task_definition: &str,
        count: i32,
        overrides: &[ContainerOverride],
    ) -> Result<RunTaskOutput> {
        let mut state = self.state.lock().unwrap();
        if state.run_cluster_missing || !state.clusters.contains(cluster) {
            return Err(Error::ClusterNotFound(cluster.to_string()));
        }
        state
            .runs
            .push((cluster.to_string(), task_definition.to_string(), overrides.to_vec()));

        if !state.run_failures.is_empty() {
            return Ok(RunTaskOutput {
                task_arns: vec![],
                failures: state.run_failures.clone(),
            });
        }

        let mut task_arns = Vec::new();
        for _ in 0..count {
            state.next_task += 1;
            let arn = format!(
                "arn:aws:ecs:ap-northeast-1:123456789012:task/{}/{:032x}",
                cluster, state.next_task
            );
            let container = ContainerState {
                name: overrides.first().map(|o| o.name.clone()).unwrap_or_default(),
                exit_code: None,
                reason: None,
            };
            state.tasks.insert(
                arn.clone(),
                TaskDescription {
                    task_arn: arn.clone(),
                    last_status: "PROVISIONING".to_string(),
                    stopped_reason: None,
                    containers: vec![container],
                },
            );
            task_arns.push(arn);
        }
        Ok(RunTaskOutput {
            task_arns,
            failures: vec![],
        })
    }

    async fn stop_task(&self, cluster: &str, task_arn: &str, reason: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .stops
            .push((cluster.to_string(), task_arn.to_string(), reason.to_string()));
        if let Some(task) = state.tasks.get_mut(task_arn) {
            task.last_status = "STOPPING".to_string();
        }
        Ok(())
    }

    async fn describe_tasks(
        &self,
        _cluster: &str,
        task_arns: &[String],
    ) -> Result<DescribeTasksOutput> {
        let state = self.state.lock().unwrap();
        let tasks = if state.hide_tasks {
            vec![]
        } else {
            task_arns
                .iter()
                .filter_map(|arn| state.tasks.get(arn).cloned())
                .collect()
        };
        Ok(DescribeTasksOutput {
            tasks,
            failures: state.describe_failures.clone(),
        })
    }
}

#[async_trait]
impl LogStorageApi for FakeCloud {
    async fn describe_log_groups(&self, prefix: &str) -> Result<Vec<String>> {
        let mut state = self.state.lock().unwrap();
        if state.log_group_hidden_checks > 0 && state.log_groups.iter().any(|g| g.starts_with(prefix)) {
            state.log_group_hidden_checks -= 1;
            return Ok(vec![]);
        }
        Ok(state
            .log_groups
            .iter()
            .filter(|g| g.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn create_log_group(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.created_log_groups.push(name.to_string());
        if !state.log_group_never_visible {
            state.log_groups.insert(name.to_string());
        }
        Ok(())
    }

    async fn describe_log_streams(&self, group: &str, prefix: &str) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .streams
            .keys()
            .filter(|(g, s)| g == group && s.starts_with(prefix))
            .map(|(_, s)| s.clone())
            .collect())
    }

    async fn get_log_events(
        &self,
        group: &str,
        stream: &str,
        start_time: i64,
    ) -> Result<Vec<LogEvent>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .streams
            .get(&(group.to_string(), stream.to_string()))
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.timestamp >= start_time)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Counts sleeps instead of sleeping
#[derive(Default)]
pub struct RecordingSleeper {
    pub calls: AtomicU32,
}

impl RecordingSleeper {
    pub fn count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, _duration: Duration) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}
