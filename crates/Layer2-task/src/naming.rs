//! Naming conventions shared with already-deployed task definitions and
//! log groups. Changing any of these strings orphans existing state.

use lazy_static::lazy_static;
use regex::Regex;

/// Prefix of every task definition family and container name
pub const TASK_NAME_PREFIX: &str = "rundeck-ecs-task-plugin";

/// Namespace of the default log group path
pub const LOG_GROUP_NAMESPACE: &str = "/rundeck/ecs";

/// `awslogs-stream-prefix` of the container log configuration
pub const LOG_STREAM_PREFIX: &str = "ecs-task";

lazy_static! {
    static ref IMAGE_DISALLOWED: Regex = Regex::new(r"[^a-zA-Z0-9_-]").unwrap();
    static ref COMMAND_DISALLOWED: Regex = Regex::new(r"[^a-zA-Z0-9_/.-]").unwrap();
}

/// Replace every character outside `[A-Za-z0-9_-]` with `_`
pub fn sanitize_image(image: &str) -> String {
    IMAGE_DISALLOWED.replace_all(image, "_").into_owned()
}

/// Like [`sanitize_image`] but keeps `/` and `.`
pub fn sanitize_command(command: &str) -> String {
    COMMAND_DISALLOWED.replace_all(command, "_").into_owned()
}

/// `rundeck-ecs-task-plugin-<name or sanitized image>`
pub fn task_name(name: Option<&str>, image: &str) -> String {
    match name {
        Some(name) => format!("{}-{}", TASK_NAME_PREFIX, name),
        None => format!("{}-{}", TASK_NAME_PREFIX, sanitize_image(image)),
    }
}

/// `/rundeck/ecs/<cluster>/<sanitized image>/tasks`
pub fn default_log_group(cluster: &str, image: &str) -> String {
    format!(
        "{}/{}/{}/tasks",
        LOG_GROUP_NAMESPACE,
        cluster,
        sanitize_image(image)
    )
}

/// Text after the last `/` of a task identifier (the whole string if none)
pub fn short_task_id(task_arn: &str) -> &str {
    task_arn.rsplit('/').next().unwrap_or(task_arn)
}

/// `ecs-task/<task name>/<short task id>`, the stream awslogs writes for
/// the task's container
pub fn log_stream_name(task_name: &str, task_arn: &str) -> String {
    format!(
        "{}/{}/{}",
        LOG_STREAM_PREFIX,
        task_name,
        short_task_id(task_arn)
    )
}

/// Console deep links for a launched task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLinks {
    pub task_details: String,
    pub task_logs: String,
}

impl ConsoleLinks {
    pub fn new(region: &str, cluster: &str, task_arn: &str, group: &str, stream: &str) -> Self {
        Self {
            task_details: format!(
                "https://{region}.console.aws.amazon.com/ecs/home?region={region}#/clusters/{cluster}/tasks/{task}/details",
                region = region,
                cluster = cluster,
                task = short_task_id(task_arn),
            ),
            task_logs: format!(
                "https://{region}.console.aws.amazon.com/cloudwatch/home?region={region}#logEventViewer:group={group};stream={stream}",
                region = region,
                group = group,
                stream = stream,
            ),
        }
    }
}
