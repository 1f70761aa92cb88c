//! Outcome of a finished task

use crate::api::{DescribeTasksOutput, Failure, TaskDescription};
use serde::{Deserialize, Serialize};

/// Exit code reported when the container never produced one
pub const MISSING_EXIT_CODE: i32 = 255;

/// Exit status of the task's container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitStatus {
    pub exit_code: i32,

    /// Container reason without trailing newlines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Failures reported by the describe call, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failures: Option<Vec<Failure>>,
}

impl ExitStatus {
    /// Build from the first container of a stopped task.
    ///
    /// `None` when the task has no containers.
    pub fn from_description(task: &TaskDescription, describe: &DescribeTasksOutput) -> Option<Self> {
        let container = task.containers.first()?;
        Some(Self {
            exit_code: container.exit_code.unwrap_or(MISSING_EXIT_CODE),
            reason: container
                .reason
                .as_deref()
                .map(|reason| reason.trim_end_matches('\n').to_string()),
            failures: if describe.failures.is_empty() {
                None
            } else {
                Some(describe.failures.clone())
            },
        })
    }
}
