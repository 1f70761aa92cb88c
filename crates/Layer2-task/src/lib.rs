//! # ecs-task
//!
//! Launch an ad-hoc command in a container on ECS, poll it until it stops,
//! read its exit status and fetch its CloudWatch log output.
//!
//! ## Features
//!
//! - Task definition reuse (looked up by family, registered when missing)
//! - Log group provisioning with a bounded visibility wait
//! - Exit status and log retrieval for the launched task
//! - Remote services behind traits (`OrchestrationApi`, `LogStorageApi`)
//! - AWS SDK implementation behind the `aws` feature

pub mod api;
#[cfg(feature = "aws")]
pub mod aws;
pub mod naming;
pub mod retry;
pub mod runner;
pub mod state;
pub mod task;

// Remote capabilities
pub use api::{
    ContainerDefinition, ContainerOverride, ContainerState, DescribeTasksOutput, Failure,
    LogConfiguration, LogEvent, LogStorageApi, NetworkMode, OrchestrationApi, RemoteClients,
    RunTaskOutput, TaskDefinitionSpec, TaskDescription,
};

// Runner
pub use naming::ConsoleLinks;
pub use retry::{poll_until, RetryPolicy, Sleeper, TokioSleeper};
pub use runner::{TaskRunner, BENIGN_STOP_REASON, STOP_REASON};
pub use state::TaskStatus;
pub use task::{ExitStatus, MISSING_EXIT_CODE};

#[cfg(feature = "aws")]
pub use aws::AwsClients;

// Foundation re-exports used in every runner setup
pub use ecs_task_foundation::{Credentials, EnvVar, Error, LogGroupWait, Result, RunnerConfig};
