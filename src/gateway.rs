//! The seam between the pipeline and the remote orchestration service. The
//! steps only talk to [EcsGateway], so tests can script remote state.

use std::sync::Arc;

use async_trait::async_trait;
use stacked_errors::{Error, Result, StackableErr};

use crate::{wait_for, ExecError, Interrupt, WaitOptions};

/// Name of the managed agent that interactive sessions attach through
pub const EXECUTE_COMMAND_AGENT: &str = "ExecuteCommandAgent";

/// The parts of an ECS service description that the pipeline looks at
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceSnapshot {
    /// "ACTIVE", "DRAINING", or "INACTIVE"
    pub status: String,
    pub desired_count: i32,
    pub running_count: i32,
    pub deployment_count: usize,
}

impl ServiceSnapshot {
    /// Stable means a single deployment whose running count has caught up
    /// with the desired count
    pub fn is_stable(&self) -> bool {
        (self.deployment_count == 1) && (self.running_count == self.desired_count)
    }

    /// A draining or inactive service will never become stable
    pub fn is_inactive(&self) -> bool {
        matches!(self.status.as_str(), "DRAINING" | "INACTIVE")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagedAgent {
    pub name: String,
    pub last_status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerDetail {
    pub name: String,
    pub managed_agents: Vec<ManagedAgent>,
}

/// The parts of an ECS task description that the pipeline looks at
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDetail {
    pub last_status: String,
    pub containers: Vec<ContainerDetail>,
}

impl TaskDetail {
    pub fn is_stopped(&self) -> bool {
        self.last_status == "STOPPED"
    }

    /// Returns the container named `container`, or the first container if
    /// there is no container with that name
    pub fn container(&self, container: &str) -> Option<&ContainerDetail> {
        self.containers
            .iter()
            .find(|c| c.name == container)
            .or_else(|| self.containers.first())
    }

    /// Returns if the execute command agent of `container` reports "RUNNING".
    /// Missing containers or agents count as not running yet.
    pub fn exec_agent_running(&self, container: &str) -> bool {
        self.container(container)
            .and_then(|c| {
                c.managed_agents
                    .iter()
                    .find(|agent| agent.name == EXECUTE_COMMAND_AGENT)
                    .or_else(|| c.managed_agents.first())
            })
            .is_some_and(|agent| agent.last_status == "RUNNING")
    }
}

/// Everything the delegated interactive tool needs to open a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    pub cluster: String,
    pub task: String,
    pub container: String,
    pub command: String,
}

/// How an interactive session ended without failing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The remote command exited successfully
    Completed,
    /// The user interrupted the session, which is not an error
    Interrupted,
}

/// Façade over the remote orchestration API and the delegated interactive
/// tool. The `wait_until_*` functions are bounded poll loops built on the
/// single-shot describe calls.
#[async_trait]
pub trait EcsGateway: Send + Sync {
    async fn describe_service(&self, cluster: &str, service: &str) -> Result<ServiceSnapshot>;

    async fn update_desired_count(
        &self,
        cluster: &str,
        service: &str,
        desired_count: i32,
    ) -> Result<ServiceSnapshot>;

    /// Fails with [ExecError::NoTasks] if the service has no tasks
    async fn list_tasks(&self, cluster: &str, service: &str) -> Result<Vec<String>>;

    async fn describe_task(&self, cluster: &str, task: &str) -> Result<TaskDetail>;

    /// Runs the interactive session in the foreground, attached to the
    /// terminal of this process
    async fn execute_command(
        &self,
        request: &ExecRequest,
        interrupt: &Interrupt,
    ) -> Result<SessionEnd>;

    async fn wait_until_services_stable(
        &self,
        cluster: &str,
        service: &str,
        options: WaitOptions,
        interrupt: &Interrupt,
    ) -> Result<()> {
        let this = self;
        wait_for(
            &format!("service \"{service}\" to become stable"),
            options,
            interrupt,
            move || async move {
                let snapshot = this.describe_service(cluster, service).await?;
                if snapshot.is_inactive() {
                    return Err(Error::from_err(ExecError::ServiceInactive {
                        service: service.to_owned(),
                        status: snapshot.status,
                    }))
                }
                Ok(snapshot.is_stable())
            },
        )
        .await
    }

    async fn wait_until_tasks_stopped(
        &self,
        cluster: &str,
        task: &str,
        options: WaitOptions,
        interrupt: &Interrupt,
    ) -> Result<()> {
        let this = self;
        wait_for(
            &format!("task \"{task}\" to stop"),
            options,
            interrupt,
            move || async move { Ok(this.describe_task(cluster, task).await?.is_stopped()) },
        )
        .await
    }

    async fn wait_until_agent_running(
        &self,
        cluster: &str,
        task: &str,
        container: &str,
        options: WaitOptions,
        interrupt: &Interrupt,
    ) -> Result<()> {
        let this = self;
        wait_for(
            &format!("the execute command agent of task \"{task}\""),
            options,
            interrupt,
            move || async move {
                Ok(this
                    .describe_task(cluster, task)
                    .await?
                    .exec_agent_running(container))
            },
        )
        .await
        .stack_err_with(|| ExecError::AgentNotRunning.to_string())
    }
}

/// Resolves ambient credentials and verifies them, handing back the
/// authenticated gateway that every later step uses
#[async_trait]
pub trait Connect: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn EcsGateway>>;
}
