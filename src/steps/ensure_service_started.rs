use std::time::Duration;

use async_trait::async_trait;
use stacked_errors::{Result, StackableErr};
use tracing::info;

use crate::{steps::Step, ExecContext, WaitOptions};

/// Default wait for the service to report stable after scaling it up
pub const DEFAULT_STABLE_WAIT: WaitOptions =
    WaitOptions::new(Duration::from_secs(3 * 60), Duration::from_secs(6));
/// Default wait for the execute command agent of a fresh task
pub const DEFAULT_AGENT_WAIT: WaitOptions =
    WaitOptions::new(Duration::from_secs(60), Duration::from_secs(1));

/// Scales a stopped service to one task and waits until it can be exec'd
/// into. A service that is already running is left alone. Either way the task
/// ARNs of the service are recorded.
pub struct EnsureServiceStarted {
    pub stable_wait: WaitOptions,
    pub agent_wait: WaitOptions,
}

impl Default for EnsureServiceStarted {
    fn default() -> Self {
        Self {
            stable_wait: DEFAULT_STABLE_WAIT,
            agent_wait: DEFAULT_AGENT_WAIT,
        }
    }
}

#[async_trait]
impl Step for EnsureServiceStarted {
    fn name(&self) -> &'static str {
        "ensure service started"
    }

    async fn run(&self, ctx: &mut ExecContext) -> Result<()> {
        let gateway = ctx.gateway()?;
        let target = ctx.target().clone();
        let service = gateway
            .describe_service(&target.cluster, &target.service)
            .await
            .stack()?;

        let started_here = service.running_count == 0;
        ctx.set_service_was_running(!started_here)?;
        if started_here {
            info!(
                "\"{}\" service was stopped. it will be started now...",
                target.service
            );
            gateway
                .update_desired_count(&target.cluster, &target.service, 1)
                .await
                .stack()?;
            gateway
                .wait_until_services_stable(
                    &target.cluster,
                    &target.service,
                    self.stable_wait,
                    ctx.interrupt(),
                )
                .await
                .stack()?;
            info!("\"{}\" service has been started.", target.service);
        } else {
            info!(
                "\"{}\" service was already started (running count = {}).",
                target.service, service.running_count
            );
        }

        let task_arns = gateway
            .list_tasks(&target.cluster, &target.service)
            .await
            .stack()?;
        ctx.set_task_arns(task_arns)?;

        if started_here {
            info!("waiting for the execute command agent to be running...");
            gateway
                .wait_until_agent_running(
                    &target.cluster,
                    ctx.first_task()?,
                    &target.container,
                    self.agent_wait,
                    ctx.interrupt(),
                )
                .await
                .stack()?;
            info!("the execute command agent is running");
        }
        Ok(())
    }
}
