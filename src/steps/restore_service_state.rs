use std::time::Duration;

use async_trait::async_trait;
use stacked_errors::{Error, Result, StackableErr};
use tracing::{debug, info};

use crate::{steps::Step, ExecContext, ExecError, WaitOptions};

/// Default wait for the originally discovered task to stop
pub const DEFAULT_STOPPED_WAIT: WaitOptions =
    WaitOptions::new(Duration::from_secs(3 * 60), Duration::from_secs(6));

/// Scales the service back to zero if this run was the one that started it
pub struct RestoreServiceState {
    pub stopped_wait: WaitOptions,
}

impl Default for RestoreServiceState {
    fn default() -> Self {
        Self {
            stopped_wait: DEFAULT_STOPPED_WAIT,
        }
    }
}

#[async_trait]
impl Step for RestoreServiceState {
    fn name(&self) -> &'static str {
        "restore service state"
    }

    async fn run(&self, ctx: &mut ExecContext) -> Result<()> {
        match ctx.service_was_running() {
            Some(true) => {
                debug!("the service was already running, leaving it as it is");
                return Ok(())
            }
            Some(false) => (),
            None => {
                return Err(Error::from_err(ExecError::MissingContextValue(
                    "service_was_running",
                )))
            }
        }
        let gateway = ctx.gateway()?;
        let target = ctx.target();
        info!(
            "\"{}\" service was started. it will be stopped now...",
            target.service
        );
        gateway
            .update_desired_count(&target.cluster, &target.service, 0)
            .await
            .stack()?;
        gateway
            .wait_until_tasks_stopped(
                &target.cluster,
                ctx.first_task()?,
                self.stopped_wait,
                ctx.interrupt(),
            )
            .await
            .stack()?;
        info!("\"{}\" service has been stopped.", target.service);
        Ok(())
    }
}
