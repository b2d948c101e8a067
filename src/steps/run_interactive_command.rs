use async_trait::async_trait;
use stacked_errors::{Result, StackableErr};
use tracing::{debug, info};

use crate::{
    gateway::{ExecRequest, SessionEnd},
    steps::Step,
    ExecContext,
};

/// Opens the interactive session on the first recorded task. An interrupted
/// session is a success, and interrupts still pending when it ends are
/// dropped.
pub struct RunInteractiveCommand;

#[async_trait]
impl Step for RunInteractiveCommand {
    fn name(&self) -> &'static str {
        "run interactive command"
    }

    async fn run(&self, ctx: &mut ExecContext) -> Result<()> {
        let gateway = ctx.gateway()?;
        let target = ctx.target();
        let request = ExecRequest {
            cluster: target.cluster.clone(),
            task: ctx.first_task()?.to_owned(),
            container: target.container.clone(),
            command: target.command.clone(),
        };
        match gateway
            .execute_command(&request, ctx.interrupt())
            .await
            .stack()?
        {
            SessionEnd::Completed => info!("the session has ended"),
            SessionEnd::Interrupted => {
                info!("the session was ended by an interrupt");
                // repeated Ctrl-C belongs to the session that just ended
                if ctx.interrupt().issued_reset() {
                    debug!("dropped an interrupt issued while the session was exiting");
                }
            }
        }
        Ok(())
    }
}
