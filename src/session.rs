//! The foreground interactive session. The delegated program owns the terminal
//! until it exits, interrupts are forwarded to it instead of killing it.

use std::time::Duration;

use stacked_errors::{Error, Result, StackableErr};
use tokio::{select, time::sleep};
use tracing::{info, warn};

use crate::{gateway::SessionEnd, Command, CommandRunner, ExecError, Interrupt};

const STD_DELAY: Duration = Duration::from_millis(300);

fn forward_interrupt(runner: &mut CommandRunner) {
    #[cfg(feature = "nix_support")]
    let res = runner.send_unix_sigint();
    #[cfg(not(feature = "nix_support"))]
    let res = runner.start_terminate();
    // the process may have exited in the meantime
    if let Err(e) = res {
        warn!("could not forward the interrupt to the session: {e}");
    }
}

/// Runs `command` with the standard streams of this process and waits for it.
///
/// Every interrupt issued while the session runs is consumed and forwarded to
/// the child. Once that has happened, however the child ends counts as
/// [SessionEnd::Interrupted]. Otherwise an unsuccessful exit status is an
/// [ExecError::SessionFailed].
pub async fn run_session(command: Command, interrupt: &Interrupt) -> Result<SessionEnd> {
    info!("running `{}`", command.get_unified_command());
    let mut runner = command.run_interactive().stack()?;
    let mut interrupted = false;
    loop {
        if interrupt.issued_reset() {
            interrupted = true;
            forward_interrupt(&mut runner);
        }
        match runner.wait_with_timeout(Duration::ZERO).await {
            Ok(()) => break,
            Err(e) => {
                if !e.is_timeout() {
                    if runner.child_process.is_some() {
                        runner.terminate().await.stack()?;
                    }
                    return Err(e)
                }
            }
        }
        select! {
            _ = sleep(STD_DELAY) => (),
            _ = interrupt.notified() => (),
        }
    }
    let comres = runner
        .take_command_result()
        .stack_err("run_session -> no command result after waiting")?;
    if interrupted {
        info!("the session was interrupted");
        return Ok(SessionEnd::Interrupted)
    }
    match comres.status {
        Some(status) if status.success() => Ok(SessionEnd::Completed),
        Some(status) => Err(Error::from_err(ExecError::SessionFailed(status))),
        None => Err(Error::from_err(ExecError::SessionTerminated)),
    }
}
