use core::fmt;
use std::{fmt::Debug, process::Stdio, time::Duration};

use stacked_errors::{bail_locationless, Error, Result, StackableErr};
use tokio::{
    process::{self, Child},
    time::sleep,
};
use tracing::warn;

use crate::{Command, CommandResult};

/// Spawned `Command`s are represented by this struct.
///
/// If a `tracing` subscriber is active, warnings from bad `Drop`s are issued.
#[must_use]
#[derive(Default)]
pub struct CommandRunner {
    // this information is kept around for failures
    /// The command this runner was started with
    command: Option<Command>,
    /// The handle to the `Child` process. The standard streams are inherited,
    /// so there is nothing to take from it.
    pub child_process: Option<Child>,
    result: Option<CommandResult>,
}

impl Debug for CommandRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRunner")
            .field("command", &self.command)
            .field("child_process", &self.child_process)
            .field("result", &self.result)
            .finish()
    }
}

impl Drop for CommandRunner {
    fn drop(&mut self) {
        // we purposely parenthesize in this way to avoid calling `panicking` in the
        // normal case
        if self.child_process.is_some() && (!std::thread::panicking()) {
            warn!(
                "A `CommandRunner` was dropped without being properly finished, the command was: \
                 {}",
                self.command
                    .as_ref()
                    .map(|c| c.get_unified_command())
                    .unwrap_or_default()
            )
        }
    }
}

pub(crate) fn command_runner(this: Command) -> Result<CommandRunner> {
    let child = process::Command::new(&this.program)
        .args(&this.args)
        .envs(this.envs.iter().map(|x| (&x.0, &x.1)))
        .kill_on_drop(true)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .stack_err_with_locationless(|| {
            format!("{this:?}.run_interactive() -> failed to spawn child process")
        })?;
    Ok(CommandRunner {
        command: Some(this),
        child_process: Some(child),
        result: None,
    })
}

/// Note: there are `send_unix_signal` and `send_unix_sigint` functions that
/// are enabled by the "nix_support" feature
impl CommandRunner {
    /// Attempts to force the command to exit, but does not wait for the request
    /// to take effect. This does not set `self.result`.
    pub fn start_terminate(&mut self) -> Result<()> {
        if let Some(child_process) = self.child_process.as_mut() {
            child_process.start_kill().stack_err(
                "CommandRunner::start_terminate -> running `start_kill` on the child process \
                 failed",
            )
        } else {
            Ok(())
        }
    }

    /// Forces the command to exit. Drops the internal handle. Returns an error
    /// if some termination method has already been called.
    ///
    /// `self.result` is set, and `self.result.status` is set to `None`.
    pub async fn terminate(&mut self) -> Result<()> {
        if let Some(child_process) = self.child_process.as_mut() {
            child_process.kill().await.stack_err(
                "CommandRunner::terminate -> running `kill` on the child process failed",
            )?;
            self.child_process = None;
            self.result = Some(CommandResult {
                command: self.command.take().unwrap_or_default(),
                status: None,
            });
            Ok(())
        } else {
            bail_locationless!(
                "CommandRunner::terminate -> a termination method has already been called"
            )
        }
    }

    /// Returns the `pid` of the child process. Returns `None` if the command
    /// has been terminated or the internal `id` call returned `None`.
    pub fn pid(&self) -> Option<u32> {
        self.child_process.as_ref().and_then(|child| child.id())
    }

    /// Sends a Unix `Signal` to the process.
    #[cfg(feature = "nix_support")]
    pub fn send_unix_signal(&self, unix_signal: nix::sys::signal::Signal) -> Result<()> {
        nix::sys::signal::kill(
            nix::unistd::Pid::from_raw(
                i32::try_from(
                    self.pid()
                        .stack_err("CommandRunner::send_unix_signal -> no PID, process exited")?,
                )
                .stack_err("CommandRunner::send_unix_signal -> PID overflow")?,
            ),
            unix_signal,
        )
        .stack_err("CommandRunner::send_unix_signal -> `nix::sys::signal::kill` failed")?;
        Ok(())
    }

    /// Has the same effect as "Ctrl-C" in a terminal. Users should preferably
    /// `wait_with_timeout` afterwards to wait for the process to exit
    /// correctly.
    #[cfg(feature = "nix_support")]
    pub fn send_unix_sigint(&self) -> Result<()> {
        self.send_unix_signal(nix::sys::signal::Signal::SIGINT)
    }

    async fn wait_internal(&mut self) -> Result<()> {
        let mut child = self.child_process.take().stack_err_locationless(
            "`CommandRunner` has already had some termination method called",
        )?;
        let status = child.wait().await.stack_err_locationless(
            "CommandRunner::wait_with_timeout -> failed when waiting on child process",
        )?;
        self.result = Some(CommandResult {
            command: self.command.take().unwrap_or_default(),
            status: Some(status),
        });
        Ok(())
    }

    /// If the command does not complete after `duration`, returns a timeout
    /// error. After `Ok(())` is returned, the `CommandRunner` is finished and
    /// you can call `take_command_result`. Call [Error::is_timeout()] on the
    /// error to see if it was a timeout or another kind of error.
    ///
    /// Note: use `Duration::ZERO` if you want a single attempt
    pub async fn wait_with_timeout(&mut self, duration: Duration) -> Result<()> {
        // backoff control
        let mut interval = Duration::from_millis(1);
        let mut elapsed = Duration::ZERO;
        loop {
            match self
                .child_process
                .as_mut()
                .stack_err_locationless(
                    "CommandRunner::wait_with_timeout -> some termination method has already been \
                     called",
                )?
                .try_wait()
            {
                Ok(o) => {
                    if o.is_some() {
                        break
                    }
                }
                Err(e) => {
                    return Err(Error::from_err_locationless(e)).stack_err_locationless(
                        "CommandRunner::wait_with_timeout failed at `try_wait` before reaching \
                         timeout or completed command",
                    )
                }
            }
            if elapsed > duration {
                return Err(Error::timeout())
            }
            sleep(interval).await;
            elapsed = elapsed.saturating_add(interval);
            if interval < Duration::from_millis(128) {
                interval = interval.saturating_mul(2);
            }
        }
        self.wait_internal().await
    }

    /// After [CommandRunner::wait_with_timeout] is successful, this will take
    /// the `CommandResult` from `self`, replacing it with `None`.
    pub fn take_command_result(&mut self) -> Option<CommandResult> {
        self.result.take()
    }
}
