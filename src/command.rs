use core::fmt;
use std::{
    ffi::{OsStr, OsString},
    fmt::Debug,
    process::ExitStatus,
};

use stacked_errors::{DisplayStr, Result};

use crate::{command_runner, CommandRunner};

/// An OS Command, this is `tokio::process::Command` wrapped with what is
/// needed to hand the terminal over to a delegated program.
#[derive(Clone, Default)]
pub struct Command {
    /// The program to run.
    pub program: OsString,
    /// All the arguments that will be passed to the program
    pub args: Vec<OsString>,
    /// Environment variable mappings, added to the inherited environment
    pub envs: Vec<(OsString, OsString)>,
}

impl Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!(
            "Command {{ program: {:?},",
            DisplayStr(&self.get_unified_command()),
        ))?;
        if !self.envs.is_empty() {
            f.write_fmt(format_args!(" envs: {:?},", self.envs))?;
        }
        f.write_fmt(format_args!(" }}",))
    }
}

impl Command {
    /// Creates a new `Command` for launching the `program`. No splitting or
    /// other preprocessing is done, use [Command::arg] for the arguments.
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().into(),
            ..Default::default()
        }
    }

    /// Adds an argument
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().into());
        self
    }

    /// Adds arguments to be passed to the program
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|s| s.as_ref().into()));
        self
    }

    /// Adds an environment variable
    pub fn env(mut self, env_key: impl AsRef<OsStr>, env_val: impl AsRef<OsStr>) -> Self {
        self.envs
            .push((env_key.as_ref().into(), env_val.as_ref().into()));
        self
    }

    /// Gets the program and args interspersed with spaces
    pub fn get_unified_command(&self) -> String {
        let mut command = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            command.push(' ');
            command += arg.to_string_lossy().as_ref();
        }
        command
    }

    /// Spawns the command with stdin, stdout, and stderr all inherited from
    /// this process, so that the user interacts with it directly.
    pub fn run_interactive(self) -> Result<CommandRunner> {
        command_runner(self)
    }
}

/// The result of a [Command](crate::Command)
#[must_use]
#[derive(Debug, Clone)]
pub struct CommandResult {
    // the command information is kept around for failures
    pub command: Command,
    /// `None` if the command was terminated before it reported a status
    pub status: Option<ExitStatus>,
}
