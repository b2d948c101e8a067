use std::{sync::Arc, time::Duration};

use clap::Parser;
use stacked_errors::{Result, StackableErr};

use crate::{
    aws::AwsConnector,
    gateway::Connect,
    steps::{
        CheckCredentials, EnsureServiceStarted, RestoreServiceState, RunInteractiveCommand,
        DEFAULT_AGENT_WAIT, DEFAULT_STABLE_WAIT, DEFAULT_STOPPED_WAIT,
    },
    ExecContext, Interrupt, Runner, Target, WaitOptions,
};

/// Starts an ECS service if it is scaled to zero, runs a command interactively
/// in one of its tasks with ECS Exec, and stops the service again if it was
/// started by this invocation.
#[derive(Parser, Debug, Clone)]
#[command(about, version)]
pub struct Args {
    /// AWS profile
    #[arg(long, env = "AWS_PROFILE")]
    pub profile: Option<String>,
    /// AWS region, the profile or environment default is used otherwise
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,
    /// ECS cluster name
    #[arg(long)]
    pub cluster: Option<String>,
    /// ECS service name
    #[arg(long)]
    pub service: Option<String>,
    /// Container name
    #[arg(long)]
    pub container: Option<String>,
    /// Command line to run in the container
    #[arg(long)]
    pub command: Option<String>,
    /// The AWS CLI used for the interactive session
    #[arg(long, env = "ECS_EXEC_AWS_CLI", default_value = "aws")]
    pub aws_cli: String,
    /// Seconds to wait for the service to become stable after starting it
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_STABLE_WAIT.timeout.as_secs())]
    pub stable_timeout: u64,
    /// Seconds to wait for the execute command agent of a fresh task
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_AGENT_WAIT.timeout.as_secs())]
    pub agent_timeout: u64,
    /// Milliseconds between checks of the execute command agent
    #[arg(
        long,
        value_name = "MILLIS",
        value_parser = clap::value_parser!(u64).range(1..),
        default_value_t = DEFAULT_AGENT_WAIT.interval.as_millis() as u64
    )]
    pub agent_poll_interval: u64,
    /// Seconds to wait for the task to stop after stopping the service
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_STOPPED_WAIT.timeout.as_secs())]
    pub stopped_timeout: u64,
}

/// The bounded waits of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub stable: WaitOptions,
    pub agent: WaitOptions,
    pub stopped: WaitOptions,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            stable: DEFAULT_STABLE_WAIT,
            agent: DEFAULT_AGENT_WAIT,
            stopped: DEFAULT_STOPPED_WAIT,
        }
    }
}

impl Args {
    /// Validates the mandatory arguments
    pub fn target(&self) -> Result<Target> {
        Target::new(
            self.cluster.clone(),
            self.service.clone(),
            self.container.clone(),
            self.command.clone(),
        )
    }

    pub fn timeouts(&self) -> Timeouts {
        let defaults = Timeouts::default();
        Timeouts {
            stable: WaitOptions::new(
                Duration::from_secs(self.stable_timeout),
                defaults.stable.interval,
            ),
            agent: WaitOptions::new(
                Duration::from_secs(self.agent_timeout),
                Duration::from_millis(self.agent_poll_interval),
            ),
            stopped: WaitOptions::new(
                Duration::from_secs(self.stopped_timeout),
                defaults.stopped.interval,
            ),
        }
    }

    pub fn connector(&self) -> AwsConnector {
        AwsConnector::new(self.profile.clone(), self.region.clone(), &self.aws_cli)
    }
}

/// The fixed pipeline: check credentials, ensure the service is started, run
/// the interactive command, restore the service
pub fn pipeline(connector: Arc<dyn Connect>, timeouts: Timeouts) -> Runner {
    Runner::new(vec![
        Box::new(CheckCredentials::new(connector)),
        Box::new(EnsureServiceStarted {
            stable_wait: timeouts.stable,
            agent_wait: timeouts.agent,
        }),
        Box::new(RunInteractiveCommand),
        Box::new(RestoreServiceState {
            stopped_wait: timeouts.stopped,
        }),
    ])
}

/// Validates `args` and runs the pipeline with `connector`. Nothing is
/// connected to if validation fails.
pub async fn run_with(args: &Args, connector: Arc<dyn Connect>, interrupt: Interrupt) -> Result<()> {
    let target = args.target().stack_err("invalid arguments")?;
    let mut ctx = ExecContext::new(target, interrupt);
    pipeline(connector, args.timeouts()).run(&mut ctx).await
}

/// Runs the pipeline against AWS, with Ctrl-C handled by the [Interrupt]
/// policy
pub async fn run(args: Args) -> Result<()> {
    // validate before taking over Ctrl-C
    args.target().stack_err("invalid arguments")?;
    let interrupt = Interrupt::new();
    let ctrlc = interrupt.listen_for_ctrlc();
    let res = run_with(&args, Arc::new(args.connector()), interrupt).await;
    ctrlc.abort();
    res
}

/// The process exit status for the outcome of [run]
pub fn exit_status(res: &Result<()>) -> u8 {
    match res {
        Ok(()) => 0,
        Err(_) => 1,
    }
}
