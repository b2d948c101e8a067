#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use ecs_exec::{
    cli::{Args, Timeouts},
    gateway::{
        Connect, ContainerDetail, EcsGateway, ExecRequest, ManagedAgent, ServiceSnapshot,
        SessionEnd, TaskDetail, EXECUTE_COMMAND_AGENT,
    },
    stacked_errors::{Error, Result},
    ExecError, Interrupt, WaitOptions,
};

pub const CLUSTER: &str = "main";
pub const SERVICE: &str = "web";
pub const CONTAINER: &str = "app";
pub const COMMAND: &str = "bundle exec rails c";

/// Waits short enough that a run that times out everywhere still finishes
/// quickly
pub const FAST: Timeouts = Timeouts {
    stable: WaitOptions::new(Duration::from_millis(100), Duration::from_millis(5)),
    agent: WaitOptions::new(Duration::from_millis(100), Duration::from_millis(5)),
    stopped: WaitOptions::new(Duration::from_millis(100), Duration::from_millis(5)),
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    DescribeService,
    Update(i32),
    ListTasks,
    DescribeTask(String),
    Exec(ExecRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Session {
    Completes,
    /// Fires the interrupt while the session runs, like a Ctrl-C would
    Interrupted,
    /// Like `Interrupted`, with a second Ctrl-C landing as the session exits
    InterruptedTwice,
    Fails,
}

#[derive(Debug)]
pub struct Remote {
    pub desired_count: i32,
    pub running_count: i32,
    pub task_arns: Vec<String>,
    /// Scaling up never makes tasks run
    pub never_stable: bool,
    /// Scaling down never stops the tasks
    pub never_stopped: bool,
    /// Status of the execute command agent of a running task
    pub agent_status: String,
    pub session: Session,
}

impl Default for Remote {
    fn default() -> Self {
        Self {
            desired_count: 0,
            running_count: 0,
            task_arns: vec![
                "arn:aws:ecs:us-east-1:123456789012:task/main/first".to_owned(),
                "arn:aws:ecs:us-east-1:123456789012:task/main/second".to_owned(),
            ],
            never_stable: false,
            never_stopped: false,
            agent_status: "RUNNING".to_owned(),
            session: Session::Completes,
        }
    }
}

/// A scripted stand-in for ECS that records every call made to it
#[derive(Debug, Default)]
pub struct FakeGateway {
    pub remote: Mutex<Remote>,
    pub calls: Mutex<Vec<Call>>,
}

impl FakeGateway {
    pub fn new(remote: Remote) -> Arc<Self> {
        Arc::new(Self {
            remote: Mutex::new(remote),
            calls: Mutex::new(vec![]),
        })
    }

    /// A service scaled to zero
    pub fn stopped() -> Arc<Self> {
        Self::new(Remote::default())
    }

    /// A service with `running_count` running tasks
    pub fn running(running_count: i32) -> Arc<Self> {
        Self::new(Remote {
            desired_count: running_count,
            running_count,
            ..Default::default()
        })
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<i32> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Update(count) => Some(count),
                _ => None,
            })
            .collect()
    }

    pub fn execs(&self) -> Vec<ExecRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Exec(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn first_task(&self) -> String {
        self.remote.lock().unwrap().task_arns[0].clone()
    }
}

#[async_trait]
impl EcsGateway for FakeGateway {
    async fn describe_service(&self, cluster: &str, service: &str) -> Result<ServiceSnapshot> {
        self.record(Call::DescribeService);
        if (cluster != CLUSTER) || (service != SERVICE) {
            return Err(Error::from_err(ExecError::ServiceNotFound {
                cluster: cluster.to_owned(),
                service: service.to_owned(),
                failures: vec!["MISSING".to_owned()],
            }))
        }
        let remote = self.remote.lock().unwrap();
        Ok(ServiceSnapshot {
            status: "ACTIVE".to_owned(),
            desired_count: remote.desired_count,
            running_count: remote.running_count,
            deployment_count: 1,
        })
    }

    async fn update_desired_count(
        &self,
        _cluster: &str,
        _service: &str,
        desired_count: i32,
    ) -> Result<ServiceSnapshot> {
        self.record(Call::Update(desired_count));
        let mut remote = self.remote.lock().unwrap();
        remote.desired_count = desired_count;
        let settles = if desired_count > 0 {
            !remote.never_stable
        } else {
            !remote.never_stopped
        };
        if settles {
            remote.running_count = desired_count;
        }
        Ok(ServiceSnapshot {
            status: "ACTIVE".to_owned(),
            desired_count,
            running_count: remote.running_count,
            deployment_count: 1,
        })
    }

    async fn list_tasks(&self, _cluster: &str, service: &str) -> Result<Vec<String>> {
        self.record(Call::ListTasks);
        let remote = self.remote.lock().unwrap();
        if remote.running_count == 0 {
            return Err(Error::from_err(ExecError::NoTasks(service.to_owned())))
        }
        Ok(remote.task_arns.clone())
    }

    async fn describe_task(&self, _cluster: &str, task: &str) -> Result<TaskDetail> {
        self.record(Call::DescribeTask(task.to_owned()));
        let remote = self.remote.lock().unwrap();
        if !remote.task_arns.iter().any(|arn| arn == task) {
            return Err(Error::from_err(ExecError::TaskNotFound(task.to_owned())))
        }
        let running = remote.running_count > 0;
        Ok(TaskDetail {
            last_status: if running { "RUNNING" } else { "STOPPED" }.to_owned(),
            containers: vec![ContainerDetail {
                name: CONTAINER.to_owned(),
                managed_agents: vec![ManagedAgent {
                    name: EXECUTE_COMMAND_AGENT.to_owned(),
                    last_status: if running {
                        remote.agent_status.clone()
                    } else {
                        "STOPPED".to_owned()
                    },
                }],
            }],
        })
    }

    async fn execute_command(
        &self,
        request: &ExecRequest,
        interrupt: &Interrupt,
    ) -> Result<SessionEnd> {
        self.record(Call::Exec(request.clone()));
        let session = self.remote.lock().unwrap().session;
        match session {
            Session::Completes => Ok(SessionEnd::Completed),
            Session::Interrupted => {
                interrupt.trigger();
                // a session consumes the interrupt it forwards
                assert!(interrupt.issued_reset());
                Ok(SessionEnd::Interrupted)
            }
            Session::InterruptedTwice => {
                interrupt.trigger();
                assert!(interrupt.issued_reset());
                interrupt.trigger();
                Ok(SessionEnd::Interrupted)
            }
            Session::Fails => Err(Error::from_err(ExecError::SessionTerminated)),
        }
    }
}

/// Hands out the fake gateway, or rejects the credentials
#[derive(Debug)]
pub struct FakeConnector {
    pub gateway: Arc<FakeGateway>,
    pub reject: bool,
    pub connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new(gateway: &Arc<FakeGateway>) -> Arc<Self> {
        Arc::new(Self {
            gateway: Arc::clone(gateway),
            reject: false,
            connects: AtomicUsize::new(0),
        })
    }

    pub fn rejecting(gateway: &Arc<FakeGateway>) -> Arc<Self> {
        Arc::new(Self {
            gateway: Arc::clone(gateway),
            reject: true,
            connects: AtomicUsize::new(0),
        })
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connect for FakeConnector {
    async fn connect(&self) -> Result<Arc<dyn EcsGateway>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.reject {
            return Err(Error::from_err(ExecError::IdentityRejected(
                "ExpiredToken".to_owned(),
            )))
        }
        let gateway: Arc<dyn EcsGateway> = self.gateway.clone();
        Ok(gateway)
    }
}

/// Parses a command line the way the binary would
pub fn args(extra: &[&str]) -> Args {
    use clap::Parser;

    let mut argv = vec!["ecs_exec"];
    argv.extend_from_slice(extra);
    Args::try_parse_from(argv).unwrap()
}

/// Every mandatory argument
pub fn full_args() -> Args {
    args(&[
        "--cluster",
        CLUSTER,
        "--service",
        SERVICE,
        "--container",
        CONTAINER,
        "--command",
        COMMAND,
    ])
}
