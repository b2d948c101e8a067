use core::fmt;
use std::{fmt::Debug, sync::Arc};

use stacked_errors::{Error, Result};

use crate::{gateway::EcsGateway, ExecError, Interrupt};

/// The validated, immutable inputs of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub cluster: String,
    pub service: String,
    pub container: String,
    /// The command line run inside the container
    pub command: String,
}

fn required(name: &'static str, value: Option<String>) -> Result<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::from_err(ExecError::MissingParameter(name))),
    }
}

impl Target {
    /// Fails with [ExecError::MissingParameter] on the first absent or blank
    /// value, in the order `cluster`, `service`, `container`, `command`
    pub fn new(
        cluster: Option<String>,
        service: Option<String>,
        container: Option<String>,
        command: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            cluster: required("--cluster", cluster)?,
            service: required("--service", service)?,
            container: required("--container", container)?,
            command: required("--command", command)?,
        })
    }
}

/// The record every step of one run reads from and writes to. It is owned by
/// whoever calls [Runner::run](crate::Runner::run) and lent mutably to one
/// step at a time.
pub struct ExecContext {
    target: Target,
    interrupt: Interrupt,
    gateway: Option<Arc<dyn EcsGateway>>,
    // write-once
    service_was_running: Option<bool>,
    task_arns: Vec<String>,
}

impl Debug for ExecContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecContext")
            .field("target", &self.target)
            .field("interrupt", &self.interrupt)
            .field("credentials_verified", &self.gateway.is_some())
            .field("service_was_running", &self.service_was_running)
            .field("task_arns", &self.task_arns)
            .finish()
    }
}

impl ExecContext {
    pub fn new(target: Target, interrupt: Interrupt) -> Self {
        Self {
            target,
            interrupt,
            gateway: None,
            service_was_running: None,
            task_arns: vec![],
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    /// Stores the authenticated gateway, replacing any earlier one
    pub fn set_gateway(&mut self, gateway: Arc<dyn EcsGateway>) {
        self.gateway = Some(gateway);
    }

    /// The authenticated gateway, an error if credentials have not been
    /// verified yet
    pub fn gateway(&self) -> Result<Arc<dyn EcsGateway>> {
        self.gateway
            .clone()
            .ok_or_else(|| Error::from_err(ExecError::MissingContextValue("credentials")))
    }

    /// Errors if it has already been set during this run
    pub fn set_service_was_running(&mut self, was_running: bool) -> Result<()> {
        if self.service_was_running.is_some() {
            return Err(Error::from_err(ExecError::AlreadySet("service_was_running")))
        }
        self.service_was_running = Some(was_running);
        Ok(())
    }

    /// `None` until the service state has been observed
    pub fn service_was_running(&self) -> Option<bool> {
        self.service_was_running
    }

    /// Errors if `task_arns` is empty
    pub fn set_task_arns(&mut self, task_arns: Vec<String>) -> Result<()> {
        if task_arns.is_empty() {
            return Err(Error::from_err(ExecError::NoTasks(
                self.target.service.clone(),
            )))
        }
        self.task_arns = task_arns;
        Ok(())
    }

    pub fn task_arns(&self) -> &[String] {
        &self.task_arns
    }

    /// The task every session and wait targets, even if there are more
    pub fn first_task(&self) -> Result<&str> {
        self.task_arns
            .first()
            .map(String::as_str)
            .ok_or_else(|| Error::from_err(ExecError::MissingContextValue("task_arns")))
    }
}
