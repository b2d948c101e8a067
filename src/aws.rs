//! Production [Connect] and [EcsGateway] backed by the AWS SDK, with the
//! `aws ecs execute-command` CLI as the delegated interactive tool.

use std::{ffi::OsString, sync::Arc};

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_ecs::{error::DisplayErrorContext, types::Service};
use stacked_errors::{Error, Result, StackableErr};
use tracing::{debug, info};

use crate::{
    gateway::{
        Connect, ContainerDetail, EcsGateway, ExecRequest, ManagedAgent, ServiceSnapshot,
        SessionEnd, TaskDetail,
    },
    session::run_session,
    Command, ExecError, Interrupt,
};

/// Loads the ambient AWS configuration (optionally for a named profile and
/// region) and verifies it with STS `GetCallerIdentity`
#[derive(Debug, Clone)]
pub struct AwsConnector {
    pub profile: Option<String>,
    pub region: Option<String>,
    /// Program used for `ecs execute-command`
    pub aws_cli: OsString,
}

impl AwsConnector {
    pub fn new(
        profile: Option<String>,
        region: Option<String>,
        aws_cli: impl Into<OsString>,
    ) -> Self {
        Self {
            profile,
            region,
            aws_cli: aws_cli.into(),
        }
    }

    async fn load_config(&self) -> SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(profile) = &self.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }
        loader.load().await
    }
}

#[async_trait]
impl Connect for AwsConnector {
    async fn connect(&self) -> Result<Arc<dyn EcsGateway>> {
        let config = self.load_config().await;
        resolve_credentials(&config).await?;
        let identity = aws_sdk_sts::Client::new(&config)
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| {
                Error::from_err(ExecError::IdentityRejected(
                    DisplayErrorContext(e).to_string(),
                ))
            })?;
        info!(
            account = identity.account().unwrap_or_default(),
            arn = identity.arn().unwrap_or_default(),
            "AWS credentials verified"
        );
        Ok(Arc::new(AwsEcsGateway {
            client: aws_sdk_ecs::Client::new(&config),
            tool: ExecTool {
                aws_cli: self.aws_cli.clone(),
                profile: self.profile.clone(),
                region: self.region.clone(),
            },
        }))
    }
}

/// Fails with [ExecError::NoCredentials] if the provider chain of `config`
/// cannot produce credentials. Whether they are accepted is up to STS.
async fn resolve_credentials(config: &SdkConfig) -> Result<()> {
    let provider = config.credentials_provider().ok_or_else(|| {
        Error::from_err(ExecError::NoCredentials(
            "no credentials provider is configured".to_owned(),
        ))
    })?;
    provider.provide_credentials().await.map_err(|e| {
        Error::from_err(ExecError::NoCredentials(
            DisplayErrorContext(e).to_string(),
        ))
    })?;
    Ok(())
}

/// [EcsGateway] over an authenticated `aws_sdk_ecs::Client`
#[derive(Debug, Clone)]
pub struct AwsEcsGateway {
    client: aws_sdk_ecs::Client,
    tool: ExecTool,
}

/// How the delegated `aws ecs execute-command` tool gets invoked
#[derive(Debug, Clone)]
pub struct ExecTool {
    pub aws_cli: OsString,
    pub profile: Option<String>,
    pub region: Option<String>,
}

fn sdk_err<E: std::error::Error>(e: E) -> Error {
    Error::from_err(ExecError::Remote(DisplayErrorContext(e).to_string()))
}

fn snapshot(service: &Service) -> ServiceSnapshot {
    ServiceSnapshot {
        status: service.status().unwrap_or_default().to_owned(),
        desired_count: service.desired_count(),
        running_count: service.running_count(),
        deployment_count: service.deployments().len(),
    }
}

impl ExecTool {
    /// The delegated tool invocation for `request`. No shell is involved, the
    /// command line is passed as a single argument.
    pub fn command(&self, request: &ExecRequest) -> Command {
        let mut command = Command::new(&self.aws_cli);
        if let Some(profile) = &self.profile {
            command = command
                .arg("--profile")
                .arg(profile)
                .env("AWS_PROFILE", profile);
        }
        if let Some(region) = &self.region {
            command = command.arg("--region").arg(region);
        }
        command.args([
            "ecs",
            "execute-command",
            "--cluster",
            request.cluster.as_str(),
            "--task",
            request.task.as_str(),
            "--container",
            request.container.as_str(),
            "--interactive",
            "--command",
            request.command.as_str(),
        ])
    }
}

#[async_trait]
impl EcsGateway for AwsEcsGateway {
    async fn describe_service(&self, cluster: &str, service: &str) -> Result<ServiceSnapshot> {
        debug!(cluster, service, "describe-services");
        let output = self
            .client
            .describe_services()
            .cluster(cluster)
            .services(service)
            .send()
            .await
            .map_err(sdk_err)
            .stack_err_with(|| {
                format!("AwsEcsGateway::describe_service(cluster: {cluster}, service: {service})")
            })?;
        match output.services().first() {
            Some(found) => Ok(snapshot(found)),
            None => Err(Error::from_err(ExecError::ServiceNotFound {
                cluster: cluster.to_owned(),
                service: service.to_owned(),
                failures: output
                    .failures()
                    .iter()
                    .map(|failure| failure.reason().unwrap_or_default().to_owned())
                    .collect(),
            })),
        }
    }

    async fn update_desired_count(
        &self,
        cluster: &str,
        service: &str,
        desired_count: i32,
    ) -> Result<ServiceSnapshot> {
        debug!(cluster, service, desired_count, "update-service");
        let output = self
            .client
            .update_service()
            .cluster(cluster)
            .service(service)
            .desired_count(desired_count)
            .send()
            .await
            .map_err(sdk_err)
            .stack_err_with(|| {
                format!(
                    "AwsEcsGateway::update_desired_count(cluster: {cluster}, service: {service}, \
                     desired_count: {desired_count})"
                )
            })?;
        output
            .service()
            .map(snapshot)
            .stack_err("AwsEcsGateway::update_desired_count -> no service in the response")
    }

    async fn list_tasks(&self, cluster: &str, service: &str) -> Result<Vec<String>> {
        debug!(cluster, service, "list-tasks");
        let output = self
            .client
            .list_tasks()
            .cluster(cluster)
            .service_name(service)
            .send()
            .await
            .map_err(sdk_err)
            .stack_err_with(|| {
                format!("AwsEcsGateway::list_tasks(cluster: {cluster}, service: {service})")
            })?;
        let task_arns = output.task_arns().to_vec();
        if task_arns.is_empty() {
            return Err(Error::from_err(ExecError::NoTasks(service.to_owned())))
        }
        Ok(task_arns)
    }

    async fn describe_task(&self, cluster: &str, task: &str) -> Result<TaskDetail> {
        debug!(cluster, task, "describe-tasks");
        let output = self
            .client
            .describe_tasks()
            .cluster(cluster)
            .tasks(task)
            .send()
            .await
            .map_err(sdk_err)
            .stack_err_with(|| {
                format!("AwsEcsGateway::describe_task(cluster: {cluster}, task: {task})")
            })?;
        let found = output
            .tasks()
            .first()
            .ok_or_else(|| Error::from_err(ExecError::TaskNotFound(task.to_owned())))?;
        Ok(TaskDetail {
            last_status: found.last_status().unwrap_or_default().to_owned(),
            containers: found
                .containers()
                .iter()
                .map(|container| ContainerDetail {
                    name: container.name().unwrap_or_default().to_owned(),
                    managed_agents: container
                        .managed_agents()
                        .iter()
                        .map(|agent| ManagedAgent {
                            name: agent
                                .name()
                                .map(|name| name.as_str().to_owned())
                                .unwrap_or_default(),
                            last_status: agent.last_status().unwrap_or_default().to_owned(),
                        })
                        .collect(),
                })
                .collect(),
        })
    }

    async fn execute_command(
        &self,
        request: &ExecRequest,
        interrupt: &Interrupt,
    ) -> Result<SessionEnd> {
        run_session(self.tool.command(request), interrupt)
            .await
            .stack_err_with(|| {
                format!(
                    "AwsEcsGateway::execute_command(task: {}, container: {})",
                    request.task, request.container
                )
            })
    }
}
