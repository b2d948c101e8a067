use std::process::ExitStatus;

/// Leaf causes that get pushed onto a `stacked_errors::Error`. Timeouts are not
/// in here, they use `Error::timeout()` so that `is_timeout` works on them.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("`{0}` should not be empty")]
    MissingParameter(&'static str),
    #[error("no usable AWS credentials could be resolved: {0}")]
    NoCredentials(String),
    #[error("the caller identity check was rejected: {0}")]
    IdentityRejected(String),
    #[error("remote call failed: {0}")]
    Remote(String),
    #[error("service \"{service}\" is not found in cluster \"{cluster}\" {failures:?}")]
    ServiceNotFound {
        cluster: String,
        service: String,
        failures: Vec<String>,
    },
    #[error("service \"{service}\" has status {status} and cannot become stable")]
    ServiceInactive { service: String, status: String },
    #[error("task \"{0}\" is not found")]
    TaskNotFound(String),
    #[error("task ARNs not found for service \"{0}\"")]
    NoTasks(String),
    #[error("`{0}` has not been set by an earlier step")]
    MissingContextValue(&'static str),
    #[error("`{0}` was already set, it is write-once")]
    AlreadySet(&'static str),
    #[error("could not confirm that the managed agent is running")]
    AgentNotRunning,
    #[error("{0} was cancelled by an interrupt")]
    Cancelled(String),
    #[error("the interactive session exited unsuccessfully with {0}")]
    SessionFailed(ExitStatus),
    #[error("the interactive session was terminated before it could report a status")]
    SessionTerminated,
}
