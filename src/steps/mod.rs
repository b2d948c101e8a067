//! The four steps of the fixed pipeline. Steps hold only configuration, every
//! bit of state of a run lives in the [ExecContext].

mod check_credentials;
mod ensure_service_started;
mod restore_service_state;
mod run_interactive_command;

use async_trait::async_trait;
pub use check_credentials::CheckCredentials;
pub use ensure_service_started::{EnsureServiceStarted, DEFAULT_AGENT_WAIT, DEFAULT_STABLE_WAIT};
pub use restore_service_state::{RestoreServiceState, DEFAULT_STOPPED_WAIT};
pub use run_interactive_command::RunInteractiveCommand;
use stacked_errors::Result;

use crate::ExecContext;

/// One unit of the pipeline. A step either completes its whole contract or
/// returns the error that stops the [Runner](crate::Runner).
#[async_trait]
pub trait Step: Send + Sync {
    /// Used in logs and in the error of a failed run
    fn name(&self) -> &'static str;

    async fn run(&self, ctx: &mut ExecContext) -> Result<()>;
}
