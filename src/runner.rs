use std::io::Write;

use stacked_errors::{Error, Result, StackableErr};
use tracing::{debug, warn};

use crate::{steps::Step, ExecContext, ExecError};

/// Runs an ordered list of steps against one context, stopping at the first
/// failure. Steps after a failure never run, including ones that would undo
/// earlier steps.
pub struct Runner {
    steps: Vec<Box<dyn Step>>,
}

impl Runner {
    pub fn new(steps: Vec<Box<dyn Step>>) -> Self {
        Self { steps }
    }

    /// Names of the steps in execution order
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    fn warn_skipped(&self, from: usize) {
        let skipped: Vec<&'static str> = self
            .steps
            .iter()
            .skip(from)
            .map(|step| step.name())
            .collect();
        if !skipped.is_empty() {
            warn!(
                "skipping the remaining steps {skipped:?}, the service may need manual \
                 attention"
            );
        }
    }

    /// Runs every step in order, printing an empty separator line to stdout
    /// after each successful one. An interrupt left pending between steps
    /// stops the run as well.
    pub async fn run(&self, ctx: &mut ExecContext) -> Result<()> {
        self.run_with_output(ctx, &mut std::io::stdout()).await
    }

    /// [Runner::run] with the separators written to `out`
    pub async fn run_with_output<W: Write + Send>(
        &self,
        ctx: &mut ExecContext,
        out: &mut W,
    ) -> Result<()> {
        for (i, step) in self.steps.iter().enumerate() {
            if ctx.interrupt().issued_reset() {
                self.warn_skipped(i);
                return Err(Error::from_err(ExecError::Cancelled(format!(
                    "the run before step \"{}\"",
                    step.name()
                ))))
            }
            debug!(step = step.name(), "running step");
            if let Err(e) = step.run(ctx).await {
                self.warn_skipped(i + 1);
                return Err(e).stack_err_with(|| format!("step \"{}\" failed", step.name()))
            }
            // write failures only warn
            if let Err(e) = writeln!(out).and_then(|()| out.flush()) {
                warn!("could not write the step separator: {e}");
            }
        }
        Ok(())
    }
}
