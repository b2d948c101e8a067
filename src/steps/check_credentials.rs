use std::sync::Arc;

use async_trait::async_trait;
use stacked_errors::{Result, StackableErr};

use crate::{gateway::Connect, steps::Step, ExecContext};

/// Resolves and verifies credentials, storing the authenticated gateway in the
/// context
pub struct CheckCredentials {
    connector: Arc<dyn Connect>,
}

impl CheckCredentials {
    pub fn new(connector: Arc<dyn Connect>) -> Self {
        Self { connector }
    }
}

#[async_trait]
impl Step for CheckCredentials {
    fn name(&self) -> &'static str {
        "check credentials"
    }

    async fn run(&self, ctx: &mut ExecContext) -> Result<()> {
        let gateway = self
            .connector
            .connect()
            .await
            .stack_err("CheckCredentials -> could not verify credentials")?;
        ctx.set_gateway(gateway);
        Ok(())
    }
}
