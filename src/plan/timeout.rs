use super::execution::{ExecOption, Executable};
use crate::error::PlanError;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Bounds another step's run time. A zero timeout delegates unchanged.
#[derive(Debug)]
pub struct TimeoutStep {
    timeout: Duration,
    delegate: Box<Executable>,
}

impl TimeoutStep {
    pub fn new(timeout: Duration, delegate: impl Into<Executable>) -> Self {
        Self {
            timeout,
            delegate: Box::new(delegate.into()),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn delegate(&self) -> &Executable {
        &self.delegate
    }

    pub fn describe(&self) -> String {
        self.delegate.describe()
    }

    pub(crate) async fn exec(
        &self,
        cancel: &CancellationToken,
        opts: ExecOption,
    ) -> Result<(), PlanError> {
        if self.timeout.is_zero() {
            return self.delegate.exec(cancel, opts).await;
        }

        // the child token is cancelled when this scope ends, timed out or not,
        // so the delegate's background readers stop with it
        let scoped = cancel.child_token();
        let _guard = scoped.clone().drop_guard();

        match tokio::time::timeout(self.timeout, self.delegate.exec(&scoped, opts)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "[{}] did not finish within {}s",
                    self.describe(),
                    self.timeout.as_secs()
                );
                Err(PlanError::Timeout {
                    step: self.describe(),
                    timeout: self.timeout,
                })
            }
        }
    }
}
