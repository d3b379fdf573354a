use std::{future::Future, sync::Arc};

use async_trait::async_trait;
use shared::domain::{LifecycleAction, ProcessId, ProcessRecord};
use thiserror::Error;

mod pm2_cli;

pub use pm2_cli::{parse_jlist, Pm2Cli};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SupervisorError {
    #[error("process supervisor unavailable: {0}")]
    Unavailable(String),
    #[error("{command} failed: {detail}")]
    CommandFailed { command: String, detail: String },
    #[error("unreadable supervisor output: {0}")]
    Parse(String),
}

impl SupervisorError {
    /// The part worth showing to a user, without the command prefix.
    pub fn detail(&self) -> &str {
        match self {
            Self::Unavailable(detail) | Self::Parse(detail) => detail,
            Self::CommandFailed { detail, .. } => detail,
        }
    }
}

/// Control surface of the external process manager.
///
/// Every call may fail with a descriptive error; `disconnect` never does and is
/// safe to call without an open session.
#[async_trait]
pub trait ProcessSupervisor: Send + Sync {
    async fn connect(&self) -> Result<(), SupervisorError>;
    async fn list(&self) -> Result<Vec<ProcessRecord>, SupervisorError>;
    async fn start(&self, id: &ProcessId) -> Result<(), SupervisorError>;
    async fn stop(&self, id: &ProcessId) -> Result<(), SupervisorError>;
    async fn restart(&self, id: &ProcessId) -> Result<(), SupervisorError>;
    async fn disconnect(&self);

    async fn apply(&self, action: LifecycleAction, id: &ProcessId) -> Result<(), SupervisorError> {
        match action {
            LifecycleAction::Start => self.start(id).await,
            LifecycleAction::Stop => self.stop(id).await,
            LifecycleAction::Restart => self.restart(id).await,
        }
    }
}

/// Runs `op` inside a supervisor session. The session is released on every
/// exit path, including when `op` fails.
pub async fn scoped<T, F, Fut>(
    supervisor: &Arc<dyn ProcessSupervisor>,
    op: F,
) -> Result<T, SupervisorError>
where
    F: FnOnce(Arc<dyn ProcessSupervisor>) -> Fut,
    Fut: Future<Output = Result<T, SupervisorError>>,
{
    if let Err(error) = supervisor.connect().await {
        supervisor.disconnect().await;
        return Err(error);
    }
    let result = op(Arc::clone(supervisor)).await;
    supervisor.disconnect().await;
    result
}

pub async fn snapshot(
    supervisor: &Arc<dyn ProcessSupervisor>,
) -> Result<Vec<ProcessRecord>, SupervisorError> {
    scoped(supervisor, |session| async move { session.list().await }).await
}

pub async fn run_action(
    supervisor: &Arc<dyn ProcessSupervisor>,
    action: LifecycleAction,
    id: &ProcessId,
) -> Result<(), SupervisorError> {
    let id = id.clone();
    scoped(supervisor, |session| async move { session.apply(action, &id).await }).await
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
