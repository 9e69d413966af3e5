use super::{ContainerSummary, EngineVersion, PruneReport};
use crate::error::EngineError;
use async_trait::async_trait;
use std::fmt::Debug;
use std::path::PathBuf;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

/// Raw multiplexed log stream of one container.
pub type LogStream = Box<dyn AsyncRead + Send + Unpin>;

/// Trait for container engine operations
#[async_trait]
pub trait ContainerEngine: Send + Sync + Debug {
    /// List running containers
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, EngineError>;

    /// Open a follow-mode stdout+stderr stream for a container.
    ///
    /// Connecting aborts with [`EngineError::Cancelled`] once `cancel` fires.
    async fn open_log_stream(
        &self,
        container: &str,
        cancel: &CancellationToken,
    ) -> Result<LogStream, EngineError>;

    /// Remove stopped containers
    async fn prune_containers(&self) -> Result<PruneReport, EngineError>;

    /// Remove unused volumes, keeping those carrying `keep_label`
    async fn prune_volumes(&self, keep_label: &str) -> Result<PruneReport, EngineError>;

    /// Remove dangling images
    async fn prune_images(&self) -> Result<PruneReport, EngineError>;

    async fn server_version(&self) -> Result<EngineVersion, EngineError>;
}

/// A shell invocation: commands run in order within one `sh` session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellCommand {
    pub commands: Vec<String>,
    pub workdir: PathBuf,
    pub env: Vec<(String, String)>,
    /// Echo the commands before running them
    pub show: bool,
}

impl ShellCommand {
    pub fn script(&self) -> String {
        self.commands.join("\n")
    }
}

/// Trait for running external processes
#[async_trait]
pub trait ShellRunner: Send + Sync + Debug {
    /// Run the command and return its exit code
    async fn run(&self, cmd: &ShellCommand, cancel: &CancellationToken) -> std::io::Result<i32>;
}
