use crate::domain::{ShellCommand, ShellRunner};
use async_trait::async_trait;
use std::io;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Runs commands through `sh -c`, inheriting stdout/stderr.
#[derive(Debug, Default)]
pub struct ProcessShellRunner;

impl ProcessShellRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ShellRunner for ProcessShellRunner {
    async fn run(&self, cmd: &ShellCommand, cancel: &CancellationToken) -> io::Result<i32> {
        if cmd.show {
            for line in &cmd.commands {
                info!("$ {line}");
            }
        }

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(cmd.script())
            .current_dir(&cmd.workdir)
            .envs(cmd.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .kill_on_drop(true)
            .spawn()?;

        tokio::select! {
            status = child.wait() => {
                // killed by signal has no code
                Ok(status?.code().unwrap_or(-1))
            }
            _ = cancel.cancelled() => {
                let _ = child.kill().await;
                Err(io::Error::new(io::ErrorKind::Interrupted, "shell cancelled"))
            }
        }
    }
}
