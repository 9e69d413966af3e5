use super::execution::ExecOption;
use crate::domain::{ShellCommand, ShellRunner};
use crate::error::PlanError;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Runs a list of commands in one shell session.
#[derive(Debug)]
pub struct ShellStep {
    desc: String,
    commands: Vec<String>,
    workdir: PathBuf,
    env: Vec<(String, String)>,
    runner: Arc<dyn ShellRunner>,
}

impl ShellStep {
    pub fn new(desc: impl Into<String>, commands: Vec<String>, runner: Arc<dyn ShellRunner>) -> Self {
        Self {
            desc: desc.into(),
            commands,
            workdir: PathBuf::from("."),
            env: Vec::new(),
            runner,
        }
    }

    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }

    pub fn with_env(mut self, env: Vec<(String, String)>) -> Self {
        self.env = env;
        self
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn describe(&self) -> String {
        match self.commands.as_slice() {
            [] => "NONE".to_string(),
            [single] => format!("{}: {single}", self.desc),
            many => format!("{}: \n    {}", self.desc, many.join("; \\\n    ")),
        }
    }

    pub(crate) async fn exec(
        &self,
        cancel: &CancellationToken,
        opts: ExecOption,
    ) -> Result<(), PlanError> {
        if self.commands.is_empty() {
            return Ok(());
        }
        let cmd = ShellCommand {
            commands: self.commands.clone(),
            workdir: self.workdir.clone(),
            env: self.env.clone(),
            show: opts.verbose,
        };

        let code = self
            .runner
            .run(&cmd, cancel)
            .await
            .map_err(|source| match source.kind() {
                io::ErrorKind::Interrupted => PlanError::Cancelled(self.describe()),
                _ => PlanError::Spawn {
                    command: cmd.script(),
                    source,
                },
            })?;

        if code != 0 {
            return Err(PlanError::Execution {
                command: cmd.script(),
                code,
            });
        }
        Ok(())
    }
}

/// Creates host directories, parents included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MkdirStep {
    desc: String,
    paths: Vec<PathBuf>,
}

impl MkdirStep {
    pub fn new(desc: impl Into<String>, paths: Vec<PathBuf>) -> Self {
        Self {
            desc: desc.into(),
            paths,
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn describe(&self) -> String {
        let paths: Vec<String> = self.paths.iter().map(|p| p.display().to_string()).collect();
        match paths.as_slice() {
            [] => "NONE".to_string(),
            [single] => format!("{}: {single}", self.desc),
            many => format!("{}: \n    {}", self.desc, many.join("\n    ")),
        }
    }

    pub(crate) async fn exec(&self, opts: ExecOption) -> Result<(), PlanError> {
        for path in &self.paths {
            if opts.verbose {
                info!("mkdir -p {}", path.display());
            }
            tokio::fs::create_dir_all(path)
                .await
                .map_err(|source| PlanError::Mkdir {
                    path: path.clone(),
                    source,
                })?;
        }
        Ok(())
    }
}

/// Emits a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintStep {
    message: String,
}

impl PrintStep {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn describe(&self) -> String {
        format!("print: {}", self.message)
    }

    pub(crate) async fn exec(&self) -> Result<(), PlanError> {
        println!("{}", self.message);
        Ok(())
    }
}
