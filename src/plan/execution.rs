use super::cleanup::PruneStep;
use super::monitor::ContainerMonitor;
use super::steps::{MkdirStep, PrintStep, ShellStep};
use super::timeout::TimeoutStep;
use crate::domain::{EngineVersion, Variables};
use crate::error::PlanError;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Start,
    Stop,
    Restart,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Start, Action::Stop, Action::Restart];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| PlanError::PlanNotAvailable(s.to_string()))
    }
}

/// Per-execution switches handed to every step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOption {
    /// Steps echo their commands and report details
    pub verbose: bool,
    /// Steps print their description instead of acting
    pub dry_run: bool,
}

impl ExecOption {
    pub fn new(verbose: bool, dry_run: bool) -> Self {
        Self { verbose, dry_run }
    }
}

/// Closed set of plan steps.
#[derive(Debug)]
pub enum Executable {
    Shell(ShellStep),
    Mkdir(MkdirStep),
    Print(PrintStep),
    ContainerMonitor(ContainerMonitor),
    Timeout(TimeoutStep),
    Prune(PruneStep),
}

impl Executable {
    /// Runs the step. With `opts.dry_run` only the description is printed.
    pub fn exec<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        opts: ExecOption,
    ) -> BoxFuture<'a, Result<(), PlanError>> {
        if opts.dry_run {
            return Box::pin(async move {
                println!("{}", self.dry_run_line());
                Ok(())
            });
        }
        match self {
            Self::Shell(step) => Box::pin(step.exec(cancel, opts)),
            Self::Mkdir(step) => Box::pin(step.exec(opts)),
            Self::Print(step) => Box::pin(step.exec()),
            Self::ContainerMonitor(step) => Box::pin(step.exec(cancel, opts)),
            Self::Timeout(step) => Box::pin(step.exec(cancel, opts)),
            Self::Prune(step) => Box::pin(step.exec(opts)),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Shell(step) => step.describe(),
            Self::Mkdir(step) => step.describe(),
            Self::Print(step) => step.describe(),
            Self::ContainerMonitor(step) => step.describe(),
            Self::Timeout(step) => step.describe(),
            Self::Prune(step) => step.describe(),
        }
    }

    pub fn dry_run_line(&self) -> String {
        format!("- {}", self.describe())
    }
}

impl fmt::Display for Executable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl From<ShellStep> for Executable {
    fn from(step: ShellStep) -> Self {
        Self::Shell(step)
    }
}

impl From<MkdirStep> for Executable {
    fn from(step: MkdirStep) -> Self {
        Self::Mkdir(step)
    }
}

impl From<PrintStep> for Executable {
    fn from(step: PrintStep) -> Self {
        Self::Print(step)
    }
}

impl From<ContainerMonitor> for Executable {
    fn from(step: ContainerMonitor) -> Self {
        Self::ContainerMonitor(step)
    }
}

impl From<TimeoutStep> for Executable {
    fn from(step: TimeoutStep) -> Self {
        Self::Timeout(step)
    }
}

impl From<PruneStep> for Executable {
    fn from(step: PruneStep) -> Self {
        Self::Prune(step)
    }
}

/// What a plan was prepared from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanMetadata {
    pub profile: String,
    pub working_dir: PathBuf,
    pub compose_path: PathBuf,
    pub resource_dir: PathBuf,
    pub variables: Variables,
    pub engine_version: Option<EngineVersion>,
}

impl fmt::Display for PlanMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "profile: {}", self.profile)?;
        writeln!(f, "working dir: {}", self.working_dir.display())?;
        writeln!(f, "compose file: {}", self.compose_path.display())?;
        writeln!(f, "resource dir: {}", self.resource_dir.display())?;
        if let Some(v) = &self.engine_version {
            writeln!(f, "engine: {} (api {}, {}/{})", v.version, v.api_version, v.os, v.arch)?;
        }
        writeln!(f, "variables:")?;
        for var in self.variables.iter() {
            writeln!(f, "    {var}")?;
        }
        Ok(())
    }
}

type CloseHook = Box<dyn FnOnce() + Send>;

/// Ordered steps for one action on one profile.
pub struct ExecutionPlan {
    steps: Vec<Executable>,
    metadata: PlanMetadata,
    on_close: Option<CloseHook>,
}

impl ExecutionPlan {
    pub fn new(metadata: PlanMetadata, steps: Vec<Executable>) -> Self {
        Self {
            steps,
            metadata,
            on_close: None,
        }
    }

    /// Registers a callback run by [`ExecutionPlan::close`], e.g. to release engine handles.
    pub fn with_close_hook(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_close = Some(Box::new(hook));
        self
    }

    pub fn steps(&self) -> &[Executable] {
        &self.steps
    }

    pub fn metadata(&self) -> &PlanMetadata {
        &self.metadata
    }

    pub fn descriptions(&self) -> Vec<String> {
        self.steps.iter().map(Executable::describe).collect()
    }

    /// Lines printed by a dry run, one per step.
    pub fn render_dry_run(&self) -> Vec<String> {
        self.steps.iter().map(Executable::dry_run_line).collect()
    }

    /// Runs steps in order and stops at the first failure.
    pub async fn execute(
        &self,
        cancel: &CancellationToken,
        opts: ExecOption,
    ) -> Result<(), PlanError> {
        if opts.dry_run {
            info!("DryRun - planned steps:");
        }
        let total = self.steps.len();
        for (idx, step) in self.steps.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(PlanError::Cancelled(step.describe()));
            }
            if !opts.dry_run {
                debug!("step {}/{}: {}", idx + 1, total, step.describe());
            }
            step.exec(cancel, opts).await?;
        }
        Ok(())
    }

    pub fn close(mut self) {
        if let Some(hook) = self.on_close.take() {
            hook();
        }
    }
}

impl fmt::Debug for ExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionPlan")
            .field("steps", &self.steps)
            .field("metadata", &self.metadata)
            .field("on_close", &self.on_close.is_some())
            .finish()
    }
}
