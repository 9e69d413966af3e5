use crate::domain::{HookPhase, HookType};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures reported by a container engine client.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine socket {path:?} unavailable: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("engine API call {operation} failed: {source}")]
    Api {
        operation: String,
        #[source]
        source: bollard::errors::Error,
    },

    #[error("engine HTTP exchange for {operation} failed: {source}")]
    Http {
        operation: String,
        #[source]
        source: hyper::Error,
    },

    #[error("engine returned HTTP {status} for {operation}: {message}")]
    Status {
        operation: String,
        status: u16,
        message: String,
    },

    #[error("unexpected engine response for {operation}: {message}")]
    Protocol { operation: String, message: String },

    #[error("engine operation {0} was cancelled")]
    Cancelled(String),
}

/// Failures produced while building or executing a plan.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("plan for action [{0}] is not available")]
    PlanNotAvailable(String),

    #[error("unable to prepare working directory: {0}")]
    Preparation(String),

    #[error("hooks at phase [{phase}] only support {allowed} types, found [{found}]")]
    HookTypeNotAllowed {
        phase: HookPhase,
        found: HookType,
        allowed: String,
    },

    #[error("container hooks are only supported in post-start phase, found one in [{0}]")]
    ContainerHookUnsupported(HookPhase),

    #[error("hook script [{hook}] not found in [{}]", .searched.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "))]
    ScriptNotFound { hook: String, searched: Vec<PathBuf> },

    #[error("unable to find containers for [{}]", .0.join(", "))]
    Resolution(Vec<String>),

    #[error("containers [{}] didn't finish without error", .0.join(", "))]
    Stream(Vec<String>),

    #[error("[{step}] did not finish within {}s", .timeout.as_secs())]
    Timeout { step: String, timeout: Duration },

    #[error("[{0}] was cancelled")]
    Cancelled(String),

    #[error("shell exited with non-zero code [{code}]: {command}")]
    Execution { command: String, code: i32 },

    #[error("unable to run [{command}]: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to create directory [{path}]: {source}")]
    Mkdir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl PlanError {
    /// True for the configuration class of errors (bad hook type, missing script).
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::HookTypeNotAllowed { .. }
                | Self::ContainerHookUnsupported(_)
                | Self::ScriptNotFound { .. }
        )
    }
}

/// Failures while locating or parsing profile definitions.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("unable to find profiles")]
    NoProfiles,

    #[error("unknown profile [{0}]")]
    Unknown(String),

    #[error("found multiple definition files of same profile \"{name}\": {first:?} and {second:?}")]
    Duplicate {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("unable to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse profile definition {path:?} as v1 format: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yml::Error,
    },
}
