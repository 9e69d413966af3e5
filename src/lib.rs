pub mod cli;
pub mod domain;
pub mod error;
pub mod infra;
pub mod plan;

// Make test_support available for integration tests
pub mod test_support;

pub use domain::{ContainerEngine, Hook, HookPhase, HookType, Profile, ShellRunner};
pub use error::{EngineError, PlanError, ProfileError};
pub use infra::{DockerEngine, ProcessShellRunner, Settings};
pub use plan::{Action, ComposePlanner, ExecOption, Executable, ExecutionPlan};
