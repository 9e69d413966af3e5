mod container;
mod hook;
pub mod profile;
pub mod traits;
mod variables;

pub use container::{ContainerSummary, EngineVersion, PruneReport};
pub use hook::{Hook, HookPhase, HookType, Hooks};
pub use profile::{Profile, ProfileMetadata, Service};
pub use traits::{ContainerEngine, LogStream, ShellCommand, ShellRunner};
pub use variables::{
    VAR_CONTAINER_DATA_PATH, VAR_PROJECT_NAME, VAR_RESOURCE_DIR, Variable, Variables,
};
