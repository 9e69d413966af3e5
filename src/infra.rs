pub mod compose;
pub mod config;
pub mod docker_adapter;
pub mod profile_discovery;
pub mod profile_loader;
pub mod shell_runner;

pub use config::Settings;
pub use docker_adapter::DockerEngine;
pub use profile_discovery::{ProfileDiscovery, Profiles};
pub use profile_loader::load_profile;
pub use shell_runner::ProcessShellRunner;
