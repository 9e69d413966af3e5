mod cleanup;
mod execution;
mod hooks;
pub mod monitor;
mod planner;
mod steps;
mod timeout;

pub use cleanup::{PERSIST_LABEL, PruneStep, PruneTarget, format_size};
pub use execution::{Action, BoxFuture, ExecOption, Executable, ExecutionPlan, PlanMetadata};
pub use hooks::{HookResolver, MonitorPlacement, allowed_types, monitor_placement};
pub use monitor::{ContainerMonitor, ContainerResolver};
pub use planner::{ComposePlanner, DEFAULT_MONITOR_TIMEOUT};
pub use steps::{MkdirStep, PrintStep, ShellStep};
pub use timeout::TimeoutStep;
