use super::execution::Executable;
use super::monitor::{ContainerMonitor, ContainerResolver};
use super::steps::ShellStep;
use crate::domain::{ContainerEngine, Hook, HookPhase, HookType, Hooks, ShellRunner};
use crate::error::PlanError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Hook types a phase accepts.
pub fn allowed_types(phase: HookPhase) -> &'static [HookType] {
    match phase {
        HookPhase::PreStart | HookPhase::PostStop => &[HookType::Script],
        HookPhase::PostStart | HookPhase::PreStop => &[HookType::Script, HookType::Container],
    }
}

/// Where the grouped container monitor goes relative to the phase's scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPlacement {
    BeforeScripts,
    AfterScripts,
}

pub fn monitor_placement(phase: HookPhase) -> MonitorPlacement {
    match phase {
        HookPhase::PostStop => MonitorPlacement::AfterScripts,
        _ => MonitorPlacement::BeforeScripts,
    }
}

/// Turns a profile's hooks into plan steps.
#[derive(Debug)]
pub struct HookResolver<'a> {
    pub hooks: &'a Hooks,
    /// Project name used by the compose container resolver
    pub project: &'a str,
    /// Copied resource directory searched for hook scripts
    pub resource_dir: &'a Path,
    pub working_dir: &'a Path,
    pub env: Vec<(String, String)>,
    pub engine: &'a Arc<dyn ContainerEngine>,
    pub shell: &'a Arc<dyn ShellRunner>,
    pub monitor_timeout: Duration,
}

impl HookResolver<'_> {
    pub fn hooks_plan(
        &self,
        phase: HookPhase,
        allowed: &[HookType],
    ) -> Result<Vec<Executable>, PlanError> {
        let hooks = self.hooks.phase(phase);
        if let Some(bad) = hooks.iter().find(|h| !allowed.contains(&h.kind)) {
            return Err(PlanError::HookTypeNotAllowed {
                phase,
                found: bad.kind,
                allowed: allowed
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        let mut scripts: Vec<Executable> = Vec::with_capacity(hooks.len());
        let mut containers = Vec::new();
        for hook in hooks {
            match hook.kind {
                HookType::Script => scripts.push(self.script_step(hook)?.into()),
                HookType::Container => containers.push(hook.value.clone()),
            }
        }

        if containers.is_empty() {
            return Ok(scripts);
        }
        let monitor = self.container_step(phase, containers)?;
        Ok(match monitor_placement(phase) {
            MonitorPlacement::BeforeScripts => std::iter::once(monitor).chain(scripts).collect(),
            MonitorPlacement::AfterScripts => {
                scripts.push(monitor);
                scripts
            }
        })
    }

    fn script_step(&self, hook: &Hook) -> Result<ShellStep, PlanError> {
        let candidates = script_candidates(self.resource_dir, hook.phase, &hook.value);
        let script = candidates
            .iter()
            .find(|p| p.is_file())
            .ok_or_else(|| PlanError::ScriptNotFound {
                hook: hook.value.clone(),
                searched: candidates.to_vec(),
            })?;

        Ok(ShellStep::new(
            format!("{} shell", hook.phase),
            vec![script.display().to_string()],
            self.shell.clone(),
        )
        .with_workdir(self.working_dir)
        .with_env(self.env.clone()))
    }

    // Hook containers are started by compose, so only post-start can wait on them.
    fn container_step(
        &self,
        phase: HookPhase,
        names: Vec<String>,
    ) -> Result<Executable, PlanError> {
        if phase != HookPhase::PostStart {
            return Err(PlanError::ContainerHookUnsupported(phase));
        }
        let monitor = ContainerMonitor::new(self.engine.clone(), names)
            .with_resolver(ContainerResolver::compose(self.project))
            .with_description(format!("{phase} containers"));
        Ok(monitor.with_timeout(self.monitor_timeout).into())
    }
}

/// `<dir>/<phase>/<value>` then `<dir>/<phase>-<value>`.
pub fn script_candidates(dir: &Path, phase: HookPhase, value: &str) -> [PathBuf; 2] {
    [
        dir.join(phase.as_str()).join(value),
        dir.join(format!("{}-{value}", phase.as_str())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockEngine, MockShell};
    use std::fs;

    struct Fixture {
        dir: tempfile::TempDir,
        engine: Arc<dyn ContainerEngine>,
        shell: Arc<dyn ShellRunner>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
                engine: Arc::new(MockEngine::new()),
                shell: Arc::new(MockShell::new()),
            }
        }

        fn script(&self, rel: &str) {
            let path = self.dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "#!/bin/sh\n").unwrap();
        }

        fn resolver<'a>(&'a self, hooks: &'a Hooks) -> HookResolver<'a> {
            HookResolver {
                hooks,
                project: "shop",
                resource_dir: self.dir.path(),
                working_dir: self.dir.path(),
                env: Vec::new(),
                engine: &self.engine,
                shell: &self.shell,
                monitor_timeout: Duration::from_secs(30),
            }
        }
    }

    #[test]
    fn phase_type_table() {
        assert_eq!(allowed_types(HookPhase::PreStart), &[HookType::Script]);
        assert_eq!(
            allowed_types(HookPhase::PostStart),
            &[HookType::Script, HookType::Container]
        );
        assert_eq!(
            allowed_types(HookPhase::PreStop),
            &[HookType::Script, HookType::Container]
        );
        assert_eq!(allowed_types(HookPhase::PostStop), &[HookType::Script]);
    }

    #[test]
    fn script_lookup_prefers_phase_directory() {
        let fx = Fixture::new();
        fx.script("pre-start/init.sh");
        fx.script("pre-start-init.sh");
        let hooks: Hooks = [Hook::script(HookPhase::PreStart, "init.sh")].into_iter().collect();

        let steps = fx
            .resolver(&hooks)
            .hooks_plan(HookPhase::PreStart, allowed_types(HookPhase::PreStart))
            .unwrap();

        assert_eq!(steps.len(), 1);
        let expected = fx.dir.path().join("pre-start").join("init.sh");
        assert_eq!(
            steps[0].describe(),
            format!("pre-start shell: {}", expected.display())
        );
    }

    #[test]
    fn script_lookup_falls_back_to_prefixed_file() {
        let fx = Fixture::new();
        fx.script("post-stop-clean.sh");
        let hooks: Hooks = [Hook::script(HookPhase::PostStop, "clean.sh")].into_iter().collect();

        let steps = fx
            .resolver(&hooks)
            .hooks_plan(HookPhase::PostStop, allowed_types(HookPhase::PostStop))
            .unwrap();

        assert!(steps[0].describe().ends_with("post-stop-clean.sh"));
    }

    #[test]
    fn missing_script_is_reported() {
        let fx = Fixture::new();
        let hooks: Hooks = [Hook::script(HookPhase::PreStart, "nope.sh")].into_iter().collect();

        let err = fx
            .resolver(&hooks)
            .hooks_plan(HookPhase::PreStart, allowed_types(HookPhase::PreStart))
            .unwrap_err();

        assert!(matches!(err, PlanError::ScriptNotFound { ref hook, .. } if hook == "nope.sh"));
        assert!(err.is_config());
    }

    #[test]
    fn missing_script_names_both_candidate_paths() {
        let fx = Fixture::new();
        let hooks: Hooks = [Hook::script(HookPhase::PreStart, "init.sh")].into_iter().collect();

        let err = fx
            .resolver(&hooks)
            .hooks_plan(HookPhase::PreStart, allowed_types(HookPhase::PreStart))
            .unwrap_err();

        let msg = err.to_string();
        let dir = fx.dir.path();
        assert!(msg.contains(&dir.join("pre-start").join("init.sh").display().to_string()));
        assert!(msg.contains(&dir.join("pre-start-init.sh").display().to_string()));
    }

    #[test]
    fn disallowed_type_is_rejected() {
        let fx = Fixture::new();
        let hooks: Hooks = [Hook::container(HookPhase::PreStart, "db")].into_iter().collect();

        let err = fx
            .resolver(&hooks)
            .hooks_plan(HookPhase::PreStart, allowed_types(HookPhase::PreStart))
            .unwrap_err();

        assert!(matches!(
            err,
            PlanError::HookTypeNotAllowed {
                phase: HookPhase::PreStart,
                found: HookType::Container,
                ..
            }
        ));
    }

    #[test]
    fn pre_stop_container_hook_is_unsupported() {
        let fx = Fixture::new();
        let hooks: Hooks = [Hook::container(HookPhase::PreStop, "db")].into_iter().collect();

        let err = fx
            .resolver(&hooks)
            .hooks_plan(HookPhase::PreStop, allowed_types(HookPhase::PreStop))
            .unwrap_err();

        assert!(matches!(err, PlanError::ContainerHookUnsupported(HookPhase::PreStop)));
    }

    #[test]
    fn post_start_containers_are_grouped_before_scripts() {
        let fx = Fixture::new();
        fx.script("post-start/notify.sh");
        let hooks: Hooks = [
            Hook::container(HookPhase::PostStart, "migrations"),
            Hook::script(HookPhase::PostStart, "notify.sh"),
            Hook::container(HookPhase::PostStart, "seed"),
        ]
        .into_iter()
        .collect();

        let steps = fx
            .resolver(&hooks)
            .hooks_plan(HookPhase::PostStart, allowed_types(HookPhase::PostStart))
            .unwrap();

        assert_eq!(steps.len(), 2);
        match &steps[0] {
            Executable::Timeout(step) => {
                assert_eq!(step.timeout(), Duration::from_secs(30));
                match step.delegate() {
                    Executable::ContainerMonitor(m) => {
                        assert_eq!(m.names(), ["migrations", "seed"]);
                        assert_eq!(m.resolver(), &ContainerResolver::compose("shop"));
                    }
                    other => panic!("unexpected delegate: {other:?}"),
                }
            }
            other => panic!("unexpected step: {other:?}"),
        }
        assert!(steps[1].describe().starts_with("post-start shell"));
    }

    #[test]
    fn placement_table() {
        assert_eq!(monitor_placement(HookPhase::PostStart), MonitorPlacement::BeforeScripts);
        assert_eq!(monitor_placement(HookPhase::PreStop), MonitorPlacement::BeforeScripts);
        assert_eq!(monitor_placement(HookPhase::PostStop), MonitorPlacement::AfterScripts);
    }

    #[test]
    fn no_hooks_no_steps() {
        let fx = Fixture::new();
        let hooks = Hooks::new();
        let steps = fx
            .resolver(&hooks)
            .hooks_plan(HookPhase::PostStart, allowed_types(HookPhase::PostStart))
            .unwrap();
        assert!(steps.is_empty());
    }
}
