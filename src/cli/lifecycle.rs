use super::inspect;
use crate::domain::{ContainerEngine, Profile, ShellRunner};
use crate::infra::{DockerEngine, ProcessShellRunner, Settings};
use crate::plan::{
    Action, ComposePlanner, DEFAULT_MONITOR_TIMEOUT, ExecOption, Executable, ExecutionPlan,
    PlanMetadata, PrintStep,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Runs start/stop/restart plans for loaded profiles.
pub struct Lifecycle {
    settings: Settings,
    engine: Arc<dyn ContainerEngine>,
    shell: Arc<dyn ShellRunner>,
    monitor_timeout: Duration,
}

impl Lifecycle {
    pub fn new(settings: Settings) -> Self {
        Self::with_engine(
            settings,
            Arc::new(DockerEngine::from_env()),
            Arc::new(ProcessShellRunner::new()),
        )
    }

    pub fn with_engine(
        settings: Settings,
        engine: Arc<dyn ContainerEngine>,
        shell: Arc<dyn ShellRunner>,
    ) -> Self {
        Self {
            settings,
            engine,
            shell,
            monitor_timeout: DEFAULT_MONITOR_TIMEOUT,
        }
    }

    pub fn with_monitor_timeout(mut self, timeout: Duration) -> Self {
        self.monitor_timeout = timeout;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Prepares the temporary directory and builds the plan for `action`.
    ///
    /// A dry-run plan skips the engine version probe.
    pub async fn plan(
        &self,
        profile: Profile,
        action: Action,
        dry_run: bool,
    ) -> Result<ExecutionPlan> {
        self.settings.ensure_tmp_dir()?;
        let name = profile.name().to_string();
        ComposePlanner::new(
            profile,
            &self.settings.tmp_dir,
            self.engine.clone(),
            self.shell.clone(),
        )
        .with_monitor_timeout(self.monitor_timeout)
        .with_engine_probe(!dry_run)
        .plan(action)
        .await
        .with_context(|| format!("planning {action} of [{name}]"))
    }

    pub async fn run(
        &self,
        profile: Profile,
        action: Action,
        dry_run: bool,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let verbose = self.settings.verbose;
        let hooks = verbose.then(|| inspect::render_hooks(&profile));
        let name = profile.name().to_string();

        let plan = self.plan(profile, action, dry_run).await?;
        if let Some(hooks) = hooks {
            print!("{}", plan.metadata());
            print!("{hooks}");
        }

        let result = plan
            .execute(cancel, ExecOption::new(verbose, dry_run))
            .await;
        plan.close();
        result.with_context(|| format!("{action} of [{name}] failed"))?;

        if !dry_run {
            info!("Profile [{name}] {action} finished");
        }
        Ok(())
    }

    /// Prints the resolved settings through a plan of print steps.
    pub async fn debug(&self, dry_run: bool, cancel: &CancellationToken) -> Result<()> {
        let roots: Vec<String> = self
            .settings
            .profile_roots()
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        let steps: Vec<Executable> = [
            format!("workspace: {}", self.settings.workspace.display()),
            format!("tmp dir: {}", self.settings.tmp_dir.display()),
            format!("search paths: {}", roots.join(", ")),
            format!("engine: {:?}", self.engine),
        ]
        .into_iter()
        .map(|msg| PrintStep::new(msg).into())
        .collect();

        let plan = ExecutionPlan::new(PlanMetadata::default(), steps);
        plan.execute(cancel, ExecOption::new(self.settings.verbose, dry_run))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Hook, HookPhase, Hooks, ProfileMetadata};
    use crate::test_support::{MockEngine, MockShell};
    use std::fs;
    use std::path::PathBuf;

    fn profile(dir: &std::path::Path, hooks: Hooks) -> Profile {
        fs::write(dir.join("docker-compose-shop.yml"), "services: {}\n").unwrap();
        Profile {
            metadata: ProfileMetadata::new("shop", dir.join("devenv-shop.yml")),
            display_name: "Shop".into(),
            services: Vec::new(),
            hooks,
            resource_dir: dir.join("res-shop"),
            compose_path: dir.join("docker-compose-shop.yml"),
            local_data_dir: PathBuf::from("/usr/local/var/dev/shop"),
        }
    }

    #[tokio::test]
    async fn stop_runs_compose_down_then_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(MockEngine::new());
        let shell = Arc::new(MockShell::new());
        let lifecycle = Lifecycle::with_engine(Settings::new(dir.path()), engine.clone(), shell.clone());

        lifecycle
            .run(
                profile(dir.path(), Hooks::new()),
                Action::Stop,
                false,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let commands = shell.get_commands();
        assert_eq!(commands.len(), 1);
        assert!(commands[0].contains(r#"-p "shop" down --remove-orphans"#));
        assert!(dir.path().join(".tmp/docker-compose.yml").is_file());
        assert_eq!(
            engine.get_commands(),
            vec![
                "version",
                "prune:containers",
                "prune:volumes:devenv.persist",
                "prune:images"
            ]
        );
    }

    #[tokio::test]
    async fn dry_run_touches_no_engine_or_shell() {
        let dir = tempfile::tempdir().unwrap();
        let res = dir.path().join("res-shop");
        fs::create_dir_all(&res).unwrap();
        fs::write(res.join("pre-start-init.sh"), "#!/bin/sh\n").unwrap();
        let hooks: Hooks = [Hook::script(HookPhase::PreStart, "init.sh")].into_iter().collect();
        let engine = Arc::new(MockEngine::new());
        let shell = Arc::new(MockShell::new());
        let lifecycle = Lifecycle::with_engine(Settings::new(dir.path()), engine.clone(), shell.clone());

        lifecycle
            .run(
                profile(dir.path(), hooks),
                Action::Restart,
                true,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(shell.get_commands().is_empty());
        assert!(engine.get_commands().is_empty());
        assert!(dir.path().join(".tmp/docker-compose.yml").is_file());
    }

    #[tokio::test]
    async fn failing_step_is_reported_with_context() {
        let dir = tempfile::tempdir().unwrap();
        let shell = Arc::new(MockShell::new());
        shell.set_exit_code("up -d", 1);
        let lifecycle = Lifecycle::with_engine(
            Settings::new(dir.path()),
            Arc::new(MockEngine::new()),
            shell,
        );

        let err = lifecycle
            .run(
                profile(dir.path(), Hooks::new()),
                Action::Start,
                false,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(err.to_string().contains("start of [shop] failed"));
    }

    #[tokio::test]
    async fn debug_plan_prints_settings() {
        let dir = tempfile::tempdir().unwrap();
        let lifecycle = Lifecycle::with_engine(
            Settings::new(dir.path()),
            Arc::new(MockEngine::new()),
            Arc::new(MockShell::new()),
        );
        lifecycle
            .debug(true, &CancellationToken::new())
            .await
            .unwrap();
    }
}
