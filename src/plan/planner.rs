use super::cleanup::PruneStep;
use super::execution::{Action, Executable, ExecutionPlan, PlanMetadata};
use super::hooks::{HookResolver, allowed_types};
use super::steps::{MkdirStep, ShellStep};
use crate::domain::{
    ContainerEngine, EngineVersion, HookPhase, Profile, ShellRunner, VAR_CONTAINER_DATA_PATH,
    VAR_RESOURCE_DIR, Variable, Variables,
};
use crate::error::PlanError;
use crate::infra::compose;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Upper bound on waiting for post-start hook containers.
pub const DEFAULT_MONITOR_TIMEOUT: Duration = Duration::from_secs(30);

const VERSION_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds execution plans that drive `docker compose` for one profile.
#[derive(Debug)]
pub struct ComposePlanner {
    profile: Profile,
    working_dir: PathBuf,
    engine: Arc<dyn ContainerEngine>,
    shell: Arc<dyn ShellRunner>,
    monitor_timeout: Duration,
    probe_engine: bool,
}

impl ComposePlanner {
    pub fn new(
        profile: Profile,
        working_dir: impl Into<PathBuf>,
        engine: Arc<dyn ContainerEngine>,
        shell: Arc<dyn ShellRunner>,
    ) -> Self {
        Self {
            profile,
            working_dir: working_dir.into(),
            engine,
            shell,
            monitor_timeout: DEFAULT_MONITOR_TIMEOUT,
            probe_engine: true,
        }
    }

    pub fn with_monitor_timeout(mut self, timeout: Duration) -> Self {
        self.monitor_timeout = timeout;
        self
    }

    /// Dry runs pass `false` so preparation never contacts the engine.
    pub fn with_engine_probe(mut self, probe: bool) -> Self {
        self.probe_engine = probe;
        self
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Renders the compose file and copies resources into the working directory.
    pub async fn prepare(&self) -> Result<PlanMetadata, PlanError> {
        info!("Using Docker Compose");

        let mut variables = Variables::from_profile(&self.profile);
        let compose_path =
            compose::write_compose_file(&self.profile.compose_path, &self.working_dir, &variables)?;
        let resource_dir = compose::copy_resources(&self.profile.resource_dir, &self.working_dir)?;

        let resource_name = resource_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        variables.add(Variable::new(
            VAR_CONTAINER_DATA_PATH,
            self.profile.local_data_dir.display().to_string(),
        ));
        variables.add(Variable::new(VAR_RESOURCE_DIR, resource_name));

        let engine_version = if self.probe_engine {
            self.engine_version().await
        } else {
            None
        };

        info!("Working directory is ready: {}", self.working_dir.display());
        Ok(PlanMetadata {
            profile: self.profile.name().to_string(),
            working_dir: self.working_dir.clone(),
            compose_path,
            resource_dir,
            variables,
            engine_version,
        })
    }

    async fn engine_version(&self) -> Option<EngineVersion> {
        match tokio::time::timeout(VERSION_TIMEOUT, self.engine.server_version()).await {
            Ok(Ok(version)) => {
                debug!("docker engine {} (api {})", version.version, version.api_version);
                Some(version)
            }
            Ok(Err(e)) => {
                warn!("Docker engine not available: {e}");
                None
            }
            Err(_) => {
                warn!("Docker engine did not answer within {}s", VERSION_TIMEOUT.as_secs());
                None
            }
        }
    }

    /// Prepares the working directory and builds the plan for `action`,
    /// followed by the cleanup steps.
    pub async fn plan(&self, action: Action) -> Result<ExecutionPlan, PlanError> {
        let metadata = self.prepare().await?;

        let mut steps = match action {
            Action::Start => self.start_plan(&metadata)?,
            Action::Stop => self.stop_plan(&metadata)?,
            Action::Restart => self.restart_plan(&metadata)?,
        };
        steps.extend(PruneStep::all(&self.engine).into_iter().map(Executable::from));

        let engine = self.engine.clone();
        Ok(ExecutionPlan::new(metadata, steps).with_close_hook(move || {
            debug!("releasing engine client");
            drop(engine);
        }))
    }

    /// Same as [`ComposePlanner::plan`] for a textual action.
    pub async fn plan_named(&self, action: &str) -> Result<ExecutionPlan, PlanError> {
        let action: Action = action.parse()?;
        self.plan(action).await
    }

    fn start_plan(&self, meta: &PlanMetadata) -> Result<Vec<Executable>, PlanError> {
        let hooks = self.hook_resolver(meta);
        let mut steps = hooks.hooks_plan(HookPhase::PreStart, allowed_types(HookPhase::PreStart))?;
        steps.push(self.data_volumes_step().into());
        steps.push(
            self.compose_step(
                meta,
                "start services",
                "up -d --force-recreate --remove-orphans",
            )
            .into(),
        );
        steps.extend(hooks.hooks_plan(HookPhase::PostStart, allowed_types(HookPhase::PostStart))?);
        Ok(steps)
    }

    fn stop_plan(&self, meta: &PlanMetadata) -> Result<Vec<Executable>, PlanError> {
        let hooks = self.hook_resolver(meta);
        let mut steps = hooks.hooks_plan(HookPhase::PreStop, allowed_types(HookPhase::PreStop))?;
        steps.push(
            self.compose_step(meta, "stop services", "down --remove-orphans")
                .into(),
        );
        steps.extend(hooks.hooks_plan(HookPhase::PostStop, allowed_types(HookPhase::PostStop))?);
        Ok(steps)
    }

    fn restart_plan(&self, meta: &PlanMetadata) -> Result<Vec<Executable>, PlanError> {
        let mut steps = self.stop_plan(meta)?;
        steps.extend(self.start_plan(meta)?);
        Ok(steps)
    }

    fn hook_resolver<'a>(&'a self, meta: &'a PlanMetadata) -> HookResolver<'a> {
        HookResolver {
            hooks: &self.profile.hooks,
            project: self.profile.name(),
            resource_dir: &meta.resource_dir,
            working_dir: &meta.working_dir,
            env: meta.variables.to_env(),
            engine: &self.engine,
            shell: &self.shell,
            monitor_timeout: self.monitor_timeout,
        }
    }

    fn compose_step(&self, meta: &PlanMetadata, desc: &str, args: &str) -> ShellStep {
        let cmd = format!(
            r#"docker compose -f "{}" -p "{}" {args}"#,
            meta.compose_path.display(),
            self.profile.name()
        );
        ShellStep::new(desc, vec![cmd], self.shell.clone())
            .with_workdir(&self.working_dir)
            .with_env(meta.variables.to_env())
    }

    fn data_volumes_step(&self) -> MkdirStep {
        let mut paths = data_paths(&self.profile.local_data_dir, &self.profile);
        paths.sort();
        MkdirStep::new("create directories", paths)
    }
}

fn data_paths(root: &Path, profile: &Profile) -> Vec<PathBuf> {
    profile
        .services
        .iter()
        .flat_map(|s| s.mounts.iter())
        .map(|mount| root.join(mount))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Hook, Hooks, ProfileMetadata, Service};
    use crate::test_support::{MockEngine, MockShell};
    use std::collections::BTreeMap;
    use std::fs;

    struct Fixture {
        src: tempfile::TempDir,
        work: tempfile::TempDir,
        engine: Arc<MockEngine>,
        shell: Arc<MockShell>,
    }

    impl Fixture {
        fn new() -> Self {
            let src = tempfile::tempdir().unwrap();
            fs::write(
                src.path().join("docker-compose-shop.yml"),
                "name: {{ PROJECT_NAME }}\n",
            )
            .unwrap();
            Self {
                src,
                work: tempfile::tempdir().unwrap(),
                engine: Arc::new(MockEngine::new()),
                shell: Arc::new(MockShell::new()),
            }
        }

        fn profile(&self, hooks: Hooks) -> Profile {
            Profile {
                metadata: ProfileMetadata::new("shop", self.src.path().join("devenv-shop.yml")),
                display_name: "Shop".into(),
                services: vec![Service {
                    name: "redis".into(),
                    display_name: "Redis".into(),
                    display_version: "7".into(),
                    image: "redis:7".into(),
                    mounts: vec!["redis/log".into(), "redis/data".into()],
                    build_args: BTreeMap::new(),
                }],
                hooks,
                resource_dir: self.src.path().join("res-shop"),
                compose_path: self.src.path().join("docker-compose-shop.yml"),
                local_data_dir: PathBuf::from("/usr/local/var/dev/shop"),
            }
        }

        fn planner(&self, hooks: Hooks) -> ComposePlanner {
            ComposePlanner::new(
                self.profile(hooks),
                self.work.path(),
                self.engine.clone(),
                self.shell.clone(),
            )
        }
    }

    #[tokio::test]
    async fn start_plan_shape() {
        let fx = Fixture::new();
        let plan = fx.planner(Hooks::new()).plan(Action::Start).await.unwrap();

        let compose = fx.work.path().join("docker-compose.yml");
        assert_eq!(
            plan.descriptions(),
            vec![
                "create directories: \n    /usr/local/var/dev/shop/redis/data\n    /usr/local/var/dev/shop/redis/log".to_string(),
                format!(
                    r#"start services: docker compose -f "{}" -p "shop" up -d --force-recreate --remove-orphans"#,
                    compose.display()
                ),
                "prune containers".to_string(),
                "prune volumes".to_string(),
                "prune images".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn restart_is_stop_then_start() {
        let fx = Fixture::new();
        let planner = fx.planner(Hooks::new());

        let stop = planner.plan(Action::Stop).await.unwrap().descriptions();
        let start = planner.plan(Action::Start).await.unwrap().descriptions();
        let restart = planner.plan(Action::Restart).await.unwrap().descriptions();

        let cleanup = 3;
        let mut expected = stop[..stop.len() - cleanup].to_vec();
        expected.extend(start);
        assert_eq!(restart, expected);
    }

    #[tokio::test]
    async fn prepare_renders_compose_and_sets_variables() {
        let fx = Fixture::new();
        let meta = fx.planner(Hooks::new()).prepare().await.unwrap();

        assert_eq!(
            fs::read_to_string(&meta.compose_path).unwrap(),
            "name: shop\n"
        );
        assert_eq!(meta.resource_dir, fx.work.path().join("res-shop"));
        assert!(meta.resource_dir.is_dir());
        assert_eq!(meta.variables.get(VAR_RESOURCE_DIR), Some("res-shop"));
        assert_eq!(
            meta.variables.get(VAR_CONTAINER_DATA_PATH),
            Some("/usr/local/var/dev/shop")
        );
        assert!(meta.engine_version.is_some());
    }

    #[tokio::test]
    async fn missing_working_dir_fails_preparation() {
        let fx = Fixture::new();
        let planner = ComposePlanner::new(
            fx.profile(Hooks::new()),
            fx.work.path().join("missing"),
            fx.engine.clone(),
            fx.shell.clone(),
        );

        let err = planner.plan(Action::Start).await.unwrap_err();
        assert!(matches!(err, PlanError::Preparation(_)));
    }

    #[tokio::test]
    async fn unknown_action_name_is_rejected() {
        let fx = Fixture::new();
        let err = fx.planner(Hooks::new()).plan_named("deploy").await.unwrap_err();
        assert!(matches!(err, PlanError::PlanNotAvailable(_)));
    }

    #[tokio::test]
    async fn hook_error_aborts_planning() {
        let fx = Fixture::new();
        let hooks: Hooks = [Hook::script(HookPhase::PreStart, "missing.sh")].into_iter().collect();

        let err = fx.planner(hooks).plan(Action::Start).await.unwrap_err();

        assert!(err.is_config());
        assert!(fx.shell.get_commands().is_empty());
    }

    #[tokio::test]
    async fn post_start_monitor_uses_configured_timeout() {
        let fx = Fixture::new();
        let hooks: Hooks = [Hook::container(HookPhase::PostStart, "migrations")]
            .into_iter()
            .collect();
        let plan = fx
            .planner(hooks)
            .with_monitor_timeout(Duration::from_secs(5))
            .plan(Action::Start)
            .await
            .unwrap();

        match &plan.steps()[2] {
            Executable::Timeout(step) => assert_eq!(step.timeout(), Duration::from_secs(5)),
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unavailable_engine_still_plans() {
        let fx = Fixture::new();
        fx.engine.set_fail_on("version");
        let plan = fx.planner(Hooks::new()).plan(Action::Stop).await.unwrap();
        assert!(plan.metadata().engine_version.is_none());
    }

    #[tokio::test]
    async fn disabled_probe_leaves_engine_untouched() {
        let fx = Fixture::new();
        let plan = fx
            .planner(Hooks::new())
            .with_engine_probe(false)
            .plan(Action::Restart)
            .await
            .unwrap();

        assert!(plan.metadata().engine_version.is_none());
        assert!(fx.engine.get_commands().is_empty());
    }
}
