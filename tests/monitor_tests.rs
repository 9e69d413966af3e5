use devenv::PlanError;
use devenv::domain::ContainerSummary;
use devenv::plan::monitor::{COMPOSE_PROJECT_LABEL, COMPOSE_SERVICE_LABEL};
use devenv::plan::{ContainerMonitor, ContainerResolver, ExecOption, Executable};
use devenv::test_support::{LogSource, MockEngine, encode_frame};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn compose_container(id: &str, service: &str) -> ContainerSummary {
    let name = format!("/shop-{service}-1");
    ContainerSummary::new(id, &[name.as_str()])
        .with_label(COMPOSE_PROJECT_LABEL, "shop")
        .with_label(COMPOSE_SERVICE_LABEL, service)
}

fn monitor(engine: &Arc<MockEngine>, names: &[&str]) -> ContainerMonitor {
    ContainerMonitor::new(
        engine.clone(),
        names.iter().map(|n| n.to_string()).collect(),
    )
    .with_resolver(ContainerResolver::compose("shop"))
}

async fn run(step: impl Into<Executable>) -> Result<(), PlanError> {
    let step: Executable = step.into();
    step.exec(&CancellationToken::new(), ExecOption::default())
        .await
}

#[tokio::test]
async fn test_interleaved_streams_all_end_cleanly() {
    let engine = Arc::new(MockEngine::new());
    engine.add_container(compose_container("aaa", "migrations"));
    engine.add_container(compose_container("bbb", "seed"));

    let mut migrations = Vec::new();
    for i in 0..20 {
        migrations.extend(encode_frame(1, format!("step {i}\n").as_bytes()));
    }
    engine.set_logs("aaa", LogSource::Bytes(migrations));
    engine.set_logs("bbb", LogSource::Bytes(encode_frame(2, b"seeded\r\n")));

    run(monitor(&engine, &["migrations", "seed"])).await.unwrap();

    let commands = engine.get_commands();
    assert_eq!(commands.len(), 3);
    assert_eq!(commands[0], "list");
}

#[tokio::test]
async fn test_failures_are_reported_in_request_order() {
    let engine = Arc::new(MockEngine::new());
    engine.add_container(compose_container("aaa", "migrations"));
    engine.add_container(compose_container("bbb", "seed"));
    engine.add_container(compose_container("ccc", "fixtures"));
    engine.set_logs("aaa", LogSource::OpenError("gone".into()));
    engine.set_logs("bbb", LogSource::Bytes(encode_frame(1, b"fine\n")));
    let mut broken = encode_frame(1, b"loading\n");
    broken.extend_from_slice(&[1, 0, 0, 0, 0, 0, 0, 9, b'x']);
    engine.set_logs("ccc", LogSource::Bytes(broken));

    let err = run(monitor(&engine, &["fixtures", "seed", "migrations"]))
        .await
        .unwrap_err();

    match err {
        PlanError::Stream(names) => assert_eq!(names, vec!["fixtures", "migrations"]),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_resolution_failure_lists_every_missing_name() {
    let engine = Arc::new(MockEngine::new());
    engine.add_container(compose_container("aaa", "migrations"));
    // same service name under a different project
    engine.add_container(
        ContainerSummary::new("zzz", &["/blog-seed-1"])
            .with_label(COMPOSE_PROJECT_LABEL, "blog")
            .with_label(COMPOSE_SERVICE_LABEL, "seed"),
    );

    let err = run(monitor(&engine, &["seed", "migrations", "fixtures"]))
        .await
        .unwrap_err();

    assert!(matches!(err, PlanError::Resolution(ref names) if names == &["seed", "fixtures"]));
    assert_eq!(engine.get_commands(), vec!["list"]);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_releases_open_streams() {
    let engine = Arc::new(MockEngine::new());
    engine.add_container(compose_container("aaa", "migrations"));
    engine.add_container(compose_container("bbb", "seed"));
    engine.set_logs("aaa", LogSource::Pending);
    engine.set_logs("bbb", LogSource::Bytes(encode_frame(1, b"seeded\n")));

    let step: Executable = monitor(&engine, &["migrations", "seed"])
        .with_description("post-start containers")
        .with_timeout(Duration::from_secs(30))
        .into();

    let err = step
        .exec(&CancellationToken::new(), ExecOption::default())
        .await
        .unwrap_err();

    match err {
        PlanError::Timeout { step, timeout } => {
            assert_eq!(timeout, Duration::from_secs(30));
            assert!(step.starts_with("post-start containers"));
        }
        other => panic!("unexpected error: {other}"),
    }

    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(engine.pending_streams_closed().await);
}

#[tokio::test(start_paused = true)]
async fn test_streams_stay_open_until_timeout() {
    let engine = Arc::new(MockEngine::new());
    engine.add_container(compose_container("aaa", "migrations"));
    engine.set_logs("aaa", LogSource::Pending);

    let step: Executable = monitor(&engine, &["migrations"])
        .with_timeout(Duration::from_secs(30))
        .into();
    let cancel = CancellationToken::new();
    let mut running = step.exec(&cancel, ExecOption::default());

    let early = tokio::time::timeout(Duration::from_secs(10), &mut running).await;
    assert!(early.is_err(), "monitor should still be waiting");
    assert!(!engine.pending_streams_closed().await);

    let err = running.await.unwrap_err();
    assert!(matches!(err, PlanError::Timeout { .. }));
}

#[tokio::test]
async fn test_dry_run_opens_nothing() {
    let engine = Arc::new(MockEngine::new());
    let step: Executable = monitor(&engine, &["migrations"])
        .with_timeout(Duration::from_secs(30))
        .into();

    step.exec(&CancellationToken::new(), ExecOption::new(false, true))
        .await
        .unwrap();

    assert!(engine.get_commands().is_empty());
    assert_eq!(step.dry_run_line(), "- containers: migrations");
}
