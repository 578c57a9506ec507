//! End-to-end agent scenarios against a real directory and an in-memory
//! history store. These use short real intervals; the cron library drives
//! its own clock.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use engine::{Agent, AgentOptions, WorkflowRuntime, WorkflowStatus};

async fn test_runtime() -> Arc<WorkflowRuntime> {
    let pool = db::pool::create_memory_pool().await.unwrap();
    db::pool::run_migrations(&pool).await.unwrap();
    Arc::new(WorkflowRuntime::new(pool))
}

fn write_workflow(dir: &Path, file: &str, body: &str) {
    std::fs::write(dir.join(file), body).unwrap();
}

fn every_second_workflow(name: &str) -> String {
    format!(
        r#"
name: {name}
trigger:
  type: cron
  schedule: "* * * * * *"
actions:
  - type: bash
    name: succeed
    command: "exit 0"
  - type: bash
    name: report
    command: "printf ok"
"#
    )
}

#[tokio::test]
async fn cron_workflow_fires_and_records_success() {
    let dir = tempfile::tempdir().unwrap();
    write_workflow(dir.path(), "tick.yaml", &every_second_workflow("tick"));

    let runtime = test_runtime().await;
    let agent = Agent::new(
        runtime.clone(),
        AgentOptions {
            workflow_dir: dir.path().to_path_buf(),
            watch: false,
            dry_run: false,
        },
    );

    agent.start().await.unwrap();
    assert_eq!(agent.workflow_count().await, 1);

    tokio::time::sleep(Duration::from_millis(2600)).await;
    agent.shutdown().await;

    let history = db::repository::executions::all_history(&runtime.pool, 50)
        .await
        .unwrap();
    assert!(
        !history.is_empty(),
        "expected at least one execution in 2.6s of an every-second schedule"
    );

    for execution in &history {
        assert_eq!(execution.workflow_name, "tick");
        assert_eq!(execution.trigger_type, "cron");
        assert_eq!(execution.status, "success");

        let action_rows =
            db::repository::actions::actions_for_execution(&runtime.pool, execution.id)
                .await
                .unwrap();
        assert_eq!(action_rows.len(), 2);
        assert!(action_rows.iter().all(|r| r.status == "success"));
    }

    let info = runtime.registry.get("tick").unwrap();
    assert_eq!(info.status, WorkflowStatus::Stopped);
    assert_eq!(info.total_runs as usize, history.len());
    assert_eq!(info.failure_count, 0);
}

#[tokio::test]
async fn no_executions_open_after_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    write_workflow(dir.path(), "tick.yaml", &every_second_workflow("tick"));

    let runtime = test_runtime().await;
    let agent = Agent::new(
        runtime.clone(),
        AgentOptions {
            workflow_dir: dir.path().to_path_buf(),
            watch: false,
            dry_run: false,
        },
    );

    agent.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1600)).await;
    agent.shutdown().await;

    let before = db::repository::executions::all_history(&runtime.pool, 100)
        .await
        .unwrap()
        .len();

    // Long enough for several would-be fires.
    tokio::time::sleep(Duration::from_millis(2200)).await;

    let after = db::repository::executions::all_history(&runtime.pool, 100)
        .await
        .unwrap()
        .len();
    assert_eq!(before, after, "no history record may open after shutdown");
}

#[tokio::test]
async fn filewatch_fires_only_on_configured_events() {
    let dir = tempfile::tempdir().unwrap();
    let watched = dir.path().join("incoming");
    std::fs::create_dir(&watched).unwrap();

    write_workflow(
        dir.path(),
        "watch.yaml",
        &format!(
            r#"
name: on-create
trigger:
  type: filewatch
  path: {}
  events: [create]
actions:
  - type: bash
    name: handle
    command: "printf handled"
"#,
            watched.display()
        ),
    );

    let runtime = test_runtime().await;
    let agent = Agent::new(
        runtime.clone(),
        AgentOptions {
            workflow_dir: dir.path().to_path_buf(),
            watch: false,
            dry_run: false,
        },
    );

    agent.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;

    // Create: matches the configured set.
    let target = watched.join("a.txt");
    std::fs::File::create(&target).unwrap();
    tokio::time::sleep(Duration::from_millis(900)).await;

    let after_create = db::repository::executions::all_history(&runtime.pool, 50)
        .await
        .unwrap();
    assert_eq!(after_create.len(), 1, "create event must fire exactly once");
    assert_eq!(after_create[0].trigger_type, "filewatch");
    assert_eq!(after_create[0].status, "success");

    // Write: not in the configured set.
    std::fs::write(&target, "payload").unwrap();
    tokio::time::sleep(Duration::from_millis(900)).await;

    // Remove: not in the configured set either.
    std::fs::remove_file(&target).unwrap();
    tokio::time::sleep(Duration::from_millis(900)).await;

    let total = db::repository::executions::all_history(&runtime.pool, 50)
        .await
        .unwrap();
    assert_eq!(total.len(), 1, "write/remove events must not fire");

    agent.shutdown().await;
}

#[tokio::test]
async fn bad_document_does_not_stop_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    write_workflow(dir.path(), "good.yaml", &every_second_workflow("good"));
    write_workflow(dir.path(), "bad.yaml", "name: [this is not a workflow\n");

    let runtime = test_runtime().await;
    let agent = Agent::new(
        runtime.clone(),
        AgentOptions {
            workflow_dir: dir.path().to_path_buf(),
            watch: false,
            dry_run: false,
        },
    );

    agent.start().await.unwrap();
    assert_eq!(agent.workflow_count().await, 1);
    assert!(runtime.registry.get("good").is_some());

    agent.shutdown().await;
}

#[tokio::test]
async fn hot_reload_replaces_a_workflow() {
    let dir = tempfile::tempdir().unwrap();
    write_workflow(dir.path(), "job.yaml", &every_second_workflow("job-v1"));

    let runtime = test_runtime().await;
    let agent = Agent::new(
        runtime.clone(),
        AgentOptions {
            workflow_dir: dir.path().to_path_buf(),
            watch: true,
            dry_run: false,
        },
    );

    agent.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;

    // Rewrite the document under a new workflow name.
    write_workflow(dir.path(), "job.yaml", &every_second_workflow("job-v2"));

    // Settle delay (500ms) plus watcher latency.
    tokio::time::sleep(Duration::from_millis(2000)).await;

    let active = runtime.registry.active();
    assert!(
        active.iter().any(|info| info.name == "job-v2"),
        "replacement workflow must be active, got {active:?}"
    );
    assert!(
        !active.iter().any(|info| info.name == "job-v1"),
        "replaced workflow must no longer be active"
    );
    assert_eq!(agent.workflow_count().await, 1);

    // The old task is fully cancelled: its execution count stays flat.
    let v1_before = db::repository::executions::workflow_history(&runtime.pool, "job-v1", 100)
        .await
        .unwrap()
        .len();
    tokio::time::sleep(Duration::from_millis(2200)).await;
    let v1_after = db::repository::executions::workflow_history(&runtime.pool, "job-v1", 100)
        .await
        .unwrap()
        .len();
    assert_eq!(v1_before, v1_after, "replaced workflow must not keep firing");

    agent.shutdown().await;
}

#[tokio::test]
async fn removing_a_document_stops_its_workflow() {
    let dir = tempfile::tempdir().unwrap();
    write_workflow(dir.path(), "gone.yaml", &every_second_workflow("gone"));

    let runtime = test_runtime().await;
    let agent = Agent::new(
        runtime.clone(),
        AgentOptions {
            workflow_dir: dir.path().to_path_buf(),
            watch: true,
            dry_run: false,
        },
    );

    agent.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;

    std::fs::remove_file(dir.path().join("gone.yaml")).unwrap();
    tokio::time::sleep(Duration::from_millis(1200)).await;

    assert_eq!(agent.workflow_count().await, 0);
    assert!(runtime.registry.active().is_empty());

    agent.shutdown().await;
}

#[tokio::test]
async fn missing_watch_path_marks_the_workflow_errored() {
    let dir = tempfile::tempdir().unwrap();
    write_workflow(
        dir.path(),
        "ghost.yaml",
        r#"
name: ghost
trigger:
  type: filewatch
  path: /definitely/not/a/real/path
  events: [create]
actions:
  - type: bash
    name: x
    command: "true"
"#,
    );

    let runtime = test_runtime().await;
    let agent = Agent::new(
        runtime.clone(),
        AgentOptions {
            workflow_dir: dir.path().to_path_buf(),
            watch: false,
            dry_run: false,
        },
    );

    agent.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let info = runtime.registry.get("ghost").unwrap();
    assert_eq!(info.status, WorkflowStatus::Error);
    assert!(info
        .last_error
        .as_deref()
        .unwrap()
        .contains("watch path does not exist"));

    agent.shutdown().await;
}
