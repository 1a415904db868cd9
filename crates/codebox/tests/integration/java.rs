//! End-to-end tests against a real JDK (`javac` and `java` on PATH)

use std::time::{Duration, Instant};

use codebox::{Config, ExecutionRequest, ExecutionStatus, ResourceLimits, Runner};

use super::{fixture_source, leftover_entries};

fn java_runner(root: &std::path::Path) -> Runner {
    Runner::new(Config {
        workspace_root: root.to_path_buf(),
        ..Config::default()
    })
}

#[tokio::test]
async fn java_sum() {
    let root = tempfile::tempdir().unwrap();
    let runner = java_runner(root.path());

    let response = runner
        .execute(&ExecutionRequest::new(fixture_source("Sum.java"), "java", ["3\n4", "10 20 30"]))
        .await;

    assert_eq!(response.status, ExecutionStatus::Success, "{:?}", response.message);
    assert_eq!(response.outputs, vec!["sum = 7\n", "sum = 60\n"]);
    assert_eq!(leftover_entries(root.path()), 0);
}

#[tokio::test]
async fn java_compile_error() {
    let root = tempfile::tempdir().unwrap();
    let runner = java_runner(root.path());

    let response = runner
        .execute(&ExecutionRequest::new(fixture_source("CompileError.java"), "java", ["1"]))
        .await;

    assert_eq!(response.status, ExecutionStatus::RuntimeError);
    assert!(!response.compiled);
    assert!(response.message.unwrap().contains("Main.java"));
    assert_eq!(leftover_entries(root.path()), 0);
}

#[tokio::test]
async fn java_exception_stops_at_failing_input() {
    let root = tempfile::tempdir().unwrap();
    let runner = java_runner(root.path());

    let response = runner
        .execute(&ExecutionRequest::new(fixture_source("Throws.java"), "java", ["a", "boom", "c"]))
        .await;

    assert_eq!(response.status, ExecutionStatus::RuntimeError);
    assert_eq!(response.outputs, vec!["ok a\n"]);
    assert!(response.message.unwrap().contains("IllegalStateException"));
}

#[tokio::test]
async fn java_sleeper_times_out() {
    let root = tempfile::tempdir().unwrap();
    let runner = java_runner(root.path());
    let request = ExecutionRequest::new(fixture_source("Sleeper.java"), "java", ["x"])
        .with_limits(ResourceLimits::unset().with_timeout_ms(2_000));

    let started = Instant::now();
    let response = runner.execute(&request).await;

    assert_eq!(response.status, ExecutionStatus::RuntimeError);
    assert!(response.timed_out());
    assert!(response.max_time_ms >= 2_000);
    assert!(started.elapsed() < Duration::from_secs(14));
    assert_eq!(leftover_entries(root.path()), 0);
}
