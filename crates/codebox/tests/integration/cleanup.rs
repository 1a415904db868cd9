use std::time::Duration;

use codebox::{ExecutionRequest, ExecutionStatus, ResourceLimits};
use tokio::task::JoinSet;

use super::{leftover_entries, shell_runner};

#[tokio::test]
async fn workspace_root_is_empty_after_every_outcome() {
    let root = tempfile::tempdir().unwrap();
    let runner = shell_runner(root.path());

    let requests = [
        (ExecutionRequest::new("echo ok\n", "sh", ["x"]), ExecutionStatus::Success),
        (ExecutionRequest::new("if then (\n", "sh", ["x"]), ExecutionStatus::RuntimeError),
        (ExecutionRequest::new("exit 1\n", "sh", ["x"]), ExecutionStatus::RuntimeError),
        (
            ExecutionRequest::new("sleep 15\n", "sh", ["x"])
                .with_limits(ResourceLimits::unset().with_timeout_ms(200)),
            ExecutionStatus::RuntimeError,
        ),
        (ExecutionRequest::new("echo hi\n", "missing_compiler", ["x"]), ExecutionStatus::SandboxError),
        (ExecutionRequest::new("echo hi\n", "missing_runtime", ["x"]), ExecutionStatus::SandboxError),
    ];

    for (request, expected) in &requests {
        let response = runner.execute(request).await;
        assert_eq!(response.status, *expected, "{request:?}");
        assert_eq!(leftover_entries(root.path()), 0, "{request:?}");
    }
}

#[tokio::test]
async fn build_artifacts_are_removed() {
    let root = tempfile::tempdir().unwrap();
    let runner = shell_runner(root.path());
    let script = "mkdir -p out/nested\necho data > out/nested/file\necho done\n";

    let response = runner
        .execute(&ExecutionRequest::new(script, "sh", ["x"]))
        .await;

    assert_eq!(response.outputs, vec!["done\n"]);
    assert_eq!(leftover_entries(root.path()), 0);
}

#[tokio::test]
async fn each_request_gets_a_fresh_workspace() {
    let root = tempfile::tempdir().unwrap();
    let runner = shell_runner(root.path());
    let request = ExecutionRequest::new("pwd\n", "sh", ["x"]);

    let first = runner.execute(&request).await;
    let second = runner.execute(&request).await;

    assert_eq!(first.status, ExecutionStatus::Success);
    assert_eq!(second.status, ExecutionStatus::Success);
    assert_ne!(first.outputs, second.outputs);
    assert_eq!(leftover_entries(root.path()), 0);
}

#[tokio::test]
async fn concurrent_requests_do_not_share_workspaces() {
    let root = tempfile::tempdir().unwrap();
    let runner = shell_runner(root.path());
    // a shared directory would let one submission see another's marker
    let script = "touch \"marker-$1\"\nsleep 0.2\nls | grep -c marker\n";

    let mut tasks = JoinSet::new();
    for i in 0..4 {
        let runner = runner.clone();
        tasks.spawn(async move {
            runner
                .execute(&ExecutionRequest::new(script, "sh", [i.to_string()]))
                .await
        });
    }

    while let Some(response) = tasks.join_next().await {
        assert_eq!(response.unwrap().outputs, vec!["1\n"]);
    }
    assert_eq!(leftover_entries(root.path()), 0);
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn cancelled_request_kills_runs_and_removes_workspace() {
    let root = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let pid_file = scratch.path().join("pid");
    let runner = shell_runner(root.path());
    let request = ExecutionRequest::new(
        "echo $$ > \"$1\"\nexec sleep 30\n",
        "sh",
        [pid_file.to_string_lossy().into_owned()],
    );

    let result = tokio::time::timeout(Duration::from_secs(2), runner.execute(&request)).await;
    assert!(result.is_err(), "request should still have been running");
    assert_eq!(leftover_entries(root.path()), 0);

    let pid: i32 = std::fs::read_to_string(&pid_file)
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    let mut alive = true;
    for _ in 0..50 {
        if !is_running(pid) {
            alive = false;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(!alive, "process {pid} survived cancellation");
}

/// Whether `pid` exists and is not a zombie
#[cfg(target_os = "linux")]
fn is_running(pid: i32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit_once(") ")
            .and_then(|(_, rest)| rest.chars().next())
            .is_some_and(|state| state != 'Z'),
        Err(_) => false,
    }
}
