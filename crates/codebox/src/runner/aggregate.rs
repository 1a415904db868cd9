//! Folding run outcomes into a response

use crate::types::{ExecutionOutcome, ExecutionResponse, ExecutionStatus};

/// Fold ordered outcomes into a response
///
/// Accumulation stops at the first outcome with non-empty stderr. That
/// outcome decides the status and message; only the stdouts before it are
/// kept. `max_time_ms` covers every outcome up to and including the stop.
pub fn aggregate(mut outcomes: Vec<ExecutionOutcome>) -> ExecutionResponse {
    let stop = outcomes.iter().position(ExecutionOutcome::is_failure);
    if let Some(index) = stop {
        outcomes.truncate(index + 1);
    }

    let max_time_ms = outcomes
        .iter()
        .map(|outcome| outcome.elapsed_ms)
        .max()
        .unwrap_or(0);

    let (status, message, passed) = match stop.and_then(|index| outcomes.get(index)) {
        Some(failed) if failed.spawn_failed => (
            ExecutionStatus::SandboxError,
            Some(failed.stderr.clone()),
            outcomes.len() - 1,
        ),
        Some(failed) => (
            ExecutionStatus::RuntimeError,
            Some(failed.stderr.clone()),
            outcomes.len() - 1,
        ),
        None => (ExecutionStatus::Success, None, outcomes.len()),
    };

    let outputs = outcomes[..passed]
        .iter()
        .map(|outcome| outcome.stdout.clone())
        .collect();

    ExecutionResponse {
        outputs,
        status,
        message,
        max_time_ms,
        outcomes,
        compiled: true,
    }
}
