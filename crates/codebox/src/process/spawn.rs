//! Deadline-bounded process execution
//!
//! The child's exit races a timer inside one `select!`. stdout and stderr are
//! drained by their own tasks from the moment of spawn, so a child filling
//! either pipe never stalls.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::process::ProcessError;
use crate::process::command::ProcessCommand;

/// How long to wait for output pipes to close after the child is reaped
const DRAIN_GRACE: Duration = Duration::from_secs(1);

const READ_CHUNK: usize = 8 * 1024;

/// Captured result of a finished child process
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// Exit code if the process exited normally
    pub exit_code: Option<i32>,

    /// Signal number if the process was killed by a signal
    pub signal: Option<i32>,

    pub stdout: Vec<u8>,

    pub stderr: Vec<u8>,

    /// Wall clock time from spawn until the child was reaped
    pub elapsed: Duration,

    /// Whether the deadline fired and the process was killed
    pub timed_out: bool,

    /// Whether either stream exceeded the output cap
    pub truncated: bool,

    /// Whether a stream was still open when the drain grace period ran out.
    ///
    /// A descendant that left the process group still holds the pipe, so the
    /// captured output may be incomplete.
    pub stream_left_open: bool,
}

impl ProcessOutput {
    /// Check if the process exited on its own with code 0
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Run a command to completion or until `deadline` elapses
///
/// On deadline the child's process group is sent SIGKILL and the returned
/// output has `timed_out` set. Whatever was written before the kill is kept.
#[instrument(skip(command), fields(program = command.program()))]
pub async fn run_with_deadline(
    command: &ProcessCommand,
    deadline: Duration,
) -> Result<ProcessOutput, ProcessError> {
    let started = Instant::now();
    let mut child = command
        .build()
        .spawn()
        .map_err(|source| ProcessError::SpawnFailed {
            program: command.program().to_owned(),
            source,
        })?;
    let mut group = ProcessGroup::new(child.id());

    debug!(pid = ?child.id(), args = ?command.get_args(), "spawned child process");

    let limit = command.max_output_bytes();
    let stdout = child.stdout.take().ok_or(ProcessError::MissingPipe("stdout"))?;
    let stderr = child.stderr.take().ok_or(ProcessError::MissingPipe("stderr"))?;
    let mut stdout_drain = Drain::spawn(stdout, limit);
    let mut stderr_drain = Drain::spawn(stderr, limit);

    let stdin_task = match (command.stdin_data(), child.stdin.take()) {
        (Some(data), Some(mut stdin)) => {
            let data = data.to_vec();
            Some(tokio::spawn(async move {
                if let Err(e) = stdin.write_all(&data).await {
                    debug!(error = %e, "child closed stdin before input was written");
                }
                // stdin is dropped here, signalling EOF
            }))
        }
        _ => None,
    };

    let (status, timed_out) = tokio::select! {
        status = child.wait() => (status?, false),
        () = tokio::time::sleep(deadline) => {
            debug!(?deadline, "deadline reached, killing process group");
            group.kill();
            if let Err(e) = child.start_kill() {
                debug!(error = %e, "child already exited");
            }
            (child.wait().await?, true)
        }
    };
    let elapsed = started.elapsed();

    // Leftover members of the group would hold the pipes open
    group.kill();
    if let Some(task) = stdin_task {
        task.abort();
    }

    let stdout = stdout_drain.collect("stdout").await?;
    let stderr = stderr_drain.collect("stderr").await?;

    #[cfg(unix)]
    let signal = {
        use std::os::unix::process::ExitStatusExt;
        status.signal()
    };
    #[cfg(not(unix))]
    let signal = None;

    let output = ProcessOutput {
        exit_code: status.code(),
        signal,
        stdout: stdout.bytes,
        stderr: stderr.bytes,
        elapsed,
        timed_out,
        truncated: stdout.truncated || stderr.truncated,
        stream_left_open: stdout.left_open || stderr.left_open,
    };

    debug!(
        exit_code = ?output.exit_code,
        signal = ?output.signal,
        elapsed_ms = output.elapsed_ms(),
        timed_out,
        "child process finished"
    );

    Ok(output)
}

#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    truncated: bool,
    left_open: bool,
}

/// A stream being read by its own task into a buffer shared with the caller
struct Drain {
    task: JoinHandle<io::Result<()>>,
    captured: Arc<Mutex<Captured>>,
}

impl Drain {
    fn spawn<R>(reader: R, limit: Option<usize>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let captured = Arc::new(Mutex::new(Captured::default()));
        let task = tokio::spawn(drain(reader, limit, Arc::clone(&captured)));
        Self { task, captured }
    }

    /// Wait for EOF, giving up after [`DRAIN_GRACE`]
    ///
    /// Bytes read before giving up are kept and the capture is marked
    /// `left_open`.
    async fn collect(&mut self, stream: &'static str) -> Result<Captured, ProcessError> {
        match tokio::time::timeout(DRAIN_GRACE, &mut self.task).await {
            Ok(joined) => joined.map_err(|e| ProcessError::Join(e.to_string()))??,
            Err(_) => {
                self.task.abort();
                warn!(stream, "stream still open after the process exited, keeping output read so far");
                lock(&self.captured).left_open = true;
            }
        }
        Ok(std::mem::take(&mut *lock(&self.captured)))
    }
}

fn lock(captured: &Mutex<Captured>) -> MutexGuard<'_, Captured> {
    captured.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Read a stream to EOF, keeping at most `limit` bytes
async fn drain<R>(mut reader: R, limit: Option<usize>, captured: Arc<Mutex<Captured>>) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        // The guard must not live across the next read
        let mut captured = lock(&captured);
        let room = limit.map_or(n, |limit| limit.saturating_sub(captured.bytes.len()).min(n));
        captured.bytes.extend_from_slice(&chunk[..room]);
        if room < n {
            captured.truncated = true;
        }
        drop(captured);
    }
}

/// Kills the child's process group, at the latest when dropped
///
/// The child is spawned as the leader of its own group, so the group ID is
/// its PID.
#[derive(Debug)]
struct ProcessGroup {
    pgid: Option<i32>,
    killed: bool,
}

impl ProcessGroup {
    fn new(pid: Option<u32>) -> Self {
        Self {
            pgid: pid.and_then(|pid| i32::try_from(pid).ok()),
            killed: false,
        }
    }

    fn kill(&mut self) {
        self.killed = true;

        #[cfg(unix)]
        if let Some(pgid) = self.pgid {
            use nix::errno::Errno;
            use nix::sys::signal::{Signal, killpg};
            use nix::unistd::Pid;

            match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(e) => debug!(pgid, error = %e, "failed to kill process group"),
            }
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        if !self.killed {
            self.kill();
        }
    }
}
