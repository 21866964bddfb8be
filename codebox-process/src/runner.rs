//! Spawn-and-supervise runner.
//!
//! A run moves through `Spawned -> Running -> {Completed | TimedOut ->
//! Killed}`; a child that cannot be created is reported as
//! [`ProcessError::SpawnFailed`] instead of an outcome.
//!
//! Completion is driven by both output streams reaching end-of-file (and
//! the child then being reaped), not by the bare exit notification, because
//! exit can be observed before buffered output has been delivered.
//!
//! When the deadline fires first the process group receives a graceful
//! signal and a second, fixed grace timer starts. If the child's own exit
//! notification arrives first the forceful signal is never sent. Timers are
//! dropped with whichever branch loses, so nothing fires after a terminal
//! state is reached.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::future::pending;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::error::ProcessError;
use crate::process_group::{KillSignal, signal_child_group};

/// Delay between the graceful and the forceful termination signal.
pub const GRACE_PERIOD: Duration = Duration::from_secs(5);

/// How long readers may keep flushing after a timed-out child is reclaimed.
const DRAIN_WINDOW: Duration = Duration::from_millis(500);
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

const DEFAULT_CAPTURE_LIMIT: usize = 10 * 1024 * 1024; // 10 MB

const READ_CHUNK: usize = 8 * 1024;

/// Lifecycle phase of a supervised child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Spawned,
    Running,
    Completed,
    /// Deadline fired; the child exited within the grace period.
    TimedOut,
    /// Deadline fired and the child had to be forcefully terminated.
    Killed,
    SpawnFailed,
}

/// How the child ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    Code(i32),
    Signal(i32),
    Unknown,
}

impl From<ExitStatus> for ExitState {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::Code(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Self::Signal(signal);
            }
        }
        Self::Unknown
    }
}

impl std::fmt::Display for ExitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Code(code) => write!(f, "exit code {code}"),
            Self::Signal(signal) => write!(f, "signal {signal}"),
            Self::Unknown => f.write_str("unknown exit status"),
        }
    }
}

/// Everything needed to launch and supervise one child.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub current_dir: Option<PathBuf>,
    /// Complete environment of the child; nothing is inherited.
    pub env: BTreeMap<String, String>,
    /// `None` or zero disables the deadline.
    pub timeout: Option<Duration>,
    pub grace_period: Duration,
    pub max_output_bytes: usize,
}

impl ProcessSpec {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            env: BTreeMap::new(),
            timeout: None,
            grace_period: GRACE_PERIOD,
            max_output_bytes: DEFAULT_CAPTURE_LIMIT,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn with_max_output_bytes(mut self, max_output_bytes: usize) -> Self {
        self.max_output_bytes = max_output_bytes;
        self
    }

    fn program_display(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    fn effective_timeout(&self) -> Option<Duration> {
        self.timeout.filter(|timeout| !timeout.is_zero())
    }
}

/// Captured result of a supervised child.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit: ExitState,
    pub timed_out: bool,
    /// Terminal phase: `Completed`, `TimedOut` or `Killed`.
    pub phase: RunPhase,
    pub duration: Duration,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit == ExitState::Code(0)
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Bounded capture shared between a reader task and the supervisor, so the
/// supervisor can seal partial output without waiting for the reader.
#[derive(Debug, Clone)]
struct CaptureBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
    limit: usize,
}

impl CaptureBuffer {
    fn new(limit: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
            limit,
        }
    }

    fn append(&self, chunk: &[u8]) {
        let mut guard = self.inner.lock();
        let remaining = self.limit.saturating_sub(guard.len());
        if remaining > 0 {
            let take = remaining.min(chunk.len());
            guard.extend_from_slice(chunk.get(..take).unwrap_or_default());
        }
    }

    fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.inner.lock())
    }
}

pub struct ProcessRunner;

impl ProcessRunner {
    pub async fn run(spec: ProcessSpec) -> Result<ProcessOutcome, ProcessError> {
        if spec.program.is_empty() {
            return Err(ProcessError::EmptyProgram);
        }

        let program = spec.program_display();
        let start = Instant::now();

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .env_clear()
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.current_dir {
            command.current_dir(dir);
        }
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|source| {
            debug!(program = %program, phase = ?RunPhase::SpawnFailed, error = %source, "spawn failed");
            ProcessError::SpawnFailed {
                program: program.clone(),
                source,
            }
        })?;
        debug!(program = %program, pid = ?child.id(), phase = ?RunPhase::Spawned, "child spawned");

        let stdout = CaptureBuffer::new(spec.max_output_bytes);
        let stderr = CaptureBuffer::new(spec.max_output_bytes);
        let mut stdout_task = tokio::spawn(pump(child.stdout.take(), stdout.clone()));
        let mut stderr_task = tokio::spawn(pump(child.stderr.take(), stderr.clone()));

        let deadline = spec.effective_timeout();
        debug!(program = %program, timeout_ms = ?deadline.map(|d| d.as_millis()), phase = ?RunPhase::Running, "supervising child");

        let finished = tokio::select! {
            status = streams_closed_then_reaped(&mut child, &mut stdout_task, &mut stderr_task) => Some(status),
            () = deadline_elapsed(deadline) => None,
        };

        let (phase, exit) = match finished {
            Some(status) => {
                let status = status.map_err(|source| ProcessError::Io {
                    program: program.clone(),
                    source,
                })?;
                (RunPhase::Completed, ExitState::from(status))
            }
            None => {
                let (phase, status) =
                    terminate_after_deadline(&mut child, &program, spec.grace_period).await;
                drain_readers(&stdout_task, &stderr_task).await;
                (phase, status.map_or(ExitState::Unknown, ExitState::from))
            }
        };

        stdout_task.abort();
        stderr_task.abort();

        let outcome = ProcessOutcome {
            stdout: stdout.take(),
            stderr: stderr.take(),
            exit,
            timed_out: matches!(phase, RunPhase::TimedOut | RunPhase::Killed),
            phase,
            duration: start.elapsed(),
        };
        debug!(
            program = %program,
            phase = ?outcome.phase,
            exit = %outcome.exit,
            stdout_bytes = outcome.stdout.len(),
            stderr_bytes = outcome.stderr.len(),
            duration_ms = outcome.duration.as_millis(),
            "child finished"
        );
        Ok(outcome)
    }
}

async fn pump<R>(reader: Option<R>, sink: CaptureBuffer) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return Ok(());
    };

    let mut buffer = [0u8; READ_CHUNK];
    loop {
        let read = reader.read(&mut buffer).await?;
        if read == 0 {
            return Ok(());
        }
        sink.append(buffer.get(..read).unwrap_or_default());
    }
}

async fn streams_closed_then_reaped(
    child: &mut Child,
    stdout_task: &mut JoinHandle<std::io::Result<()>>,
    stderr_task: &mut JoinHandle<std::io::Result<()>>,
) -> std::io::Result<ExitStatus> {
    let (stdout_done, stderr_done) = tokio::join!(stdout_task, stderr_task);
    for result in [stdout_done, stderr_done] {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(error)) => debug!(%error, "output reader stopped early"),
            Err(error) => debug!(%error, "output reader task failed"),
        }
    }
    child.wait().await
}

async fn deadline_elapsed(deadline: Option<Duration>) {
    match deadline {
        Some(duration) => sleep(duration).await,
        None => pending::<()>().await,
    }
}

async fn terminate_after_deadline(
    child: &mut Child,
    program: &str,
    grace_period: Duration,
) -> (RunPhase, Option<ExitStatus>) {
    warn!(program = %program, grace_ms = grace_period.as_millis(), "deadline reached; sending graceful termination signal");
    if let Err(error) = signal_child_group(child, KillSignal::Term) {
        warn!(program = %program, %error, "failed to deliver graceful termination signal");
    }

    tokio::select! {
        status = child.wait() => {
            debug!(program = %program, "child exited during grace period; forceful signal not needed");
            (RunPhase::TimedOut, status.ok())
        }
        () = sleep(grace_period) => {
            warn!(program = %program, "grace period elapsed; sending forceful termination signal");
            if let Err(error) = signal_child_group(child, KillSignal::Kill) {
                warn!(program = %program, %error, "failed to deliver forceful termination signal");
            }
            if let Err(error) = child.start_kill() {
                debug!(program = %program, %error, "direct kill after group signal failed");
            }
            (RunPhase::Killed, child.wait().await.ok())
        }
    }
}

/// Give readers a bounded window to flush. Handles may already have been
/// consumed by the completion join, so they are observed, never re-polled.
async fn drain_readers(
    stdout_task: &JoinHandle<std::io::Result<()>>,
    stderr_task: &JoinHandle<std::io::Result<()>>,
) {
    let drained = timeout(DRAIN_WINDOW, async {
        while !(stdout_task.is_finished() && stderr_task.is_finished()) {
            sleep(DRAIN_POLL_INTERVAL).await;
        }
    })
    .await;
    if drained.is_err() {
        debug!("output readers still open after drain window; sealing partial output");
    }
}
