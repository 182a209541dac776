//! Sandbox runner: one worker process per run, supervised from the host.
//!
//! A run moves through `Idle -> Starting -> Running` and then exactly one of
//! `Completed`, `Failed`, `TimedOut` or `Cancelled`. The first terminal
//! transition wins; whoever loses the race delivers nothing, so a run can
//! never produce two results.

use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use crate::config::Settings;
use crate::execution::{RunResult, RuntimeError, WorkerRequest, WorkerResponse};

pub mod worker;

pub const DEFAULT_DEADLINE: Duration = Duration::from_millis(2000);

#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("failed to launch sandbox worker {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("cannot locate the runjs executable: {0}")]
    CurrentExe(#[source] io::Error),
    #[error("sandbox worker has no {0} pipe")]
    MissingPipe(&'static str),
    #[error("sandbox channel error: {0}")]
    Io(#[from] io::Error),
    #[error("sandbox worker exited without a response ({0})")]
    NoResponse(ExitStatus),
    #[error("malformed sandbox response: {0}")]
    Protocol(#[from] serde_json::Error),
}

/// How to launch the isolated worker for a run.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Wall-clock limit measured from `start()`.
    pub deadline: Duration,
    /// Pass worker stderr through instead of discarding it.
    pub inherit_stderr: bool,
}

impl SandboxConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            deadline: DEFAULT_DEADLINE,
            inherit_stderr: false,
        }
    }

    /// Config for a `runjs` binary at `program` acting as the worker.
    pub fn worker(program: impl Into<PathBuf>, loop_guard: Option<u64>) -> Self {
        Self::new(program).with_args(worker_args(loop_guard))
    }

    /// Re-executes the running binary as the worker.
    pub fn for_current_exe(settings: &Settings) -> Result<Self, SandboxError> {
        let exe = std::env::current_exe().map_err(SandboxError::CurrentExe)?;
        Ok(Self::worker(exe, settings.loop_guard)
            .with_deadline(settings.timeout)
            .with_inherit_stderr(settings.worker_stderr))
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_inherit_stderr(mut self, inherit: bool) -> Self {
        self.inherit_stderr = inherit;
        self
    }
}

/// Command-line arguments that put the `runjs` binary into worker mode.
pub fn worker_args(loop_guard: Option<u64>) -> Vec<String> {
    match loop_guard {
        Some(limit) => vec!["--worker".into(), "--loop-limit".into(), limit.to_string()],
        None => vec!["--worker".into(), "--no-loop-guard".into()],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Starting,
    Running,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Failed | RunState::TimedOut | RunState::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(u64);

impl RunId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        RunId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct StateCell(Arc<Mutex<RunState>>);

impl StateCell {
    fn new(state: RunState) -> Self {
        Self(Arc::new(Mutex::new(state)))
    }

    fn get(&self) -> RunState {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn advance(&self, from: RunState, to: RunState) -> bool {
        let mut state = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == from {
            *state = to;
            true
        } else {
            false
        }
    }

    /// Moves into `terminal` unless some terminal state was reached first.
    fn settle(&self, terminal: RunState) -> bool {
        let mut state = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if state.is_terminal() {
            false
        } else {
            *state = terminal;
            true
        }
    }
}

/// A single-use sandbox. `start` consumes it; a new run needs a new runner.
#[derive(Debug)]
pub struct SandboxRunner {
    id: RunId,
    config: SandboxConfig,
    state: StateCell,
}

impl SandboxRunner {
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            id: RunId::next(),
            config,
            state: StateCell::new(RunState::Idle),
        }
    }

    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn state(&self) -> RunState {
        self.state.get()
    }

    /// Launches the run in the background and returns immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(self, source: impl Into<String>) -> RunHandle {
        let deadline = Instant::now() + self.config.deadline;
        self.state.advance(RunState::Idle, RunState::Starting);
        debug!(run = %self.id, "run starting");

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let (outcome_tx, outcome_rx) = oneshot::channel();
        tokio::spawn(supervise(
            self.id,
            self.config,
            source.into(),
            self.state.clone(),
            deadline,
            cancel_rx,
            outcome_tx,
        ));

        RunHandle {
            id: self.id,
            state: self.state,
            cancel: Some(cancel_tx),
            outcome: outcome_rx,
            settled: false,
        }
    }
}

/// Identifies one in-flight run. Dropping a non-terminal handle cancels it.
#[derive(Debug)]
pub struct RunHandle {
    id: RunId,
    state: StateCell,
    cancel: Option<oneshot::Sender<()>>,
    outcome: oneshot::Receiver<RunResult>,
    settled: bool,
}

impl RunHandle {
    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn state(&self) -> RunState {
        self.state.get()
    }

    /// Kills the worker unless the run already finished. Returns whether this
    /// call moved the run to `Cancelled`.
    pub fn cancel(&mut self) -> bool {
        if !self.state.settle(RunState::Cancelled) {
            return false;
        }
        debug!(run = %self.id, "run cancelled");
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
        true
    }

    /// Waits for the run's result; `None` when it was cancelled.
    ///
    /// Cancel-safe, so it can be used as a `tokio::select!` branch.
    pub async fn finished(&mut self) -> Option<RunResult> {
        if self.settled {
            return None;
        }
        let result = (&mut self.outcome).await.ok();
        self.settled = true;
        result
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Starts a fresh runner and waits for its result.
pub async fn run_to_completion(config: SandboxConfig, source: impl Into<String>) -> RunResult {
    let mut handle = SandboxRunner::new(config).start(source);
    handle
        .finished()
        .await
        .unwrap_or_else(|| RunResult::failed(Vec::new(), RuntimeError::new("Run was cancelled", None)))
}

enum Verdict {
    Cancelled,
    TimedOut,
    Exchanged(Result<WorkerResponse, SandboxError>),
}

async fn supervise(
    id: RunId,
    config: SandboxConfig,
    source: String,
    state: StateCell,
    deadline: Instant,
    cancel: oneshot::Receiver<()>,
    outcome: oneshot::Sender<RunResult>,
) {
    let mut child = match spawn(&config) {
        Ok(child) => child,
        Err(err) => {
            warn!(run = %id, error = %err, "sandbox worker did not start");
            if state.settle(RunState::Failed) {
                let _ = outcome.send(transport_failure(&err));
            }
            return;
        }
    };

    if !state.advance(RunState::Starting, RunState::Running) {
        kill(&mut child).await;
        return;
    }
    debug!(run = %id, pid = ?child.id(), "run running");

    let verdict = tokio::select! {
        _ = cancel => Verdict::Cancelled,
        _ = sleep_until(deadline) => Verdict::TimedOut,
        response = exchange(&mut child, &source) => Verdict::Exchanged(response),
    };

    match verdict {
        Verdict::Cancelled => {
            kill(&mut child).await;
            state.settle(RunState::Cancelled);
        }
        Verdict::TimedOut => {
            kill(&mut child).await;
            if state.settle(RunState::TimedOut) {
                warn!(run = %id, deadline_ms = config.deadline.as_millis() as u64, "run timed out");
                let _ = outcome.send(RunResult::failed(Vec::new(), RuntimeError::timed_out()));
            }
        }
        Verdict::Exchanged(Ok(result)) => {
            let terminal = if result.is_success() {
                RunState::Completed
            } else {
                RunState::Failed
            };
            if state.settle(terminal) {
                debug!(run = %id, state = ?terminal, entries = result.entries.len(), "run finished");
                let _ = outcome.send(result);
            }
        }
        Verdict::Exchanged(Err(err)) => {
            kill(&mut child).await;
            if state.settle(RunState::Failed) {
                warn!(run = %id, error = %err, "sandbox transport failed");
                let _ = outcome.send(transport_failure(&err));
            }
        }
    }
}

fn spawn(config: &SandboxConfig) -> Result<Child, SandboxError> {
    let stderr = if config.inherit_stderr {
        Stdio::inherit()
    } else {
        Stdio::null()
    };
    Command::new(&config.program)
        .args(&config.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(stderr)
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| SandboxError::Spawn {
            program: config.program.display().to_string(),
            source,
        })
}

/// Sends the request, then reads the single response line.
async fn exchange(child: &mut Child, source: &str) -> Result<WorkerResponse, SandboxError> {
    let mut stdin = child.stdin.take().ok_or(SandboxError::MissingPipe("stdin"))?;
    let stdout = child.stdout.take().ok_or(SandboxError::MissingPipe("stdout"))?;

    let mut request = serde_json::to_vec(&WorkerRequest {
        source: source.to_string(),
    })?;
    request.push(b'\n');
    stdin.write_all(&request).await?;
    stdin.shutdown().await?;
    drop(stdin);

    let mut line = String::new();
    let read = BufReader::new(stdout).read_line(&mut line).await?;
    let status = child.wait().await?;
    if read == 0 {
        return Err(SandboxError::NoResponse(status));
    }
    Ok(serde_json::from_str(line.trim_end())?)
}

async fn kill(child: &mut Child) {
    let _ = child.start_kill();
    let _ = child.wait().await;
}

fn transport_failure(err: &SandboxError) -> RunResult {
    RunResult::failed(Vec::new(), RuntimeError::new(err.to_string(), None))
}
