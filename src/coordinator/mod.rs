//! Execution coordinator: debounces edits into runs and keeps at most one
//! sandbox alive at a time.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use crate::execution::RunResult;
use crate::markers::{AnnotationSink, MarkerProjector};
use crate::process::{RunHandle, RunId, SandboxConfig, SandboxRunner};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);

/// Receives every delivered result, in the order runs were started.
pub trait ResultSink {
    fn on_run_started(&mut self, _run: RunId) {}
    fn on_result(&mut self, run: RunId, result: &RunResult);
}

#[derive(Debug)]
enum Command {
    SourceChanged(String),
    Rerun,
    Shutdown,
}

pub struct Coordinator<R, A> {
    config: SandboxConfig,
    debounce: Duration,
    results: R,
    projector: MarkerProjector<A>,
    active: Option<RunHandle>,
    latest: Option<String>,
    fire_at: Option<Instant>,
}

impl<R, A> Coordinator<R, A>
where
    R: ResultSink + Send + 'static,
    A: AnnotationSink + Send + 'static,
{
    pub fn new(config: SandboxConfig, debounce: Duration, results: R, annotations: A) -> Self {
        Self {
            config,
            debounce,
            results,
            projector: MarkerProjector::new(annotations),
            active: None,
            latest: None,
            fire_at: None,
        }
    }

    /// Moves the coordinator onto its own task. Must be called from within a
    /// Tokio runtime.
    pub fn spawn(self) -> CoordinatorHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(rx));
        CoordinatorHandle { tx, task }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            let fire_at = self.fire_at;
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::SourceChanged(text)) => {
                        self.latest = Some(text);
                        self.fire_at = Some(Instant::now() + self.debounce);
                    }
                    Some(Command::Rerun) => {
                        if self.latest.is_some() {
                            self.fire_at = Some(Instant::now());
                        }
                    }
                    Some(Command::Shutdown) | None => {
                        self.teardown();
                        break;
                    }
                },
                _ = debounce_elapsed(fire_at) => {
                    self.fire_at = None;
                    self.launch();
                }
                (run, result) = active_finished(&mut self.active) => {
                    self.active = None;
                    if let Some(result) = result {
                        self.deliver(run, &result);
                    }
                }
            }
        }
    }

    /// Retires the active run, then starts a fresh sandbox on the latest text.
    fn launch(&mut self) {
        let Some(source) = self.latest.clone() else {
            return;
        };
        if let Some(mut previous) = self.active.take() {
            if previous.cancel() {
                debug!(run = %previous.id(), "superseded by a newer edit");
            }
        }
        let handle = SandboxRunner::new(self.config.clone()).start(source);
        self.results.on_run_started(handle.id());
        self.active = Some(handle);
    }

    fn deliver(&mut self, run: RunId, result: &RunResult) {
        self.results.on_result(run, result);
        self.projector.project(result);
    }

    fn teardown(&mut self) {
        self.fire_at = None;
        self.latest = None;
        if let Some(mut active) = self.active.take() {
            active.cancel();
        }
        debug!("coordinator stopped");
    }
}

async fn debounce_elapsed(fire_at: Option<Instant>) {
    match fire_at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn active_finished(active: &mut Option<RunHandle>) -> (RunId, Option<RunResult>) {
    match active {
        Some(handle) => (handle.id(), handle.finished().await),
        None => std::future::pending().await,
    }
}

/// Host-side handle to a spawned [`Coordinator`]. Dropping it also tears the
/// coordinator down, but without waiting for it.
#[derive(Debug)]
pub struct CoordinatorHandle {
    tx: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl CoordinatorHandle {
    /// Reports an edit; runs start once edits pause for the debounce interval.
    pub fn source_changed(&self, text: impl Into<String>) {
        let _ = self.tx.send(Command::SourceChanged(text.into()));
    }

    /// Re-runs the latest text without waiting for the debounce.
    pub fn rerun(&self) {
        let _ = self.tx.send(Command::Rerun);
    }

    /// Cancels any active run, drops a pending debounce and waits for the
    /// coordinator task to exit.
    pub async fn shutdown(self) {
        let _ = self.tx.send(Command::Shutdown);
        let _ = self.task.await;
    }
}
