use std::sync::{Arc, Mutex};
use std::time::Duration;

use runjs::coordinator::{Coordinator, CoordinatorHandle, ResultSink};
use runjs::execution::{LogEntry, RunResult};
use runjs::markers::{Annotation, AnnotationSet, AnnotationSink};
use runjs::process::{worker_args, RunId, SandboxConfig};
use tokio::sync::mpsc;
use tokio::time::timeout;

const WORKER: &str = env!("CARGO_BIN_EXE_runjs");

struct Recorder {
    tx: mpsc::UnboundedSender<(RunId, RunResult)>,
    started: Arc<Mutex<Vec<RunId>>>,
}

impl ResultSink for Recorder {
    fn on_run_started(&mut self, run: RunId) {
        self.started.lock().unwrap().push(run);
    }

    fn on_result(&mut self, run: RunId, result: &RunResult) {
        let _ = self.tx.send((run, result.clone()));
    }
}

#[derive(Clone, Default)]
struct SharedAnnotations(Arc<Mutex<AnnotationSet>>);

impl AnnotationSink for SharedAnnotations {
    fn set_annotations(&mut self, annotations: &[Annotation]) {
        self.0.lock().unwrap().set_annotations(annotations);
    }

    fn clear_annotations(&mut self) {
        self.0.lock().unwrap().clear_annotations();
    }

    fn reveal_line(&mut self, line: u32) {
        self.0.lock().unwrap().reveal_line(line);
    }
}

struct Harness {
    handle: CoordinatorHandle,
    results: mpsc::UnboundedReceiver<(RunId, RunResult)>,
    started: Arc<Mutex<Vec<RunId>>>,
    annotations: SharedAnnotations,
}

fn spawn(debounce: Duration) -> Harness {
    let config = SandboxConfig::new(WORKER)
        .with_args(worker_args(None))
        .with_deadline(Duration::from_secs(20));
    let (tx, results) = mpsc::unbounded_channel();
    let started = Arc::new(Mutex::new(Vec::new()));
    let annotations = SharedAnnotations::default();
    let recorder = Recorder {
        tx,
        started: started.clone(),
    };
    let handle = Coordinator::new(config, debounce, recorder, annotations.clone()).spawn();
    Harness {
        handle,
        results,
        started,
        annotations,
    }
}

async fn next_result(harness: &mut Harness) -> (RunId, RunResult) {
    timeout(Duration::from_secs(20), harness.results.recv())
        .await
        .expect("result within 20s")
        .expect("coordinator still running")
}

fn texts(result: &RunResult) -> Vec<String> {
    result.entries.iter().map(LogEntry::text).collect()
}

#[tokio::test]
async fn test_rapid_edits_collapse_into_one_run() {
    let mut harness = spawn(Duration::from_millis(100));
    harness.handle.source_changed("console.log(1)");
    harness.handle.source_changed("console.log(2)");
    harness.handle.source_changed("console.log(3)");

    let (_, result) = next_result(&mut harness).await;
    assert_eq!(texts(&result), vec!["3"]);

    let extra = timeout(Duration::from_millis(500), harness.results.recv()).await;
    assert!(extra.is_err(), "only one run expected");
    assert_eq!(harness.started.lock().unwrap().len(), 1);
    harness.handle.shutdown().await;
}

#[tokio::test]
async fn test_new_edit_supersedes_running_program() {
    let mut harness = spawn(Duration::from_millis(20));
    harness.handle.source_changed("while(true){}");
    tokio::time::sleep(Duration::from_millis(300)).await;
    harness.handle.source_changed("console.log('second')");

    let (run, result) = next_result(&mut harness).await;
    assert_eq!(texts(&result), vec!["second"]);

    let started = harness.started.lock().unwrap().clone();
    assert_eq!(started.len(), 2);
    // The superseded run delivered nothing; the result belongs to the newest run.
    assert_eq!(run, started[1]);
    harness.handle.shutdown().await;
}

#[tokio::test]
async fn test_error_is_projected_onto_annotations() {
    let mut harness = spawn(Duration::from_millis(10));
    harness
        .handle
        .source_changed("console.log(1);\nthrow new Error('bad');");
    let (_, result) = next_result(&mut harness).await;
    assert!(result.error.is_some());

    let annotations = harness.annotations.clone();
    harness.handle.shutdown().await;

    let set = annotations.0.lock().unwrap();
    assert_eq!(set.annotations().len(), 1);
    let annotation = &set.annotations()[0];
    assert!(annotation.message.contains("bad"));
    assert!((1..=2).contains(&annotation.line));
    assert_eq!(set.revealed(), Some(annotation.line));
}

#[tokio::test]
async fn test_success_clears_previous_annotation() {
    let mut harness = spawn(Duration::from_millis(10));
    harness.handle.source_changed("throw new Error('bad');");
    next_result(&mut harness).await;
    harness.handle.source_changed("console.log('fixed');");
    let (_, result) = next_result(&mut harness).await;
    assert!(result.is_success());

    let annotations = harness.annotations.clone();
    harness.handle.shutdown().await;
    assert!(annotations.0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_rerun_uses_latest_text() {
    let mut harness = spawn(Duration::from_millis(10));
    harness.handle.rerun(); // nothing to run yet
    harness.handle.source_changed("console.log('again')");
    let (first, _) = next_result(&mut harness).await;

    harness.handle.rerun();
    let (second, result) = next_result(&mut harness).await;
    assert_eq!(texts(&result), vec!["again"]);
    assert_ne!(first, second);
    harness.handle.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_cancels_active_run() {
    let mut harness = spawn(Duration::from_millis(10));
    harness.handle.source_changed("while(true){}");
    tokio::time::sleep(Duration::from_millis(200)).await;
    harness.handle.shutdown().await;

    // The sink is dropped with the coordinator and the cancelled run delivers nothing.
    let next = timeout(Duration::from_secs(5), harness.results.recv()).await;
    assert!(matches!(next, Ok(None)));
}

#[tokio::test]
async fn test_shutdown_drops_pending_debounce() {
    let mut harness = spawn(Duration::from_millis(300));
    harness.handle.source_changed("console.log(1)");
    harness.handle.shutdown().await;

    let next = timeout(Duration::from_secs(1), harness.results.recv()).await;
    assert!(matches!(next, Ok(None)));
    assert!(harness.started.lock().unwrap().is_empty());
}
