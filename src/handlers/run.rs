//! One-shot handler: run the source once and print what it produced.

use anyhow::Result;
use tracing::info;

use crate::{
    config::Settings,
    execution::RunResult,
    markers::MarkerProjector,
    printer::{ConsolePrinter, TerminalAnnotations},
    process::{run_to_completion, SandboxConfig},
};

/// Runs `source` in a fresh sandbox, prints its console output and, on
/// failure, the offending source line.
pub async fn run(source: &str, settings: &Settings, color: bool) -> Result<RunResult> {
    let config = SandboxConfig::for_current_exe(settings)?;
    let result = run_to_completion(config, source).await;
    info!(
        entries = result.entries.len(),
        failed = !result.is_success(),
        "run finished"
    );

    ConsolePrinter { color }.print(&result);

    let mut projector = MarkerProjector::new(TerminalAnnotations::new(source, color));
    projector.project(&result);
    projector.sink().print();

    Ok(result)
}
