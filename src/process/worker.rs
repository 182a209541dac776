//! Worker process entry point: one request in, one response out.

use std::io::{self, BufRead, Write};

use anyhow::{Context as _, Result};
use tracing::debug;

use crate::execution::engine::{self, EngineOptions};
use crate::execution::{WorkerRequest, WorkerResponse};

/// Reads a single request line from stdin, evaluates it and writes a single
/// response line to stdout. Any failure to evaluate is reported inside the
/// response; only a broken channel makes this return an error.
pub fn serve(options: &EngineOptions) -> Result<()> {
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading sandbox request")?;
    let request: WorkerRequest =
        serde_json::from_str(line.trim_end()).context("decoding sandbox request")?;
    debug!(bytes = request.source.len(), "worker received source");

    let response: WorkerResponse = engine::execute(&request.source, options);

    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, &response).context("encoding sandbox response")?;
    stdout.write_all(b"\n")?;
    stdout.flush()?;
    Ok(())
}
