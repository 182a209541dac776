//! Diagnostic logging. Filter comes from `RUNJS_LOG`, default `warn`.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "RUNJS_LOG";
pub const LOG_FILE: &str = "runjs.log";

fn env_filter() -> EnvFilter {
    // Fall back to the default level if the variable is unset or invalid
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new("warn"))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Logs to stderr. Used by one-shot runs and by the worker, whose stdout
/// carries the response.
pub fn init_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .try_init();
}

/// Logs to `<dir>/runjs.log`, for when the terminal belongs to the TUI.
pub fn init_file(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE))?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
    Ok(())
}
