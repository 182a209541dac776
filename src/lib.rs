//! Sandboxed JavaScript playground core.
//!
//! Source text is evaluated in a separate worker process that hosts a fresh
//! JavaScript realm per run. The host collects console output, maps the first
//! uncaught error back to a source line and enforces a wall-clock limit by
//! killing the worker.

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod execution;
pub mod handlers;
pub mod logging;
pub mod markers;
pub mod printer;
pub mod process;
pub mod tui;
pub mod utils;
