//! Watch mode TUI using Ratatui: source with error markers beside the console.

pub mod app;
pub mod events;
pub mod handler;
pub mod ui;

pub use handler::run_tui_watch;
