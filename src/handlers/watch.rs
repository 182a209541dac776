//! Watch handler: live re-runs in the TUI.

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use is_terminal::IsTerminal;

use crate::{cache::SnippetStore, config::Settings, tui::run_tui_watch};

/// Watches `file`, or the stored snippet when no file is given.
pub async fn run(file: Option<PathBuf>, store: SnippetStore, settings: &Settings) -> Result<()> {
    if !io::stdout().is_terminal() {
        eprintln!("Warning: watch mode needs a terminal. Run without --watch for one-shot output.");
        return Err(anyhow::anyhow!("TUI mode requires a proper terminal environment"));
    }

    let path = match file {
        Some(path) => path,
        None => {
            if !store.exists() {
                store.save(&store.load())?;
            }
            store.file_path()
        }
    };

    run_tui_watch(path, store, settings).await
}
