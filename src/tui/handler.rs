//! Async event handler for the watch TUI.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{
    app::App,
    events::{ChannelSink, TuiEvent},
    ui::render_ui,
};
use crate::{
    cache::SnippetStore,
    config::Settings,
    coordinator::{Coordinator, CoordinatorHandle},
    process::SandboxConfig,
};

const PAGE: usize = 10;

/// Run the watch TUI on `path` until the user quits. Every change read from
/// disk is saved to `store` and handed to the coordinator.
pub async fn run_tui_watch(path: PathBuf, store: SnippetStore, settings: &Settings) -> Result<()> {
    if !io::IsTerminal::is_terminal(&io::stdout()) {
        return Err(anyhow::anyhow!("TUI mode requires a proper terminal environment"));
    }

    let initial = fs::read_to_string(&path)?;
    let sandbox = SandboxConfig::for_current_exe(settings)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(path.display().to_string(), &initial);
    let (event_tx, event_rx) = mpsc::unbounded_channel::<TuiEvent>();

    let sink = ChannelSink::new(event_tx.clone());
    let coordinator = Coordinator::new(sandbox, settings.debounce, sink.clone(), sink).spawn();
    coordinator.source_changed(initial.clone());
    coordinator.rerun();

    let stop = Arc::new(AtomicBool::new(false));
    spawn_input_reader(event_tx.clone(), stop.clone());
    spawn_source_poller(path, initial, settings.poll_interval, event_tx);

    let result = run_app(&mut terminal, &mut app, &coordinator, &store, event_rx).await;

    stop.store(true, Ordering::Relaxed);
    coordinator.shutdown().await;

    // Restore terminal
    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    coordinator: &CoordinatorHandle,
    store: &SnippetStore,
    mut event_rx: mpsc::UnboundedReceiver<TuiEvent>,
) -> Result<()> {
    loop {
        terminal.draw(|frame| render_ui(frame, app))?;

        let Some(tui_event) = event_rx.recv().await else {
            break;
        };
        match tui_event {
            TuiEvent::Key(key) => {
                if handle_key_event(app, key, coordinator) {
                    break; // Quit requested
                }
            }
            TuiEvent::Resize => {}
            TuiEvent::SourceChanged(text) => {
                if let Err(err) = store.save(&text) {
                    warn!(error = %err, "could not save snippet");
                }
                app.set_source(&text);
                coordinator.source_changed(text);
            }
            TuiEvent::SourceUnreadable(reason) => {
                app.notice = Some(reason);
            }
            TuiEvent::RunStarted(run) => app.run_started(run),
            TuiEvent::RunFinished { run, result } => app.run_finished(run, result),
            TuiEvent::Annotations(annotations) => app.set_annotations(annotations),
            TuiEvent::Reveal(line) => app.reveal(line),
        }
    }

    Ok(())
}

/// Returns true when the user asked to quit.
fn handle_key_event(app: &mut App, key: KeyEvent, coordinator: &CoordinatorHandle) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    if app.show_help {
        app.toggle_help();
        return false;
    }

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
        KeyCode::Char('q') | KeyCode::Esc => return true,
        KeyCode::F(1) | KeyCode::Char('?') => app.toggle_help(),
        KeyCode::Char('r') => coordinator.rerun(),
        KeyCode::Tab => app.toggle_focus(),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(PAGE),
        KeyCode::PageDown => app.scroll_down(PAGE),
        _ => {}
    }
    false
}

fn spawn_input_reader(input_tx: mpsc::UnboundedSender<TuiEvent>, stop: Arc<AtomicBool>) {
    tokio::task::spawn_blocking(move || {
        while !stop.load(Ordering::Relaxed) {
            if !event::poll(Duration::from_millis(100)).unwrap_or(false) {
                continue;
            }
            let tui_event = match event::read() {
                Ok(Event::Key(key)) => TuiEvent::Key(key),
                Ok(Event::Resize(_, _)) => TuiEvent::Resize,
                _ => continue,
            };
            if input_tx.send(tui_event).is_err() {
                break; // Channel closed
            }
        }
    });
}

/// Re-reads `path` every `interval` and reports content changes.
fn spawn_source_poller(
    path: PathBuf,
    mut last: String,
    interval: Duration,
    tx: mpsc::UnboundedSender<TuiEvent>,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        let mut unreadable = false;
        loop {
            ticker.tick().await;
            let event = match fs::read_to_string(&path) {
                Ok(text) if text != last => {
                    unreadable = false;
                    debug!(path = %path.display(), bytes = text.len(), "source changed");
                    last = text.clone();
                    TuiEvent::SourceChanged(text)
                }
                Ok(_) => continue,
                Err(err) if !unreadable => {
                    unreadable = true;
                    TuiEvent::SourceUnreadable(format!("cannot read {}: {}", path.display(), err))
                }
                Err(_) => continue,
            };
            if tx.send(event).is_err() {
                break;
            }
        }
    });
}
