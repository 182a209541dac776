mod cli;

use std::io::{self, Read};

use anyhow::{bail, Result};
use is_terminal::IsTerminal;
use runjs::{
    cache::SnippetStore,
    config::Config,
    execution::engine::EngineOptions,
    handlers, logging,
    process::worker,
    utils,
};
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    // Worker mode: no config, no terminal, one request on stdin.
    if args.worker {
        logging::init_stderr();
        let options = EngineOptions {
            loop_guard: args.loop_guard_override().unwrap_or(EngineOptions::default().loop_guard),
        };
        return worker::serve(&options);
    }

    // Load config, then let flags override it
    let cfg = Config::load();
    let mut settings = cfg.settings();
    if let Some(ms) = args.timeout_ms {
        settings.timeout = std::time::Duration::from_millis(ms);
    }
    if let Some(ms) = args.debounce_ms {
        settings.debounce = std::time::Duration::from_millis(ms);
    }
    if let Some(guard) = args.loop_guard_override() {
        settings.loop_guard = guard;
    }
    let store = SnippetStore::from_settings(&settings);

    if args.watch {
        if args.eval.is_some() {
            bail!("--eval cannot be combined with --watch");
        }
        logging::init_file(&settings.storage_path)?;
        debug!(config = %cfg.config_path.display(), ?settings, "starting watch mode");
        return handlers::watch::run(args.file, store, &settings).await;
    }

    logging::init_stderr();
    debug!(config = %cfg.config_path.display(), ?settings, "starting one-shot run");

    // Resolve source: file, --eval text, piped stdin, then the saved snippet
    let source = if let Some(path) = &args.file {
        utils::read_source(path)?
    } else if let Some(text) = &args.eval {
        store.save(text)?;
        text.clone()
    } else if !io::stdin().is_terminal() {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        store.save(&buf)?;
        buf
    } else {
        store.load()
    };

    let color = !args.no_color && io::stdout().is_terminal();
    let result = handlers::run::run(&utils::normalize_source(&source), &settings, color).await?;
    if !result.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
