use std::path::PathBuf;

use clap::{ArgGroup, Parser};

#[derive(Parser, Debug, Clone)]
#[command(name = "runjs", about = "Run JavaScript snippets in an isolated sandbox", version)]
#[command(group(ArgGroup::new("input").args(["file", "eval"]).multiple(false)))]
#[command(group(ArgGroup::new("guard_switch").args(["loop_limit", "no_loop_guard"]).multiple(false)))]
pub struct Cli {
    /// JavaScript file to run. Without a file or --eval the saved snippet is used.
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Run the given source text and save it as the current snippet.
    #[arg(short = 'e', long = "eval", value_name = "SOURCE")]
    pub eval: Option<String>,

    /// Watch the file (or the saved snippet) and re-run on every change.
    #[arg(short = 'w', long)]
    pub watch: bool,

    /// Wall-clock limit for one run, in milliseconds.
    #[arg(long = "timeout-ms", value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Quiet period after the last edit before a watched run starts.
    #[arg(long = "debounce-ms", value_name = "MS")]
    pub debounce_ms: Option<u64>,

    /// Abort a run after this many loop iterations.
    #[arg(long = "loop-limit", value_name = "N")]
    pub loop_limit: Option<u64>,

    /// Disable loop instrumentation; only the timeout stops runaway loops.
    #[arg(long = "no-loop-guard")]
    pub no_loop_guard: bool,

    /// Disable colored output.
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Serve a single run over stdin/stdout (hidden).
    #[arg(long = "worker", hide = true)]
    pub worker: bool,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Loop guard setting from flags, if any flag was given.
    pub fn loop_guard_override(&self) -> Option<Option<u64>> {
        if self.no_loop_guard {
            Some(None)
        } else {
            self.loop_limit.map(Some)
        }
    }
}
