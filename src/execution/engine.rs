//! In-sandbox evaluation of one program.
//!
//! Runs inside the worker process. Each call builds a brand-new realm, so
//! nothing a program does can leak into the next run.

use std::thread;
use std::time::Instant;

use boa_engine::builtins::promise::PromiseState;
use boa_engine::error::JsNativeErrorKind;
use boa_engine::object::builtins::JsPromise;
use boa_engine::vm::RuntimeLimits;
use boa_engine::{js_string, Context, JsError, JsResult, JsValue, Source};
use tracing::debug;

use super::console::ConsoleShim;
use super::lexer;
use super::loop_guard::{self, LoopGuard};
use super::serializer::Serializer;
use super::timers::Timers;
use super::trace::{line_count, line_from_trace, map_to_source, rebase_positions};
use super::{RunResult, RuntimeError};

const PRELUDE: &str = "(async () => {\n";
const EPILOGUE: &str = "\n})()";
const PRELUDE_LINES: u32 = 1;

pub const STALLED_MESSAGE: &str = "Program stalled: awaited promise can never settle";
pub const CRASHED_MESSAGE: &str = "Sandbox engine crashed";

/// Deepest bracket nesting accepted before parsing.
pub const MAX_NESTING: usize = 256;
const RECURSION_LIMIT: usize = 512;
const VM_STACK_LIMIT: usize = 1024 * 1024;
/// Native stack for the evaluation thread; the parser and native builtins
/// recurse on it.
const EVAL_STACK_SIZE: usize = 128 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Loop-iteration ceiling; `None` disables the static loop guard.
    pub loop_guard: Option<u64>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            loop_guard: Some(loop_guard::DEFAULT_CEILING),
        }
    }
}

enum Failure {
    Thrown(JsValue),
    /// Recursion or VM stack limit. These cannot be caught by user code and
    /// have no JavaScript value.
    Limit(String),
    Stalled,
}

impl Failure {
    fn from_error(err: JsError, context: &mut Context) -> Self {
        match err.as_native() {
            Some(native) if matches!(native.kind, JsNativeErrorKind::RuntimeLimit) => {
                Failure::Limit(native.message().to_string())
            }
            _ => Failure::Thrown(err.to_opaque(context)),
        }
    }
}

/// Evaluates `source` as the body of an async function and collects what it
/// logged. Every failure ends up in the result.
///
/// Evaluation happens on a dedicated thread with a large stack; a panic in
/// the engine is reported as [`CRASHED_MESSAGE`].
pub fn execute(source: &str, options: &EngineOptions) -> RunResult {
    let outcome = thread::scope(|scope| {
        thread::Builder::new()
            .name("runjs-eval".into())
            .stack_size(EVAL_STACK_SIZE)
            .spawn_scoped(scope, || evaluate(source, options))
            .map(|handle| handle.join())
    });
    match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => RunResult::failed(Vec::new(), RuntimeError::new(CRASHED_MESSAGE, None)),
        Err(err) => RunResult::failed(
            Vec::new(),
            RuntimeError::new(format!("Sandbox setup failed: {err}"), None),
        ),
    }
}

fn evaluate(source: &str, options: &EngineOptions) -> RunResult {
    // The parser recurses once per bracket level.
    if let Some(line) = lexer::nesting_overflow(source, MAX_NESTING) {
        return RunResult::failed(
            Vec::new(),
            RuntimeError::new(
                format!("SyntaxError: brackets nested deeper than {MAX_NESTING} levels"),
                Some(line),
            ),
        );
    }

    let mut context = Context::default();
    let mut limits = RuntimeLimits::default();
    limits.set_recursion_limit(RECURSION_LIMIT);
    limits.set_stack_size_limit(VM_STACK_LIMIT);
    context.set_runtime_limits(limits);
    let shim = ConsoleShim::new();
    let timers = Timers::new();

    let serializer = match prepare(&mut context, &shim, &timers, options) {
        Ok(serializer) => serializer,
        Err(err) => {
            return RunResult::failed(
                Vec::new(),
                RuntimeError::new(format!("Sandbox setup failed: {err}"), None),
            )
        }
    };

    let body = if options.loop_guard.is_some() {
        loop_guard::instrument(source)
    } else {
        source.to_string()
    };
    let program = format!("{PRELUDE}{body}{EPILOGUE}");

    let started = Instant::now();
    let outcome = drive(&mut context, &program, &timers);
    debug!(elapsed_ms = started.elapsed().as_millis() as u64, "program settled");

    let entries = shim.take();
    match outcome {
        Ok(()) => RunResult::completed(entries),
        Err(Failure::Thrown(value)) => {
            let error = describe(&value, &serializer, &mut context, line_count(source));
            RunResult::failed(entries, error)
        }
        Err(Failure::Limit(detail)) => {
            let line = map_to_source(line_from_trace(&detail), PRELUDE_LINES, line_count(source));
            RunResult::failed(
                entries,
                RuntimeError::new(format!("Runtime limit exceeded: {detail}"), Some(line)),
            )
        }
        Err(Failure::Stalled) => RunResult::failed(entries, RuntimeError::new(STALLED_MESSAGE, None)),
    }
}

fn prepare(
    context: &mut Context,
    shim: &ConsoleShim,
    timers: &Timers,
    options: &EngineOptions,
) -> JsResult<Serializer> {
    let serializer = Serializer::capture(context)?;
    shim.install(context, serializer.clone())?;
    timers.install(context)?;
    if let Some(ceiling) = options.loop_guard {
        LoopGuard::new(ceiling).install(context)?;
    }
    Ok(serializer)
}

/// Evaluates the wrapped program and pumps jobs and timers until its promise settles.
fn drive(context: &mut Context, program: &str, timers: &Timers) -> Result<(), Failure> {
    let value = context
        .eval(Source::from_bytes(program))
        .map_err(|err| Failure::from_error(err, context))?;

    let promise = match value.as_object().cloned().map(JsPromise::from_object) {
        Some(Ok(promise)) => promise,
        _ => {
            context.run_jobs();
            return Ok(());
        }
    };

    loop {
        context.run_jobs();
        match promise.state() {
            PromiseState::Fulfilled(_) => return Ok(()),
            PromiseState::Rejected(reason) => return Err(Failure::Thrown(reason)),
            PromiseState::Pending => {}
        }

        let Some(timer) = timers.pop_next() else {
            return Err(Failure::Stalled);
        };
        let now = Instant::now();
        if timer.due > now {
            std::thread::sleep(timer.due - now);
        }
        timer
            .callback
            .call(&JsValue::undefined(), &timer.args, context)
            .map_err(|err| Failure::from_error(err, context))?;
    }
}

/// Builds the user-facing error for a thrown value: its `message` when that is
/// a non-empty string, else `String(value)`; the line comes from `stack`, then
/// from the message text.
fn describe(value: &JsValue, serializer: &Serializer, context: &mut Context, total: u32) -> RuntimeError {
    let mut message = None;
    let mut stack = None;
    if let Some(object) = value.as_object() {
        message = object
            .get(js_string!("message"), context)
            .ok()
            .and_then(|m| m.as_string().map(|s| s.to_std_string_escaped()))
            .filter(|m| !m.is_empty());
        stack = object
            .get(js_string!("stack"), context)
            .ok()
            .and_then(|s| s.as_string().map(|s| s.to_std_string_escaped()));
    }
    let message = message.unwrap_or_else(|| serializer.display_string(value, context));

    let raw = stack
        .as_deref()
        .and_then(line_from_trace)
        .or_else(|| line_from_trace(&message));
    let message = rebase_positions(&message, PRELUDE_LINES, total);
    RuntimeError::new(message, Some(map_to_source(raw, PRELUDE_LINES, total)))
}
