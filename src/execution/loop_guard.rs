//! Static loop instrumentation.
//!
//! `instrument` inserts a call to [`GUARD_FN`] at the top of every braced
//! `for`, `while` and `do` body it can recognise lexically. The check counts
//! iterations across the whole run and throws once the ceiling is passed.
//!
//! This is a syntactic rewrite, not an analysis. Unbraced bodies, recursion
//! and higher-order iteration (`forEach`, `map`, ...) are not covered; the
//! wall-clock deadline in the runner is what actually bounds a run.

use std::cell::Cell;
use std::rc::Rc;

use boa_engine::{Context, JsNativeError, JsResult, JsString, JsValue, NativeFunction};
use boa_gc::{empty_trace, Finalize, Trace};

use super::lexer::{matching_paren, tokenize, Tok};

pub const GUARD_FN: &str = "__runjsLoopGuard";
pub const DEFAULT_CEILING: u64 = 1_000_000;

/// Per-run iteration counter exposed to the realm as [`GUARD_FN`].
#[derive(Debug, Clone, Finalize)]
pub struct LoopGuard {
    count: Rc<Cell<u64>>,
    ceiling: u64,
}

unsafe impl Trace for LoopGuard {
    empty_trace!();
}

impl LoopGuard {
    pub fn new(ceiling: u64) -> Self {
        Self {
            count: Rc::new(Cell::new(0)),
            ceiling,
        }
    }

    pub fn iterations(&self) -> u64 {
        self.count.get()
    }

    /// Counts one iteration; errors once the ceiling has been exceeded.
    pub fn tick(&self) -> Result<(), String> {
        let next = self.count.get().saturating_add(1);
        self.count.set(next);
        if next > self.ceiling {
            Err(format!(
                "Infinite loop detected: exceeded {} loop iterations",
                self.ceiling
            ))
        } else {
            Ok(())
        }
    }

    pub fn install(&self, context: &mut Context) -> JsResult<()> {
        let check = NativeFunction::from_copy_closure_with_captures(
            |_this, _args, guard: &LoopGuard, _ctx| {
                guard
                    .tick()
                    .map(|()| JsValue::undefined())
                    .map_err(|message| JsNativeError::error().with_message(message).into())
            },
            self.clone(),
        );
        context.register_global_callable(JsString::from(GUARD_FN), 0, check)
    }
}

/// Returns `source` with guard calls inserted. Line structure is preserved.
pub fn instrument(source: &str) -> String {
    let tokens = tokenize(source);
    let mut inserts = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        let Tok::Word(word) = token.kind else { continue };
        if i > 0 && tokens[i - 1].kind == Tok::Punct(b'.') {
            continue;
        }
        let body = match word {
            "for" | "while" => {
                let mut j = i + 1;
                if word == "for" && matches!(tokens.get(j), Some(t) if t.kind == Tok::Word("await")) {
                    j += 1;
                }
                match tokens.get(j) {
                    Some(t) if t.kind == Tok::Punct(b'(') => {
                        matching_paren(&tokens, j).map(|close| close + 1)
                    }
                    _ => None,
                }
            }
            "do" => Some(i + 1),
            _ => None,
        };
        if let Some(open) = body.and_then(|k| tokens.get(k)) {
            if open.kind == Tok::Punct(b'{') {
                inserts.push(open.end);
            }
        }
    }

    if inserts.is_empty() {
        return source.to_string();
    }
    // A loop nested inside another loop's header is found after the outer
    // keyword but opens its body first.
    inserts.sort_unstable();
    inserts.dedup();

    let call = format!("{GUARD_FN}();");
    let mut out = String::with_capacity(source.len() + inserts.len() * call.len());
    let mut last = 0;
    for at in inserts {
        out.push_str(&source[last..at]);
        out.push_str(&call);
        last = at;
    }
    out.push_str(&source[last..]);
    out
}
