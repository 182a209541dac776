//! Console shim bound as the realm's only `console`.

use std::cell::RefCell;
use std::rc::Rc;

use boa_engine::object::ObjectInitializer;
use boa_engine::property::Attribute;
use boa_engine::{js_string, Context, JsArgs, JsResult, JsString, JsValue, NativeFunction};
use boa_gc::{custom_trace, Finalize, Trace};

use super::serializer::Serializer;
use super::{LogEntry, LogKind};

/// Per-run log accumulator. Create one per run; `clear()` only ever affects
/// the run that owns it.
#[derive(Debug, Clone, Default)]
pub struct ConsoleShim {
    entries: Rc<RefCell<Vec<LogEntry>>>,
}

impl ConsoleShim {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, kind: LogKind, payload: Vec<String>) {
        self.entries.borrow_mut().push(LogEntry::new(kind, payload));
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    pub fn take(&self) -> Vec<LogEntry> {
        std::mem::take(&mut *self.entries.borrow_mut())
    }

    /// Binds `console` on the global object of `context`.
    pub fn install(&self, context: &mut Context, serializer: Serializer) -> JsResult<()> {
        let capture = ConsoleCapture {
            shim: self.clone(),
            serializer,
        };

        let console = ObjectInitializer::new(context)
            .function(entry_fn(LogKind::Log, capture.clone()), js_string!("log"), 0)
            .function(entry_fn(LogKind::Log, capture.clone()), js_string!("info"), 0)
            .function(entry_fn(LogKind::Log, capture.clone()), js_string!("debug"), 0)
            .function(entry_fn(LogKind::Warn, capture.clone()), js_string!("warn"), 0)
            .function(entry_fn(LogKind::Error, capture.clone()), js_string!("error"), 0)
            .function(table_fn(capture.clone()), js_string!("table"), 1)
            .function(clear_fn(capture), js_string!("clear"), 0)
            .build();

        context.register_global_property(JsString::from("console"), console, Attribute::all())
    }
}

#[derive(Clone, Finalize)]
struct ConsoleCapture {
    shim: ConsoleShim,
    serializer: Serializer,
}

unsafe impl Trace for ConsoleCapture {
    custom_trace!(this, mark, {
        mark(&this.serializer);
    });
}

fn entry_fn(kind: LogKind, capture: ConsoleCapture) -> NativeFunction {
    NativeFunction::from_copy_closure_with_captures(
        move |_this, args, capture: &ConsoleCapture, ctx| {
            let payload = args
                .iter()
                .map(|arg| capture.serializer.serialize(arg, ctx))
                .collect();
            capture.shim.record(kind, payload);
            Ok(JsValue::undefined())
        },
        capture,
    )
}

fn table_fn(capture: ConsoleCapture) -> NativeFunction {
    NativeFunction::from_copy_closure_with_captures(
        |_this, args, capture: &ConsoleCapture, ctx| {
            let data = capture.serializer.serialize(args.get_or_undefined(0), ctx);
            capture.shim.record(LogKind::Table, vec![data]);
            Ok(JsValue::undefined())
        },
        capture,
    )
}

fn clear_fn(capture: ConsoleCapture) -> NativeFunction {
    NativeFunction::from_copy_closure_with_captures(
        |_this, _args, capture: &ConsoleCapture, _ctx| {
            capture.shim.clear();
            Ok(JsValue::undefined())
        },
        capture,
    )
}
