//! `setTimeout` / `clearTimeout` for the sandbox realm.
//!
//! Callbacks are queued here and fired by the engine's event loop; nothing
//! runs on a background thread.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use boa_engine::object::builtins::JsFunction;
use boa_engine::{js_string, Context, JsArgs, JsNativeError, JsResult, JsValue, NativeFunction};
use boa_gc::{empty_trace, Finalize, Trace};

pub struct Timer {
    pub id: u32,
    pub due: Instant,
    pub callback: JsFunction,
    pub args: Vec<JsValue>,
}

#[derive(Default)]
struct Queue {
    next_id: u32,
    pending: Vec<Timer>,
}

/// Timer table for one run.
#[derive(Clone, Default)]
pub struct Timers {
    queue: Rc<RefCell<Queue>>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&self, callback: JsFunction, delay: Duration, args: Vec<JsValue>) -> u32 {
        let mut queue = self.queue.borrow_mut();
        queue.next_id += 1;
        let id = queue.next_id;
        queue.pending.push(Timer {
            id,
            due: Instant::now() + delay,
            callback,
            args,
        });
        id
    }

    pub fn cancel(&self, id: u32) {
        self.queue.borrow_mut().pending.retain(|timer| timer.id != id);
    }

    /// Removes the timer that fires next. Ties go to the one scheduled first.
    pub fn pop_next(&self) -> Option<Timer> {
        let mut queue = self.queue.borrow_mut();
        let index = queue
            .pending
            .iter()
            .enumerate()
            .min_by_key(|(_, timer)| (timer.due, timer.id))
            .map(|(index, _)| index)?;
        Some(queue.pending.remove(index))
    }

    pub fn install(&self, context: &mut Context) -> JsResult<()> {
        let capture = TimerCapture {
            timers: self.clone(),
        };
        let set_timeout = NativeFunction::from_copy_closure_with_captures(
            |_this, args, capture: &TimerCapture, ctx| {
                let callback = args
                    .get_or_undefined(0)
                    .as_object()
                    .cloned()
                    .and_then(JsFunction::from_object)
                    .ok_or_else(|| {
                        JsNativeError::typ().with_message("setTimeout callback must be a function")
                    })?;
                let delay = delay_from(args.get_or_undefined(1), ctx)?;
                let extra = args.iter().skip(2).cloned().collect();
                let id = capture.timers.schedule(callback, delay, extra);
                Ok(JsValue::new(id))
            },
            capture.clone(),
        );
        let clear_timeout = NativeFunction::from_copy_closure_with_captures(
            |_this, args, capture: &TimerCapture, ctx| {
                let id = args.get_or_undefined(0).to_number(ctx)?;
                if id.is_finite() && id >= 1.0 {
                    capture.timers.cancel(id as u32);
                }
                Ok(JsValue::undefined())
            },
            capture,
        );

        context.register_global_callable(js_string!("setTimeout"), 1, set_timeout)?;
        context.register_global_callable(js_string!("clearTimeout"), 1, clear_timeout)?;
        Ok(())
    }
}

#[derive(Clone, Finalize)]
struct TimerCapture {
    timers: Timers,
}

// Queued callbacks are held outside the GC graph and therefore stay rooted
// until they fire or are cleared.
unsafe impl Trace for TimerCapture {
    empty_trace!();
}

fn delay_from(value: &JsValue, context: &mut Context) -> JsResult<Duration> {
    if value.is_undefined() {
        return Ok(Duration::ZERO);
    }
    let ms = value.to_number(context)?;
    if ms.is_finite() && ms > 0.0 {
        Ok(Duration::from_millis(ms as u64))
    } else {
        Ok(Duration::ZERO)
    }
}
