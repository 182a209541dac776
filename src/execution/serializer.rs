//! Display encoding for arbitrary JavaScript values.

use boa_engine::object::builtins::JsFunction;
use boa_engine::{js_string, Context, JsNativeError, JsResult, JsValue};
use boa_gc::{custom_trace, Finalize, Trace};

const INDENT: i32 = 2;

/// Renders values the way `console.log` output reads: strings verbatim,
/// everything else as indented JSON, with a plain-text fallback.
///
/// Holds the realm's original `JSON.stringify`, captured before user code
/// runs, so scripts that overwrite `JSON` cannot alter the output.
#[derive(Clone, Finalize)]
pub struct Serializer {
    stringify: JsFunction,
}

unsafe impl Trace for Serializer {
    custom_trace!(this, mark, {
        mark(&this.stringify);
    });
}

impl Serializer {
    pub fn capture(context: &mut Context) -> JsResult<Self> {
        let json = context
            .global_object()
            .get(js_string!("JSON"), context)?;
        let stringify = json
            .as_object()
            .map(|json| json.get(js_string!("stringify"), context))
            .transpose()?
            .and_then(|f| f.as_object().cloned())
            .and_then(JsFunction::from_object)
            .ok_or_else(|| JsNativeError::typ().with_message("JSON.stringify is unavailable"))?;
        Ok(Self { stringify })
    }

    /// Never fails. Cycles, functions, symbols and `undefined` degrade to
    /// their `String(value)` form, then to the engine's display form.
    pub fn serialize(&self, value: &JsValue, context: &mut Context) -> String {
        if let Some(text) = value.as_string() {
            return text.to_std_string_escaped();
        }

        let encoded = self.stringify.call(
            &JsValue::undefined(),
            &[value.clone(), JsValue::null(), JsValue::new(INDENT)],
            context,
        );
        match encoded {
            Ok(json) if json.is_string() => json
                .as_string()
                .map(|s| s.to_std_string_escaped())
                .unwrap_or_default(),
            _ => self.display_string(value, context),
        }
    }

    /// `String(value)`, or the engine's display form when that throws.
    pub fn display_string(&self, value: &JsValue, context: &mut Context) -> String {
        match value.to_string(context) {
            Ok(text) => text.to_std_string_escaped(),
            Err(_) => value.display().to_string(),
        }
    }
}
