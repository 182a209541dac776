use anyhow::{anyhow, Result};
use boa_engine::{Context, JsValue, Source};
use runjs::execution::serializer::Serializer;

fn eval(context: &mut Context, code: &str) -> Result<JsValue> {
    context
        .eval(Source::from_bytes(code))
        .map_err(|e| anyhow!("eval failed: {e}"))
}

fn setup() -> Result<(Context, Serializer)> {
    let mut context = Context::default();
    let serializer = Serializer::capture(&mut context).map_err(|e| anyhow!("{e}"))?;
    Ok((context, serializer))
}

#[test]
fn test_strings_pass_through() -> Result<()> {
    let (mut context, serializer) = setup()?;
    let value = eval(&mut context, r#""line one\nline \"two\"""#)?;
    assert_eq!(serializer.serialize(&value, &mut context), "line one\nline \"two\"");
    Ok(())
}

#[test]
fn test_primitives_use_json_form() -> Result<()> {
    let (mut context, serializer) = setup()?;
    for (code, expected) in [("42", "42"), ("true", "true"), ("null", "null"), ("1.5", "1.5")] {
        let value = eval(&mut context, code)?;
        assert_eq!(serializer.serialize(&value, &mut context), expected, "for {code}");
    }
    Ok(())
}

#[test]
fn test_objects_are_indented_json() -> Result<()> {
    let (mut context, serializer) = setup()?;
    let value = eval(&mut context, "({a: [1, 2]})")?;
    let text = serializer.serialize(&value, &mut context);
    assert!(text.contains('\n'), "expected pretty output, got {text}");
    let parsed: serde_json::Value = serde_json::from_str(&text)?;
    assert_eq!(parsed, serde_json::json!({"a": [1, 2]}));
    Ok(())
}

#[test]
fn test_bigint_and_symbol_do_not_raise() -> Result<()> {
    let (mut context, serializer) = setup()?;
    let big = eval(&mut context, "10n")?;
    assert_eq!(serializer.serialize(&big, &mut context), "10");

    let symbol = eval(&mut context, "Symbol('tag')")?;
    let text = serializer.serialize(&symbol, &mut context);
    assert!(text.contains("tag"), "got {text}");
    Ok(())
}

#[test]
fn test_null_prototype_object_does_not_raise() -> Result<()> {
    let (mut context, serializer) = setup()?;
    let value = eval(
        &mut context,
        "const o = Object.create(null); o.self = o; o",
    )?;
    // Neither JSON nor String() can handle this; only the display form is left.
    let text = serializer.serialize(&value, &mut context);
    assert!(!text.is_empty());
    Ok(())
}

#[test]
fn test_display_string_matches_string_conversion() -> Result<()> {
    let (mut context, serializer) = setup()?;
    let value = eval(&mut context, "[1, [2, 3]]")?;
    assert_eq!(serializer.display_string(&value, &mut context), "1,2,3");
    Ok(())
}
