use anyhow::Result;
use runjs::execution::engine::{execute, EngineOptions, STALLED_MESSAGE};
use runjs::execution::{LogEntry, LogKind, RunResult};
use serde_json::json;

fn run(source: &str) -> RunResult {
    execute(source, &EngineOptions::default())
}

fn texts(result: &RunResult) -> Vec<String> {
    result.entries.iter().map(LogEntry::text).collect()
}

#[test]
fn test_hello_world() {
    let result = run(r#"console.log("Hello World")"#);
    assert_eq!(
        result,
        RunResult::completed(vec![LogEntry::new(LogKind::Log, vec!["Hello World".into()])])
    );
}

#[test]
fn test_object_is_structurally_encoded() -> Result<()> {
    let result = run("console.log({a:1,b:[1,2]})");
    assert!(result.is_success());
    assert_eq!(result.entries.len(), 1);
    assert_eq!(result.entries[0].payload.len(), 1);
    let value: serde_json::Value = serde_json::from_str(&result.entries[0].payload[0])?;
    assert_eq!(value, json!({"a": 1, "b": [1, 2]}));
    Ok(())
}

#[test]
fn test_thrown_error_reports_message() {
    let result = run(r#"throw new Error("boom")"#);
    assert!(result.entries.is_empty());
    let error = result.error.expect("error expected");
    assert!(error.message.contains("boom"), "message: {}", error.message);
    assert_eq!(error.line, Some(1));
}

#[test]
fn test_clear_drops_earlier_entries() {
    let result = run("console.log(1); console.clear(); console.log(2)");
    assert!(result.is_success());
    assert_eq!(texts(&result), vec!["2"]);
}

#[test]
fn test_syntax_error_is_reported() {
    let source = "console.log(1);\nlet = ;\nconsole.log(2);";
    let result = run(source);
    assert!(result.entries.is_empty());
    let error = result.error.expect("syntax error expected");
    assert!(!error.message.is_empty());
    let line = error.line.expect("line defaults to a value");
    assert!((1..=3).contains(&line), "line {line} outside the source");
}

#[test]
fn test_entries_before_throw_are_kept() {
    let result = run("console.log('a');\nconsole.warn('b');\nthrow new Error('c');");
    assert_eq!(texts(&result), vec!["a", "b"]);
    assert_eq!(result.entries[1].kind, LogKind::Warn);
    assert!(result.error.is_some());
}

#[test]
fn test_error_line_stays_in_source_bounds() {
    let result = run("\n\n\nthrow new Error('x');");
    let line = result.error.and_then(|e| e.line).expect("line");
    assert!((1..=4).contains(&line));
}

#[test]
fn test_console_kinds_and_arguments() {
    let result = run(
        "console.log('x', 1, true);\nconsole.warn('w');\nconsole.error('e');\nconsole.info('i');\nconsole.table([1, 2]);",
    );
    assert!(result.is_success());
    let kinds: Vec<LogKind> = result.entries.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![LogKind::Log, LogKind::Warn, LogKind::Error, LogKind::Log, LogKind::Table]
    );
    assert_eq!(result.entries[0].payload, vec!["x", "1", "true"]);
    assert_eq!(result.entries[4].payload.len(), 1);
}

#[test]
fn test_table_without_argument() {
    let result = run("console.table()");
    assert_eq!(result.entries, vec![LogEntry::new(LogKind::Table, vec!["undefined".into()])]);
}

#[test]
fn test_unserializable_values_fall_back() {
    let result = run(
        "const o = {}; o.self = o;\nconsole.log(o);\nconsole.log(undefined);\nconsole.log(function f() {});",
    );
    assert!(result.is_success());
    let out = texts(&result);
    assert_eq!(out[0], "[object Object]");
    assert_eq!(out[1], "undefined");
    assert!(out[2].starts_with("function"), "got {}", out[2]);
}

#[test]
fn test_overwritten_stringify_is_ignored() -> Result<()> {
    let result = run("JSON.stringify = () => 'hacked';\nconsole.log({a: 1});");
    let value: serde_json::Value = serde_json::from_str(&result.entries[0].payload[0])?;
    assert_eq!(value, json!({"a": 1}));
    Ok(())
}

#[test]
fn test_top_level_await_and_timers() {
    let result = run(
        "await new Promise(resolve => setTimeout(resolve, 10));\nconsole.log('later');",
    );
    assert!(result.is_success(), "{:?}", result.error);
    assert_eq!(texts(&result), vec!["later"]);
}

#[test]
fn test_timers_fire_in_due_order() {
    let result = run(
        r#"
await new Promise(resolve => {
  setTimeout(() => { console.log("b"); resolve(); }, 20);
  setTimeout(() => console.log("a"), 5);
});
"#,
    );
    assert_eq!(texts(&result), vec!["a", "b"]);
}

#[test]
fn test_cleared_timer_never_fires() {
    let result = run(
        "const id = setTimeout(() => console.log('never'), 5);\nclearTimeout(id);\nawait new Promise(r => setTimeout(r, 10));\nconsole.log('done');",
    );
    assert_eq!(texts(&result), vec!["done"]);
}

#[test]
fn test_exception_in_timer_fails_run() {
    let result = run(
        "await new Promise(() => setTimeout(() => { throw new Error('in timer'); }, 0));",
    );
    let error = result.error.expect("timer error");
    assert!(error.message.contains("in timer"));
}

#[test]
fn test_set_timeout_rejects_non_function() {
    let result = run("setTimeout('console.log(1)', 0);");
    assert!(result.error.is_some());
    assert!(result.entries.is_empty());
}

#[test]
fn test_rejected_promise_fails_run() {
    let result = run("await Promise.reject(new Error('nope'));");
    assert!(result.error.expect("rejection").message.contains("nope"));
}

#[test]
fn test_thrown_non_error_value() {
    let result = run("throw 'plain';");
    let error = result.error.expect("error");
    assert_eq!(error.message, "plain");
    assert_eq!(error.line, Some(1));
}

#[test]
fn test_stalled_program() {
    let result = run("console.log('waiting');\nawait new Promise(() => {});");
    assert_eq!(texts(&result), vec!["waiting"]);
    let error = result.error.expect("stall");
    assert_eq!(error.message, STALLED_MESSAGE);
    assert_eq!(error.line, None);
}

#[test]
fn test_loop_guard_stops_runaway_loop() {
    let options = EngineOptions {
        loop_guard: Some(100),
    };
    let result = execute("let i = 0;\nwhile (true) { i++; }", &options);
    let error = result.error.expect("loop guard");
    assert!(error.message.contains("Infinite loop detected"), "{}", error.message);
}

#[test]
fn test_loop_guard_allows_bounded_loops() {
    let options = EngineOptions {
        loop_guard: Some(100),
    };
    let result = execute(
        "let n = 0;\nfor (let i = 0; i < 50; i++) { n++; }\nconsole.log(n);",
        &options,
    );
    assert!(result.is_success());
    assert_eq!(texts(&result), vec!["50"]);

    let result = execute("for (let i = 0; i < 150; i++) { }", &options);
    assert!(result.error.is_some());
}

#[test]
fn test_loop_guard_counts_across_loops() {
    let options = EngineOptions {
        loop_guard: Some(100),
    };
    let result = execute(
        "for (let i = 0; i < 60; i++) { }\nfor (let i = 0; i < 60; i++) { }",
        &options,
    );
    assert!(result.error.is_some());
}

#[test]
fn test_disabled_guard_does_not_define_check() {
    let options = EngineOptions { loop_guard: None };
    let result = execute("console.log(typeof __runjsLoopGuard);", &options);
    assert_eq!(texts(&result), vec!["undefined"]);
}

#[test]
fn test_no_host_capabilities() {
    let result = run("console.log(typeof require, typeof process, typeof fetch);");
    assert_eq!(texts(&result), vec!["undefined undefined undefined"]);
}

#[test]
fn test_each_run_gets_a_fresh_realm() {
    let first = run("globalThis.leak = 1;");
    assert!(first.is_success());
    let second = run("console.log(typeof leak);");
    assert_eq!(texts(&second), vec!["undefined"]);
}

#[test]
fn test_top_level_return() {
    let result = run("console.log('a');\nreturn;\nconsole.log('b');");
    assert!(result.is_success());
    assert_eq!(texts(&result), vec!["a"]);
}

#[test]
fn test_runaway_recursion_is_reported() {
    let result = run("console.log('before');\nfunction f() { return f(); }\nf();");
    assert_eq!(texts(&result), vec!["before"]);
    let error = result.error.expect("recursion error");
    assert!(!error.message.is_empty());
    assert!(error.message.starts_with("Runtime limit exceeded"), "{}", error.message);
    assert!(matches!(error.line, Some(1..=3)));
}

#[test]
fn test_runaway_recursion_in_timer_callback() {
    let result = run(
        "console.log('a');\nawait new Promise(() => setTimeout(() => { function g() { return g(); } g(); }, 0));",
    );
    assert_eq!(texts(&result), vec!["a"]);
    let error = result.error.expect("recursion error");
    assert!(error.message.starts_with("Runtime limit exceeded"), "{}", error.message);
}

#[test]
fn test_deep_nesting_is_a_syntax_error() {
    let source = format!("console.log(1);\nconst x = {};", "[".repeat(200_000));
    let result = run(&source);
    assert!(result.entries.is_empty());
    let error = result.error.expect("nesting error");
    assert!(error.message.contains("nested deeper"), "{}", error.message);
    assert_eq!(error.line, Some(2));
}

#[test]
fn test_moderate_nesting_still_runs() {
    let source = format!("console.log(JSON.stringify({}1{}))", "[".repeat(50), "]".repeat(50));
    let result = run(&source);
    assert!(result.is_success(), "{:?}", result.error);
    assert_eq!(result.entries.len(), 1);
}
