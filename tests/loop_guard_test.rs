use runjs::execution::loop_guard::{instrument, LoopGuard, GUARD_FN};

const CHECK: &str = "__runjsLoopGuard();";

#[test]
fn test_guard_name_matches_inserted_call() {
    assert_eq!(format!("{GUARD_FN}();"), CHECK);
}

#[test]
fn test_braced_loops_are_instrumented() {
    assert_eq!(
        instrument("while (x) { a(); }"),
        format!("while (x) {{{CHECK} a(); }}")
    );
    assert_eq!(
        instrument("for (let i = 0; i < n; i++) { a(i); }"),
        format!("for (let i = 0; i < n; i++) {{{CHECK} a(i); }}")
    );
    assert_eq!(
        instrument("do { a(); } while (x);"),
        format!("do {{{CHECK} a(); }} while (x);")
    );
    assert_eq!(
        instrument("for await (const c of s) { a(c); }"),
        format!("for await (const c of s) {{{CHECK} a(c); }}")
    );
}

#[test]
fn test_unbraced_bodies_are_left_alone() {
    let source = "for (;;) x++;\nwhile (y) y--;";
    assert_eq!(instrument(source), source);
}

#[test]
fn test_literals_and_comments_are_skipped() {
    let sources = [
        r#"const s = "while (x) { }";"#,
        "const t = 'for (;;) {';",
        "// while (true) { }\nlet a = 1;",
        "/* for (;;) { } */ let b = 2;",
        "const re = /while (x) {/;",
        "const u = `for (${a}) {`;",
    ];
    for source in sources {
        assert_eq!(instrument(source), source, "rewrote {source}");
    }
}

#[test]
fn test_member_named_like_keyword() {
    let source = "obj.while = 1; obj.for = 2;";
    assert_eq!(instrument(source), source);
}

#[test]
fn test_loop_inside_loop_header() {
    let source = "for (const x of f(() => { while (a) { b(); } })) { c(); }";
    assert_eq!(
        instrument(source),
        format!("for (const x of f(() => {{ while (a) {{{CHECK} b(); }} }})) {{{CHECK} c(); }}")
    );
}

#[test]
fn test_line_structure_is_preserved() {
    let source = "let n = 0;\nfor (let i = 0; i < 3; i++) {\n  while (n < i) {\n    n++;\n  }\n}\nconsole.log(n);";
    let out = instrument(source);
    assert_eq!(out.lines().count(), source.lines().count());
    assert_eq!(out.matches(CHECK).count(), 2);
}

#[test]
fn test_tick_trips_after_ceiling() {
    let guard = LoopGuard::new(3);
    for _ in 0..3 {
        assert!(guard.tick().is_ok());
    }
    let err = guard.tick().unwrap_err();
    assert_eq!(err, "Infinite loop detected: exceeded 3 loop iterations");
    assert_eq!(guard.iterations(), 4);
}

#[test]
fn test_clones_share_one_counter() {
    let guard = LoopGuard::new(10);
    let other = guard.clone();
    guard.tick().unwrap();
    other.tick().unwrap();
    assert_eq!(guard.iterations(), 2);
}
