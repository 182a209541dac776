//! Best-effort recovery of a source line from engine error text.
//!
//! Stack and message formats differ between engines and versions, so every
//! caller must be prepared for `None`; the runner reports line 1 then.
//!
//! With boa as the engine only the `line N, col M` pattern fires in
//! practice: boa attaches positions to syntax errors, but its error objects
//! carry no `stack`, so thrown runtime errors always land on line 1. The
//! frame patterns match V8-style and generic `file:line:col` traces and stay
//! for engines (or user-supplied `stack` strings) that produce them.

use std::sync::LazyLock;

use regex::Regex;

static PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // V8-style dynamic frame: "at eval (<anonymous>:3:9)"
        r"<anonymous>:(\d+):\d+",
        // Generic frame suffix: "at foo (script.js:3:9)" / "@script:3:9"
        r":(\d+):\d+\)?\s*$",
        // boa syntax errors: "... at line 3, col 9"
        r"line (\d+), col(?:umn)? \d+",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(&format!("(?m){pattern}")).ok())
    .collect()
});

/// First line number a known frame pattern finds in `trace`.
pub fn line_from_trace(trace: &str) -> Option<u32> {
    PATTERNS.iter().find_map(|re| {
        re.captures(trace)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
    })
}

static POSITION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"line (\d+), col(umn)? (\d+)").ok());

/// Rewrites `line N, col M` positions in an engine message so they refer to
/// the user's source instead of the wrapped program.
pub fn rebase_positions(message: &str, prefix: u32, total: u32) -> String {
    let Some(re) = POSITION.as_ref() else {
        return message.to_string();
    };
    re.replace_all(message, |caps: &regex::Captures<'_>| {
        let raw = caps[1].parse::<u32>().ok();
        let column = caps.get(2).map_or("", |_| "umn");
        format!("line {}, col{} {}", map_to_source(raw, prefix, total), column, &caps[3])
    })
    .into_owned()
}

/// Maps a line of the wrapped program back onto the user's source.
///
/// `prefix` is the number of wrapper lines in front of the user code and
/// `total` the user's line count. Always returns a line in `1..=total`.
pub fn map_to_source(raw: Option<u32>, prefix: u32, total: u32) -> u32 {
    let total = total.max(1);
    match raw {
        Some(line) if line > prefix => (line - prefix).min(total),
        _ => 1,
    }
}

/// Counts lines the way editors number them: an empty text still has line 1.
pub fn line_count(source: &str) -> u32 {
    let count = source.split('\n').count();
    u32::try_from(count).unwrap_or(u32::MAX)
}
