//! Minimal JavaScript lexer: enough to find loop keywords and brackets
//! outside of strings, templates, comments and regex literals.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Tok<'a> {
    Word(&'a str),
    Punct(u8),
    Literal,
}

#[derive(Debug, Clone, Copy)]
pub(super) struct Token<'a> {
    pub(super) kind: Tok<'a>,
    pub(super) end: usize,
}

pub(super) fn matching_paren(tokens: &[Token<'_>], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (k, token) in tokens.iter().enumerate().skip(open) {
        match token.kind {
            Tok::Punct(b'(') => depth += 1,
            Tok::Punct(b')') => {
                depth -= 1;
                if depth == 0 {
                    return Some(k);
                }
            }
            _ => {}
        }
    }
    None
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

const REGEX_AFTER_WORDS: &[&str] = &[
    "return", "typeof", "case", "do", "else", "in", "of", "new", "delete", "void", "throw",
    "instanceof", "yield", "await",
];

fn regex_allowed(prev: Option<&Token<'_>>) -> bool {
    match prev.map(|t| t.kind) {
        None => true,
        Some(Tok::Punct(p)) => !matches!(p, b')' | b']' | b'}'),
        Some(Tok::Word(w)) => REGEX_AFTER_WORDS.contains(&w),
        Some(Tok::Literal) => false,
    }
}

pub(super) fn tokenize(source: &str) -> Vec<Token<'_>> {
    let bytes = source.as_bytes();
    let mut tokens: Vec<Token<'_>> = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b if b.is_ascii_whitespace() => i += 1,
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = find(bytes, i + 2, b"*/").map_or(bytes.len(), |at| at + 2);
            }
            b'/' if regex_allowed(tokens.last()) => {
                i = skip_regex(bytes, i);
                tokens.push(Token { kind: Tok::Literal, end: i });
            }
            b'"' | b'\'' => {
                i = skip_quoted(bytes, i, b);
                tokens.push(Token { kind: Tok::Literal, end: i });
            }
            b'`' => {
                i = skip_template(bytes, i);
                tokens.push(Token { kind: Tok::Literal, end: i });
            }
            b if is_word_byte(b) => {
                let start = i;
                while i < bytes.len() && is_word_byte(bytes[i]) {
                    i += 1;
                }
                let kind = if b.is_ascii_digit() {
                    Tok::Literal
                } else {
                    Tok::Word(&source[start..i])
                };
                tokens.push(Token { kind, end: i });
            }
            _ => {
                i += 1;
                tokens.push(Token { kind: Tok::Punct(b), end: i });
            }
        }
    }
    tokens
}

fn find(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    bytes
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|at| from + at)
}

fn skip_quoted(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn skip_regex(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    let mut in_class = false;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            b'[' => {
                in_class = true;
                i += 1;
            }
            b']' => {
                in_class = false;
                i += 1;
            }
            b'/' if !in_class => {
                i += 1;
                while i < bytes.len() && is_word_byte(bytes[i]) {
                    i += 1;
                }
                return i;
            }
            _ => i += 1,
        }
    }
    bytes.len()
}

fn skip_template(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => return i + 1,
            b'$' if bytes.get(i + 1) == Some(&b'{') => i = skip_substitution(bytes, i + 2),
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Skips the expression inside `${ ... }`, returning the index after its `}`.
fn skip_substitution(bytes: &[u8], start: usize) -> usize {
    let mut depth = 1usize;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                depth += 1;
                i += 1;
            }
            b'}' => {
                depth -= 1;
                i += 1;
                if depth == 0 {
                    return i;
                }
            }
            q @ (b'"' | b'\'') => i = skip_quoted(bytes, i, q),
            b'`' => i = skip_template(bytes, i),
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Line (1-based) of the first bracket that opens deeper than `limit` levels,
/// counting `(`, `[` and `{` outside literals and comments.
pub(super) fn nesting_overflow(source: &str, limit: usize) -> Option<u32> {
    let mut depth = 0usize;
    for token in tokenize(source) {
        match token.kind {
            Tok::Punct(b'(' | b'[' | b'{') => {
                depth += 1;
                if depth > limit {
                    let newlines = source.as_bytes()[..token.end]
                        .iter()
                        .filter(|&&b| b == b'\n')
                        .count();
                    return Some(u32::try_from(newlines + 1).unwrap_or(u32::MAX));
                }
            }
            Tok::Punct(b')' | b']' | b'}') => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}
