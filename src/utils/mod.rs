//! Source file helpers.

use std::fs;
use std::path::Path;

use anyhow::{bail, Result};

/// Read a JavaScript source file. Any extension is accepted, but the path
/// must name an existing regular file holding UTF-8 text.
pub fn read_source(path: &Path) -> Result<String> {
    if !path.exists() {
        bail!("Source file '{}' does not exist", path.display());
    }

    if !path.is_file() {
        bail!("'{}' is not a file", path.display());
    }

    fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file '{}': {}", path.display(), e))
}

/// Strip a UTF-8 byte order mark and a leading `#!` line, keeping the line
/// count intact so error lines still match the file.
pub fn normalize_source(text: &str) -> String {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    if text.starts_with("#!") {
        match text.find('\n') {
            Some(end) => format!("//{}", &text[2..end]) + &text[end..],
            None => format!("//{}", &text[2..]),
        }
    } else {
        text.to_string()
    }
}
