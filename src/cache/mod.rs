//! Persistence of the last-edited source text.

use std::{fs, path::PathBuf};

use anyhow::Result;

use crate::config::Settings;

/// Fixed key the snippet is stored under.
pub const STORAGE_KEY: &str = "runjs_code";

pub const DEFAULT_SNIPPET: &str = "// Welcome!\nconsole.log(\"Hello World\");";

#[derive(Debug, Clone)]
pub struct SnippetStore {
    storage_path: PathBuf,
}

impl SnippetStore {
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: storage_path.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.storage_path)
    }

    pub fn file_path(&self) -> PathBuf {
        self.storage_path.join(format!("{STORAGE_KEY}.js"))
    }

    pub fn exists(&self) -> bool {
        self.file_path().exists()
    }

    /// The stored snippet, or [`DEFAULT_SNIPPET`] when nothing (or nothing
    /// readable) has been stored yet.
    pub fn load(&self) -> String {
        fs::read_to_string(self.file_path())
            .ok()
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| DEFAULT_SNIPPET.to_string())
    }

    pub fn save(&self, source: &str) -> Result<()> {
        fs::create_dir_all(&self.storage_path)?;
        fs::write(self.file_path(), source)?;
        Ok(())
    }

    pub fn invalidate(&self) {
        let _ = fs::remove_file(self.file_path());
    }
}
