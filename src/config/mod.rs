use std::{
    collections::HashMap,
    env, fs,
    io::{BufRead, BufReader},
    path::PathBuf,
    time::Duration,
};

use directories::BaseDirs;

use crate::execution::loop_guard::DEFAULT_CEILING;

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        let mut map = default_map();
        let config_path = default_config_path();

        // Read .runjsrc if exists
        if let Ok(file) = fs::File::open(&config_path) {
            map.extend(parse_rc(BufReader::new(file)));
        }

        // Overlay environment variables (take precedence)
        for (k, v) in env::vars() {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self {
            inner: map,
            config_path,
        }
    }

    /// Defaults overlaid with `pairs`; no file or environment lookups.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = default_map();
        map.extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        Self {
            inner: map,
            config_path: default_config_path(),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).map(PathBuf::from)
    }

    pub fn storage_path(&self) -> PathBuf {
        self.get_path("RUNJS_STORAGE_PATH")
            .unwrap_or_else(runjs_dir)
    }

    /// Typed view over the raw keys. Unparseable numbers fall back to defaults.
    pub fn settings(&self) -> Settings {
        let millis = |key: &str, default: u64| Duration::from_millis(self.get_u64(key).unwrap_or(default));
        let loop_guard = if self.get_bool("RUNJS_LOOP_GUARD") {
            Some(self.get_u64("RUNJS_LOOP_LIMIT").unwrap_or(DEFAULT_CEILING))
        } else {
            None
        };
        Settings {
            timeout: millis("RUNJS_TIMEOUT_MS", 2000),
            debounce: millis("RUNJS_DEBOUNCE_MS", 400),
            poll_interval: millis("RUNJS_POLL_MS", 250),
            loop_guard,
            storage_path: self.storage_path(),
            worker_stderr: self.get_bool("RUNJS_WORKER_STDERR"),
        }
    }
}

/// Resolved runtime settings. CLI flags are applied on top by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub timeout: Duration,
    pub debounce: Duration,
    pub poll_interval: Duration,
    pub loop_guard: Option<u64>,
    pub storage_path: PathBuf,
    pub worker_stderr: bool,
}

/// Parses `KEY=VALUE` lines; blank lines and `#` comments are skipped.
pub fn parse_rc<R: BufRead>(reader: R) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in reader.lines().map_while(Result::ok) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            map.insert(k.trim().to_string(), v.trim().to_string());
        }
    }
    map
}

fn is_config_key(k: &str) -> bool {
    k.starts_with("RUNJS_")
}

fn runjs_dir() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("runjs")
}

fn default_config_path() -> PathBuf {
    runjs_dir().join(".runjsrc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();
    // Paths
    m.insert(
        "RUNJS_STORAGE_PATH".into(),
        runjs_dir().to_string_lossy().into_owned(),
    );

    // Numbers (milliseconds / iterations)
    m.insert("RUNJS_TIMEOUT_MS".into(), "2000".into());
    m.insert("RUNJS_DEBOUNCE_MS".into(), "400".into());
    m.insert("RUNJS_POLL_MS".into(), "250".into());
    m.insert("RUNJS_LOOP_LIMIT".into(), DEFAULT_CEILING.to_string());

    // Bools as strings
    m.insert("RUNJS_LOOP_GUARD".into(), "true".into());
    m.insert("RUNJS_WORKER_STDERR".into(), "false".into());

    m
}
