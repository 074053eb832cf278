//! Configuration loading from disk and environment.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::config::schema::HostSettings;

/// Default settings file, resolved against the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "HostSettings.json";

/// Environment variable that overrides the settings file location.
pub const SETTINGS_PATH_ENV: &str = "HOST_SETTINGS_PATH";

/// Only environment variables under this root are treated as overrides.
const OVERRIDE_ROOT: &str = "configuration";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Json(serde_json::Error),
    Toml(toml::de::Error),
    Schema(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Failed to read {}: {}", path.display(), e),
            ConfigError::Json(e) => write!(f, "Parse error: {}", e),
            ConfigError::Toml(e) => write!(f, "Parse error: {}", e),
            ConfigError::Schema(e) => write!(f, "Invalid setting: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Resolve the settings file path from the process environment.
pub fn settings_path() -> PathBuf {
    std::env::var_os(SETTINGS_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE))
}

/// Load settings from `path`, overlaid with the process environment.
pub fn load_settings(path: &Path) -> Result<HostSettings, ConfigError> {
    load_settings_with_env(path, utf8_pairs(std::env::vars_os()))
}

/// Keep only environment pairs whose key and value are valid UTF-8.
fn utf8_pairs<I>(vars: I) -> impl Iterator<Item = (String, String)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter().filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
        (Ok(key), Ok(value)) => Some((key, value)),
        (Ok(key), Err(_)) => {
            tracing::debug!(key = %key, "Skipping environment variable with non UTF-8 value");
            None
        }
        _ => None,
    })
}

/// Load settings from `path`, overlaid with the given environment pairs.
///
/// Later pairs win over earlier ones, and every pair wins over the file.
pub fn load_settings_with_env<I>(path: &Path, env: I) -> Result<HostSettings, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;

    let mut root: Value = if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("toml")) {
        toml::from_str(&content).map_err(ConfigError::Toml)?
    } else {
        serde_json::from_str(&content).map_err(ConfigError::Json)?
    };

    for (key, value) in env {
        apply_override(&mut root, &key, value);
    }

    serde_json::from_value(lowercase_keys(root)).map_err(ConfigError::Schema)
}

/// Split an environment key into path segments. `__` and `:` both separate levels.
fn override_segments(key: &str) -> Option<Vec<&str>> {
    let segments: Vec<&str> = key
        .split("__")
        .flat_map(|part| part.split(':'))
        .filter(|s| !s.is_empty())
        .collect();

    match segments.first() {
        Some(first) if first.eq_ignore_ascii_case(OVERRIDE_ROOT) && segments.len() > 1 => Some(segments),
        _ => None,
    }
}

fn apply_override(root: &mut Value, key: &str, value: String) {
    let Some(segments) = override_segments(key) else {
        return;
    };

    let mut node = root;
    for (i, segment) in segments.iter().enumerate() {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(map) = node else {
            return;
        };

        // Reuse whatever casing the file already has for this key.
        let existing = map.keys().find(|k| k.eq_ignore_ascii_case(segment)).cloned();
        let slot = existing.unwrap_or_else(|| segment.to_string());

        if i + 1 == segments.len() {
            map.insert(slot, Value::String(value));
            return;
        }
        node = map.entry(slot).or_insert_with(|| Value::Object(Map::new()));
    }
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), lowercase_keys(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}
