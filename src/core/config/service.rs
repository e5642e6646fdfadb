use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::warn;

use super::paths::AppPaths;
use super::types::AppConfig;
use super::validation::validate_config;
use crate::core::errors::ConfigError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 10] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
    "private_key",
    "access_key",
    "access_token",
    "bearer",
];

const SENSITIVE_WHITELIST: [&str; 3] = ["max_tokens", "total_tokens", "tokens"];

/// Environment variables that override config values, and where they land.
const ENV_OVERRIDES: [(&str, &[&str]); 6] = [
    (
        "FIRECRAWL_API_KEY",
        &["pipelines", "firecrawl_openai", "firecrawl_api_key"],
    ),
    (
        "FIRECRAWL_API_KEY",
        &["pipelines", "firecrawl_groq", "firecrawl_api_key"],
    ),
    (
        "OPENAI_API_KEY",
        &["pipelines", "firecrawl_openai", "completion_api_key"],
    ),
    (
        "GROQ_API_KEY",
        &["pipelines", "firecrawl_groq", "completion_api_key"],
    ),
    ("YOUTUBE_API_KEY", &["youtube", "api_key"]),
    ("RAGLINE_SERVER_PORT", &["server", "port"]),
];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> &Path {
        &self.paths.config_file
    }

    pub fn secrets_path(&self) -> &Path {
        &self.paths.secrets_file
    }

    /// Raw file contents: public config with secrets merged back in.
    pub fn load_config(&self) -> Value {
        let public_config = load_yaml_file(self.config_path());
        let secrets_config = load_yaml_file(self.secrets_path());
        deep_merge(&public_config, &secrets_config)
    }

    /// Defaults, then files, then process environment.
    pub fn load_app_config(&self) -> Result<AppConfig, ConfigError> {
        self.load_app_config_with(|key| env::var(key).ok())
    }

    pub fn load_app_config_with<F>(&self, lookup: F) -> Result<AppConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = serde_json::to_value(AppConfig::default())
            .map_err(|err| ConfigError::Io(err.to_string()))?;
        let from_files = deep_merge(&defaults, &self.load_config());
        let merged = deep_merge(&from_files, &env_overrides_from(lookup)?);

        validate_config(&merged)?;
        let config: AppConfig = serde_json::from_value(merged)
            .map_err(|err| ConfigError::invalid("config", err.to_string()))?;
        for (_, valves) in config.pipelines.entries() {
            valves.validate_ranges()?;
        }
        Ok(config)
    }

    pub fn update_config(&self, config_data: Value, merge: bool) -> Result<(), ConfigError> {
        let current = self.load_config();
        let restored = restore_redacted_values(&config_data, &current);
        let to_save = if merge {
            deep_merge(&current, &restored)
        } else {
            restored
        };

        validate_config(&to_save)?;
        save_config_files(self, &to_save)?;
        Ok(())
    }
}

fn env_overrides_from<F>(lookup: F) -> Result<Value, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut overrides = Value::Object(Map::new());
    for (var, path) in ENV_OVERRIDES {
        let Some(raw) = lookup(var) else {
            continue;
        };
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let value = if var == "RAGLINE_SERVER_PORT" {
            let port: u16 = raw
                .parse()
                .map_err(|_| ConfigError::invalid(var, "expected a port number"))?;
            Value::from(port)
        } else {
            Value::String(raw.to_string())
        };
        set_path(&mut overrides, path, value);
    }
    Ok(overrides)
}

fn set_path(root: &mut Value, path: &[&str], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut cursor = root;
    for key in parents {
        let Some(map) = cursor.as_object_mut() else {
            return;
        };
        cursor = map
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if let Value::Object(map) = cursor {
        map.insert(last.to_string(), value);
    }
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => Value::Object(Map::new()),
            Err(err) => {
                warn!("Ignoring unparsable config file {}: {}", path.display(), err);
                Value::Object(Map::new())
            }
        },
        Err(err) => {
            warn!("Failed to read config file {}: {}", path.display(), err);
            Value::Object(Map::new())
        }
    }
}

fn save_config_files(service: &ConfigService, config: &Value) -> Result<(), ConfigError> {
    let (public_config, secrets_config) = split_config(config);

    write_yaml(service.config_path(), &public_config)?;
    write_yaml(service.secrets_path(), &secrets_config)?;
    Ok(())
}

fn write_yaml(path: &Path, value: &Value) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let yaml = serde_yaml::to_string(value).map_err(|err| ConfigError::Io(err.to_string()))?;
    fs::write(path, yaml).map_err(|err| ConfigError::Io(format!("{}: {}", path.display(), err)))
}

pub fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn split_config(config: &Value) -> (Value, Value) {
    match config {
        Value::Object(map) => {
            let mut public_map = Map::new();
            let mut secret_map = Map::new();

            for (key, value) in map {
                match value {
                    Value::Object(_) => {
                        let (public_sub, secret_sub) = split_config(value);
                        if !is_empty_object(&public_sub) {
                            public_map.insert(key.clone(), public_sub);
                        }
                        if !is_empty_object(&secret_sub) {
                            secret_map.insert(key.clone(), secret_sub);
                        }
                    }
                    _ => {
                        if is_sensitive_key(key) && !value.is_null() {
                            secret_map.insert(key.clone(), value.clone());
                        } else {
                            public_map.insert(key.clone(), value.clone());
                        }
                    }
                }
            }

            (Value::Object(public_map), Value::Object(secret_map))
        }
        _ => (config.clone(), Value::Object(Map::new())),
    }
}

/// Replaces every non-empty secret with `****`.
pub fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !is_blank(val) {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

/// Puts back the original value wherever `new_value` still carries `****`.
pub fn restore_redacted_values(new_value: &Value, original: &Value) -> Value {
    match new_value {
        Value::Object(map) => {
            let mut restored = Map::new();
            let original_map = original.as_object();

            for (key, value) in map {
                let orig_val = original_map.and_then(|m| m.get(key));
                if value.as_str() == Some(REDACT_PLACEHOLDER) {
                    if let Some(orig) = orig_val {
                        restored.insert(key.clone(), orig.clone());
                    }
                    continue;
                }

                if value.is_object() {
                    let merged = restore_redacted_values(value, orig_val.unwrap_or(&Value::Null));
                    restored.insert(key.clone(), merged);
                } else {
                    restored.insert(key.clone(), value.clone());
                }
            }

            Value::Object(restored)
        }
        _ => new_value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}

fn is_empty_object(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.is_empty())
}
