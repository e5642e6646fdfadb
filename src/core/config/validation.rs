use serde_json::{Map, Value};

use super::types::VALVE_INTEGER_BOUNDS;
use crate::core::errors::ConfigError;

const PIPELINE_SECTIONS: [&str; 2] = ["firecrawl_openai", "firecrawl_groq"];

/// Shape and range checks on the raw merged document, run before it is
/// deserialized into `AppConfig`.
pub fn validate_config(config: &Value) -> Result<(), ConfigError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65_535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    if let Some(pipelines) = expect_optional_object(root, "pipelines")? {
        for (name, value) in pipelines {
            let path_prefix = format!("pipelines.{}", name);
            if !PIPELINE_SECTIONS.contains(&name.as_str()) {
                return Err(ConfigError::invalid(path_prefix, "unknown pipeline"));
            }
            let entry = value
                .as_object()
                .ok_or_else(|| config_type_error(&path_prefix, "object"))?;
            validate_valves(entry, &path_prefix)?;
        }
    }

    if let Some(youtube) = expect_optional_object(root, "youtube")? {
        validate_optional_string_field(youtube, "youtube.api_key", "api_key")?;
        validate_url_field(youtube, "youtube.api_base", "api_base")?;
        validate_url_field(youtube, "youtube.watch_base", "watch_base")?;
        validate_optional_string_field(youtube, "youtube.default_language", "default_language")?;
        validate_u64_field(youtube, "youtube.max_comments", "max_comments", 1, 1_000_000)?;
        validate_u64_field(
            youtube,
            "youtube.request_timeout_secs",
            "request_timeout_secs",
            1,
            3_600,
        )?;
    }

    Ok(())
}

fn validate_valves(entry: &Map<String, Value>, prefix: &str) -> Result<(), ConfigError> {
    let path = |key: &str| format!("{}.{}", prefix, key);

    for key in ["firecrawl_api_key", "completion_api_key", "completion_provider", "model"] {
        validate_optional_string_field(entry, &path(key), key)?;
    }
    for key in ["firecrawl_base_url", "ollama_base_url", "completion_base_url"] {
        validate_url_field(entry, &path(key), key)?;
    }
    if let Some(mode) = entry.get("crawl_mode") {
        match mode.as_str() {
            Some("crawl") | Some("scrape") => {}
            _ => return Err(config_type_error(&path("crawl_mode"), "\"crawl\" or \"scrape\"")),
        }
    }
    if let Some(layout) = entry.get("prompt_layout") {
        match layout.as_str() {
            Some("system_and_user") | Some("single_user") => {}
            _ => {
                return Err(config_type_error(
                    &path("prompt_layout"),
                    "\"system_and_user\" or \"single_user\"",
                ))
            }
        }
    }

    validate_f64_field(entry, &path("temperature"), "temperature", 0.0, 2.0)?;
    validate_f64_field(entry, &path("top_p"), "top_p", f64::MIN_POSITIVE, 1.0)?;
    for (key, min, max) in VALVE_INTEGER_BOUNDS {
        validate_u64_field(entry, &path(key), key, min, max)?;
    }

    if let (Some(size), Some(overlap)) = (
        entry.get("chunk_size").and_then(Value::as_u64),
        entry.get("chunk_overlap").and_then(Value::as_u64),
    ) {
        if overlap >= size {
            return Err(ConfigError::invalid(
                path("chunk_overlap"),
                format!("must be smaller than chunk_size ({})", size),
            ));
        }
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ConfigError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() {
        return Ok(());
    }
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ConfigError::invalid(
            path,
            format!("must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(ConfigError::invalid(
            path,
            format!("must be between {} and {}", min.max(0.0), max),
        ));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn validate_url_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if reqwest::Url::parse(text.trim()).is_err() {
        return Err(ConfigError::invalid(path, "expected an absolute URL"));
    }
    Ok(())
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ConfigError::invalid(
                format!("{}[{}]", path, index),
                "value cannot be empty",
            ));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ConfigError {
    ConfigError::invalid(path, format!("expected {}", expected))
}
