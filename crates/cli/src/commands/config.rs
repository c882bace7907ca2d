use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use costpilot_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run(options: &LoadOptions) -> String {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];

    lines.push(render_line(
        "llm.endpoint",
        &config.llm.endpoint,
        flag_or(options.overrides.endpoint.is_some(), "--endpoint", || {
            source("llm.endpoint", &["COSTPILOT_LLM_ENDPOINT"])
        }),
    ));

    let api_key = if config.llm.has_api_key() { "<redacted>" } else { "<unset>" };
    lines.push(render_line(
        "llm.api_key",
        api_key,
        source("llm.api_key", &["COSTPILOT_LLM_API_KEY", "HF_API_TOKEN"]),
    ));

    lines.push(render_line(
        "llm.models",
        &config.llm.models.join(","),
        flag_or(options.overrides.models.is_some(), "--model", || {
            source("llm.models", &["COSTPILOT_LLM_MODELS"])
        }),
    ));
    lines.push(render_line(
        "llm.max_attempts",
        &config.llm.max_attempts.to_string(),
        flag_or(options.overrides.max_attempts.is_some(), "--max-attempts", || {
            source("llm.max_attempts", &["COSTPILOT_LLM_MAX_ATTEMPTS"])
        }),
    ));
    lines.push(render_line(
        "llm.max_tokens",
        &config.llm.max_tokens.to_string(),
        source("llm.max_tokens", &["COSTPILOT_LLM_MAX_TOKENS"]),
    ));
    lines.push(render_line(
        "llm.timeout_secs",
        &config.llm.timeout_secs.to_string(),
        source("llm.timeout_secs", &["COSTPILOT_LLM_TIMEOUT_SECS"]),
    ));

    lines.push(render_line(
        "workspace.dir",
        &config.workspace.dir.display().to_string(),
        flag_or(options.overrides.workspace_dir.is_some(), "--workspace", || {
            source("workspace.dir", &["COSTPILOT_WORKSPACE_DIR"])
        }),
    ));

    let level_source = flag_or(options.overrides.log_level.is_some(), "--log-level", || {
        source("logging.level", &["COSTPILOT_LOGGING_LEVEL", "COSTPILOT_LOG_LEVEL"])
    });
    lines.push(render_line("logging.level", &config.logging.level, level_source));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", &["COSTPILOT_LOGGING_FORMAT", "COSTPILOT_LOG_FORMAT"]),
    ));

    lines.join("\n")
}

fn flag_or(flag_set: bool, flag: &str, fallback: impl FnOnce() -> String) -> String {
    if flag_set {
        format!("flag ({flag})")
    } else {
        fallback()
    }
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    let root = PathBuf::from("costpilot.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/costpilot.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
