use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use nunzio_core::config::AppConfig;
use toml::Value;

use crate::commands::GlobalOptions;

struct Field {
    key: &'static str,
    value: String,
    env_key: &'static str,
    overridden: bool,
}

pub fn run(options: &GlobalOptions) -> String {
    let config = match options.load_config() {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];
    for field in fields(&config, options) {
        let source = if field.overridden {
            "flag".to_string()
        } else {
            field_source(
                field.key,
                field.env_key,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            )
        };
        lines.push(render_line(field.key, &field.value, source));
    }
    lines.join("\n")
}

fn fields(config: &AppConfig, options: &GlobalOptions) -> Vec<Field> {
    let field = |key, value: String, env_key| Field { key, value, env_key, overridden: false };
    let allowed_users = if config.server.allowed_user_ids.is_empty() {
        "<any>".to_string()
    } else {
        config.server.allowed_user_ids.join(",")
    };

    vec![
        Field {
            overridden: options.database_url.is_some(),
            ..field("database.url", config.database.url.clone(), "NUNZIO_DATABASE_URL")
        },
        field(
            "database.max_connections",
            config.database.max_connections.to_string(),
            "NUNZIO_DATABASE_MAX_CONNECTIONS",
        ),
        field(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            "NUNZIO_DATABASE_TIMEOUT_SECS",
        ),
        field("llm.provider", format!("{:?}", config.llm.provider), "NUNZIO_LLM_PROVIDER"),
        field("llm.model", config.llm.model.clone(), "NUNZIO_LLM_MODEL"),
        field(
            "llm.base_url",
            config.llm.base_url.clone().unwrap_or_else(|| "<provider default>".to_string()),
            "NUNZIO_LLM_BASE_URL",
        ),
        field(
            "llm.api_key",
            if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" }.to_string(),
            "NUNZIO_LLM_API_KEY",
        ),
        field("llm.timeout_secs", config.llm.timeout_secs.to_string(), "NUNZIO_LLM_TIMEOUT_SECS"),
        field("llm.max_retries", config.llm.max_retries.to_string(), "NUNZIO_LLM_MAX_RETRIES"),
        field(
            "routing.min_confidence",
            config.routing.min_confidence.to_string(),
            "NUNZIO_ROUTING_MIN_CONFIDENCE",
        ),
        field(
            "server.bind_address",
            config.server.bind_address.clone(),
            "NUNZIO_SERVER_BIND_ADDRESS",
        ),
        field("server.port", config.server.port.to_string(), "NUNZIO_SERVER_PORT"),
        field("server.allowed_user_ids", allowed_users, "NUNZIO_SERVER_ALLOWED_USER_IDS"),
        Field {
            overridden: options.user_id.is_some(),
            ..field("cli.user_id", config.cli.user_id.clone(), "NUNZIO_CLI_USER_ID")
        },
        field("logging.level", config.logging.level.clone(), "NUNZIO_LOGGING_LEVEL"),
        field("logging.format", format!("{:?}", config.logging.format), "NUNZIO_LOGGING_FORMAT"),
    ]
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }
    [PathBuf::from("nunzio.toml"), PathBuf::from("config/nunzio.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
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

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::{contains_path, render_line};

    #[test]
    fn nested_keys_are_found_in_the_file_document() {
        let doc: Value = "[llm]\nmodel = \"llama3.2\"\n".parse().expect("toml");
        assert!(contains_path(&doc, "llm.model"));
        assert!(!contains_path(&doc, "llm.api_key"));
        assert!(!contains_path(&doc, "server.port"));
    }

    #[test]
    fn lines_name_their_source() {
        assert_eq!(
            render_line("server.port", "8080", "default".to_string()),
            "- server.port = 8080 (source: default)"
        );
    }
}
