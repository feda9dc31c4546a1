pub mod chat;
pub mod config;
pub mod doctor;
pub mod migrate;
pub mod seed;

use std::future::Future;
use std::path::PathBuf;

use nunzio_core::config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LoggingConfig};
use nunzio_db::{connect_with_settings, migrations, CatalogSeed, DbPool};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    fn from_failure(command: &str, (error_class, message, exit_code): Failure) -> Self {
        Self::failure(command, error_class, message, exit_code)
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Flags shared by every subcommand.
#[derive(Clone, Debug, Default)]
pub struct GlobalOptions {
    pub config_path: Option<PathBuf>,
    pub database_url: Option<String>,
    pub user_id: Option<String>,
}

impl GlobalOptions {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config_path.clone(),
            require_file: self.config_path.is_some(),
            overrides: ConfigOverrides {
                database_url: self.database_url.clone(),
                cli_user_id: self.user_id.clone(),
                ..ConfigOverrides::default()
            },
        }
    }

    pub fn load_config(&self) -> Result<AppConfig, ConfigError> {
        AppConfig::load(self.load_options())
    }
}

/// `(error_class, message, exit_code)` for a failed command step.
pub(crate) type Failure = (&'static str, String, u8);

pub(crate) fn config_failure(error: ConfigError) -> Failure {
    ("config_validation", format!("configuration issue: {error}"), 2)
}

pub(crate) fn block_on<T>(
    future: impl Future<Output = Result<T, Failure>>,
) -> Result<T, Failure> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| ("runtime_init", format!("failed to initialize async runtime: {error}"), 3))?;
    runtime.block_on(future)
}

/// Connects and applies migrations; optionally loads the catalog seed.
pub(crate) async fn open_database(config: &AppConfig, seed: bool) -> Result<DbPool, Failure> {
    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

    migrations::run_pending(&pool).await.map_err(|error| ("migration", error.to_string(), 5u8))?;

    if seed {
        CatalogSeed::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
    }
    Ok(pool)
}

/// Diagnostics go to stderr so they never interleave with chat replies.
pub fn init_logging(config: &LoggingConfig) {
    use nunzio_core::config::LogFormat::*;

    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let _ = match config.format {
        Compact => builder.compact().try_init(),
        Pretty => builder.pretty().try_init(),
        Json => builder.json().try_init(),
    };
}
