//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{num::NonZeroU32, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use uuid::Uuid;

use crate::application::analytics::RecorderConfig;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "pressroom";
const ENV_PREFIX: &str = "PRESSROOM";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_STORAGE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_ANALYTICS_QUEUE_CAPACITY: u32 = 1_024;
const DEFAULT_ENRICHMENT_TIMEOUT_MS: u64 = 250;
const DEFAULT_PUBLISH_BATCH: u32 = 100;
const DEFAULT_REPORT_WINDOW_DAYS: u32 = 30;

/// Command-line arguments for the pressroom binary.
#[derive(Debug, Parser)]
#[command(
    name = "pressroom",
    version,
    about = "Content governance and interaction engine"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "PRESSROOM_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL", global = true)]
    pub database_url: Option<String>,

    /// Override the per-call storage deadline.
    #[arg(long = "storage-timeout-ms", value_name = "MILLIS", global = true)]
    pub storage_timeout_ms: Option<u64>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Apply pending database migrations.
    Migrate,
    /// Publish every scheduled draft whose time has come.
    #[command(name = "publish-due")]
    PublishDue(PublishDueArgs),
    /// Print an engagement rollup for one content item as JSON.
    Report(ReportArgs),
    /// Feed newline-delimited JSON analytics events from stdin through the recorder.
    Ingest,
}

#[derive(Debug, Args, Clone)]
pub struct PublishDueArgs {
    /// Maximum number of items promoted in one pass.
    #[arg(long, value_name = "COUNT")]
    pub limit: Option<u32>,
}

#[derive(Debug, Args, Clone)]
pub struct ReportArgs {
    /// Content item to report on.
    #[arg(long = "content-id", value_name = "UUID")]
    pub content_id: Uuid,

    /// Trailing window, in days, ending now.
    #[arg(long = "window-days", value_name = "DAYS", default_value_t = DEFAULT_REPORT_WINDOW_DAYS)]
    pub window_days: u32,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub storage: StorageSettings,
    pub analytics: AnalyticsSettings,
    pub scheduler: SchedulerSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AnalyticsSettings {
    pub queue_capacity: NonZeroU32,
    pub enrichment_timeout: Duration,
}

impl From<&AnalyticsSettings> for RecorderConfig {
    fn from(settings: &AnalyticsSettings) -> Self {
        Self {
            queue_capacity: settings.queue_capacity.get() as usize,
            enrichment_timeout: settings.enrichment_timeout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub publish_batch: NonZeroU32,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Parse process arguments and resolve settings from them.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let cli = CliArgs::parse();
    let settings = load(&cli)?;
    Ok((cli, settings))
}

pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    storage: RawStorageSettings,
    analytics: RawAnalyticsSettings,
    scheduler: RawSchedulerSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(timeout) = overrides.storage_timeout_ms {
            self.storage.timeout_ms = Some(timeout);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            database,
            storage,
            analytics,
            scheduler,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            storage: build_storage_settings(storage)?,
            analytics: build_analytics_settings(analytics)?,
            scheduler: build_scheduler_settings(scheduler)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_storage_settings(storage: RawStorageSettings) -> Result<StorageSettings, LoadError> {
    let timeout = positive_millis(
        storage.timeout_ms.unwrap_or(DEFAULT_STORAGE_TIMEOUT_MS),
        "storage.timeout_ms",
    )?;
    Ok(StorageSettings { timeout })
}

fn build_analytics_settings(
    analytics: RawAnalyticsSettings,
) -> Result<AnalyticsSettings, LoadError> {
    let queue_capacity = non_zero_u32(
        analytics
            .queue_capacity
            .unwrap_or(DEFAULT_ANALYTICS_QUEUE_CAPACITY)
            .into(),
        "analytics.queue_capacity",
    )?;
    let enrichment_timeout = positive_millis(
        analytics
            .enrichment_timeout_ms
            .unwrap_or(DEFAULT_ENRICHMENT_TIMEOUT_MS),
        "analytics.enrichment_timeout_ms",
    )?;

    Ok(AnalyticsSettings {
        queue_capacity,
        enrichment_timeout,
    })
}

fn build_scheduler_settings(
    scheduler: RawSchedulerSettings,
) -> Result<SchedulerSettings, LoadError> {
    let publish_batch = non_zero_u32(
        scheduler
            .publish_batch
            .unwrap_or(DEFAULT_PUBLISH_BATCH)
            .into(),
        "scheduler.publish_batch",
    )?;
    Ok(SchedulerSettings { publish_batch })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStorageSettings {
    timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAnalyticsSettings {
    queue_capacity: Option<u32>,
    enrichment_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSchedulerSettings {
    publish_batch: Option<u32>,
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    let value =
        u32::try_from(value).map_err(|_| LoadError::invalid(key, "value exceeds u32 range"))?;
    NonZeroU32::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn positive_millis(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_millis(value))
}

#[cfg(test)]
mod tests;
