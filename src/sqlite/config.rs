use std::time::Duration;

use crate::config::{ConnectParams, EngineOptions};
use crate::engine::{Engine, create_engine};
use crate::error::SqlScopeError;

use super::connection::SqliteDriver;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);
const DEFAULT_JOURNAL_MODE: &str = "WAL";
const JOURNAL_MODES: &[&str] = &["DELETE", "TRUNCATE", "PERSIST", "MEMORY", "WAL", "OFF"];

/// How the implicit transaction is opened.
///
/// `Deferred` takes the write lock only at the first write. Under WAL a transaction that
/// reads first and then writes fails with `SQLITE_BUSY` straight away if another
/// connection committed in between, without waiting on the busy timeout. `Immediate`
/// takes the write lock at `BEGIN`, so such workloads wait instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BeginMode {
    #[default]
    Deferred,
    Immediate,
    Exclusive,
}

impl BeginMode {
    pub(crate) fn begin_sql(self) -> &'static str {
        match self {
            BeginMode::Deferred => "BEGIN DEFERRED",
            BeginMode::Immediate => "BEGIN IMMEDIATE",
            BeginMode::Exclusive => "BEGIN EXCLUSIVE",
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            BeginMode::Deferred => "deferred",
            BeginMode::Immediate => "immediate",
            BeginMode::Exclusive => "exclusive",
        }
    }

    fn parse(value: &str) -> Result<Self, SqlScopeError> {
        match value.to_ascii_lowercase().as_str() {
            "deferred" => Ok(BeginMode::Deferred),
            "immediate" => Ok(BeginMode::Immediate),
            "exclusive" => Ok(BeginMode::Exclusive),
            _ => Err(SqlScopeError::ConfigError(format!(
                "unknown begin_mode '{value}'"
            ))),
        }
    }
}

/// Options for building a `SQLite` engine.
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    pub db_path: String,
    pub translate_placeholders: bool,
    pub busy_timeout: Duration,
    pub journal_mode: String,
    pub begin_mode: BeginMode,
    pub slow_query_threshold: Duration,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        let engine_defaults = EngineOptions::default();
        Self {
            db_path: db_path.into(),
            translate_placeholders: engine_defaults.translate_placeholders,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            journal_mode: DEFAULT_JOURNAL_MODE.to_string(),
            begin_mode: BeginMode::default(),
            slow_query_threshold: engine_defaults.slow_query_threshold,
        }
    }

    #[must_use]
    pub fn with_translation(mut self, translate_placeholders: bool) -> Self {
        self.translate_placeholders = translate_placeholders;
        self
    }

    /// Split into the generic connect parameters and engine options.
    #[must_use]
    pub fn into_parts(self) -> (ConnectParams, EngineOptions) {
        let params = ConnectParams::new(self.db_path)
            .host("localhost")
            .port(0)
            .option(
                "busy_timeout_ms",
                self.busy_timeout.as_millis().to_string(),
            )
            .option("journal_mode", self.journal_mode)
            .option("begin_mode", self.begin_mode.as_str());
        let options = EngineOptions::default()
            .with_translation(self.translate_placeholders)
            .with_slow_query_threshold(self.slow_query_threshold);
        (params, options)
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn translation(mut self, translate_placeholders: bool) -> Self {
        self.opts.translate_placeholders = translate_placeholders;
        self
    }

    #[must_use]
    pub fn busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.opts.busy_timeout = busy_timeout;
        self
    }

    #[must_use]
    pub fn journal_mode(mut self, journal_mode: impl Into<String>) -> Self {
        self.opts.journal_mode = journal_mode.into();
        self
    }

    #[must_use]
    pub fn begin_mode(mut self, begin_mode: BeginMode) -> Self {
        self.opts.begin_mode = begin_mode;
        self
    }

    #[must_use]
    pub fn slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.opts.slow_query_threshold = threshold;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// Build the engine. Nothing is opened until a worker first runs a statement.
    #[must_use]
    pub fn build(self) -> Engine<SqliteDriver> {
        let (params, options) = self.finish().into_parts();
        create_engine(SqliteDriver, params, options)
    }
}

/// Engine for the database file at `db_path` with default options.
#[must_use]
pub fn sqlite_engine(db_path: impl Into<String>) -> Engine<SqliteDriver> {
    SqliteOptionsBuilder::new(db_path).build()
}

/// Settings each new connection is opened with, read from [`ConnectParams::options`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConnectionSettings {
    pub(crate) busy_timeout: Duration,
    pub(crate) journal_mode: String,
    pub(crate) begin_mode: BeginMode,
    pub(crate) autocommit: bool,
}

impl ConnectionSettings {
    pub(crate) fn from_params(params: &ConnectParams) -> Result<Self, SqlScopeError> {
        if let Some(charset) = params.option_str("charset")
            && !matches!(
                charset.to_ascii_lowercase().as_str(),
                "utf8" | "utf-8" | "utf8mb4"
            )
        {
            return Err(SqlScopeError::ConfigError(format!(
                "SQLite only stores UTF-8 text, charset '{charset}' is not supported"
            )));
        }

        let busy_timeout = params
            .option_u64("busy_timeout_ms")?
            .map_or(DEFAULT_BUSY_TIMEOUT, Duration::from_millis);

        let journal_mode = params
            .option_str("journal_mode")
            .unwrap_or(DEFAULT_JOURNAL_MODE)
            .to_ascii_uppercase();
        if !JOURNAL_MODES.contains(&journal_mode.as_str()) {
            return Err(SqlScopeError::ConfigError(format!(
                "unknown journal_mode '{journal_mode}'"
            )));
        }

        let begin_mode = params
            .option_str("begin_mode")
            .map_or(Ok(BeginMode::default()), BeginMode::parse)?;

        Ok(Self {
            busy_timeout,
            journal_mode,
            begin_mode,
            autocommit: params.option_bool("autocommit")?.unwrap_or(false),
        })
    }
}
