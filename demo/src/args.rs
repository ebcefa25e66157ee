use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(author, version, about = "Walk through sql-scope against a SQLite file")]
pub(crate) struct Args {
    /// SQLite database file; the demo drops and recreates its tables.
    #[arg(long, default_value = "sql-scope-demo.db")]
    pub(crate) database: PathBuf,
    #[arg(long, default_value_t = Level::INFO)]
    pub(crate) log_level: Level,
    /// Statements slower than this many milliseconds are logged at warn level.
    #[arg(long, default_value_t = 100)]
    pub(crate) slow_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct DemoConfig {
    pub(crate) database: String,
    pub(crate) log_level: String,
    pub(crate) slow_ms: u64,
}

impl DemoConfig {
    pub(crate) fn from_args(args: &Args) -> Self {
        Self {
            database: args.database.to_string_lossy().into_owned(),
            log_level: args.log_level.to_string(),
            slow_ms: args.slow_ms,
        }
    }

    pub(crate) fn slow_query_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_ms)
    }
}
