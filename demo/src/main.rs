mod args;
mod scenarios;

use std::process::ExitCode;

use clap::Parser;
use sql_scope::sqlite::SqliteOptionsBuilder;

use crate::args::{Args, DemoConfig};

fn main() -> ExitCode {
    let args = Args::parse();
    let config = DemoConfig::from_args(&args);

    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(args.log_level)
        .init();

    let config_json = serde_json::to_string_pretty(&config).unwrap_or_else(|_| "{}".to_string());
    tracing::info!("config: {}", config_json);

    let engine = SqliteOptionsBuilder::new(config.database.clone())
        .slow_query_threshold(config.slow_query_threshold())
        .build();

    match scenarios::run_all(&engine) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("demo failed: {err}");
            ExitCode::FAILURE
        }
    }
}
