use std::{path::Path, sync::LazyLock};

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

pub const CLI_PREFIX: &str = "cli";

/// Variable checked before `RUST_LOG` when no level is passed explicitly.
pub const LOG_ENV: &str = "FOCUSLOG_LOG";

#[derive(Debug, Clone)]
pub struct LoggingOptions<'a> {
    pub prefix: &'a str,
    pub level: Option<LevelFilter>,
    pub show_std: bool,
}

fn filter_directive(level: Option<LevelFilter>) -> String {
    let level = level.map(|v| v.to_string()).unwrap_or_else(|| {
        std::env::var(LOG_ENV)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| "info".into())
    });
    format!("{}={level}", env!("CARGO_PKG_NAME").replace('-', "_"))
}

/// Installs the global subscriber. Logs always go into daily rotated files inside of
/// `application_data_path/logs`, and into stdout only when `show_std` is set.
pub fn enable_logging(application_data_path: &Path, options: LoggingOptions<'_>) -> Result<()> {
    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(5)
        .filename_prefix(options.prefix)
        .build(application_data_path.join("logs"))?;

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(appender);
    let stdout_layer = options
        .show_std
        .then(|| fmt::layer().pretty().with_writer(std::io::stdout));

    tracing_subscriber::registry()
        .with(EnvFilter::new(filter_directive(options.level)))
        .with(file_layer)
        .with(stdout_layer)
        .try_init()?;
    Ok(())
}

pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .pretty()
        .init()
});
