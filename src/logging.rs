//! Logging configuration using the tracing framework
//!
//! Logs can be controlled via the RUST_LOG environment variable.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "binnacle=info,warn";

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Initialize the logging system
///
/// Logs go to stderr so `--json` output on stdout stays parseable.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log level
///   - Default: "binnacle=info,warn"
///   - `RUST_LOG=binnacle::validators=debug` - Debug logs for the validators only
pub fn init() {
    tracing_subscriber::registry()
        .with(env_filter(DEFAULT_FILTER))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true)
                .with_file(false),
        )
        .init();
}

/// Initialize logging with an additional daily-rotated log file
///
/// The file lives in `<data dir>/logs`, or the current directory when the
/// platform data directory cannot be determined.
pub fn init_with_file(log_file_name: &str) -> Result<(), Box<dyn std::error::Error>> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};

    let log_dir =
        if let Some(proj_dirs) = directories::ProjectDirs::from("org", "binnacle", "binnacle") {
            let log_path = proj_dirs.data_dir().join("logs");
            std::fs::create_dir_all(&log_path)?;
            log_path
        } else {
            std::env::current_dir()?
        };

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, log_file_name);

    tracing_subscriber::registry()
        .with(env_filter(DEFAULT_FILTER))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_writer(file_appender).with_ansi(false))
        .try_init()?;

    Ok(())
}

/// Initialize logging for tests
///
/// Only errors are shown unless RUST_LOG says otherwise.
pub fn init_test() {
    tracing_subscriber::registry()
        .with(env_filter("error"))
        .with(fmt::layer().with_test_writer())
        .try_init()
        .ok(); // Already initialized by another test
}
