//! Tracing setup for the bot process.
//!
//! `RUST_LOG` wins when it is set and parses; otherwise the configured
//! `BOT_LOG_LEVEL` applies. Output goes to stderr so stdout stays free for
//! admin replies.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Install the global subscriber. Fails if one is already installed.
pub fn init(level: &str) -> Result<(), AppError> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = select_filter(directives.as_deref(), level)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))
}

/// Pick the filter from `RUST_LOG` directives, falling back to `level`.
///
/// Blank or malformed directives fall through to `level`.
fn select_filter(directives: Option<&str>, level: &str) -> Result<EnvFilter, AppError> {
    directives
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .map_or_else(
            || {
                parse_level(level)?;
                EnvFilter::try_new(level)
                    .map_err(|e| AppError::Logger(format!("invalid log level '{level}': {e}")))
            },
            Ok,
        )
}

/// Validate a plain level name (`error` through `trace`, or `off`).
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    if level.is_empty() {
        return Err(AppError::Logger("log level must not be empty".into()));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Logger(format!("unrecognised log level: '{level}'")))
}
