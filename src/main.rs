//! Points Bot: process entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Init logger once at the configured level
//!   4. Open the settings store (seeds defaults on first run)
//!   5. Spawn Ctrl-C → shutdown signal watcher
//!   6. Serve admin commands on stdio until exit

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use points_bot::{AppError, SettingsStore, admin, config, logger, settings};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present; the file is optional.
    let _ = dotenvy::dotenv();

    let config = config::load()?;

    logger::init(&config.log_level)?;

    info!(
        settings_file = %config.settings_file.display(),
        log_level = %config.log_level,
        default_lang = %config.default_lang,
        telegram = config.telegram_token.is_some(),
        discord = config.discord_token.is_some(),
        "config loaded"
    );

    let store = Arc::new(SettingsStore::open(
        config.settings_file.clone(),
        settings::default_settings(),
    )?);

    let shutdown = CancellationToken::new();

    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    admin::stdio::run(Arc::clone(&store), shutdown).await?;

    info!(revision = store.revision(), "settings store closed");
    Ok(())
}
