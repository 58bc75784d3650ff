//! Process configuration resolved from the environment.
//!
//! `main` loads `.env` first (if present), then calls [`load`]. Every value
//! has a default so a bare environment still starts the bot.

use std::{
    env,
    path::PathBuf,
};

use crate::{error::AppError, logger};

/// Settings file used when `SETTINGS_FILE` is unset or empty.
pub const DEFAULT_SETTINGS_FILE: &str = "storage/config/settings.json";

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_LANG: &str = "en";

/// Fully-resolved process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backing file of the settings store (already expanded, no `~`).
    pub settings_file: PathBuf,
    pub log_level: String,
    /// From `TELEGRAM_BOT_TOKEN`; `None` when unset or empty.
    pub telegram_token: Option<String>,
    /// From `DISCORD_TOKEN`; `None` when unset or empty.
    pub discord_token: Option<String>,
    /// Language used for replies when the user has no preference.
    pub default_lang: String,
}

/// Raw environment values. `None` means the variable is absent.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub settings_file: Option<String>,
    pub log_level: Option<String>,
    pub telegram_token: Option<String>,
    pub discord_token: Option<String>,
    pub default_lang: Option<String>,
}

impl Overrides {
    pub fn from_env() -> Self {
        Self {
            settings_file: env::var("SETTINGS_FILE").ok(),
            log_level: env::var("BOT_LOG_LEVEL").ok(),
            telegram_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
            discord_token: env::var("DISCORD_TOKEN").ok(),
            default_lang: env::var("DEFAULT_LANG").ok(),
        }
    }
}

/// Resolve configuration from the process environment.
pub fn load() -> Result<Config, AppError> {
    load_from(Overrides::from_env())
}

/// Internal loader. Tests pass values directly instead of mutating env vars.
pub fn load_from(raw: Overrides) -> Result<Config, AppError> {
    let settings_file = non_empty(raw.settings_file)
        .map(|p| expand_home(&p))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));

    let log_level = non_empty(raw.log_level).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
    logger::parse_level(&log_level)
        .map_err(|e| AppError::Config(format!("BOT_LOG_LEVEL: {e}")))?;

    Ok(Config {
        settings_file,
        log_level,
        telegram_token: non_empty(raw.telegram_token),
        discord_token: non_empty(raw.discord_token),
        default_lang: non_empty(raw.default_lang).unwrap_or_else(|| DEFAULT_LANG.to_string()),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_environment_uses_defaults() {
        let cfg = load_from(Overrides::default()).unwrap();
        assert_eq!(cfg.settings_file, PathBuf::from(DEFAULT_SETTINGS_FILE));
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.default_lang, "en");
        assert!(cfg.telegram_token.is_none());
        assert!(cfg.discord_token.is_none());
    }

    #[test]
    fn settings_file_override() {
        let cfg = load_from(Overrides {
            settings_file: Some("/srv/bot/settings.json".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(cfg.settings_file, PathBuf::from("/srv/bot/settings.json"));
    }

    #[test]
    fn empty_settings_file_falls_back_to_default() {
        let cfg = load_from(Overrides {
            settings_file: Some("   ".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(cfg.settings_file, PathBuf::from(DEFAULT_SETTINGS_FILE));
    }

    #[test]
    fn empty_tokens_are_unset() {
        let cfg = load_from(Overrides {
            telegram_token: Some(String::new()),
            discord_token: Some("abc".into()),
            ..Default::default()
        })
        .unwrap();
        assert!(cfg.telegram_token.is_none());
        assert_eq!(cfg.discord_token.as_deref(), Some("abc"));
    }

    #[test]
    fn invalid_log_level_is_config_error() {
        let err = load_from(Overrides {
            log_level: Some("verbose".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("config error"));
    }

    #[test]
    fn tilde_expands_to_home() {
        let home = dirs::home_dir().expect("home dir must exist in test env");
        let expanded = expand_home("~/.points-bot/settings.json");
        assert!(expanded.starts_with(&home));
        assert!(expanded.ends_with("settings.json"));
    }

    #[test]
    fn absolute_path_unchanged() {
        assert_eq!(expand_home("/absolute/path"), PathBuf::from("/absolute/path"));
    }

    #[test]
    fn relative_path_unchanged() {
        assert_eq!(expand_home("relative/path"), PathBuf::from("relative/path"));
    }
}
