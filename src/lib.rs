//! Points bot: settings store and the thin shell around it.

pub mod admin;
pub mod config;
pub mod error;
pub mod logger;
pub mod settings;

pub use error::AppError;
pub use settings::{SettingValue, Settings, SettingsStore};
