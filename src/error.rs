//! Application-wide error types.

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    /// Directory creation, read, temp write, fsync or rename of the settings file.
    #[error("settings io error at {}: {source}", .path.display())]
    Settings {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A value the settings file cannot represent, rejected before any change.
    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl AppError {
    pub(crate) fn settings(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Settings { path: path.into(), source }
    }

    /// Underlying I/O error kind, if this error came from the filesystem.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Settings { source, .. } | Self::Io(source) => Some(source.kind()),
            _ => None,
        }
    }
}
