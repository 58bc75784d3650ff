//! On-disk side of the settings store: lenient document loading and the
//! atomic write primitive.
//!
//! Layout next to the target file:
//! ```text
//! storage/config/
//! ├── settings.json       (live document)
//! └── settings.json.tmp   (exists only while a write is in flight)
//! ```

use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use tracing::warn;

use super::{SettingValue, Settings};
use crate::error::AppError;

/// Result of reading the backing file.
#[derive(Debug)]
pub(crate) enum Loaded {
    /// No file at the path yet.
    Missing,
    /// File present; unparsable or empty content has already been reduced to an empty map.
    Found(Settings),
}

/// Create every missing parent directory of `path`.
pub(crate) fn ensure_parent_dirs(path: &Path) -> Result<(), AppError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| AppError::settings(parent, e))
        }
        _ => Ok(()),
    }
}

/// Read and parse the settings document at `path`.
pub(crate) fn load(path: &Path) -> Result<Loaded, AppError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Loaded::Missing),
        Err(e) if e.kind() == io::ErrorKind::InvalidData => {
            warn!(path = %path.display(), "settings file is not valid UTF-8; treating as empty");
            return Ok(Loaded::Found(Settings::new()));
        }
        Err(e) => return Err(AppError::settings(path, e)),
    };
    Ok(Loaded::Found(parse_document(path, &content)))
}

/// Parse a document leniently. Never fails: garbage yields an empty map and
/// individual entries of unsupported type are dropped.
pub(crate) fn parse_document(path: &Path, content: &str) -> Settings {
    if content.trim().is_empty() {
        return Settings::new();
    }

    let object = match serde_json::from_str::<serde_json::Value>(content) {
        Ok(serde_json::Value::Object(object)) => object,
        Ok(other) => {
            warn!(
                path = %path.display(),
                found = json_type_name(&other),
                "settings file is not a JSON object; treating as empty"
            );
            return Settings::new();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "settings file is corrupt; treating as empty");
            return Settings::new();
        }
    };

    let mut settings = Settings::new();
    for (key, value) in object {
        let kind = json_type_name(&value);
        match SettingValue::from_json(value) {
            Some(v) => {
                settings.insert(key, v);
            }
            None => warn!(path = %path.display(), key = %key, found = kind, "skipping unsupported setting value"),
        }
    }
    settings
}

/// Temporary sibling used by [`write_atomic`].
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Render the document exactly as it is stored: two-space pretty JSON, keys
/// in `BTreeMap` order, trailing newline.
pub(crate) fn render(settings: &Settings) -> Result<String, AppError> {
    let mut out = serde_json::to_string_pretty(settings)?;
    out.push('\n');
    Ok(out)
}

/// Write `settings` to a sibling temp file, fsync it, then rename it over
/// `path`. Observers see either the old or the new document, never a prefix.
pub(crate) fn write_atomic(path: &Path, settings: &Settings) -> Result<(), AppError> {
    let data = render(settings)?;
    let tmp = temp_path(path);

    let written = write_and_sync(&tmp, data.as_bytes()).and_then(|()| fs::rename(&tmp, path));
    if let Err(e) = written {
        // Best effort: a stale temp file is harmless but untidy.
        let _ = fs::remove_file(&tmp);
        return Err(AppError::settings(path, e));
    }

    sync_parent_dir(path);
    Ok(())
}

fn write_and_sync(tmp: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(tmp)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Flush the directory entry so the rename itself survives a crash.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) {}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────
