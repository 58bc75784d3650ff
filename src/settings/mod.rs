//! Settings store: cached key/value settings backed by one JSON file.
//!
//! Reads are served from an in-memory snapshot and never touch the disk.
//! Every mutation builds the next snapshot, publishes it, and rewrites the
//! whole file through [`persist::write_atomic`] while holding the store's
//! write lock, so two writers can never interleave their temp-file writes
//! and renames.
//!
//! Defaults supplied at [`SettingsStore::open`] are overlaid beneath whatever
//! the file contains: a key present on disk always wins.
//!
//! Construct one store at startup and share it as `Arc<SettingsStore>`.

mod persist;
pub mod value;

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, RwLock,
    },
};

use tracing::{debug, info};

use crate::error::AppError;
use persist::Loaded;

pub use value::SettingValue;

/// Key → value mapping as held in memory and written to disk.
pub type Settings = BTreeMap<String, SettingValue>;

/// Keys seeded on first run.
pub const DEFAULT_SETTINGS: &[(&str, i64)] = &[("initial_points", 100), ("invite_points", 50)];

/// [`DEFAULT_SETTINGS`] as a [`Settings`] map.
pub fn default_settings() -> Settings {
    DEFAULT_SETTINGS
        .iter()
        .map(|(k, v)| (k.to_string(), SettingValue::Int(*v)))
        .collect()
}

pub struct SettingsStore {
    path: PathBuf,
    defaults: Settings,
    /// Published snapshot. Replaced wholesale, never edited in place.
    cache: RwLock<Arc<Settings>>,
    /// Serialises mutation + persist as one critical section.
    write_lock: Mutex<()>,
    /// Successful persists since open.
    revision: AtomicU64,
}

impl SettingsStore {
    /// Open the store at `path`, creating parent directories as needed.
    ///
    /// A missing file is created immediately with `defaults`. An existing
    /// file is merged over `defaults` and left untouched on disk, even when
    /// its content turns out to be empty or corrupt.
    pub fn open(path: impl Into<PathBuf>, defaults: Settings) -> Result<Self, AppError> {
        let path = path.into();
        for (key, value) in &defaults {
            check_value(key, value)?;
        }
        persist::ensure_parent_dirs(&path)?;

        let store = Self {
            path,
            defaults,
            cache: RwLock::new(Arc::new(Settings::new())),
            write_lock: Mutex::new(()),
            revision: AtomicU64::new(0),
        };
        {
            let _guard = store.lock_writes();
            store.load_locked()?;
        }

        info!(
            path = %store.path.display(),
            keys = store.snapshot().len(),
            revision = store.revision(),
            "settings store opened"
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn defaults(&self) -> &Settings {
        &self.defaults
    }

    /// Number of successful file writes performed by this instance.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    // ── Reads ─────────────────────────────────────────────────────────

    pub fn get(&self, key: &str) -> Option<SettingValue> {
        self.snapshot().get(key).cloned()
    }

    /// Cached value for `key`, or `default` when unset.
    pub fn get_or(&self, key: &str, default: impl Into<SettingValue>) -> SettingValue {
        self.get(key).unwrap_or_else(|| default.into())
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.snapshot().get(key).and_then(SettingValue::as_int)
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.snapshot().get(key).and_then(SettingValue::as_float)
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        self.snapshot()
            .get(key)
            .and_then(|v| v.as_str().map(str::to_string))
    }

    /// Detached copy of every setting; later writes do not affect it.
    pub fn all(&self) -> Settings {
        (*self.snapshot()).clone()
    }

    // ── Writes ────────────────────────────────────────────────────────

    /// Set one key and persist the whole document.
    ///
    /// A value with no JSON encoding (NaN, ±inf) is rejected before the
    /// cache changes. On a persist error the new value stays in memory; the
    /// file keeps its previous content until a later write or [`save`](Self::save)
    /// succeeds.
    pub fn set(&self, key: impl Into<String>, value: impl Into<SettingValue>) -> Result<(), AppError> {
        let key = key.into();
        let value = value.into();
        check_value(&key, &value)?;

        let _guard = self.lock_writes();
        let mut next = (*self.snapshot()).clone();
        debug!(key = %key, value = %value, "settings set");
        next.insert(key, value);
        self.commit(next)
    }

    /// Apply every pair in order (last one wins on repeats) with a single
    /// file write. An empty batch writes nothing; one unrepresentable value
    /// rejects the whole batch.
    pub fn update<I, K, V>(&self, values: I) -> Result<(), AppError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<SettingValue>,
    {
        let values: Vec<(String, SettingValue)> = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        if values.is_empty() {
            return Ok(());
        }
        for (key, value) in &values {
            check_value(key, value)?;
        }

        let _guard = self.lock_writes();
        let mut next = (*self.snapshot()).clone();
        let applied = values.len();
        next.extend(values);
        debug!(applied, "settings batch update");
        self.commit(next)
    }

    /// Delete `key`. Returns `false` without touching the disk when it was
    /// not set.
    pub fn remove(&self, key: &str) -> Result<bool, AppError> {
        let _guard = self.lock_writes();
        let current = self.snapshot();
        if !current.contains_key(key) {
            return Ok(false);
        }

        let mut next = (*current).clone();
        next.remove(key);
        debug!(key = %key, "settings remove");
        self.commit(next)?;
        Ok(true)
    }

    /// Rewrite the file from the current cache. Used to retry after a
    /// failed persist left the disk behind memory.
    pub fn save(&self) -> Result<(), AppError> {
        let _guard = self.lock_writes();
        let current = self.snapshot();
        persist::write_atomic(&self.path, &current)?;
        let revision = self.revision.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(path = %self.path.display(), revision, keys = current.len(), "settings saved");
        Ok(())
    }

    /// Re-read the file and replace the cache with `defaults` overlaid by
    /// its content. Picks up edits made outside this process.
    pub fn reload(&self) -> Result<(), AppError> {
        let _guard = self.lock_writes();
        self.load_locked()?;
        info!(path = %self.path.display(), keys = self.snapshot().len(), "settings reloaded");
        Ok(())
    }

    // ── internals ─────────────────────────────────────────────────────

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> Arc<Settings> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn publish(&self, next: Arc<Settings>) {
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Caller must hold the write lock.
    fn load_locked(&self) -> Result<(), AppError> {
        match persist::load(&self.path)? {
            Loaded::Missing => {
                info!(path = %self.path.display(), "settings file missing; seeding defaults");
                self.commit(self.defaults.clone())
            }
            Loaded::Found(loaded) => {
                let mut merged = self.defaults.clone();
                merged.extend(loaded);
                self.publish(Arc::new(merged));
                Ok(())
            }
        }
    }

    /// Publish `next` then persist it. Caller must hold the write lock.
    fn commit(&self, next: Settings) -> Result<(), AppError> {
        let next = Arc::new(next);
        self.publish(Arc::clone(&next));
        persist::write_atomic(&self.path, &next)?;
        let revision = self.revision.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(path = %self.path.display(), revision, keys = next.len(), "settings persisted");
        Ok(())
    }
}

fn check_value(key: &str, value: &SettingValue) -> Result<(), AppError> {
    if value.is_representable() {
        Ok(())
    } else {
        Err(AppError::InvalidValue {
            key: key.to_string(),
            reason: format!("{value} has no JSON encoding"),
        })
    }
}

impl fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsStore")
            .field("path", &self.path)
            .field("keys", &self.snapshot().len())
            .field("revision", &self.revision())
            .finish()
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────
