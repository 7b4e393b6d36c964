// Settings stores: where each user's DamSettings blob lives
//
// The palette itself never waits on a store. Reads fall back to defaults and
// writes are fire-and-forget (see `persist_in_background`).

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use lashpop_palette_engine::UsageRecord;

use crate::paths;
use crate::settings::DamSettings;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// File I/O error
    Io(String),
    /// Settings could not be encoded or decoded
    Serialize(String),
    /// SQLite error
    Database(String),
    /// User id is blank or unusable as a key
    InvalidUserId(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(msg) => write!(f, "I/O error: {}", msg),
            StoreError::Serialize(msg) => write!(f, "Serialization error: {}", msg),
            StoreError::Database(msg) => write!(f, "Database error: {}", msg),
            StoreError::InvalidUserId(id) => write!(f, "Invalid user id: {:?}", id),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialize(e.to_string())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

// ============================================================================
// Trait
// ============================================================================

/// Key-value store of settings documents keyed by user id.
pub trait SettingsStore: Send + Sync {
    /// The stored JSON document. `Ok(None)` when the user has no stored
    /// settings yet.
    fn load_document(&self, user_id: &str) -> Result<Option<Value>, StoreError>;

    fn save(&self, user_id: &str, settings: &DamSettings) -> Result<(), StoreError>;

    fn delete(&self, user_id: &str) -> Result<(), StoreError>;

    /// Stored settings; a malformed `commandPalette` section reads as absent.
    fn load(&self, user_id: &str) -> Result<Option<DamSettings>, StoreError> {
        Ok(self.load_document(user_id)?.map(DamSettings::from_value))
    }

    /// Stored settings for read-modify-write: a malformed `commandPalette`
    /// section is an error, so it is never overwritten with defaults.
    fn load_strict(&self, user_id: &str) -> Result<Option<DamSettings>, StoreError> {
        self.load_document(user_id)?
            .map(DamSettings::try_from_value)
            .transpose()
            .map_err(StoreError::from)
    }
}

fn check_user_id(user_id: &str) -> Result<&str, StoreError> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidUserId(user_id.to_string()));
    }
    Ok(trimmed)
}

// ============================================================================
// JSON files
// ============================================================================

/// One `<user>.json` file per user under a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store under the user config directory.
    pub fn open_default() -> Self {
        Self::new(paths::users_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for `user_id`. Bytes outside `[A-Za-z0-9.-]` are written as
    /// `_XX` (uppercase hex), so distinct ids never share a file.
    pub fn path_for(&self, user_id: &str) -> Result<PathBuf, StoreError> {
        let user_id = check_user_id(user_id)?;
        let mut name = String::with_capacity(user_id.len());
        for b in user_id.bytes() {
            if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.') {
                name.push(char::from(b));
            } else {
                name.push_str(&format!("_{b:02X}"));
            }
        }
        if name.chars().all(|c| c == '.') {
            return Err(StoreError::InvalidUserId(user_id.to_string()));
        }
        Ok(self.dir.join(format!("{name}.json")))
    }
}

impl SettingsStore for JsonFileStore {
    fn load_document(&self, user_id: &str) -> Result<Option<Value>, StoreError> {
        let path = self.path_for(user_id)?;
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn save(&self, user_id: &str, settings: &DamSettings) -> Result<(), StoreError> {
        let path = self.path_for(user_id)?;
        fs::create_dir_all(&self.dir)?;

        // Write-then-rename; readers never see a partial file
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, settings.to_json()?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn delete(&self, user_id: &str) -> Result<(), StoreError> {
        let path = self.path_for(user_id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// SQLite
// ============================================================================

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS dam_user_settings (
    user_id TEXT PRIMARY KEY,
    settings TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// `dam_user_settings` table, one row per user.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".to_string()))?;
        f(&conn)
    }
}

impl fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SettingsStore for SqliteStore {
    fn load_document(&self, user_id: &str) -> Result<Option<Value>, StoreError> {
        let user_id = check_user_id(user_id)?;
        let blob: Option<String> = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT settings FROM dam_user_settings WHERE user_id = ?1",
                    params![user_id],
                    |row| row.get(0),
                )
                .optional()?)
        })?;
        match blob {
            Some(blob) => Ok(Some(serde_json::from_str(&blob)?)),
            None => Ok(None),
        }
    }

    fn save(&self, user_id: &str, settings: &DamSettings) -> Result<(), StoreError> {
        let user_id = check_user_id(user_id)?;
        let blob = serde_json::to_string(settings)?;
        let now = Utc::now().to_rfc3339();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO dam_user_settings (user_id, settings, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET
                    settings = excluded.settings,
                    updated_at = excluded.updated_at",
                params![user_id, blob, now],
            )?;
            Ok(())
        })
    }

    fn delete(&self, user_id: &str) -> Result<(), StoreError> {
        let user_id = check_user_id(user_id)?;
        self.with_conn(|conn| {
            conn.execute("DELETE FROM dam_user_settings WHERE user_id = ?1", params![user_id])?;
            Ok(())
        })
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Process-local store, for tests and embedding. Keeps documents as JSON
/// values, like the persistent stores.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Value>>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Io("memory store lock poisoned".to_string()))
    }
}

impl SettingsStore for MemoryStore {
    fn load_document(&self, user_id: &str) -> Result<Option<Value>, StoreError> {
        let user_id = check_user_id(user_id)?;
        Ok(self.lock()?.get(user_id).cloned())
    }

    fn save(&self, user_id: &str, settings: &DamSettings) -> Result<(), StoreError> {
        let user_id = check_user_id(user_id)?;
        let document = serde_json::to_value(settings)?;
        self.lock()?.insert(user_id.to_string(), document);
        Ok(())
    }

    fn delete(&self, user_id: &str) -> Result<(), StoreError> {
        let user_id = check_user_id(user_id)?;
        self.lock()?.remove(user_id);
        Ok(())
    }
}

// ============================================================================
// Best-effort helpers
// ============================================================================

/// Stored settings, or empty settings if none exist or the store fails.
pub fn load_settings_or_default(store: &dyn SettingsStore, user_id: &str) -> DamSettings {
    match store.load(user_id) {
        Ok(Some(settings)) => settings,
        Ok(None) => DamSettings::default(),
        Err(e) => {
            log::warn!("failed to load settings for {user_id:?}: {e}");
            DamSettings::default()
        }
    }
}

/// The user's usage record; any failure degrades to an empty record.
pub fn load_usage_or_default(store: &dyn SettingsStore, user_id: &str) -> UsageRecord {
    load_settings_or_default(store, user_id).usage()
}

/// Write `settings` on a background thread. Errors are logged and dropped;
/// there is no retry. The handle is only for callers that want to wait.
pub fn persist_in_background(
    store: Arc<dyn SettingsStore>,
    user_id: String,
    settings: DamSettings,
) -> JoinHandle<()> {
    thread::spawn(move || {
        if let Err(e) = store.save(&user_id, &settings) {
            log::warn!("failed to persist settings for {user_id:?}: {e}");
        } else {
            log::debug!("persisted settings for {user_id:?}");
        }
    })
}
