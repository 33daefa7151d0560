//! Alert Store Implementation

use alerting::{decode_log, encode_log, AlertRecord};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::key::LogKey;
use crate::StoreError;

/// File extension of per-key logs
pub const LOG_EXTENSION: &str = "json";

/// File-backed store of append-only alert logs.
///
/// Every read-modify-write of a log runs under that key's mutex, so two
/// appends to the same key never lose an update while appends to
/// different keys proceed independently. Writes replace the log through a
/// temp file and a rename, so a crash mid-write leaves the previous
/// version in place.
pub struct AlertStore {
    /// Directory holding one sub-directory per team
    root: PathBuf,
    /// Per-key write locks
    locks: Mutex<HashMap<LogKey, Arc<Mutex<()>>>>,
}

impl AlertStore {
    /// Create a store rooted at `root`; nothing is created on disk until
    /// the first append
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        info!("Creating alert store at {}", root.display());
        Self {
            root,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Storage root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve the log file of a key, rejecting unsafe names
    pub fn log_path(&self, team: &str, severity: &str) -> Result<PathBuf, StoreError> {
        Ok(LogKey::new(team, severity)?.file(&self.root))
    }

    /// Append one record to the (team, severity) log.
    ///
    /// Returns the length of the log after the append. A log that exists
    /// but does not parse is reported as [`StoreError::CorruptLog`] and left
    /// exactly as found.
    pub fn append(
        &self,
        team: &str,
        severity: &str,
        record: AlertRecord,
    ) -> Result<usize, StoreError> {
        let key = LogKey::new(team, severity)?;
        let lock = self.key_lock(&key)?;
        // The guarded data is the file itself; a panicked holder leaves
        // either the old or the new file behind, both valid.
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let dir = key.dir(&self.root);
        fs::create_dir_all(&dir)?;

        let path = key.file(&self.root);
        let mut records = read_log(&path)?;
        records.push(record);

        let bytes = encode_log(&records)
            .map_err(|e| StoreError::IoFailure(format!("encode {key}: {e}")))?;
        write_atomic(&dir, &path, &bytes)?;

        debug!("Appended to {} ({} records)", key, records.len());
        Ok(records.len())
    }

    /// Read the full (team, severity) log; a missing log is empty.
    ///
    /// Reads never register a key. Without a lock the read still sees
    /// either the previous or the new version, since writes go through
    /// a rename.
    pub fn load(&self, team: &str, severity: &str) -> Result<Vec<AlertRecord>, StoreError> {
        let key = LogKey::new(team, severity)?;
        let lock = self.existing_lock(&key)?;
        let _guard = lock
            .as_ref()
            .map(|l| l.lock().unwrap_or_else(PoisonError::into_inner));

        read_log(&key.file(&self.root))
    }

    /// Number of keys appended to since startup
    pub fn tracked_keys(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }

    fn key_lock(&self, key: &LogKey) -> Result<Arc<Mutex<()>>, StoreError> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|e| StoreError::IoFailure(format!("Lock error: {}", e)))?;

        Ok(Arc::clone(locks.entry(key.clone()).or_default()))
    }

    fn existing_lock(&self, key: &LogKey) -> Result<Option<Arc<Mutex<()>>>, StoreError> {
        let locks = self
            .locks
            .lock()
            .map_err(|e| StoreError::IoFailure(format!("Lock error: {}", e)))?;

        Ok(locks.get(key).cloned())
    }
}

fn read_log(path: &Path) -> Result<Vec<AlertRecord>, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    decode_log(&bytes).map_err(|e| {
        warn!("Refusing to rewrite corrupt log {}: {}", path.display(), e);
        StoreError::CorruptLog {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    })
}

fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = dir.join(format!(".{}.{}.tmp", name, Uuid::new_v4()));

    let result = (|| -> io::Result<()> {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }

    // Persist the rename itself
    sync_dir(dir)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<(), StoreError> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<(), StoreError> {
    Ok(())
}
