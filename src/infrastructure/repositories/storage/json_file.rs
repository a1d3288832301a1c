// src/infrastructure/repositories/storage/json_file.rs
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;
use tracing::{debug, instrument, warn};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::repositories::storage::KeyValueStore;

/// Local storage kept in a single JSON object file.
///
/// Writes go to a temp file in the same directory which is then renamed over
/// the target, so readers see either the old or the new content, never a torn
/// write. A missing or malformed file reads as empty.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

type Slots = BTreeMap<String, String>;

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        debug!("Creating JsonFileStore at {}", path.display());
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_slots(&self) -> DomainResult<Slots> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Slots::new()),
            Err(e) => {
                return Err(DomainError::Storage(format!(
                    "Cannot read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        if text.trim().is_empty() {
            return Ok(Slots::new());
        }

        match serde_json::from_str::<Slots>(&text) {
            Ok(slots) => Ok(slots),
            Err(e) => {
                warn!(
                    "Storage file {} is malformed, reading it as empty: {}",
                    self.path.display(),
                    e
                );
                Ok(Slots::new())
            }
        }
    }

    fn write_slots(&self, slots: &Slots) -> DomainResult<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        let json = serde_json::to_string_pretty(slots)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| {
            DomainError::Storage(format!(
                "Cannot replace {}: {}",
                self.path.display(),
                e.error
            ))
        })?;
        Ok(())
    }

    fn lock(&self) -> DomainResult<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| DomainError::Storage("Storage write lock poisoned".to_string()))
    }
}

impl KeyValueStore for JsonFileStore {
    #[instrument(skip(self), level = "trace")]
    fn get(&self, key: &str) -> DomainResult<Option<String>> {
        Ok(self.read_slots()?.remove(key))
    }

    #[instrument(skip(self, value), level = "debug")]
    fn set(&self, key: &str, value: &str) -> DomainResult<()> {
        let _guard = self.lock()?;
        let mut slots = self.read_slots()?;
        slots.insert(key.to_string(), value.to_string());
        self.write_slots(&slots)
            .map_err(|e| e.context(format!("Failed to store '{}'", key)))
    }

    #[instrument(skip(self), level = "debug")]
    fn remove(&self, key: &str) -> DomainResult<bool> {
        let _guard = self.lock()?;
        let mut slots = self.read_slots()?;
        if slots.remove(key).is_none() {
            return Ok(false);
        }
        self.write_slots(&slots)?;
        Ok(true)
    }
}
