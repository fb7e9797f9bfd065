//! Whole-document record persistence.
//!
//! Every operation, reads included, runs a full lock/load/mutate/save
//! cycle: acquire an exclusive cross-process file lock on a sentinel path
//! next to the document, load the entire collection, apply the change,
//! write the updated collection to a temp file in the same directory and
//! atomically rename it over the original. There is no in-memory cache;
//! every call observes the latest durable state.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Utc;
use fs2::FileExt;
use tempfile::NamedTempFile;
use tracing::{error, info};

use crate::error::StoreError;
use crate::record::{CustomerPatch, CustomerRecord, OverrideNodes, RecordCollection};
use crate::token::mask_token;

/// Durable, lock-protected collection of customer records.
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    lock_path: PathBuf,
    lock_timeout: Option<Duration>,
}

/// Held for the duration of one store operation; unlocks on drop.
struct StoreGuard {
    file: File,
}

impl Drop for StoreGuard {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

impl RecordStore {
    /// Open a store at `path`, creating an empty collection document (and
    /// parent directories) on first use.
    ///
    /// The lock sentinel lives next to the document with a `.lock`
    /// extension.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let lock_path = path.with_extension("lock");
        let store = Self {
            path,
            lock_path,
            lock_timeout: None,
        };

        if let Some(parent) = store.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let _guard = store.acquire()?;
        if !store.path.exists() {
            store.save(&RecordCollection::default())?;
        }
        Ok(store)
    }

    /// Bound lock acquisition instead of waiting indefinitely.
    ///
    /// When the timeout elapses, operations fail with [`StoreError::Busy`].
    /// The default (no timeout) reproduces the unbounded wait of the
    /// whole-document lock design.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    /// Path of the collection document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn acquire(&self) -> Result<StoreGuard, StoreError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.lock_path)?;

        match self.lock_timeout {
            None => file.lock_exclusive()?,
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                loop {
                    match file.try_lock_exclusive() {
                        Ok(()) => break,
                        Err(e) if e.kind() != std::io::ErrorKind::WouldBlock => {
                            return Err(StoreError::Io(e));
                        }
                        Err(_) if Instant::now() < deadline => {
                            std::thread::sleep(Duration::from_millis(25));
                        }
                        Err(_) => return Err(StoreError::Busy),
                    }
                }
            }
        }
        Ok(StoreGuard { file })
    }

    /// Load the whole collection. Corruption degrades to an empty
    /// collection so the service stays available for subsequent writes.
    fn load(&self) -> RecordCollection {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return RecordCollection::default(),
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "failed to read record collection");
                return RecordCollection::default();
            }
        };
        if data.trim().is_empty() {
            return RecordCollection::default();
        }
        match serde_yaml::from_str(&data) {
            Ok(collection) => collection,
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "record collection is corrupt, treating as empty");
                RecordCollection::default()
            }
        }
    }

    /// Write the collection to a temp file in the same directory, then
    /// atomically rename it over the document.
    fn save(&self, collection: &RecordCollection) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        let yaml = serde_yaml::to_string(collection)?;
        tmp.write_all(yaml.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    /// Append a new record. Fails with [`StoreError::Conflict`] if the
    /// token already exists; the stored collection is left unchanged.
    pub fn create(&self, record: CustomerRecord) -> Result<CustomerRecord, StoreError> {
        let _guard = self.acquire()?;
        let mut collection = self.load();
        if collection.customers.iter().any(|c| c.token == record.token) {
            return Err(StoreError::Conflict);
        }
        collection.customers.push(record.clone());
        self.save(&collection)?;
        info!(name = %record.name, token = %mask_token(&record.token), "created customer");
        Ok(record)
    }

    /// Look up a record by token.
    pub fn get_by_token(&self, token: &str) -> Result<Option<CustomerRecord>, StoreError> {
        let _guard = self.acquire()?;
        Ok(self.load().customers.into_iter().find(|c| c.token == token))
    }

    /// All records in storage order.
    pub fn list_all(&self) -> Result<Vec<CustomerRecord>, StoreError> {
        let _guard = self.acquire()?;
        Ok(self.load().customers)
    }

    /// Merge the supplied patch fields into the record under `token`.
    ///
    /// Either every supplied field lands or (on [`StoreError::NotFound`])
    /// nothing is written.
    pub fn update(&self, token: &str, patch: &CustomerPatch) -> Result<CustomerRecord, StoreError> {
        let record = self.mutate(token, |record| patch.apply(record))?;
        info!(name = %record.name, token = %mask_token(token), "updated customer");
        Ok(record)
    }

    /// Swap the record's token from `old` to `new`.
    ///
    /// The conflict check on `new` runs before `old` is located, so a
    /// failed rotation leaves the record under `old` untouched.
    pub fn rotate_token(&self, old: &str, new: &str) -> Result<CustomerRecord, StoreError> {
        let _guard = self.acquire()?;
        let mut collection = self.load();

        if collection.customers.iter().any(|c| c.token == new) {
            return Err(StoreError::Conflict);
        }
        let record = collection
            .customers
            .iter_mut()
            .find(|c| c.token == old)
            .ok_or(StoreError::NotFound)?;

        record.token = new.to_string();
        bump_updated_at(record);
        let record = record.clone();
        self.save(&collection)?;
        info!(
            name = %record.name,
            old = %mask_token(old),
            new = %mask_token(new),
            "rotated customer token"
        );
        Ok(record)
    }

    /// Replace the record's override wholesale.
    pub fn set_override(
        &self,
        token: &str,
        override_nodes: OverrideNodes,
    ) -> Result<CustomerRecord, StoreError> {
        let record = self.mutate(token, |record| {
            record.override_nodes = Some(override_nodes);
        })?;
        info!(name = %record.name, token = %mask_token(token), "set override");
        Ok(record)
    }

    /// Remove the record's override, if any.
    pub fn clear_override(&self, token: &str) -> Result<CustomerRecord, StoreError> {
        let record = self.mutate(token, |record| {
            record.override_nodes = None;
        })?;
        info!(name = %record.name, token = %mask_token(token), "cleared override");
        Ok(record)
    }

    /// Remove the record under `token`. Returns whether a record was found;
    /// deleting an absent token is a no-op.
    pub fn delete(&self, token: &str) -> Result<bool, StoreError> {
        let _guard = self.acquire()?;
        let mut collection = self.load();
        let before = collection.customers.len();
        collection.customers.retain(|c| c.token != token);
        if collection.customers.len() == before {
            return Ok(false);
        }
        self.save(&collection)?;
        info!(token = %mask_token(token), "deleted customer");
        Ok(true)
    }

    /// Locked load-mutate-save cycle over the record under `token`.
    fn mutate<F>(&self, token: &str, f: F) -> Result<CustomerRecord, StoreError>
    where
        F: FnOnce(&mut CustomerRecord),
    {
        let _guard = self.acquire()?;
        let mut collection = self.load();
        let record = collection
            .customers
            .iter_mut()
            .find(|c| c.token == token)
            .ok_or(StoreError::NotFound)?;
        f(record);
        bump_updated_at(record);
        let record = record.clone();
        self.save(&collection)?;
        Ok(record)
    }
}

/// Bump `updated_at`, keeping it monotonically non-decreasing even if the
/// wall clock stepped backwards.
fn bump_updated_at(record: &mut CustomerRecord) {
    record.updated_at = Utc::now().max(record.updated_at);
}
