// ── Persistent state store ──
//
// Keyed by logical name. Reads are lock-free through `DashMap`; every
// mutation goes through a `WriteClaim` and rewrites the state file
// atomically (temp file in the same directory, then rename), so a crash
// mid-run leaves either the old or the new state on disk.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::record::ResourceRecord;
use crate::error::CoreError;
use crate::model::LifecycleStatus;

const STATE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    version: u32,
    records: Vec<ResourceRecord>,
}

/// Physical-id and response cache, persisted between runs.
pub struct StateStore {
    path: Option<PathBuf>,
    records: DashMap<String, ResourceRecord>,
    claims: DashSet<String>,
    next_sequence: AtomicU64,
    persist_lock: Mutex<()>,
}

impl StateStore {
    /// A store that lives only as long as the process. Used by tests and
    /// by `plan` when no state file exists yet.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            records: DashMap::new(),
            claims: DashSet::new(),
            next_sequence: AtomicU64::new(1),
            persist_lock: Mutex::new(()),
        }
    }

    /// Load the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let path = path.into();
        let mut store = Self::in_memory();

        match std::fs::read_to_string(&path) {
            Ok(raw) => {
                let file: StateFile =
                    serde_json::from_str(&raw).map_err(|e| CoreError::Store {
                        path: path.clone(),
                        message: format!("unreadable state file: {e}"),
                    })?;
                if file.version != STATE_VERSION {
                    return Err(CoreError::Store {
                        path,
                        message: format!(
                            "unsupported state version {} (expected {STATE_VERSION})",
                            file.version
                        ),
                    });
                }
                let max_sequence = file.records.iter().map(|r| r.sequence).max().unwrap_or(0);
                for record in file.records {
                    store.records.insert(record.logical_name.clone(), record);
                }
                store.next_sequence = AtomicU64::new(max_sequence + 1);
                debug!(path = %path.display(), records = store.records.len(), "state loaded");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no state file yet");
            }
            Err(e) => {
                return Err(CoreError::Store {
                    path,
                    message: e.to_string(),
                });
            }
        }

        store.path = Some(path);
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn get(&self, name: &str) -> Option<ResourceRecord> {
        self.records.get(name).map(|r| r.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn status_of(&self, name: &str) -> Option<LifecycleStatus> {
        self.records.get(name).and_then(|r| r.status)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, oldest first.
    pub fn records_in_creation_order(&self) -> Vec<ResourceRecord> {
        let mut all: Vec<ResourceRecord> = self.records.iter().map(|r| r.value().clone()).collect();
        all.sort_by_key(|r| r.sequence);
        all
    }

    /// All records, newest first: the exact reverse of creation.
    pub fn teardown_order(&self) -> Vec<ResourceRecord> {
        let mut all = self.records_in_creation_order();
        all.reverse();
        all
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Become the only writer for `name` until the claim is dropped.
    pub fn claim(&self, name: &str) -> Result<WriteClaim<'_>, CoreError> {
        if !self.claims.insert(name.to_owned()) {
            return Err(CoreError::conflict(
                name,
                "another writer already holds this resource",
            ));
        }
        trace!(resource = name, "write claim acquired");
        Ok(WriteClaim {
            store: self,
            name: name.to_owned(),
        })
    }

    pub(crate) fn next_sequence(&self) -> u64 {
        self.next_sequence.fetch_add(1, Ordering::SeqCst)
    }

    /// Drop the record for `name` without calling any remote action.
    pub fn forget(&self, name: &str) -> Result<Option<ResourceRecord>, CoreError> {
        self.claim(name)?.remove()
    }

    fn persist(&self) -> Result<(), CoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let _guard = self
            .persist_lock
            .lock()
            .map_err(|_| CoreError::Internal("state persist lock poisoned".into()))?;

        let file = StateFile {
            version: STATE_VERSION,
            records: self.records_in_creation_order(),
        };
        let store_err = |message: String| CoreError::Store {
            path: path.clone(),
            message,
        };
        let json = serde_json::to_vec_pretty(&file).map_err(|e| store_err(e.to_string()))?;

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| store_err(e.to_string()))?;

        let mut tmp =
            tempfile::NamedTempFile::new_in(&dir).map_err(|e| store_err(e.to_string()))?;
        tmp.write_all(&json).map_err(|e| store_err(e.to_string()))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| store_err(e.to_string()))?;
        tmp.persist(path).map_err(|e| store_err(e.error.to_string()))?;

        trace!(path = %path.display(), records = file.records.len(), "state persisted");
        Ok(())
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

// ── WriteClaim ──────────────────────────────────────────────────────

/// Exclusive write access to one logical name. Released on drop.
pub struct WriteClaim<'a> {
    store: &'a StateStore,
    name: String,
}

impl WriteClaim<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn current(&self) -> Option<ResourceRecord> {
        self.store.get(&self.name)
    }

    /// Insert or replace the record and persist.
    pub fn put(&self, record: ResourceRecord) -> Result<(), CoreError> {
        if record.logical_name != self.name {
            return Err(CoreError::Internal(format!(
                "claim for '{}' cannot write record '{}'",
                self.name, record.logical_name
            )));
        }
        self.store.records.insert(self.name.clone(), record);
        self.store.persist()
    }

    /// Remove the record and persist.
    pub fn remove(&self) -> Result<Option<ResourceRecord>, CoreError> {
        let removed = self.store.records.remove(&self.name).map(|(_, r)| r);
        if removed.is_some() {
            self.store.persist()?;
        }
        Ok(removed)
    }

    /// Move a status-tracked resource to `status`.
    pub fn set_status(&self, status: LifecycleStatus) -> Result<(), CoreError> {
        {
            let Some(mut record) = self.store.records.get_mut(&self.name) else {
                return Err(CoreError::conflict(
                    &self.name,
                    format!("cannot move to {status}: no creation has been recorded"),
                ));
            };
            record.status = Some(status);
            record.touch();
        }
        self.store.persist()
    }
}

impl Drop for WriteClaim<'_> {
    fn drop(&mut self) {
        self.store.claims.remove(&self.name);
    }
}
