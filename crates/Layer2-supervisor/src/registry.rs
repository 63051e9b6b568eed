//! Process Registry - durable name to process-id mapping
//!
//! The registry file is the only way to recover "which pid belongs to
//! which bot" after the supervisor restarts, so every mutation is written
//! through to disk before the call returns. Saves go through the atomic
//! store so a crash mid-write never leaves an unparseable file.

use harbor_foundation::{Error, JsonStore, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// One registry entry: the pid plus the launch-time identity token.
///
/// `started_at` is the OS-reported process start time (seconds since the
/// epoch) captured right after spawn. Liveness checks require the start
/// time to still match, which closes the pid-reuse hole a bare pid has.
/// Entries loaded from a legacy file have no token and fall back to
/// existence-only checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub pid: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
}

impl ProcessRecord {
    pub fn new(pid: u32) -> Self {
        Self {
            pid,
            started_at: None,
        }
    }

    pub fn with_started_at(mut self, started_at: Option<u64>) -> Self {
        self.started_at = started_at;
        self
    }
}

/// On-disk value shape: either a legacy bare pid (the reference format,
/// `{"worker.py": 4242}`) or the full record.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredRecord {
    Bare(u32),
    Full {
        pid: u32,
        #[serde(default)]
        started_at: Option<u64>,
    },
}

impl From<StoredRecord> for ProcessRecord {
    fn from(stored: StoredRecord) -> Self {
        match stored {
            StoredRecord::Bare(pid) => ProcessRecord::new(pid),
            StoredRecord::Full { pid, started_at } => ProcessRecord { pid, started_at },
        }
    }
}

/// Durable mapping from bot name to its presumed-live process.
///
/// All mutations must be serialized by the owner (the supervisor holds
/// this behind one async mutex); each mutation saves synchronously.
#[derive(Debug)]
pub struct ProcessRegistry {
    store: JsonStore,
    file: String,
    entries: BTreeMap<String, ProcessRecord>,
}

impl ProcessRegistry {
    /// Load the registry, recovering from a corrupt file.
    ///
    /// A missing file is an empty registry. An unparseable file is logged
    /// and treated as empty as well - the lost pids only described
    /// processes that reconciliation would have to re-verify anyway.
    pub fn load(store: JsonStore, file: impl Into<String>) -> Self {
        let file = file.into();
        let entries = match store.load_optional::<BTreeMap<String, StoredRecord>>(&file) {
            Ok(Some(stored)) => stored
                .into_iter()
                .map(|(name, record)| (name, record.into()))
                .collect(),
            Ok(None) => BTreeMap::new(),
            Err(e) => {
                warn!("Registry {} unreadable, starting empty: {}", file, e);
                BTreeMap::new()
            }
        };
        debug!("Loaded registry with {} entries", entries.len());
        Self {
            store,
            file,
            entries,
        }
    }

    /// Look up the record for a bot
    pub fn get(&self, name: &str) -> Option<ProcessRecord> {
        self.entries.get(name).copied()
    }

    /// All current entries
    pub fn entries(&self) -> &BTreeMap<String, ProcessRecord> {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a process for a bot and persist immediately
    pub fn set(&mut self, name: impl Into<String>, record: ProcessRecord) -> Result<()> {
        self.entries.insert(name.into(), record);
        self.save()
    }

    /// Drop a bot's record and persist immediately.
    ///
    /// Returns the removed record, if any. Removing an absent entry does
    /// not touch the file.
    pub fn remove(&mut self, name: &str) -> Result<Option<ProcessRecord>> {
        match self.entries.remove(name) {
            Some(record) => {
                self.save()?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Keep only entries matching the predicate, saving once if anything
    /// was dropped. Returns the pruned names in order.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &ProcessRecord) -> bool) -> Result<Vec<String>> {
        let mut pruned = Vec::new();
        self.entries.retain(|name, record| {
            if keep(name, record) {
                true
            } else {
                pruned.push(name.clone());
                false
            }
        });
        if !pruned.is_empty() {
            self.save()?;
        }
        Ok(pruned)
    }

    fn save(&self) -> Result<()> {
        self.store
            .save(&self.file, &self.entries)
            .map_err(|e| Error::Storage(format!("Failed to persist registry: {}", e)))
    }
}
