//! Property record store with write-through persistence.
//!
//! # Responsibility
//! - Own the key -> record mapping for the running process.
//! - Serialize the full mapping as one JSON document after every mutation.
//!
//! # Invariants
//! - Exactly one record per key.
//! - In-memory state is the source of truth; a failed write is reported but
//!   never rolled back.
//! - Loading never fails: a missing or malformed document yields an empty store.

use crate::model::record::{PersistedRecord, Position, PropertyRecord, RecordKey};
use crate::storage::{KvStorage, StorageError};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by store mutations.
#[derive(Debug)]
pub enum StoreError {
    /// Backing storage rejected the write. The mutation stays applied in memory.
    Persistence(StorageError),
    /// The mapping could not be encoded.
    Serialize(serde_json::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Persistence(err) => write!(f, "failed to persist records: {err}"),
            Self::Serialize(err) => write!(f, "failed to encode records: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Persistence(err) => Some(err),
            Self::Serialize(err) => Some(err),
        }
    }
}

impl From<StorageError> for StoreError {
    fn from(value: StorageError) -> Self {
        Self::Persistence(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

/// What happens to `created_at` when a key that already has a record is saved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreshnessPolicy {
    /// Every save stamps the current time, so editing restarts the
    /// retention window.
    #[default]
    ResetOnSave,
    /// Editing keeps the first save time; only new keys get a fresh stamp.
    ///
    /// A record whose highlight already expired stays hidden after an edit.
    /// Only deleting and saving it again brings the highlight back.
    PreserveOnEdit,
}

/// Key -> record mapping bound to one storage slot.
pub struct RecordStore<S: KvStorage> {
    storage: S,
    storage_key: String,
    policy: FreshnessPolicy,
    records: BTreeMap<RecordKey, PropertyRecord>,
}

impl<S: KvStorage> RecordStore<S> {
    /// Loads the persisted mapping from `storage` under `storage_key`.
    ///
    /// # Side effects
    /// - Emits a `store_load` event; unreadable data is logged and discarded.
    pub fn load(storage: S, storage_key: impl Into<String>, policy: FreshnessPolicy) -> Self {
        let storage_key = storage_key.into();
        let started_at = Instant::now();
        let records = match storage.get(storage_key.as_str()) {
            Ok(Some(bytes)) => match decode_records(&bytes) {
                Ok(records) => records,
                Err(err) => {
                    warn!(
                        "event=store_load module=repo status=malformed bytes={} error={}",
                        bytes.len(),
                        err
                    );
                    BTreeMap::new()
                }
            },
            Ok(None) => BTreeMap::new(),
            Err(err) => {
                warn!("event=store_load module=repo status=unreadable error={err}");
                BTreeMap::new()
            }
        };

        info!(
            "event=store_load module=repo status=ok records={} duration_ms={}",
            records.len(),
            started_at.elapsed().as_millis()
        );

        Self {
            storage,
            storage_key,
            policy,
            records,
        }
    }

    /// Replaces the record at `key` entirely and persists the mapping.
    ///
    /// `created_at` follows the store's `FreshnessPolicy`.
    ///
    /// # Errors
    /// - `StoreError::Persistence` when the write fails; the new record is
    ///   still present in memory.
    pub fn create_or_update(
        &mut self,
        key: RecordKey,
        position: Position,
        address: impl Into<String>,
        memo: impl Into<String>,
        now: i64,
    ) -> StoreResult<PropertyRecord> {
        let created_at = match (self.policy, self.records.get(&key)) {
            (FreshnessPolicy::PreserveOnEdit, Some(existing)) => existing.created_at,
            _ => now,
        };
        let record = PropertyRecord {
            key: key.clone(),
            position,
            address: address.into(),
            memo: memo.into(),
            created_at,
        };
        let replaced = self.records.insert(key, record.clone()).is_some();
        debug!("event=record_save module=repo status=applied replaced={replaced}");

        self.persist()?;
        Ok(record)
    }

    /// Removes the record at `key`.
    ///
    /// Returns whether a record existed. Absent keys are a no-op and do not
    /// touch storage.
    pub fn delete(&mut self, key: &RecordKey) -> StoreResult<bool> {
        if self.records.remove(key).is_none() {
            return Ok(false);
        }
        debug!("event=record_delete module=repo status=applied");
        self.persist()?;
        Ok(true)
    }

    pub fn get(&self, key: &RecordKey) -> Option<&PropertyRecord> {
        self.records.get(key)
    }

    /// Returns every record. Callers must not rely on the order.
    pub fn all(&self) -> Vec<&PropertyRecord> {
        self.records.values().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Writes the full mapping to storage.
    pub fn persist(&mut self) -> StoreResult<()> {
        let bytes = encode_records(&self.records)?;
        match self.storage.set(self.storage_key.as_str(), &bytes) {
            Ok(()) => {
                debug!(
                    "event=store_persist module=repo status=ok records={} bytes={}",
                    self.records.len(),
                    bytes.len()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=store_persist module=repo status=error records={} bytes={} error={}",
                    self.records.len(),
                    bytes.len(),
                    err
                );
                Err(err.into())
            }
        }
    }
}

fn encode_records(records: &BTreeMap<RecordKey, PropertyRecord>) -> serde_json::Result<Vec<u8>> {
    let document: BTreeMap<&str, PersistedRecord> = records
        .iter()
        .map(|(key, record)| (key.as_str(), record.to_persisted()))
        .collect();
    serde_json::to_vec(&document)
}

fn decode_records(bytes: &[u8]) -> serde_json::Result<BTreeMap<RecordKey, PropertyRecord>> {
    let document: BTreeMap<String, PersistedRecord> = serde_json::from_slice(bytes)?;
    Ok(document
        .into_iter()
        .map(|(key, value)| {
            let key = RecordKey::new(key);
            (key.clone(), PropertyRecord::from_persisted(key, value))
        })
        .collect())
}
