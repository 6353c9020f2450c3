//! Durable key-value storage collaborators.
//!
//! # Responsibility
//! - Define the byte-store contract the record store persists through.
//! - Provide in-memory and SQLite-backed implementations.
//!
//! # Invariants
//! - `set` is synchronous; success means the bytes are durable for this backend.
//! - A rejected `set` leaves the previously stored bytes untouched.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::SqliteKvStorage;

pub type StorageResult<T> = Result<T, StorageError>;

/// Failures reported by a storage backend.
#[derive(Debug)]
pub enum StorageError {
    /// Write would exceed the backend byte quota.
    QuotaExceeded { required: usize, quota: usize },
    Db(DbError),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuotaExceeded { required, quota } => write!(
                f,
                "storage quota exceeded: {required} bytes required, {quota} allowed"
            ),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::QuotaExceeded { .. } => None,
            Self::Db(err) => Some(err),
        }
    }
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Key-value byte store addressed by string keys.
pub trait KvStorage {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;
    fn set(&mut self, key: &str, value: &[u8]) -> StorageResult<()>;
}

impl<T: KvStorage + ?Sized> KvStorage for Box<T> {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> StorageResult<()> {
        (**self).set(key, value)
    }
}
