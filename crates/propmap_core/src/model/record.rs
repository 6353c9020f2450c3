//! Property record domain model.
//!
//! # Responsibility
//! - Define the canonical record stored per map location.
//! - Define the persisted wire shape of one record.
//!
//! # Invariants
//! - `key` is derived by the key normalizer and unique per store.
//! - `memo` is never empty; empty memos are rejected before reaching the store.
//! - `created_at` is epoch milliseconds.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Fixed highlight retention window: 30 days in milliseconds.
pub const RETENTION_WINDOW_MS: i64 = 30 * 24 * 60 * 60 * 1000;

/// Geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
}

impl Position {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns whether both axes are finite and inside WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lng)
    }
}

/// Canonical record identity.
///
/// Only produced by `KeyNormalizer` or read back from persisted documents.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(String);

impl RecordKey {
    pub(crate) fn new(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for RecordKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A location the user picked on the map or through address search.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedLocation {
    pub position: Position,
    /// Formatted address, or a synthesized coordinate label when geocoding
    /// found nothing.
    pub address: String,
}

impl SelectedLocation {
    pub fn new(position: Position, address: impl Into<String>) -> Self {
        Self {
            position,
            address: address.into(),
        }
    }
}

/// One annotated location.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRecord {
    pub key: RecordKey,
    pub position: Position,
    /// Human-readable label.
    pub address: String,
    /// User note. Never empty.
    pub memo: String,
    /// Unix epoch milliseconds at save time.
    pub created_at: i64,
}

impl PropertyRecord {
    /// Age in milliseconds relative to `now`. Negative when the clock moved
    /// backwards after the record was saved.
    pub fn age_ms(&self, now: i64) -> i64 {
        now.saturating_sub(self.created_at)
    }

    /// Returns whether this record is still inside `window_ms`.
    pub fn is_fresh(&self, now: i64, window_ms: i64) -> bool {
        is_fresh(self.created_at, now, window_ms)
    }

    pub(crate) fn to_persisted(&self) -> PersistedRecord {
        PersistedRecord {
            lat: self.position.lat,
            lng: self.position.lng,
            address: self.address.clone(),
            memo: self.memo.clone(),
            timestamp: self.created_at,
        }
    }

    pub(crate) fn from_persisted(key: RecordKey, value: PersistedRecord) -> Self {
        Self {
            key,
            position: Position::new(value.lat, value.lng),
            address: value.address,
            memo: value.memo,
            created_at: value.timestamp,
        }
    }
}

/// Freshness rule shared by the store and highlight sync.
pub fn is_fresh(created_at: i64, now: i64, window_ms: i64) -> bool {
    now.saturating_sub(created_at) < window_ms
}

/// Wire shape of one record inside the persisted document.
///
/// The record key is the surrounding object key and is not repeated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct PersistedRecord {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
    pub memo: String,
    /// Serialized as `timestamp` to stay readable by earlier web builds.
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::{is_fresh, Position, RETENTION_WINDOW_MS};

    #[test]
    fn retention_window_is_thirty_days() {
        assert_eq!(RETENTION_WINDOW_MS, 2_592_000_000);
    }

    #[test]
    fn freshness_boundary_is_exclusive() {
        assert!(is_fresh(0, RETENTION_WINDOW_MS - 1, RETENTION_WINDOW_MS));
        assert!(!is_fresh(0, RETENTION_WINDOW_MS, RETENTION_WINDOW_MS));
        assert!(is_fresh(1_000, 0, RETENTION_WINDOW_MS));
    }

    #[test]
    fn position_validation_rejects_out_of_range_and_nan() {
        assert!(Position::new(35.5437, 139.4467).is_valid());
        assert!(!Position::new(91.0, 0.0).is_valid());
        assert!(!Position::new(0.0, -180.5).is_valid());
        assert!(!Position::new(f64::NAN, 0.0).is_valid());
    }
}
