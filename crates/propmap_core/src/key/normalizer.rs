//! Record key derivation.
//!
//! # Responsibility
//! - Turn a selected location into the canonical `RecordKey`.
//! - Keep the key strategy an explicit per-deployment configuration value.
//!
//! # Invariants
//! - Normalization is pure: same input, same key, no I/O.
//! - Address keys contain no whitespace.
//! - Coordinate keys never carry a negative zero.
//!
//! # Strategy trade-off
//! - `Address`: stable while geocoding output is stable, but two spellings of
//!   the same place that differ beyond whitespace get separate records.
//! - `Coordinate`: independent of address formatting, but distinct points
//!   within the rounding radius merge into one record.

use crate::model::record::{Position, RecordKey, SelectedLocation};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Default coordinate precision. Five decimal digits is about 1.1 m at the
/// equator, which is the spatial deduplication radius.
pub const DEFAULT_COORDINATE_PRECISION: u32 = 5;

/// Largest supported coordinate precision.
pub const MAX_COORDINATE_PRECISION: u32 = 9;

const COORDINATE_SEPARATOR: char = ',';

/// Key derivation strategy, chosen once per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum KeyStrategy {
    /// Key is the address label with all whitespace removed.
    Address,
    /// Key is `lat,lng`, each rounded to `precision` decimal digits.
    Coordinate { precision: u32 },
}

impl Default for KeyStrategy {
    fn default() -> Self {
        Self::Coordinate {
            precision: DEFAULT_COORDINATE_PRECISION,
        }
    }
}

/// Reasons an input cannot produce a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// Address is empty after whitespace removal.
    EmptyAddress,
    /// Coordinate is non-finite or outside WGS84 bounds.
    InvalidPosition,
    /// Precision exceeds `MAX_COORDINATE_PRECISION`.
    UnsupportedPrecision(u32),
}

impl Display for KeyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyAddress => write!(f, "address is empty after normalization"),
            Self::InvalidPosition => write!(f, "position is not a valid coordinate"),
            Self::UnsupportedPrecision(value) => write!(
                f,
                "coordinate precision {value} exceeds maximum {MAX_COORDINATE_PRECISION}"
            ),
        }
    }
}

impl Error for KeyError {}

/// Applies one `KeyStrategy` to selected locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyNormalizer {
    strategy: KeyStrategy,
}

impl KeyNormalizer {
    pub fn new(strategy: KeyStrategy) -> Self {
        Self { strategy }
    }

    /// Derives the record key for `location` using the configured strategy.
    ///
    /// The position is checked in both modes because it is persisted with
    /// the record even when the key ignores it.
    ///
    /// # Errors
    /// - `InvalidPosition` for non-finite or out-of-range coordinates.
    /// - `EmptyAddress` in address mode when the label is blank.
    pub fn key_for(&self, location: &SelectedLocation) -> Result<RecordKey, KeyError> {
        if !location.position.is_valid() {
            return Err(KeyError::InvalidPosition);
        }
        match self.strategy {
            KeyStrategy::Address => key_from_address(location.address.as_str()),
            KeyStrategy::Coordinate { precision } => {
                key_from_position(location.position, precision)
            }
        }
    }
}

/// Builds an address-mode key.
pub fn key_from_address(address: &str) -> Result<RecordKey, KeyError> {
    let normalized = normalize_address(address);
    if normalized.is_empty() {
        return Err(KeyError::EmptyAddress);
    }
    Ok(RecordKey::new(normalized))
}

/// Builds a coordinate-mode key.
pub fn key_from_position(position: Position, precision: u32) -> Result<RecordKey, KeyError> {
    if precision > MAX_COORDINATE_PRECISION {
        return Err(KeyError::UnsupportedPrecision(precision));
    }
    if !position.is_valid() {
        return Err(KeyError::InvalidPosition);
    }
    Ok(RecordKey::new(normalize_position(position, precision)))
}

/// Removes every whitespace character, including full-width spaces.
pub fn normalize_address(address: &str) -> String {
    WHITESPACE_RE.replace_all(address, "").into_owned()
}

/// Formats `lat,lng` with `precision` decimal digits per axis.
///
/// Callers must pass a valid position and a precision no larger than
/// `MAX_COORDINATE_PRECISION`.
pub fn normalize_position(position: Position, precision: u32) -> String {
    format!(
        "{}{COORDINATE_SEPARATOR}{}",
        format_fixed(position.lat, precision),
        format_fixed(position.lng, precision)
    )
}

fn format_fixed(value: f64, precision: u32) -> String {
    let scale = 10_i64.pow(precision);
    // |value| <= 180 and scale <= 1e9, so the scaled value fits in i64.
    let units = (value * scale as f64).round() as i64;
    let sign = if units < 0 { "-" } else { "" };
    let magnitude = units.unsigned_abs();
    let scale = scale as u64;
    let whole = magnitude / scale;
    if precision == 0 {
        return format!("{sign}{whole}");
    }
    let fraction = magnitude % scale;
    format!(
        "{sign}{whole}.{fraction:0width$}",
        width = precision as usize
    )
}
