//! Core domain logic for the property map.
//! This crate is the single source of truth for record and highlight invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod geocode;
pub mod highlight;
pub mod key;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock, DAY_MS};
pub use config::{load_config, ConfigError, EngineConfig};
pub use geocode::query::{AddressQuery, QueryError};
pub use geocode::resolver::{
    coordinate_label, resolve_click, resolve_search, GeocodeOutcome, Geocoder, StaticGeocoder,
};
pub use highlight::surface::{InMemoryMap, MapSurface, OverlayHandle, OverlayStyle};
pub use highlight::sync::HighlightSync;
pub use key::normalizer::{
    normalize_address, normalize_position, KeyError, KeyNormalizer, KeyStrategy,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::record::{
    is_fresh, Position, PropertyRecord, RecordKey, SelectedLocation, RETENTION_WINDOW_MS,
};
pub use repo::record_store::{FreshnessPolicy, RecordStore, StoreError, StoreResult};
pub use service::property_map::{EngineError, PropertyMap};
pub use service::sweeper::{ExpirySweeper, SharedPropertyMap};
pub use storage::{KvStorage, MemoryStorage, SqliteKvStorage, StorageError, StorageResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
