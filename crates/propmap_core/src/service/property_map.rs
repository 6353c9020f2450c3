//! Property map use-case service.
//!
//! # Responsibility
//! - Own the record store, highlight sync, key normalizer and clock as one
//!   process-level context object.
//! - Validate user input before it reaches the store.
//! - Re-establish the overlay invariant after every mutation.
//!
//! # Invariants
//! - Empty memos and unkeyable locations never reach `RecordStore`.
//! - Overlays are reconciled even when persisting fails, because in-memory
//!   state is what the running process shows.

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::geocode::query::{AddressQuery, QueryError};
use crate::geocode::resolver::{resolve_click, resolve_search, Geocoder};
use crate::highlight::surface::MapSurface;
use crate::highlight::sync::HighlightSync;
use crate::key::normalizer::{KeyError, KeyNormalizer};
use crate::model::record::{
    Position, PropertyRecord, RecordKey, SelectedLocation, RETENTION_WINDOW_MS,
};
use crate::repo::record_store::{RecordStore, StoreError};
use crate::storage::KvStorage;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for property map use-cases.
#[derive(Debug)]
pub enum EngineError {
    /// Memo is empty after trimming.
    EmptyMemo,
    /// Location cannot be turned into a key.
    Key(KeyError),
    /// Address search form is incomplete.
    Query(QueryError),
    /// Persistence failure. The in-memory change and overlays are kept.
    Store(StoreError),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMemo => write!(f, "memo cannot be empty"),
            Self::Key(err) => write!(f, "{err}"),
            Self::Query(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::EmptyMemo => None,
            Self::Key(err) => Some(err),
            Self::Query(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<KeyError> for EngineError {
    fn from(value: KeyError) -> Self {
        Self::Key(value)
    }
}

impl From<QueryError> for EngineError {
    fn from(value: QueryError) -> Self {
        Self::Query(value)
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Process-level context tying records to their map highlights.
pub struct PropertyMap<S: KvStorage, M: MapSurface, C: Clock> {
    config: EngineConfig,
    normalizer: KeyNormalizer,
    store: RecordStore<S>,
    highlights: HighlightSync<M>,
    clock: C,
}

impl<S: KvStorage, M: MapSurface, C: Clock> PropertyMap<S, M, C> {
    /// Loads persisted records and draws highlights for the fresh ones.
    pub fn open(config: EngineConfig, storage: S, surface: M, clock: C) -> Self {
        let store = RecordStore::load(
            storage,
            config.storage_key.as_str(),
            config.freshness_policy,
        );
        let mut highlights = HighlightSync::new(
            surface,
            config.overlay_style.clone(),
            RETENTION_WINDOW_MS,
        );
        let visible = highlights.rebuild_from_store(&store, clock.now_ms());
        info!(
            "event=engine_open module=service status=ok records={} visible={}",
            store.len(),
            visible
        );

        Self {
            normalizer: KeyNormalizer::new(config.key_strategy),
            config,
            store,
            highlights,
            clock,
        }
    }

    /// Derives the record key for `location`.
    pub fn key_for(&self, location: &SelectedLocation) -> Result<RecordKey, EngineError> {
        Ok(self.normalizer.key_for(location)?)
    }

    /// Returns the record already saved for `location`, if any.
    pub fn lookup(
        &self,
        location: &SelectedLocation,
    ) -> Result<Option<&PropertyRecord>, EngineError> {
        let key = self.key_for(location)?;
        Ok(self.store.get(&key))
    }

    /// Saves `memo` for `location`, replacing any record under the same key.
    ///
    /// # Errors
    /// - `EmptyMemo` / `Key` before anything changes.
    /// - `Store` after the record was applied and highlighted in memory.
    pub fn save(
        &mut self,
        location: &SelectedLocation,
        memo: &str,
    ) -> Result<PropertyRecord, EngineError> {
        let memo = memo.trim();
        if memo.is_empty() {
            return Err(EngineError::EmptyMemo);
        }
        let key = self.key_for(location)?;
        let now = self.clock.now_ms();

        let result = self.store.create_or_update(
            key.clone(),
            location.position,
            location.address.as_str(),
            memo,
            now,
        );
        self.highlights
            .reconcile_after_mutation(&self.store, &key, now);

        match result {
            Ok(record) => {
                info!("event=record_save module=service status=ok records={}", self.store.len());
                Ok(record)
            }
            Err(err) => {
                warn!("event=record_save module=service status=not_persisted error={err}");
                Err(err.into())
            }
        }
    }

    /// Deletes the record for `location`. See `delete_key`.
    pub fn delete(&mut self, location: &SelectedLocation) -> Result<bool, EngineError> {
        let key = self.key_for(location)?;
        self.delete_key(&key)
    }

    /// Deletes the record at `key` and its overlay.
    ///
    /// Returns whether a record existed.
    pub fn delete_key(&mut self, key: &RecordKey) -> Result<bool, EngineError> {
        let result = self.store.delete(key);
        self.highlights
            .reconcile_after_mutation(&self.store, key, self.clock.now_ms());

        match result {
            Ok(existed) => {
                info!(
                    "event=record_delete module=service status=ok existed={} records={}",
                    existed,
                    self.store.len()
                );
                Ok(existed)
            }
            Err(err) => {
                warn!("event=record_delete module=service status=not_persisted error={err}");
                Err(err.into())
            }
        }
    }

    /// Resolves a clicked point through `geocoder`.
    pub fn select_point(&self, geocoder: &impl Geocoder, position: Position) -> SelectedLocation {
        resolve_click(geocoder, position)
    }

    /// Resolves a structured address search through `geocoder`.
    ///
    /// Returns `Ok(None)` when the provider finds nothing.
    pub fn search(
        &self,
        geocoder: &impl Geocoder,
        query: &AddressQuery,
    ) -> Result<Option<SelectedLocation>, EngineError> {
        let address = query.compose(self.config.address_prefix.as_str())?;
        Ok(resolve_search(geocoder, address.as_str()))
    }

    /// Hides highlights of records that aged past the retention window.
    ///
    /// Returns how many overlays were removed.
    pub fn sweep(&mut self) -> usize {
        let now = self.clock.now_ms();
        self.highlights.sweep_expired(&self.store, now)
    }

    pub fn get(&self, key: &RecordKey) -> Option<&PropertyRecord> {
        self.store.get(key)
    }

    pub fn records(&self) -> Vec<&PropertyRecord> {
        self.store.all()
    }

    pub fn is_highlighted(&self, key: &RecordKey) -> bool {
        self.highlights.has_overlay(key)
    }

    pub fn highlighted_keys(&self) -> Vec<RecordKey> {
        self.highlights.overlay_keys()
    }

    pub fn highlight_count(&self) -> usize {
        self.highlights.overlay_count()
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &RecordStore<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut RecordStore<S> {
        &mut self.store
    }

    pub fn surface(&self) -> &M {
        self.highlights.surface()
    }
}
