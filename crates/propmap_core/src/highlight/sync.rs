//! Keeps map overlays in lockstep with fresh records.
//!
//! # Responsibility
//! - Hold the key -> overlay handle back-references.
//! - Add or remove overlays after mutations, at startup and on expiry sweeps.
//!
//! # Invariants
//! - An overlay exists for key `k` iff `k` is in the store and the record is
//!   younger than the retention window.
//! - At most one overlay per key; a replaced overlay is removed first.
//! - Sweeps only remove overlays and never touch records.

use super::surface::{MapSurface, OverlayHandle, OverlayStyle};
use crate::model::record::{PropertyRecord, RecordKey};
use crate::repo::record_store::RecordStore;
use crate::storage::KvStorage;
use log::{debug, info};
use std::collections::HashMap;

pub struct HighlightSync<M: MapSurface> {
    surface: M,
    style: OverlayStyle,
    retention_window_ms: i64,
    overlays: HashMap<RecordKey, OverlayHandle>,
}

impl<M: MapSurface> HighlightSync<M> {
    pub fn new(surface: M, style: OverlayStyle, retention_window_ms: i64) -> Self {
        Self {
            surface,
            style,
            retention_window_ms,
            overlays: HashMap::new(),
        }
    }

    /// Re-establishes the overlay invariant for one key after a mutation.
    pub fn reconcile_after_mutation<S: KvStorage>(
        &mut self,
        store: &RecordStore<S>,
        key: &RecordKey,
        now: i64,
    ) {
        self.remove(key);
        if let Some(record) = store.get(key) {
            if record.is_fresh(now, self.retention_window_ms) {
                self.add(record);
            }
        }
    }

    /// Drops overlays whose record aged past the window or disappeared.
    ///
    /// Returns how many overlays were removed.
    pub fn sweep_expired<S: KvStorage>(&mut self, store: &RecordStore<S>, now: i64) -> usize {
        let expired: Vec<RecordKey> = self
            .overlays
            .keys()
            .filter(|key| {
                store
                    .get(key)
                    .map_or(true, |record| !record.is_fresh(now, self.retention_window_ms))
            })
            .cloned()
            .collect();

        for key in &expired {
            self.remove(key);
        }
        if !expired.is_empty() {
            info!(
                "event=highlight_sweep module=highlight status=ok removed={} remaining={}",
                expired.len(),
                self.overlays.len()
            );
        }
        expired.len()
    }

    /// Replaces every overlay with one per fresh record in `store`.
    ///
    /// Returns how many overlays exist afterwards.
    pub fn rebuild_from_store<S: KvStorage>(&mut self, store: &RecordStore<S>, now: i64) -> usize {
        self.clear();
        let mut stale = 0_usize;
        for record in store.all() {
            if record.is_fresh(now, self.retention_window_ms) {
                self.add(record);
            } else {
                stale += 1;
            }
        }
        info!(
            "event=highlight_rebuild module=highlight status=ok visible={} stale={}",
            self.overlays.len(),
            stale
        );
        self.overlays.len()
    }

    /// Removes every overlay this sync created.
    pub fn clear(&mut self) {
        for (_, handle) in self.overlays.drain() {
            self.surface.remove_overlay(handle);
        }
    }

    pub fn has_overlay(&self, key: &RecordKey) -> bool {
        self.overlays.contains_key(key)
    }

    pub fn overlay_handle(&self, key: &RecordKey) -> Option<OverlayHandle> {
        self.overlays.get(key).copied()
    }

    pub fn overlay_keys(&self) -> Vec<RecordKey> {
        self.overlays.keys().cloned().collect()
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    pub fn surface(&self) -> &M {
        &self.surface
    }

    fn add(&mut self, record: &PropertyRecord) {
        let handle = self.surface.add_overlay(record.position, &self.style);
        if let Some(previous) = self.overlays.insert(record.key.clone(), handle) {
            self.surface.remove_overlay(previous);
        }
    }

    fn remove(&mut self, key: &RecordKey) {
        if let Some(handle) = self.overlays.remove(key) {
            self.surface.remove_overlay(handle);
            debug!("event=highlight_remove module=highlight status=ok");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::HighlightSync;
    use crate::highlight::surface::{InMemoryMap, OverlayStyle};
    use crate::key::normalizer::key_from_position;
    use crate::model::record::{Position, RecordKey, RETENTION_WINDOW_MS};
    use crate::repo::record_store::{FreshnessPolicy, RecordStore};
    use crate::storage::MemoryStorage;

    fn store() -> RecordStore<MemoryStorage> {
        RecordStore::load(MemoryStorage::new(), "records", FreshnessPolicy::default())
    }

    fn sync() -> HighlightSync<InMemoryMap> {
        HighlightSync::new(
            InMemoryMap::new(),
            OverlayStyle::default(),
            RETENTION_WINDOW_MS,
        )
    }

    fn save(store: &mut RecordStore<MemoryStorage>, lat: f64, at: i64) -> RecordKey {
        let position = Position::new(lat, 139.0);
        let key = key_from_position(position, 5).unwrap();
        store
            .create_or_update(key.clone(), position, "addr", "memo", at)
            .unwrap();
        key
    }

    #[test]
    fn repeated_reconcile_never_leaks_overlays() {
        let mut store = store();
        let mut sync = sync();
        let key = save(&mut store, 35.0, 0);

        sync.reconcile_after_mutation(&store, &key, 0);
        sync.reconcile_after_mutation(&store, &key, 1);
        sync.reconcile_after_mutation(&store, &key, 2);

        assert_eq!(sync.overlay_count(), 1);
        assert_eq!(sync.surface().live_count(), 1);
        let handle = sync.overlay_handle(&key).unwrap();
        assert!(sync.surface().is_live(handle));
    }

    #[test]
    fn reconcile_skips_stale_record_and_removes_deleted() {
        let mut store = store();
        let mut sync = sync();
        let key = save(&mut store, 35.0, 0);

        sync.reconcile_after_mutation(&store, &key, RETENTION_WINDOW_MS);
        assert!(!sync.has_overlay(&key));

        sync.reconcile_after_mutation(&store, &key, 0);
        assert!(sync.has_overlay(&key));

        store.delete(&key).unwrap();
        sync.reconcile_after_mutation(&store, &key, 0);
        assert!(!sync.has_overlay(&key));
        assert_eq!(sync.surface().live_count(), 0);
    }

    #[test]
    fn sweep_removes_only_expired_and_is_idempotent() {
        let mut store = store();
        let old = save(&mut store, 35.0, 0);
        let young = save(&mut store, 36.0, 10 * 24 * 60 * 60 * 1000);
        let mut sync = sync();
        sync.rebuild_from_store(&store, 1);

        let now = RETENTION_WINDOW_MS + 1;
        assert_eq!(sync.sweep_expired(&store, now), 1);
        assert!(!sync.has_overlay(&old));
        assert!(sync.has_overlay(&young));
        assert!(store.get(&old).is_some());

        assert_eq!(sync.sweep_expired(&store, now), 0);
        assert_eq!(sync.overlay_keys(), vec![young]);
    }

    #[test]
    fn rebuild_replaces_previous_overlays() {
        let mut store = store();
        save(&mut store, 35.0, 0);
        save(&mut store, 36.0, 0);
        let mut sync = sync();

        assert_eq!(sync.rebuild_from_store(&store, 0), 2);
        assert_eq!(sync.rebuild_from_store(&store, 0), 2);
        assert_eq!(sync.surface().live_count(), 2);
        assert_eq!(sync.rebuild_from_store(&store, RETENTION_WINDOW_MS), 0);
        assert_eq!(sync.surface().live_count(), 0);
    }
}
