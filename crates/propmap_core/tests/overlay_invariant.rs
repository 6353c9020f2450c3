use propmap_core::{
    EngineConfig, FreshnessPolicy, HighlightSync, InMemoryMap, ManualClock, MemoryStorage,
    OverlayStyle, Position, PropertyMap, RecordKey, RecordStore, SelectedLocation, DAY_MS,
    RETENTION_WINDOW_MS,
};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn location(slot: u64) -> SelectedLocation {
    SelectedLocation::new(
        Position::new(35.5 + slot as f64 * 0.001, 139.4),
        format!("slot {slot}"),
    )
}

fn fresh_keys(map: &PropertyMap<MemoryStorage, InMemoryMap, ManualClock>) -> BTreeSet<RecordKey> {
    let now = map.now_ms();
    map.records()
        .into_iter()
        .filter(|record| record.is_fresh(now, RETENTION_WINDOW_MS))
        .map(|record| record.key.clone())
        .collect()
}

fn overlay_keys(map: &PropertyMap<MemoryStorage, InMemoryMap, ManualClock>) -> BTreeSet<RecordKey> {
    map.highlighted_keys().into_iter().collect()
}

#[derive(Debug, Clone)]
enum Op {
    Save(u64),
    Delete(u64),
    /// Advance the clock by this many days, then sweep.
    Tick(i64),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => (0_u64..12).prop_map(Op::Save),
        1 => (0_u64..12).prop_map(Op::Delete),
        1 => (0_i64..8).prop_map(Op::Tick),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn random_mutations_keep_overlays_equal_to_fresh_records(
        ops in prop::collection::vec(arb_op(), 1..200),
    ) {
        let clock = ManualClock::new(0);
        let mut map = PropertyMap::open(
            EngineConfig::default(),
            MemoryStorage::new(),
            InMemoryMap::new(),
            clock.clone(),
        );

        for op in &ops {
            match *op {
                Op::Save(slot) => {
                    map.save(&location(slot), "memo").unwrap();
                }
                Op::Delete(slot) => {
                    map.delete(&location(slot)).unwrap();
                }
                Op::Tick(days) => {
                    clock.advance(days * DAY_MS);
                    map.sweep();
                    prop_assert_eq!(overlay_keys(&map), fresh_keys(&map));
                }
            }
            prop_assert_eq!(map.surface().live_count(), map.highlight_count());
        }

        map.sweep();
        prop_assert_eq!(overlay_keys(&map), fresh_keys(&map));
    }
}

#[test]
fn delete_removes_record_and_overlay_in_every_state() {
    let clock = ManualClock::new(0);
    let mut map = PropertyMap::open(
        EngineConfig::default(),
        MemoryStorage::new(),
        InMemoryMap::new(),
        clock.clone(),
    );

    let fresh = map.save(&location(1), "fresh").unwrap().key;
    let stale = map.save(&location(2), "stale").unwrap().key;
    clock.advance(31 * DAY_MS);
    map.sweep();
    let refreshed = map.save(&location(1), "fresh again").unwrap().key;
    assert_eq!(refreshed, fresh);

    assert!(map.delete(&location(1)).unwrap());
    assert!(map.delete(&location(2)).unwrap());
    assert!(!map.delete(&location(3)).unwrap());

    for key in [&fresh, &stale] {
        assert!(map.get(key).is_none());
        assert!(!map.is_highlighted(key));
    }
    assert_eq!(map.surface().live_count(), 0);
}

fn sync_for_test() -> HighlightSync<InMemoryMap> {
    HighlightSync::new(
        InMemoryMap::new(),
        OverlayStyle::default(),
        RETENTION_WINDOW_MS,
    )
}

#[test]
fn rebuild_matches_per_record_reconcile_in_any_order() {
    let mut store = RecordStore::load(MemoryStorage::new(), "records", FreshnessPolicy::default());
    let mut keys = Vec::new();
    for slot in 0..10_u64 {
        let location = location(slot);
        let key = propmap_core::KeyNormalizer::new(Default::default())
            .key_for(&location)
            .unwrap();
        store
            .create_or_update(
                key.clone(),
                location.position,
                location.address,
                "memo",
                slot as i64 * 5 * DAY_MS,
            )
            .unwrap();
        keys.push(key);
    }
    let now = 40 * DAY_MS;

    let mut rebuilt = sync_for_test();
    rebuilt.rebuild_from_store(&store, now);
    let expected: BTreeSet<RecordKey> = rebuilt.overlay_keys().into_iter().collect();

    let mut forward = sync_for_test();
    for key in &keys {
        forward.reconcile_after_mutation(&store, key, now);
    }
    let mut backward = sync_for_test();
    for key in keys.iter().rev() {
        backward.reconcile_after_mutation(&store, key, now);
    }

    assert_eq!(forward.overlay_keys().into_iter().collect::<BTreeSet<_>>(), expected);
    assert_eq!(backward.overlay_keys().into_iter().collect::<BTreeSet<_>>(), expected);
    // Records saved at day 15 and later are inside the 30 day window at day 40.
    assert_eq!(expected.len(), 7);
}
