use propmap_core::{
    EngineConfig, EngineError, FreshnessPolicy, InMemoryMap, KeyError, KeyNormalizer,
    KeyStrategy, KvStorage, ManualClock, MemoryStorage, Position, PropertyMap, RecordStore,
    SelectedLocation, SqliteKvStorage, StoreError,
};
use proptest::prelude::*;

const SLOT: &str = "machida_property_records";

fn seeded_store<S: KvStorage>(storage: S) -> RecordStore<S> {
    let mut store = RecordStore::load(storage, SLOT, FreshnessPolicy::default());
    let normalizer = KeyNormalizer::new(KeyStrategy::default());
    let samples = [
        (35.5437, 139.4467, "東京都町田市原町田６丁目", "候補A", 1_700_000_000_000_i64),
        (-33.868_820_1, 151.209_295_7, "Sydney NSW", "corner lot", 1_600_000_000_123),
        (0.1 + 0.2, -0.000_001, "緯度: 0.300000, 経度: -0.000001", "memo \"quoted\"", 0),
    ];
    for (lat, lng, address, memo, at) in samples {
        let location = SelectedLocation::new(Position::new(lat, lng), address);
        let key = normalizer.key_for(&location).unwrap();
        store
            .create_or_update(key, location.position, address, memo, at)
            .unwrap();
    }
    store
}

#[test]
fn reload_restores_identical_mapping() {
    let store = seeded_store(MemoryStorage::new());
    let before: Vec<_> = store.all().into_iter().cloned().collect();

    let reloaded = RecordStore::load(
        store.storage().clone(),
        SLOT,
        FreshnessPolicy::default(),
    );
    let after: Vec<_> = reloaded.all().into_iter().cloned().collect();

    assert_eq!(after.len(), 3);
    assert_eq!(before, after);
}

#[test]
fn sqlite_file_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("propmap.sqlite3");

    let before: Vec<_> = {
        let store = seeded_store(SqliteKvStorage::open(&path).unwrap());
        store.all().into_iter().cloned().collect()
    };

    let reopened = RecordStore::load(
        SqliteKvStorage::open(&path).unwrap(),
        SLOT,
        FreshnessPolicy::default(),
    );
    let after: Vec<_> = reopened.all().into_iter().cloned().collect();
    assert_eq!(before, after);
}

#[test]
fn missing_or_malformed_payload_starts_empty() {
    assert!(RecordStore::load(MemoryStorage::new(), SLOT, FreshnessPolicy::default()).is_empty());

    for payload in ["", "null", "[1,2]", "{\"k\":{\"lat\":\"x\"}}", "{\"k\":"] {
        let mut storage = MemoryStorage::new();
        storage.insert_raw(SLOT, payload);
        let store = RecordStore::load(storage, SLOT, FreshnessPolicy::default());
        assert!(store.is_empty(), "payload {payload:?} should load empty");
    }
}

#[test]
fn legacy_web_document_loads() {
    let mut storage = MemoryStorage::new();
    storage.insert_raw(
        SLOT,
        r#"{"東京都町田市中町1丁目":{"lat":35.546,"lng":139.438,"address":"東京都町田市 中町1丁目","memo":"空き家","timestamp":1700000000000}}"#,
    );

    let map = PropertyMap::open(
        EngineConfig {
            key_strategy: KeyStrategy::Address,
            ..EngineConfig::default()
        },
        storage,
        InMemoryMap::new(),
        ManualClock::new(1_700_000_000_000 + 1_000),
    );

    let location = SelectedLocation::new(Position::new(35.546, 139.438), "東京都町田市 中町1丁目");
    let record = map.lookup(&location).unwrap().unwrap();
    assert_eq!(record.memo, "空き家");
    assert!(map.is_highlighted(&record.key));
}

#[test]
fn storage_failure_is_reported_without_rollback() {
    let clock = ManualClock::new(1_000);
    let mut map = PropertyMap::open(
        EngineConfig::default(),
        MemoryStorage::with_quota(16),
        InMemoryMap::new(),
        clock,
    );
    let location = SelectedLocation::new(Position::new(35.5437, 139.4467), "addr");

    let err = map.save(&location, "候補A").unwrap_err();
    assert!(matches!(err, EngineError::Store(StoreError::Persistence(_))));

    let key = map.key_for(&location).unwrap();
    assert_eq!(map.get(&key).unwrap().memo, "候補A");
    assert!(map.is_highlighted(&key));
    assert!(map.store().storage().get(SLOT).unwrap().is_none());

    map.store_mut().storage_mut().set_quota(None);
    assert!(map.delete_key(&key).unwrap());
    assert!(!map.is_highlighted(&key));
    assert_eq!(
        map.store().storage().get(SLOT).unwrap().as_deref(),
        Some(&b"{}"[..])
    );
}

#[test]
fn address_mode_invalid_position_never_reaches_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("propmap.sqlite3");
    let config = EngineConfig {
        key_strategy: KeyStrategy::Address,
        ..EngineConfig::default()
    };
    let location = SelectedLocation::new(Position::new(35.546, 139.438), "東京都町田市中町1丁目");

    {
        let mut map = PropertyMap::open(
            config.clone(),
            SqliteKvStorage::open(&path).unwrap(),
            InMemoryMap::new(),
            ManualClock::new(1_000),
        );
        map.save(&location, "空き家").unwrap();

        for position in [
            Position::new(f64::NAN, 139.438),
            Position::new(35.546, f64::NEG_INFINITY),
            Position::new(-90.5, 139.438),
        ] {
            let bad = SelectedLocation::new(position, location.address.clone());
            let err = map.save(&bad, "上書き").unwrap_err();
            assert!(matches!(err, EngineError::Key(KeyError::InvalidPosition)));
        }
    }

    let reopened = PropertyMap::open(
        config,
        SqliteKvStorage::open(&path).unwrap(),
        InMemoryMap::new(),
        ManualClock::new(2_000),
    );
    assert_eq!(reopened.records().len(), 1);
    let record = reopened.lookup(&location).unwrap().unwrap();
    assert_eq!(record.memo, "空き家");
    assert_eq!(record.position, Position::new(35.546, 139.438));
}

// =============================================================================
// Randomized round-trip over the whole valid input domain
// =============================================================================

#[derive(Debug, Clone)]
struct Sample {
    position: Position,
    address: String,
    memo: String,
    created_at: i64,
}

fn arb_position() -> impl Strategy<Value = Position> {
    let lat = prop_oneof![Just(-90.0), Just(90.0), Just(0.0), -90.0..=90.0_f64];
    let lng = prop_oneof![Just(-180.0), Just(180.0), Just(f64::MIN_POSITIVE), -180.0..=180.0_f64];
    (lat, lng).prop_map(|(lat, lng)| Position::new(lat, lng))
}

fn arb_sample() -> impl Strategy<Value = Sample> {
    (
        arb_position(),
        "\\PC{1,24}",
        "\\PC{1,40}",
        prop_oneof![Just(i64::MIN), Just(i64::MAX), Just(0_i64), any::<i64>()],
    )
        .prop_map(|(position, address, memo, created_at)| Sample {
            position,
            address,
            memo,
            created_at,
        })
}

fn arb_strategy() -> impl Strategy<Value = KeyStrategy> {
    prop_oneof![
        Just(KeyStrategy::Address),
        (0_u32..=9).prop_map(|precision| KeyStrategy::Coordinate { precision }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn reload_restores_any_valid_mapping(
        strategy in arb_strategy(),
        samples in prop::collection::vec(arb_sample(), 0..16),
    ) {
        let mut store = RecordStore::load(MemoryStorage::new(), SLOT, FreshnessPolicy::default());
        let normalizer = KeyNormalizer::new(strategy);
        for sample in &samples {
            let location = SelectedLocation::new(sample.position, sample.address.clone());
            // Addresses made only of whitespace have no key.
            let Ok(key) = normalizer.key_for(&location) else {
                continue;
            };
            store
                .create_or_update(
                    key,
                    sample.position,
                    sample.address.clone(),
                    sample.memo.clone(),
                    sample.created_at,
                )
                .unwrap();
        }

        let before: Vec<_> = store.all().into_iter().cloned().collect();
        let reloaded = RecordStore::load(store.storage().clone(), SLOT, FreshnessPolicy::default());
        let after: Vec<_> = reloaded.all().into_iter().cloned().collect();

        prop_assert_eq!(&before, &after);
        for (a, b) in before.iter().zip(after.iter()) {
            prop_assert_eq!(a.position.lat.to_bits(), b.position.lat.to_bits());
            prop_assert_eq!(a.position.lng.to_bits(), b.position.lng.to_bits());
        }
    }
}
