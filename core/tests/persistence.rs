//! Persistence tests.
//!
//! Tests cover: lossless round-trip, schema migration from v1,
//! rejection of corrupt / future / unmigratable records, and the
//! engine's fallback to a fresh safe when the stored record is unusable.

use safebox_core::{
    clock::ManualClock,
    config::SafeConfig,
    engine::SafeEngine,
    error::SafeError,
    event::SafeEvent,
    persistence::{self, CURRENT_VERSION},
    pin::PinDigest,
    reducer::reduce,
    rng::FixedRoll,
    schedule::ManualTimer,
    snapshot::{EmbeddedImage, ExplosionResult, Language, SafeSettings, SafeSnapshot, SafeState},
    store::SafeStore,
};

const KEY: &str = "safe-snapshot";

fn store() -> SafeStore {
    let store = SafeStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

fn rich_closed_snapshot() -> SafeSnapshot {
    let mut s = SafeSnapshot::spawn(Language::Ru);
    s.content.text = "line one\nline two — ünïcødé".into();
    s.content.image = Some(EmbeddedImage::from_bytes("image/jpeg", &[0xFF, 0xD8, 0xFF, 0xE0]));
    s.settings = SafeSettings {
        language: Language::Ru,
        survival_enabled: true,
        survival_chance: Some(25),
        autodestruct_minutes: Some(30),
        pin_attempts_limit: Some(3),
    };
    let close = SafeEvent::Close { pin_hash: PinDigest::compute("1234", "salt"), now: 1_000 };
    let mut s = reduce(&s, &close, &mut FixedRoll(0.5)).snapshot;
    s = reduce(&s, &SafeEvent::WrongPin, &mut FixedRoll(0.5)).snapshot;
    s = reduce(&s, &SafeEvent::Survive, &mut FixedRoll(0.5)).snapshot;
    s
}

#[test]
fn round_trip_is_lossless() {
    let store = store();
    for snapshot in [SafeSnapshot::spawn(Language::En), rich_closed_snapshot()] {
        persistence::save(&store, KEY, &snapshot).unwrap();
        let loaded = persistence::try_load(&store, KEY).unwrap();
        assert_eq!(loaded, Some(snapshot));
    }
}

#[test]
fn empty_store_loads_nothing() {
    let store = store();
    assert_eq!(persistence::try_load(&store, KEY).unwrap(), None);
    assert_eq!(persistence::load(&store, KEY), None);
}

#[test]
fn stored_envelope_carries_current_version() {
    let store = store();
    persistence::save(&store, KEY, &SafeSnapshot::spawn(Language::En)).unwrap();
    let raw: serde_json::Value = serde_json::from_str(&store.get(KEY).unwrap().unwrap()).unwrap();
    assert_eq!(raw["version"], CURRENT_VERSION);
    assert!(raw["data"].is_object());
}

#[test]
fn v1_record_is_migrated() {
    let store = store();
    let v1 = serde_json::json!({
        "version": 1,
        "data": {
            "id": "legacy-safe",
            "content": { "text": "old", "image": null },
            "settings": {
                "language": "es",
                "survival_enabled": false,
                "survival_chance": 20,
                "timer_minutes": 15,
                "pin_attempts_limit": null
            },
            "runtime": {
                "state": "closed",
                "pin_hash": "abc123",
                "attempts_made": 0,
                "closed_at": 100,
                "destruct_at": 900100
            }
        }
    });
    store.put(KEY, &v1.to_string()).unwrap();

    let s = persistence::try_load(&store, KEY).unwrap().expect("migrated snapshot");
    assert_eq!(s.id, "legacy-safe");
    assert_eq!(s.settings.language, Language::Es);
    assert_eq!(s.settings.autodestruct_minutes, Some(15));
    assert_eq!(s.settings.survival_chance, Some(20));
    assert_eq!(s.runtime.state, SafeState::Closed);
    assert_eq!(s.runtime.destruct_at, Some(900_100), "timestamps are not recomputed");
    assert_eq!(s.runtime.explosion_result, None);
}

#[test]
fn unmigratable_and_future_versions_are_rejected() {
    let store = store();
    let data = serde_json::to_value(SafeSnapshot::spawn(Language::En)).unwrap();

    store.put(KEY, &serde_json::json!({ "version": 0, "data": data }).to_string()).unwrap();
    assert!(matches!(
        persistence::try_load(&store, KEY),
        Err(SafeError::MissingMigration { from: 0 })
    ));
    assert_eq!(persistence::load(&store, KEY), None);

    let future = CURRENT_VERSION + 1;
    store.put(KEY, &serde_json::json!({ "version": future, "data": data }).to_string()).unwrap();
    assert!(matches!(
        persistence::try_load(&store, KEY),
        Err(SafeError::UnsupportedVersion { .. })
    ));
    assert_eq!(persistence::load(&store, KEY), None);
}

#[test]
fn garbage_and_inconsistent_records_are_treated_as_absent() {
    let store = store();

    store.put(KEY, "{ not json").unwrap();
    assert_eq!(persistence::load(&store, KEY), None);

    store.put(KEY, r#"{"version": 2, "data": {"id": 5}}"#).unwrap();
    assert_eq!(persistence::load(&store, KEY), None);

    // Closed without a PIN digest breaks the model invariants.
    let mut broken = SafeSnapshot::spawn(Language::En);
    broken.runtime.state = SafeState::Closed;
    store
        .put(KEY, &serde_json::json!({ "version": CURRENT_VERSION, "data": broken }).to_string())
        .unwrap();
    assert_eq!(persistence::load(&store, KEY), None);
}

#[test]
fn engine_spawns_fresh_safe_over_corrupt_record() {
    let store = store();
    store.put(KEY, "garbage").unwrap();

    let (engine, report) = SafeEngine::start(
        SafeConfig { default_language: Language::Es, ..SafeConfig::default_test() },
        store,
        Box::new(FixedRoll(0.5)),
        Box::new(ManualClock::at(0)),
        ManualTimer::new(),
    );

    assert_eq!(engine.snapshot().state(), SafeState::Open);
    assert_eq!(engine.snapshot().settings.language, Language::Es);
    assert_eq!(report.persist_warning, None);

    // The fresh safe replaced the garbage.
    let store = engine.into_store();
    assert!(persistence::try_load(&store, KEY).unwrap().is_some());
}

#[test]
fn write_failure_is_a_warning_not_an_error() {
    // No migration: the kv table does not exist, so every write fails.
    let store = SafeStore::in_memory().unwrap();
    let (mut engine, report) = SafeEngine::start(
        SafeConfig::default_test(),
        store,
        Box::new(FixedRoll(0.5)),
        Box::new(ManualClock::at(0)),
        ManualTimer::new(),
    );
    assert!(report.persist_warning.is_some());

    let report = engine.edit_text("kept in memory");
    assert!(report.persist_warning.is_some());
    assert_eq!(engine.snapshot().content.text, "kept in memory");
}

#[test]
fn survival_feedback_survives_reload() {
    let store = store();
    let snapshot = rich_closed_snapshot();
    assert_eq!(snapshot.runtime.explosion_result, Some(ExplosionResult::Survived));

    persistence::save(&store, KEY, &snapshot).unwrap();
    let loaded = persistence::load(&store, KEY).unwrap();
    assert_eq!(loaded.runtime.explosion_result, Some(ExplosionResult::Survived));
}
