//! Snapshot persistence: a versioned envelope over the key-value store.
//!
//! Stored layout: `{ "version": N, "data": <SafeSnapshot> }` under one key.
//!
//! RULES:
//!   - Loading never recomputes anything. Timestamps are absolute, so
//!     time spent with the app closed is reflected as-is.
//!   - Older payloads are migrated one version at a time up to
//!     CURRENT_VERSION. A missing step fails the load.
//!   - A failed load means "no snapshot": the caller spawns a fresh safe.

use crate::{
    error::{SafeError, SafeResult},
    snapshot::SafeSnapshot,
    store::SafeStore,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CURRENT_VERSION: u32 = 2;

#[derive(Serialize)]
struct Envelope<'a> {
    version: u32,
    data:    &'a SafeSnapshot,
}

#[derive(Deserialize)]
struct RawEnvelope {
    version: u32,
    data:    Value,
}

type Migration = fn(Value) -> SafeResult<Value>;

/// The step that upgrades a payload from `from` to `from + 1`.
fn migration_from(from: u32) -> Option<Migration> {
    match from {
        1 => Some(v1_to_v2 as Migration),
        _ => None,
    }
}

/// v1 called the timer `timer_minutes` and had no explosion feedback.
fn v1_to_v2(mut data: Value) -> SafeResult<Value> {
    let settings = data
        .get_mut("settings")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| anyhow::anyhow!("v1 payload has no settings object"))?;
    let minutes = settings.remove("timer_minutes").unwrap_or(Value::Null);
    settings.insert("autodestruct_minutes".into(), minutes);

    let runtime = data
        .get_mut("runtime")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| anyhow::anyhow!("v1 payload has no runtime object"))?;
    runtime.entry("explosion_result").or_insert(Value::Null);

    Ok(data)
}

/// Run the migration chain from `version` up to CURRENT_VERSION.
pub fn migrate_payload(version: u32, mut data: Value) -> SafeResult<Value> {
    if version > CURRENT_VERSION {
        return Err(SafeError::UnsupportedVersion { version });
    }
    for from in version..CURRENT_VERSION {
        let step = migration_from(from).ok_or(SafeError::MissingMigration { from })?;
        data = step(data)?;
        log::debug!("migrated stored snapshot v{from} -> v{}", from + 1);
    }
    Ok(data)
}

pub fn save(store: &SafeStore, key: &str, snapshot: &SafeSnapshot) -> SafeResult<()> {
    let json = serde_json::to_string(&Envelope { version: CURRENT_VERSION, data: snapshot })?;
    store.put(key, &json)?;
    Ok(())
}

/// Load with the failure reason intact. `Ok(None)` means nothing stored.
pub fn try_load(store: &SafeStore, key: &str) -> SafeResult<Option<SafeSnapshot>> {
    let Some(json) = store.get(key)? else {
        return Ok(None);
    };
    let raw: RawEnvelope = serde_json::from_str(&json)?;
    let data = migrate_payload(raw.version, raw.data)?;
    let snapshot: SafeSnapshot = serde_json::from_value(data)?;

    if !snapshot.check_invariants() {
        return Err(anyhow::anyhow!("stored snapshot {} violates state invariants", snapshot.id).into());
    }
    Ok(Some(snapshot))
}

/// Load for startup. Any failure is logged and treated as absent.
pub fn load(store: &SafeStore, key: &str) -> Option<SafeSnapshot> {
    match try_load(store, key) {
        Ok(found) => found,
        Err(e) => {
            log::warn!("discarding stored snapshot under '{key}': {e}");
            None
        }
    }
}
