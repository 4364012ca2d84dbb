//! Shared primitive types used across the whole crate.

/// Wall-clock time in milliseconds since the Unix epoch.
/// Stored absolute so time spent with the app closed needs no adjustment.
pub type Timestamp = i64;

/// The identity token of one safe. Discarded on respawn.
pub type SafeId = String;

pub const MS_PER_MINUTE: i64 = 60_000;
