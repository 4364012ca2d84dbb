use thiserror::Error;

#[derive(Error, Debug)]
pub enum SafeError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stored snapshot version {version} is newer than this build supports")]
    UnsupportedVersion { version: u32 },

    #[error("No migration registered from snapshot version {from}")]
    MissingMigration { from: u32 },

    #[error("Invalid setting '{field}': {reason}")]
    InvalidSetting { field: &'static str, reason: String },

    #[error("PIN confirmation does not match")]
    PinMismatch,

    #[error("PIN must not be empty")]
    EmptyPin,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SafeResult<T> = Result<T, SafeError>;
