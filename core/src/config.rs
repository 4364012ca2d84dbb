use crate::snapshot::Language;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILE: &str = "safe.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SafeConfig {
    /// SQLite database holding the persisted snapshot.
    pub db_path: String,
    /// The single key the snapshot lives under.
    pub storage_key: String,
    /// Language of the very first safe. Respawns keep the current one.
    pub default_language: Language,
    /// Mixed into every PIN digest.
    pub pin_salt: String,
    /// Shortest PIN the close dialog accepts.
    pub pin_min_length: usize,
}

impl Default for SafeConfig {
    fn default() -> Self {
        Self {
            db_path:          "safe.db".into(),
            storage_key:      "safe-snapshot".into(),
            default_language: Language::En,
            pin_salt:         "safebox:v1".into(),
            pin_min_length:   4,
        }
    }
}

impl SafeConfig {
    /// Load `safe.json` from `data_dir`. A missing file yields the
    /// defaults; a present but unreadable one is an error.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = Path::new(data_dir).join(CONFIG_FILE);
        if !path.exists() {
            log::info!("no {} in {data_dir}, using defaults", CONFIG_FILE);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        let config: SafeConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Config for tests: in-memory friendly, short PINs allowed.
    pub fn default_test() -> Self {
        Self {
            db_path:        ":memory:".into(),
            pin_min_length: 1,
            ..Self::default()
        }
    }
}
