//! The safe's data model. One snapshot holds the complete state.
//!
//! A snapshot is never mutated in place across events. The reducer
//! receives the current snapshot by reference and returns a new one.
//!
//! INVARIANTS:
//!   - `pin_hash` is set iff `state == Closed`.
//!   - `destruct_at` is set only while `Closed`.
//!   - `attempts_made < pin_attempts_limit` while `Closed`.

use crate::{
    pin::PinDigest,
    types::{SafeId, Timestamp},
};
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Survival chance applied when survival is enabled but no percent was ever chosen.
pub const DEFAULT_SURVIVAL_CHANCE: u8 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SafeSnapshot {
    pub id:       SafeId,
    pub content:  SafeContent,
    pub settings: SafeSettings,
    pub runtime:  SafeRuntime,
}

impl SafeSnapshot {
    /// A fresh open safe: new identity, empty content, default settings.
    pub fn spawn(language: Language) -> Self {
        Self {
            id:       uuid::Uuid::new_v4().to_string(),
            content:  SafeContent::default(),
            settings: SafeSettings { language, ..SafeSettings::default() },
            runtime:  SafeRuntime::default(),
        }
    }

    pub fn state(&self) -> SafeState {
        self.runtime.state
    }

    /// Structural invariants of the model. A loaded snapshot failing
    /// this check is treated as corrupt.
    pub fn check_invariants(&self) -> bool {
        let rt = &self.runtime;
        let closed = rt.state == SafeState::Closed;

        if rt.pin_hash.is_some() != closed {
            return false;
        }
        if rt.destruct_at.is_some() && !closed {
            return false;
        }
        if let (true, Some(limit)) = (closed, self.settings.pin_attempts_limit) {
            if rt.attempts_made >= limit {
                return false;
            }
        }
        true
    }
}

// ── Content ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SafeContent {
    pub text:  String,
    pub image: Option<EmbeddedImage>,
}

impl SafeContent {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.image.is_none()
    }
}

/// An image stored inline, base64-encoded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbeddedImage {
    pub mime:        String,
    pub data_base64: String,
}

impl EmbeddedImage {
    pub fn from_bytes(mime: &str, bytes: &[u8]) -> Self {
        Self {
            mime:        mime.to_string(),
            data_base64: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    /// The `data:` URL a renderer can embed directly.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.data_base64)
    }

    /// Size of the decoded payload, or `None` if the stored text is not valid base64.
    pub fn decoded_len(&self) -> Option<usize> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.data_base64)
            .ok()
            .map(|b| b.len())
    }
}

// ── Settings ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    En,
    Es,
    Ru,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
            Self::Ru => "ru",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "en" => Some(Self::En),
            "es" => Some(Self::Es),
            "ru" => Some(Self::Ru),
            _ => None,
        }
    }
}

/// Per-safe configuration. Survives open/close cycles and survival
/// events; reset on respawn (language excepted).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SafeSettings {
    pub language:             Language,
    pub survival_enabled:     bool,
    /// Percent in [1,100]. Kept while survival is disabled so that
    /// re-enabling restores the last choice.
    pub survival_chance:      Option<u8>,
    /// Minutes in [1,999]. `None` disables time-based destruction.
    pub autodestruct_minutes: Option<u32>,
    /// `None` means unlimited wrong-PIN attempts.
    pub pin_attempts_limit:   Option<u32>,
}

impl SafeSettings {
    pub fn effective_survival_chance(&self) -> u8 {
        self.survival_chance.unwrap_or(DEFAULT_SURVIVAL_CHANCE)
    }
}

// ── Runtime ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SafeState {
    #[default]
    Open,
    Closed,
    Destroyed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExplosionResult {
    Survived,
}

/// State tied to the current open/closed cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SafeRuntime {
    pub state:            SafeState,
    pub pin_hash:         Option<PinDigest>,
    pub attempts_made:    u32,
    pub closed_at:        Option<Timestamp>,
    pub destruct_at:      Option<Timestamp>,
    pub explosion_result: Option<ExplosionResult>,
}
