//! Every event the reducer understands.
//!
//! RULE: the dispatch loop is the only caller of the reducer.
//! Events arrive from the UI shell, from the timer, or from the
//! reducer itself (follow-up events), and are drained strictly FIFO.

use crate::{
    pin::PinDigest,
    snapshot::{EmbeddedImage, SafeSettings},
    types::Timestamp,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SafeEvent {
    // ── Lifecycle ──────────────────────────────────
    Open,
    Close {
        pin_hash: PinDigest,
        now:      Timestamp,
    },
    WrongPin,
    Tick {
        now: Timestamp,
    },
    Explode,
    Survive,
    StartNew,

    // ── Content editing (open safe only) ───────────
    EditText {
        text: String,
    },
    AttachImage {
        image: EmbeddedImage,
    },
    RemoveImage,
    UpdateSettings {
        settings: SafeSettings,
    },
}

impl SafeEvent {
    /// Stable snake_case name for logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Open               => "open",
            Self::Close { .. }       => "close",
            Self::WrongPin           => "wrong_pin",
            Self::Tick { .. }        => "tick",
            Self::Explode            => "explode",
            Self::Survive            => "survive",
            Self::StartNew           => "start_new",
            Self::EditText { .. }    => "edit_text",
            Self::AttachImage { .. } => "attach_image",
            Self::RemoveImage        => "remove_image",
            Self::UpdateSettings { .. } => "update_settings",
        }
    }
}
