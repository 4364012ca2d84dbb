//! PIN digests.
//!
//! The digest is cosmetic obfuscation so the plaintext PIN is never
//! persisted. It is not a security boundary.

use crate::error::{SafeError, SafeResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct PinDigest(String);

impl PinDigest {
    /// hex(sha256(salt || pin)).
    pub fn compute(pin: &str, salt: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(pin.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Checks the two PIN fields of the close dialog.
/// Failure is a local UX error; no state is touched.
pub fn confirm_pin(first: &str, second: &str, min_len: usize) -> SafeResult<()> {
    if first.is_empty() {
        return Err(SafeError::EmptyPin);
    }
    if first.chars().count() < min_len {
        return Err(SafeError::InvalidSetting {
            field:  "pin",
            reason: format!("must be at least {min_len} characters"),
        });
    }
    if first != second {
        return Err(SafeError::PinMismatch);
    }
    Ok(())
}
