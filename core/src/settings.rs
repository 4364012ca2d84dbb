//! Settings form validation.
//!
//! RULE: range checks happen here, at the form boundary.
//! The reducer assumes validated settings and never re-checks them.

use crate::{
    error::{SafeError, SafeResult},
    snapshot::{Language, SafeSettings},
};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

pub const AUTODESTRUCT_MINUTES_RANGE: RangeInclusive<i64> = 1..=999;
pub const SURVIVAL_CHANCE_RANGE: RangeInclusive<i64> = 1..=100;

/// Raw values as entered by the user. Numbers are wide signed
/// integers so out-of-range input is representable and rejectable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsForm {
    pub language:             Option<String>,
    #[serde(default)]
    pub survival_enabled:     bool,
    pub survival_chance:      Option<i64>,
    pub autodestruct_minutes: Option<i64>,
    pub pin_attempts_limit:   Option<i64>,
}

impl SettingsForm {
    /// Pre-fill the form from existing settings.
    pub fn from_settings(s: &SafeSettings) -> Self {
        Self {
            language:             Some(s.language.code().to_string()),
            survival_enabled:     s.survival_enabled,
            survival_chance:      s.survival_chance.map(i64::from),
            autodestruct_minutes: s.autodestruct_minutes.map(i64::from),
            pin_attempts_limit:   s.pin_attempts_limit.map(i64::from),
        }
    }

    /// Validate against `current`. Fields left empty keep their meaning
    /// of "off", except the survival chance: an empty chance keeps the
    /// remembered value from `current`.
    pub fn validate(&self, current: &SafeSettings) -> SafeResult<SafeSettings> {
        let language = match &self.language {
            Some(code) => Language::from_code(code).ok_or_else(|| SafeError::InvalidSetting {
                field:  "language",
                reason: format!("unsupported language '{code}'"),
            })?,
            None => current.language,
        };

        let survival_chance = match self.survival_chance {
            Some(p) => Some(in_range("survival_chance", p, SURVIVAL_CHANCE_RANGE)? as u8),
            None => current.survival_chance,
        };

        let autodestruct_minutes = self
            .autodestruct_minutes
            .map(|m| in_range("autodestruct_minutes", m, AUTODESTRUCT_MINUTES_RANGE))
            .transpose()?
            .map(|m| m as u32);

        let pin_attempts_limit = self
            .pin_attempts_limit
            .map(|n| in_range("pin_attempts_limit", n, 1..=i64::from(u32::MAX)))
            .transpose()?
            .map(|n| n as u32);

        Ok(SafeSettings {
            language,
            survival_enabled: self.survival_enabled,
            survival_chance,
            autodestruct_minutes,
            pin_attempts_limit,
        })
    }
}

fn in_range(field: &'static str, value: i64, range: RangeInclusive<i64>) -> SafeResult<i64> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(SafeError::InvalidSetting {
            field,
            reason: format!("{value} is outside {}..={}", range.start(), range.end()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_values() {
        let current = SafeSettings::default();

        let form = SettingsForm { autodestruct_minutes: Some(1000), ..Default::default() };
        assert!(matches!(
            form.validate(&current),
            Err(SafeError::InvalidSetting { field: "autodestruct_minutes", .. })
        ));

        let form = SettingsForm { pin_attempts_limit: Some(0), ..Default::default() };
        assert!(form.validate(&current).is_err());

        let form = SettingsForm { survival_chance: Some(101), ..Default::default() };
        assert!(form.validate(&current).is_err());

        let form = SettingsForm { language: Some("fr".into()), ..Default::default() };
        assert!(form.validate(&current).is_err());
    }

    #[test]
    fn disabling_survival_keeps_remembered_chance() {
        let current = SafeSettings {
            survival_enabled: true,
            survival_chance: Some(35),
            ..Default::default()
        };
        let form = SettingsForm { survival_enabled: false, ..Default::default() };

        let next = form.validate(&current).unwrap();
        assert!(!next.survival_enabled);
        assert_eq!(next.survival_chance, Some(35));
    }

    #[test]
    fn accepts_boundaries() {
        let form = SettingsForm {
            language:             Some("ru".into()),
            survival_enabled:     true,
            survival_chance:      Some(100),
            autodestruct_minutes: Some(999),
            pin_attempts_limit:   Some(1),
        };
        let s = form.validate(&SafeSettings::default()).unwrap();
        assert_eq!(s.language, Language::Ru);
        assert_eq!(s.survival_chance, Some(100));
        assert_eq!(s.autodestruct_minutes, Some(999));
        assert_eq!(s.pin_attempts_limit, Some(1));
    }

    #[test]
    fn prefilled_form_validates_back_to_same_settings() {
        let current = SafeSettings {
            language:             Language::Es,
            survival_enabled:     true,
            survival_chance:      Some(25),
            autodestruct_minutes: Some(15),
            pin_attempts_limit:   Some(3),
        };
        let form = SettingsForm::from_settings(&current);
        assert_eq!(form.language.as_deref(), Some("es"));
        assert_eq!(form.validate(&SafeSettings::default()).unwrap(), current);
    }
}
