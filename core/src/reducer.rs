//! The reducer. Every game rule lives here.
//!
//! CONTRACT:
//!   - `reduce` maps (snapshot, event) to (next snapshot, follow-up events).
//!   - It never fails. An event that does not apply to the current state
//!     is a no-op: the snapshot comes back unchanged and nothing is emitted.
//!   - The only nondeterminism is the survival roll, drawn from the
//!     injected `RandomSource`.
//!   - At most one `Explode` is emitted per call, and only from `Closed`.

use crate::{
    event::SafeEvent,
    rng::{survival_roll, RandomSource},
    snapshot::{ExplosionResult, SafeSnapshot, SafeState},
    types::MS_PER_MINUTE,
};

/// The outcome of one reducer step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reduction {
    pub snapshot: SafeSnapshot,
    pub emitted:  Vec<SafeEvent>,
}

impl Reduction {
    fn unchanged(snapshot: &SafeSnapshot) -> Self {
        Self { snapshot: snapshot.clone(), emitted: vec![] }
    }

    fn to(snapshot: SafeSnapshot) -> Self {
        Self { snapshot, emitted: vec![] }
    }

    fn emit(snapshot: SafeSnapshot, event: SafeEvent) -> Self {
        Self { snapshot, emitted: vec![event] }
    }
}

pub fn reduce(
    current: &SafeSnapshot,
    event: &SafeEvent,
    rng: &mut dyn RandomSource,
) -> Reduction {
    let state = current.state();

    match (event, state) {
        (SafeEvent::Open, SafeState::Closed) => {
            let mut next = current.clone();
            let rt = &mut next.runtime;
            rt.state = SafeState::Open;
            rt.attempts_made = 0;
            rt.pin_hash = None;
            rt.closed_at = None;
            rt.destruct_at = None;
            log::debug!("safe {} opened", next.id);
            Reduction::to(next)
        }

        (SafeEvent::Close { pin_hash, now }, SafeState::Open) => {
            let mut next = current.clone();
            let destruct_at = next
                .settings
                .autodestruct_minutes
                .map(|m| now.saturating_add(i64::from(m) * MS_PER_MINUTE));
            let rt = &mut next.runtime;
            rt.state = SafeState::Closed;
            rt.pin_hash = Some(pin_hash.clone());
            rt.closed_at = Some(*now);
            rt.destruct_at = destruct_at;
            rt.attempts_made = 0;
            rt.explosion_result = None;
            log::debug!("safe {} closed at {now}, destruct_at={destruct_at:?}", next.id);
            Reduction::to(next)
        }

        (SafeEvent::WrongPin, SafeState::Closed) => {
            let mut next = current.clone();
            next.runtime.attempts_made += 1;
            let made = next.runtime.attempts_made;
            log::debug!("safe {} wrong pin, attempts={made}", next.id);

            match next.settings.pin_attempts_limit {
                Some(limit) if made >= limit => Reduction::emit(next, SafeEvent::Explode),
                _ => Reduction::to(next),
            }
        }

        (SafeEvent::Tick { now }, SafeState::Closed) => match current.runtime.destruct_at {
            Some(at) if *now >= at => {
                log::debug!("safe {} timer expired (now={now}, at={at})", current.id);
                Reduction::emit(current.clone(), SafeEvent::Explode)
            }
            _ => Reduction::unchanged(current),
        },

        (SafeEvent::Explode, _) => {
            if survival_roll(&current.settings, rng) {
                log::info!("safe {} survived explosion", current.id);
                Reduction::emit(current.clone(), SafeEvent::Survive)
            } else {
                let next = SafeSnapshot::spawn(current.settings.language);
                log::info!("safe {} destroyed, respawned as {}", current.id, next.id);
                Reduction::to(next)
            }
        }

        (SafeEvent::Survive, SafeState::Closed) => {
            let mut next = current.clone();
            let rt = &mut next.runtime;
            rt.attempts_made = 0;
            rt.destruct_at = None;
            rt.explosion_result = Some(ExplosionResult::Survived);
            Reduction::to(next)
        }

        (SafeEvent::StartNew, SafeState::Destroyed) => {
            let next = SafeSnapshot::spawn(current.settings.language);
            log::info!("new safe {} started", next.id);
            Reduction::to(next)
        }

        (SafeEvent::EditText { text }, SafeState::Open) => {
            let mut next = current.clone();
            next.content.text = text.clone();
            Reduction::to(next)
        }

        (SafeEvent::AttachImage { image }, SafeState::Open) => {
            let mut next = current.clone();
            next.content.image = Some(image.clone());
            Reduction::to(next)
        }

        (SafeEvent::RemoveImage, SafeState::Open) => {
            let mut next = current.clone();
            next.content.image = None;
            Reduction::to(next)
        }

        (SafeEvent::UpdateSettings { settings }, SafeState::Open) => {
            let mut next = current.clone();
            next.settings = settings.clone();
            Reduction::to(next)
        }

        _ => {
            log::debug!("ignoring {} in state {state:?}", event.kind());
            Reduction::unchanged(current)
        }
    }
}
