//! The dispatch loop. Sole owner of the live snapshot.
//!
//! CONTROL FLOW (one external event at a time):
//!   1. The event enters a FIFO queue.
//!   2. The queue is drained: each event is reduced against the snapshot
//!      produced by the previous step, never a captured copy. Follow-up
//!      events are appended to the back of the queue.
//!   3. The settled snapshot is persisted. A failed write is a warning;
//!      the in-memory snapshot stays authoritative.
//!   4. The timer is re-armed from the settled snapshot.
//!
//! Readers only ever see the snapshot after step 4.

use crate::{
    clock::Clock,
    config::SafeConfig,
    error::SafeResult,
    event::SafeEvent,
    persistence,
    pin::{confirm_pin, PinDigest},
    reducer,
    rng::RandomSource,
    schedule::{TimerScheduler, Wake},
    settings::SettingsForm,
    snapshot::{EmbeddedImage, SafeSnapshot, SafeState},
    store::SafeStore,
    types::Timestamp,
};
use std::collections::VecDeque;

/// What happened during one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Every event reduced, in processing order.
    pub processed: Vec<SafeEvent>,
    /// The safe was destroyed and replaced by a fresh one.
    pub respawned: bool,
    /// An explosion was survived.
    pub survived: bool,
    /// Set when the settled snapshot could not be written.
    pub persist_warning: Option<String>,
}

impl DispatchReport {
    pub fn exploded(&self) -> bool {
        self.processed.contains(&SafeEvent::Explode)
    }
}

pub struct SafeEngine<T: TimerScheduler> {
    config:   SafeConfig,
    snapshot: SafeSnapshot,
    store:    SafeStore,
    rng:      Box<dyn RandomSource>,
    clock:    Box<dyn Clock>,
    timer:    T,
}

impl<T: TimerScheduler> SafeEngine<T> {
    /// Load the stored safe (or spawn one), then deliver a catch-up
    /// `tick` so a deadline that passed while the app was closed fires now.
    /// The store must already be migrated.
    pub fn start(
        config: SafeConfig,
        store: SafeStore,
        rng: Box<dyn RandomSource>,
        clock: Box<dyn Clock>,
        timer: T,
    ) -> (Self, DispatchReport) {
        let snapshot = match persistence::load(&store, &config.storage_key) {
            Some(s) => {
                log::info!("loaded safe {} ({:?})", s.id, s.state());
                s
            }
            None => {
                let s = SafeSnapshot::spawn(config.default_language);
                log::info!("spawned new safe {}", s.id);
                s
            }
        };

        let mut engine = Self { config, snapshot, store, rng, clock, timer };
        let now = engine.clock.now_ms();
        let report = engine.dispatch(SafeEvent::Tick { now });
        (engine, report)
    }

    pub fn snapshot(&self) -> &SafeSnapshot {
        &self.snapshot
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    /// Give up the engine and keep its storage, as when the app is
    /// closed and later reopened on the same database.
    pub fn into_store(self) -> SafeStore {
        self.store
    }

    pub fn now_ms(&self) -> Timestamp {
        self.clock.now_ms()
    }

    /// Feed one event and drain everything it causes.
    pub fn dispatch(&mut self, event: SafeEvent) -> DispatchReport {
        let mut report = DispatchReport::default();
        let mut queue = VecDeque::from([event]);

        while let Some(event) = queue.pop_front() {
            let before = self.snapshot.state();
            let reduction = reducer::reduce(&self.snapshot, &event, self.rng.as_mut());

            if reduction.snapshot.id != self.snapshot.id {
                report.respawned = true;
            }
            if event == SafeEvent::Survive && before == SafeState::Closed {
                report.survived = true;
            }

            log::debug!(
                "dispatch {} -> {:?}, emitted {}",
                event.kind(),
                reduction.snapshot.state(),
                reduction.emitted.len()
            );

            self.snapshot = reduction.snapshot;
            queue.extend(reduction.emitted);
            report.processed.push(event);
        }

        if let Err(e) = persistence::save(&self.store, &self.config.storage_key, &self.snapshot) {
            log::warn!("could not persist safe {}: {e}", self.snapshot.id);
            report.persist_warning = Some(e.to_string());
        }

        let now = self.clock.now_ms();
        self.timer.rearm(&self.snapshot, now);

        report
    }

    // ── UI shell gestures ───────────────────────────────────────────

    /// Close with a PIN entered twice. A confirmation failure leaves
    /// the safe untouched.
    pub fn close_with_pin(&mut self, pin: &str, confirm: &str) -> SafeResult<DispatchReport> {
        confirm_pin(pin, confirm, self.config.pin_min_length)?;
        let pin_hash = PinDigest::compute(pin, &self.config.pin_salt);
        let now = self.clock.now_ms();
        Ok(self.dispatch(SafeEvent::Close { pin_hash, now }))
    }

    /// Compare digests and dispatch `open` or `wrong_pin`.
    pub fn try_open(&mut self, pin: &str) -> DispatchReport {
        let attempt = PinDigest::compute(pin, &self.config.pin_salt);
        let event = match &self.snapshot.runtime.pin_hash {
            Some(stored) if *stored == attempt => SafeEvent::Open,
            Some(_) => SafeEvent::WrongPin,
            // Not closed: `open` is a no-op here.
            None => SafeEvent::Open,
        };
        self.dispatch(event)
    }

    pub fn edit_text(&mut self, text: &str) -> DispatchReport {
        self.dispatch(SafeEvent::EditText { text: text.to_string() })
    }

    pub fn attach_image(&mut self, image: EmbeddedImage) -> DispatchReport {
        self.dispatch(SafeEvent::AttachImage { image })
    }

    pub fn remove_image(&mut self) -> DispatchReport {
        self.dispatch(SafeEvent::RemoveImage)
    }

    /// Validate the form, then apply. Invalid input never reaches the reducer.
    pub fn apply_settings(&mut self, form: &SettingsForm) -> SafeResult<DispatchReport> {
        let settings = form.validate(&self.snapshot.settings)?;
        Ok(self.dispatch(SafeEvent::UpdateSettings { settings }))
    }

    pub fn start_new(&mut self) -> DispatchReport {
        self.dispatch(SafeEvent::StartNew)
    }

    /// Timer deadline reached, or the app came back to the foreground.
    pub fn on_wake(&mut self, wake: Wake) -> DispatchReport {
        log::debug!("wake: {wake:?}");
        let now = self.clock.now_ms();
        self.dispatch(SafeEvent::Tick { now })
    }
}
