//! safebox-core: the rules, scheduling and persistence behind a toy
//! self-destructing safe.
//!
//! A safe is either open (editable), closed (PIN-locked, possibly on a
//! countdown) or destroyed. All transitions go through `reducer::reduce`,
//! driven one event at a time by `engine::SafeEngine`.

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod persistence;
pub mod pin;
pub mod reducer;
pub mod rng;
pub mod schedule;
pub mod settings;
pub mod snapshot;
pub mod store;
pub mod types;
