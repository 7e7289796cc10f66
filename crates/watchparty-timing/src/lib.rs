//! # watchparty-timing
//!
//! Relay clock synchronization for watch parties.
//!
//! This crate provides:
//! - A local wall-clock abstraction (system and hand-driven clocks)
//! - Round-trip offset and latency estimation against the relay
//! - Local/relay timestamp conversion

mod clock;
mod sync;
mod traits;

pub use clock::{ClockEstimate, ManualClock, SystemClock, unix_millis};
pub use sync::{ClockSync, estimate_from_round_trip};
pub use traits::LocalClock;

#[cfg(test)]
pub use traits::MockLocalClock;
