//! Traits for clock abstraction.

/// Local wall clock, in milliseconds since the Unix epoch.
///
/// Everything time-dependent in the engine reads through this trait so
/// tests can drive time by hand.
#[cfg_attr(test, mockall::automock)]
pub trait LocalClock: Send + Sync {
    /// Current local wall-clock time in milliseconds.
    fn now_ms(&self) -> i64;
}
