//! Timestamps for `modify`'s last-writer-wins conflict resolution.
//!
//! The original implementation carried a partial Lamport clock
//! (`is_in_past`/`update_clock`), but `Memory.modify` never actually wired
//! it in: `Collector.modify_var` compared against `time.time()`. We take
//! the distilled spec's default (physical wall-clock) and keep the Lamport
//! option behind the same trait so a future Director could swap clocks
//! without touching `Shard` dispatch logic.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// An opaque, monotonically comparable instant. Only ordering matters to
/// last-writer-wins; the representation (nanoseconds since the epoch, or a
/// Lamport counter) is an implementation detail of the `Clock` in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub u128);

/// A source of `Timestamp`s sampled by the Director just before a `modify`
/// send, per the distilled spec's §4.2.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Physical wall-clock time. The crate default.
#[derive(Debug, Default, Clone, Copy)]
pub struct WallClock;

impl Clock for WallClock {
    fn now(&self) -> Timestamp {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the Unix epoch")
            .as_nanos();
        Timestamp(nanos)
    }
}

/// A Lamport logical clock, offered as the "acceptable, arguably superior"
/// alternative the distilled spec names. `now()` advances the counter by
/// one on every call; `observe` folds in a timestamp seen on the wire so
/// the clock tracks causality across the single Director, matching the
/// original's `is_in_past`/`update_clock` pair.
#[derive(Debug, Default)]
pub struct LamportClock {
    counter: parking_lot::Mutex<u128>,
}

impl LamportClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold an externally observed timestamp into the clock, matching
    /// `Clock.update_clock` in the original: the counter only ever moves
    /// forward.
    pub fn observe(&self, seen: Timestamp) {
        let mut counter = self.counter.lock();
        if seen.0 > *counter {
            *counter = seen.0;
        }
    }
}

impl Clock for LamportClock {
    fn now(&self) -> Timestamp {
        let mut counter = self.counter.lock();
        *counter += 1;
        Timestamp(*counter)
    }
}
