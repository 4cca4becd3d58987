//! Time sources for rate limiters.
//!
//! Limiters read the time as floating-point seconds. Only differences between
//! two readings matter, so the epoch of a clock is arbitrary.

use std::sync::{Arc, OnceLock};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// A source of the current time in seconds.
pub trait Clock {
    /// Current time in seconds.
    fn now(&self) -> f64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> f64 {
        (**self).now()
    }
}

/// Monotonic clock measuring seconds since a process-wide anchor.
///
/// All instances share the anchor, so readings from different instances are
/// directly comparable.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

fn anchor() -> Instant {
    static ANCHOR: OnceLock<Instant> = OnceLock::new();
    *ANCHOR.get_or_init(Instant::now)
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        anchor().elapsed().as_secs_f64()
    }
}

/// Wall clock measuring seconds since the UNIX epoch.
///
/// This clock follows system time adjustments and may step backwards.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs_f64(),
            Err(e) => -e.duration().as_secs_f64(),
        }
    }
}

/// Clock measuring seconds since its creation on tokio's time source.
///
/// Under a paused tokio runtime this clock moves only as tokio time is
/// advanced, in step with `tokio::time::sleep`.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    start: tokio::time::Instant,
}

impl TokioClock {
    /// Create a clock reading zero now.
    pub fn new() -> Self {
        Self {
            start: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    time: Arc<Mutex<f64>>,
}

impl ManualClock {
    /// Create a manual clock reading `start` seconds.
    pub fn new(start: f64) -> Self {
        Self {
            time: Arc::new(Mutex::new(start)),
        }
    }

    /// Set the current time. Moving backwards is allowed.
    pub fn set(&self, time: f64) {
        *self.time.lock() = time;
    }

    /// Move the current time by `seconds` (which may be negative).
    pub fn advance(&self, seconds: f64) {
        *self.time.lock() += seconds;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.time.lock()
    }
}
