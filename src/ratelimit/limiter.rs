//! Burstable rate limiter.

use tracing::trace;

use super::clock::{Clock, MonotonicClock};
use super::limit::Limit;
use crate::error::{BurstgateError, Result};

/// Accounting state of a limiter.
#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    /// `init` has not been called yet
    Uninitialized,
    /// Balance as of `last_time`
    Ready { last_time: f64, balance: f64 },
}

/// A burstable rate limiter.
///
/// This limits a transfer rate using a balance rather than an average rate.
/// The limited link may spend its whole balance at once or slowly over time,
/// and the balance replenishes at `bytes_per_second` up to `max_balance`.
/// Transfers may overdraw the balance down to `min_balance`.
///
/// The balance is only brought up to date when [`update_balance`] or
/// [`gate`] is called. A limiter has no internal synchronization; give each
/// limited entity its own instance, or wrap shared ones in a lock (see
/// [`LimiterSet`](super::LimiterSet)).
///
/// [`update_balance`]: RateLimiter::update_balance
/// [`gate`]: RateLimiter::gate
#[derive(Debug, Clone)]
pub struct RateLimiter<C: Clock = MonotonicClock> {
    clock: C,
    state: State,
}

impl RateLimiter {
    /// Create an uninitialized rate limiter on the monotonic clock.
    ///
    /// [`init`](RateLimiter::init) must be called before this is used.
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock)
    }

    /// Create a rate limiter holding `preload` as its initial balance.
    pub fn with_preload(preload: f64) -> Self {
        Self::with_clock_and_preload(MonotonicClock, preload)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> RateLimiter<C> {
    /// Create an uninitialized rate limiter reading time from `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            state: State::Uninitialized,
        }
    }

    /// Create a rate limiter reading time from `clock` with `preload` as its
    /// initial balance.
    pub fn with_clock_and_preload(clock: C, preload: f64) -> Self {
        let mut limiter = Self::with_clock(clock);
        limiter.init(preload);
        limiter
    }

    /// Initialize or re-initialize the limiter.
    ///
    /// The balance is set to `preload` as given, without clamping to any limit.
    pub fn init(&mut self, preload: f64) {
        self.state = State::Ready {
            last_time: self.clock.now(),
            balance: preload,
        };
    }

    /// Whether `init` has been called.
    pub fn is_initialized(&self) -> bool {
        matches!(self.state, State::Ready { .. })
    }

    /// The balance as of the last update, without accruing.
    pub fn balance(&self) -> Option<f64> {
        match self.state {
            State::Ready { balance, .. } => Some(balance),
            State::Uninitialized => None,
        }
    }

    /// The time of the last update.
    pub fn last_time(&self) -> Option<f64> {
        match self.state {
            State::Ready { last_time, .. } => Some(last_time),
            State::Uninitialized => None,
        }
    }

    /// The clock this limiter reads.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Accrue balance for the time elapsed since the last update.
    ///
    /// The new balance is capped at `limit.max_balance` but not raised to
    /// `limit.min_balance`. Elapsed time is used as read from the clock, so a
    /// clock stepping backwards drains the balance.
    pub fn update_balance(&mut self, limit: &Limit) -> Result<f64> {
        match &mut self.state {
            State::Uninitialized => Err(BurstgateError::Uninitialized),
            State::Ready { last_time, balance } => {
                let now = self.clock.now();
                let elapsed = now - *last_time;
                *last_time = now;
                *balance = limit
                    .max_balance
                    .min(*balance + limit.bytes_per_second * elapsed);
                Ok(*balance)
            }
        }
    }

    /// Update the balance and test whether `bytes` may be transferred.
    ///
    /// The transfer is charged against the balance whether or not it is
    /// permitted, down to `limit.min_balance`. There is no refund.
    pub fn gate(&mut self, limit: &Limit, bytes: f64) -> Result<bool> {
        let available = self.update_balance(limit)?;
        let permitted = available >= bytes;
        let remaining = limit.min_balance.max(available - bytes);

        if let State::Ready { balance, .. } = &mut self.state {
            *balance = remaining;
        }

        trace!(
            bytes = bytes,
            available = available,
            remaining = remaining,
            permitted = permitted,
            "Gated transfer"
        );

        Ok(permitted)
    }
}
