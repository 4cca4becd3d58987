//! Keyed collections of rate limiters sharing one limit.

use std::hash::Hash;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use super::clock::{Clock, MonotonicClock};
use super::limit::Limit;
use super::limiter::RateLimiter;

/// A set of independent rate limiters, one per key, all governed by the same
/// [`Limit`].
///
/// Typical keys are peers, connections or channels. Each limiter is locked
/// exclusively while it is updated, so the set can be shared across threads.
/// Limiters never borrow from one another's balance.
///
/// Entries are never evicted. The set grows with every new key until the
/// caller drops keys with [`remove`](LimiterSet::remove) or
/// [`clear`](LimiterSet::clear).
pub struct LimiterSet<K, C = MonotonicClock>
where
    K: Eq + Hash,
    C: Clock + Clone,
{
    limiters: DashMap<K, RateLimiter<C>>,
    limit: RwLock<Limit>,
    preload: f64,
    clock: C,
}

impl<K> LimiterSet<K>
where
    K: Eq + Hash,
{
    /// Create an empty set on the monotonic clock.
    ///
    /// New limiters start with `preload` as their balance.
    pub fn new(limit: Limit, preload: f64) -> Self {
        Self::with_clock(limit, preload, MonotonicClock)
    }
}

impl<K, C> LimiterSet<K, C>
where
    K: Eq + Hash,
    C: Clock + Clone,
{
    /// Create an empty set whose limiters read time from `clock`.
    pub fn with_clock(limit: Limit, preload: f64, clock: C) -> Self {
        Self {
            limiters: DashMap::new(),
            limit: RwLock::new(limit),
            preload,
            clock,
        }
    }

    /// Gate a transfer of `bytes` for `key`.
    ///
    /// A limiter is created for `key` on first use.
    pub fn gate(&self, key: &K, bytes: f64) -> bool
    where
        K: Clone + std::fmt::Debug,
    {
        let limit = self.limit();
        if let Some(mut limiter) = self.limiters.get_mut(key) {
            return matches!(limiter.gate(&limit, bytes), Ok(true));
        }

        let mut limiter = self.limiters.entry(key.clone()).or_insert_with(|| {
            debug!(key = ?key, preload = self.preload, "Creating rate limiter");
            RateLimiter::with_clock_and_preload(self.clock.clone(), self.preload)
        });

        // Entries are created initialized, so only Ok(true) permits
        matches!(limiter.gate(&limit, bytes), Ok(true))
    }

    /// Bring the balance for `key` up to date.
    ///
    /// Returns `None` if no limiter exists for `key`.
    pub fn update_balance(&self, key: &K) -> Option<f64> {
        let limit = self.limit();
        let mut limiter = self.limiters.get_mut(key)?;
        limiter.update_balance(&limit).ok()
    }

    /// The balance for `key` as of its last update.
    pub fn balance(&self, key: &K) -> Option<f64> {
        self.limiters.get(key).and_then(|l| l.balance())
    }

    /// Remove the limiter for `key`, returning its last balance.
    pub fn remove(&self, key: &K) -> Option<f64> {
        self.limiters.remove(key).and_then(|(_, l)| l.balance())
    }

    /// The limit currently in effect.
    pub fn limit(&self) -> Limit {
        *self.limit.read()
    }

    /// Replace the limit. Existing balances are kept and are governed by the
    /// new limit from their next update.
    pub fn set_limit(&self, limit: Limit) {
        *self.limit.write() = limit;
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    /// Whether no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }

    /// Drop all limiters.
    pub fn clear(&self) {
        self.limiters.clear();
    }
}
