//! Limit parameters shared by rate limiters.

use serde::{Deserialize, Serialize};

use crate::error::{BurstgateError, Result};

/// Limits to apply to a rate limiter.
///
/// Many limiters usually run under the same limits, so a `Limit` is kept
/// outside the limiter and passed into each call. It is never mutated by a
/// limiter and can be shared freely.
///
/// Nothing is enforced on construction. Callers are expected to supply
/// `min_balance <= 0 <= max_balance` and a non-negative rate; see
/// [`Limit::validate`] for an explicit check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Limit {
    /// Rate of balance accrual in bytes per second
    pub bytes_per_second: f64,
    /// Maximum balance that can ever be accrued (should be > 0)
    pub max_balance: f64,
    /// Minimum balance, or maximum allowable debt (should be <= 0)
    #[serde(default)]
    pub min_balance: f64,
}

impl Limit {
    /// Create a new limit.
    pub const fn new(bytes_per_second: f64, max_balance: f64, min_balance: f64) -> Self {
        Self {
            bytes_per_second,
            max_balance,
            min_balance,
        }
    }

    /// Check that this limit describes a usable budget.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("bytes_per_second", self.bytes_per_second),
            ("max_balance", self.max_balance),
            ("min_balance", self.min_balance),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(BurstgateError::InvalidLimit(format!(
                    "{} must be finite, got {}",
                    name, value
                )));
            }
        }

        if self.bytes_per_second < 0.0 {
            return Err(BurstgateError::InvalidLimit(format!(
                "bytes_per_second must not be negative, got {}",
                self.bytes_per_second
            )));
        }
        if self.min_balance > 0.0 {
            return Err(BurstgateError::InvalidLimit(format!(
                "min_balance must be <= 0, got {}",
                self.min_balance
            )));
        }
        if self.max_balance < self.min_balance {
            return Err(BurstgateError::InvalidLimit(format!(
                "max_balance {} is below min_balance {}",
                self.max_balance, self.min_balance
            )));
        }

        Ok(())
    }
}
