//! Burstgate - Burstable Rate Limiting
//!
//! This crate implements a balance-based rate limiter for throttling
//! bandwidth. Balance accrues over time up to a ceiling and may be spent in
//! bursts or overdrawn into a bounded debt, rather than enforcing a smooth
//! continuous rate.

pub mod config;
pub mod error;
pub mod ratelimit;
pub mod throttle;
