//! Rate limiting logic and state management.

mod clock;
mod limit;
mod limiter;
mod registry;

pub use clock::{Clock, ManualClock, MonotonicClock, SystemClock, TokioClock};
pub use limit::Limit;
pub use limiter::RateLimiter;
pub use registry::LimiterSet;
