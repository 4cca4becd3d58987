//! Bandwidth-limited copying between async streams.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use crate::error::{BurstgateError, Result};
use crate::ratelimit::{Clock, Limit, RateLimiter};

/// Default size of a single copied chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Shortest sleep while waiting for balance, matching tokio's timer
/// resolution.
const MIN_WAIT: Duration = Duration::from_millis(1);

/// Summary of a throttled copy.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CopyStats {
    /// Bytes written
    pub bytes: u64,
    /// Chunks written
    pub chunks: u64,
    /// Number of times the copy slept waiting for balance
    pub waits: u64,
    /// Total time spent sleeping
    pub waited: Duration,
    /// Gates denied after the balance looked sufficient
    pub denied: u64,
}

/// Copy everything from `reader` to `writer`, spending `limiter` balance for
/// each chunk written.
///
/// Chunks are never larger than `limit.max_balance`, otherwise they could
/// never become affordable. When a chunk cannot be afforded yet, the copy
/// sleeps for as long as accrual needs to cover it instead of gating early.
/// Gating early would charge the denied attempt on top of the eventual
/// transfer.
///
/// Sleeping uses tokio's timer, so the limiter's clock must move with it
/// (`MonotonicClock`, `SystemClock`, or `TokioClock` on a paused runtime). If
/// a wait passes without the balance growing, the copy fails with
/// [`BurstgateError::Stalled`] rather than waiting forever. A gate that is
/// denied anyway, e.g. because the clock stepped backwards between reads, is
/// counted in [`CopyStats::denied`] and the chunk waits again.
pub async fn copy_throttled<R, W, C>(
    reader: &mut R,
    writer: &mut W,
    limiter: &mut RateLimiter<C>,
    limit: &Limit,
    chunk_size: usize,
) -> Result<CopyStats>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    C: Clock,
{
    if chunk_size == 0 {
        return Err(BurstgateError::Config("chunk_size must be > 0".to_string()));
    }
    let chunk_size = effective_chunk_size(limit, chunk_size);
    if chunk_size == 0 {
        return Err(BurstgateError::Stalled(format!(
            "max_balance {} cannot cover a single byte",
            limit.max_balance
        )));
    }

    let mut buf = vec![0u8; chunk_size];
    let mut stats = CopyStats::default();

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        let bytes = n as f64;

        // Balance seen right before the last sleep
        let mut before_wait: Option<f64> = None;
        loop {
            let balance = limiter.update_balance(limit)?;
            if balance >= bytes {
                if limiter.gate(limit, bytes)? {
                    break;
                }
                debug!(bytes = n, balance = balance, "Gate denied an affordable chunk");
                stats.denied += 1;
                before_wait = None;
                continue;
            }

            if let Some(previous) = before_wait {
                if balance <= previous {
                    return Err(BurstgateError::Stalled(format!(
                        "balance stayed at {} while waiting; the limiter clock is not advancing",
                        balance
                    )));
                }
            }

            let wait = time_to_accrue(limit, bytes - balance)?.max(MIN_WAIT);
            debug!(
                bytes = n,
                balance = balance,
                wait_ms = wait.as_millis() as u64,
                "Waiting for balance"
            );
            stats.waits += 1;
            stats.waited += wait;
            before_wait = Some(balance);
            tokio::time::sleep(wait).await;
        }

        writer.write_all(&buf[..n]).await?;

        stats.bytes += n as u64;
        stats.chunks += 1;
        trace!(bytes = n, total = stats.bytes, "Wrote chunk");
    }

    writer.flush().await?;
    Ok(stats)
}

/// Largest chunk that `limit` can ever afford, capped at `requested`.
fn effective_chunk_size(limit: &Limit, requested: usize) -> usize {
    if !(limit.max_balance >= 1.0) {
        return 0;
    }
    if limit.max_balance >= requested as f64 {
        requested
    } else {
        limit.max_balance.floor() as usize
    }
}

/// Time needed to accrue `deficit` bytes at the limit's rate.
fn time_to_accrue(limit: &Limit, deficit: f64) -> Result<Duration> {
    if !(limit.bytes_per_second > 0.0) {
        return Err(BurstgateError::Stalled(format!(
            "balance short by {} bytes and bytes_per_second is {}",
            deficit, limit.bytes_per_second
        )));
    }

    Duration::try_from_secs_f64(deficit / limit.bytes_per_second).map_err(|e| {
        BurstgateError::Stalled(format!(
            "cannot wait for {} bytes at {} bytes/s: {}",
            deficit, limit.bytes_per_second, e
        ))
    })
}
