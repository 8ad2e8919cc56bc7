use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rand::Rng;

static INSTANCE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Seed for a per-ticker RNG. The clock reading alone can repeat for tickers
/// created back to back, so a process-wide counter is folded in.
pub fn instance_seed() -> u64 {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64;
    let discriminator = INSTANCE_COUNTER.fetch_add(1, Ordering::Relaxed);
    nanos ^ discriminator.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Granularity of tokio's timer. Sleep deadlines are rounded up to it, so
/// finer jitter would collapse into the same wake-up.
pub const TIMER_RESOLUTION: Duration = Duration::from_millis(1);

/// Uniform extra delay in `[0, bound)`, in whole timer ticks. The largest
/// draw is one tick short of `bound`, which keeps `interval + delay` below
/// `interval + bound` after the timer rounds it up.
pub fn jitter_delay<R: Rng>(rng: &mut R, bound: Duration) -> Duration {
    let ticks = u64::try_from(bound.as_millis()).unwrap_or(u64::MAX);
    if ticks == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rng.random_range(0..ticks))
}
