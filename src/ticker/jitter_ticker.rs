use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::common::config::TickerConfig;
use crate::common::error::{TickerError, TickerResult};
use crate::common::utils::{TIMER_RESOLUTION, instance_seed, jitter_delay};
use crate::ticker::stats::{StatsCounters, TickerStats};
use crate::ticker::tick::{Tick, TickReceiver};

/// Emits ticks every `interval` plus a uniform extra delay in `[0, jitter)`.
/// The delay is drawn in whole milliseconds, the resolution of tokio's
/// timer, so `jitter` must be at least one millisecond.
///
/// The event buffer holds a single tick. When the consumer has not taken the
/// previous one, new ticks are discarded rather than queued, so the
/// background task never waits on the consumer.
///
/// `stop` only raises a flag. The background task notices it after its
/// current sleep, so up to `interval + jitter` may pass before it exits.
#[derive(Debug)]
pub struct JitterTicker {
    events: TickReceiver,
    control: TickerControl,
}

impl JitterTicker {
    /// Validates the parameters and starts the background task on the
    /// current tokio runtime. Nothing is spawned when validation fails.
    pub fn new(interval: Duration, jitter: Duration) -> TickerResult<Self> {
        if interval.is_zero() {
            return Err(TickerError::InvalidArgument {
                name: "interval",
                value: interval,
                reason: "non-positive",
            });
        }
        if jitter.is_zero() {
            return Err(TickerError::InvalidArgument {
                name: "jitter",
                value: jitter,
                reason: "non-positive",
            });
        }
        if jitter < TIMER_RESOLUTION {
            return Err(TickerError::InvalidArgument {
                name: "jitter",
                value: jitter,
                reason: "sub-millisecond",
            });
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| TickerError::NoRuntime)?;

        let rng = StdRng::seed_from_u64(instance_seed());
        let (tx, rx) = mpsc::channel::<Tick>(1);
        let stopper = StopHandle::new();
        let counters = Arc::new(StatsCounters::default());

        let emitter = Emitter {
            interval,
            jitter,
            rng,
            tx,
            stop: stopper.flag.clone(),
            counters: counters.clone(),
        };
        let task = runtime.spawn(emitter.run());
        log::debug!("JitterTicker started: interval={:?}, jitter={:?}", interval, jitter);

        Ok(JitterTicker {
            events: TickReceiver::new(rx),
            control: TickerControl {
                interval,
                jitter,
                stopper,
                counters,
                task: Some(task),
            },
        })
    }

    pub fn from_config(config: &TickerConfig) -> TickerResult<Self> {
        Self::new(config.interval(), config.jitter())
    }

    pub async fn recv(&mut self) -> Option<Tick> {
        self.events.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Tick> {
        self.events.try_recv()
    }

    pub fn events(&mut self) -> &mut TickReceiver {
        &mut self.events
    }

    /// See [`TickerControl::stop`].
    pub fn stop(&self) -> bool {
        self.control.stop()
    }

    pub fn is_stopped(&self) -> bool {
        self.control.is_stopped()
    }

    /// See [`TickerControl::join`].
    pub async fn join(&mut self) {
        self.control.join().await
    }

    pub fn stats(&self) -> TickerStats {
        self.control.stats()
    }

    pub fn interval(&self) -> Duration {
        self.control.interval
    }

    pub fn jitter(&self) -> Duration {
        self.control.jitter
    }

    /// Splits the read-only event stream from the control side.
    pub fn into_parts(self) -> (TickReceiver, TickerControl) {
        (self.events, self.control)
    }
}

/// Owns the background task of a ticker. Dropping it does not stop the task.
#[derive(Debug)]
pub struct TickerControl {
    interval: Duration,
    jitter: Duration,
    stopper: StopHandle,
    counters: Arc<StatsCounters>,
    task: Option<JoinHandle<()>>,
}

impl TickerControl {
    /// Requests cancellation and returns immediately. Returns `true` for the
    /// call that made the transition; repeated calls are no-ops.
    pub fn stop(&self) -> bool {
        self.stopper.stop()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopper.is_stopped()
    }

    /// Cloneable handle that can request cancellation from elsewhere.
    pub fn stopper(&self) -> StopHandle {
        self.stopper.clone()
    }

    /// Waits for the background task to exit. Without a prior `stop` (or a
    /// dropped receiver) this waits forever. Returns at once on later calls.
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                log::warn!("JitterTicker task ended abnormally: {:?}", e);
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|task| task.is_finished())
    }

    pub fn stats(&self) -> TickerStats {
        self.counters.snapshot()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn jitter(&self) -> Duration {
        self.jitter
    }
}

/// One-shot cancellation flag shared with the background task.
#[derive(Debug, Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    fn new() -> Self {
        StopHandle { flag: Arc::new(AtomicBool::new(false)) }
    }

    pub fn stop(&self) -> bool {
        let first = self
            .flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if first {
            log::debug!("JitterTicker stop requested");
        } else {
            log::debug!("JitterTicker already stopped, ignoring repeated stop");
        }
        first
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

struct Emitter {
    interval: Duration,
    jitter: Duration,
    rng: StdRng,
    tx: mpsc::Sender<Tick>,
    stop: Arc<AtomicBool>,
    counters: Arc<StatsCounters>,
}

impl Emitter {
    async fn run(mut self) {
        loop {
            let delay = jitter_delay(&mut self.rng, self.jitter);
            sleep(self.interval.saturating_add(delay)).await;

            if self.stop.load(Ordering::Acquire) {
                log::debug!("JitterTicker stopped");
                break;
            }

            match self.tx.try_send(Tick::now()) {
                Ok(()) => self.counters.record_delivered(),
                Err(TrySendError::Full(_)) => {
                    log::trace!("JitterTicker slot occupied, dropping tick");
                    self.counters.record_dropped();
                }
                Err(TrySendError::Closed(_)) => {
                    log::debug!("JitterTicker receiver dropped, exiting");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(10);
    const JITTER: Duration = Duration::from_millis(5);
    const STOP_GRACE: Duration = Duration::from_millis(20);

    #[test]
    fn test_new_outside_runtime_fails() {
        let err = JitterTicker::new(INTERVAL, JITTER).unwrap_err();
        assert_eq!(err, TickerError::NoRuntime);
    }

    #[test]
    fn test_invalid_arguments_checked_before_runtime() {
        let err = JitterTicker::new(Duration::ZERO, JITTER).unwrap_err();
        assert_eq!(
            err,
            TickerError::InvalidArgument {
                name: "interval",
                value: Duration::ZERO,
                reason: "non-positive",
            }
        );
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let err = JitterTicker::new(Duration::ZERO, Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, TickerError::InvalidArgument { name: "interval", .. }));
    }

    #[tokio::test]
    async fn test_zero_jitter_rejected() {
        let err = JitterTicker::new(Duration::from_millis(100), Duration::ZERO).unwrap_err();
        assert!(matches!(err, TickerError::InvalidArgument { name: "jitter", .. }));
    }

    #[tokio::test]
    async fn test_sub_millisecond_jitter_rejected() {
        let err = JitterTicker::new(INTERVAL, Duration::from_micros(500)).unwrap_err();
        assert_eq!(
            err,
            TickerError::InvalidArgument {
                name: "jitter",
                value: Duration::from_micros(500),
                reason: "sub-millisecond",
            }
        );
    }

    #[tokio::test]
    async fn test_from_config() {
        let config = TickerConfig { interval_ms: 100, jitter_ms: 50, run_for_ms: None };
        let ticker = JitterTicker::from_config(&config).unwrap();
        assert_eq!(ticker.interval(), Duration::from_millis(100));
        assert_eq!(ticker.jitter(), Duration::from_millis(50));
        ticker.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_inter_arrival_within_bounds() {
        let mut ticker = JitterTicker::new(INTERVAL, JITTER).unwrap();
        let mut previous = ticker.recv().await.unwrap();
        for _ in 0..50 {
            let tick = ticker.recv().await.unwrap();
            let elapsed = tick.instant.duration_since(previous.instant);
            assert!(elapsed >= INTERVAL, "tick too early: {:?}", elapsed);
            assert!(elapsed < INTERVAL + JITTER, "tick too late: {:?}", elapsed);
            previous = tick;
        }
        ticker.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_millisecond_jitter_varies_within_bounds() {
        let jitter = Duration::from_millis(2);
        let mut ticker = JitterTicker::new(INTERVAL, jitter).unwrap();
        let mut previous = ticker.recv().await.unwrap();
        let mut gaps = Vec::new();
        for _ in 0..100 {
            let tick = ticker.recv().await.unwrap();
            gaps.push(tick.instant.duration_since(previous.instant));
            previous = tick;
        }
        ticker.stop();

        for gap in &gaps {
            assert!(*gap >= INTERVAL && *gap < INTERVAL + jitter, "gap {:?}", gap);
        }
        assert!(gaps.contains(&INTERVAL), "gaps: {:?}", gaps);
        assert!(gaps.contains(&(INTERVAL + Duration::from_millis(1))), "gaps: {:?}", gaps);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_millisecond_jitter_stays_below_upper_bound() {
        let jitter = Duration::from_millis(1);
        let mut ticker = JitterTicker::new(INTERVAL, jitter).unwrap();
        let mut previous = ticker.recv().await.unwrap();
        for _ in 0..20 {
            let tick = ticker.recv().await.unwrap();
            let elapsed = tick.instant.duration_since(previous.instant);
            assert!(elapsed >= INTERVAL && elapsed < INTERVAL + jitter, "gap {:?}", elapsed);
            previous = tick;
        }
        ticker.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_fractional_interval_stays_below_upper_bound() {
        let interval = Duration::from_micros(10_400);
        let jitter = Duration::from_millis(3);
        let mut ticker = JitterTicker::new(interval, jitter).unwrap();
        let mut previous = ticker.recv().await.unwrap();
        for _ in 0..50 {
            let tick = ticker.recv().await.unwrap();
            let elapsed = tick.instant.duration_since(previous.instant);
            assert!(elapsed >= interval, "tick too early: {:?}", elapsed);
            assert!(elapsed < interval + jitter, "tick too late: {:?}", elapsed);
            previous = tick;
        }
        ticker.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let ticker = JitterTicker::new(INTERVAL, JITTER).unwrap();
        assert!(!ticker.is_stopped());
        assert!(ticker.stop());
        assert!(ticker.is_stopped());
        assert!(!ticker.stop());
        assert!(ticker.is_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_after_stop_within_one_cycle() {
        let mut ticker = JitterTicker::new(INTERVAL, JITTER).unwrap();
        ticker.recv().await.unwrap();
        ticker.stop();

        tokio::time::timeout(STOP_GRACE, ticker.join())
            .await
            .expect("task did not exit within one cycle of stop");
        assert!(ticker.control.is_finished());
        // Second join returns immediately.
        ticker.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_ends_after_stop() {
        let mut ticker = JitterTicker::new(INTERVAL, JITTER).unwrap();
        ticker.recv().await.unwrap();
        ticker.stop();

        let mut after_stop = 0;
        while ticker.recv().await.is_some() {
            after_stop += 1;
        }
        assert!(after_stop <= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_receiver_ends_task() {
        let ticker = JitterTicker::new(INTERVAL, JITTER).unwrap();
        let (events, mut control) = ticker.into_parts();
        drop(events);

        tokio::time::timeout(STOP_GRACE, control.join())
            .await
            .expect("task kept running without a receiver");
        assert!(!control.is_stopped());
        assert_eq!(control.stats().delivered, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopper_from_another_task() {
        let ticker = JitterTicker::new(INTERVAL, JITTER).unwrap();
        let (mut events, mut control) = ticker.into_parts();
        let stopper = control.stopper();

        let consumer = tokio::spawn(async move {
            let mut seen = 0;
            while events.recv().await.is_some() {
                seen += 1;
                if seen == 3 {
                    stopper.stop();
                }
            }
            seen
        });

        control.join().await;
        let seen = consumer.await.unwrap();
        assert!((3..=4).contains(&seen), "saw {} ticks", seen);
        assert!(control.is_stopped());
    }
}
