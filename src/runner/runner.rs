use std::time::Duration;

use tokio::time::{Instant, timeout_at};

use crate::common::config::{load_ticker_config, load_ticker_config_from_env};
use crate::ticker::jitter_ticker::JitterTicker;
use crate::ticker::tick::Tick;
use crate::traits::tick_source::TickSource;

pub async fn run_demo(config_path: Option<&str>) -> anyhow::Result<()> {
    env_logger::init();
    let config = match config_path {
        Some(path) => load_ticker_config(path)?,
        None => load_ticker_config_from_env()?,
    };
    log::info!(
        "Starting jitter ticker: interval={}ms, jitter={}ms, run_for={:?}",
        config.interval_ms,
        config.jitter_ms,
        config.run_for()
    );

    let ticker = JitterTicker::from_config(&config)?;
    let (mut events, mut control) = ticker.into_parts();

    let ticks = consume_for(&mut events, config.run_for()).await;

    control.stop();
    control.join().await;
    let stats = control.stats();
    log::info!(
        "Ticker stopped: received={}, delivered={}, dropped={}, cycles={}",
        ticks.len(),
        stats.delivered,
        stats.dropped,
        stats.cycles
    );
    Ok(())
}

/// Drains `source` until `run_for` has elapsed or the stream ends.
pub async fn consume_for<S: TickSource>(source: &mut S, run_for: Duration) -> Vec<Tick> {
    let deadline = Instant::now() + run_for;
    let mut ticks: Vec<Tick> = Vec::new();
    loop {
        match timeout_at(deadline, source.next_tick()).await {
            Ok(Some(tick)) => {
                match ticks.last() {
                    Some(previous) => log::info!(
                        "tick at {} (+{:?})",
                        tick.wall.format("%H:%M:%S%.3f"),
                        tick.instant.duration_since(previous.instant)
                    ),
                    None => log::info!("tick at {}", tick.wall.format("%H:%M:%S%.3f")),
                }
                ticks.push(tick);
            }
            Ok(None) => {
                log::debug!("Tick stream ended");
                break;
            }
            Err(_) => break,
        }
    }
    ticks
}
