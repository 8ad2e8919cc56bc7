use chrono::{DateTime, Local};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::traits::tick_source::TickSource;

/// A single emission. Both timestamps are taken at delivery time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Monotonic reading, for ordering and inter-arrival math.
    pub instant: Instant,
    /// Wall-clock reading, for display.
    pub wall: DateTime<Local>,
}

impl Tick {
    pub(crate) fn now() -> Self {
        Tick {
            instant: Instant::now(),
            wall: Local::now(),
        }
    }
}

/// Consumer half of a ticker's single-slot event buffer.
#[derive(Debug)]
pub struct TickReceiver {
    rx: mpsc::Receiver<Tick>,
}

impl TickReceiver {
    pub(crate) fn new(rx: mpsc::Receiver<Tick>) -> Self {
        TickReceiver { rx }
    }

    /// Waits for the next tick. Returns `None` once the background task has
    /// exited and the slot is drained.
    pub async fn recv(&mut self) -> Option<Tick> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Tick> {
        self.rx.try_recv().ok()
    }
}

impl TickSource for TickReceiver {
    async fn next_tick(&mut self) -> Option<Tick> {
        self.recv().await
    }

    fn try_next_tick(&mut self) -> Option<Tick> {
        self.try_recv()
    }
}
