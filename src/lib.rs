#![allow(clippy::async_fn_in_trait)]
pub mod common;
pub mod runner;
pub mod ticker;
pub mod traits;

pub use common::error::{TickerError, TickerResult};
pub use runner::runner::run_demo;
pub use ticker::jitter_ticker::{JitterTicker, StopHandle, TickerControl};
pub use ticker::stats::TickerStats;
pub use ticker::tick::{Tick, TickReceiver};
pub use traits::tick_source::{TickSource, UnsendTickSource};
