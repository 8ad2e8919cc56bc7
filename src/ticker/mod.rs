pub mod jitter_ticker;
pub mod stats;
pub mod tick;
