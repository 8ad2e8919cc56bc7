use crate::ticker::tick::Tick;

/// Read side of a tick stream. Exposes no way to publish ticks.
#[trait_variant::make(TickSource: Send)]
pub trait UnsendTickSource {
    /// Waits for the next tick. `None` once the producer has exited.
    async fn next_tick(&mut self) -> Option<Tick>;
    /// Takes a pending tick without waiting.
    fn try_next_tick(&mut self) -> Option<Tick>;
}
