//! Producers polled by the frame driver.

use engine_action::ActionQueue;

/// Something outside the core that turns its own events into actions, such
/// as an input translator.
///
/// Polled once per tick, before time steps are queued. Closures of the form
/// `FnMut(&mut ActionQueue)` are sources too.
pub trait ActionSource {
    /// Push any actions produced since the last call onto `queue`.
    fn collect(&mut self, queue: &mut ActionQueue);
}

impl<F> ActionSource for F
where
    F: FnMut(&mut ActionQueue),
{
    fn collect(&mut self, queue: &mut ActionQueue) {
        self(queue);
    }
}
