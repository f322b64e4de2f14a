//! # Input debouncer
//! The zone button is wired to a GPIO interrupt. The interrupt side only ever raises a flag in
//! an [`EdgeLatch`], everything else (timing, zone change, publishing) happens when the main
//! loop polls the [`Debouncer`].
//!
//! Edges that arrive inside the debounce window stay latched and are tested again on the next
//! poll. Any number of edges between two polls collapse into one accepted press.
use portable_atomic::{AtomicBool, Ordering};

/// Single word flag shared with interrupt context.
#[derive(Debug)]
pub struct EdgeLatch {
    /// Set by the interrupt, cleared by the main loop when a press is accepted
    pending: AtomicBool,
}

impl EdgeLatch {
    /// A latch with no edge pending, usable in a `static`
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
        }
    }

    /// Record an edge. Safe to call from interrupt context: one atomic store, nothing else.
    pub fn notify_edge(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// True if an edge has been recorded and not yet consumed
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Consume the pending edge
    fn clear(&self) {
        self.pending.store(false, Ordering::Release);
    }
}

impl Default for EdgeLatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Main loop side of the button: rate limits accepted presses.
#[derive(Debug)]
pub struct Debouncer<'a> {
    /// The latch the interrupt writes to
    latch: &'a EdgeLatch,
    /// Tick of the last accepted press, `None` before the first one
    last_accept_tick: Option<u32>,
}

impl<'a> Debouncer<'a> {
    /// Create a new debouncer reading from `latch`
    #[must_use]
    pub const fn new(latch: &'a EdgeLatch) -> Self {
        Self {
            latch,
            last_accept_tick: None,
        }
    }

    /// Returns true exactly when a latched edge is accepted as a press.
    /// A press is accepted if at least `window` ticks passed since the previous accepted one.
    /// Otherwise the edge stays latched for the next poll.
    pub fn poll(&mut self, now_tick: u32, window: u32) -> bool {
        if !self.latch.is_pending() {
            return false;
        }
        let window_elapsed = self
            .last_accept_tick
            .is_none_or(|last| now_tick.wrapping_sub(last) >= window);
        if !window_elapsed {
            debug!("edge inside debounce window, keeping it latched");
            return false;
        }
        self.latch.clear();
        self.last_accept_tick = Some(now_tick);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: u32 = 200;

    #[test]
    fn nothing_pending_nothing_accepted() {
        let latch = EdgeLatch::new();
        let mut debouncer = Debouncer::new(&latch);
        assert!(!debouncer.poll(1000, WINDOW));
    }

    #[test]
    fn two_edges_fifty_ms_apart_give_one_advance() {
        let latch = EdgeLatch::new();
        let mut debouncer = Debouncer::new(&latch);
        // edges at t=1010 and t=1060, loop polls every 200 ms
        latch.notify_edge();
        latch.notify_edge();
        let accepted = [1200, 1400, 1600]
            .into_iter()
            .filter(|&now| debouncer.poll(now, WINDOW))
            .count();
        assert_eq!(accepted, 1);
    }

    #[test]
    fn edge_inside_window_is_kept_for_later() {
        let latch = EdgeLatch::new();
        let mut debouncer = Debouncer::new(&latch);
        latch.notify_edge();
        assert!(debouncer.poll(0, WINDOW));

        latch.notify_edge();
        assert!(!debouncer.poll(100, WINDOW));
        assert!(latch.is_pending());
        assert!(debouncer.poll(200, WINDOW));
        assert!(!latch.is_pending());
    }

    #[test]
    fn window_is_measured_across_tick_rollover() {
        let latch = EdgeLatch::new();
        let mut debouncer = Debouncer::new(&latch);
        latch.notify_edge();
        assert!(debouncer.poll(u32::MAX - 50, WINDOW));

        latch.notify_edge();
        assert!(!debouncer.poll(100, WINDOW));
        assert!(debouncer.poll(149, WINDOW));
    }
}
