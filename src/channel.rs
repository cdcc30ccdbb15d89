use std::collections::VecDeque;

/// Fixed-capacity FIFO decoupling exactly one producer stage from exactly one
///  consumer stage.
///
/// Push on a full channel and pop on an empty channel are refused, never
///  silently dropped - backpressure is the caller re-offering on a later
///  cycle. Depth is fixed at construction; sizing it (in particular sizing
///  the payload channel to hold the largest expected frame) is the caller's
///  responsibility.
pub struct BoundedChannel<T> {
    buf: VecDeque<T>,
    depth: usize,
}

impl<T> BoundedChannel<T> {
    pub fn new(depth: usize) -> BoundedChannel<T> {
        assert!(depth > 0, "channel depth must be positive");
        BoundedChannel {
            buf: VecDeque::with_capacity(depth),
            depth,
        }
    }

    /// Appends an item, handing it back unchanged if the channel is at depth.
    pub fn try_push(&mut self, item: T) -> Result<(), T> {
        if self.buf.len() == self.depth {
            return Err(item);
        }
        self.buf.push_back(item);
        Ok(())
    }

    pub fn try_pop(&mut self) -> Option<T> {
        self.buf.pop_front()
    }

    /// The item the next pop would return, without consuming it.
    pub fn peek(&self) -> Option<&T> {
        self.buf.front()
    }

    pub fn occupancy(&self) -> usize {
        self.buf.len()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() == self.depth
    }

    /// External reset: discard everything in flight.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}
