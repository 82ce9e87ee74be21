use crate::error::ZrError;
use std::collections::VecDeque;

/// A bounded FIFO ring buffer backing the event queue (§3 "Event queue").
///
/// Pop order is insertion order. Push past capacity is a `LIMIT` error; the
/// caller (the event parser) decides whether that's fatal or just means
/// "drop the oldest tick", so this type never silently discards for you.
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    cap: usize,
}

impl<T> RingBuffer<T> {
    pub fn with_capacity(cap: usize) -> Self {
        Self { items: VecDeque::with_capacity(cap), cap }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.cap
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn push_back(&mut self, item: T) -> Result<(), ZrError> {
        if self.is_full() {
            return Err(ZrError::limit("event_queue", format!("capacity {} exceeded", self.cap)));
        }
        self.items.push_back(item);
        Ok(())
    }

    pub fn pop_front(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    pub fn back_mut(&mut self) -> Option<&mut T> {
        self.items.back_mut()
    }

    /// Re-queue an item at the front, bypassing the capacity check. Used to
    /// put back events that were popped for packing but didn't fit in the
    /// caller's output buffer (§4.H truncation: unconsumed events must
    /// remain in FIFO order for the next `poll_events` call).
    pub fn push_front(&mut self, item: T) {
        self.items.push_front(item);
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
