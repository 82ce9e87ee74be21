//! Bounded event queue (§4.G, §5 "shared resource policy").
//!
//! FIFO pop order, `RESIZE` coalescing at the tail, and `post_user_event`
//! callable from another thread under a small internal lock — §5 names
//! exactly this surface as the engine's only cross-thread boundary besides
//! the platform wake. Teardown rejects new posts with `INVALID_ARGUMENT`
//! and in-flight posts are drained (not dropped) before the queue goes away.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::containers::RingBuffer;
use crate::error::ZrError;

use super::event::{Event, EventKind};

pub struct EventQueue {
    inner: Mutex<RingBuffer<Event>>,
    teardown: AtomicBool,
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        Self { inner: Mutex::new(RingBuffer::with_capacity(capacity)), teardown: AtomicBool::new(false) }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push(&self, event: Event) -> Result<(), ZrError> {
        self.inner.lock().unwrap().push_back(event)
    }

    /// Push a `RESIZE`, replacing a trailing `RESIZE` already at the tail
    /// instead of growing the queue with stale intermediate sizes.
    pub fn push_resize_coalesced(&self, cols: u16, rows: u16, time_ms: u64) -> Result<(), ZrError> {
        let mut q = self.inner.lock().unwrap();
        if let Some(back) = q.back_mut() {
            if matches!(back.kind, EventKind::Resize { .. }) {
                back.time_ms = time_ms;
                back.kind = EventKind::Resize { cols, rows };
                return Ok(());
            }
        }
        q.push_back(Event::new(time_ms, EventKind::Resize { cols, rows }))
    }

    pub fn pop_front(&self) -> Option<Event> {
        self.inner.lock().unwrap().pop_front()
    }

    /// Re-queue an event at the front (§4.H truncation handling).
    pub fn push_front(&self, event: Event) {
        self.inner.lock().unwrap().push_front(event);
    }

    /// Cross-thread entry point (§4.G `post_user_event`). Rejects with
    /// `INVALID_ARGUMENT` once teardown has begun.
    pub fn post_user_event(&self, tag: u64, payload: &[u8], time_ms: u64) -> Result<(), ZrError> {
        if self.teardown.load(Ordering::Acquire) {
            return Err(ZrError::invalid_argument("post_user_event after teardown began"));
        }
        self.push(Event::new(time_ms, EventKind::User { tag, payload: payload.to_vec() }))
    }

    /// Mark the queue as tearing down; in-flight posters still holding the
    /// lock complete normally, but no further posts are admitted.
    pub fn begin_teardown(&self) {
        self.teardown.store(true, Ordering::Release);
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_preserved() {
        let q = EventQueue::new(8);
        q.push(Event::new(1, EventKind::Tick { seq: 1 })).unwrap();
        q.push(Event::new(2, EventKind::Tick { seq: 2 })).unwrap();
        assert_eq!(q.pop_front().unwrap().kind, EventKind::Tick { seq: 1 });
        assert_eq!(q.pop_front().unwrap().kind, EventKind::Tick { seq: 2 });
    }

    #[test]
    fn resize_coalesces_at_tail() {
        let q = EventQueue::new(8);
        q.push(Event::new(0, EventKind::Tick { seq: 0 })).unwrap();
        q.push_resize_coalesced(80, 24, 1).unwrap();
        q.push_resize_coalesced(100, 30, 2).unwrap();
        assert_eq!(q.len(), 2);
        q.pop_front().unwrap();
        let ev = q.pop_front().unwrap();
        assert_eq!(ev.kind, EventKind::Resize { cols: 100, rows: 30 });
    }

    #[test]
    fn post_user_event_rejected_after_teardown() {
        let q = EventQueue::new(8);
        q.begin_teardown();
        let err = q.post_user_event(1, b"x", 0).unwrap_err();
        assert_eq!(err.kind(), "INVALID_ARGUMENT");
    }

    #[test]
    fn push_past_capacity_is_limit_error() {
        let q = EventQueue::new(1);
        q.push(Event::new(0, EventKind::Tick { seq: 0 })).unwrap();
        let err = q.push(Event::new(0, EventKind::Tick { seq: 1 })).unwrap_err();
        assert_eq!(err.kind(), "LIMIT");
    }
}
