//! Debug trace ring (§3 "Debug trace ring", §4.J `debug_*`).
//!
//! A fixed-capacity ring of recent engine events for diagnostics, enabled
//! and disabled independently of everything else — disabled means empty,
//! never "stale". New, per §3's field list; no teacher equivalent (the
//! teacher has no debug-trace facility of its own).

use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceKind {
    FramePresented,
    FrameSkippedNoop,
    DrawlistRejected,
    DrawlistAccepted,
    Resize,
    RawModeEnter,
    RawModeLeave,
    WriteFailure,
}

impl TraceKind {
    pub fn to_wire(self) -> u32 {
        match self {
            TraceKind::FramePresented => 1,
            TraceKind::FrameSkippedNoop => 2,
            TraceKind::DrawlistRejected => 3,
            TraceKind::DrawlistAccepted => 4,
            TraceKind::Resize => 5,
            TraceKind::RawModeEnter => 6,
            TraceKind::RawModeLeave => 7,
            TraceKind::WriteFailure => 8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TraceRecord {
    pub frame_index: u64,
    pub kind: TraceKind,
    pub ts_ms: u64,
    /// A copy of the drawlist bytes involved, present only for
    /// `DrawlistRejected`/`DrawlistAccepted` records and only while the
    /// ring is enabled (§3 "optional drawlist bytes copy").
    pub drawlist_copy: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Copy)]
pub struct TraceStats {
    pub enabled: bool,
    pub capacity: usize,
    pub len: usize,
}

pub struct DebugTraceRing {
    records: VecDeque<TraceRecord>,
    capacity: usize,
    enabled: bool,
}

impl DebugTraceRing {
    pub fn new(capacity: usize) -> Self {
        Self { records: VecDeque::with_capacity(capacity), capacity, enabled: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enables tracing. Does not clear any records accumulated from a prior
    /// enabled period.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Disables tracing and clears the ring — "disabled means empty" (§3).
    pub fn disable(&mut self) {
        self.enabled = false;
        self.records.clear();
    }

    pub fn reset(&mut self) {
        self.records.clear();
    }

    pub fn push(&mut self, record: TraceRecord) {
        if !self.enabled {
            return;
        }
        if self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn query(&self) -> TraceStats {
        TraceStats { enabled: self.enabled, capacity: self.capacity, len: self.records.len() }
    }

    /// Borrowed drawlist payload for the `index`-th record (oldest first),
    /// if it carries one.
    pub fn get_payload(&self, index: usize) -> Option<&[u8]> {
        self.records.get(index)?.drawlist_copy.as_deref()
    }

    /// Every record, oldest first, serialized as `{frame_index:u64,
    /// kind:u32, ts_ms:u64}` (the variable-length drawlist copy is fetched
    /// separately via `get_payload` rather than inlined, so export stays a
    /// fixed-stride table).
    pub fn export(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.records.len() * 20);
        for r in &self.records {
            out.extend_from_slice(&r.frame_index.to_le_bytes());
            out.extend_from_slice(&r.kind.to_wire().to_le_bytes());
            out.extend_from_slice(&r.ts_ms.to_le_bytes());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(frame_index: u64, kind: TraceKind) -> TraceRecord {
        TraceRecord { frame_index, kind, ts_ms: 0, drawlist_copy: None }
    }

    #[test]
    fn disabled_ring_drops_pushes() {
        let mut ring = DebugTraceRing::new(4);
        ring.push(record(1, TraceKind::FramePresented));
        assert_eq!(ring.query().len, 0);
    }

    #[test]
    fn enabled_ring_retains_up_to_capacity() {
        let mut ring = DebugTraceRing::new(2);
        ring.enable();
        ring.push(record(1, TraceKind::FramePresented));
        ring.push(record(2, TraceKind::FramePresented));
        ring.push(record(3, TraceKind::FramePresented));
        assert_eq!(ring.query().len, 2);
        assert_eq!(ring.export()[0..8], 2u64.to_le_bytes());
    }

    #[test]
    fn disable_clears_ring() {
        let mut ring = DebugTraceRing::new(4);
        ring.enable();
        ring.push(record(1, TraceKind::FramePresented));
        ring.disable();
        assert_eq!(ring.query().len, 0);
        assert!(!ring.is_enabled());
    }
}
