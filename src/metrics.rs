//! Metrics snapshot (§3 "Metrics snapshot", §4.J `get_metrics`).
//!
//! Monotonic counters plus last-frame diagnostics, copied out through a
//! struct-size-prefixed snapshot: the caller passes a buffer of whatever
//! size it believes the struct to be, and the engine writes the compatible
//! prefix of its own layout — the same forward/backward-compatible shape
//! §4.H uses for event records, applied here to a single fixed struct
//! instead of a variable record stream.

use crate::render::DiffStats;

/// Every field is a plain fixed-width integer in a fixed order so
/// `to_bytes`'s layout is stable across builds — the one deliberate
/// exception to "no teacher equivalent" scattered through this crate: this
/// is new, grounded directly in §3's field list rather than any teacher
/// file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metrics {
    pub frames_presented: u64,
    pub frames_failed: u64,
    pub bytes_emitted_total: u64,
    pub bytes_emitted_last_frame: u32,
    pub dirty_lines_last_frame: u32,
    pub dirty_cells_last_frame: u32,
    pub scroll_opt_attempts: u64,
    pub scroll_opt_hits: u64,
    pub sweep_decision_frames: u64,
    pub damage_decision_frames: u64,
    pub events_posted_total: u64,
    pub events_dropped_total: u64,
}

pub const WIRE_SIZE: usize = 12 * 8; // every field widened to u64 on the wire for a stable, alignment-free layout

impl Metrics {
    /// Roll one frame's diff stats into the running counters. `used_sweep`
    /// records which branch §4.F's adaptive threshold took, purely for
    /// diagnostics.
    pub fn record_frame(&mut self, stats: &DiffStats, used_sweep: bool) {
        self.frames_presented += 1;
        self.bytes_emitted_total += stats.bytes_written as u64;
        self.bytes_emitted_last_frame = stats.bytes_written as u32;
        self.dirty_lines_last_frame = stats.dirty_lines;
        self.dirty_cells_last_frame = stats.dirty_cells;
        if stats.used_scroll_shift {
            self.scroll_opt_hits += 1;
        }
        if used_sweep {
            self.sweep_decision_frames += 1;
        } else {
            self.damage_decision_frames += 1;
        }
    }

    pub fn record_scroll_attempt(&mut self) {
        self.scroll_opt_attempts += 1;
    }

    pub fn record_present_failure(&mut self) {
        self.frames_failed += 1;
    }

    /// Little-endian, one `u64` per field, in declaration order.
    pub fn to_bytes(&self) -> [u8; WIRE_SIZE] {
        let mut out = [0u8; WIRE_SIZE];
        let fields: [u64; WIRE_SIZE / 8] = [
            self.frames_presented,
            self.frames_failed,
            self.bytes_emitted_total,
            self.bytes_emitted_last_frame as u64,
            self.dirty_lines_last_frame as u64,
            self.dirty_cells_last_frame as u64,
            self.scroll_opt_attempts,
            self.scroll_opt_hits,
            self.sweep_decision_frames,
            self.damage_decision_frames,
            self.events_posted_total,
            self.events_dropped_total,
        ];
        for (i, field) in fields.iter().enumerate() {
            out[i * 8..i * 8 + 8].copy_from_slice(&field.to_le_bytes());
        }
        out
    }

    /// Copies `min(out.len(), WIRE_SIZE)` bytes of the current snapshot into
    /// `out` and returns how many bytes were written (§4.J "prefix-copy
    /// semantics using caller-supplied size").
    pub fn copy_prefixed(&self, out: &mut [u8]) -> usize {
        let bytes = self.to_bytes();
        let n = out.len().min(bytes.len());
        out[..n].copy_from_slice(&bytes[..n]);
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undersized_buffer_gets_a_truncated_prefix() {
        let m = Metrics { frames_presented: 7, ..Default::default() };
        let mut out = [0u8; 4];
        let n = m.copy_prefixed(&mut out);
        assert_eq!(n, 4);
        assert_eq!(&out, &7u32.to_le_bytes());
    }

    #[test]
    fn oversized_buffer_only_gets_wire_size_bytes_written() {
        let m = Metrics::default();
        let mut out = [0xAAu8; WIRE_SIZE + 16];
        let n = m.copy_prefixed(&mut out);
        assert_eq!(n, WIRE_SIZE);
        assert_eq!(out[WIRE_SIZE], 0xAA);
    }

    #[test]
    fn record_frame_updates_running_totals() {
        let mut m = Metrics::default();
        let stats = DiffStats { dirty_lines: 2, dirty_cells: 10, bytes_written: 40, truncated: false, used_scroll_shift: true };
        m.record_frame(&stats, true);
        assert_eq!(m.frames_presented, 1);
        assert_eq!(m.bytes_emitted_total, 40);
        assert_eq!(m.scroll_opt_hits, 1);
        assert_eq!(m.sweep_decision_frames, 1);
    }
}
