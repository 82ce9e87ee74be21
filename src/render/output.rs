//! Single-flush bounded output buffer (§4.F, §4.J `present`).
//!
//! Grounded in `src/renderer/output.rs`'s `OutputBuffer`, narrowed to a thin
//! wrapper over `BoundedWriter` so a frame that would exceed
//! `out_max_bytes_per_frame` truncates deterministically instead of the
//! teacher's unbounded `Vec`-backed accumulator.

use crate::bytes::BoundedWriter;

#[derive(Debug)]
pub struct OutputBuffer {
    writer: BoundedWriter,
}

impl OutputBuffer {
    pub fn new(max_bytes: usize) -> Self {
        Self { writer: BoundedWriter::with_capacity(max_bytes) }
    }

    pub fn writer_mut(&mut self) -> &mut BoundedWriter {
        &mut self.writer
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.writer.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.writer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writer.is_empty()
    }

    pub fn truncated(&self) -> bool {
        self.writer.truncated()
    }

    /// Clears the accumulated bytes. `present` calls this on every frame,
    /// successful or not — output never carries across frames (§4.J).
    pub fn clear(&mut self) {
        self.writer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_sets_truncated_and_keeps_prior_bytes() {
        let mut out = OutputBuffer::new(4);
        assert!(out.writer_mut().write(b"abcd"));
        assert!(!out.writer_mut().write(b"e"));
        assert!(out.truncated());
        assert_eq!(out.as_bytes(), b"abcd");
    }

    #[test]
    fn clear_resets_truncated_flag() {
        let mut out = OutputBuffer::new(2);
        out.writer_mut().write(b"ab");
        out.writer_mut().write(b"c");
        assert!(out.truncated());
        out.clear();
        assert!(out.is_empty());
        assert!(!out.truncated());
    }
}
