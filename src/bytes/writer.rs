/// A bounded writer: `{buf, cap, len, truncated}`.
///
/// Appends only if the full requested range fits. A failed append sets
/// `truncated` and leaves `len` unchanged — this is what lets the diff
/// emitter (§4.F) and the event batch serializer (§4.H) guarantee "no
/// partial effects" without a stream-writer abstraction.
pub struct BoundedWriter {
    buf: Vec<u8>,
    cap: usize,
    truncated: bool,
}

impl BoundedWriter {
    pub fn with_capacity(cap: usize) -> Self {
        Self { buf: Vec::with_capacity(cap.min(1 << 20)), cap, truncated: false }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.truncated = false;
    }

    /// Append `bytes` only if it fits within `cap`. Returns `true` on success.
    /// On failure sets `truncated` and leaves the buffer exactly as it was.
    #[must_use]
    pub fn write(&mut self, bytes: &[u8]) -> bool {
        if self.buf.len() + bytes.len() > self.cap {
            self.truncated = true;
            return false;
        }
        self.buf.extend_from_slice(bytes);
        true
    }

    #[must_use]
    pub fn write_str(&mut self, s: &str) -> bool {
        self.write(s.as_bytes())
    }

    #[must_use]
    pub fn write_u8(&mut self, b: u8) -> bool {
        self.write(&[b])
    }

    /// Splices `bytes` into the buffer at `pos`, shifting everything from
    /// `pos` onward to the right. Used to wrap already-written content
    /// (e.g. the diff emitter's sync-update prefix) once the caller knows
    /// whether that content turned out to be non-empty. Same no-partial-
    /// effect contract as `write`: fails and leaves the buffer untouched if
    /// the result would exceed `cap`.
    #[must_use]
    pub fn insert_at(&mut self, pos: usize, bytes: &[u8]) -> bool {
        if self.buf.len() + bytes.len() > self.cap {
            self.truncated = true;
            return false;
        }
        self.buf.splice(pos..pos, bytes.iter().copied());
        true
    }

    /// Pad with zero bytes up to the next multiple of 4, used for record
    /// framing in §4.D/§4.H. Fails (and truncates) the same way `write` does.
    #[must_use]
    pub fn pad_to_align4(&mut self) -> bool {
        let rem = self.buf.len() % 4;
        if rem == 0 {
            return true;
        }
        let pad = 4 - rem;
        self.write(&[0u8; 4][..pad])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_within_capacity_succeed() {
        let mut w = BoundedWriter::with_capacity(8);
        assert!(w.write(b"abcd"));
        assert!(w.write(b"efgh"));
        assert_eq!(w.len(), 8);
        assert!(!w.truncated());
    }

    #[test]
    fn overflow_truncates_without_partial_write() {
        let mut w = BoundedWriter::with_capacity(4);
        assert!(w.write(b"abcd"));
        assert!(!w.write(b"e"));
        assert!(w.truncated());
        assert_eq!(w.as_bytes(), b"abcd", "no partial bytes from the failed append");
    }

    #[test]
    fn insert_at_shifts_tail_right() {
        let mut w = BoundedWriter::with_capacity(16);
        assert!(w.write(b"BD"));
        assert!(w.insert_at(1, b"C"));
        assert_eq!(w.as_bytes(), b"BCD");
    }

    #[test]
    fn insert_at_over_capacity_truncates_without_mutating() {
        let mut w = BoundedWriter::with_capacity(4);
        assert!(w.write(b"abcd"));
        assert!(!w.insert_at(2, b"e"));
        assert!(w.truncated());
        assert_eq!(w.as_bytes(), b"abcd");
    }

    #[test]
    fn pad_to_align4_rounds_up() {
        let mut w = BoundedWriter::with_capacity(16);
        assert!(w.write(b"abc"));
        assert!(w.pad_to_align4());
        assert_eq!(w.len(), 4);
    }
}
