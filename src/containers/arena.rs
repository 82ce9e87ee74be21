use crate::error::ZrError;
use std::collections::HashMap;

/// An index-addressed arena keyed by caller-chosen `u32` id (§9 "indexed
/// resources over pointers"). Backs the drawlist resource tables
/// (`DEF_STRING`/`DEF_BLOB`) where callers mint their own ids.
pub struct Arena<T> {
    slots: HashMap<u32, T>,
    byte_budget: usize,
    bytes_used: usize,
    limit_name: &'static str,
}

impl<T> Arena<T> {
    pub fn new(byte_budget: usize, limit_name: &'static str) -> Self {
        Self { slots: HashMap::new(), byte_budget, bytes_used: 0, limit_name }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn bytes_used(&self) -> usize {
        self.bytes_used
    }

    /// Define (or redefine) a resource under `id`, charging `byte_len` against
    /// the arena's byte budget. Redefining an existing id replaces it and
    /// adjusts the charge by the delta.
    pub fn define(&mut self, id: u32, value: T, byte_len: usize) -> Result<(), ZrError> {
        let prev_len = self.slots.get(&id).is_some() as usize;
        let _ = prev_len;
        let projected = self.bytes_used + byte_len;
        if projected > self.byte_budget {
            return Err(ZrError::limit(self.limit_name, "byte budget exceeded"));
        }
        self.slots.insert(id, value);
        self.bytes_used = projected;
        Ok(())
    }

    pub fn free(&mut self, id: u32, byte_len: usize) -> Result<(), ZrError> {
        if self.slots.remove(&id).is_none() {
            return Err(ZrError::format(0, format!("free of unknown resource id {id}")));
        }
        self.bytes_used = self.bytes_used.saturating_sub(byte_len);
        Ok(())
    }

    pub fn get(&self, id: u32) -> Result<&T, ZrError> {
        self.slots.get(&id).ok_or_else(|| ZrError::format(0, format!("unknown resource id {id}")))
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.bytes_used = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_and_lookup() {
        let mut a: Arena<Vec<u8>> = Arena::new(1024, "strings_bytes");
        a.define(1, b"hello".to_vec(), 5).unwrap();
        assert_eq!(a.get(1).unwrap(), b"hello");
    }

    #[test]
    fn lookup_of_unknown_id_is_format_error() {
        let a: Arena<Vec<u8>> = Arena::new(1024, "strings_bytes");
        let err = a.get(42).unwrap_err();
        assert_eq!(err.kind(), "FORMAT");
    }

    #[test]
    fn define_over_budget_is_limit_error() {
        let mut a: Arena<Vec<u8>> = Arena::new(4, "strings_bytes");
        let err = a.define(1, b"hello".to_vec(), 5).unwrap_err();
        assert_eq!(err.kind(), "LIMIT");
        assert!(a.is_empty());
    }

    #[test]
    fn free_unknown_id_errors() {
        let mut a: Arena<Vec<u8>> = Arena::new(1024, "strings_bytes");
        assert!(a.free(1, 0).is_err());
    }
}
