//! Engine-owned resource tables (§3 "Resource tables (drawlist v1)"):
//! `DEF_STRING`/`FREE_STRING`/`DEF_BLOB`/`FREE_BLOB` persist byte buffers
//! keyed by caller-chosen `u32` ids across drawlist submissions, as an
//! alternative to inline span tables. Built on `containers::Arena` per the
//! design note "indexed resources over pointers".

use crate::containers::Arena;
use crate::error::ZrError;

pub struct ResourceTables {
    strings: Arena<Vec<u8>>,
    blobs: Arena<Vec<u8>>,
}

impl ResourceTables {
    pub fn new(strings_byte_budget: usize, blobs_byte_budget: usize) -> Self {
        Self {
            strings: Arena::new(strings_byte_budget, "resource_strings_bytes"),
            blobs: Arena::new(blobs_byte_budget, "resource_blobs_bytes"),
        }
    }

    pub fn def_string(&mut self, id: u32, bytes: Vec<u8>) -> Result<(), ZrError> {
        let len = bytes.len();
        self.strings.define(id, bytes, len)
    }

    pub fn free_string(&mut self, id: u32) -> Result<(), ZrError> {
        let len = self.strings.get(id)?.len();
        self.strings.free(id, len)
    }

    pub fn string(&self, id: u32) -> Result<&[u8], ZrError> {
        self.strings.get(id).map(Vec::as_slice)
    }

    pub fn def_blob(&mut self, id: u32, bytes: Vec<u8>) -> Result<(), ZrError> {
        let len = bytes.len();
        self.blobs.define(id, bytes, len)
    }

    pub fn free_blob(&mut self, id: u32) -> Result<(), ZrError> {
        let len = self.blobs.get(id)?.len();
        self.blobs.free(id, len)
    }

    pub fn blob(&self, id: u32) -> Result<&[u8], ZrError> {
        self.blobs.get(id).map(Vec::as_slice)
    }

    pub fn clear(&mut self) {
        self.strings.clear();
        self.blobs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_then_lookup_string() {
        let mut r = ResourceTables::new(1024, 1024);
        r.def_string(7, b"hello".to_vec()).unwrap();
        assert_eq!(r.string(7).unwrap(), b"hello");
    }

    #[test]
    fn free_then_lookup_is_format_error() {
        let mut r = ResourceTables::new(1024, 1024);
        r.def_blob(3, vec![1, 2, 3]).unwrap();
        r.free_blob(3).unwrap();
        let err = r.blob(3).unwrap_err();
        assert_eq!(err.kind(), "FORMAT");
    }

    #[test]
    fn free_unknown_id_errors() {
        let mut r = ResourceTables::new(1024, 1024);
        assert!(r.free_string(99).is_err());
    }
}
