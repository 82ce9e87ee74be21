//! 64-byte drawlist header (§4.D, §6.2), grounded in
//! `rust/src/shared_buffer.rs`'s fixed-offset-table header parsing (magic +
//! version + size fields, then a run of section offset/length pairs) —
//! generalized from that file's single section table to the drawlist's
//! command stream plus string/blob span tables.

use crate::bytes::{align4, is_aligned4, ByteReader};
use crate::error::ZrError;

pub const MAGIC: u32 = 0x4C44_525A; // "ZRDL" little-endian
pub const HEADER_SIZE: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawlistHeader {
    pub version: u32,
    pub total_size: u32,
    pub cmd_offset: u32,
    pub cmd_bytes: u32,
    pub cmd_count: u32,
    pub strings_span_offset: u32,
    pub strings_count: u32,
    pub strings_bytes_offset: u32,
    pub strings_bytes_len: u32,
    pub blobs_span_offset: u32,
    pub blobs_count: u32,
    pub blobs_bytes_offset: u32,
    pub blobs_bytes_len: u32,
}

impl DrawlistHeader {
    /// Parses and structurally validates the 64-byte header: magic,
    /// `header_size`, and that every section's offset/length fits within
    /// `total_size` on a 4-byte-aligned boundary (§4.D validation contract).
    pub fn parse(bytes: &[u8]) -> Result<Self, ZrError> {
        let mut r = ByteReader::new(bytes);

        let magic = r.read_u32()?;
        if magic != MAGIC {
            return Err(ZrError::format(0, format!("bad magic 0x{magic:08X}")));
        }
        let version = r.read_u32()?;
        if version != 1 && version != 2 {
            return Err(ZrError::format(4, format!("unsupported drawlist version {version}")));
        }
        let header_size = r.read_u32()?;
        if header_size != HEADER_SIZE {
            return Err(ZrError::format(8, format!("header_size {header_size} != {HEADER_SIZE}")));
        }
        let total_size = r.read_u32()?;
        if (total_size as usize) > bytes.len() {
            return Err(ZrError::format(12, "total_size exceeds buffer length"));
        }

        let cmd_offset = r.read_u32()?;
        let cmd_bytes = r.read_u32()?;
        let cmd_count = r.read_u32()?;
        let strings_span_offset = r.read_u32()?;
        let strings_count = r.read_u32()?;
        let strings_bytes_offset = r.read_u32()?;
        let strings_bytes_len = r.read_u32()?;
        let blobs_span_offset = r.read_u32()?;
        let blobs_count = r.read_u32()?;
        let blobs_bytes_offset = r.read_u32()?;
        let blobs_bytes_len = r.read_u32()?;
        let reserved0 = r.read_u32()?;
        if reserved0 != 0 {
            return Err(ZrError::format(60, "reserved0 must be zero"));
        }

        let header = DrawlistHeader {
            version,
            total_size,
            cmd_offset,
            cmd_bytes,
            cmd_count,
            strings_span_offset,
            strings_count,
            strings_bytes_offset,
            strings_bytes_len,
            blobs_span_offset,
            blobs_count,
            blobs_bytes_offset,
            blobs_bytes_len,
        };
        header.check_sections()?;
        Ok(header)
    }

    fn check_sections(&self) -> Result<(), ZrError> {
        let sections: [(&str, u32, u32); 5] = [
            ("cmd", self.cmd_offset, self.cmd_bytes),
            ("strings_span", self.strings_span_offset, self.strings_count.saturating_mul(8)),
            ("strings_bytes", self.strings_bytes_offset, self.strings_bytes_len),
            ("blobs_span", self.blobs_span_offset, self.blobs_count.saturating_mul(8)),
            ("blobs_bytes", self.blobs_bytes_offset, self.blobs_bytes_len),
        ];
        for (name, offset, len) in sections {
            if len == 0 {
                continue;
            }
            if !is_aligned4(offset) {
                return Err(ZrError::format(offset as usize, format!("{name} section not 4-byte aligned")));
            }
            let end = offset.checked_add(len).ok_or_else(|| ZrError::format(offset as usize, format!("{name} section overflows")))?;
            if end > self.total_size {
                return Err(ZrError::format(offset as usize, format!("{name} section exceeds total_size")));
            }
            if align4(len) != len {
                return Err(ZrError::format(offset as usize, format!("{name} section length not 4-byte aligned")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_header_bytes(version: u32, total_size: u32) -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_SIZE as usize];
        buf[0..4].copy_from_slice(&MAGIC.to_le_bytes());
        buf[4..8].copy_from_slice(&version.to_le_bytes());
        buf[8..12].copy_from_slice(&HEADER_SIZE.to_le_bytes());
        buf[12..16].copy_from_slice(&total_size.to_le_bytes());
        buf
    }

    #[test]
    fn parses_minimal_header() {
        let buf = minimal_header_bytes(1, HEADER_SIZE);
        let h = DrawlistHeader::parse(&buf).unwrap();
        assert_eq!(h.version, 1);
        assert_eq!(h.total_size, HEADER_SIZE);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buf = minimal_header_bytes(1, HEADER_SIZE);
        buf[0] = 0;
        let err = DrawlistHeader::parse(&buf).unwrap_err();
        assert_eq!(err.kind(), "FORMAT");
    }

    #[test]
    fn rejects_total_size_past_buffer() {
        let buf = minimal_header_bytes(1, HEADER_SIZE + 100);
        let err = DrawlistHeader::parse(&buf).unwrap_err();
        assert_eq!(err.kind(), "FORMAT");
    }

    #[test]
    fn rejects_unaligned_cmd_section() {
        let mut buf = minimal_header_bytes(1, HEADER_SIZE + 16);
        buf.extend(std::iter::repeat(0u8).take(16));
        buf[16..20].copy_from_slice(&2u32.to_le_bytes()); // cmd_offset = 2, misaligned
        buf[20..24].copy_from_slice(&8u32.to_le_bytes());
        let err = DrawlistHeader::parse(&buf).unwrap_err();
        assert_eq!(err.kind(), "FORMAT");
    }
}
