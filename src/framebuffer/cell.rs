use crate::error::ZrError;
use crate::style::Style;

/// Inline glyph buffer capacity (Open Question decision #2 in DESIGN.md): 16
/// bytes, enough for a base scalar plus combining marks/ZWJ/VS16 in the
/// worst realistic cluster this engine accepts.
pub const GLYPH_CAP: usize = 16;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CellFlags: u8 {
        /// Marks the right half of a wide grapheme (§3).
        const CONTINUATION = 1 << 0;
    }
}

/// A single terminal cell (§3): `{ glyph, glyph_len, style, flags, width }`.
/// `width` is recorded explicitly at construction (1 for blanks and narrow
/// glyphs, 2 for a wide lead, 0 for a continuation cell) rather than derived,
/// since a lead cell in isolation can't recompute the column-width policy
/// that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub glyph: [u8; GLYPH_CAP],
    pub glyph_len: u8,
    pub style: Style,
    pub flags: CellFlags,
    width: u8,
}

impl Default for Cell {
    fn default() -> Self {
        Cell { glyph: [0; GLYPH_CAP], glyph_len: 0, style: Style::default(), flags: CellFlags::empty(), width: 1 }
    }
}

impl Cell {
    pub fn blank(style: Style) -> Self {
        Cell { glyph: [0; GLYPH_CAP], glyph_len: 0, style, flags: CellFlags::empty(), width: 1 }
    }

    /// Build a lead cell from grapheme bytes and its already-computed column
    /// width (1 or 2). Errors (format) if the glyph exceeds `GLYPH_CAP`
    /// rather than silently truncating, preserving atomicity per the Open
    /// Question decision in DESIGN.md.
    pub fn lead(glyph: &[u8], style: Style, width: u8) -> Result<Self, ZrError> {
        if glyph.len() > GLYPH_CAP {
            return Err(ZrError::format(0, format!("grapheme of {} bytes exceeds cell capacity {GLYPH_CAP}", glyph.len())));
        }
        let mut buf = [0u8; GLYPH_CAP];
        buf[..glyph.len()].copy_from_slice(glyph);
        Ok(Cell { glyph: buf, glyph_len: glyph.len() as u8, style, flags: CellFlags::empty(), width })
    }

    pub fn continuation(style: Style) -> Self {
        Cell { glyph: [0; GLYPH_CAP], glyph_len: 0, style, flags: CellFlags::CONTINUATION, width: 0 }
    }

    pub fn glyph_str(&self) -> &str {
        // Safety net: glyph bytes only ever come from validated UTF-8
        // grapheme slices, but fall back to empty rather than panicking.
        std::str::from_utf8(&self.glyph[..self.glyph_len as usize]).unwrap_or("")
    }

    /// Cell width: 0 for a continuation cell, otherwise the width recorded
    /// when the cell was written (1 or 2).
    pub fn width(&self) -> u8 {
        if self.flags.contains(CellFlags::CONTINUATION) {
            0
        } else {
            self.width
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lead_rejects_oversize_glyph() {
        let over = vec![b'a'; GLYPH_CAP + 1];
        let err = Cell::lead(&over, Style::default(), 1).unwrap_err();
        assert_eq!(err.kind(), "FORMAT");
    }

    #[test]
    fn glyph_str_round_trips() {
        let cell = Cell::lead("中".as_bytes(), Style::default(), 2).unwrap();
        assert_eq!(cell.glyph_str(), "中");
        assert_eq!(cell.width(), 2);
    }
}
