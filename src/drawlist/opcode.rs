//! Drawlist opcodes and their fixed-size payload structs (§4.D, §6.2, design
//! note "tagged unions for drawlist and events"). Grounded in
//! `rust/src/input/events.rs`'s `#[repr(u8)] enum EventType` shape: read the
//! wire tag, then pattern-match to a fixed-size payload rather than indexing
//! raw integers through the rest of the pipeline.

use crate::bytes::ByteReader;
use crate::error::ZrError;
use crate::style::{Rgb, Style, StyleAttrs};

/// Reserved 12-byte extension block appended to the v2 variant of
/// `FILL_RECT`/`DRAW_TEXT` (decision: DESIGN.md "drawlist v2 payload
/// extension"). Must be all zero; the executor ignores it but validation
/// rejects nonzero reserved bytes per §4.D ("reserved fields zero").
const V2_EXT_SIZE: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Clear,
    FillRect,
    DrawText,
    PushClip,
    PopClip,
    DrawTextRun,
    SetCursor,
    DefString,
    FreeString,
    DefBlob,
    FreeBlob,
}

impl Opcode {
    pub fn from_wire(raw: u16) -> Option<Self> {
        Some(match raw {
            1 => Opcode::Clear,
            2 => Opcode::FillRect,
            3 => Opcode::DrawText,
            4 => Opcode::PushClip,
            5 => Opcode::PopClip,
            6 => Opcode::DrawTextRun,
            7 => Opcode::SetCursor,
            8 => Opcode::DefString,
            9 => Opcode::FreeString,
            10 => Opcode::DefBlob,
            11 => Opcode::FreeBlob,
            _ => return None,
        })
    }

    /// Exact payload sizes in bytes, not counting the 8-byte command header.
    /// `CLEAR`/`POP_CLIP` take no payload; `FILL_RECT`/`DRAW_TEXT` accept
    /// either their v1 size or v1 size + `V2_EXT_SIZE`.
    pub fn valid_payload_len(self, len: usize) -> bool {
        match self {
            Opcode::Clear | Opcode::PopClip => len == 0,
            Opcode::FillRect => len == 32 || len == 32 + V2_EXT_SIZE,
            Opcode::DrawText => len == 40 || len == 40 + V2_EXT_SIZE,
            Opcode::PushClip => len == 16,
            Opcode::DrawTextRun => len == 16,
            Opcode::SetCursor => len == 12,
            Opcode::DefString | Opcode::DefBlob => len == 12,
            Opcode::FreeString | Opcode::FreeBlob => len == 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandHeader {
    pub opcode: u16,
    pub flags: u16,
    pub size: u32,
}

impl CommandHeader {
    pub const WIRE_SIZE: usize = 8;

    pub fn parse(r: &mut ByteReader<'_>) -> Result<Self, ZrError> {
        let opcode = r.read_u16()?;
        let flags = r.read_u16()?;
        let size = r.read_u32()?;
        Ok(CommandHeader { opcode, flags, size })
    }
}

fn style_from_wire(r: &mut ByteReader<'_>) -> Result<Style, ZrError> {
    let fg = r.read_u32()?;
    let bg = r.read_u32()?;
    let attrs_raw = r.read_u32()?;
    let reserved0 = r.read_u32()?;
    if reserved0 != 0 {
        return Err(ZrError::format(r.offset(), "style reserved0 must be zero"));
    }
    if StyleAttrs::has_reserved_bits(attrs_raw) {
        return Err(ZrError::format(r.offset(), "style attrs has reserved bits set"));
    }
    Ok(Style { fg: Rgb(fg), bg: Rgb(bg), attrs: StyleAttrs::from_bits_truncate(attrs_raw) })
}

fn expect_zero_tail(r: &mut ByteReader<'_>, n: usize) -> Result<(), ZrError> {
    if n == 0 {
        return Ok(());
    }
    let tail = r.read_slice(n)?;
    if tail.iter().any(|&b| b != 0) {
        return Err(ZrError::format(r.offset(), "reserved extension bytes must be zero"));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub off: u32,
    pub len: u32,
}

impl Span {
    pub fn parse(r: &mut ByteReader<'_>) -> Result<Self, ZrError> {
        let off = r.read_u32()?;
        let len = r.read_u32()?;
        Ok(Span { off, len })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillRectPayload {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    pub style: Style,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawTextPayload {
    pub x: i32,
    pub y: i32,
    pub string: Span,
    pub style: Style,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushClipPayload {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawTextRunPayload {
    pub x: i32,
    pub y: i32,
    pub blob: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetCursorPayload {
    pub x: Option<u16>,
    pub y: Option<u16>,
    pub shape: u8,
    pub visible: bool,
    pub blink: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefResourcePayload {
    pub id: u32,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeResourcePayload {
    pub id: u32,
}

/// A structurally-validated command plus its decoded payload, ready for the
/// executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Clear,
    FillRect(FillRectPayload),
    DrawText(DrawTextPayload),
    PushClip(PushClipPayload),
    PopClip,
    DrawTextRun(DrawTextRunPayload),
    SetCursor(SetCursorPayload),
    DefString(DefResourcePayload),
    FreeString(FreeResourcePayload),
    DefBlob(DefResourcePayload),
    FreeBlob(FreeResourcePayload),
}

impl Command {
    /// Decodes the payload bytes for `opcode` (already size-checked by the
    /// caller against `Opcode::valid_payload_len`).
    pub fn decode(opcode: Opcode, payload: &[u8]) -> Result<Self, ZrError> {
        let mut r = ByteReader::new(payload);
        let cmd = match opcode {
            Opcode::Clear => Command::Clear,
            Opcode::PopClip => Command::PopClip,
            Opcode::FillRect => {
                let x = r.read_i32()?;
                let y = r.read_i32()?;
                let w = r.read_i32()?;
                let h = r.read_i32()?;
                let style = style_from_wire(&mut r)?;
                expect_zero_tail(&mut r, payload.len() - 32)?;
                Command::FillRect(FillRectPayload { x, y, w, h, style })
            }
            Opcode::DrawText => {
                let x = r.read_i32()?;
                let y = r.read_i32()?;
                let string = Span::parse(&mut r)?;
                let style = style_from_wire(&mut r)?;
                expect_zero_tail(&mut r, payload.len() - 40)?;
                Command::DrawText(DrawTextPayload { x, y, string, style })
            }
            Opcode::PushClip => {
                let x = r.read_i32()?;
                let y = r.read_i32()?;
                let w = r.read_i32()?;
                let h = r.read_i32()?;
                Command::PushClip(PushClipPayload { x, y, w, h })
            }
            Opcode::DrawTextRun => {
                let x = r.read_i32()?;
                let y = r.read_i32()?;
                let blob = Span::parse(&mut r)?;
                Command::DrawTextRun(DrawTextRunPayload { x, y, blob })
            }
            Opcode::SetCursor => {
                let raw_x = r.read_i32()?;
                let raw_y = r.read_i32()?;
                let shape = r.read_u8()?;
                let visible = r.read_u8()?;
                let blink = r.read_u8()?;
                let reserved = r.read_u8()?;
                if reserved != 0 {
                    return Err(ZrError::format(r.offset(), "SET_CURSOR reserved byte must be zero"));
                }
                if shape > 2 {
                    return Err(ZrError::format(r.offset(), format!("unknown cursor shape {shape}")));
                }
                if visible > 1 || blink > 1 {
                    return Err(ZrError::format(r.offset(), "SET_CURSOR bool field out of range"));
                }
                Command::SetCursor(SetCursorPayload {
                    x: if raw_x == -1 { None } else { Some(raw_x as u16) },
                    y: if raw_y == -1 { None } else { Some(raw_y as u16) },
                    shape,
                    visible: visible != 0,
                    blink: blink != 0,
                })
            }
            Opcode::DefString => {
                let id = r.read_u32()?;
                let span = Span::parse(&mut r)?;
                Command::DefString(DefResourcePayload { id, span })
            }
            Opcode::DefBlob => {
                let id = r.read_u32()?;
                let span = Span::parse(&mut r)?;
                Command::DefBlob(DefResourcePayload { id, span })
            }
            Opcode::FreeString => {
                let id = r.read_u32()?;
                let reserved = r.read_u32()?;
                if reserved != 0 {
                    return Err(ZrError::format(r.offset(), "FREE_STRING reserved must be zero"));
                }
                Command::FreeString(FreeResourcePayload { id })
            }
            Opcode::FreeBlob => {
                let id = r.read_u32()?;
                let reserved = r.read_u32()?;
                if reserved != 0 {
                    return Err(ZrError::format(r.offset(), "FREE_BLOB reserved must be zero"));
                }
                Command::FreeBlob(FreeResourcePayload { id })
            }
        };
        Ok(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_round_trips_known_values() {
        for raw in 1u16..=11 {
            assert!(Opcode::from_wire(raw).is_some());
        }
        assert!(Opcode::from_wire(65535).is_none());
        assert!(Opcode::from_wire(0).is_none());
    }

    #[test]
    fn clear_and_pop_clip_take_no_payload() {
        assert!(Opcode::Clear.valid_payload_len(0));
        assert!(!Opcode::Clear.valid_payload_len(1));
        assert!(Opcode::PopClip.valid_payload_len(0));
    }

    #[test]
    fn set_cursor_maps_negative_one_to_unchanged() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&(-1i32).to_le_bytes());
        payload.extend_from_slice(&5i32.to_le_bytes());
        payload.extend_from_slice(&[1u8, 1, 0, 0]); // shape=underline, visible=1, blink=0, reserved=0
        let cmd = Command::decode(Opcode::SetCursor, &payload).unwrap();
        match cmd {
            Command::SetCursor(p) => {
                assert_eq!(p.x, None);
                assert_eq!(p.y, Some(5));
                assert_eq!(p.shape, 1);
                assert!(p.visible);
                assert!(!p.blink);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn set_cursor_rejects_nonzero_reserved() {
        let mut payload = vec![0u8; 12];
        payload[11] = 1;
        let err = Command::decode(Opcode::SetCursor, &payload).unwrap_err();
        assert_eq!(err.kind(), "FORMAT");
    }

    #[test]
    fn fill_rect_rejects_reserved_style_bits() {
        let mut payload = vec![0u8; 32];
        payload[16..20].copy_from_slice(&0u32.to_le_bytes()); // fg
        payload[20..24].copy_from_slice(&0u32.to_le_bytes()); // bg
        payload[24..28].copy_from_slice(&(1u32 << 6).to_le_bytes()); // attrs reserved bit
        let err = Command::decode(Opcode::FillRect, &payload).unwrap_err();
        assert_eq!(err.kind(), "FORMAT");
    }

    #[test]
    fn fill_rect_v2_accepts_zeroed_extension() {
        let payload = vec![0u8; 32 + V2_EXT_SIZE];
        let cmd = Command::decode(Opcode::FillRect, &payload).unwrap();
        assert!(matches!(cmd, Command::FillRect(_)));
    }

    #[test]
    fn fill_rect_v2_rejects_nonzero_extension() {
        let mut payload = vec![0u8; 32 + V2_EXT_SIZE];
        *payload.last_mut().unwrap() = 1;
        let err = Command::decode(Opcode::FillRect, &payload).unwrap_err();
        assert_eq!(err.kind(), "FORMAT");
    }
}
