//! Drawlist execution (§4.D "Execution"): walk a `ValidatedDrawlist`'s
//! commands against a staging framebuffer/clip-stack/resource-table set.
//! The caller only swaps staging into `next` once `execute` returns `Ok` —
//! any failure here must leave `next` untouched (§4.D "atomic frame").
//!
//! Grounded in `rust/src/layout/solve.rs`'s "walk a flat instruction list,
//! mutate one target structure, bail without partial effect on error" shape,
//! generalized from layout boxes to drawlist opcodes.

use crate::bytes::ByteReader;
use crate::error::ZrError;
use crate::framebuffer::{ClipRect, ClipStack, CursorShape, FrameBuffer};
use crate::style::{Rgb, Style, StyleAttrs};
use crate::unicode::{decode_lossy, iter_graphemes, cluster_width, WidthPolicy};

use super::opcode::{Command, Span};
use super::resources::ResourceTables;
use super::validate::{ValidatedDrawlist, SPAN_RESOURCE_SENTINEL};

/// Executes every command in `validated` against `staging`, `clip`, and
/// `resources` in place. `strings_pool`/`blobs_pool` are the drawlist's own
/// inline byte pools (sliced by the caller from the header's offsets);
/// resource-id-addressed spans (`off == SPAN_RESOURCE_SENTINEL`) look up
/// `resources` instead.
pub fn execute(
    validated: &ValidatedDrawlist,
    strings_pool: &[u8],
    blobs_pool: &[u8],
    resources: &mut ResourceTables,
    staging: &mut FrameBuffer,
    clip: &mut ClipStack,
    emoji_width: WidthPolicy,
) -> Result<(), ZrError> {
    let mut pending_cursor: Option<(Option<u16>, Option<u16>, CursorShape, bool, bool)> = None;

    for command in &validated.commands {
        match command {
            Command::Clear => {
                staging.clear(Style::default());
                clip.reset();
            }
            Command::FillRect(p) => {
                fill_rect(staging, clip, p.x, p.y, p.w, p.h, p.style);
            }
            Command::DrawText(p) => {
                let text = resolve_span(p.string, strings_pool, resources, true)?;
                // §4.C's locked invalid-sequence policy applies here too:
                // an invalid byte becomes U+FFFD and the rest of the string
                // still renders, rather than failing the whole command.
                let text = decode_lossy(text);
                draw_run(staging, clip, p.x, p.y, &[(p.style, &text)], emoji_width);
            }
            Command::PushClip(p) => {
                clip.push(ClipRect::new(clamp_u16(p.x), clamp_u16(p.y), clamp_u16(p.w), clamp_u16(p.h)));
            }
            Command::PopClip => clip.pop(),
            Command::DrawTextRun(p) => {
                let blob = resolve_span(p.blob, blobs_pool, resources, false)?;
                let segments = decode_text_run_segments(blob)?;
                let borrowed: Vec<(Style, &str)> = segments.iter().map(|(s, t)| (*s, t.as_str())).collect();
                draw_run(staging, clip, p.x, p.y, &borrowed, emoji_width);
            }
            Command::SetCursor(p) => {
                let shape = CursorShape::from_wire(p.shape).ok_or_else(|| ZrError::format(0, "unknown cursor shape"))?;
                pending_cursor = Some((p.x, p.y, shape, p.visible, p.blink));
            }
            Command::DefString(p) => {
                let bytes = inline_span(p.span, strings_pool)?.to_vec();
                resources.def_string(p.id, bytes)?;
            }
            Command::FreeString(p) => resources.free_string(p.id)?,
            Command::DefBlob(p) => {
                let bytes = inline_span(p.span, blobs_pool)?.to_vec();
                resources.def_blob(p.id, bytes)?;
            }
            Command::FreeBlob(p) => resources.free_blob(p.id)?,
        }
    }

    if let Some((x, y, shape, visible, blink)) = pending_cursor {
        staging.cursor.apply_set_cursor(x, y, shape, visible, blink);
    }

    Ok(())
}

fn clamp_u16(v: i32) -> u16 {
    v.clamp(0, u16::MAX as i32) as u16
}

fn fill_rect(fb: &mut FrameBuffer, clip: &ClipStack, x: i32, y: i32, w: i32, h: i32, style: Style) {
    if w <= 0 || h <= 0 {
        return;
    }
    let effective = clip.current();
    for row in y..y.saturating_add(h) {
        if row < 0 || row >= fb.rows() as i32 {
            continue;
        }
        for col in x..x.saturating_add(w) {
            if col < 0 || col >= fb.cols() as i32 {
                continue;
            }
            if !effective.contains(col as u16, row as u16) {
                continue;
            }
            fb.write_blank(col as u16, row as u16, style);
        }
    }
}

/// Resolves a drawlist span to a byte slice: either the inline pool at
/// `[off, off+len)`, or — when `off == SPAN_RESOURCE_SENTINEL` — an
/// engine-owned resource keyed by `len` (the id, per DESIGN.md's
/// resource-id span addressing). A missing resource id is a format error
/// (§4.D: "a DRAW_* referencing a missing id is a format error").
fn resolve_span<'a>(span: Span, pool: &'a [u8], resources: &'a ResourceTables, is_string: bool) -> Result<&'a [u8], ZrError> {
    if span.off == SPAN_RESOURCE_SENTINEL {
        let id = span.len;
        return if is_string { resources.string(id) } else { resources.blob(id) };
    }
    inline_span(span, pool)
}

fn inline_span(span: Span, pool: &[u8]) -> Result<&[u8], ZrError> {
    let start = span.off as usize;
    let end = start.checked_add(span.len as usize).ok_or_else(|| ZrError::format(start, "span overflow"))?;
    pool.get(start..end).ok_or_else(|| ZrError::format(start, "span exceeds byte pool"))
}

/// `DRAW_TEXT_RUN` blobs hold a sequence of self-framed segments: 16-byte
/// style `{fg,bg,attrs,reserved0=0}`, then `text_len:u32`, then `text_len`
/// UTF-8 bytes padded to the next 4-byte boundary. Each segment's slice
/// bounds are checked as it's read (§4.D "per-segment slice bounds").
fn decode_text_run_segments(blob: &[u8]) -> Result<Vec<(Style, String)>, ZrError> {
    let mut r = ByteReader::new(blob);
    let mut segments = Vec::new();

    while r.remaining() > 0 {
        let fg = r.read_u32()?;
        let bg = r.read_u32()?;
        let attrs_raw = r.read_u32()?;
        let reserved0 = r.read_u32()?;
        if reserved0 != 0 {
            return Err(ZrError::format(r.offset(), "text run segment reserved0 must be zero"));
        }
        if StyleAttrs::has_reserved_bits(attrs_raw) {
            return Err(ZrError::format(r.offset(), "text run segment attrs has reserved bits set"));
        }
        let style = Style { fg: Rgb(fg), bg: Rgb(bg), attrs: StyleAttrs::from_bits_truncate(attrs_raw) };

        let text_len = r.read_u32()? as usize;
        let text_bytes = r.read_slice(text_len)?;
        // Same locked replacement policy as `DRAW_TEXT` (§4.C) — an invalid
        // byte becomes U+FFFD rather than rejecting the whole segment.
        let text = decode_lossy(text_bytes);

        let pad = (4 - (text_len % 4)) % 4;
        if pad > 0 {
            r.read_slice(pad)?;
        }

        segments.push((style, text));
    }

    Ok(segments)
}

/// Writes consecutive `(style, text)` segments starting at `(x, y)`,
/// advancing `x` by each grapheme's column width and skipping cells outside
/// the current clip (while still consuming the width, per §4.D).
fn draw_run(fb: &mut FrameBuffer, clip: &ClipStack, x: i32, y: i32, segments: &[(Style, &str)], emoji_width: WidthPolicy) {
    if y < 0 || y >= fb.rows() as i32 {
        return;
    }
    let effective = clip.current();
    let mut cursor_x = x;

    for (style, text) in segments {
        for grapheme in iter_graphemes(text) {
            let width = cluster_width(&grapheme, emoji_width);
            if width == 0 {
                continue;
            }
            let in_bounds = cursor_x >= 0 && (cursor_x as i64 + width as i64) <= fb.cols() as i64 && cursor_x < fb.cols() as i32;
            if in_bounds && effective.contains(cursor_x as u16, y as u16) {
                let _ = fb.write_glyph(cursor_x as u16, y as u16, grapheme.text.as_bytes(), width, *style);
            }
            cursor_x += width as i32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawlist::header::DrawlistHeader;
    use crate::drawlist::validate::validate;
    use crate::config::DrawlistLimits;

    fn encode_minimal_drawlist(commands: &[(u16, Vec<u8>)], strings: &[u8]) -> Vec<u8> {
        const HEADER_SIZE: u32 = 64;
        let mut cmd_bytes = Vec::new();
        for (opcode, payload) in commands {
            cmd_bytes.extend_from_slice(&opcode.to_le_bytes());
            cmd_bytes.extend_from_slice(&0u16.to_le_bytes());
            cmd_bytes.extend_from_slice(&((8 + payload.len()) as u32).to_le_bytes());
            cmd_bytes.extend_from_slice(payload);
        }
        let strings_padded_len = (strings.len() + 3) / 4 * 4;
        let cmd_offset = HEADER_SIZE;
        let strings_bytes_offset = cmd_offset + cmd_bytes.len() as u32;
        let total_size = strings_bytes_offset + strings_padded_len as u32;

        let mut buf = vec![0u8; total_size as usize];
        buf[0..4].copy_from_slice(&0x4C44_525Au32.to_le_bytes());
        buf[4..8].copy_from_slice(&1u32.to_le_bytes());
        buf[8..12].copy_from_slice(&HEADER_SIZE.to_le_bytes());
        buf[12..16].copy_from_slice(&total_size.to_le_bytes());
        buf[16..20].copy_from_slice(&cmd_offset.to_le_bytes());
        buf[20..24].copy_from_slice(&(cmd_bytes.len() as u32).to_le_bytes());
        buf[24..28].copy_from_slice(&(commands.len() as u32).to_le_bytes());
        // strings_span_offset/count left zero (no span table, inline pool only)
        buf[36..40].copy_from_slice(&strings_bytes_offset.to_le_bytes());
        buf[40..44].copy_from_slice(&(strings_padded_len as u32).to_le_bytes());
        buf[cmd_offset as usize..strings_bytes_offset as usize].copy_from_slice(&cmd_bytes);
        buf[strings_bytes_offset as usize..strings_bytes_offset as usize + strings.len()].copy_from_slice(strings);
        buf
    }

    fn fill_rect_payload(x: i32, y: i32, w: i32, h: i32, style: Style) -> Vec<u8> {
        let mut p = Vec::new();
        p.extend_from_slice(&x.to_le_bytes());
        p.extend_from_slice(&y.to_le_bytes());
        p.extend_from_slice(&w.to_le_bytes());
        p.extend_from_slice(&h.to_le_bytes());
        p.extend_from_slice(&style.fg.0.to_le_bytes());
        p.extend_from_slice(&style.bg.0.to_le_bytes());
        p.extend_from_slice(&style.attrs.bits().to_le_bytes());
        p.extend_from_slice(&0u32.to_le_bytes());
        p
    }

    fn draw_text_payload(x: i32, y: i32, off: u32, len: u32, style: Style) -> Vec<u8> {
        // DRAW_TEXT's declared payload size is 40 bytes even though
        // x/y/span/style only account for 32 of them; the last 8 are an
        // unread v1 pad (opcode::Command::decode never consumes them for
        // this opcode).
        let mut p = Vec::new();
        p.extend_from_slice(&x.to_le_bytes());
        p.extend_from_slice(&y.to_le_bytes());
        p.extend_from_slice(&off.to_le_bytes());
        p.extend_from_slice(&len.to_le_bytes());
        p.extend_from_slice(&style.fg.0.to_le_bytes());
        p.extend_from_slice(&style.bg.0.to_le_bytes());
        p.extend_from_slice(&style.attrs.bits().to_le_bytes());
        p.extend_from_slice(&0u32.to_le_bytes());
        p.extend_from_slice(&[0u8; 8]);
        p
    }

    fn style() -> Style {
        Style { fg: Rgb::new(1, 2, 3), bg: Rgb::BLACK, attrs: StyleAttrs::empty() }
    }

    #[test]
    fn clear_then_fill_rect_writes_blanks() {
        let bytes = encode_minimal_drawlist(&[(1, vec![]), (2, fill_rect_payload(0, 0, 2, 2, style()))], b"");
        let header = DrawlistHeader::parse(&bytes).unwrap();
        let validated = validate(&bytes, &header, &DrawlistLimits::default()).unwrap();

        let mut staging = FrameBuffer::new(4, 4);
        let mut clip = ClipStack::new(4, 4);
        let mut resources = ResourceTables::new(1024, 1024);

        execute(&validated, &[], &[], &mut resources, &mut staging, &mut clip, WidthPolicy::EmojiWide).unwrap();
        assert_eq!(staging.cell(0, 0).style, style());
        assert_eq!(staging.cell(3, 3).style, Style::default());
    }

    #[test]
    fn draw_text_writes_glyphs_from_inline_string_pool() {
        let text = b"hi";
        let bytes = encode_minimal_drawlist(&[(3, draw_text_payload(0, 0, 0, 2, style()))], text);
        let header = DrawlistHeader::parse(&bytes).unwrap();
        let validated = validate(&bytes, &header, &DrawlistLimits::default()).unwrap();

        let mut staging = FrameBuffer::new(4, 1);
        let mut clip = ClipStack::new(4, 1);
        let mut resources = ResourceTables::new(1024, 1024);
        let strings_pool = &bytes[header.strings_bytes_offset as usize..(header.strings_bytes_offset + header.strings_bytes_len) as usize];

        execute(&validated, strings_pool, &[], &mut resources, &mut staging, &mut clip, WidthPolicy::EmojiWide).unwrap();
        assert_eq!(staging.cell(0, 0).glyph_str(), "h");
        assert_eq!(staging.cell(1, 0).glyph_str(), "i");
    }

    #[test]
    fn fill_rect_respects_clip() {
        let mut cmds = Vec::new();
        cmds.push((4u16, {
            let mut p = Vec::new();
            p.extend_from_slice(&1i32.to_le_bytes());
            p.extend_from_slice(&1i32.to_le_bytes());
            p.extend_from_slice(&1i32.to_le_bytes());
            p.extend_from_slice(&1i32.to_le_bytes());
            p
        }));
        cmds.push((2u16, fill_rect_payload(0, 0, 4, 4, style())));
        let bytes = encode_minimal_drawlist(&cmds, b"");
        let header = DrawlistHeader::parse(&bytes).unwrap();
        let validated = validate(&bytes, &header, &DrawlistLimits::default()).unwrap();

        let mut staging = FrameBuffer::new(4, 4);
        let mut clip = ClipStack::new(4, 4);
        let mut resources = ResourceTables::new(1024, 1024);
        execute(&validated, &[], &[], &mut resources, &mut staging, &mut clip, WidthPolicy::EmojiWide).unwrap();

        assert_eq!(staging.cell(0, 0).style, Style::default(), "outside clip stays untouched");
        assert_eq!(staging.cell(1, 1).style, style(), "inside clip gets the fill");
    }

    #[test]
    fn decode_text_run_segments_round_trips() {
        let mut blob = Vec::new();
        let s = style();
        blob.extend_from_slice(&s.fg.0.to_le_bytes());
        blob.extend_from_slice(&s.bg.0.to_le_bytes());
        blob.extend_from_slice(&s.attrs.bits().to_le_bytes());
        blob.extend_from_slice(&0u32.to_le_bytes());
        blob.extend_from_slice(&3u32.to_le_bytes());
        blob.extend_from_slice(b"abc");
        blob.push(0); // pad to 4-byte boundary

        let segments = decode_text_run_segments(&blob).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].0, s);
        assert_eq!(segments[0].1, "abc");
    }

    #[test]
    fn draw_text_replaces_invalid_utf8_byte_instead_of_failing() {
        let text = [b'h', 0xFF, b'i'];
        let bytes = encode_minimal_drawlist(&[(3, draw_text_payload(0, 0, 0, text.len() as u32, style()))], &text);
        let header = DrawlistHeader::parse(&bytes).unwrap();
        let validated = validate(&bytes, &header, &DrawlistLimits::default()).unwrap();

        let mut staging = FrameBuffer::new(4, 1);
        let mut clip = ClipStack::new(4, 1);
        let mut resources = ResourceTables::new(1024, 1024);
        let strings_pool = &bytes[header.strings_bytes_offset as usize..(header.strings_bytes_offset + header.strings_bytes_len) as usize];

        execute(&validated, strings_pool, &[], &mut resources, &mut staging, &mut clip, WidthPolicy::EmojiWide).unwrap();
        assert_eq!(staging.cell(0, 0).glyph_str(), "h");
        assert_eq!(staging.cell(1, 0).glyph_str(), "\u{FFFD}");
        assert_eq!(staging.cell(2, 0).glyph_str(), "i");
    }

    #[test]
    fn missing_resource_id_is_format_error() {
        let bytes = encode_minimal_drawlist(&[(3, draw_text_payload(0, 0, SPAN_RESOURCE_SENTINEL, 99, style()))], b"");
        let header = DrawlistHeader::parse(&bytes).unwrap();
        let validated = validate(&bytes, &header, &DrawlistLimits::default()).unwrap();

        let mut staging = FrameBuffer::new(4, 1);
        let mut clip = ClipStack::new(4, 1);
        let mut resources = ResourceTables::new(1024, 1024);
        let err = execute(&validated, &[], &[], &mut resources, &mut staging, &mut clip, WidthPolicy::EmojiWide).unwrap_err();
        assert_eq!(err.kind(), "FORMAT");
    }
}
