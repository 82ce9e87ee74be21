//! Absolute-reset SGR emission and colour degradation (§4.F).
//!
//! The attrs-bitmask-to-escape-code loop is the same macro-driven idiom as
//! `packages/spark-tui/rust/src/renderer/ansi.rs`'s `attrs()`, narrowed to
//! the six `StyleAttrs` bits and reordered to the locked emission order
//! (DESIGN.md Open Question #1). The nearest-colour degradation ladder
//! (256-cube / 16-palette) has no teacher equivalent — the teacher only ever
//! emitted truecolor/passthrough-index — and is built fresh per §4.F's
//! table.

use crate::bytes::BoundedWriter;
use crate::style::{Rgb, Style, StyleAttrs};

use super::ColorMode;

/// Emission order locked in DESIGN.md Open Question #1: `{BOLD, DIM, ITALIC,
/// UNDERLINE, REVERSE, STRIKE}` by their numeric SGR code, not declaration
/// order.
const ATTR_ORDER: [(StyleAttrs, u32); 6] = [
    (StyleAttrs::BOLD, 1),
    (StyleAttrs::DIM, 2),
    (StyleAttrs::ITALIC, 3),
    (StyleAttrs::UNDERLINE, 4),
    (StyleAttrs::REVERSE, 7),
    (StyleAttrs::STRIKE, 9),
];

/// Emits `CSI 0` then every supported attr (AND'd with `sgr_attrs_supported`)
/// in the locked order, then fg, then bg, as a single `CSI ... m` sequence
/// (§4.F: "absolute reset-then-set per style change").
#[must_use]
pub fn emit_style(w: &mut BoundedWriter, style: Style, mode: ColorMode, sgr_attrs_supported: u32) -> bool {
    let mut codes: Vec<u32> = vec![0];
    for (flag, code) in ATTR_ORDER {
        if style.attrs.contains(flag) && (sgr_attrs_supported & (1 << code)) != 0 {
            codes.push(code);
        }
    }
    codes.extend(fg_codes(style.fg, mode));
    codes.extend(bg_codes(style.bg, mode));

    let rendered = codes.iter().map(u32::to_string).collect::<Vec<_>>().join(";");
    w.write_str(&format!("\x1b[{rendered}m"))
}

fn fg_codes(color: Rgb, mode: ColorMode) -> Vec<u32> {
    match degrade(color, mode) {
        DegradedColor::Rgb(r, g, b) => vec![38, 2, r as u32, g as u32, b as u32],
        DegradedColor::Indexed(i) => vec![38, 5, i as u32],
    }
}

fn bg_codes(color: Rgb, mode: ColorMode) -> Vec<u32> {
    match degrade(color, mode) {
        DegradedColor::Rgb(r, g, b) => vec![48, 2, r as u32, g as u32, b as u32],
        DegradedColor::Indexed(i) => vec![48, 5, i as u32],
    }
}

enum DegradedColor {
    Rgb(u8, u8, u8),
    Indexed(u8),
}

fn degrade(color: Rgb, mode: ColorMode) -> DegradedColor {
    match mode {
        ColorMode::Rgb => DegradedColor::Rgb(color.r(), color.g(), color.b()),
        ColorMode::Indexed256 => DegradedColor::Indexed(nearest_256(color)),
        ColorMode::Indexed16 => DegradedColor::Indexed(nearest_16(color)),
        // `UNKNOWN` degrades to 16 per §4.F's table; the engine always
        // resolves `Unknown` to a detected mode before this function is
        // called, but degrade conservatively if one ever slips through.
        ColorMode::Unknown => DegradedColor::Indexed(nearest_16(color)),
    }
}

/// xterm's 6x6x6 colour cube steps (indices 16..=231) plus a 24-step
/// greyscale ramp (232..=255). Distance is squared Euclidean; ties break to
/// the smaller index by scanning candidates in index order and keeping only
/// strict improvements (§4.F: "deterministic tie-break to smaller index").
fn nearest_256(color: Rgb) -> u8 {
    const STEPS: [u8; 6] = [0, 95, 135, 175, 215, 255];
    let (r, g, b) = (color.r(), color.g(), color.b());

    let mut best_index: u8 = 16;
    let mut best_dist = u32::MAX;

    for ri in 0..6u8 {
        for gi in 0..6u8 {
            for bi in 0..6u8 {
                let index = 16 + 36 * ri + 6 * gi + bi;
                let (cr, cg, cb) = (STEPS[ri as usize], STEPS[gi as usize], STEPS[bi as usize]);
                let dist = sq_dist(r, g, b, cr, cg, cb);
                if dist < best_dist {
                    best_dist = dist;
                    best_index = index;
                }
            }
        }
    }

    for step in 0..24u8 {
        let level = 8 + step * 10;
        let index = 232 + step;
        let dist = sq_dist(r, g, b, level, level, level);
        if dist < best_dist {
            best_dist = dist;
            best_index = index;
        }
    }

    best_index
}

/// Fixed locked 16-colour palette (standard ANSI 0-7 + bright 8-15),
/// matching conventional xterm default RGB values.
const PALETTE_16: [(u8, u8, u8); 16] = [
    (0, 0, 0),
    (205, 0, 0),
    (0, 205, 0),
    (205, 205, 0),
    (0, 0, 238),
    (205, 0, 205),
    (0, 205, 205),
    (229, 229, 229),
    (127, 127, 127),
    (255, 0, 0),
    (0, 255, 0),
    (255, 255, 0),
    (92, 92, 255),
    (255, 0, 255),
    (0, 255, 255),
    (255, 255, 255),
];

fn nearest_16(color: Rgb) -> u8 {
    let (r, g, b) = (color.r(), color.g(), color.b());
    let mut best_index: u8 = 0;
    let mut best_dist = u32::MAX;
    for (i, &(cr, cg, cb)) in PALETTE_16.iter().enumerate() {
        let dist = sq_dist(r, g, b, cr, cg, cb);
        if dist < best_dist {
            best_dist = dist;
            best_index = i as u8;
        }
    }
    best_index
}

fn sq_dist(r1: u8, g1: u8, b1: u8, r2: u8, g2: u8, b2: u8) -> u32 {
    let dr = r1 as i32 - r2 as i32;
    let dg = g1 as i32 - g2 as i32;
    let db = b1 as i32 - b2 as i32;
    (dr * dr + dg * dg + db * db) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style_fg_bg(fg: Rgb, bg: Rgb, attrs: StyleAttrs) -> Style {
        Style { fg, bg, attrs }
    }

    #[test]
    fn scenario_2_single_cell_256_colour() {
        // §8 scenario 2: fg=0x00FF0000 red, bg=black, 256-colour, no attrs
        // supported -> "0;38;5;196;48;5;16"
        let style = style_fg_bg(Rgb::new(0xFF, 0, 0), Rgb::new(0, 0, 0), StyleAttrs::empty());
        let mut w = BoundedWriter::with_capacity(64);
        assert!(emit_style(&mut w, style, ColorMode::Indexed256, 0));
        let s = String::from_utf8(w.as_bytes().to_vec()).unwrap();
        assert_eq!(s, "\x1b[0;38;5;196;48;5;16m");
    }

    #[test]
    fn attrs_emitted_in_locked_order_regardless_of_set_order() {
        let style = style_fg_bg(Rgb::BLACK, Rgb::BLACK, StyleAttrs::STRIKE | StyleAttrs::BOLD | StyleAttrs::ITALIC);
        let mut w = BoundedWriter::with_capacity(64);
        assert!(emit_style(&mut w, style, ColorMode::Rgb, u32::MAX));
        let s = String::from_utf8(w.as_bytes().to_vec()).unwrap();
        assert!(s.starts_with("\x1b[0;1;3;9;"), "got {s}");
    }

    #[test]
    fn unsupported_attrs_are_masked_out() {
        let style = style_fg_bg(Rgb::BLACK, Rgb::BLACK, StyleAttrs::BOLD | StyleAttrs::UNDERLINE);
        let mut w = BoundedWriter::with_capacity(64);
        // sgr_attrs_supported only advertises bit 1 (bold).
        assert!(emit_style(&mut w, style, ColorMode::Rgb, 1 << 1));
        let s = String::from_utf8(w.as_bytes().to_vec()).unwrap();
        assert!(s.starts_with("\x1b[0;1;38"), "got {s}");
    }

    #[test]
    fn pure_colours_map_to_exact_256_cube_entries() {
        assert_eq!(nearest_256(Rgb::new(0, 0, 0)), 16);
        assert_eq!(nearest_256(Rgb::new(255, 255, 255)), 231);
    }

    #[test]
    fn nearest_16_picks_black_for_black() {
        assert_eq!(nearest_16(Rgb::new(0, 0, 0)), 0);
    }

    #[test]
    fn rgb_mode_emits_truecolor_escape() {
        let style = style_fg_bg(Rgb::new(1, 2, 3), Rgb::new(4, 5, 6), StyleAttrs::empty());
        let mut w = BoundedWriter::with_capacity(64);
        assert!(emit_style(&mut w, style, ColorMode::Rgb, 0));
        let s = String::from_utf8(w.as_bytes().to_vec()).unwrap();
        assert_eq!(s, "\x1b[0;38;2;1;2;3;48;2;4;5;6m");
    }
}
