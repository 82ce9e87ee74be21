//! VT sequence constants and emission helpers (§4.F, §6.4).
//!
//! Reused near-verbatim from
//! `packages/spark-tui/rust/src/renderer/ansi.rs` — same escape-sequence
//! vocabulary (cursor movement, screen control, sync output, mouse/paste/
//! focus toggles) — but every sequence here writes into a `BoundedWriter`
//! rather than any `std::io::Write`, so a sequence that would overrun the
//! frame's byte budget truncates instead of partially landing on the wire.

use crate::bytes::BoundedWriter;
use crate::framebuffer::CursorShape;

#[must_use]
pub fn cup(w: &mut BoundedWriter, x: u16, y: u16) -> bool {
    w.write_str(&format!("\x1b[{};{}H", y + 1, x + 1))
}

#[must_use]
pub fn sgr_reset(w: &mut BoundedWriter) -> bool {
    w.write_str("\x1b[0m")
}

#[must_use]
pub fn cursor_hide(w: &mut BoundedWriter) -> bool {
    w.write_str("\x1b[?25l")
}

#[must_use]
pub fn cursor_show(w: &mut BoundedWriter) -> bool {
    w.write_str("\x1b[?25h")
}

#[must_use]
pub fn cursor_shape(w: &mut BoundedWriter, shape: CursorShape, blink: bool) -> bool {
    let n = match (shape, blink) {
        (CursorShape::Block, true) => 1,
        (CursorShape::Block, false) => 2,
        (CursorShape::Underline, true) => 3,
        (CursorShape::Underline, false) => 4,
        (CursorShape::Bar, true) => 5,
        (CursorShape::Bar, false) => 6,
    };
    w.write_str(&format!("\x1b[{n} q"))
}

#[must_use]
pub fn enter_alt_screen(w: &mut BoundedWriter) -> bool {
    w.write_str("\x1b[?1049h")
}

#[must_use]
pub fn exit_alt_screen(w: &mut BoundedWriter) -> bool {
    w.write_str("\x1b[?1049l")
}

#[must_use]
pub fn wrap_on(w: &mut BoundedWriter) -> bool {
    w.write_str("\x1b[?7h")
}

#[must_use]
pub fn enable_bracketed_paste(w: &mut BoundedWriter) -> bool {
    w.write_str("\x1b[?2004h")
}

#[must_use]
pub fn disable_bracketed_paste(w: &mut BoundedWriter) -> bool {
    w.write_str("\x1b[?2004l")
}

#[must_use]
pub fn enable_focus_reporting(w: &mut BoundedWriter) -> bool {
    w.write_str("\x1b[?1004h")
}

#[must_use]
pub fn disable_focus_reporting(w: &mut BoundedWriter) -> bool {
    w.write_str("\x1b[?1004l")
}

#[must_use]
pub fn enable_mouse(w: &mut BoundedWriter) -> bool {
    w.write_str("\x1b[?1000h\x1b[?1002h\x1b[?1003h\x1b[?1006h")
}

#[must_use]
pub fn disable_mouse(w: &mut BoundedWriter) -> bool {
    w.write_str("\x1b[?1006l\x1b[?1003l\x1b[?1002l\x1b[?1000l")
}

#[must_use]
pub fn scroll_region_set(w: &mut BoundedWriter, top: u16, bottom: u16) -> bool {
    w.write_str(&format!("\x1b[{};{}r", top + 1, bottom + 1))
}

#[must_use]
pub fn scroll_region_reset(w: &mut BoundedWriter) -> bool {
    w.write_str("\x1b[r")
}

#[must_use]
pub fn scroll_up(w: &mut BoundedWriter, n: u16) -> bool {
    w.write_str(&format!("\x1b[{n}S"))
}

#[must_use]
pub fn scroll_down(w: &mut BoundedWriter, n: u16) -> bool {
    w.write_str(&format!("\x1b[{n}T"))
}

pub const SYNC_BEGIN: &str = "\x1b[?2026h";
pub const SYNC_END: &str = "\x1b[?2026l";

#[must_use]
pub fn begin_sync(w: &mut BoundedWriter) -> bool {
    w.write_str(SYNC_BEGIN)
}

#[must_use]
pub fn end_sync(w: &mut BoundedWriter) -> bool {
    w.write_str(SYNC_END)
}

#[must_use]
pub fn erase_screen(w: &mut BoundedWriter) -> bool {
    w.write_str("\x1b[2J")
}

/// Raw-mode enter order, locked in §6.4: alt screen, hide cursor, wrap on,
/// then bracketed paste / focus / mouse gated by config+caps.
pub struct RawModeToggles {
    pub bracketed_paste: bool,
    pub focus_events: bool,
    pub mouse: bool,
}

#[must_use]
pub fn enter_raw_sequence(w: &mut BoundedWriter, toggles: RawModeToggles) -> bool {
    let mut ok = enter_alt_screen(w);
    ok &= cursor_hide(w);
    ok &= wrap_on(w);
    if toggles.bracketed_paste {
        ok &= enable_bracketed_paste(w);
    }
    if toggles.focus_events {
        ok &= enable_focus_reporting(w);
    }
    if toggles.mouse {
        ok &= enable_mouse(w);
    }
    ok
}

/// Raw-mode leave order, locked in §6.4: mouse off, focus off, paste off,
/// scroll region reset, SGR reset, wrap on, show cursor, leave alt screen.
#[must_use]
pub fn leave_raw_sequence(w: &mut BoundedWriter, toggles: RawModeToggles) -> bool {
    let mut ok = true;
    if toggles.mouse {
        ok &= disable_mouse(w);
    }
    if toggles.focus_events {
        ok &= disable_focus_reporting(w);
    }
    if toggles.bracketed_paste {
        ok &= disable_bracketed_paste(w);
    }
    ok &= scroll_region_reset(w);
    ok &= sgr_reset(w);
    ok &= wrap_on(w);
    ok &= cursor_show(w);
    ok &= exit_alt_screen(w);
    ok
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_string(f: impl FnOnce(&mut BoundedWriter) -> bool) -> String {
        let mut w = BoundedWriter::with_capacity(256);
        assert!(f(&mut w));
        String::from_utf8(w.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn cup_is_one_indexed() {
        assert_eq!(to_string(|w| cup(w, 10, 10)), "\x1b[11;11H");
    }

    #[test]
    fn enter_raw_order_is_locked() {
        let mut w = BoundedWriter::with_capacity(256);
        let toggles = RawModeToggles { bracketed_paste: true, focus_events: true, mouse: true };
        assert!(enter_raw_sequence(&mut w, toggles));
        let s = String::from_utf8(w.as_bytes().to_vec()).unwrap();
        assert_eq!(s, "\x1b[?1049h\x1b[?25l\x1b[?7h\x1b[?2004h\x1b[?1004h\x1b[?1000h\x1b[?1002h\x1b[?1003h\x1b[?1006h");
    }

    #[test]
    fn leave_raw_order_is_locked() {
        let mut w = BoundedWriter::with_capacity(256);
        let toggles = RawModeToggles { bracketed_paste: true, focus_events: true, mouse: true };
        assert!(leave_raw_sequence(&mut w, toggles));
        let s = String::from_utf8(w.as_bytes().to_vec()).unwrap();
        assert_eq!(
            s,
            "\x1b[?1006l\x1b[?1003l\x1b[?1002l\x1b[?1000l\x1b[?1004l\x1b[?2004l\x1b[r\x1b[0m\x1b[?7h\x1b[?25h\x1b[?1049l"
        );
    }
}
