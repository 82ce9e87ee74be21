//! Byte-oriented streaming input parser (§4.G).
//!
//! State machine shape and CSI/SGR-mouse decoding are grounded in the
//! teacher's `rust/src/input/parser.rs` `InputParser`/`try_parse_one`, kept
//! byte-for-byte on the escape-sequence recognition tables and generalized
//! to: engine `Event`/`EventKind` output instead of `ParsedEvent`, CSI-u
//! (`final == 'u'`) key+modifier records, bracketed paste accumulation with
//! a caller-supplied byte cap (scenario 8), and focus in/out as their own
//! event kinds.

use crate::error::ZrError;
use crate::unicode::decode_one;

use super::event::{Event, EventKind, KeyAction, KeyCode, MouseButton, MouseKind, Modifiers};

enum ParseResult {
    Event(EventKind),
    /// Consumed bytes but produced nothing observable (e.g. an unrecognized
    /// CSI final byte).
    None,
    /// Not enough bytes yet; wait for more input or a timeout flush.
    Incomplete,
    /// The open bracketed-paste span grew past its byte cap (scenario 8).
    PasteOverflow,
}

/// Parser state machine. Holds only the unconsumed tail of the input stream
/// and, while inside a bracketed-paste span, the bytes accumulated so far.
pub struct InputParser {
    buf: Vec<u8>,
    pasting: Option<Vec<u8>>,
    paste_max_bytes: usize,
}

impl InputParser {
    pub fn new(paste_max_bytes: usize) -> Self {
        Self { buf: Vec::with_capacity(64), pasting: None, paste_max_bytes }
    }

    /// Feed newly read bytes and parse as many complete events as possible.
    /// `now_ms` stamps every event produced from this call.
    ///
    /// On a paste-buffer overflow (scenario 8), the accumulated paste is
    /// discarded and `ZR_ERR_LIMIT` is returned; already-decoded bytes
    /// remain consumed (no replay), and the parser is left ready for the
    /// next `feed` call.
    pub fn feed(&mut self, data: &[u8], now_ms: u64) -> Result<Vec<Event>, ZrError> {
        self.buf.extend_from_slice(data);
        let mut events = Vec::new();

        loop {
            if self.buf.is_empty() {
                break;
            }
            match self.try_parse_one() {
                ParseResult::Event(kind) => events.push(Event::new(now_ms, kind)),
                ParseResult::None => {}
                ParseResult::Incomplete => break,
                ParseResult::PasteOverflow => {
                    self.pasting = None;
                    return Err(ZrError::limit("paste_buffer_max_bytes", "bracketed paste exceeded cap"));
                }
            }
        }

        Ok(events)
    }

    /// True while a partial escape sequence (or an open bracketed paste) is
    /// buffered and waiting for more bytes.
    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty() || self.pasting.is_some()
    }

    /// Flush a pending lone `ESC` (or other undecided prefix) as literal key
    /// events once a timeout has elapsed with no more bytes arriving.
    pub fn flush_pending(&mut self, now_ms: u64) -> Vec<Event> {
        let mut events = Vec::new();
        while !self.buf.is_empty() {
            let b = self.buf.remove(0);
            if b == 0x1B {
                events.push(Event::new(now_ms, key(KeyCode::Escape, Modifiers::empty(), KeyAction::Down)));
            } else {
                let d = decode_one(&[b]);
                events.push(Event::new(now_ms, key(KeyCode::Char(d.scalar), Modifiers::empty(), KeyAction::Down)));
            }
        }
        events
    }

    fn consume(&mut self, n: usize) {
        self.buf.drain(..n);
    }

    fn try_parse_one(&mut self) -> ParseResult {
        let first = self.buf[0];

        if let Some(acc) = &mut self.pasting {
            // Look for the paste-close sequence `ESC [ 201 ~` while accumulating.
            if let Some(pos) = find_subslice(&self.buf, b"\x1b[201~") {
                if acc.len() + pos > self.paste_max_bytes {
                    self.consume(pos + 6);
                    return ParseResult::PasteOverflow;
                }
                acc.extend_from_slice(&self.buf[..pos]);
                let text = std::mem::take(acc);
                self.pasting = None;
                self.consume(pos + 6);
                return ParseResult::Event(EventKind::Paste(text));
            }
            // No close sequence yet: consume everything except a possible
            // partial prefix of the close marker sitting at the tail.
            let safe = partial_prefix_len(&self.buf, b"\x1b[201~");
            if safe == 0 {
                return ParseResult::Incomplete;
            }
            if acc.len() + safe > self.paste_max_bytes {
                self.consume(safe);
                return ParseResult::PasteOverflow;
            }
            acc.extend_from_slice(&self.buf[..safe]);
            self.consume(safe);
            return ParseResult::None;
        }

        match first {
            0x1B => self.parse_escape(),
            0x00 => { self.consume(1); ParseResult::Event(key(KeyCode::Null, Modifiers::CTRL, KeyAction::Down)) }
            0x01..=0x07 => {
                let ch = (first + b'a' - 1) as char;
                self.consume(1);
                ParseResult::Event(key(KeyCode::Char(ch), Modifiers::CTRL, KeyAction::Down))
            }
            0x08 => { self.consume(1); ParseResult::Event(key(KeyCode::Backspace, Modifiers::empty(), KeyAction::Down)) }
            0x09 => { self.consume(1); ParseResult::Event(key(KeyCode::Tab, Modifiers::empty(), KeyAction::Down)) }
            0x0A | 0x0D => { self.consume(1); ParseResult::Event(key(KeyCode::Enter, Modifiers::empty(), KeyAction::Down)) }
            0x0B..=0x0C => {
                let ch = (first + b'a' - 1) as char;
                self.consume(1);
                ParseResult::Event(key(KeyCode::Char(ch), Modifiers::CTRL, KeyAction::Down))
            }
            0x0E..=0x1A => {
                let ch = (first + b'a' - 1) as char;
                self.consume(1);
                ParseResult::Event(key(KeyCode::Char(ch), Modifiers::CTRL, KeyAction::Down))
            }
            0x7F => { self.consume(1); ParseResult::Event(key(KeyCode::Backspace, Modifiers::empty(), KeyAction::Down)) }
            0x20..=0x7E => {
                self.consume(1);
                ParseResult::Event(EventKind::Text(first as char))
            }
            0x80..=0xFF => self.parse_utf8(),
            _ => {
                // 0x1C..=0x1F (FS/GS/RS/US): no assigned key, drop and progress.
                self.consume(1);
                ParseResult::None
            }
        }
    }

    fn parse_escape(&mut self) -> ParseResult {
        if self.buf.len() < 2 {
            return ParseResult::Incomplete;
        }
        match self.buf[1] {
            b'[' => self.parse_csi(),
            b'O' => self.parse_ss3(),
            0x20..=0x7E => {
                let ch = self.buf[1] as char;
                self.consume(2);
                ParseResult::Event(key(KeyCode::Char(ch), Modifiers::ALT, KeyAction::Down))
            }
            0x1B => {
                self.consume(2);
                ParseResult::Event(key(KeyCode::Escape, Modifiers::ALT, KeyAction::Down))
            }
            _ => {
                self.consume(1);
                ParseResult::Event(key(KeyCode::Escape, Modifiers::empty(), KeyAction::Down))
            }
        }
    }

    fn parse_csi(&mut self) -> ParseResult {
        if self.buf.len() < 3 {
            return ParseResult::Incomplete;
        }

        if self.buf[2] == b'<' {
            return self.parse_sgr_mouse();
        }
        if self.buf[2..].starts_with(b"200~") {
            self.consume(6);
            self.pasting = Some(Vec::new());
            return ParseResult::None;
        }
        if self.buf[2] == b'I' {
            self.consume(3);
            return ParseResult::Event(EventKind::FocusIn);
        }
        if self.buf[2] == b'O' {
            self.consume(3);
            return ParseResult::Event(EventKind::FocusOut);
        }

        let mut end = 2;
        while end < self.buf.len() {
            if (0x40..=0x7E).contains(&self.buf[end]) {
                break;
            }
            end += 1;
        }
        if end >= self.buf.len() {
            return ParseResult::Incomplete;
        }

        let final_byte = self.buf[end];
        let params_str = String::from_utf8_lossy(&self.buf[2..end]).to_string();
        let params: Vec<u32> = params_str.split(';').map(|s| s.parse::<u32>().unwrap_or(0)).collect();
        let consumed = end + 1;

        if final_byte == b'u' {
            self.consume(consumed);
            return self.parse_key_with_modifier(&params);
        }

        let modifiers = if params.len() >= 2 && params[1] > 0 { decode_modifier(params[1]) } else { Modifiers::empty() };

        let event = match final_byte {
            b'A' => Some(key(KeyCode::Up, modifiers, KeyAction::Down)),
            b'B' => Some(key(KeyCode::Down, modifiers, KeyAction::Down)),
            b'C' => Some(key(KeyCode::Right, modifiers, KeyAction::Down)),
            b'D' => Some(key(KeyCode::Left, modifiers, KeyAction::Down)),
            b'H' => Some(key(KeyCode::Home, modifiers, KeyAction::Down)),
            b'F' => Some(key(KeyCode::End, modifiers, KeyAction::Down)),
            b'P' => Some(key(KeyCode::F(1), modifiers, KeyAction::Down)),
            b'Q' => Some(key(KeyCode::F(2), modifiers, KeyAction::Down)),
            b'R' => Some(key(KeyCode::F(3), modifiers, KeyAction::Down)),
            b'S' => Some(key(KeyCode::F(4), modifiers, KeyAction::Down)),
            b'Z' => Some(key(KeyCode::Tab, Modifiers::SHIFT, KeyAction::Down)),
            b'~' => match params.first().copied().unwrap_or(0) {
                1 => Some(key(KeyCode::Home, modifiers, KeyAction::Down)),
                2 => Some(key(KeyCode::Insert, modifiers, KeyAction::Down)),
                3 => Some(key(KeyCode::Delete, modifiers, KeyAction::Down)),
                4 => Some(key(KeyCode::End, modifiers, KeyAction::Down)),
                5 => Some(key(KeyCode::PageUp, modifiers, KeyAction::Down)),
                6 => Some(key(KeyCode::PageDown, modifiers, KeyAction::Down)),
                15 => Some(key(KeyCode::F(5), modifiers, KeyAction::Down)),
                17 => Some(key(KeyCode::F(6), modifiers, KeyAction::Down)),
                18 => Some(key(KeyCode::F(7), modifiers, KeyAction::Down)),
                19 => Some(key(KeyCode::F(8), modifiers, KeyAction::Down)),
                20 => Some(key(KeyCode::F(9), modifiers, KeyAction::Down)),
                21 => Some(key(KeyCode::F(10), modifiers, KeyAction::Down)),
                23 => Some(key(KeyCode::F(11), modifiers, KeyAction::Down)),
                24 => Some(key(KeyCode::F(12), modifiers, KeyAction::Down)),
                _ => None,
            },
            _ => None,
        };

        self.consume(consumed);
        match event {
            Some(ev) => ParseResult::Event(ev),
            None => ParseResult::None,
        }
    }

    fn parse_ss3(&mut self) -> ParseResult {
        if self.buf.len() < 3 {
            return ParseResult::Incomplete;
        }
        let event = match self.buf[2] {
            b'A' => Some(key(KeyCode::Up, Modifiers::empty(), KeyAction::Down)),
            b'B' => Some(key(KeyCode::Down, Modifiers::empty(), KeyAction::Down)),
            b'C' => Some(key(KeyCode::Right, Modifiers::empty(), KeyAction::Down)),
            b'D' => Some(key(KeyCode::Left, Modifiers::empty(), KeyAction::Down)),
            b'H' => Some(key(KeyCode::Home, Modifiers::empty(), KeyAction::Down)),
            b'F' => Some(key(KeyCode::End, Modifiers::empty(), KeyAction::Down)),
            b'P' => Some(key(KeyCode::F(1), Modifiers::empty(), KeyAction::Down)),
            b'Q' => Some(key(KeyCode::F(2), Modifiers::empty(), KeyAction::Down)),
            b'R' => Some(key(KeyCode::F(3), Modifiers::empty(), KeyAction::Down)),
            b'S' => Some(key(KeyCode::F(4), Modifiers::empty(), KeyAction::Down)),
            _ => None,
        };
        self.consume(3);
        match event {
            Some(ev) => ParseResult::Event(ev),
            None => ParseResult::None,
        }
    }

    /// `CSI < Pb ; Px ; Py (M|m)` — SGR mouse. Motion-without-buttons
    /// (`cb & 32` set, no button bits) is `Move`; with a button held it's
    /// `Drag` (§4.G, scenario 7).
    fn parse_sgr_mouse(&mut self) -> ParseResult {
        let start = 3;
        let mut end = start;
        while end < self.buf.len() {
            if self.buf[end] == b'M' || self.buf[end] == b'm' {
                break;
            }
            end += 1;
        }
        if end >= self.buf.len() {
            return ParseResult::Incomplete;
        }

        let is_release = self.buf[end] == b'm';
        let params_str = String::from_utf8_lossy(&self.buf[start..end]).to_string();
        let parts: Vec<u32> = params_str.split(';').map(|s| s.parse().unwrap_or(0)).collect();
        let consumed = end + 1;
        self.consume(consumed);

        if parts.len() < 3 {
            return ParseResult::None;
        }

        let cb = parts[0];
        let x = parts[1].saturating_sub(1) as u16;
        let y = parts[2].saturating_sub(1) as u16;

        let mut modifiers = Modifiers::empty();
        if cb & 4 != 0 { modifiers |= Modifiers::SHIFT; }
        if cb & 8 != 0 { modifiers |= Modifiers::ALT; }
        if cb & 16 != 0 { modifiers |= Modifiers::CTRL; }

        let base = cb & 3;
        let button = match base {
            0 => MouseButton::Left,
            1 => MouseButton::Middle,
            2 => MouseButton::Right,
            _ => MouseButton::None,
        };

        let (kind, button) = if cb & 64 != 0 {
            (if base == 0 { MouseKind::WheelUp } else { MouseKind::WheelDown }, MouseButton::None)
        } else if cb & 32 != 0 {
            if base == 3 { (MouseKind::Move, MouseButton::None) } else { (MouseKind::Drag, button) }
        } else if is_release {
            (MouseKind::Release, button)
        } else {
            (MouseKind::Press, button)
        };

        ParseResult::Event(EventKind::Mouse { kind, button, x, y, modifiers })
    }

    fn parse_key_with_modifier(&self, params: &[u32]) -> ParseResult {
        let codepoint = params.first().copied().unwrap_or(0);
        let modifiers = if params.len() >= 2 { decode_modifier(params[1]) } else { Modifiers::empty() };
        let action = if params.len() >= 3 {
            match params[2] {
                2 => KeyAction::Repeat,
                3 => KeyAction::Up,
                _ => KeyAction::Down,
            }
        } else {
            KeyAction::Down
        };
        let code = match codepoint {
            9 => KeyCode::Tab,
            13 => KeyCode::Enter,
            27 => KeyCode::Escape,
            127 => KeyCode::Backspace,
            cp => char::from_u32(cp).map(KeyCode::Char).unwrap_or(KeyCode::Null),
        };
        ParseResult::Event(EventKind::Key { code, modifiers, action })
    }

    fn parse_utf8(&mut self) -> ParseResult {
        let d = decode_one(&self.buf);
        // `decode_one` never reads past the slice, but a multi-byte lead at
        // the tail of a short read legitimately needs more bytes before we
        // can tell valid from invalid.
        let first = self.buf[0];
        let expected = if first & 0xE0 == 0xC0 { 2 } else if first & 0xF0 == 0xE0 { 3 } else if first & 0xF8 == 0xF0 { 4 } else { 1 };
        if expected > 1 && self.buf.len() < expected {
            return ParseResult::Incomplete;
        }
        self.consume(d.size);
        ParseResult::Event(EventKind::Text(d.scalar))
    }
}

fn key(code: KeyCode, modifiers: Modifiers, action: KeyAction) -> EventKind {
    EventKind::Key { code, modifiers, action }
}

/// Decode a 1-based CSI modifier parameter into `Modifiers` bits.
fn decode_modifier(param: u32) -> Modifiers {
    let val = param.saturating_sub(1);
    let mut m = Modifiers::empty();
    if val & 1 != 0 { m |= Modifiers::SHIFT; }
    if val & 2 != 0 { m |= Modifiers::ALT; }
    if val & 4 != 0 { m |= Modifiers::CTRL; }
    if val & 8 != 0 { m |= Modifiers::SUPER; }
    m
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Length of `haystack`'s tail that is *not* a prefix of `needle`, so a
/// bracketed-paste accumulator can safely consume everything except a
/// partial close marker still waiting for more bytes.
fn partial_prefix_len(haystack: &[u8], needle: &[u8]) -> usize {
    let max_check = needle.len().saturating_sub(1).min(haystack.len());
    for start in (0..=haystack.len().saturating_sub(1)).rev() {
        if haystack.len() - start > max_check {
            break;
        }
        if needle.starts_with(&haystack[start..]) {
            return start;
        }
    }
    haystack.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &[u8]) -> Vec<Event> {
        let mut p = InputParser::new(1024 * 1024);
        p.feed(data, 0).unwrap()
    }

    #[test]
    fn ascii_chars_become_text_events() {
        let events = parse(b"abc");
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].kind, EventKind::Text('a'));
        assert_eq!(events[2].kind, EventKind::Text('c'));
    }

    #[test]
    fn enter_and_ctrl_c() {
        assert_eq!(parse(b"\r")[0].kind, key(KeyCode::Enter, Modifiers::empty(), KeyAction::Down));
        assert_eq!(parse(b"\x03")[0].kind, key(KeyCode::Char('c'), Modifiers::CTRL, KeyAction::Down));
    }

    #[test]
    fn arrow_keys() {
        assert_eq!(parse(b"\x1b[A")[0].kind, key(KeyCode::Up, Modifiers::empty(), KeyAction::Down));
        assert_eq!(parse(b"\x1bOD")[0].kind, key(KeyCode::Left, Modifiers::empty(), KeyAction::Down));
    }

    #[test]
    fn sgr_mouse_motion_without_buttons_is_move_not_drag() {
        // scenario 7: `ESC [ < 35 ; 10 ; 5 M`
        let events = parse(b"\x1b[<35;10;5M");
        match &events[0].kind {
            EventKind::Mouse { kind, x, y, .. } => {
                assert_eq!(*kind, MouseKind::Move);
                assert_eq!(*x, 9);
                assert_eq!(*y, 4);
            }
            other => panic!("expected mouse event, got {other:?}"),
        }
    }

    #[test]
    fn sgr_mouse_motion_with_button_is_drag() {
        let events = parse(b"\x1b[<32;1;1M");
        match &events[0].kind {
            EventKind::Mouse { kind, button, .. } => {
                assert_eq!(*kind, MouseKind::Drag);
                assert_eq!(*button, MouseButton::Left);
            }
            other => panic!("expected mouse event, got {other:?}"),
        }
    }

    #[test]
    fn sgr_mouse_wheel() {
        let events = parse(b"\x1b[<64;1;1M");
        assert_eq!(events[0].kind, EventKind::Mouse { kind: MouseKind::WheelUp, button: MouseButton::None, x: 0, y: 0, modifiers: Modifiers::empty() });
    }

    #[test]
    fn focus_in_and_out() {
        assert_eq!(parse(b"\x1b[I")[0].kind, EventKind::FocusIn);
        assert_eq!(parse(b"\x1b[O")[0].kind, EventKind::FocusOut);
    }

    #[test]
    fn bracketed_paste_round_trip() {
        let events = parse(b"\x1b[200~hello world\x1b[201~");
        assert_eq!(events[0].kind, EventKind::Paste(b"hello world".to_vec()));
    }

    #[test]
    fn bracketed_paste_over_cap_is_limit_error_and_parser_stays_usable() {
        let mut p = InputParser::new(4);
        let mut data = b"\x1b[200~".to_vec();
        data.extend_from_slice(b"too much data");
        data.extend_from_slice(b"\x1b[201~");
        let err = p.feed(&data, 0).unwrap_err();
        assert_eq!(err.kind(), "LIMIT");
        // parser is usable for subsequent polls
        let events = p.feed(b"x", 0).unwrap();
        assert_eq!(events[0].kind, EventKind::Text('x'));
    }

    #[test]
    fn malformed_csi_drops_byte_and_makes_progress() {
        let events = parse(b"\x1b[9999zabc");
        // the unknown final byte 'z' yields no event but the stream still
        // drains to the following ascii text.
        assert!(events.iter().any(|e| e.kind == EventKind::Text('a')));
    }

    #[test]
    fn incomplete_escape_waits_for_more_bytes() {
        let mut p = InputParser::new(1024);
        let events = p.feed(b"\x1b[", 0).unwrap();
        assert!(events.is_empty());
        assert!(p.has_pending());
        let events = p.feed(b"A", 0).unwrap();
        assert_eq!(events[0].kind, key(KeyCode::Up, Modifiers::empty(), KeyAction::Down));
    }

    #[test]
    fn flush_pending_emits_lone_escape() {
        let mut p = InputParser::new(1024);
        p.feed(b"\x1b", 0).unwrap();
        let events = p.flush_pending(0);
        assert_eq!(events[0].kind, key(KeyCode::Escape, Modifiers::empty(), KeyAction::Down));
        assert!(!p.has_pending());
    }
}
