//! Input event model (§4.G, §6.3, §9 "tagged unions for drawlist and events").
//!
//! Mirrors the wire record types from §6.3 one-to-one so the batch serializer
//! in `super::batch` never has to reconcile two shapes. `KEY`/`FOCUS_IN`/
//! `FOCUS_OUT` are kept as distinct variants rather than folded together,
//! per DESIGN.md's Open Question decision.

bitflags::bitflags! {
    /// Keyboard/mouse modifier bits, same vocabulary as the teacher's
    /// `input/parser.rs` `Modifier` bitflags (`SHIFT/ALT/CTRL/SUPER`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Modifiers: u32 {
        const SHIFT = 1 << 0;
        const ALT   = 1 << 1;
        const CTRL  = 1 << 2;
        const SUPER = 1 << 3;
    }
}

/// A key identity. Printable characters carry their scalar value directly;
/// named/functional keys are encoded in the Unicode Private Use Area on the
/// wire (`PUA_BASE..PUA_BASE+0x100`), the same "codepoint plus named-key
/// range" trick the Kitty keyboard protocol and the teacher's CSI-u handling
/// both lean on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    Char(char),
    Null,
    Enter,
    Tab,
    Backspace,
    Escape,
    Delete,
    Insert,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    F(u8),
}

const PUA_BASE: u32 = 0xE000;
const PUA_NULL: u32 = PUA_BASE;
const PUA_ENTER: u32 = PUA_BASE + 1;
const PUA_TAB: u32 = PUA_BASE + 2;
const PUA_BACKSPACE: u32 = PUA_BASE + 3;
const PUA_ESCAPE: u32 = PUA_BASE + 4;
const PUA_DELETE: u32 = PUA_BASE + 5;
const PUA_INSERT: u32 = PUA_BASE + 6;
const PUA_UP: u32 = PUA_BASE + 7;
const PUA_DOWN: u32 = PUA_BASE + 8;
const PUA_LEFT: u32 = PUA_BASE + 9;
const PUA_RIGHT: u32 = PUA_BASE + 10;
const PUA_HOME: u32 = PUA_BASE + 11;
const PUA_END: u32 = PUA_BASE + 12;
const PUA_PAGE_UP: u32 = PUA_BASE + 13;
const PUA_PAGE_DOWN: u32 = PUA_BASE + 14;
const PUA_F_BASE: u32 = PUA_BASE + 15; // F(1)..F(24) -> PUA_F_BASE..PUA_F_BASE+23

impl KeyCode {
    pub fn to_wire(self) -> u32 {
        match self {
            KeyCode::Char(c) => c as u32,
            KeyCode::Null => PUA_NULL,
            KeyCode::Enter => PUA_ENTER,
            KeyCode::Tab => PUA_TAB,
            KeyCode::Backspace => PUA_BACKSPACE,
            KeyCode::Escape => PUA_ESCAPE,
            KeyCode::Delete => PUA_DELETE,
            KeyCode::Insert => PUA_INSERT,
            KeyCode::Up => PUA_UP,
            KeyCode::Down => PUA_DOWN,
            KeyCode::Left => PUA_LEFT,
            KeyCode::Right => PUA_RIGHT,
            KeyCode::Home => PUA_HOME,
            KeyCode::End => PUA_END,
            KeyCode::PageUp => PUA_PAGE_UP,
            KeyCode::PageDown => PUA_PAGE_DOWN,
            KeyCode::F(n) => PUA_F_BASE + (n.saturating_sub(1)) as u32,
        }
    }

    pub fn from_wire(v: u32) -> KeyCode {
        match v {
            PUA_NULL => KeyCode::Null,
            PUA_ENTER => KeyCode::Enter,
            PUA_TAB => KeyCode::Tab,
            PUA_BACKSPACE => KeyCode::Backspace,
            PUA_ESCAPE => KeyCode::Escape,
            PUA_DELETE => KeyCode::Delete,
            PUA_INSERT => KeyCode::Insert,
            PUA_UP => KeyCode::Up,
            PUA_DOWN => KeyCode::Down,
            PUA_LEFT => KeyCode::Left,
            PUA_RIGHT => KeyCode::Right,
            PUA_HOME => KeyCode::Home,
            PUA_END => KeyCode::End,
            PUA_PAGE_UP => KeyCode::PageUp,
            PUA_PAGE_DOWN => KeyCode::PageDown,
            n if (PUA_F_BASE..PUA_F_BASE + 24).contains(&n) => KeyCode::F((n - PUA_F_BASE + 1) as u8),
            n => char::from_u32(n).map(KeyCode::Char).unwrap_or(KeyCode::Null),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Down,
    Up,
    Repeat,
}

impl KeyAction {
    pub fn to_wire(self) -> u32 {
        match self {
            KeyAction::Down => 1,
            KeyAction::Up => 2,
            KeyAction::Repeat => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    None,
    Left,
    Middle,
    Right,
}

impl MouseButton {
    pub fn to_wire(self) -> u32 {
        match self {
            MouseButton::None => 0,
            MouseButton::Left => 1,
            MouseButton::Middle => 2,
            MouseButton::Right => 3,
        }
    }
}

/// SGR-mouse-derived event kind. Motion without a held button is `Move`;
/// motion with one is `Drag` — the distinction §4.G calls out explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseKind {
    Press,
    Release,
    Move,
    Drag,
    WheelUp,
    WheelDown,
}

impl MouseKind {
    pub fn to_wire(self) -> u32 {
        match self {
            MouseKind::Press => 1,
            MouseKind::Release => 2,
            MouseKind::Move => 3,
            MouseKind::Drag => 4,
            MouseKind::WheelUp => 5,
            MouseKind::WheelDown => 6,
        }
    }
}

/// One parsed or synthesized input event (§6.3 record types `1..=9`).
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Key { code: KeyCode, modifiers: Modifiers, action: KeyAction },
    Text(char),
    Paste(Vec<u8>),
    Mouse { kind: MouseKind, button: MouseButton, x: u16, y: u16, modifiers: Modifiers },
    Resize { cols: u16, rows: u16 },
    Tick { seq: u32 },
    User { tag: u64, payload: Vec<u8> },
    FocusIn,
    FocusOut,
}

impl EventKind {
    /// Wire record type, §6.3.
    pub fn record_type(&self) -> u32 {
        match self {
            EventKind::Key { .. } => 1,
            EventKind::Text(_) => 2,
            EventKind::Paste(_) => 3,
            EventKind::Mouse { .. } => 4,
            EventKind::Resize { .. } => 5,
            EventKind::Tick { .. } => 6,
            EventKind::User { .. } => 7,
            EventKind::FocusIn => 8,
            EventKind::FocusOut => 9,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub time_ms: u64,
    pub kind: EventKind,
}

impl Event {
    pub fn new(time_ms: u64, kind: EventKind) -> Self {
        Self { time_ms, kind }
    }
}
