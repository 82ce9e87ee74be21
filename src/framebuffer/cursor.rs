//! Cursor state (§3): `{ x, y, shape, visible, blink }`. `SET_CURSOR` (§4.A)
//! uses `-1` coordinates to mean "leave this axis unchanged", so position is
//! tracked as `Option<u16>` here rather than mirroring the wire's sentinel.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorShape {
    #[default]
    Block,
    Underline,
    Bar,
}

impl CursorShape {
    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(CursorShape::Block),
            1 => Some(CursorShape::Underline),
            2 => Some(CursorShape::Bar),
            _ => None,
        }
    }

    pub fn to_wire(self) -> u8 {
        match self {
            CursorShape::Block => 0,
            CursorShape::Underline => 1,
            CursorShape::Bar => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorState {
    pub x: u16,
    pub y: u16,
    pub shape: CursorShape,
    pub visible: bool,
    pub blink: bool,
    /// Cleared on `CLEAR` / platform (re-)enter, set once `SET_CURSOR` (or an
    /// equivalent initial placement) has supplied a definite position; the
    /// diff renderer forces a `CUP` while this is false (§4.F: "force CUP
    /// when position validity is unknown").
    pub position_valid: bool,
}

impl Default for CursorState {
    fn default() -> Self {
        Self { x: 0, y: 0, shape: CursorShape::Block, visible: true, blink: false, position_valid: false }
    }
}

impl CursorState {
    /// Apply a `SET_CURSOR` command. `x`/`y` of `None` mean "unchanged" (the
    /// executor maps the wire's `-1` sentinel to `None` before calling this).
    pub fn apply_set_cursor(&mut self, x: Option<u16>, y: Option<u16>, shape: CursorShape, visible: bool, blink: bool) {
        if let Some(x) = x {
            self.x = x;
            self.position_valid = true;
        }
        if let Some(y) = y {
            self.y = y;
            self.position_valid = true;
        }
        self.shape = shape;
        self.visible = visible;
        self.blink = blink;
    }

    pub fn invalidate_position(&mut self) {
        self.position_valid = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_wire_round_trip() {
        for b in 0u8..=2 {
            let shape = CursorShape::from_wire(b).unwrap();
            assert_eq!(shape.to_wire(), b);
        }
        assert!(CursorShape::from_wire(3).is_none());
    }

    #[test]
    fn unchanged_axis_preserves_previous_value() {
        let mut c = CursorState::default();
        c.apply_set_cursor(Some(5), Some(7), CursorShape::Bar, true, false);
        c.apply_set_cursor(None, Some(9), CursorShape::Bar, true, false);
        assert_eq!(c.x, 5);
        assert_eq!(c.y, 9);
    }

    #[test]
    fn fresh_cursor_has_invalid_position() {
        let c = CursorState::default();
        assert!(!c.position_valid);
    }

    #[test]
    fn setting_either_axis_marks_position_valid() {
        let mut c = CursorState::default();
        c.apply_set_cursor(Some(1), None, CursorShape::Block, true, false);
        assert!(c.position_valid);
    }
}
