//! Terminal state snapshot (§3): what the engine believes the real terminal
//! looks like after the last emitted byte. Mutated only by the diff emitter
//! as it writes bytes, and reset wholesale on platform enter/leave.
//!
//! No teacher equivalent — `StatefulCellRenderer` in `output.rs` tracks a
//! similar but narrower subset (cursor position + last colours/attrs only);
//! this generalizes it to cover scroll region and sync-update state too,
//! since §4.F's diff contract needs both.

use crate::framebuffer::CursorShape;
use crate::style::Style;

use super::ColorMode;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminalState {
    pub cursor_x: u16,
    pub cursor_y: u16,
    /// Mirrors `CursorState::position_valid`; while false the diff emitter
    /// forces a `CUP` before the next glyph write (§4.F).
    pub cursor_valid: bool,
    pub cursor_hidden: bool,
    pub cursor_shape: CursorShape,
    pub style: Style,
    /// `sgr_attrs_supported` bitmask negotiated at `create`/`set_config`
    /// time (§4.I `get_caps`); constant for the state's lifetime, carried
    /// here because every SGR emission needs it.
    pub attrs_mask: u32,
    pub scroll_region: Option<(u16, u16)>,
    pub colour_mode: ColorMode,
    pub sync_update_open: bool,
}

impl TerminalState {
    pub fn new(colour_mode: ColorMode, attrs_mask: u32) -> Self {
        Self {
            cursor_x: 0,
            cursor_y: 0,
            cursor_valid: false,
            cursor_hidden: false,
            cursor_shape: CursorShape::Block,
            style: Style::default(),
            attrs_mask,
            scroll_region: None,
            colour_mode,
            sync_update_open: false,
        }
    }

    /// Reset to the "just entered raw mode" state (§3: "reset on platform
    /// enter/leave"), preserving the negotiated colour mode and attrs mask.
    pub fn reset(&mut self) {
        *self = Self::new(self.colour_mode, self.attrs_mask);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_has_invalid_cursor() {
        let st = TerminalState::new(ColorMode::Rgb, 0);
        assert!(!st.cursor_valid);
        assert!(!st.sync_update_open);
    }

    #[test]
    fn reset_preserves_colour_mode_and_attrs_mask() {
        let mut st = TerminalState::new(ColorMode::Indexed256, 0b1010);
        st.cursor_valid = true;
        st.cursor_x = 5;
        st.reset();
        assert!(!st.cursor_valid);
        assert_eq!(st.colour_mode, ColorMode::Indexed256);
        assert_eq!(st.attrs_mask, 0b1010);
    }
}
