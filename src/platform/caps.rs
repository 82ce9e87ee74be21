//! Capability detection & environment overrides (§4.I, §6.5).
//!
//! Shared between backends: parse `TERM`/`COLORTERM`/`TERM_PROGRAM` and
//! well-known terminal markers into a baseline `Caps`, then let
//! `ZIREAEL_CAP_*` env vars override individual bits. Requested
//! `color_mode` is clamped to detected via `Ord` — `ColorMode::Unknown`
//! sorts highest, so `requested.min(detected)` already implements "UNKNOWN
//! means use detected" for free.

use std::env;

use crate::render::ColorMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caps {
    pub color_mode: ColorMode,
    pub supports_mouse: bool,
    pub supports_bracketed_paste: bool,
    pub supports_focus_events: bool,
    pub supports_osc52: bool,
    pub supports_sync_update: bool,
    pub supports_scroll_region: bool,
    pub supports_cursor_shape: bool,
    pub supports_output_wait_writable: bool,
    pub sgr_attrs_supported: u32,
}

impl Default for Caps {
    fn default() -> Self {
        Self {
            color_mode: ColorMode::Indexed16,
            supports_mouse: true,
            supports_bracketed_paste: true,
            supports_focus_events: true,
            supports_osc52: false,
            supports_sync_update: false,
            supports_scroll_region: true,
            supports_cursor_shape: true,
            supports_output_wait_writable: false,
            sgr_attrs_supported: u32::MAX,
        }
    }
}

/// Detect a baseline `Caps` from well-known environment markers.
pub fn detect_from_env() -> Caps {
    let mut caps = Caps::default();

    let term = env::var("TERM").unwrap_or_default();
    let colorterm = env::var("COLORTERM").unwrap_or_default();
    let term_program = env::var("TERM_PROGRAM").unwrap_or_default();

    caps.color_mode = if colorterm.contains("truecolor") || colorterm.contains("24bit") {
        ColorMode::Rgb
    } else if term.contains("256color") {
        ColorMode::Indexed256
    } else {
        ColorMode::Indexed16
    };

    let known_rich_terminal = env::var("KITTY_WINDOW_ID").is_ok()
        || env::var("WEZTERM_PANE").is_ok()
        || env::var("WT_SESSION").is_ok()
        || env::var("VTE_VERSION").is_ok()
        || term_program == "iTerm.app"
        || term_program == "vscode";

    if known_rich_terminal {
        caps.supports_sync_update = true;
        if caps.color_mode == ColorMode::Indexed16 {
            caps.color_mode = ColorMode::Indexed256;
        }
    }

    caps
}

/// Apply `ZIREAEL_CAP_*` overrides (§6.5) on top of a detected baseline.
pub fn apply_env_overrides(mut caps: Caps) -> Caps {
    if let Some(v) = env_bool("ZIREAEL_CAP_MOUSE") {
        caps.supports_mouse = v;
    }
    if let Some(v) = env_bool("ZIREAEL_CAP_BRACKETED_PASTE") {
        caps.supports_bracketed_paste = v;
    }
    if let Some(v) = env_bool("ZIREAEL_CAP_FOCUS_EVENTS") {
        caps.supports_focus_events = v;
    }
    if let Some(v) = env_bool("ZIREAEL_CAP_OSC52") {
        caps.supports_osc52 = v;
    }
    if let Some(v) = env_bool("ZIREAEL_CAP_SYNC_UPDATE") {
        caps.supports_sync_update = v;
    }
    if let Some(v) = env_bool("ZIREAEL_CAP_SCROLL_REGION") {
        caps.supports_scroll_region = v;
    }
    if let Some(v) = env_bool("ZIREAEL_CAP_CURSOR_SHAPE") {
        caps.supports_cursor_shape = v;
    }
    if let Some(v) = env_bool("ZIREAEL_CAP_OUTPUT_WAIT_WRITABLE") {
        caps.supports_output_wait_writable = v;
    }
    // `_MASK` takes precedence over the unsuffixed variant (§6.5).
    if let Some(mask) = env_u32("ZIREAEL_CAP_SGR_ATTRS_MASK").or_else(|| env_u32("ZIREAEL_CAP_SGR_ATTRS")) {
        caps.sgr_attrs_supported = mask;
    }
    caps
}

/// Clamp a requested colour mode to what was actually detected.
/// `ColorMode::Unknown` sorts above every concrete mode, so `min` already
/// means "use detected" when the request is `Unknown`.
pub fn clamp_color_mode(requested: ColorMode, detected: ColorMode) -> ColorMode {
    requested.min(detected)
}

fn env_bool(key: &str) -> Option<bool> {
    match env::var(key).ok()?.to_ascii_lowercase().as_str() {
        "0" | "false" | "no" | "off" => Some(false),
        "1" | "true" | "yes" | "on" => Some(true),
        _ => None,
    }
}

fn env_u32(key: &str) -> Option<u32> {
    let raw = env::var(key).ok()?;
    let raw = raw.trim();
    if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else if raw.starts_with('-') {
        None
    } else {
        raw.parse::<u32>().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_uses_min_and_unknown_means_detected() {
        assert_eq!(clamp_color_mode(ColorMode::Rgb, ColorMode::Indexed256), ColorMode::Indexed256);
        assert_eq!(clamp_color_mode(ColorMode::Unknown, ColorMode::Indexed256), ColorMode::Indexed256);
        assert_eq!(clamp_color_mode(ColorMode::Indexed16, ColorMode::Rgb), ColorMode::Indexed16);
    }

    #[test]
    fn env_bool_accepts_locked_vocabulary() {
        assert_eq!(env_bool_parse("1"), Some(true));
        assert_eq!(env_bool_parse("off"), Some(false));
        assert_eq!(env_bool_parse("maybe"), None);
    }

    fn env_bool_parse(s: &str) -> Option<bool> {
        match s.to_ascii_lowercase().as_str() {
            "0" | "false" | "no" | "off" => Some(false),
            "1" | "true" | "yes" | "on" => Some(true),
            _ => None,
        }
    }

    #[test]
    fn env_u32_accepts_hex_and_decimal() {
        assert_eq!(env_u32_parse("0x1F"), Some(0x1F));
        assert_eq!(env_u32_parse("31"), Some(31));
        assert_eq!(env_u32_parse("-1"), None);
    }

    fn env_u32_parse(raw: &str) -> Option<u32> {
        if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            u32::from_str_radix(hex, 16).ok()
        } else if raw.starts_with('-') {
            None
        } else {
            raw.parse::<u32>().ok()
        }
    }
}
