//! Engine and runtime configuration (§1.3, §4.D limits, §4.I caps).
//!
//! Grounded in `rust/src/config.rs`'s `validate()`-returning-`Result` config
//! pattern, generalized from layout/timing config to the drawlist limits,
//! platform capability requests, and frame budgets this engine needs.

use crate::error::ZrError;
use crate::render::ColorMode;
use crate::unicode::WidthPolicy;

/// Limits enforced by the drawlist validator (§4.D, scenario 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawlistLimits {
    pub dl_max_total_bytes: u32,
    pub dl_max_cmds: u32,
    pub dl_max_string_count: u32,
    pub dl_max_string_bytes: u32,
    pub dl_max_blob_count: u32,
    pub dl_max_blob_bytes: u32,
    pub dl_max_clip_depth: u32,
    pub dl_max_text_run_segments: u32,
    pub dl_max_damage_rects: u32,
}

impl Default for DrawlistLimits {
    fn default() -> Self {
        Self {
            dl_max_total_bytes: 8 * 1024 * 1024,
            dl_max_cmds: 1_000_000,
            dl_max_string_count: 4096,
            dl_max_string_bytes: 1024 * 1024,
            dl_max_blob_count: 4096,
            dl_max_blob_bytes: 4 * 1024 * 1024,
            dl_max_clip_depth: 64,
            dl_max_text_run_segments: 4096,
            dl_max_damage_rects: 4096,
        }
    }
}

impl DrawlistLimits {
    pub fn validate(&self) -> Result<(), ZrError> {
        if self.dl_max_cmds == 0 {
            return Err(ZrError::invalid_argument("dl_max_cmds must be > 0"));
        }
        if self.dl_max_total_bytes < 64 {
            return Err(ZrError::invalid_argument("dl_max_total_bytes must be >= header size"));
        }
        if self.dl_max_clip_depth == 0 {
            return Err(ZrError::invalid_argument("dl_max_clip_depth must be > 0"));
        }
        Ok(())
    }
}

/// Platform-facing capability requests, negotiated against detected
/// capabilities at `create` time (§4.I `get_caps`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityRequest {
    pub mouse: bool,
    pub bracketed_paste: bool,
    pub focus_events: bool,
    pub osc52: bool,
    pub sync_update: bool,
    pub scroll_region: bool,
}

impl Default for CapabilityRequest {
    fn default() -> Self {
        Self { mouse: true, bracketed_paste: true, focus_events: true, osc52: false, sync_update: true, scroll_region: true }
    }
}

/// Immutable, construction-time configuration (§1.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub drawlist_limits: DrawlistLimits,
    pub capabilities: CapabilityRequest,
    /// Requested colour encoding, clamped to `min(requested, detected)` by
    /// the platform layer at `create` time (§4.I, §6.5); `Unknown` means
    /// "use whatever the backend detected".
    pub requested_color_mode: ColorMode,
    pub emoji_width: WidthPolicy,
    pub tab_stop: u16,
    pub out_max_bytes_per_frame: u32,
    pub event_batch_max_bytes: u32,
    pub event_queue_capacity: u32,
    pub paste_buffer_max_bytes: u32,
    pub target_fps: u16,
    pub wait_for_output_drain: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            drawlist_limits: DrawlistLimits::default(),
            capabilities: CapabilityRequest::default(),
            requested_color_mode: ColorMode::Unknown,
            emoji_width: WidthPolicy::EmojiWide,
            tab_stop: 8,
            out_max_bytes_per_frame: 1024 * 1024,
            event_batch_max_bytes: 64 * 1024,
            event_queue_capacity: 4096,
            paste_buffer_max_bytes: 1024 * 1024,
            target_fps: 60,
            wait_for_output_drain: false,
        }
    }
}

impl EngineConfig {
    /// Validates internal consistency. `supports_output_wait_writable` comes
    /// from detected platform caps, not this struct, so the
    /// `wait_for_output_drain` gate (§4.J `create`) is checked by the engine
    /// at `create` time once caps are known, not here.
    pub fn validate(&self) -> Result<(), ZrError> {
        self.drawlist_limits.validate()?;
        if self.tab_stop == 0 {
            return Err(ZrError::invalid_argument("tab_stop must be > 0"));
        }
        if self.out_max_bytes_per_frame < 64 {
            return Err(ZrError::invalid_argument("out_max_bytes_per_frame too small"));
        }
        if self.event_batch_max_bytes < 24 {
            return Err(ZrError::invalid_argument("event_batch_max_bytes smaller than batch header"));
        }
        if self.event_queue_capacity == 0 {
            return Err(ZrError::invalid_argument("event_queue_capacity must be > 0"));
        }
        if self.target_fps == 0 {
            return Err(ZrError::invalid_argument("target_fps must be > 0"));
        }
        Ok(())
    }
}

/// Mutable-after-create subset (§4.J `set_config`). Platform sub-config
/// (raw-mode behaviour, capability requests) is intentionally absent here —
/// attempts to change it go through `EngineConfig` and are rejected with
/// `UNSUPPORTED` by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub target_fps: u16,
    pub sync_update_enabled: bool,
    pub scroll_region_optimization: bool,
    pub wait_for_output_drain: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { target_fps: 60, sync_update_enabled: true, scroll_region_optimization: true, wait_for_output_drain: false }
    }
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<(), ZrError> {
        if self.target_fps == 0 {
            return Err(ZrError::invalid_argument("target_fps must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_engine_config_validates() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_max_cmds_is_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.drawlist_limits.dl_max_cmds = 0;
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.kind(), "INVALID_ARGUMENT");
    }

    #[test]
    fn default_runtime_config_validates() {
        RuntimeConfig::default().validate().unwrap();
    }
}
