//! `zireael` — an embeddable terminal UI rendering engine.
//!
//! A caller drives it with two independent flows: push a binary drawlist in
//! ([`Engine::submit_drawlist`]) and it diffs and paints the minimal VT byte
//! sequence ([`Engine::present`]); pull terminal input out
//! ([`Engine::poll_events`]) as a packed wire batch. Everything else —
//! capability negotiation, raw-mode transitions, metrics, debug tracing — is
//! reachable off the one [`Engine`] handle.
//!
//! Grounded in `rust/src/lib.rs`'s module-re-export shape; the teacher's
//! reactive `spark-signals` surface (`Signal`, `Effect`, `run_engine`) has no
//! counterpart here — callers step this engine synchronously instead.

pub mod bytes;
pub mod config;
pub mod containers;
pub mod debug;
pub mod drawlist;
pub mod engine;
pub mod error;
pub mod framebuffer;
pub mod input;
pub mod log;
pub mod metrics;
pub mod platform;
pub mod render;
pub mod style;
pub mod unicode;

pub use config::{CapabilityRequest, DrawlistLimits, EngineConfig, RuntimeConfig};
pub use debug::{DebugTraceRing, TraceKind, TraceRecord, TraceStats};
pub use engine::{Engine, UserEventPoster};
pub use error::{ZrError, ZrResult};
pub use input::{Event, EventKind, KeyAction, KeyCode, MouseButton, MouseKind, Modifiers};
pub use metrics::Metrics;
pub use platform::{Caps, Size};
pub use render::ColorMode;
pub use style::{Rgb, Style, StyleAttrs};
pub use unicode::WidthPolicy;
