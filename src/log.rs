//! Engine log sink (§1.1, §9 "no globals for log sink").
//!
//! The engine never prints directly. It emits `tracing` events at natural
//! seams (raw-mode transitions, capability detection, drawlist rejection,
//! scroll-region hits/misses, write failures, wake coalescing). A `LogSink`
//! is a value held by the engine, not a process-wide global, so tests and
//! embedding hosts can install their own without touching ambient state.

use std::sync::Once;

/// A swappable destination for the engine's internal log events.
///
/// The default sink installs a `tracing-subscriber` `fmt` layer with an
/// `EnvFilter` read from `ZIREAEL_LOG`. Hosts that already run their own
/// `tracing` subscriber should use [`LogSink::inherit`] instead, which installs
/// nothing and simply relies on whatever global subscriber the host already set.
pub struct LogSink {
    installs_default: bool,
}

static DEFAULT_SUBSCRIBER_INIT: Once = Once::new();

impl LogSink {
    /// Install a default `tracing-subscriber` filtered by `ZIREAEL_LOG`
    /// (falling back to `warn` when unset or invalid).
    ///
    /// Safe to call more than once; only the first call takes effect.
    pub fn install_default() -> Self {
        DEFAULT_SUBSCRIBER_INIT.call_once(|| {
            let filter = tracing_subscriber::EnvFilter::try_from_env("ZIREAEL_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init();
        });
        LogSink { installs_default: true }
    }

    /// Do not install any subscriber; assume the host already installed one.
    pub fn inherit() -> Self {
        LogSink { installs_default: false }
    }

    pub fn installs_default(&self) -> bool {
        self.installs_default
    }
}

impl Default for LogSink {
    fn default() -> Self {
        LogSink::install_default()
    }
}
