//! Platform boundary (§4.I): one interface, two backends.
//!
//! Every call is non-blocking except `wait`/`wait_output_writable`, matching
//! §5's "suspension points" list. `wake()` is the one operation callable
//! from a thread other than the engine's — backends hand it out as a
//! cheaply `Clone`able [`WakeHandle`] rather than requiring the whole
//! backend to be `Sync`, since everything else here is only ever touched
//! from the single owning engine thread.

mod caps;
#[cfg(unix)]
pub mod posix;
#[cfg(windows)]
pub mod win32;

pub use caps::Caps;

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::ZrResult;
use crate::render::RawModeToggles;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub cols: u16,
    pub rows: u16,
}

/// A cheaply cloneable cross-thread wake callback (§4.I `wake()`, §9
/// "cooperative concurrency instead of threads").
#[derive(Clone)]
pub struct WakeHandle(Arc<dyn Fn() + Send + Sync>);

impl WakeHandle {
    pub fn new(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn wake(&self) {
        (self.0)()
    }
}

pub trait Platform {
    fn enter_raw(&mut self, toggles: RawModeToggles) -> ZrResult<()>;
    fn leave_raw(&mut self, toggles: RawModeToggles) -> ZrResult<()>;
    fn get_size(&self) -> Size;
    fn caps(&self) -> Caps;
    /// Non-blocking. `Ok(0)` means no bytes currently available.
    fn read_input(&mut self, buf: &mut [u8]) -> ZrResult<usize>;
    /// All-or-error; never a partial write on success.
    fn write_output(&mut self, bytes: &[u8]) -> ZrResult<()>;
    /// `Ok(true)` if input (or a wake) became ready; `Ok(false)` on timeout.
    fn wait(&mut self, timeout_ms: u32) -> ZrResult<bool>;
    fn wake_handle(&self) -> WakeHandle;
    fn wait_output_writable(&mut self, timeout_ms: u32) -> ZrResult<()>;
    fn now_ms(&self) -> u64;
}

#[cfg(unix)]
pub fn create(cfg: &EngineConfig) -> ZrResult<Box<dyn Platform>> {
    posix::PosixPlatform::create(cfg).map(|p| Box::new(p) as Box<dyn Platform>)
}

#[cfg(windows)]
pub fn create(cfg: &EngineConfig) -> ZrResult<Box<dyn Platform>> {
    win32::Win32Platform::create(cfg).map(|p| Box::new(p) as Box<dyn Platform>)
}

#[cfg(not(any(unix, windows)))]
pub fn create(_cfg: &EngineConfig) -> ZrResult<Box<dyn Platform>> {
    Err(crate::error::ZrError::unsupported("no platform backend for this target"))
}
