//! POSIX platform backend (§4.I): termios raw mode, non-blocking stdin,
//! self-pipe + SIGWINCH wake, `poll`-based `wait`.
//!
//! Grounded in `rust/src/pipeline/terminal.rs`'s termios flag set (extended
//! here with `VMIN=0 VTIME=0` so reads are non-blocking rather than
//! line-buffered-then-raw) and `rust/src/pipeline/wake.rs`'s wake concept,
//! reworked from a polling sleep into the self-pipe + `poll` pattern §9
//! calls for ("cooperative concurrency instead of threads", "message
//! passing, not busy-waiting").

use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::EngineConfig;
use crate::error::{ZrError, ZrResult};
use crate::render::RawModeToggles;

use super::caps::{apply_env_overrides, clamp_color_mode, detect_from_env, Caps};
use super::{Size, WakeHandle};

/// Number of concurrently-installed SIGWINCH wake slots. One per live
/// engine instance on this process; far more than any embedding host needs
/// (one engine per process is the norm) but keeps the slot table a fixed
/// array rather than something the signal handler would need to allocate.
const MAX_WAKE_SLOTS: usize = 8;

/// Lock-free slot table of registered wake-pipe write ends, written only
/// from `SIGWINCH` context. `-1` marks an empty slot. Async-signal-safety
/// requires this to be plain atomics and `libc::write` only — no locks, no
/// allocation, no `std::sync::Mutex`.
static WAKE_SLOTS: [AtomicI32; MAX_WAKE_SLOTS] = [
    AtomicI32::new(-1),
    AtomicI32::new(-1),
    AtomicI32::new(-1),
    AtomicI32::new(-1),
    AtomicI32::new(-1),
    AtomicI32::new(-1),
    AtomicI32::new(-1),
    AtomicI32::new(-1),
];

/// Per-slot overflow marker, set from signal context when a slot's wake
/// write hits `EAGAIN` (pipe full) so the next `wait` still reports ready
/// even if `drain_pipe` races the handler and drains the pending byte
/// before `poll` observes it (§4.I "on EAGAIN set an overflow marker per
/// slot so the next wait still wakes").
static WAKE_OVERFLOW: [AtomicBool; MAX_WAKE_SLOTS] = [
    AtomicBool::new(false),
    AtomicBool::new(false),
    AtomicBool::new(false),
    AtomicBool::new(false),
    AtomicBool::new(false),
    AtomicBool::new(false),
    AtomicBool::new(false),
    AtomicBool::new(false),
];

/// The previously-installed `SIGWINCH` handler (if any), chained after ours
/// runs. Captured once at first install and never reassigned afterward.
/// Holds the raw `sa_sigaction` function-pointer address, which on a
/// 64-bit target needs the full pointer width — an `AtomicI32` would
/// truncate it.
static PREV_HANDLER: AtomicUsize = AtomicUsize::new(0);
static HANDLER_INSTALLED: AtomicBool = AtomicBool::new(false);

extern "C" fn sigwinch_handler(sig: libc::c_int) {
    for (i, slot) in WAKE_SLOTS.iter().enumerate() {
        let fd = slot.load(Ordering::Relaxed);
        if fd >= 0 {
            // One byte, best-effort; a full pipe means a wake is already
            // pending, but `drain_pipe` can still race it away before the
            // next `poll`, so record the overflow for `wait` to check.
            unsafe {
                let byte: u8 = 1;
                let n = libc::write(fd, &byte as *const u8 as *const libc::c_void, 1);
                if n < 0 && io::Error::last_os_error().raw_os_error() == Some(libc::EAGAIN) {
                    WAKE_OVERFLOW[i].store(true, Ordering::Relaxed);
                }
            }
        }
    }
    let prev = PREV_HANDLER.load(Ordering::Relaxed);
    if prev != 0 {
        let f: extern "C" fn(libc::c_int) = unsafe { std::mem::transmute(prev) };
        f(sig);
    }
}

fn install_sigwinch_handler_once() {
    if HANDLER_INSTALLED.swap(true, Ordering::AcqRel) {
        return;
    }
    unsafe {
        let mut new_action: libc::sigaction = std::mem::zeroed();
        new_action.sa_sigaction = sigwinch_handler as usize;
        new_action.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&mut new_action.sa_mask);

        let mut old_action: libc::sigaction = std::mem::zeroed();
        libc::sigaction(libc::SIGWINCH, &new_action, &mut old_action);
        // Only a plain ignore/default handler is worth chaining to; a
        // foreign `sa_sigaction` pointer can't be called safely without
        // knowing its `SA_SIGINFO` calling convention.
        if old_action.sa_sigaction != libc::SIG_DFL && old_action.sa_sigaction != libc::SIG_IGN {
            PREV_HANDLER.store(old_action.sa_sigaction, Ordering::Relaxed);
        }
    }
}

fn register_wake_slot(write_fd: RawFd) -> Option<usize> {
    for (i, slot) in WAKE_SLOTS.iter().enumerate() {
        if slot.compare_exchange(-1, write_fd, Ordering::AcqRel, Ordering::Relaxed).is_ok() {
            // Clear any overflow marker left behind by a previous occupant
            // of this slot before it's handed to a new engine instance.
            WAKE_OVERFLOW[i].store(false, Ordering::Relaxed);
            return Some(i);
        }
    }
    None
}

fn unregister_wake_slot(index: usize) {
    WAKE_SLOTS[index].store(-1, Ordering::Release);
}

struct OwnedFd(RawFd);

impl OwnedFd {
    fn raw(&self) -> RawFd {
        self.0
    }
}

impl Drop for OwnedFd {
    fn drop(&mut self) {
        if self.0 >= 0 {
            unsafe {
                libc::close(self.0);
            }
        }
    }
}

pub struct PosixPlatform {
    /// The fd input is actually read from: stdin, or an owned `/dev/tty`
    /// fallback when stdin isn't a TTY (§4.I POSIX backend).
    input_fd: RawFd,
    owned_tty: Option<OwnedFd>,
    saved_termios: Option<libc::termios>,
    wake_read: OwnedFd,
    wake_write: Arc<AtomicI32>,
    wake_slot: usize,
    caps: Caps,
    start: Instant,
}

impl PosixPlatform {
    pub fn create(cfg: &EngineConfig) -> ZrResult<Self> {
        let pipe_only = matches!(std::env::var("ZIREAEL_POSIX_PIPE_MODE").as_deref(), Ok("1"));

        let stdin_fd = io::stdin().as_raw_fd();
        let is_tty = unsafe { libc::isatty(stdin_fd) } != 0;

        let (input_fd, owned_tty) = if is_tty || pipe_only {
            (stdin_fd, None)
        } else {
            match open_dev_tty() {
                Ok(fd) => (fd.raw(), Some(fd)),
                Err(_) => (stdin_fd, None),
            }
        };

        set_nonblocking(stdin_fd)?;
        if input_fd != stdin_fd {
            set_nonblocking(input_fd)?;
        }

        let (wake_read, wake_write) = make_self_pipe()?;
        let wake_write_fd = wake_write.raw();

        install_sigwinch_handler_once();
        let wake_slot = register_wake_slot(wake_write_fd)
            .ok_or_else(|| ZrError::platform("no free SIGWINCH wake slot (too many live engines)"))?;

        let mut caps = apply_env_overrides(detect_from_env());
        caps.color_mode = clamp_color_mode(cfg.requested_color_mode, caps.color_mode);
        caps.supports_output_wait_writable = true;

        Ok(Self {
            input_fd,
            owned_tty,
            saved_termios: None,
            wake_read,
            wake_write: Arc::new(AtomicI32::new(wake_write_fd)),
            wake_slot,
            caps,
            start: Instant::now(),
        })
    }
}

impl Drop for PosixPlatform {
    fn drop(&mut self) {
        unregister_wake_slot(self.wake_slot);
        if let Some(termios) = self.saved_termios {
            unsafe {
                libc::tcsetattr(self.input_fd, libc::TCSAFLUSH, &termios);
            }
        }
    }
}

impl super::Platform for PosixPlatform {
    fn enter_raw(&mut self, toggles: RawModeToggles) -> ZrResult<()> {
        if self.saved_termios.is_some() {
            return self.write_vt_sequence(|w| crate::render::enter_raw_sequence(w, toggles));
        }
        unsafe {
            let mut termios: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(self.input_fd, &mut termios) != 0 {
                return Err(ZrError::platform(format!("tcgetattr failed: {}", io::Error::last_os_error())));
            }
            self.saved_termios = Some(termios);

            termios.c_iflag &= !(libc::ICRNL | libc::IXON | libc::BRKINT | libc::INPCK | libc::ISTRIP);
            termios.c_oflag &= !libc::OPOST;
            termios.c_cflag |= libc::CS8;
            termios.c_lflag &= !(libc::ICANON | libc::ECHO | libc::ISIG | libc::IEXTEN);
            termios.c_cc[libc::VMIN] = 0;
            termios.c_cc[libc::VTIME] = 0;

            if libc::tcsetattr(self.input_fd, libc::TCSAFLUSH, &termios) != 0 {
                return Err(ZrError::platform(format!("tcsetattr failed: {}", io::Error::last_os_error())));
            }
        }
        self.write_vt_sequence(|w| crate::render::enter_raw_sequence(w, toggles))
    }

    fn leave_raw(&mut self, toggles: RawModeToggles) -> ZrResult<()> {
        self.write_vt_sequence(|w| crate::render::leave_raw_sequence(w, toggles))?;
        if let Some(termios) = self.saved_termios.take() {
            unsafe {
                if libc::tcsetattr(self.input_fd, libc::TCSAFLUSH, &termios) != 0 {
                    return Err(ZrError::platform(format!("tcsetattr restore failed: {}", io::Error::last_os_error())));
                }
            }
        }
        Ok(())
    }

    fn get_size(&self) -> Size {
        unsafe {
            let mut ws: libc::winsize = std::mem::zeroed();
            if libc::ioctl(io::stdout().as_raw_fd(), libc::TIOCGWINSZ, &mut ws) != 0 {
                return Size::default();
            }
            Size { cols: ws.ws_col, rows: ws.ws_row }
        }
    }

    fn caps(&self) -> Caps {
        self.caps
    }

    fn read_input(&mut self, buf: &mut [u8]) -> ZrResult<usize> {
        let mut f = unsafe { std::mem::ManuallyDrop::new(std::fs::File::from_raw_fd(self.input_fd)) };
        match f.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(ZrError::platform(format!("read_input failed: {e}"))),
        }
    }

    fn write_output(&mut self, bytes: &[u8]) -> ZrResult<()> {
        let stdout_fd = io::stdout().as_raw_fd();
        let mut written = 0usize;
        while written < bytes.len() {
            let n = unsafe {
                libc::write(stdout_fd, bytes[written..].as_ptr() as *const libc::c_void, bytes.len() - written)
            };
            if n < 0 {
                let err = io::Error::last_os_error();
                match err.raw_os_error() {
                    Some(libc::EINTR) => continue,
                    Some(libc::EAGAIN) => {
                        poll_one(stdout_fd, libc::POLLOUT, -1)?;
                        continue;
                    }
                    Some(libc::EPIPE) => return Err(ZrError::platform("broken pipe")),
                    _ => return Err(ZrError::platform(format!("write_output failed: {err}"))),
                }
            }
            written += n as usize;
        }
        Ok(())
    }

    fn wait(&mut self, timeout_ms: u32) -> ZrResult<bool> {
        let mut fds = [
            libc::pollfd { fd: self.input_fd, events: libc::POLLIN, revents: 0 },
            libc::pollfd { fd: self.wake_read.raw(), events: libc::POLLIN, revents: 0 },
        ];
        let timeout = if timeout_ms == u32::MAX { -1 } else { timeout_ms as i32 };
        let n = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout) };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                return Ok(true);
            }
            return Err(ZrError::platform(format!("poll failed: {err}")));
        }
        if fds[1].revents & libc::POLLIN != 0 {
            drain_pipe(self.wake_read.raw());
        }
        // A `SIGWINCH` that hit `EAGAIN` on its wake write still needs this
        // `wait` to report ready, even if `drain_pipe` raced the handler
        // and drained the pipe byte-for-byte before `poll` observed it.
        let overflow = WAKE_OVERFLOW[self.wake_slot].swap(false, Ordering::AcqRel);
        Ok(n > 0 || overflow)
    }

    fn wake_handle(&self) -> WakeHandle {
        let write_fd = self.wake_write.clone();
        WakeHandle::new(move || {
            let fd = write_fd.load(Ordering::Relaxed);
            if fd >= 0 {
                unsafe {
                    let byte: u8 = 1;
                    libc::write(fd, &byte as *const u8 as *const libc::c_void, 1);
                }
            }
        })
    }

    fn wait_output_writable(&mut self, timeout_ms: u32) -> ZrResult<()> {
        if !self.caps.supports_output_wait_writable {
            return Err(ZrError::unsupported("wait_output_writable"));
        }
        let stdout_fd = io::stdout().as_raw_fd();
        match poll_one(stdout_fd, libc::POLLOUT, timeout_ms as i32)? {
            true => Ok(()),
            false => Err(ZrError::limit("wait_output_writable_timeout_ms", "stdout did not become writable in time")),
        }
    }

    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl PosixPlatform {
    fn write_vt_sequence(&mut self, build: impl FnOnce(&mut crate::bytes::BoundedWriter)) -> ZrResult<()> {
        let mut w = crate::bytes::BoundedWriter::with_capacity(256);
        build(&mut w);
        self.write_output(w.as_bytes())
    }
}

fn open_dev_tty() -> io::Result<OwnedFd> {
    let path = std::ffi::CString::new("/dev/tty").unwrap();
    let fd = unsafe { libc::open(path.as_ptr(), libc::O_RDWR | libc::O_NONBLOCK) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(OwnedFd(fd))
}

fn set_nonblocking(fd: RawFd) -> ZrResult<()> {
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL, 0);
        if flags < 0 {
            return Err(ZrError::platform(format!("fcntl(F_GETFL) failed: {}", io::Error::last_os_error())));
        }
        if libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) < 0 {
            return Err(ZrError::platform(format!("fcntl(F_SETFL) failed: {}", io::Error::last_os_error())));
        }
    }
    Ok(())
}

fn make_self_pipe() -> ZrResult<(OwnedFd, OwnedFd)> {
    let mut fds = [0i32; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(ZrError::platform(format!("pipe() failed: {}", io::Error::last_os_error())));
    }
    set_nonblocking(fds[0])?;
    set_nonblocking(fds[1])?;
    Ok((OwnedFd(fds[0]), OwnedFd(fds[1])))
}

fn drain_pipe(fd: RawFd) {
    let mut buf = [0u8; 64];
    loop {
        let n = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        if n <= 0 {
            break;
        }
    }
}

fn poll_one(fd: RawFd, events: libc::c_short, timeout_ms: i32) -> ZrResult<bool> {
    let mut pfd = libc::pollfd { fd, events, revents: 0 };
    let n = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
    if n < 0 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINTR) {
            return Ok(false);
        }
        return Err(ZrError::platform(format!("poll failed: {err}")));
    }
    Ok(n > 0 && pfd.revents & events != 0)
}

// `std::fs::File::from_raw_fd` needs this trait in scope for the
// `ManuallyDrop` wrapper used in `read_input` (we never want `File::drop`
// to close a borrowed fd we don't own).
use std::os::fd::FromRawFd;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wake_slot_register_and_unregister_round_trips() {
        let slot = register_wake_slot(42).unwrap();
        assert_eq!(WAKE_SLOTS[slot].load(Ordering::Relaxed), 42);
        unregister_wake_slot(slot);
        assert_eq!(WAKE_SLOTS[slot].load(Ordering::Relaxed), -1);
    }

    #[test]
    fn register_wake_slot_clears_stale_overflow_marker() {
        let slot = register_wake_slot(43).unwrap();
        WAKE_OVERFLOW[slot].store(true, Ordering::Relaxed);
        unregister_wake_slot(slot);

        let reused = register_wake_slot(44).unwrap();
        assert!(!WAKE_OVERFLOW[reused].load(Ordering::Relaxed));
        unregister_wake_slot(reused);
    }
}
