//! Win32 platform backend (§4.I): VT-mode console, `ReadConsoleInputW` to
//! byte-stream translation, a dedicated wake event, `PeekNamedPipe` for
//! non-blocking reads when stdin is a pipe rather than a console.
//!
//! No teacher equivalent — `rust/` only ever shipped the POSIX backend.
//! Grounded in the `windows-sys` idiom used by
//! `other_examples/manifests/Alb-O-xeno/Cargo.toml` (raw `windows-sys`
//! FFI rather than a higher-level console crate, matching this backend's
//! need for byte-exact VT sequence emission).

use std::time::Instant;

use windows_sys::Win32::Foundation::{CloseHandle, HANDLE, WAIT_OBJECT_0};
use windows_sys::Win32::Storage::FileSystem::{ReadFile, WriteFile};
use windows_sys::Win32::System::Console::{
    GetConsoleMode, GetConsoleScreenBufferInfo, GetStdHandle, ReadConsoleInputW, SetConsoleMode,
    SetConsoleOutputCP, CONSOLE_SCREEN_BUFFER_INFO, ENABLE_EXTENDED_FLAGS,
    ENABLE_VIRTUAL_TERMINAL_INPUT, ENABLE_VIRTUAL_TERMINAL_PROCESSING, INPUT_RECORD, KEY_EVENT,
    STD_INPUT_HANDLE, STD_OUTPUT_HANDLE, WINDOW_BUFFER_SIZE_EVENT,
};
use windows_sys::Win32::System::Performance::{QueryPerformanceCounter, QueryPerformanceFrequency};
use windows_sys::Win32::System::Pipes::PeekNamedPipe;
use windows_sys::Win32::System::Threading::{CreateEventW, SetEvent, WaitForMultipleObjects};

use crate::config::EngineConfig;
use crate::error::{ZrError, ZrResult};
use crate::render::RawModeToggles;

use super::caps::{apply_env_overrides, clamp_color_mode, detect_from_env, Caps};
use super::{Size, WakeHandle};

const UTF8_CODEPAGE: u32 = 65001;

/// Candidate input-mode ladders tried in order at `create` time: each turns
/// off line input and local echo while keeping VT input enabled, falling
/// back to a narrower flag set if `SetConsoleMode` rejects the richer one
/// (§4.I "fall back through a ladder of input-mode candidates").
const INPUT_MODE_LADDER: &[u32] = &[
    ENABLE_VIRTUAL_TERMINAL_INPUT | ENABLE_EXTENDED_FLAGS,
    ENABLE_VIRTUAL_TERMINAL_INPUT,
    0,
];

struct SafeHandle(HANDLE);
unsafe impl Send for SafeHandle {}
unsafe impl Sync for SafeHandle {}

impl Drop for SafeHandle {
    fn drop(&mut self) {
        unsafe {
            CloseHandle(self.0);
        }
    }
}

pub struct Win32Platform {
    stdin: HANDLE,
    stdout: HANDLE,
    original_input_mode: u32,
    original_output_mode: u32,
    is_console: bool,
    wake_event: SafeHandle,
    caps: Caps,
    qpc_freq: i64,
    start_ticks: i64,
    start: Instant,
}

impl Win32Platform {
    pub fn create(cfg: &EngineConfig) -> ZrResult<Self> {
        unsafe {
            let stdin = GetStdHandle(STD_INPUT_HANDLE);
            let stdout = GetStdHandle(STD_OUTPUT_HANDLE);
            if stdin.is_null() || stdout.is_null() {
                return Err(ZrError::platform("GetStdHandle failed"));
            }

            let mut original_input_mode = 0u32;
            let is_console = GetConsoleMode(stdin, &mut original_input_mode) != 0;

            let mut original_output_mode = 0u32;
            GetConsoleMode(stdout, &mut original_output_mode);
            let new_output_mode = original_output_mode | ENABLE_VIRTUAL_TERMINAL_PROCESSING;
            if SetConsoleMode(stdout, new_output_mode) == 0 {
                return Err(ZrError::platform("SetConsoleMode(stdout) failed"));
            }
            SetConsoleOutputCP(UTF8_CODEPAGE);

            if is_console {
                let mut accepted = false;
                for candidate in INPUT_MODE_LADDER {
                    if SetConsoleMode(stdin, *candidate) != 0 {
                        accepted = true;
                        break;
                    }
                }
                if !accepted {
                    return Err(ZrError::platform("no input-mode candidate accepted by SetConsoleMode"));
                }
            }

            let wake_event = CreateEventW(std::ptr::null(), 0, 0, std::ptr::null());
            if wake_event.is_null() {
                return Err(ZrError::platform("CreateEventW failed"));
            }

            let mut qpc_freq = 0i64;
            QueryPerformanceFrequency(&mut qpc_freq);
            let mut start_ticks = 0i64;
            QueryPerformanceCounter(&mut start_ticks);

            let mut caps = apply_env_overrides(detect_from_env());
            caps.color_mode = clamp_color_mode(cfg.requested_color_mode, caps.color_mode);
            caps.supports_output_wait_writable = false;
            caps.supports_focus_events = is_console && caps.supports_focus_events;

            Ok(Self {
                stdin,
                stdout,
                original_input_mode,
                original_output_mode,
                is_console,
                wake_event: SafeHandle(wake_event),
                caps,
                qpc_freq,
                start_ticks,
                start: Instant::now(),
            })
        }
    }
}

impl Drop for Win32Platform {
    fn drop(&mut self) {
        unsafe {
            if self.is_console {
                SetConsoleMode(self.stdin, self.original_input_mode);
            }
            SetConsoleMode(self.stdout, self.original_output_mode);
        }
    }
}

impl super::Platform for Win32Platform {
    fn enter_raw(&mut self, toggles: RawModeToggles) -> ZrResult<()> {
        self.write_vt_sequence(|w| crate::render::enter_raw_sequence(w, toggles))
    }

    fn leave_raw(&mut self, toggles: RawModeToggles) -> ZrResult<()> {
        self.write_vt_sequence(|w| crate::render::leave_raw_sequence(w, toggles))
    }

    fn get_size(&self) -> Size {
        unsafe {
            let mut info: CONSOLE_SCREEN_BUFFER_INFO = std::mem::zeroed();
            if GetConsoleScreenBufferInfo(self.stdout, &mut info) == 0 {
                return Size::default();
            }
            let cols = (info.srWindow.Right - info.srWindow.Left + 1).max(0) as u16;
            let rows = (info.srWindow.Bottom - info.srWindow.Top + 1).max(0) as u16;
            Size { cols, rows }
        }
    }

    fn caps(&self) -> Caps {
        self.caps
    }

    fn read_input(&mut self, buf: &mut [u8]) -> ZrResult<usize> {
        if !self.is_console {
            return self.read_pipe(buf);
        }

        let mut count = 0u32;
        unsafe {
            if windows_sys::Win32::System::Console::GetNumberOfConsoleInputEvents(self.stdin, &mut count) == 0 {
                return Err(ZrError::platform("GetNumberOfConsoleInputEvents failed"));
            }
        }
        if count == 0 {
            return Ok(0);
        }

        let mut records: [INPUT_RECORD; 64] = unsafe { std::mem::zeroed() };
        let mut read = 0u32;
        let ok = unsafe {
            ReadConsoleInputW(self.stdin, records.as_mut_ptr(), records.len() as u32, &mut read)
        };
        if ok == 0 {
            return Err(ZrError::platform("ReadConsoleInputW failed"));
        }

        let mut out = Vec::new();
        for record in &records[..read as usize] {
            match record.EventType as u32 {
                KEY_EVENT => encode_key_event(unsafe { &record.Event.KeyEvent }, &mut out),
                WINDOW_BUFFER_SIZE_EVENT => {
                    // Surfaced to the caller through `get_size` on the next
                    // `poll_events` pass, not through the byte stream
                    // (§4.G: "RESIZE events are produced by the platform").
                }
                _ => {}
            }
        }

        let n = out.len().min(buf.len());
        buf[..n].copy_from_slice(&out[..n]);
        Ok(n)
    }

    fn write_output(&mut self, bytes: &[u8]) -> ZrResult<()> {
        let mut written = 0usize;
        while written < bytes.len() {
            let mut n = 0u32;
            let ok = unsafe {
                WriteFile(
                    self.stdout,
                    bytes[written..].as_ptr(),
                    (bytes.len() - written) as u32,
                    &mut n,
                    std::ptr::null_mut(),
                )
            };
            if ok == 0 {
                return Err(ZrError::platform("WriteFile failed"));
            }
            if n == 0 {
                return Err(ZrError::platform("WriteFile wrote zero bytes"));
            }
            written += n as usize;
        }
        Ok(())
    }

    fn wait(&mut self, timeout_ms: u32) -> ZrResult<bool> {
        let handles = [self.stdin, self.wake_event.0];
        let timeout = if timeout_ms == u32::MAX { u32::MAX } else { timeout_ms };
        let result = unsafe { WaitForMultipleObjects(handles.len() as u32, handles.as_ptr(), 0, timeout) };
        if result == windows_sys::Win32::Foundation::WAIT_TIMEOUT {
            return Ok(false);
        }
        if result == WAIT_OBJECT_0 || result == WAIT_OBJECT_0 + 1 {
            return Ok(true);
        }
        Err(ZrError::platform("WaitForMultipleObjects failed"))
    }

    fn wake_handle(&self) -> WakeHandle {
        let event = self.wake_event.0 as usize;
        WakeHandle::new(move || unsafe {
            SetEvent(event as HANDLE);
        })
    }

    fn wait_output_writable(&mut self, _timeout_ms: u32) -> ZrResult<()> {
        Err(ZrError::unsupported("wait_output_writable"))
    }

    fn now_ms(&self) -> u64 {
        if self.qpc_freq > 0 {
            let mut now = 0i64;
            unsafe {
                QueryPerformanceCounter(&mut now);
            }
            (((now - self.start_ticks) as i128 * 1000) / self.qpc_freq as i128) as u64
        } else {
            self.start.elapsed().as_millis() as u64
        }
    }
}

impl Win32Platform {
    fn write_vt_sequence(&mut self, build: impl FnOnce(&mut crate::bytes::BoundedWriter)) -> ZrResult<()> {
        let mut w = crate::bytes::BoundedWriter::with_capacity(256);
        build(&mut w);
        self.write_output(w.as_bytes())
    }

    /// Non-blocking read for pipe-backed stdin (e.g. under a test harness
    /// or when launched with redirected input), using `PeekNamedPipe` to
    /// avoid the blocking `ReadFile` a pipe handle would otherwise require
    /// (§4.I "For pipe stdin, use `PeekNamedPipe`").
    fn read_pipe(&mut self, buf: &mut [u8]) -> ZrResult<usize> {
        let mut available = 0u32;
        let peeked = unsafe {
            PeekNamedPipe(self.stdin, std::ptr::null_mut(), 0, std::ptr::null_mut(), &mut available, std::ptr::null_mut())
        };
        if peeked == 0 {
            // Not actually a pipe (e.g. redirected from a regular file);
            // fall through to a direct read attempt.
        } else if available == 0 {
            return Ok(0);
        }

        let want = (buf.len() as u32).min(available.max(buf.len() as u32));
        let mut n = 0u32;
        let ok = unsafe { ReadFile(self.stdin, buf.as_mut_ptr(), want.max(1), &mut n, std::ptr::null_mut()) };
        if ok == 0 {
            return Err(ZrError::platform("ReadFile failed"));
        }
        Ok(n as usize)
    }
}

/// Translates a single `KEY_EVENT_RECORD` into the same VT byte vocabulary
/// the POSIX backend's input parser already understands — arrows, Esc, Tab,
/// Backspace as their canonical escape sequences, everything else as raw
/// UTF-16-decoded UTF-8, repeated `wRepeatCount` times (§4.I "honouring
/// `wRepeatCount`").
fn encode_key_event(event: &windows_sys::Win32::System::Console::KEY_EVENT_RECORD, out: &mut Vec<u8>) {
    if event.bKeyDown == 0 {
        return;
    }
    let repeat = event.wRepeatCount.max(1);
    for _ in 0..repeat {
        let vk = event.wVirtualKeyCode as i32;
        match vk {
            0x25 => out.extend_from_slice(b"\x1b[D"), // VK_LEFT
            0x26 => out.extend_from_slice(b"\x1b[A"), // VK_UP
            0x27 => out.extend_from_slice(b"\x1b[C"), // VK_RIGHT
            0x28 => out.extend_from_slice(b"\x1b[B"), // VK_DOWN
            0x24 => out.extend_from_slice(b"\x1b[H"), // VK_HOME
            0x23 => out.extend_from_slice(b"\x1b[F"), // VK_END
            0x2E => out.extend_from_slice(b"\x1b[3~"), // VK_DELETE
            0x2D => out.extend_from_slice(b"\x1b[2~"), // VK_INSERT
            _ => {
                let ch = unsafe { event.uChar.UnicodeChar };
                if ch != 0 {
                    encode_utf16_unit(ch, out);
                }
            }
        }
    }
}

/// Decodes one UTF-16 code unit into UTF-8, buffering a lone high surrogate
/// until its matching low surrogate arrives (Win32 delivers surrogate pairs
/// as two separate `KEY_EVENT` records).
fn encode_utf16_unit(unit: u16, out: &mut Vec<u8>) {
    thread_local! {
        static PENDING_HIGH: std::cell::Cell<Option<u16>> = std::cell::Cell::new(None);
    }
    PENDING_HIGH.with(|pending| {
        if let Some(high) = pending.get() {
            pending.set(None);
            let units = [high, unit];
            if let Some(s) = char::decode_utf16(units.iter().copied()).next().and_then(|r| r.ok()) {
                let mut buf = [0u8; 4];
                out.extend_from_slice(s.encode_utf8(&mut buf).as_bytes());
            }
            return;
        }
        if (0xD800..=0xDBFF).contains(&unit) {
            pending.set(Some(unit));
            return;
        }
        if let Some(c) = char::from_u32(unit as u32) {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        }
    });
}
