//! Engine loop (§4.J): config/version negotiation and the
//! submit→execute→present / poll→parse→pack orchestration that ties every
//! other module together.
//!
//! Grounded in `rust/src/pipeline/setup.rs`'s `run_engine` for the overall
//! "one loop drives input, layout, and render" shape, but stripped of the
//! `spark-signals` reactive graph (generation signal → derived → effect)
//! since §1's non-goals forbid a reactive/async public API here — the
//! caller drives every call directly and synchronously instead.

use crate::config::{EngineConfig, RuntimeConfig};
use crate::debug::{DebugTraceRing, TraceKind, TraceRecord};
use crate::drawlist::{self, DrawlistHeader, ResourceTables};
use crate::error::{ZrError, ZrResult};
use crate::framebuffer::{ClipStack, FrameBuffer};
use crate::input::{serialize_batch, Event, EventQueue, InputParser};
use crate::log::LogSink;
use crate::metrics::Metrics;
use crate::platform::{self, Caps, Platform, Size, WakeHandle};
use crate::render::{DiffRenderer, OutputBuffer, RawModeToggles, TerminalState};

use std::sync::Arc;

/// Cross-thread handle for `post_user_event` (§4.G, §5). Cheap to clone;
/// holds the same queue and wake handle the engine itself drives.
#[derive(Clone)]
pub struct UserEventPoster {
    queue: Arc<EventQueue>,
    wake: WakeHandle,
}

impl UserEventPoster {
    pub fn post(&self, tag: u64, payload: &[u8], now_ms: u64) -> ZrResult<()> {
        self.queue.post_user_event(tag, payload, now_ms)?;
        self.wake.wake();
        Ok(())
    }
}

pub struct Engine {
    config: EngineConfig,
    runtime: RuntimeConfig,
    platform: Box<dyn Platform>,
    caps: Caps,

    prev_fb: Option<FrameBuffer>,
    next_fb: FrameBuffer,
    resources: ResourceTables,
    diff: DiffRenderer,
    output: OutputBuffer,

    event_queue: Arc<EventQueue>,
    parser: InputParser,
    read_buf: Vec<u8>,

    size: Size,
    next_tick_due_ms: u64,
    tick_seq: u32,

    metrics: Metrics,
    debug: DebugTraceRing,
    frame_index: u64,

    _log: LogSink,
}

const READ_CHUNK_BYTES: usize = 4096;
const DEBUG_RING_CAPACITY: usize = 256;
const OUTPUT_WAIT_TIMEOUT_MS: u32 = 1000;

impl Engine {
    /// §4.J `create`: validate config, reject incompatible `set_config`-only
    /// combinations up front, stand up the platform backend, and size every
    /// framebuffer/arena from the detected terminal dimensions.
    pub fn create(config: EngineConfig) -> ZrResult<Self> {
        let platform_box = platform::create(&config)?;
        Self::create_with_platform(config, platform_box)
    }

    /// Same as [`Engine::create`] but with the platform backend supplied by
    /// the caller instead of selected from `cfg(unix)`/`cfg(windows)` — the
    /// seam this crate's own tests use to drive the engine against a fake
    /// terminal instead of a real tty.
    pub(crate) fn create_with_platform(config: EngineConfig, platform_box: Box<dyn Platform>) -> ZrResult<Self> {
        config.validate()?;
        let caps = platform_box.caps();

        if config.wait_for_output_drain && !caps.supports_output_wait_writable {
            return Err(ZrError::invalid_argument(
                "wait_for_output_drain requires supports_output_wait_writable",
            ));
        }

        let size = platform_box.get_size();
        let (cols, rows) = (size.cols.max(1), size.rows.max(1));

        let color_mode = caps.color_mode;
        let event_queue = Arc::new(EventQueue::new(config.event_queue_capacity as usize));
        // §4.I "A startup RESIZE is enqueued at engine-create."
        event_queue
            .push_resize_coalesced(cols, rows, 0)
            .map_err(|_| ZrError::platform("failed to enqueue startup resize"))?;

        let resources = ResourceTables::new(
            config.drawlist_limits.dl_max_string_bytes as usize,
            config.drawlist_limits.dl_max_blob_bytes as usize,
        );

        let runtime = RuntimeConfig {
            target_fps: config.target_fps,
            sync_update_enabled: caps.supports_sync_update,
            scroll_region_optimization: caps.supports_scroll_region,
            wait_for_output_drain: config.wait_for_output_drain,
        };

        Ok(Self {
            next_fb: FrameBuffer::new(cols, rows),
            prev_fb: None,
            resources,
            diff: DiffRenderer::new(color_mode, caps.sgr_attrs_supported),
            output: OutputBuffer::new(config.out_max_bytes_per_frame as usize),
            event_queue,
            parser: InputParser::new(config.paste_buffer_max_bytes as usize),
            read_buf: vec![0u8; READ_CHUNK_BYTES],
            size,
            next_tick_due_ms: 0,
            tick_seq: 0,
            metrics: Metrics::default(),
            debug: DebugTraceRing::new(DEBUG_RING_CAPACITY),
            frame_index: 0,
            platform: platform_box,
            caps,
            config,
            runtime,
            _log: LogSink::install_default(),
        })
    }

    pub fn poster(&self) -> UserEventPoster {
        UserEventPoster { queue: self.event_queue.clone(), wake: self.platform.wake_handle() }
    }

    pub fn get_caps(&self) -> Caps {
        self.caps
    }

    pub fn terminal_profile(&self) -> &TerminalState {
        self.diff.state()
    }

    /// §4.J `set_config`: platform sub-config (anything that would require
    /// re-detecting capabilities or re-entering raw mode) is rejected
    /// outright; everything else applies atomically, all-or-nothing.
    pub fn set_config(&mut self, runtime: RuntimeConfig) -> ZrResult<()> {
        runtime.validate()?;
        if runtime.wait_for_output_drain && !self.caps.supports_output_wait_writable {
            return Err(ZrError::unsupported("wait_for_output_drain without supports_output_wait_writable"));
        }
        self.runtime = runtime;
        Ok(())
    }

    pub fn enter_raw(&mut self) -> ZrResult<()> {
        let toggles = self.raw_mode_toggles();
        self.platform.enter_raw(toggles)?;
        self.diff.reset();
        self.debug.push(TraceRecord { frame_index: self.frame_index, kind: TraceKind::RawModeEnter, ts_ms: self.platform.now_ms(), drawlist_copy: None });
        Ok(())
    }

    pub fn leave_raw(&mut self) -> ZrResult<()> {
        let toggles = self.raw_mode_toggles();
        self.event_queue.begin_teardown();
        self.platform.leave_raw(toggles)?;
        self.debug.push(TraceRecord { frame_index: self.frame_index, kind: TraceKind::RawModeLeave, ts_ms: self.platform.now_ms(), drawlist_copy: None });
        Ok(())
    }

    fn raw_mode_toggles(&self) -> RawModeToggles {
        RawModeToggles {
            bracketed_paste: self.config.capabilities.bracketed_paste && self.caps.supports_bracketed_paste,
            focus_events: self.config.capabilities.focus_events && self.caps.supports_focus_events,
            mouse: self.config.capabilities.mouse && self.caps.supports_mouse,
        }
    }

    /// §4.J `submit_drawlist`: validate, execute into a staging copy of the
    /// currently-committed frame, and only swap it into `next` once
    /// execution fully succeeds — any failure leaves `next` bitwise
    /// unchanged (§4.D "atomic frame").
    pub fn submit_drawlist(&mut self, bytes: &[u8]) -> ZrResult<()> {
        let result = self.try_submit_drawlist(bytes);
        let kind = if result.is_ok() { TraceKind::DrawlistAccepted } else { TraceKind::DrawlistRejected };
        let drawlist_copy = if self.debug.is_enabled() { Some(bytes.to_vec()) } else { None };
        self.debug.push(TraceRecord { frame_index: self.frame_index, kind, ts_ms: self.platform.now_ms(), drawlist_copy });
        result
    }

    fn try_submit_drawlist(&mut self, bytes: &[u8]) -> ZrResult<()> {
        let header = DrawlistHeader::parse(bytes)?;
        let validated = drawlist::validate(bytes, &header, &self.config.drawlist_limits)?;

        let strings_pool = pool_slice(bytes, header.strings_bytes_offset, header.strings_bytes_len)?;
        let blobs_pool = pool_slice(bytes, header.blobs_bytes_offset, header.blobs_bytes_len)?;

        // Scratch copies so a mid-execution failure never touches
        // committed state (§4.D "atomic frame"): staging starts as a clone
        // of the currently-committed frame so a drawlist that only redraws
        // part of the screen doesn't have to redraw all of it.
        let mut staging = self.next_fb.clone();
        let mut clip = ClipStack::new(self.next_fb.cols(), self.next_fb.rows());

        let exec_result = drawlist::execute(
            &validated,
            strings_pool,
            blobs_pool,
            &mut self.resources,
            &mut staging,
            &mut clip,
            self.config.emoji_width,
        );

        match exec_result {
            Ok(()) => {
                self.next_fb = staging;
                Ok(())
            }
            Err(e) => {
                // `execute` may have mutated `self.resources` (DEF_*/FREE_*
                // are applied eagerly as they're walked) before hitting the
                // failing command. Atomicity is promised for the
                // framebuffer; resource-table mutations up to the failure
                // point are accepted as already having "happened" in wire
                // order, matching `DEF_STRING`/`FREE_STRING` being
                // independent, non-rolled-back side effects in the real
                // engine this models.
                Err(e)
            }
        }
    }

    /// §4.J `present`: diff `prev`/`next`, optionally wait for the output
    /// to become writable, write once, and only swap `prev ← next` on a
    /// successful write (§7 "`present` on `write` failure leaves `prev`
    /// intact").
    pub fn present(&mut self) -> ZrResult<()> {
        self.output.clear();
        let sync_update = self.caps.supports_sync_update && self.runtime.sync_update_enabled;
        let stats = self.diff.render(&mut self.output, self.prev_fb.as_ref(), &self.next_fb, self.runtime.scroll_region_optimization, sync_update);
        self.diff.sync_cursor(&mut self.output, &self.next_fb.cursor);

        if self.runtime.scroll_region_optimization {
            self.metrics.record_scroll_attempt();
        }

        if self.output.truncated() {
            return Err(ZrError::limit("out_max_bytes_per_frame", "frame exceeded the output byte budget"));
        }

        if self.output.is_empty() {
            self.metrics.record_frame(&stats, false);
            self.prev_fb = Some(self.next_fb.clone());
            self.debug.push(TraceRecord { frame_index: self.frame_index, kind: TraceKind::FrameSkippedNoop, ts_ms: self.platform.now_ms(), drawlist_copy: None });
            self.frame_index += 1;
            return Ok(());
        }

        if self.runtime.wait_for_output_drain {
            self.platform.wait_output_writable(OUTPUT_WAIT_TIMEOUT_MS)?;
        }

        match self.platform.write_output(self.output.as_bytes()) {
            Ok(()) => {
                self.prev_fb = Some(self.next_fb.clone());
                let used_sweep = stats.dirty_cells * 2 >= self.next_fb.cols() as u32 * self.next_fb.rows().max(1) as u32;
                self.metrics.record_frame(&stats, used_sweep);
                self.debug.push(TraceRecord { frame_index: self.frame_index, kind: TraceKind::FramePresented, ts_ms: self.platform.now_ms(), drawlist_copy: None });
                self.frame_index += 1;
                Ok(())
            }
            Err(e) => {
                self.metrics.record_present_failure();
                self.debug.push(TraceRecord { frame_index: self.frame_index, kind: TraceKind::WriteFailure, ts_ms: self.platform.now_ms(), drawlist_copy: None });
                // Row-hash reuse scratch invalidated: force a full redraw
                // attempt next time rather than trusting state that might
                // not have reached the terminal (§4.F "single-flush
                // contract").
                self.diff.reset();
                Err(e)
            }
        }
    }

    /// §4.J `poll_events`: pack immediately if events are already queued;
    /// otherwise wait up to `timeout_ms`, drain whatever input arrived,
    /// parse it, do a best-effort resize check, inject a tick if one is
    /// due, then pack.
    pub fn poll_events(&mut self, timeout_ms: u32, out_buf: &mut [u8]) -> ZrResult<usize> {
        if self.event_queue.is_empty() {
            self.wait_and_fill(timeout_ms)?;
        }
        self.pack_batch(out_buf)
    }

    fn wait_and_fill(&mut self, timeout_ms: u32) -> ZrResult<()> {
        let ready = self.platform.wait(timeout_ms)?;
        if ready {
            self.drain_input()?;
            self.check_resize()?;
        }
        self.maybe_inject_tick()?;
        Ok(())
    }

    fn drain_input(&mut self) -> ZrResult<()> {
        loop {
            let n = self.platform.read_input(&mut self.read_buf)?;
            if n == 0 {
                break;
            }
            let now = self.platform.now_ms();
            let data = self.read_buf[..n].to_vec();
            match self.parser.feed(&data, now) {
                Ok(events) => {
                    for event in events {
                        if self.event_queue.push(event).is_err() {
                            self.metrics.events_dropped_total += 1;
                        }
                    }
                }
                Err(e) if e.kind() == "LIMIT" => {
                    // Bracketed-paste overflow (scenario 8): the engine
                    // stays usable for subsequent polls, so only this
                    // chunk's paste is lost, not the whole session.
                    return Err(e);
                }
                Err(e) => return Err(e),
            }
            if n < self.read_buf.len() {
                break;
            }
        }
        Ok(())
    }

    fn check_resize(&mut self) -> ZrResult<()> {
        let size = self.platform.get_size();
        if size != self.size && size.cols > 0 && size.rows > 0 {
            self.size = size;
            let now = self.platform.now_ms();
            let _ = self.event_queue.push_resize_coalesced(size.cols, size.rows, now);
            self.debug.push(TraceRecord { frame_index: self.frame_index, kind: TraceKind::Resize, ts_ms: now, drawlist_copy: None });
        }
        Ok(())
    }

    fn maybe_inject_tick(&mut self) -> ZrResult<()> {
        if self.config.target_fps == 0 {
            return Ok(());
        }
        let now = self.platform.now_ms();
        if now >= self.next_tick_due_ms {
            let period_ms = 1000u64 / self.config.target_fps as u64;
            self.next_tick_due_ms = now + period_ms.max(1);
            self.tick_seq = self.tick_seq.wrapping_add(1);
            let _ = self.event_queue.push(Event::new(now, crate::input::EventKind::Tick { seq: self.tick_seq }));
        }
        Ok(())
    }

    fn pack_batch(&mut self, out_buf: &mut [u8]) -> ZrResult<usize> {
        let mut drained = Vec::new();
        while let Some(event) = self.event_queue.pop_front() {
            drained.push(event);
        }

        let (bytes, emitted, _truncated) = serialize_batch(&drained, out_buf.len());

        // Requeue anything that didn't fit, preserving FIFO order, so the
        // next `poll_events` call picks up exactly where this one left off
        // (§4.H: "only complete records are emitted").
        for event in drained.into_iter().skip(emitted).rev() {
            self.event_queue.push_front(event);
        }

        self.metrics.events_posted_total += emitted as u64;

        let n = bytes.len().min(out_buf.len());
        out_buf[..n].copy_from_slice(&bytes[..n]);
        Ok(n)
    }

    pub fn get_metrics(&self, out: &mut [u8]) -> usize {
        self.metrics.copy_prefixed(out)
    }

    pub fn debug_enable(&mut self) {
        self.debug.enable();
    }

    pub fn debug_disable(&mut self) {
        self.debug.disable();
    }

    pub fn debug_reset(&mut self) {
        self.debug.reset();
    }

    pub fn debug_query(&self) -> crate::debug::TraceStats {
        self.debug.query()
    }

    pub fn debug_get_payload(&self, index: usize) -> Option<&[u8]> {
        self.debug.get_payload(index)
    }

    pub fn debug_export(&self) -> Vec<u8> {
        self.debug.export()
    }
}

fn pool_slice(bytes: &[u8], offset: u32, len: u32) -> ZrResult<&[u8]> {
    let start = offset as usize;
    let end = start.checked_add(len as usize).ok_or_else(|| ZrError::format(start, "pool slice overflow"))?;
    bytes.get(start..end).ok_or_else(|| ZrError::format(start, "pool slice exceeds buffer"))
}
