//! Packed event batch serializer (§4.H, §6.3).
//!
//! Bit-exact with the locked wire shape: 24-byte batch header, `{type,
//! size, time_ms, flags}` 20-byte record headers, 4-byte-aligned records.
//! Mirrors the drawlist side's `BoundedWriter`-based "no partial effects"
//! discipline (§4.A) — a record that wouldn't fully fit is never partially
//! written; the batch simply sets `TRUNCATED` and stops.

use crate::bytes::BoundedWriter;

use super::event::{Event, EventKind};

pub const MAGIC: u32 = 0x5645_525A;
pub const VERSION: u32 = 1;
pub const HEADER_SIZE: usize = 24;
pub const RECORD_HEADER_SIZE: usize = 20;

pub const FLAG_TRUNCATED: u32 = 1 << 0;

/// Serialize as many `events` as fit within `out_cap` bytes. Returns the
/// encoded batch and whether any events were left unemitted.
///
/// Consumed events (those that fit) are the prefix of `events`; the caller
/// is responsible for popping exactly that many off the front of the queue
/// once this returns, so re-polling picks up where this batch left off.
pub fn serialize(events: &[Event], out_cap: usize) -> (Vec<u8>, usize, bool) {
    let mut body = BoundedWriter::with_capacity(out_cap.saturating_sub(HEADER_SIZE));
    let mut emitted = 0usize;
    let mut truncated = false;

    for event in events {
        let record = encode_record(event);
        if body.write(&record) {
            emitted += 1;
        } else {
            truncated = true;
            break;
        }
    }

    let mut out = Vec::with_capacity(HEADER_SIZE + body.len());
    out.extend_from_slice(&MAGIC.to_le_bytes());
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&((HEADER_SIZE + body.len()) as u32).to_le_bytes());
    out.extend_from_slice(&(emitted as u32).to_le_bytes());
    let flags = if truncated { FLAG_TRUNCATED } else { 0 };
    out.extend_from_slice(&flags.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // reserved0
    out.extend_from_slice(body.as_bytes());

    (out, emitted, truncated)
}

fn encode_record(event: &Event) -> Vec<u8> {
    let record_type = event.kind.record_type();
    let mut payload = Vec::new();

    match &event.kind {
        EventKind::Key { code, modifiers, action } => {
            payload.extend_from_slice(&code.to_wire().to_le_bytes());
            payload.extend_from_slice(&modifiers.bits().to_le_bytes());
            payload.extend_from_slice(&action.to_wire().to_le_bytes());
            payload.extend_from_slice(&0u32.to_le_bytes());
        }
        EventKind::Text(c) => {
            payload.extend_from_slice(&(*c as u32).to_le_bytes());
            payload.extend_from_slice(&0u32.to_le_bytes());
        }
        EventKind::Paste(bytes) => {
            payload.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
            payload.extend_from_slice(&0u32.to_le_bytes());
            payload.extend_from_slice(bytes);
        }
        EventKind::Mouse { kind, button, x, y, modifiers } => {
            payload.extend_from_slice(&kind.to_wire().to_le_bytes());
            payload.extend_from_slice(&button.to_wire().to_le_bytes());
            payload.extend_from_slice(&(*x as u32).to_le_bytes());
            payload.extend_from_slice(&(*y as u32).to_le_bytes());
            payload.extend_from_slice(&modifiers.bits().to_le_bytes());
        }
        EventKind::Resize { cols, rows } => {
            payload.extend_from_slice(&(*cols as u32).to_le_bytes());
            payload.extend_from_slice(&(*rows as u32).to_le_bytes());
        }
        EventKind::Tick { seq } => {
            payload.extend_from_slice(&seq.to_le_bytes());
            payload.extend_from_slice(&0u32.to_le_bytes());
        }
        EventKind::User { tag, payload: bytes } => {
            payload.extend_from_slice(&tag.to_le_bytes());
            payload.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
            payload.extend_from_slice(&0u32.to_le_bytes());
            payload.extend_from_slice(bytes);
        }
        EventKind::FocusIn | EventKind::FocusOut => {}
    }

    while payload.len() % 4 != 0 {
        payload.push(0);
    }

    let size = (RECORD_HEADER_SIZE + payload.len()) as u32;
    let mut record = Vec::with_capacity(size as usize);
    record.extend_from_slice(&record_type.to_le_bytes());
    record.extend_from_slice(&size.to_le_bytes());
    record.extend_from_slice(&event.time_ms.to_le_bytes());
    record.extend_from_slice(&0u32.to_le_bytes()); // record flags, unused today
    record.extend_from_slice(&payload);
    record
}

/// Parse a serialized batch back into `(event_count, flags, record sizes)`
/// for round-trip testing; consumers in the host language would instead
/// walk records by `size` directly off the wire.
pub fn parse_header(bytes: &[u8]) -> Option<(u32, u32, u32, u32)> {
    if bytes.len() < HEADER_SIZE {
        return None;
    }
    let magic = u32::from_le_bytes(bytes[0..4].try_into().ok()?);
    if magic != MAGIC {
        return None;
    }
    let version = u32::from_le_bytes(bytes[4..8].try_into().ok()?);
    let total_size = u32::from_le_bytes(bytes[8..12].try_into().ok()?);
    let event_count = u32::from_le_bytes(bytes[12..16].try_into().ok()?);
    let flags = u32::from_le_bytes(bytes[16..20].try_into().ok()?);
    Some((version, total_size, event_count, flags))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::event::{KeyAction, KeyCode, Modifiers};

    #[test]
    fn scenario_6_event_batch_round_trip() {
        let events = vec![
            Event::new(1, EventKind::Key { code: KeyCode::Up, modifiers: Modifiers::empty(), action: KeyAction::Down }),
            Event::new(2, EventKind::Key { code: KeyCode::Up, modifiers: Modifiers::empty(), action: KeyAction::Up }),
            Event::new(3, EventKind::Resize { cols: 100, rows: 30 }),
        ];
        let (bytes, emitted, truncated) = serialize(&events, 4096);
        assert_eq!(emitted, 3);
        assert!(!truncated);
        let (version, total_size, event_count, flags) = parse_header(&bytes).unwrap();
        assert_eq!(version, 1);
        assert_eq!(total_size as usize, bytes.len());
        assert_eq!(event_count, 3);
        assert_eq!(flags & FLAG_TRUNCATED, 0);
    }

    #[test]
    fn records_are_four_byte_aligned() {
        let events = vec![Event::new(0, EventKind::Paste(b"abc".to_vec()))];
        let (bytes, _, _) = serialize(&events, 4096);
        let record_size = u32::from_le_bytes(bytes[HEADER_SIZE + 4..HEADER_SIZE + 8].try_into().unwrap());
        assert_eq!(record_size % 4, 0);
    }

    #[test]
    fn truncation_emits_only_complete_records_and_sets_flag() {
        let events = vec![
            Event::new(0, EventKind::Tick { seq: 0 }),
            Event::new(0, EventKind::Tick { seq: 1 }),
            Event::new(0, EventKind::Tick { seq: 2 }),
        ];
        // cap fits the 24-byte header plus exactly one 28-byte TICK record.
        let (bytes, emitted, truncated) = serialize(&events, HEADER_SIZE + 28);
        assert_eq!(emitted, 1);
        assert!(truncated);
        let (_, total_size, event_count, flags) = parse_header(&bytes).unwrap();
        assert_eq!(event_count, 1);
        assert_eq!(total_size as usize, bytes.len());
        assert_ne!(flags & FLAG_TRUNCATED, 0);
    }

    #[test]
    fn unknown_type_can_be_skipped_by_size() {
        let events = vec![Event::new(0, EventKind::FocusIn), Event::new(0, EventKind::Tick { seq: 7 })];
        let (bytes, _, _) = serialize(&events, 4096);
        let mut off = HEADER_SIZE;
        let mut seen_types = Vec::new();
        while off < bytes.len() {
            let rec_type = u32::from_le_bytes(bytes[off..off + 4].try_into().unwrap());
            let size = u32::from_le_bytes(bytes[off + 4..off + 8].try_into().unwrap()) as usize;
            seen_types.push(rec_type);
            off += size;
        }
        assert_eq!(off, bytes.len());
        assert_eq!(seen_types, vec![8, 6]);
    }
}
