//! One-scalar-at-a-time UTF-8 decoder with the locked invalid-sequence
//! policy from §4.C: on invalid input, consume exactly one byte and yield
//! `{scalar: U+FFFD, valid: false, size: 1}`. Never reads past the caller's
//! slice, always makes progress.

const REPLACEMENT: char = '\u{FFFD}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedScalar {
    pub scalar: char,
    pub valid: bool,
    pub size: usize,
}

fn invalid_one() -> DecodedScalar {
    DecodedScalar { scalar: REPLACEMENT, valid: false, size: 1 }
}

fn is_continuation(b: u8) -> bool {
    (b & 0xC0) == 0x80
}

/// Decode one scalar from the front of `bytes`. `bytes` must be non-empty.
pub fn decode_one(bytes: &[u8]) -> DecodedScalar {
    debug_assert!(!bytes.is_empty(), "decode_one called on empty input");
    let b0 = bytes[0];

    // ASCII fast path.
    if b0 < 0x80 {
        return DecodedScalar { scalar: b0 as char, valid: true, size: 1 };
    }

    let (len, min_scalar, mut scalar): (usize, u32, u32) = match b0 {
        0xC2..=0xDF => (2, 0x80, (b0 & 0x1F) as u32),
        0xE0..=0xEF => (3, 0x800, (b0 & 0x0F) as u32),
        0xF0..=0xF4 => (4, 0x10000, (b0 & 0x07) as u32),
        _ => return invalid_one(),
    };

    if bytes.len() < len {
        return invalid_one();
    }

    for &b in &bytes[1..len] {
        if !is_continuation(b) {
            return invalid_one();
        }
        scalar = (scalar << 6) | (b & 0x3F) as u32;
    }

    if scalar < min_scalar {
        // Overlong encoding.
        return invalid_one();
    }
    if (0xD800..=0xDFFF).contains(&scalar) {
        // Surrogate.
        return invalid_one();
    }
    if scalar > 0x10FFFF {
        return invalid_one();
    }

    match char::from_u32(scalar) {
        Some(c) => DecodedScalar { scalar: c, valid: true, size: len },
        None => invalid_one(),
    }
}

/// Decode every scalar in `bytes`, left to right. Consumes every byte.
pub fn decode_all(bytes: &[u8]) -> Vec<DecodedScalar> {
    let mut out = Vec::new();
    let mut off = 0;
    while off < bytes.len() {
        let d = decode_one(&bytes[off..]);
        off += d.size;
        out.push(d);
    }
    out
}

/// Decodes `bytes` under the locked invalid-sequence policy, replacing any
/// invalid sequence with U+FFFD instead of failing the whole string. This is
/// the policy callers outside the input parser (e.g. drawlist text) apply
/// too, since §4.C is "the UTF-8 layer on which the framebuffer's cell
/// semantics rest" for any text that ends up in a cell, not just input.
pub fn decode_lossy(bytes: &[u8]) -> String {
    decode_all(bytes).into_iter().map(|d| d.scalar).collect()
}
