//! Measurement & greedy wrapping (§4.C), grounded in
//! `rust/src/layout/text_measure/*` and
//! `packages/spark-tui/rust/src/layout/text_measure/wrap.rs`'s grapheme-safe
//! truncation idiom, generalized into full greedy line wrapping.

use super::grapheme::iter_graphemes;
use super::width::{cluster_width, WidthPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Measurement {
    pub lines: usize,
    pub max_cols: usize,
}

/// Count hard-break lines (`LF`, `CR`, `CRLF`) and the max columns per line,
/// expanding tabs to the next multiple of `tab_stop`.
pub fn measure(text: &str, tab_stop: u16, policy: WidthPolicy) -> Measurement {
    assert!(tab_stop > 0, "tab_stop must be > 0");
    let mut lines = 1usize;
    let mut max_cols = 0usize;
    let mut cur_cols = 0usize;

    let mut byte_off = 0usize;

    for g in iter_graphemes(text) {
        if g.text == "\r\n" || g.text == "\n" || g.text == "\r" {
            lines += 1;
            max_cols = max_cols.max(cur_cols);
            cur_cols = 0;
            byte_off += g.text.len();
            continue;
        }
        if g.text == "\t" {
            let stop = tab_stop as usize;
            let next_stop = ((cur_cols / stop) + 1) * stop;
            cur_cols = next_stop;
            byte_off += g.text.len();
            continue;
        }
        cur_cols += cluster_width(&g, policy) as usize;
        byte_off += g.text.len();
    }

    max_cols = max_cols.max(cur_cols);
    Measurement { lines, max_cols }
}

/// Greedy wrap: returns byte offsets where each line starts (offset 0 always
/// included), per the rules in §4.C.
pub fn wrap_lines(text: &str, max_cols: usize, policy: WidthPolicy) -> Vec<usize> {
    assert!(max_cols > 0, "max_cols must be > 0");
    let mut starts = vec![0usize];
    let mut line_cols = 0usize;
    let mut last_ws_break: Option<(usize, usize)> = None; // (byte offset after ws, cols consumed up to there)
    let mut byte_off = 0usize;

    for g in iter_graphemes(text) {
        let w = cluster_width(&g, policy) as usize;
        let is_ws = g.text == " " || g.text == "\t";

        if line_cols + w > max_cols {
            if let Some((break_at, _)) = last_ws_break.take() {
                starts.push(break_at);
                line_cols = measure_partial_cols(text, break_at, byte_off, policy);
            } else {
                // No whitespace to break at (or a single grapheme wider than
                // max_cols): break before the current grapheme, forcing
                // progress even when it can never fit.
                starts.push(byte_off);
                line_cols = 0;
            }
            last_ws_break = None;
        }

        if is_ws {
            let overflow_if_kept = line_cols + w > max_cols;
            if overflow_if_kept {
                // Consume the whitespace and start a new line after it.
                byte_off += g.text.len();
                starts.push(byte_off);
                line_cols = 0;
                last_ws_break = None;
                continue;
            }
            line_cols += w;
            byte_off += g.text.len();
            last_ws_break = Some((byte_off, line_cols));
            continue;
        }

        line_cols += w;
        byte_off += g.text.len();
    }

    starts
}

fn measure_partial_cols(text: &str, from: usize, to: usize, policy: WidthPolicy) -> usize {
    if from >= to || to > text.len() {
        return 0;
    }
    let slice = &text[from..to];
    iter_graphemes(slice).map(|g| cluster_width(&g, policy) as usize).sum()
}
