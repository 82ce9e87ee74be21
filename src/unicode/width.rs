//! Column-width policy (§4.C): deterministic, locale-free. Raw per-scalar
//! width rides on `unicode-width`'s East-Asian-Width classification (the
//! same crate `packages/spark-tui/rust/src/layout/text_measure/width.rs`
//! leans on); the emoji/keycap/VS15/VS16 cluster-level policy on top of it
//! is this engine's own, since the spec pins a policy `unicode-width` alone
//! doesn't express.

use super::grapheme::Grapheme;
use unicode_width::UnicodeWidthChar;

/// Whether emoji clusters render narrow (1 col) or wide (2 cols). Backends
/// pick this from their detected/overridden terminal capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidthPolicy {
    EmojiNarrow,
    EmojiWide,
}

fn is_extend_or_control_zero_width(c: char) -> bool {
    let cp = c as u32;
    if cp == 0 {
        return true;
    }
    // ASCII controls (excluding the scalars the caller already special-cases
    // as line breaks before reaching width code) are zero width.
    if cp < 0x20 || cp == 0x7F {
        return true;
    }
    // Combining marks, ZWNJ/ZWJ, variation selectors, skin tone modifiers.
    matches!(cp,
        0x0300..=0x036F   // Combining Diacritical Marks
        | 0x200B..=0x200D // ZWSP, ZWNJ, ZWJ
        | 0xFE00..=0xFE0F // Variation Selectors
        | 0x1F3FB..=0x1F3FF // Emoji skin tone modifiers
    )
}

/// Raw per-scalar width: `0` for controls/Extend, `2` for East-Asian-Wide,
/// `1` otherwise.
pub fn scalar_width(c: char) -> u8 {
    if is_extend_or_control_zero_width(c) {
        return 0;
    }
    match c.width() {
        Some(w) => w as u8,
        None => 0,
    }
}

/// Per-cluster width under the given policy (§4.C).
pub fn cluster_width(g: &Grapheme<'_>, policy: WidthPolicy) -> u8 {
    let raw_max = g.text.chars().map(scalar_width).max().unwrap_or(0);

    let is_emoji = g.is_keycap
        || g.has_emoji_presentation
        || (g.has_extended_pictographic && (g.has_vs16 || g.has_zwj));

    let is_emoji = is_emoji && !(g.has_vs15 && !(g.has_vs16 || g.has_emoji_presentation || g.is_keycap));

    if is_emoji {
        let policy_width = match policy {
            WidthPolicy::EmojiNarrow => 1,
            WidthPolicy::EmojiWide => 2,
        };
        policy_width.max(raw_max)
    } else {
        raw_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unicode::grapheme::iter_graphemes;

    fn width_of(s: &str, policy: WidthPolicy) -> u8 {
        let g = iter_graphemes(s).next().unwrap();
        cluster_width(&g, policy)
    }

    #[test]
    fn ascii_is_width_one() {
        assert_eq!(width_of("a", WidthPolicy::EmojiWide), 1);
    }

    #[test]
    fn cjk_is_width_two() {
        assert_eq!(width_of("\u{4E2D}", WidthPolicy::EmojiWide), 2);
    }

    #[test]
    fn combining_mark_is_zero_width_scalar() {
        assert_eq!(scalar_width('\u{0301}'), 0);
    }

    #[test]
    fn zwj_emoji_sequence_width_two_under_wide_policy() {
        let s = "\u{1F469}\u{200D}\u{1F4BB}";
        assert_eq!(width_of(s, WidthPolicy::EmojiWide), 2);
    }

    #[test]
    fn zwj_emoji_sequence_width_one_under_narrow_policy() {
        let s = "\u{1F469}\u{200D}\u{1F4BB}";
        assert_eq!(width_of(s, WidthPolicy::EmojiNarrow), 1);
    }

    #[test]
    fn keycap_is_emoji_width() {
        let s = "1\u{FE0F}\u{20E3}";
        assert_eq!(width_of(s, WidthPolicy::EmojiWide), 2);
    }

    #[test]
    fn vs15_does_not_override_emoji_presentation_default() {
        // BLACK SUN WITH RAYS defaults to emoji presentation; VS15 is a weaker
        // signal than Emoji_Presentation so the cluster stays emoji-width.
        let s = "\u{2600}\u{FE0E}";
        assert_eq!(width_of(s, WidthPolicy::EmojiWide), 2);
    }

    #[test]
    fn vs15_forces_text_presentation_for_plain_pictographic() {
        // An arrow-range Extended_Pictographic scalar without default emoji
        // presentation and without VS16/ZWJ/keycap stays non-emoji regardless
        // of a trailing VS15.
        let s = "\u{2194}\u{FE0E}"; // LEFT RIGHT ARROW + text presentation selector
        assert_eq!(width_of(s, WidthPolicy::EmojiWide), 1);
    }
}
