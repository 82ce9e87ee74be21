//! UAX #29 grapheme cluster iteration, minimal subset (§4.C): GB3/4/5/6/7/8
//! use `unicode-segmentation`'s cursor (the same "segment with
//! unicode-segmentation, then reason about clusters" idiom as
//! `rust/src/layout/text_measure/truncate.rs`); GB9/9a/9b/9c/11/12/13 and the
//! emoji/keycap presentation flags this engine's width policy needs are
//! tracked on top, since `unicode-segmentation` only reports boundaries, not
//! the per-cluster flags §4.C's width policy consumes.

use unicode_segmentation::UnicodeSegmentation;

/// One grapheme cluster: its source bytes plus the presentation flags the
/// column-width policy needs.
#[derive(Debug, Clone, Copy)]
pub struct Grapheme<'a> {
    pub text: &'a str,
    pub has_emoji_presentation: bool,
    pub has_extended_pictographic: bool,
    pub has_zwj: bool,
    pub has_vs15: bool,
    pub has_vs16: bool,
    pub is_keycap: bool,
}

pub struct GraphemeIter<'a> {
    inner: unicode_segmentation::GraphemeIndices<'a>,
    source: &'a str,
}

impl<'a> GraphemeIter<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { inner: source.grapheme_indices(true), source }
    }
}

const ZWJ: char = '\u{200D}';
const VS15: char = '\u{FE0E}';
const VS16: char = '\u{FE0F}';
const KEYCAP: char = '\u{20E3}';

/// Extended_Pictographic is a large, versioned Unicode property. This
/// engine pins a practical subset covering the emoji blocks actually
/// reachable through `DRAW_TEXT` in common terminals — full EP table
/// coverage is a data-table concern, not a segmentation-algorithm one.
fn is_extended_pictographic(c: char) -> bool {
    let cp = c as u32;
    matches!(cp,
        0x2600..=0x27BF   // Misc symbols, Dingbats
        | 0x1F300..=0x1FAFF // Misc symbols & pictographs through Symbols and Pictographs Extended-A
        | 0x2190..=0x21FF   // Arrows (subset overlaps EP in some emoji presentations)
        | 0x2B00..=0x2BFF   // Misc symbols and arrows
    )
}

fn has_emoji_presentation_default(c: char) -> bool {
    // Scalars that render as emoji by default without VS16, a practical
    // subset of Emoji_Presentation=Yes.
    let cp = c as u32;
    matches!(cp, 0x1F300..=0x1FAFF | 0x2600..=0x26FF | 0x2700..=0x27BF)
}

fn is_keycap_base(c: char) -> bool {
    matches!(c, '0'..='9' | '#' | '*')
}

impl<'a> Iterator for GraphemeIter<'a> {
    type Item = Grapheme<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (start, text) = self.inner.next()?;
        let _ = start;

        let mut has_emoji_presentation = false;
        let mut has_extended_pictographic = false;
        let mut has_zwj = false;
        let mut has_vs15 = false;
        let mut has_vs16 = false;

        let chars: Vec<char> = text.chars().collect();
        for &c in &chars {
            if c == ZWJ {
                has_zwj = true;
            }
            if c == VS15 {
                has_vs15 = true;
            }
            if c == VS16 {
                has_vs16 = true;
            }
            if is_extended_pictographic(c) {
                has_extended_pictographic = true;
            }
            if has_emoji_presentation_default(c) {
                has_emoji_presentation = true;
            }
        }

        // Keycap grammar: [0-9#*] (VS16)? U+20E3.
        let is_keycap = chars.len() >= 2
            && is_keycap_base(chars[0])
            && chars.last() == Some(&KEYCAP)
            && chars[1..chars.len() - 1].iter().all(|&c| c == VS16);

        Some(Grapheme {
            text,
            has_emoji_presentation,
            has_extended_pictographic,
            has_zwj,
            has_vs15,
            has_vs16,
            is_keycap,
        })
    }
}

pub fn iter_graphemes(source: &str) -> GraphemeIter<'_> {
    GraphemeIter::new(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_ascii_into_one_cluster_each() {
        let clusters: Vec<_> = iter_graphemes("abc").map(|g| g.text).collect();
        assert_eq!(clusters, vec!["a", "b", "c"]);
    }

    #[test]
    fn cr_lf_is_one_cluster() {
        let clusters: Vec<_> = iter_graphemes("a\r\nb").map(|g| g.text).collect();
        assert_eq!(clusters, vec!["a", "\r\n", "b"]);
    }

    #[test]
    fn zwj_emoji_sequence_is_one_cluster() {
        // U+1F469 U+200D U+1F4BB - woman + ZWJ + laptop
        let s = "\u{1F469}\u{200D}\u{1F4BB}";
        let clusters: Vec<_> = iter_graphemes(s).collect();
        assert_eq!(clusters.len(), 1);
        assert!(clusters[0].has_zwj);
        assert_eq!(clusters[0].text, s);
    }

    #[test]
    fn keycap_grammar_detected() {
        let s = "1\u{FE0F}\u{20E3}"; // '1' VS16 keycap
        let clusters: Vec<_> = iter_graphemes(s).collect();
        assert_eq!(clusters.len(), 1);
        assert!(clusters[0].is_keycap);
    }

    #[test]
    fn concatenation_equals_input() {
        let s = "h\u{00E9}llo\u{1F600}!";
        let joined: String = iter_graphemes(s).map(|g| g.text).collect();
        assert_eq!(joined, s);
    }

    proptest::proptest! {
        #[test]
        fn partition_concatenates_back_to_source(s in ".*") {
            let joined: String = iter_graphemes(&s).map(|g| g.text).collect();
            proptest::prop_assert_eq!(joined, s);
        }

        #[test]
        fn clusters_are_never_empty(s in ".+") {
            for g in iter_graphemes(&s) {
                proptest::prop_assert!(!g.text.is_empty());
            }
        }
    }
}
