//! Unicode layer (§4.C): UTF-8 decode, grapheme segmentation, column-width
//! policy, measurement & greedy wrapping. Locale-free, no `wcwidth`
//! dependency — everything here is deterministic per the pinned Unicode
//! 15.1.0 policy.

mod grapheme;
mod utf8;
mod width;
mod wrap;

pub use grapheme::{iter_graphemes, Grapheme, GraphemeIter};
pub use utf8::{decode_lossy, decode_one, DecodedScalar};
pub use width::{cluster_width, scalar_width, WidthPolicy};
pub use wrap::{measure, wrap_lines, Measurement};
