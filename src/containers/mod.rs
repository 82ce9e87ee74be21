//! Containers (§2 B): deterministic bulk allocation, no per-frame heap churn.
//!
//! A fixed-capacity vec that fails with an explicit `LIMIT` error instead of
//! growing, a ring buffer for the bounded event FIFO, and an index-addressed
//! arena for resource tables / clip stack / damage rectangles (§9 "indexed
//! resources over pointers").

mod arena;
mod fixed_vec;
mod ring;

pub use arena::Arena;
pub use fixed_vec::FixedVec;
pub use ring::RingBuffer;
