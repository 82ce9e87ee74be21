//! Input layer (§2 G/H): streaming byte parser, bounded event queue, and the
//! packed event-batch wire format consumed by `poll_events`.

mod batch;
mod event;
mod parser;
mod queue;

pub use batch::{parse_header as parse_batch_header, serialize as serialize_batch, FLAG_TRUNCATED, HEADER_SIZE as BATCH_HEADER_SIZE, MAGIC as BATCH_MAGIC};
pub use event::{Event, EventKind, KeyAction, KeyCode, MouseButton, MouseKind, Modifiers};
pub use parser::InputParser;
pub use queue::EventQueue;
