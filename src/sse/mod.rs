//! Incremental event stream parser
//!
//! Turns a raw response body into events. The wire format is a sequence of
//! frames separated by a blank line:
//! - `data: <payload>` - payload-bearing frame
//! - `\n\n` - ends the frame
//! - anything else - ignored
//!
//! # Module structure
//! - `decoder` - UTF-8 decoding across chunk boundaries (Utf8Decoder)
//! - `framer` - delimiter state machine with a single tail (FrameSplitter)
//! - `events` - Frame and Event types, parse_frame
//! - `stream` - the combined pipeline (EventDecoder, event_stream)

mod decoder;
mod events;
mod framer;
mod stream;

// Re-export public types
pub use decoder::{InvalidUtf8, Utf8Decoder};
pub use events::{parse_frame, Event, Frame, DATA_PREFIX, DELIMITER};
pub use framer::{FrameSplitter, FramerState};
pub use stream::{event_stream, EventDecoder, EventStream};
