//! Frame and event types for the `data:` stream format.

use serde::{Deserialize, Serialize};

/// Prefix marking a payload-bearing frame.
pub const DATA_PREFIX: &str = "data:";

/// Blank line separating frames.
pub const DELIMITER: &str = "\n\n";

/// One complete, delimiter-confirmed unit of the wire stream.
///
/// Produced only by [`FrameSplitter`](super::FrameSplitter) once the closing
/// blank line has been seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(String);

impl Frame {
    pub(crate) fn new(text: String) -> Self {
        Frame(text)
    }

    /// Raw frame text without the delimiter.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse into an event; `None` for frames without the `data:` prefix.
    pub fn to_event(&self) -> Option<Event> {
        parse_frame(&self.0)
    }
}

/// A parsed event handed to the consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Frame payload with the prefix and one following whitespace character removed
    pub data: String,
}

impl Event {
    pub fn new(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }
}

/// Parse one frame's text into an [`Event`].
///
/// Only text starting with `data:` yields an event. The prefix and a single
/// following whitespace character are stripped; everything else, embedded
/// newlines included, is kept verbatim.
///
/// ```
/// use postsource::sse::parse_frame;
///
/// assert_eq!(parse_frame("data: hello").unwrap().data, "hello");
/// assert_eq!(parse_frame("data:  two").unwrap().data, " two");
/// assert!(parse_frame("event: ping").is_none());
/// ```
pub fn parse_frame(text: &str) -> Option<Event> {
    let rest = text.strip_prefix(DATA_PREFIX)?;
    let data = rest.strip_prefix(char::is_whitespace).unwrap_or(rest);
    Some(Event::new(data))
}
