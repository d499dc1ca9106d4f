//! Consumer side of the scrape job stream.
//!
//! Each event carries a JSON object with a `log` line, a final `result`, or
//! an `error`. This module parses those and renders them for a terminal.

mod message;
mod render;

pub use message::{JobMessage, ScrapeResult, Table, TIME_FORMAT};
pub use render::{icons, ConsoleRenderer, Outcome};
