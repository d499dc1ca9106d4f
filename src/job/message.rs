//! Messages emitted by the scrape job endpoint.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::sse::Event;

/// Format of [`ScrapeResult::time`].
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One event payload from the job.
///
/// A message normally carries exactly one of the fields, but all of them are
/// optional and any combination is accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobMessage {
    /// Progress line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
    /// Final result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ScrapeResult>,
    /// Job-level failure; no further messages follow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobMessage {
    /// Parse the JSON payload of an event.
    pub fn parse(event: &Event) -> Result<Self, serde_json::Error> {
        serde_json::from_str(&event.data)
    }

    pub fn log(line: impl Into<String>) -> Self {
        Self {
            log: Some(line.into()),
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_none() && self.result.is_none() && self.error.is_none()
    }
}

/// Extracted content of a scraped page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub paragraphs: Vec<String>,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub tables: Vec<Table>,
    /// Local time the page was scraped, in [`TIME_FORMAT`]
    #[serde(default)]
    pub time: String,
}

impl ScrapeResult {
    /// Parsed [`time`](Self::time), if it is in the expected format.
    pub fn scraped_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.time, TIME_FORMAT).ok()
    }
}

/// A table found on the page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Widest row, header row included.
    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0)
    }
}
