//! Line-based console output for job messages.

use std::io::{self, Write};

use super::message::{JobMessage, ScrapeResult};
use crate::error::StreamError;
use crate::sse::Event;

/// Line width for separators.
const LINE_WIDTH: usize = 60;

/// Status icons
pub mod icons {
    pub const SUCCESS: &str = "✓";
    pub const FAILURE: &str = "✗";
    pub const WARNING: &str = "⚠";
}

/// What the consumer should do after a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Keep reading
    Continue,
    /// The job reported a failure; stop reading
    Failed,
}

/// Renders job output to any writer.
///
/// ```text
/// > 开始爬取 https://example.com ...
/// > ✅ requests成功。
///
/// Example Domain
/// ════════════════════════════════════════════════════════════
/// https://example.com  (2025-03-14 09:26:53)
///
/// PARAGRAPHS (1)
/// ────────────────────────────────────────────────────────────
///   • This domain is for use in examples.
/// ```
#[derive(Debug)]
pub struct ConsoleRenderer<W: Write> {
    out: W,
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Print the line shown before any event arrives.
    pub fn started(&mut self, page_url: &str) -> io::Result<()> {
        writeln!(self.out, "> started scrape of {}", page_url)?;
        self.out.flush()
    }

    /// Render one event, falling back to the raw payload when it is not a job message.
    pub fn event(&mut self, event: &Event) -> io::Result<Outcome> {
        match JobMessage::parse(event) {
            Ok(message) => self.message(&message),
            Err(_) => {
                self.log_line(&event.data)?;
                Ok(Outcome::Continue)
            }
        }
    }

    /// Render each field of a message: log, then result, then error.
    pub fn message(&mut self, message: &JobMessage) -> io::Result<Outcome> {
        if let Some(line) = &message.log {
            self.log_line(line)?;
        }
        if let Some(result) = &message.result {
            self.result(result)?;
        }
        if let Some(error) = &message.error {
            self.job_error(error)?;
            return Ok(Outcome::Failed);
        }
        Ok(Outcome::Continue)
    }

    pub fn log_line(&mut self, line: &str) -> io::Result<()> {
        for part in line.lines() {
            writeln!(self.out, "> {}", part)?;
        }
        self.out.flush()
    }

    pub fn result(&mut self, result: &ScrapeResult) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "{}", result.title)?;
        writeln!(self.out, "{}", "═".repeat(LINE_WIDTH))?;
        match result.scraped_at() {
            Some(at) => writeln!(self.out, "{}  ({})", result.url, at)?,
            None => writeln!(self.out, "{}", result.url)?,
        }

        self.section("PARAGRAPHS", &result.paragraphs)?;
        self.section("LINKS", &result.links)?;

        if !result.tables.is_empty() {
            self.section_header("TABLES", result.tables.len())?;
            for (i, table) in result.tables.iter().enumerate() {
                write!(
                    self.out,
                    "  {}. {} rows x {} columns",
                    i + 1,
                    table.rows.len(),
                    table.column_count()
                )?;
                if table.headers.is_empty() {
                    writeln!(self.out)?;
                } else {
                    writeln!(self.out, ": {}", table.headers.join(" | "))?;
                }
            }
        }

        writeln!(self.out, "{}", "═".repeat(LINE_WIDTH))?;
        writeln!(
            self.out,
            "{} {} paragraphs, {} links, {} tables",
            icons::SUCCESS,
            result.paragraphs.len(),
            result.links.len(),
            result.tables.len()
        )?;
        self.out.flush()
    }

    pub fn job_error(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "{} error: {}", icons::FAILURE, message)?;
        self.out.flush()
    }

    /// Notice for a stream that ended with a failure.
    pub fn disconnected(&mut self, err: &StreamError) -> io::Result<()> {
        writeln!(
            self.out,
            "{} stream disconnected: {} [{}]",
            icons::WARNING,
            err.user_message(),
            err.error_code()
        )?;
        self.out.flush()
    }

    fn section_header(&mut self, title: &str, count: usize) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "{} ({})", title, count)?;
        writeln!(self.out, "{}", "─".repeat(LINE_WIDTH))
    }

    fn section(&mut self, title: &str, items: &[String]) -> io::Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        self.section_header(title, items.len())?;
        for item in items {
            writeln!(self.out, "  • {}", item)?;
        }
        Ok(())
    }
}
