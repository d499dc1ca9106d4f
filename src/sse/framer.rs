//! Incremental frame splitting.

use super::events::{Frame, DELIMITER};

/// Framer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramerState {
    /// Accumulating text, looking for the next blank line
    #[default]
    SeekingDelimiter,
    /// The body ended; the tail was discarded and input is ignored
    Finished,
}

/// Splits decoded text into delimiter-confirmed frames.
///
/// Holds a single unconsumed tail between calls. After every
/// [`push`](Self::push) the tail contains no delimiter, so it is at most one
/// partial frame. The tail is never emitted: a frame exists only once its
/// closing blank line has arrived.
///
/// ```
/// use postsource::sse::FrameSplitter;
///
/// let mut framer = FrameSplitter::new();
/// assert!(framer.push("data: he").is_empty());
/// let frames = framer.push("llo\n\ndata: b");
/// assert_eq!(frames.len(), 1);
/// assert_eq!(frames[0].as_str(), "data: hello");
/// assert_eq!(framer.tail(), "data: b");
/// ```
#[derive(Debug, Default)]
pub struct FrameSplitter {
    state: FramerState,
    tail: String,
}

impl FrameSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FramerState {
        self.state
    }

    /// Text received but not yet confirmed as a frame.
    pub fn tail(&self) -> &str {
        &self.tail
    }

    /// Append text and return every frame it completes, in order.
    pub fn push(&mut self, text: &str) -> Vec<Frame> {
        if self.state == FramerState::Finished || text.is_empty() {
            return Vec::new();
        }

        // The tail holds no delimiter, but one may straddle the old tail's
        // last byte and the new text.
        let mut search_from = if self.tail.ends_with('\n') {
            self.tail.len() - 1
        } else {
            self.tail.len()
        };
        self.tail.push_str(text);

        let mut frames = Vec::new();
        let mut start = 0;
        while let Some(pos) = self.tail[search_from..].find(DELIMITER) {
            let end = search_from + pos;
            frames.push(Frame::new(self.tail[start..end].to_string()));
            start = end + DELIMITER.len();
            search_from = start;
        }

        if start > 0 {
            self.tail.drain(..start);
        }
        frames
    }

    /// End of input. Discards the tail and returns how many bytes it held.
    pub fn finish(&mut self) -> usize {
        self.state = FramerState::Finished;
        let dropped = self.tail.len();
        self.tail.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(frames: &[Frame]) -> Vec<&str> {
        frames.iter().map(Frame::as_str).collect()
    }

    #[test]
    fn test_single_frame() {
        let mut framer = FrameSplitter::new();
        let frames = framer.push("data: hello\n\n");
        assert_eq!(texts(&frames), vec!["data: hello"]);
        assert_eq!(framer.tail(), "");
    }

    #[test]
    fn test_two_frames_one_push() {
        let mut framer = FrameSplitter::new();
        let frames = framer.push("data: a\n\ndata: b\n\n");
        assert_eq!(texts(&frames), vec!["data: a", "data: b"]);
    }

    #[test]
    fn test_delimiter_split_across_pushes() {
        let mut framer = FrameSplitter::new();
        assert!(framer.push("data: a\n").is_empty());
        assert_eq!(framer.tail(), "data: a\n");
        let frames = framer.push("\ndata: b");
        assert_eq!(texts(&frames), vec!["data: a"]);
        assert_eq!(framer.tail(), "data: b");
    }

    #[test]
    fn test_well_formed_tail_is_not_a_frame() {
        let mut framer = FrameSplitter::new();
        assert!(framer.push("data: complete-looking").is_empty());
        assert_eq!(framer.finish(), "data: complete-looking".len());
        assert_eq!(framer.tail(), "");
    }

    #[test]
    fn test_consecutive_blank_lines_yield_empty_frames() {
        let mut framer = FrameSplitter::new();
        let frames = framer.push("data: a\n\n\n\ndata: b\n\n");
        assert_eq!(texts(&frames), vec!["data: a", "", "data: b"]);
    }

    #[test]
    fn test_three_newlines_leave_one_in_tail() {
        let mut framer = FrameSplitter::new();
        let frames = framer.push("\n\n\n");
        assert_eq!(texts(&frames), vec![""]);
        assert_eq!(framer.tail(), "\n");
        let frames = framer.push("\n");
        assert_eq!(texts(&frames), vec![""]);
        assert_eq!(framer.tail(), "");
    }

    #[test]
    fn test_multibyte_tail_then_delimiter() {
        let mut framer = FrameSplitter::new();
        assert!(framer.push("data: 日本").is_empty());
        let frames = framer.push("\n\n");
        assert_eq!(texts(&frames), vec!["data: 日本"]);
    }

    #[test]
    fn test_crlf_is_not_a_delimiter() {
        let mut framer = FrameSplitter::new();
        assert!(framer.push("data: a\r\n\r\n").is_empty());
    }

    #[test]
    fn test_push_after_finish_is_ignored() {
        let mut framer = FrameSplitter::new();
        framer.finish();
        assert_eq!(framer.state(), FramerState::Finished);
        assert!(framer.push("data: late\n\n").is_empty());
    }

    #[test]
    fn test_every_byte_split_point() {
        let input = "data: one\n\n: note\n\ndata: two\n\n";
        for split in 0..=input.len() {
            let mut framer = FrameSplitter::new();
            let mut frames = framer.push(&input[..split]);
            frames.extend(framer.push(&input[split..]));
            assert_eq!(
                texts(&frames),
                vec!["data: one", ": note", "data: two"],
                "split at {}",
                split
            );
        }
    }
}
