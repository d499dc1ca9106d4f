//! Byte stream to event stream pipeline.

use std::collections::VecDeque;
use std::pin::Pin;

use futures::stream::{self, Stream, StreamExt};
use tracing::{debug, trace};

use super::decoder::Utf8Decoder;
use super::events::Event;
use super::framer::FrameSplitter;
use crate::error::{StreamError, StreamResult};
use crate::traits::ByteStream;

/// Boxed stream of parsed events.
pub type EventStream = Pin<Box<dyn Stream<Item = StreamResult<Event>> + Send>>;

/// Synchronous decode-and-frame stage shared by [`event_stream`] and the
/// callback client.
#[derive(Debug, Default)]
pub struct EventDecoder {
    utf8: Utf8Decoder,
    framer: FrameSplitter,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw chunk, appending the events it completes to `out` in order.
    ///
    /// Frames without the `data:` prefix are dropped. On invalid UTF-8 the
    /// events completed before the bad byte are still appended, then the
    /// error is returned.
    pub fn feed<E: Extend<Event>>(&mut self, chunk: &[u8], out: &mut E) -> StreamResult<()> {
        let (text, invalid) = self.utf8.decode_prefix(chunk);

        out.extend(self.framer.push(&text).into_iter().filter_map(|frame| {
            let event = frame.to_event();
            if event.is_none() {
                trace!("Ignoring frame without data prefix ({} bytes)", frame.as_str().len());
            }
            event
        }));

        match invalid {
            Some(err) => Err(StreamError::Decode { offset: err.offset }),
            None => Ok(()),
        }
    }

    /// End of body. Drops any unterminated tail and returns its size in bytes.
    pub fn finish(&mut self) -> usize {
        let dropped = self.framer.finish() + self.utf8.finish();
        if dropped > 0 {
            debug!("Discarding {} bytes of unterminated frame at end of stream", dropped);
        }
        dropped
    }
}

struct PipelineState {
    body: ByteStream,
    decoder: EventDecoder,
    ready: VecDeque<Event>,
    /// Failure to yield once `ready` is drained
    failed: Option<StreamError>,
    done: bool,
}

/// Turn a response body into a stream of events.
///
/// The stream is lazy: nothing is read until it is polled. It ends with
/// `None` at end of body, or right after yielding the first error.
///
/// ```no_run
/// use futures::StreamExt;
/// use postsource::adapters::ReqwestHttpClient;
/// use postsource::models::StreamRequest;
/// use postsource::sse::event_stream;
/// use postsource::traits::HttpClient;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let http = ReqwestHttpClient::new();
/// let body = http.stream(&StreamRequest::post("http://127.0.0.1:5000/stream")).await?;
/// let mut events = event_stream(body);
/// while let Some(event) = events.next().await {
///     println!("{}", event?.data);
/// }
/// # Ok(())
/// # }
/// ```
pub fn event_stream(body: ByteStream) -> EventStream {
    let state = PipelineState {
        body,
        decoder: EventDecoder::new(),
        ready: VecDeque::new(),
        failed: None,
        done: false,
    };

    let events = stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.ready.pop_front() {
                return Some((Ok(event), state));
            }
            if let Some(err) = state.failed.take() {
                return Some((Err(err), state));
            }
            if state.done {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    debug!("Received chunk of {} bytes", chunk.len());
                    if let Err(err) = state.decoder.feed(&chunk, &mut state.ready) {
                        state.failed = Some(err);
                        state.done = true;
                    }
                }
                Some(Err(err)) => {
                    state.done = true;
                    return Some((Err(StreamError::Connection(err)), state));
                }
                None => {
                    state.decoder.finish();
                    state.done = true;
                }
            }
        }
    });

    Box::pin(events)
}
