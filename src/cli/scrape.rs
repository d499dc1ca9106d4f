//! The scrape command: post a page URL to the job endpoint and print the stream.

use std::io::Write;
use std::sync::{Arc, Mutex, OnceLock};

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use serde::Serialize;
use tracing::{error, info};

use super::args::RunArgs;
use crate::error::StreamError;
use crate::event_source::{ClientState, CloseHandle, EventSource};
use crate::job::{ConsoleRenderer, Outcome};
use crate::models::StreamRequest;
use crate::sse::Event;
use crate::traits::HttpClient;

/// Body posted to the job endpoint.
#[derive(Debug, Serialize)]
struct ScrapeJobRequest<'a> {
    url: &'a str,
}

/// How a scrape run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// The server finished the stream
    Completed,
    /// The job sent an `error` message
    JobFailed,
    /// The stream itself failed
    StreamFailed,
    /// Closed locally before the server finished
    Cancelled,
}

impl JobStatus {
    pub fn exit_code(&self) -> i32 {
        match self {
            JobStatus::Completed => 0,
            _ => 1,
        }
    }
}

/// A running scrape job whose output goes to a writer.
pub struct ScrapeJob {
    source: EventSource,
    failure: Arc<Mutex<Option<JobStatus>>>,
}

impl ScrapeJob {
    /// Post the job and start rendering its events to `out`.
    pub fn start<H, W>(http: H, args: &RunArgs, out: W) -> Result<Self>
    where
        H: HttpClient + 'static,
        W: Write + Send + 'static,
    {
        let request = StreamRequest::post(&args.endpoint)
            .json(&ScrapeJobRequest {
                url: &args.page_url,
            })
            .wrap_err("failed to encode job request")?;

        let mut renderer = ConsoleRenderer::new(out);
        renderer
            .started(&args.page_url)
            .wrap_err("failed to write output")?;
        let renderer = Arc::new(Mutex::new(renderer));
        let failure = Arc::new(Mutex::new(None));
        // Filled once the source exists; events can arrive before that
        let closer_slot: Arc<OnceLock<CloseHandle>> = Arc::new(OnceLock::new());

        let event_renderer = renderer.clone();
        let event_failure = failure.clone();
        let event_closer = closer_slot.clone();
        let on_event = move |event: Event| {
            if lock(&event_failure).is_some() {
                return;
            }
            let outcome = lock(&event_renderer).event(&event);
            match outcome {
                Ok(Outcome::Continue) => return,
                Ok(Outcome::Failed) => {
                    *lock(&event_failure) = Some(JobStatus::JobFailed);
                }
                Err(err) => {
                    error!("Failed to write output: {}", err);
                    *lock(&event_failure) = Some(JobStatus::StreamFailed);
                }
            }
            if let Some(closer) = event_closer.get() {
                closer.close();
            }
        };

        let error_failure = failure.clone();
        let on_error = move |err: StreamError| {
            *lock(&error_failure) = Some(JobStatus::StreamFailed);
            if let Err(io_err) = lock(&renderer).disconnected(&err) {
                error!("Failed to write output: {}", io_err);
            }
        };

        let source = EventSource::open_with_handlers(http, request, on_event, on_error);
        let _ = closer_slot.set(source.closer());
        if lock(&failure).is_some() {
            source.close();
        }

        info!("Started scrape of {} via {}", args.page_url, args.endpoint);
        Ok(Self { source, failure })
    }

    /// Handle for stopping the job from a signal handler.
    pub fn closer(&self) -> CloseHandle {
        self.source.closer()
    }

    /// Wait for the stream to end.
    pub async fn finish(self) -> JobStatus {
        let state = self.source.wait().await;
        if let Some(status) = *lock(&self.failure) {
            return status;
        }
        match state {
            ClientState::Errored => JobStatus::StreamFailed,
            _ if self.source.closed_by_caller() => JobStatus::Cancelled,
            _ => JobStatus::Completed,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
