//! Callback-driven event source over a streamed HTTP call.
//!
//! [`EventSource`] issues one request with any method and body, then reads
//! the response on a background task. Complete `data:` frames are handed to
//! the `on_event` callback in order; a fatal failure goes to `on_error` once.
//!
//! ```no_run
//! use postsource::event_source::EventSource;
//! use postsource::models::StreamRequest;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let request = StreamRequest::post("http://127.0.0.1:5000/stream")
//!     .json(&serde_json::json!({ "url": "https://example.com" }))?;
//! let source = EventSource::connect(request)?;
//! source.on_event(|event| println!("{}", event.data));
//! source.on_error(|err| eprintln!("{}", err));
//! source.wait().await;
//! # Ok(())
//! # }
//! ```

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::adapters::ReqwestHttpClient;
use crate::config::ClientConfig;
use crate::error::StreamError;
use crate::models::StreamRequest;
use crate::sse::{event_stream, Event};
use crate::traits::{HttpClient, HttpError};

/// Callback invoked for each event.
pub type EventCallback = Box<dyn FnMut(Event) + Send>;

/// Callback invoked for a fatal stream failure.
pub type ErrorCallback = Box<dyn FnMut(StreamError) + Send>;

/// Lifecycle of an [`EventSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Request issued, response not yet received
    Idle,
    /// Response headers received, body being read
    Streaming,
    /// Ended by the caller or by the end of the body
    Closed,
    /// Ended by a failure reported through `on_error`
    Errored,
}

impl ClientState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ClientState::Closed | ClientState::Errored)
    }
}

#[derive(Default)]
struct Handlers {
    on_event: Option<EventCallback>,
    on_error: Option<ErrorCallback>,
}

thread_local! {
    /// Sources with a callback running on this thread
    static DISPATCHING: RefCell<Vec<usize>> = RefCell::new(Vec::new());
}

/// Marks a source as dispatching on the current thread until dropped.
struct DispatchScope {
    id: usize,
}

impl DispatchScope {
    fn enter(shared: &Shared) -> Self {
        let id = shared.id();
        DISPATCHING.with(|active| active.borrow_mut().push(id));
        Self { id }
    }

    fn is_active(shared: &Shared) -> bool {
        let id = shared.id();
        DISPATCHING.with(|active| active.borrow().contains(&id))
    }
}

impl Drop for DispatchScope {
    fn drop(&mut self) {
        let _ = DISPATCHING.try_with(|active| {
            let mut active = active.borrow_mut();
            if let Some(pos) = active.iter().rposition(|id| *id == self.id) {
                active.remove(pos);
            }
        });
    }
}

/// State shared between the handle and the read task.
struct Shared {
    url: String,
    handlers: Mutex<Handlers>,
    /// Held for the whole of each callback invocation
    dispatch: Mutex<()>,
    cancel: CancellationToken,
    state_tx: watch::Sender<ClientState>,
    /// Set when `close()` moved the stream to `Closed`
    closed_by_caller: AtomicBool,
}

impl Shared {
    fn id(&self) -> usize {
        self as *const Shared as usize
    }

    fn lock_handlers(&self) -> MutexGuard<'_, Handlers> {
        // A callback that panicked leaves its slot empty, the rest is intact
        self.handlers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_dispatch(&self) -> MutexGuard<'_, ()> {
        self.dispatch.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cancel and empty both slots. `None` if already cancelled.
    ///
    /// Drop the result with no lock held; a callback may own the last handle
    /// to this source.
    fn release(&self, by_caller: bool) -> Option<Handlers> {
        let mut handlers = self.lock_handlers();
        if self.cancel.is_cancelled() {
            return None;
        }
        // Visible before the read task can observe the cancellation
        if by_caller {
            self.closed_by_caller.store(true, Ordering::SeqCst);
        }
        self.cancel.cancel();
        Some(std::mem::take(&mut *handlers))
    }

    /// Move to a terminal state unless one was already reached.
    fn set_terminal(&self, state: ClientState) -> bool {
        self.state_tx.send_if_modified(|current| {
            if current.is_terminal() {
                false
            } else {
                *current = state;
                true
            }
        })
    }

    fn close(&self) {
        // From inside one of our own callbacks the dispatch lock is already held
        let dispatch = if DispatchScope::is_active(self) {
            None
        } else {
            Some(self.lock_dispatch())
        };
        let released = match self.release(true) {
            Some(released) => released,
            None => return,
        };

        if self.set_terminal(ClientState::Closed) {
            info!("Closed event stream for {}", self.url);
        }
        drop(dispatch);
        drop(released);
    }

    /// Hand one event to the consumer. Returns false once the stream is closed.
    fn deliver_event(&self, event: Event) -> bool {
        let dispatch = self.lock_dispatch();
        let callback = {
            let mut handlers = self.lock_handlers();
            if self.cancel.is_cancelled() {
                return false;
            }
            handlers.on_event.take()
        };

        let mut callback = match callback {
            Some(callback) => callback,
            None => {
                trace!("No event handler set, dropping event");
                return true;
            }
        };
        {
            let _scope = DispatchScope::enter(self);
            callback(event);
        }

        // Put it back unless it was replaced or the stream ended meanwhile
        let leftover = {
            let mut handlers = self.lock_handlers();
            if !self.cancel.is_cancelled() && handlers.on_event.is_none() {
                handlers.on_event = Some(callback);
                None
            } else {
                Some(callback)
            }
        };
        drop(dispatch);
        drop(leftover);
        !self.cancel.is_cancelled()
    }

    fn fail(&self, err: StreamError) {
        let dispatch = self.lock_dispatch();
        let mut released = match self.release(false) {
            Some(released) => released,
            None => {
                debug!("Ignoring failure after close: {}", err);
                return;
            }
        };
        self.set_terminal(ClientState::Errored);

        warn!("[{}] Event stream for {} failed: {}", err.error_code(), self.url, err);
        match released.on_error.as_mut() {
            Some(callback) => {
                let _scope = DispatchScope::enter(self);
                callback(err);
            }
            None => warn!("No error handler set, failure not delivered"),
        }
        drop(dispatch);
        drop(released);
    }

    fn finish(&self) {
        let released = self.release(false);
        if self.set_terminal(ClientState::Closed) {
            info!("Event stream for {} ended", self.url);
        }
        drop(released);
    }

    /// The read task died without reaching a terminal state itself.
    fn abandon(&self) {
        let released = self.release(false);
        self.set_terminal(ClientState::Errored);
        drop(released);
    }
}

/// Cloneable handle that can only close the stream.
///
/// Useful where the [`EventSource`] itself cannot be moved, such as a
/// signal handler.
#[derive(Clone)]
pub struct CloseHandle {
    shared: Arc<Shared>,
}

impl CloseHandle {
    /// Same as [`EventSource::close`].
    pub fn close(&self) {
        self.shared.close();
    }
}

impl std::fmt::Debug for CloseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloseHandle")
            .field("url", &self.shared.url)
            .finish()
    }
}

/// A single streamed call delivering events to callbacks.
///
/// Dropping the handle closes the stream.
pub struct EventSource {
    shared: Arc<Shared>,
    state_rx: watch::Receiver<ClientState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl EventSource {
    /// Issue `request` through `http` and start reading in the background.
    ///
    /// Returns immediately. Events that complete before a handler is set are
    /// dropped; use [`open_with_handlers`](Self::open_with_handlers) when the
    /// first event matters.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn open<H>(http: H, request: StreamRequest) -> Self
    where
        H: HttpClient + 'static,
    {
        Self::spawn(http, request, Handlers::default())
    }

    /// Like [`open`](Self::open), with both callbacks installed before the
    /// request is issued.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn open_with_handlers<H, E, R>(
        http: H,
        request: StreamRequest,
        on_event: E,
        on_error: R,
    ) -> Self
    where
        H: HttpClient + 'static,
        E: FnMut(Event) + Send + 'static,
        R: FnMut(StreamError) + Send + 'static,
    {
        let handlers = Handlers {
            on_event: Some(Box::new(on_event)),
            on_error: Some(Box::new(on_error)),
        };
        Self::spawn(http, request, handlers)
    }

    /// Open with a reqwest transport configured from the environment.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn connect(request: StreamRequest) -> Result<Self, HttpError> {
        let http = ReqwestHttpClient::from_config(&ClientConfig::from_env())?;
        Ok(Self::open(http, request))
    }

    fn spawn<H>(http: H, request: StreamRequest, handlers: Handlers) -> Self
    where
        H: HttpClient + 'static,
    {
        let (state_tx, state_rx) = watch::channel(ClientState::Idle);
        let shared = Arc::new(Shared {
            url: request.url.clone(),
            handlers: Mutex::new(handlers),
            dispatch: Mutex::new(()),
            cancel: CancellationToken::new(),
            state_tx,
            closed_by_caller: AtomicBool::new(false),
        });

        info!("Opening {} event stream to {}", request.method, request.url);
        let task = tokio::spawn(run_stream(shared.clone(), http, request));

        Self {
            shared,
            state_rx,
            task: Mutex::new(Some(task)),
        }
    }

    /// Set or replace the event callback.
    ///
    /// Ignored once the stream has ended; the callback is dropped right away.
    pub fn on_event<F>(&self, callback: F)
    where
        F: FnMut(Event) + Send + 'static,
    {
        let previous = {
            let mut handlers = self.shared.lock_handlers();
            if self.shared.cancel.is_cancelled() {
                None
            } else {
                handlers.on_event.replace(Box::new(callback))
            }
        };
        drop(previous);
    }

    /// Set or replace the error callback.
    ///
    /// Ignored once the stream has ended; the callback is dropped right away.
    pub fn on_error<F>(&self, callback: F)
    where
        F: FnMut(StreamError) + Send + 'static,
    {
        let previous = {
            let mut handlers = self.shared.lock_handlers();
            if self.shared.cancel.is_cancelled() {
                None
            } else {
                handlers.on_error.replace(Box::new(callback))
            }
        };
        drop(previous);
    }

    /// Abort the call and stop delivery.
    ///
    /// Idempotent and safe to call from inside a callback. Called from any
    /// other thread it waits for a running callback to return, so once this
    /// returns no callback is running or will start. Both callbacks are
    /// dropped.
    pub fn close(&self) {
        self.shared.close();
    }

    /// A handle that can close this stream from elsewhere.
    pub fn closer(&self) -> CloseHandle {
        CloseHandle {
            shared: self.shared.clone(),
        }
    }

    /// Get the current state
    pub fn state(&self) -> ClientState {
        *self.state_rx.borrow()
    }

    /// Subscribe to state changes
    pub fn state_receiver(&self) -> watch::Receiver<ClientState> {
        self.state_rx.clone()
    }

    /// Whether [`close`](Self::close) ended the stream, rather than the end
    /// of the body or a failure.
    pub fn closed_by_caller(&self) -> bool {
        self.shared.closed_by_caller.load(Ordering::SeqCst)
    }

    /// Target URL of the call
    pub fn url(&self) -> &str {
        &self.shared.url
    }

    /// Wait for the read task to finish and return the terminal state.
    ///
    /// Any callback running at the time has returned when this resolves.
    pub async fn wait(&self) -> ClientState {
        let task = self
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        match task {
            Some(task) => {
                if let Err(err) = task.await {
                    error!("Event stream task for {} aborted: {}", self.shared.url, err);
                    self.shared.abandon();
                }
            }
            None => {
                let mut state_rx = self.state_rx.clone();
                let _ = state_rx.wait_for(ClientState::is_terminal).await;
            }
        }
        self.state()
    }
}

impl std::fmt::Debug for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSource")
            .field("url", &self.shared.url)
            .field("state", &self.state())
            .finish()
    }
}

impl Drop for EventSource {
    fn drop(&mut self) {
        self.shared.close();
    }
}

/// Read loop: initiate, then decode and dispatch until a terminal state.
async fn run_stream<H: HttpClient>(shared: Arc<Shared>, http: H, request: StreamRequest) {
    let response = tokio::select! {
        biased;
        _ = shared.cancel.cancelled() => {
            debug!("Closed before the response to {} arrived", request.url);
            return;
        }
        response = http.stream(&request) => response,
    };

    let body = match response {
        Ok(body) => body,
        Err(err) => {
            shared.fail(StreamError::Connection(err));
            return;
        }
    };

    shared.state_tx.send_if_modified(|state| {
        if *state == ClientState::Idle {
            *state = ClientState::Streaming;
            true
        } else {
            false
        }
    });
    debug!("Streaming response from {}", request.url);

    let mut events = event_stream(body);
    loop {
        let next = tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => {
                debug!("Read loop for {} cancelled", request.url);
                return;
            }
            next = events.next() => next,
        };

        match next {
            Some(Ok(event)) => {
                if !shared.deliver_event(event) {
                    return;
                }
            }
            Some(Err(err)) => {
                shared.fail(err);
                return;
            }
            None => {
                shared.finish();
                return;
            }
        }
    }
}
