//! Streaming behaviour against a live axum server.
//!
//! Bodies here are written in deliberately awkward pieces with pauses in
//! between, so each piece reaches the client as its own read.

mod common;

use std::convert::Infallible;
use std::time::Duration;

use axum::body::Body;
use axum::response::Response;
use axum::routing::post;
use axum::Router;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use tokio::time::{sleep, timeout};

use common::{spawn_server, test_http_client, Collector};
use postsource::{ClientState, HttpError, StreamError, StreamRequest};

/// Respond with `pieces`, pausing before each one.
fn slow_body(pieces: &[&'static [u8]]) -> Body {
    let chunks = stream::iter(pieces.to_vec()).then(|piece| async move {
        sleep(Duration::from_millis(20)).await;
        Ok::<_, Infallible>(Bytes::from_static(piece))
    });
    Body::from_stream(chunks)
}

fn sse(body: Body) -> Response {
    Response::builder()
        .header("content-type", "text/event-stream")
        .body(body)
        .unwrap()
}

#[tokio::test]
async fn test_pieces_split_mid_delimiter_and_code_point() {
    let app = Router::new().route(
        "/stream",
        post(|| async {
            // "data: 你好\n\ndata: b\n\n" cut inside 你 and between the newlines
            sse(slow_body(&[
                b"data: \xE4\xBD",
                b"\xA0\xE5\xA5\xBD\n",
                b"\ndata: b\n",
                b"\n",
            ]))
        }),
    );
    let addr = spawn_server(app).await;

    let collector = Collector::new();
    let source = collector.open(
        test_http_client(),
        StreamRequest::post(format!("http://{}/stream", addr)),
    );

    assert_eq!(source.wait().await, ClientState::Closed);
    assert_eq!(collector.events(), vec!["你好", "b"]);
    assert!(collector.errors().is_empty());
}

#[tokio::test]
async fn test_no_delivery_before_delimiter_arrives() {
    let app = Router::new().route(
        "/stream",
        post(|| async {
            let first = stream::once(async { Ok::<_, Infallible>(Bytes::from_static(b"data: he")) });
            let second = stream::once(async {
                sleep(Duration::from_millis(300)).await;
                Ok::<_, Infallible>(Bytes::from_static(b"llo\n\n"))
            });
            sse(Body::from_stream(first.chain(second)))
        }),
    );
    let addr = spawn_server(app).await;

    let collector = Collector::new();
    let source = collector.open(
        test_http_client(),
        StreamRequest::post(format!("http://{}/stream", addr)),
    );

    let mut state_rx = source.state_receiver();
    state_rx
        .wait_for(|state| *state == ClientState::Streaming)
        .await
        .unwrap();
    sleep(Duration::from_millis(100)).await;
    assert!(collector.events().is_empty());

    assert_eq!(source.wait().await, ClientState::Closed);
    assert_eq!(collector.events(), vec!["hello"]);
}

#[tokio::test]
async fn test_close_never_ending_stream() {
    let app = Router::new().route(
        "/stream",
        post(|| async {
            let first = stream::once(async {
                Ok::<_, Infallible>(Bytes::from_static(b"data: first\n\n"))
            });
            sse(Body::from_stream(first.chain(stream::pending())))
        }),
    );
    let addr = spawn_server(app).await;

    let collector = Collector::new();
    let source = collector.open(
        test_http_client(),
        StreamRequest::post(format!("http://{}/stream", addr)),
    );

    // Wait for the first event, with the read for the next one pending
    timeout(Duration::from_secs(5), async {
        while collector.events().is_empty() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("first event arrives");

    source.close();
    source.close();

    let state = timeout(Duration::from_secs(5), source.wait())
        .await
        .expect("read loop stops after close");
    assert_eq!(state, ClientState::Closed);
    assert!(source.closed_by_caller());
    assert_eq!(collector.events(), vec!["first"]);
    assert!(collector.errors().is_empty());
}

#[tokio::test]
async fn test_close_before_response_headers() {
    let app = Router::new().route(
        "/stream",
        post(|| async {
            sleep(Duration::from_secs(30)).await;
            sse(Body::from("data: late\n\n"))
        }),
    );
    let addr = spawn_server(app).await;

    let collector = Collector::new();
    let source = collector.open(
        test_http_client(),
        StreamRequest::post(format!("http://{}/stream", addr)),
    );

    sleep(Duration::from_millis(50)).await;
    assert_eq!(source.state(), ClientState::Idle);
    source.close();

    let state = timeout(Duration::from_secs(5), source.wait())
        .await
        .expect("initiation is aborted");
    assert_eq!(state, ClientState::Closed);
    assert!(collector.events().is_empty());
    assert!(collector.errors().is_empty());
}

#[tokio::test]
async fn test_transfer_aborted_by_server() {
    let app = Router::new().route(
        "/stream",
        post(|| async {
            let first = stream::once(async {
                Ok::<_, std::io::Error>(Bytes::from_static(b"data: before\n\ndata: cut"))
            });
            let failure = stream::once(async {
                sleep(Duration::from_millis(50)).await;
                Err(std::io::Error::new(std::io::ErrorKind::Other, "backend died"))
            });
            sse(Body::from_stream(first.chain(failure)))
        }),
    );
    let addr = spawn_server(app).await;

    let collector = Collector::new();
    let source = collector.open(
        test_http_client(),
        StreamRequest::post(format!("http://{}/stream", addr)),
    );

    let state = timeout(Duration::from_secs(5), source.wait())
        .await
        .expect("stream ends");
    assert_eq!(state, ClientState::Errored);
    assert_eq!(collector.events(), vec!["before"]);

    let errors = collector.errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], StreamError::Connection(_)));
}

#[tokio::test]
async fn test_endless_error_body_does_not_block() {
    let app = Router::new().route(
        "/stream",
        post(|| async {
            let first = stream::once(async { Ok::<_, Infallible>(Bytes::from_static(b"busy")) });
            Response::builder()
                .status(500)
                .header("content-type", "text/event-stream")
                .body(Body::from_stream(first.chain(stream::pending())))
                .unwrap()
        }),
    );
    let addr = spawn_server(app).await;

    let collector = Collector::new();
    let source = collector.open(
        test_http_client(),
        StreamRequest::post(format!("http://{}/stream", addr)),
    );

    let state = timeout(Duration::from_secs(5), source.wait())
        .await
        .expect("failure reported without reading the whole body");
    assert_eq!(state, ClientState::Errored);
    assert_eq!(
        collector.errors(),
        vec![StreamError::Connection(HttpError::ServerError {
            status: 500,
            message: "busy".to_string(),
        })]
    );
}
