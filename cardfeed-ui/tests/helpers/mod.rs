//! Test harness for cardfeed-ui integration tests
//!
//! Provides a real HTTP server on an ephemeral port that implements the
//! three endpoints the client talks to, with switches for failure modes,
//! plus a viewer that records navigations instead of opening anything.

#![allow(dead_code)]

use axum::{
    body::Body,
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use cardfeed_common::config::ClientConfig;
use cardfeed_ui::{EventStreamManager, PdfViewer, RenderSink, ViewerTab};
use serde_json::json;
use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

pub const PDF_BYTES: &[u8] = b"%PDF-1.4\n% cardfeed test report\n%%EOF\n";

/// Highlight period used by the test config
pub const TEST_HIGHLIGHT_MS: u64 = 50;

/// Object URL lifetime used by the test config
pub const TEST_OBJECT_URL_TTL_MS: u64 = 100;

/// Event stream that never terminates a line
pub const FLOOD_EVENTS_PATH: &str = "/events/flood";

/// How the button endpoint answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonMode {
    Json,
    /// Valid JSON that is not an object
    Array,
    ServerError,
    Garbage,
}

#[derive(Debug, Clone)]
enum Push {
    Event { name: String, data: String },
    Close,
}

#[derive(Clone)]
struct ServerState {
    pushes: broadcast::Sender<Push>,
    button_mode: Arc<Mutex<ButtonMode>>,
    events_fail: Arc<AtomicBool>,
    pdf_fail: Arc<AtomicBool>,
}

/// Push/action/PDF server for one test
pub struct TestServer {
    addr: SocketAddr,
    state: ServerState,
    task: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let (pushes, _) = broadcast::channel(100);
        let state = ServerState {
            pushes,
            button_mode: Arc::new(Mutex::new(ButtonMode::Json)),
            events_fail: Arc::new(AtomicBool::new(false)),
            pdf_fail: Arc::new(AtomicBool::new(false)),
        };

        let router = Router::new()
            .route("/actions/button", get(button))
            .route("/events", get(events))
            .route(FLOOD_EVENTS_PATH, get(flood_events))
            .route("/generate-pdf", get(generate_pdf))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local addr");

        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("Test server failed");
        });

        Self { addr, state, task }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client config for this server with short timers
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            highlight_ms: TEST_HIGHLIGHT_MS,
            object_url_ttl_ms: TEST_OBJECT_URL_TTL_MS,
            request_timeout_ms: 5_000,
            ..ClientConfig::with_base_url(self.base_url())
        }
    }

    /// Send a named event to every open stream
    pub fn push(&self, name: &str, data: &str) {
        let _ = self.state.pushes.send(Push::Event {
            name: name.to_string(),
            data: data.to_string(),
        });
    }

    /// End every open stream
    pub fn close_streams(&self) {
        let _ = self.state.pushes.send(Push::Close);
    }

    /// Number of clients currently subscribed to `/events`
    pub fn subscriber_count(&self) -> usize {
        self.state.pushes.receiver_count()
    }

    pub fn set_button_mode(&self, mode: ButtonMode) {
        *self.state.button_mode.lock().unwrap() = mode;
    }

    pub fn fail_events(&self, fail: bool) {
        self.state.events_fail.store(fail, Ordering::SeqCst);
    }

    pub fn fail_pdf(&self, fail: bool) {
        self.state.pdf_fail.store(fail, Ordering::SeqCst);
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn button(State(state): State<ServerState>) -> Response {
    let mode = *state.button_mode.lock().unwrap();
    match mode {
        ButtonMode::Json => Json(json!({
            "orderId": "42",
            "orderDate": "2024-01-01T00:00:00",
            "customerName": "BATMAN",
            "employeeName": "ROBIN"
        }))
        .into_response(),
        ButtonMode::Array => Json(json!(["first", "second"])).into_response(),
        ButtonMode::ServerError => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        ButtonMode::Garbage => (StatusCode::OK, "<html>not json</html>").into_response(),
    }
}

async fn events(State(state): State<ServerState>) -> Response {
    if state.events_fail.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, "no stream").into_response();
    }

    let mut rx = state.pushes.subscribe();
    let connection_id = uuid::Uuid::new_v4().to_string();

    let stream = async_stream::stream! {
        yield Ok::<_, Infallible>(
            Event::default()
                .event("connect")
                .data(json!({ "connectionId": connection_id }).to_string()),
        );

        loop {
            match rx.recv().await {
                Ok(Push::Event { name, data }) => {
                    yield Ok(Event::default().event(name).data(data));
                }
                Ok(Push::Close) | Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
            }
        }
    };

    Sse::new(stream).into_response()
}

async fn flood_events() -> Response {
    let chunk = Bytes::from(vec![b'x'; 64 * 1024]);
    let stream = async_stream::stream! {
        loop {
            yield Ok::<_, Infallible>(chunk.clone());
            tokio::task::yield_now().await;
        }
    };

    ([(CONTENT_TYPE, "text/event-stream")], Body::from_stream(stream)).into_response()
}

async fn generate_pdf(State(state): State<ServerState>) -> Response {
    if state.pdf_fail.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "render failed").into_response();
    }

    ([(CONTENT_TYPE, "application/pdf")], PDF_BYTES).into_response()
}

/// HTTP client that never goes through a proxy
pub fn test_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("Failed to build HTTP client")
}

/// Process inbound messages until `done` holds
pub async fn pump_until<S, F>(manager: &mut EventStreamManager<S>, what: &str, mut done: F)
where
    S: RenderSink,
    F: FnMut(&EventStreamManager<S>) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done(&*manager) {
            manager.process_next().await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("Timed out waiting for {}", what));
}

/// Process whatever arrives within `window`
pub async fn drain_for<S: RenderSink>(manager: &mut EventStreamManager<S>, window: Duration) {
    let _ = tokio::time::timeout(window, async {
        loop {
            manager.process_next().await;
        }
    })
    .await;
}

/// Viewer that records what it was asked to do
#[derive(Debug, Default)]
pub struct RecordingViewer {
    pub fail_open: bool,
    pub opened: usize,
    pub navigations: Arc<Mutex<Vec<String>>>,
}

impl RecordingViewer {
    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }
}

pub struct RecordingTab {
    navigations: Arc<Mutex<Vec<String>>>,
}

impl PdfViewer for RecordingViewer {
    type Tab = RecordingTab;

    fn open_blank(&mut self) -> io::Result<RecordingTab> {
        if self.fail_open {
            return Err(io::Error::new(io::ErrorKind::Other, "popup blocked"));
        }
        self.opened += 1;
        Ok(RecordingTab {
            navigations: Arc::clone(&self.navigations),
        })
    }
}

impl ViewerTab for RecordingTab {
    fn navigate(&mut self, url: &str) -> io::Result<()> {
        self.navigations.lock().unwrap().push(url.to_string());
        Ok(())
    }
}
