//! Push stream connection
//!
//! A connection is a worker task that reads the `/events` response body,
//! splits it into SSE frames and forwards them to the manager's inbound
//! queue. The task reports exactly one failure when the stream breaks or
//! ends, then exits. Dropping the [`Connection`] aborts the task.

use cardfeed_common::SseParser;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::manager::Inbound;
use crate::{Error, Result};

/// Handle to one open push connection
#[derive(Debug)]
pub(crate) struct Connection {
    generation: u64,
    task: JoinHandle<()>,
}

impl Connection {
    /// Spawn the reader task for `url`
    ///
    /// Everything the task forwards is tagged with `generation`.
    pub(crate) fn open(
        http: reqwest::Client,
        url: String,
        open_timeout: Duration,
        generation: u64,
        tx: mpsc::UnboundedSender<Inbound>,
    ) -> Self {
        let task = tokio::spawn(async move {
            match read_stream(&http, &url, open_timeout, generation, &tx).await {
                Ok(()) => debug!("Push reader {} stopped: manager gone", generation),
                Err(e) => {
                    let _ = tx.send(Inbound::stream_failed(generation, e));
                }
            }
        });

        Self { generation, task }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Close the connection; no further frames are delivered
    pub(crate) fn close(self) {
        // Drop aborts the reader
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Read frames until the stream fails
///
/// Returns Ok only when the inbound queue is closed.
async fn read_stream(
    http: &reqwest::Client,
    url: &str,
    open_timeout: Duration,
    generation: u64,
    tx: &mpsc::UnboundedSender<Inbound>,
) -> Result<()> {
    let request = http
        .get(url)
        .header(ACCEPT, "text/event-stream")
        .header(CACHE_CONTROL, "no-cache")
        .send();

    let response = tokio::time::timeout(open_timeout, request)
        .await
        .map_err(|_| Error::Timeout(open_timeout))??;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Status(status.as_u16()));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if !content_type.starts_with("text/event-stream") {
        return Err(Error::ContentType(content_type));
    }

    info!("Push stream {} open: {}", generation, url);

    let mut parser = SseParser::new();
    let result = forward_frames(response, &mut parser, generation, tx).await;

    if result.is_err() {
        debug!(
            "Push stream {} stopped at event id {:?} (retry hint {:?} ms)",
            generation,
            parser.last_event_id(),
            parser.retry_ms()
        );
    }

    result
}

async fn forward_frames(
    response: reqwest::Response,
    parser: &mut SseParser,
    generation: u64,
    tx: &mpsc::UnboundedSender<Inbound>,
) -> Result<()> {
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        for frame in parser.feed(&chunk)? {
            if tx.send(Inbound::frame(generation, frame)).is_err() {
                return Ok(());
            }
        }
    }

    Err(Error::StreamClosed)
}
