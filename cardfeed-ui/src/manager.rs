//! Event stream manager
//!
//! Owns the card list, the id counter and the (at most one) push
//! connection. All mutation happens on the task that drives the manager:
//! the push reader and the highlight timers only post [`Inbound`] messages,
//! which the driver receives with [`EventStreamManager::recv_inbound`] and
//! runs with [`EventStreamManager::handle_inbound`], one at a time.
//!
//! Failures never escape: transport and decode errors are logged and the
//! offending response/event is dropped, a broken push stream tears the
//! connection down, and enabling/disabling in the wrong state only warns.

use cardfeed_common::config::ClientConfig;
use cardfeed_common::{Card, CardSource, EventKind, PushEvent, SseFrame};
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::fetch;
use crate::sink::RenderSink;
use crate::stream::Connection;
use crate::Error;

/// Message posted to the manager from a worker task or timer
#[derive(Debug)]
pub struct Inbound {
    kind: InboundKind,
}

#[derive(Debug)]
enum InboundKind {
    /// SSE frame read by the connection with this generation
    Frame { generation: u64, frame: SseFrame },
    /// The connection with this generation broke or ended
    StreamFailed { generation: u64, error: Error },
    /// Highlight period of a card elapsed
    HighlightExpired { card_id: u64 },
}

impl Inbound {
    pub(crate) fn frame(generation: u64, frame: SseFrame) -> Self {
        Self {
            kind: InboundKind::Frame { generation, frame },
        }
    }

    pub(crate) fn stream_failed(generation: u64, error: Error) -> Self {
        Self {
            kind: InboundKind::StreamFailed { generation, error },
        }
    }

    fn highlight_expired(card_id: u64) -> Self {
        Self {
            kind: InboundKind::HighlightExpired { card_id },
        }
    }
}

/// Client-side card list driven by button fetches and the push stream
pub struct EventStreamManager<S: RenderSink> {
    http: reqwest::Client,
    config: ClientConfig,
    sink: S,
    connection: Option<Connection>,
    /// Server-assigned id of the live connection (diagnostic only)
    connection_id: Option<String>,
    /// Generation of the most recently opened connection
    generation: u64,
    /// Last assigned card id; ids start at 1
    next_id: u64,
    cards: Vec<Card>,
    inbound_tx: mpsc::UnboundedSender<Inbound>,
    inbound_rx: mpsc::UnboundedReceiver<Inbound>,
}

impl<S: RenderSink> EventStreamManager<S> {
    pub fn new(http: reqwest::Client, config: ClientConfig, sink: S) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        Self {
            http,
            config,
            sink,
            connection: None,
            connection_id: None,
            generation: 0,
            next_id: 0,
            cards: Vec::new(),
            inbound_tx,
            inbound_rx,
        }
    }

    /// Cards in append order
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn is_streaming(&self) -> bool {
        self.connection.is_some()
    }

    /// Id announced by the server in its `connect` event
    pub fn connection_id(&self) -> Option<&str> {
        self.connection_id.as_deref()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Fetch one card from the action endpoint
    ///
    /// Returns the new card's id, or None if the request or its decoding
    /// failed (already logged).
    pub async fn request_card_by_action(&mut self) -> Option<u64> {
        let url = self.config.action_url();

        match fetch::fetch_payload(&self.http, &url, self.config.request_timeout()).await {
            Ok(payload) => {
                info!("Received {} response: {:?}", self.config.action_path, payload);
                Some(self.accept_card(CardSource::Button, payload).await)
            }
            Err(e) => {
                error!("Error fetching card: {}", e);
                None
            }
        }
    }

    /// Open the push connection
    ///
    /// Returns false (with a warning) if a connection is already open.
    pub fn enable_stream(&mut self) -> bool {
        if self.connection.is_some() {
            warn!("Push stream is already enabled");
            return false;
        }

        self.generation += 1;
        self.connection = Some(Connection::open(
            self.http.clone(),
            self.config.events_url(),
            self.config.request_timeout(),
            self.generation,
            self.inbound_tx.clone(),
        ));

        info!("Push stream enabled");
        true
    }

    /// Close the push connection
    ///
    /// Returns false (with a warning) if no connection is open. Pending
    /// highlight timers keep running.
    pub fn disable_stream(&mut self) -> bool {
        match self.connection.take() {
            Some(connection) => {
                connection.close();
                self.connection_id = None;
                info!("Push stream disabled");
                true
            }
            None => {
                warn!("No push stream to disable");
                false
            }
        }
    }

    /// Wait for the next inbound message
    ///
    /// Cancel safe, so it can sit in a `select!` next to other sources.
    /// Returns None only if every sender is gone, which cannot happen while
    /// the manager is alive.
    pub async fn recv_inbound(&mut self) -> Option<Inbound> {
        self.inbound_rx.recv().await
    }

    /// Run one inbound message
    pub async fn handle_inbound(&mut self, inbound: Inbound) {
        match inbound.kind {
            InboundKind::Frame { generation, frame } => {
                if self.is_live(generation) {
                    self.dispatch_frame(frame).await;
                } else {
                    debug!(
                        "Dropping '{}' frame (id {:?}) from closed stream {}",
                        frame.event, frame.id, generation
                    );
                }
            }
            InboundKind::StreamFailed { generation, error } => {
                if self.is_live(generation) {
                    error!("Push stream error: {}", error);
                    self.disable_stream();
                } else {
                    debug!("Ignoring failure of closed stream {}: {}", generation, error);
                }
            }
            InboundKind::HighlightExpired { card_id } => self.clear_highlight(card_id),
        }
    }

    /// Receive and run one inbound message
    pub async fn process_next(&mut self) -> bool {
        match self.recv_inbound().await {
            Some(inbound) => {
                self.handle_inbound(inbound).await;
                true
            }
            None => false,
        }
    }

    fn is_live(&self, generation: u64) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|c| c.generation() == generation)
    }

    async fn dispatch_frame(&mut self, frame: SseFrame) {
        let Some(kind) = EventKind::from_name(&frame.event) else {
            debug!("Ignoring unrecognized push event '{}'", frame.event);
            return;
        };

        match PushEvent::decode(kind, &frame.data) {
            Ok(PushEvent::Connect { connection_id }) => {
                info!("Connected with ID: {}", connection_id);
                self.connection_id = Some(connection_id);
            }
            Ok(PushEvent::Card { source, fields }) => {
                info!("Received {} event: {}", kind, frame.data);
                self.accept_card(source, fields).await;
            }
            Err(e) => error!("Error parsing {} push data: {}", kind, e),
        }
    }

    /// Append a new highlighted card and return its id
    async fn accept_card(&mut self, source: CardSource, payload: Map<String, Value>) -> u64 {
        self.next_id += 1;
        let card = Card::new(self.next_id, source, payload);
        let id = card.id;

        self.sink.card_appended(&card);
        self.cards.push(card);
        self.schedule_highlight_clear(id);

        // Let the append render before scrolling to it
        tokio::task::yield_now().await;
        self.sink.scroll_to_bottom();

        id
    }

    fn schedule_highlight_clear(&self, card_id: u64) {
        let tx = self.inbound_tx.clone();
        let delay = self.config.highlight_duration();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Inbound::highlight_expired(card_id));
        });
    }

    fn clear_highlight(&mut self, card_id: u64) {
        // Ids are strictly increasing, so the list is sorted by id
        let Ok(index) = self.cards.binary_search_by_key(&card_id, |c| c.id) else {
            warn!("Highlight expired for unknown card {}", card_id);
            return;
        };

        let card = &mut self.cards[index];
        if card.clear_highlight() {
            self.sink.card_updated(card);
        }
    }
}
