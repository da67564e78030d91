//! Push event types
//!
//! The `/events` stream carries named events with JSON payloads. Only three
//! names are recognized; anything else is ignored by the client.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::card::CardSource;
use crate::Result;

/// Recognized push event names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Server-assigned connection id (diagnostic only)
    Connect,
    /// Card produced by the server's API poller
    Api,
    /// Card produced by the server's database cycler
    Database,
}

impl EventKind {
    /// Look up an event kind by its SSE event name
    ///
    /// Returns None for names with no registered handler.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "connect" => Some(EventKind::Connect),
            "api" => Some(EventKind::Api),
            "database" => Some(EventKind::Database),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Connect => "connect",
            EventKind::Api => "api",
            EventKind::Database => "database",
        }
    }

    /// Card provenance for card-producing events
    pub fn card_source(&self) -> Option<CardSource> {
        match self {
            EventKind::Connect => None,
            EventKind::Api => Some(CardSource::Api),
            EventKind::Database => Some(CardSource::Database),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Payload of the `connect` event
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectPayload {
    connection_id: String,
}

/// Decoded push event
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    Connect {
        connection_id: String,
    },
    /// Card-producing event (`api` or `database`)
    Card {
        source: CardSource,
        fields: Map<String, Value>,
    },
}

impl PushEvent {
    /// Decode the `data` of an event of the given kind
    pub fn decode(kind: EventKind, data: &str) -> Result<Self> {
        match kind.card_source() {
            Some(source) => Ok(PushEvent::Card {
                source,
                fields: decode_payload(data)?,
            }),
            None => {
                let payload: ConnectPayload = serde_json::from_str(data)?;
                Ok(PushEvent::Connect {
                    connection_id: payload.connection_id,
                })
            }
        }
    }
}

/// Parse text as a card payload
///
/// Any valid JSON is accepted; see [`payload_fields`] for how non-object
/// values contribute fields. Only text that does not parse is an error.
pub fn decode_payload(text: &str) -> Result<Map<String, Value>> {
    Ok(payload_fields(serde_json::from_str(text)?))
}

/// Spread a JSON value into card fields
///
/// Objects contribute their entries. Arrays contribute one field per
/// element and strings one per character, keyed by index (`"0"`, `"1"`,
/// ...). Null, booleans and numbers contribute nothing.
pub fn payload_fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| (i.to_string(), item))
            .collect(),
        Value::String(text) => text
            .chars()
            .enumerate()
            .map(|(i, c)| (i.to_string(), Value::String(c.to_string())))
            .collect(),
        Value::Null | Value::Bool(_) | Value::Number(_) => Map::new(),
    }
}
