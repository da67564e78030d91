//! Card model
//!
//! A card is one entry of the append-only list shown to the user. The fixed
//! fields (`id`, `source`, `highlight`) are owned by the client; everything
//! else is copied verbatim from the server payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;

/// Payload keys that would shadow the fixed card fields
pub const RESERVED_KEYS: [&str; 3] = ["id", "source", "highlight"];

/// Provenance of a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardSource {
    /// Explicit user action (`GET /actions/button`)
    Button,
    /// `api` push event
    Api,
    /// `database` push event
    Database,
}

impl CardSource {
    /// Wire/display name of the source tag
    pub fn as_str(&self) -> &'static str {
        match self {
            CardSource::Button => "button",
            CardSource::Api => "api",
            CardSource::Database => "database",
        }
    }
}

impl fmt::Display for CardSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A single displayed unit of information
///
/// Serializes as one flat JSON object: the payload fields next to `id`,
/// `source` and `highlight`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    /// Unique, strictly increasing in append order
    pub id: u64,
    /// Which origin produced the card
    pub source: CardSource,
    /// True right after creation, cleared once by the highlight timer
    pub highlight: bool,
    /// Server-supplied extension data
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Card {
    /// Build a freshly highlighted card from a decoded payload
    ///
    /// Reserved keys in `payload` are dropped so the fixed fields stay
    /// authoritative.
    pub fn new(id: u64, source: CardSource, mut payload: Map<String, Value>) -> Self {
        for key in RESERVED_KEYS {
            if payload.remove(key).is_some() {
                debug!("Card {}: dropped reserved payload key '{}'", id, key);
            }
        }

        Self {
            id,
            source,
            highlight: true,
            fields: payload,
        }
    }

    /// Look up a payload field
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Clear the highlight flag
    ///
    /// Returns false if it was already cleared.
    pub fn clear_highlight(&mut self) -> bool {
        std::mem::replace(&mut self.highlight, false)
    }
}
