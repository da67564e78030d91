//! Render sinks
//!
//! The manager never draws anything itself. It reports list changes to a
//! [`RenderSink`], which decides how cards are shown.

use cardfeed_common::Card;
use std::io::Write;

/// Receiver of visible-list updates
pub trait RenderSink {
    /// A card was appended to the bottom of the list
    fn card_appended(&mut self, card: &Card);

    /// A card already in the list changed (its highlight was cleared)
    fn card_updated(&mut self, card: &Card);

    /// Bring the newest card into view
    fn scroll_to_bottom(&mut self);

    /// Blocking user-facing notice
    fn alert(&mut self, message: &str);
}

/// Prints cards to stdout and alerts to stderr
#[derive(Debug, Default)]
pub struct TerminalSink;

impl TerminalSink {
    pub fn new() -> Self {
        Self
    }

    fn format_card(card: &Card) -> String {
        let fields = serde_json::to_string(&card.fields).unwrap_or_else(|_| "{}".to_string());
        format!(
            "{} #{:<4} {:<8} {} {}",
            chrono::Local::now().format("%H:%M:%S"),
            card.id,
            card.source,
            if card.highlight { "*" } else { " " },
            fields
        )
    }

    fn format_update(card: &Card) -> String {
        let change = if card.highlight {
            "highlighted"
        } else {
            "highlight cleared"
        };
        format!("{} #{} {}", chrono::Local::now().format("%H:%M:%S"), card.id, change)
    }
}

impl RenderSink for TerminalSink {
    fn card_appended(&mut self, card: &Card) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{}", Self::format_card(card));
    }

    fn card_updated(&mut self, card: &Card) {
        // Earlier lines can't be redrawn; report the change on a new one
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{}", Self::format_update(card));
    }

    fn scroll_to_bottom(&mut self) {
        // stdout is always at the bottom
        let _ = std::io::stdout().flush();
    }

    fn alert(&mut self, message: &str) {
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "!! {}", message);
    }
}

/// One call received by a [`RecordingSink`]
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Appended(Card),
    Updated(Card),
    ScrollToBottom,
    Alert(String),
}

/// Keeps every call in memory; for embedding and tests
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub calls: Vec<SinkCall>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cards in append order
    pub fn appended(&self) -> Vec<&Card> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                SinkCall::Appended(card) => Some(card),
                _ => None,
            })
            .collect()
    }

    pub fn alerts(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                SinkCall::Alert(message) => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn scroll_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, SinkCall::ScrollToBottom))
            .count()
    }
}

impl RenderSink for RecordingSink {
    fn card_appended(&mut self, card: &Card) {
        self.calls.push(SinkCall::Appended(card.clone()));
    }

    fn card_updated(&mut self, card: &Card) {
        self.calls.push(SinkCall::Updated(card.clone()));
    }

    fn scroll_to_bottom(&mut self) {
        self.calls.push(SinkCall::ScrollToBottom);
    }

    fn alert(&mut self, message: &str) {
        self.calls.push(SinkCall::Alert(message.to_string()));
    }
}
