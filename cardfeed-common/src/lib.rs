//! # cardfeed Common Library
//!
//! Shared code for the cardfeed client including:
//! - Card model (id, provenance tag, highlight flag, open payload fields)
//! - Push event types and payload decoding
//! - Server-Sent Events framing parser
//! - Configuration loading

pub mod card;
pub mod config;
pub mod error;
pub mod events;
pub mod sse;

pub use card::{Card, CardSource};
pub use error::{Error, Result};
pub use events::{EventKind, PushEvent};
pub use sse::{SseFrame, SseParser};
