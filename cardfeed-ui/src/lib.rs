//! cardfeed-ui library
//!
//! Client side of the card feed: the event stream manager that turns button
//! fetches and pushed `api`/`database` events into one ordered card list,
//! plus the PDF launcher and the command loop driving both.

pub mod app;
pub mod error;
pub mod fetch;
pub mod manager;
pub mod pdf;
pub mod sink;
pub mod stream;

pub use app::UiCommand;
pub use error::{Error, Result};
pub use manager::{EventStreamManager, Inbound};
pub use pdf::{ObjectUrl, PdfLauncher, PdfViewer, SystemViewer, ViewerTab};
pub use sink::{RecordingSink, RenderSink, SinkCall, TerminalSink};
