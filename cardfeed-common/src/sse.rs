//! Server-Sent Events (SSE) framing parser
//!
//! Incremental parser for `text/event-stream` bodies. Bytes arrive in
//! arbitrary chunks; complete events come out as [`SseFrame`]s.
//!
//! SSE format:
//! - `event: <name>` sets the event type
//! - `data: <text>` appends a data line
//! - `id: <text>` sets the last event id
//! - `retry: <ms>` reconnection hint
//! - lines starting with `:` are comments
//! - an empty line dispatches the event
//!
//! A line that grows past the length limit without a terminator is an
//! error; the stream is unusable after that.

use bytes::{Buf, BytesMut};

use crate::{Error, Result};

const BOM: &[u8] = b"\xEF\xBB\xBF";
const DEFAULT_EVENT: &str = "message";

/// Longest unterminated line the parser will buffer
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// One dispatched SSE event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Event name (`message` when the stream did not set one)
    pub event: String,
    /// Data lines joined with `\n`
    pub data: String,
    /// Last event id seen on the stream, if any
    pub id: Option<String>,
}

/// Incremental SSE parser
#[derive(Debug)]
pub struct SseParser {
    buf: BytesMut,
    max_line_bytes: usize,
    bom_checked: bool,
    /// Previous line ended with `\r`; a leading `\n` in the next chunk belongs to it
    pending_cr: bool,
    event_type: String,
    data: String,
    last_event_id: Option<String>,
    retry_ms: Option<u64>,
}

impl Default for SseParser {
    fn default() -> Self {
        Self::with_max_line_bytes(DEFAULT_MAX_LINE_BYTES)
    }
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line_bytes(max_line_bytes: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            max_line_bytes,
            bom_checked: false,
            pending_cr: false,
            event_type: String::new(),
            data: String::new(),
            last_event_id: None,
            retry_ms: None,
        }
    }

    /// Feed a chunk of the response body and collect every event it completes
    ///
    /// Fails with [`Error::LineTooLong`] once the unterminated tail of the
    /// body exceeds the line limit.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<SseFrame>> {
        let mut frames = Vec::new();
        self.buf.extend_from_slice(chunk);

        if !self.bom_checked {
            if self.buf.len() < BOM.len() && BOM.starts_with(&self.buf[..]) {
                // Could still be a BOM; wait for more bytes
                return Ok(frames);
            }
            if self.buf.starts_with(BOM) {
                self.buf.advance(BOM.len());
            }
            self.bom_checked = true;
        }

        loop {
            if self.pending_cr && !self.buf.is_empty() {
                if self.buf[0] == b'\n' {
                    self.buf.advance(1);
                }
                self.pending_cr = false;
            }

            let Some(line_end) = self.buf.iter().position(|b| *b == b'\n' || *b == b'\r') else {
                break;
            };

            let line = self.buf.split_to(line_end);
            if self.buf[0] == b'\r' {
                self.pending_cr = true;
            }
            self.buf.advance(1);

            let line = String::from_utf8_lossy(&line);
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }

        if self.buf.len() > self.max_line_bytes {
            return Err(Error::LineTooLong {
                limit: self.max_line_bytes,
            });
        }

        Ok(frames)
    }

    /// Most recent `retry` value announced by the server
    pub fn retry_ms(&self) -> Option<u64> {
        self.retry_ms
    }

    /// Most recent event id announced by the server
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }

        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.find(':') {
            Some(colon) => {
                let value = &line[colon + 1..];
                (&line[..colon], value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line, ""),
        };

        match field {
            "event" => self.event_type = value.to_string(),
            "data" => {
                self.data.push_str(value);
                self.data.push('\n');
            }
            "id" => {
                if !value.contains('\0') {
                    self.last_event_id = Some(value.to_string());
                }
            }
            "retry" => {
                if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
                    self.retry_ms = value.parse().ok();
                }
            }
            _ => {}
        }

        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event_type = std::mem::take(&mut self.event_type);
        let mut data = std::mem::take(&mut self.data);

        if data.is_empty() {
            return None;
        }
        data.pop();

        Some(SseFrame {
            event: if event_type.is_empty() {
                DEFAULT_EVENT.to_string()
            } else {
                event_type
            },
            data,
            id: self.last_event_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(event: &str, data: &str) -> SseFrame {
        SseFrame {
            event: event.to_string(),
            data: data.to_string(),
            id: None,
        }
    }

    #[test]
    fn test_single_named_event() {
        let mut parser = SseParser::new();
        let frames = parser.feed(b"event: api\ndata: {\"value\":42}\n\n").unwrap();

        assert_eq!(frames, vec![frame("api", "{\"value\":42}")]);
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut parser = SseParser::new();

        assert!(parser.feed(b"event: data").unwrap().is_empty());
        assert!(parser.feed(b"base\ndata: {\"order").unwrap().is_empty());
        let frames = parser.feed(b"Id\":1}\n\n").unwrap();

        assert_eq!(frames, vec![frame("database", "{\"orderId\":1}")]);
    }

    #[test]
    fn test_crlf_and_cr_line_endings() {
        let mut parser = SseParser::new();
        let mut frames = parser.feed(b"event: api\r\ndata: a\r\n\r\n").unwrap();
        frames.extend(parser.feed(b"event: api\rdata: b\r\r").unwrap());

        assert_eq!(frames, vec![frame("api", "a"), frame("api", "b")]);
    }

    #[test]
    fn test_crlf_split_between_chunks() {
        let mut parser = SseParser::new();

        assert!(parser.feed(b"data: x\r").unwrap().is_empty());
        // The \n completes the previous CRLF, not a blank line
        assert!(parser.feed(b"\n").unwrap().is_empty());
        let frames = parser.feed(b"\r\n").unwrap();

        assert_eq!(frames, vec![frame("message", "x")]);
    }

    #[test]
    fn test_multiline_data_and_default_event() {
        let mut parser = SseParser::new();
        let frames = parser.feed(b"data: first\ndata: second\n\n").unwrap();

        assert_eq!(frames, vec![frame("message", "first\nsecond")]);
    }

    #[test]
    fn test_comments_and_unknown_fields_ignored() {
        let mut parser = SseParser::new();
        let frames = parser.feed(b": keep-alive\nfoo: bar\nevent: api\ndata:{}\n\n").unwrap();

        assert_eq!(frames, vec![frame("api", "{}")]);
    }

    #[test]
    fn test_blank_line_without_data_dispatches_nothing() {
        let mut parser = SseParser::new();
        let mut frames = parser.feed(b"event: api\n\n").unwrap();
        // The event type does not leak into the next event
        frames.extend(parser.feed(b"data: x\n\n").unwrap());

        assert_eq!(frames, vec![frame("message", "x")]);
    }

    #[test]
    fn test_empty_data_field_dispatches_empty_string() {
        let mut parser = SseParser::new();
        let frames = parser.feed(b"event: api\ndata\n\n").unwrap();

        assert_eq!(frames, vec![frame("api", "")]);
    }

    #[test]
    fn test_leading_bom_skipped() {
        let mut parser = SseParser::new();

        assert!(parser.feed(b"\xEF\xBB").unwrap().is_empty());
        let frames = parser.feed(b"\xBFdata: x\n\n").unwrap();

        assert_eq!(frames, vec![frame("message", "x")]);
    }

    #[test]
    fn test_id_and_retry_fields() {
        let mut parser = SseParser::new();
        let frames = parser.feed(b"id: 7\nretry: 3000\nretry: soon\ndata: x\n\n").unwrap();

        assert_eq!(frames[0].id.as_deref(), Some("7"));
        assert_eq!(parser.last_event_id(), Some("7"));
        assert_eq!(parser.retry_ms(), Some(3000));

        // The id persists for later events
        let frames = parser.feed(b"data: y\n\n").unwrap();
        assert_eq!(frames[0].id.as_deref(), Some("7"));
    }

    #[test]
    fn test_only_one_leading_space_stripped() {
        let mut parser = SseParser::new();
        let frames = parser.feed(b"data:  padded\n\n").unwrap();

        assert_eq!(frames, vec![frame("message", " padded")]);
    }

    #[test]
    fn test_incomplete_event_not_dispatched() {
        let mut parser = SseParser::new();

        assert!(parser.feed(b"event: api\ndata: {\"value\":1}\n").unwrap().is_empty());
    }

    #[test]
    fn test_unterminated_line_over_limit_fails() {
        let mut parser = SseParser::with_max_line_bytes(16);

        assert!(parser.feed(b"data: 0123456789").is_ok());
        let err = parser.feed(b"abcdef").unwrap_err();

        assert!(matches!(err, Error::LineTooLong { limit: 16 }));
    }

    #[test]
    fn test_long_stream_of_short_lines_within_limit() {
        let mut parser = SseParser::with_max_line_bytes(16);
        let mut count = 0;

        for _ in 0..100 {
            count += parser.feed(b"data: x\n\n").unwrap().len();
        }

        assert_eq!(count, 100);
    }
}
