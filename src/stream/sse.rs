//! Incremental server-sent-events parser.
//!
//! Feeds on raw byte chunks straight from the transport, so events split
//! across chunk boundaries (including mid-codepoint) reassemble correctly.

/// One parsed event. Only the `data` payload matters for this protocol;
/// `event:`, `id:` and `retry:` fields are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    pub data: String,
}

/// Buffering parser. Events are delimited by a blank line (`\n\n` or
/// `\r\n\r\n`).
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk and return the events it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some((end, delim_len)) = find_boundary(&self.buffer) {
            let raw: Vec<u8> = self.buffer.drain(..end + delim_len).collect();
            let text = String::from_utf8_lossy(&raw[..end]);
            if let Some(event) = parse_event(&text) {
                events.push(event);
            }
        }

        events
    }

    /// True if a partial event is still buffered.
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
    }
}

/// Position and length of the first blank-line delimiter.
fn find_boundary(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = buf.windows(2).position(|w| w == b"\n\n").map(|i| (i, 2));
    let crlf = buf
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| (i, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn parse_event(text: &str) -> Option<SseEvent> {
    let mut data_parts: Vec<&str> = Vec::new();

    for line in text.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.starts_with(':') {
            continue; // comment / keep-alive
        }
        if let Some(value) = line.strip_prefix("data:") {
            data_parts.push(value.strip_prefix(' ').unwrap_or(value));
        }
    }

    if data_parts.is_empty() {
        return None;
    }

    Some(SseEvent {
        data: data_parts.join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: {\"x\":1}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "{\"x\":1}");
        assert!(!parser.has_pending());
    }

    #[test]
    fn test_crlf_delimited_event() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: hello\r\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "hello");
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: par").is_empty());
        assert!(parser.has_pending());

        let events = parser.feed(b"tial\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "partial");
    }

    #[test]
    fn test_multibyte_split_across_chunks() {
        let mut parser = SseParser::new();
        let bytes = "data: héllo\n\n".as_bytes();
        // Split inside the two-byte 'é'.
        let mid = bytes.iter().position(|&b| b > 0x7f).unwrap() + 1;
        assert!(parser.feed(&bytes[..mid]).is_empty());
        let events = parser.feed(&bytes[mid..]);
        assert_eq!(events[0].data, "héllo");
    }

    #[test]
    fn test_multiple_events_in_one_chunk() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: one\n\ndata: two\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "one");
        assert_eq!(events[1].data, "two");
    }

    #[test]
    fn test_data_continuation_lines() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: line1\ndata: line2\n\n");
        assert_eq!(events[0].data, "line1\nline2");
    }

    #[test]
    fn test_comment_only_event_skipped() {
        let mut parser = SseParser::new();
        let events = parser.feed(b": keep-alive\n\ndata: real\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "real");
    }

    #[test]
    fn test_event_field_ignored() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"event: message\ndata: payload\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "payload");
    }

    #[test]
    fn test_empty_data_line() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data:\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "");
    }
}
