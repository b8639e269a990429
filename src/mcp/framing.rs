//! Message framing for the stdio transport.
//!
//! Clients frame JSON-RPC messages in one of two ways, and this module
//! accepts both on the same stream, deciding per message:
//!
//! - **Header framing**: `Content-Length: N\r\n` plus any further header
//!   lines, a blank line (`\r\n\r\n`), then exactly `N` body bytes.
//! - **Line framing**: one JSON document terminated by `\n` (an optional `\r`
//!   before it is stripped). Blank lines are skipped.
//!
//! A header block whose length is missing or invalid is dropped through its
//! terminator and parsing resumes on whatever follows it.
//!
//! # Example
//!
//! ```
//! use calendar_mcp::mcp::MessageFramer;
//!
//! let mut framer = MessageFramer::new();
//! framer.append(b"Content-Length: 2\r\n\r\n{}");
//! framer.append(b"{\"id\":1}\n");
//!
//! assert_eq!(&framer.next_message().unwrap().payload[..], b"{}");
//! assert_eq!(&framer.next_message().unwrap().payload[..], b"{\"id\":1}");
//! assert!(framer.next_message().is_none());
//! ```

use bytes::{Buf, Bytes, BytesMut};
use tracing::{trace, warn};

/// Case-insensitive prefix that switches a message into header framing.
const HEADER_PREFIX: &[u8] = b"content-length:";

/// Separates the header block from the body.
const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Initial accumulator capacity.
const DEFAULT_CAPACITY: usize = 8 * 1024;

/// Growable buffer of input bytes not yet claimed by a frame.
///
/// Bytes only ever enter at the back and leave from the front.
#[derive(Debug, Default)]
pub struct ByteAccumulator {
    buffer: BytesMut,
}

impl ByteAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self { buffer: BytesMut::with_capacity(DEFAULT_CAPACITY) }
    }

    /// Append newly read bytes.
    pub fn append(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// View the buffered bytes without consuming them.
    pub fn peek(&self) -> &[u8] {
        &self.buffer
    }

    /// Remove and return the first `len` bytes.
    pub fn take_prefix(&mut self, len: usize) -> Bytes {
        self.buffer.split_to(len).freeze()
    }

    /// Drop the first `len` bytes.
    pub fn discard_prefix(&mut self, len: usize) {
        self.buffer.advance(len);
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// Which framing rule produced a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// `Content-Length` header framing
    Header,
    /// Newline-delimited framing
    Line,
}

/// One complete message payload, not yet decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Raw payload bytes
    pub payload: Bytes,
    /// How the payload was delimited on the wire
    pub framing: Framing,
}

/// Whether the buffer front starts a header-framed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderPrefix {
    /// The full `content-length:` prefix is present.
    Present,
    /// Too few bytes to tell, and what is there could still become the prefix.
    Undecided,
    /// Not a header.
    Absent,
}

/// Outcome of one header-framing attempt.
enum HeaderStep {
    Frame(Frame),
    NeedMore,
    /// Header block of this many bytes (terminator included) had no valid length.
    Invalid(usize),
}

/// Outcome of one line-framing attempt.
enum LineStep {
    Frame(Frame),
    NeedMore,
    Blank,
}

/// Incremental decoder that splits an input byte stream into frames.
///
/// Feed bytes with [`append`](Self::append) in arrival order, then call
/// [`next_message`](Self::next_message) until it returns `None`.
#[derive(Debug, Default)]
pub struct MessageFramer {
    buffer: ByteAccumulator,
    /// Leading bytes of the pending message already searched for a delimiter
    scanned: usize,
    /// `(header block length, body length)` of a header whose body is still arriving
    pending_header: Option<(usize, usize)>,
    resyncs: u64,
}

impl MessageFramer {
    /// Create a framer with an empty buffer.
    pub fn new() -> Self {
        Self { buffer: ByteAccumulator::new(), scanned: 0, pending_header: None, resyncs: 0 }
    }

    /// Append bytes read from the input stream.
    pub fn append(&mut self, data: &[u8]) {
        self.buffer.append(data);
    }

    /// Extract the next complete frame.
    ///
    /// Returns `None` when the buffered bytes do not yet hold a complete
    /// message. That is not an error; call again after the next `append`.
    pub fn next_message(&mut self) -> Option<Frame> {
        loop {
            self.skip_line_breaks();

            match self.header_prefix() {
                HeaderPrefix::Present => match self.next_header_frame() {
                    HeaderStep::Frame(frame) => return Some(frame),
                    HeaderStep::NeedMore => return None,
                    HeaderStep::Invalid(block_len) => {
                        self.scanned = 0;
                        self.resyncs += 1;
                        warn!(discarded = block_len, "dropping header block without a valid Content-Length");
                        self.buffer.discard_prefix(block_len);
                    }
                },
                HeaderPrefix::Undecided => return None,
                HeaderPrefix::Absent => match self.next_line_frame() {
                    LineStep::Frame(frame) => return Some(frame),
                    LineStep::NeedMore => return None,
                    LineStep::Blank => {}
                },
            }
        }
    }

    /// Number of bytes waiting for more input.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// How many corrupt header blocks have been dropped so far.
    pub fn resyncs(&self) -> u64 {
        self.resyncs
    }

    fn skip_line_breaks(&mut self) {
        let leading =
            self.buffer.peek().iter().take_while(|&&b| b == b'\r' || b == b'\n').count();
        if leading > 0 {
            self.buffer.discard_prefix(leading);
        }
    }

    fn header_prefix(&self) -> HeaderPrefix {
        let data = self.buffer.peek();
        if data.len() >= HEADER_PREFIX.len() {
            if data[..HEADER_PREFIX.len()].eq_ignore_ascii_case(HEADER_PREFIX) {
                HeaderPrefix::Present
            } else {
                HeaderPrefix::Absent
            }
        } else if !data.is_empty() && data.eq_ignore_ascii_case(&HEADER_PREFIX[..data.len()]) {
            HeaderPrefix::Undecided
        } else {
            HeaderPrefix::Absent
        }
    }

    fn next_header_frame(&mut self) -> HeaderStep {
        let (block_len, content_length) = match self.pending_header {
            Some(parsed) => parsed,
            None => {
                let data = self.buffer.peek();
                // The terminator may straddle the previous scan boundary.
                let from = self.scanned.saturating_sub(HEADER_TERMINATOR.len() - 1);
                let Some(offset) = find(&data[from..], HEADER_TERMINATOR) else {
                    self.scanned = data.len();
                    return HeaderStep::NeedMore;
                };
                let header_len = from + offset;
                let block_len = header_len + HEADER_TERMINATOR.len();

                let Some(content_length) = parse_content_length(&data[..header_len]) else {
                    return HeaderStep::Invalid(block_len);
                };
                if block_len.checked_add(content_length).is_none() {
                    return HeaderStep::Invalid(block_len);
                }
                self.pending_header = Some((block_len, content_length));
                (block_len, content_length)
            }
        };

        let frame_len = block_len + content_length;
        if self.buffer.len() < frame_len {
            trace!(have = self.buffer.len(), need = frame_len, "waiting for header-framed body");
            return HeaderStep::NeedMore;
        }

        self.scanned = 0;
        self.pending_header = None;
        self.buffer.discard_prefix(block_len);
        let payload = self.buffer.take_prefix(content_length);
        HeaderStep::Frame(Frame { payload, framing: Framing::Header })
    }

    fn next_line_frame(&mut self) -> LineStep {
        let data = self.buffer.peek();
        let Some(offset) = data[self.scanned..].iter().position(|&b| b == b'\n') else {
            self.scanned = data.len();
            return LineStep::NeedMore;
        };
        let newline = self.scanned + offset;
        self.scanned = 0;

        let line = self.buffer.take_prefix(newline + 1);
        let mut end = newline;
        if end > 0 && line[end - 1] == b'\r' {
            end -= 1;
        }

        let content = &line[..end];
        let start = content.iter().position(|b| !b.is_ascii_whitespace());
        match start {
            None => LineStep::Blank,
            Some(start) => {
                let stop = content.iter().rposition(|b| !b.is_ascii_whitespace()).unwrap_or(start);
                LineStep::Frame(Frame { payload: line.slice(start..=stop), framing: Framing::Line })
            }
        }
    }
}

/// Find the first occurrence of `needle` in `haystack`.
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Read the body length from a header block (terminator excluded).
///
/// Lines are split on their first colon; the first `content-length` line
/// decides. Its value must be a non-negative integer.
fn parse_content_length(header: &[u8]) -> Option<usize> {
    for line in header.split(|&b| b == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let Some(colon) = line.iter().position(|&b| b == b':') else {
            continue;
        };
        let (name, value) = (&line[..colon], &line[colon + 1..]);
        if name.trim_ascii().eq_ignore_ascii_case(b"content-length") {
            return std::str::from_utf8(value).ok()?.trim().parse::<usize>().ok();
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framed(payload: &str) -> String {
        format!("Content-Length: {}\r\n\r\n{}", payload.len(), payload)
    }

    fn payload_str(frame: &Frame) -> &str {
        std::str::from_utf8(&frame.payload).unwrap()
    }

    #[test]
    fn test_single_framed_message() {
        let payload = r#"{"jsonrpc":"2.0","method":"initialize","id":1}"#;
        let mut framer = MessageFramer::new();
        framer.append(framed(payload).as_bytes());

        let frame = framer.next_message().unwrap();
        assert_eq!(payload_str(&frame), payload);
        assert_eq!(frame.framing, Framing::Header);
        assert!(framer.next_message().is_none());
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn test_header_is_case_insensitive_and_allows_extra_headers() {
        let payload = r#"{"id":2}"#;
        let stream = format!(
            "CONTENT-length: {}\r\nContent-Type: application/vscode-jsonrpc; charset=utf-8\r\n\r\n{}",
            payload.len(),
            payload
        );
        let mut framer = MessageFramer::new();
        framer.append(stream.as_bytes());

        assert_eq!(payload_str(&framer.next_message().unwrap()), payload);
    }

    #[test]
    fn test_body_is_returned_verbatim() {
        // Header-framed bodies are not trimmed.
        let payload = " {\"id\":3} \n";
        let mut framer = MessageFramer::new();
        framer.append(framed(payload).as_bytes());

        assert_eq!(payload_str(&framer.next_message().unwrap()), payload);
    }

    #[test]
    fn test_zero_length_body() {
        let mut framer = MessageFramer::new();
        framer.append(b"Content-Length: 0\r\n\r\n{\"id\":4}\n");

        let empty = framer.next_message().unwrap();
        assert!(empty.payload.is_empty());
        assert_eq!(empty.framing, Framing::Header);
        assert_eq!(payload_str(&framer.next_message().unwrap()), "{\"id\":4}");
    }

    #[test]
    fn test_waits_for_complete_body() {
        let payload = r#"{"jsonrpc":"2.0","method":"tools/call","id":3}"#;
        let stream = framed(payload);
        let split = stream.len() - 10;
        let mut framer = MessageFramer::new();

        framer.append(&stream.as_bytes()[..split]);
        assert!(framer.next_message().is_none());
        assert_eq!(framer.buffered(), split);

        framer.append(&stream.as_bytes()[split..]);
        assert_eq!(payload_str(&framer.next_message().unwrap()), payload);
    }

    #[test]
    fn test_terminator_split_across_appends() {
        let mut framer = MessageFramer::new();
        framer.append(b"Content-Length: 2\r\n\r");
        assert!(framer.next_message().is_none());
        framer.append(b"\n{}");
        assert_eq!(payload_str(&framer.next_message().unwrap()), "{}");
    }

    #[test]
    fn test_large_body_in_small_reads_keeps_parsed_header() {
        let payload = format!(r#"{{"pad":"{}"}}"#, "x".repeat(64 * 1024));
        let stream = framed(&payload);
        let block_len = stream.len() - payload.len();
        let mut framer = MessageFramer::new();

        let mut chunks = stream.as_bytes().chunks(7);
        while framer.pending_header.is_none() {
            framer.append(chunks.next().unwrap());
            assert!(framer.next_message().is_none());
            assert!(framer.scanned <= framer.buffered());
        }
        assert_eq!(framer.pending_header, Some((block_len, payload.len())));

        let mut frames = Vec::new();
        for chunk in chunks {
            framer.append(chunk);
            frames.extend(std::iter::from_fn(|| framer.next_message()));
        }
        assert_eq!(frames.len(), 1);
        assert_eq!(payload_str(&frames[0]), payload);
        assert_eq!(framer.pending_header, None);
        assert_eq!(framer.scanned, 0);
    }

    #[test]
    fn test_long_line_in_small_reads_resumes_scan() {
        let line = format!(r#"{{"pad":"{}"}}"#, "y".repeat(4096));
        let mut framer = MessageFramer::new();

        for chunk in line.as_bytes().chunks(5) {
            framer.append(chunk);
            assert!(framer.next_message().is_none());
            assert_eq!(framer.scanned, framer.buffered());
        }
        framer.append(b"\n{\"id\":1}\n");
        assert_eq!(payload_str(&framer.next_message().unwrap()), line);
        assert_eq!(payload_str(&framer.next_message().unwrap()), "{\"id\":1}");
        assert_eq!(framer.scanned, 0);
    }

    #[test]
    fn test_partial_header_never_falls_back_to_line_mode() {
        let payload = r#"{"id":5}"#;
        let stream = framed(payload);
        let mut framer = MessageFramer::new();

        for byte in &stream.as_bytes()[..stream.len() - 1] {
            framer.append(std::slice::from_ref(byte));
            assert!(framer.next_message().is_none());
        }
        framer.append(&stream.as_bytes()[stream.len() - 1..]);
        assert_eq!(payload_str(&framer.next_message().unwrap()), payload);
    }

    #[test]
    fn test_short_buffer_that_cannot_be_a_header_uses_line_mode() {
        let mut framer = MessageFramer::new();
        framer.append(b"{}\n");
        let frame = framer.next_message().unwrap();
        assert_eq!(payload_str(&frame), "{}");
        assert_eq!(frame.framing, Framing::Line);
    }

    #[test]
    fn test_header_prefix_state() {
        let mut framer = MessageFramer::new();
        framer.append(b"conTENT-len");
        assert_eq!(framer.header_prefix(), HeaderPrefix::Undecided);
        framer.append(b"gth:");
        assert_eq!(framer.header_prefix(), HeaderPrefix::Present);

        let mut other = MessageFramer::new();
        other.append(b"Content-Type:");
        assert_eq!(other.header_prefix(), HeaderPrefix::Absent);
    }

    #[test]
    fn test_malformed_length_is_discarded() {
        let payload = r#"{"jsonrpc":"2.0","method":"tools/list","id":7}"#;
        let mut framer = MessageFramer::new();
        framer.append(format!("Content-Length: abc\r\n\r\n{payload}\n").as_bytes());

        assert_eq!(payload_str(&framer.next_message().unwrap()), payload);
        assert_eq!(framer.resyncs(), 1);
    }

    #[test]
    fn test_negative_length_is_discarded() {
        let payload = r#"{"jsonrpc":"2.0","method":"tools/call","id":8}"#;
        let mut framer = MessageFramer::new();
        framer.append(format!("Content-Length: -5\r\n\r\n{payload}\n").as_bytes());

        assert_eq!(payload_str(&framer.next_message().unwrap()), payload);
    }

    #[test]
    fn test_empty_length_value_is_discarded() {
        let payload = r#"{"id":9}"#;
        let mut framer = MessageFramer::new();
        framer.append(format!("Content-Length:\r\n\r\n{}", framed(payload)).as_bytes());

        assert_eq!(payload_str(&framer.next_message().unwrap()), payload);
        assert_eq!(framer.resyncs(), 1);
    }

    #[test]
    fn test_malformed_header_waits_for_terminator() {
        let mut framer = MessageFramer::new();
        framer.append(b"Content-Length: abc\r\n");
        assert!(framer.next_message().is_none());
        assert_eq!(framer.resyncs(), 0);

        framer.append(b"\r\n{\"id\":10}\n");
        assert_eq!(payload_str(&framer.next_message().unwrap()), "{\"id\":10}");
    }

    #[test]
    fn test_oversized_length_is_discarded() {
        let mut framer = MessageFramer::new();
        framer.append(b"Content-Length: 99999999999999999999999\r\n\r\n{\"id\":11}\n");
        assert_eq!(payload_str(&framer.next_message().unwrap()), "{\"id\":11}");
    }

    #[test]
    fn test_line_mode_trims_and_skips_blank_lines() {
        let mut framer = MessageFramer::new();
        framer.append(b"\n\r\n   \n\t \r\n  {\"id\":12}  \r\n");

        let frame = framer.next_message().unwrap();
        assert_eq!(payload_str(&frame), "{\"id\":12}");
        assert_eq!(frame.framing, Framing::Line);
        assert!(framer.next_message().is_none());
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn test_line_without_newline_waits() {
        let mut framer = MessageFramer::new();
        framer.append(b"{\"id\":13}");
        assert!(framer.next_message().is_none());
        framer.append(b"\n");
        assert_eq!(payload_str(&framer.next_message().unwrap()), "{\"id\":13}");
    }

    #[test]
    fn test_mixed_framings_in_one_chunk() {
        let first = r#"{"id":1}"#;
        let second = r#"{"id":2}"#;
        let third = r#"{"id":3}"#;
        let stream = format!("{}\r\n{}\n{}", framed(first), second, framed(third));
        let mut framer = MessageFramer::new();
        framer.append(stream.as_bytes());

        let frames: Vec<_> = std::iter::from_fn(|| framer.next_message()).collect();
        let payloads: Vec<_> = frames.iter().map(payload_str).collect();
        assert_eq!(payloads, vec![first, second, third]);
        assert_eq!(
            frames.iter().map(|f| f.framing).collect::<Vec<_>>(),
            vec![Framing::Header, Framing::Line, Framing::Header]
        );
    }

    #[test]
    fn test_parse_content_length() {
        assert_eq!(parse_content_length(b"Content-Length: 52"), Some(52));
        assert_eq!(parse_content_length(b"content-length:7\r\nX-Other: 1"), Some(7));
        assert_eq!(parse_content_length(b"Content-Length:  +3 "), Some(3));
        assert_eq!(parse_content_length(b"Content-Length: -1"), None);
        assert_eq!(parse_content_length(b"Content-Length: 1.5"), None);
        assert_eq!(parse_content_length(b"Content-Length: \xff"), None);
        assert_eq!(parse_content_length(b"Content-Type: text/json"), None);
    }

    #[test]
    fn test_accumulator_prefix_operations() {
        let mut acc = ByteAccumulator::new();
        assert!(acc.is_empty());
        acc.append(b"hello ");
        acc.append(b"world");
        assert_eq!(acc.peek(), b"hello world");

        assert_eq!(&acc.take_prefix(5)[..], b"hello");
        acc.discard_prefix(1);
        assert_eq!(acc.peek(), b"world");
        assert_eq!(acc.len(), 5);
    }
}
