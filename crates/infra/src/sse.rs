//! Incremental decoder for `text/event-stream` bodies.
//!
//! Chunks arrive on arbitrary byte boundaries; the decoder buffers the
//! trailing partial line and yields the payload of every complete `data:`
//! line. A `[DONE]` payload ends the stream. A partial line longer than
//! `MAX_LINE_BYTES` is a decode error.

use crate::gateway::GatewayError;

pub const MAX_LINE_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Data(String),
    Done,
}

#[derive(Debug, Default)]
pub struct SseLineDecoder {
    buf: Vec<u8>,
    /// Prefix of `buf` already known to hold no newline.
    scanned: usize,
    done: bool,
}

impl SseLineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed a chunk and return the events completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<SseEvent>, GatewayError> {
        if self.done {
            return Ok(Vec::new());
        }
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buf[self.scanned..].iter().position(|b| *b == b'\n') {
            let end = self.scanned + offset;
            let event = decode_line(&self.buf[start..=end]);
            start = end + 1;
            self.scanned = start;
            if let Some(event) = event {
                let finished = event == SseEvent::Done;
                events.push(event);
                if finished {
                    self.done = true;
                    self.buf.clear();
                    self.scanned = 0;
                    return Ok(events);
                }
            }
        }

        self.buf.drain(..start);
        self.scanned = self.buf.len();
        if self.buf.len() > MAX_LINE_BYTES {
            self.done = true;
            self.buf.clear();
            self.scanned = 0;
            return Err(GatewayError::Decode(format!("event line exceeds {MAX_LINE_BYTES} bytes")));
        }
        Ok(events)
    }

    /// Flush a final line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if self.done || self.buf.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buf);
        self.scanned = 0;
        let event = decode_line(&line);
        if event == Some(SseEvent::Done) {
            self.done = true;
        }
        event
    }
}

fn decode_line(raw: &[u8]) -> Option<SseEvent> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim_end_matches(['\n', '\r']);
    // blank lines separate events; ':' lines are keep-alive comments
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    let payload = line.strip_prefix("data:")?;
    let payload = payload.strip_prefix(' ').unwrap_or(payload);
    if payload.trim() == "[DONE]" {
        return Some(SseEvent::Done);
    }
    Some(SseEvent::Data(payload.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(s: &str) -> SseEvent {
        SseEvent::Data(s.to_string())
    }

    #[test]
    fn buffers_partial_lines_across_chunks() {
        let mut d = SseLineDecoder::new();
        assert!(d.push(b"data: {\"a\":").unwrap().is_empty());
        assert!(d.push(b"1").unwrap().is_empty());
        assert_eq!(d.push(b"}\n\ndata: x\n").unwrap(), vec![data("{\"a\":1}"), data("x")]);
    }

    #[test]
    fn skips_comments_and_other_fields() {
        let mut d = SseLineDecoder::new();
        let got = d.push(b": keep-alive\nevent: message\nid: 4\r\ndata: hi\r\n\r\n").unwrap();
        assert_eq!(got, vec![data("hi")]);
    }

    #[test]
    fn done_ends_the_stream() {
        let mut d = SseLineDecoder::new();
        let got = d.push(b"data: a\ndata: [DONE]\ndata: late\n").unwrap();
        assert_eq!(got, vec![data("a"), SseEvent::Done]);
        assert!(d.is_done());
        assert!(d.push(b"data: more\n").unwrap().is_empty());
    }

    #[test]
    fn finish_flushes_unterminated_line() {
        let mut d = SseLineDecoder::new();
        assert!(d.push(b"data: tail").unwrap().is_empty());
        assert_eq!(d.finish(), Some(data("tail")));
        assert_eq!(d.finish(), None);
    }

    #[test]
    fn overlong_line_is_a_decode_error() {
        let mut d = SseLineDecoder::new();
        let half = vec![b'x'; MAX_LINE_BYTES / 2 + 1];
        assert!(d.push(b"data: ").unwrap().is_empty());
        assert!(d.push(&half).unwrap().is_empty());
        assert!(matches!(d.push(&half), Err(GatewayError::Decode(_))));
        assert!(d.is_done());
        assert!(d.push(b"\ndata: late\n").unwrap().is_empty());
    }

    #[test]
    fn long_line_under_the_cap_still_decodes() {
        let mut d = SseLineDecoder::new();
        let body = "y".repeat(MAX_LINE_BYTES - 16);
        assert!(d.push(b"data: ").unwrap().is_empty());
        for part in body.as_bytes().chunks(1024) {
            assert!(d.push(part).unwrap().is_empty());
        }
        assert_eq!(d.push(b"\n").unwrap(), vec![data(&body)]);
    }
}
