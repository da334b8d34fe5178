/// Line-delimited SSE decoder for the completion stream.
///
/// The body arrives as arbitrary byte chunks. Lines are split on `\n`, a trailing
/// `\r` is dropped, and every `data:` line yields one event. Multi-byte UTF-8
/// sequences cut by a chunk boundary are held back until the rest arrives.
use std::collections::VecDeque;

use futures::{Stream, StreamExt};

/// Marker the server sends before closing the stream. Not a terminator.
pub const DONE_SENTINEL: &str = "[DONE]";

/// A single `data:` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub data: String,
}

impl SseEvent {
    pub fn is_done(&self) -> bool {
        self.data == DONE_SENTINEL
    }
}

/// Incremental parser that buffers incomplete lines across chunk boundaries.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
    pending: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes from the HTTP response. Returns the events on any complete lines.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.decode(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            if let Some(event) = parse_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// End of body: whatever is left becomes the final line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.buffer.push_str(&String::from_utf8_lossy(&rest));
        }
        let line = std::mem::take(&mut self.buffer);
        parse_line(&line)
    }

    fn decode(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        let valid = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            // Truncated sequence at the end: keep it for the next chunk.
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(_) => self.pending.len(),
        };
        let bytes: Vec<u8> = self.pending.drain(..valid).collect();
        self.buffer.push_str(&String::from_utf8_lossy(&bytes));
    }
}

fn parse_line(line: &str) -> Option<SseEvent> {
    let line = line.trim_end_matches('\n').trim_end_matches('\r');
    // Other fields (event:, id:, retry:, ": comment") carry nothing we use.
    let data = line.strip_prefix("data:")?;
    Some(SseEvent {
        data: data.strip_prefix(' ').unwrap_or(data).to_string(),
    })
}

/// Lazily turn a chunked body into SSE events.
///
/// A transport error is yielded once and ends the sequence. Each call wraps
/// one connection; the returned stream cannot be replayed.
pub fn events<S, B, E>(body: S) -> impl Stream<Item = Result<SseEvent, E>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    let state = (Box::pin(body), SseParser::new(), VecDeque::new(), false);
    futures::stream::unfold(
        state,
        |(mut body, mut parser, mut queue, mut finished)| async move {
            loop {
                if let Some(event) = queue.pop_front() {
                    return Some((Ok(event), (body, parser, queue, finished)));
                }
                if finished {
                    return None;
                }
                match body.next().await {
                    Some(Ok(chunk)) => queue.extend(parser.feed(chunk.as_ref())),
                    Some(Err(e)) => {
                        finished = true;
                        return Some((Err(e), (body, parser, queue, finished)));
                    }
                    None => {
                        finished = true;
                        queue.extend(parser.finish());
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_sse() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: hello\n\ndata: world\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "hello");
        assert_eq!(events[1].data, "world");
    }

    #[test]
    fn test_ignores_other_fields_and_crlf() {
        let mut parser = SseParser::new();
        let events = parser.feed(b": OPENROUTER PROCESSING\r\nevent: x\r\ndata: {\"a\":1}\r\n\r\n");
        assert_eq!(events, vec![SseEvent { data: "{\"a\":1}".into() }]);
    }

    #[test]
    fn test_split_across_chunks() {
        let mut parser = SseParser::new();
        let events1 = parser.feed(b"data: hel");
        assert_eq!(events1.len(), 0);
        let events2 = parser.feed(b"lo\n\n");
        assert_eq!(events2.len(), 1);
        assert_eq!(events2[0].data, "hello");
    }

    #[test]
    fn test_split_utf8_sequence() {
        let bytes = "data: héllo\n".as_bytes();
        // "é" is two bytes; cut between them.
        let cut = "data: h".len() + 1;
        let mut parser = SseParser::new();
        assert!(parser.feed(&bytes[..cut]).is_empty());
        let events = parser.feed(&bytes[cut..]);
        assert_eq!(events[0].data, "héllo");
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: tail").is_empty());
        assert_eq!(parser.finish().map(|e| e.data), Some("tail".to_string()));
        assert_eq!(parser.finish(), None);
    }

    #[test]
    fn test_done_sentinel() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: [DONE]\n");
        assert!(events[0].is_done());
    }

    #[tokio::test]
    async fn test_events_stream_yields_lazily() {
        let chunks: Vec<Result<&[u8], String>> = vec![
            Ok(b"data: one\nda".as_slice()),
            Ok(b"ta: two\n".as_slice()),
            Ok(b"data: three".as_slice()),
        ];
        let collected: Vec<_> = events(futures::stream::iter(chunks))
            .map(|r| r.map(|e| e.data))
            .collect()
            .await;
        assert_eq!(
            collected,
            vec![Ok("one".to_string()), Ok("two".to_string()), Ok("three".to_string())]
        );
    }

    #[tokio::test]
    async fn test_events_stream_stops_after_error() {
        let chunks: Vec<Result<&[u8], String>> = vec![
            Ok(b"data: one\n".as_slice()),
            Err("connection reset".to_string()),
            Ok(b"data: never\n".as_slice()),
        ];
        let collected: Vec<_> = events(futures::stream::iter(chunks)).collect().await;
        assert_eq!(collected.len(), 2);
        assert!(collected[1].is_err());
    }
}
