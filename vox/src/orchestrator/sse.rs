//! Incremental decoder for `text/event-stream` responses
//!
//! Network chunks arrive at arbitrary byte boundaries, so the decoder
//! buffers raw bytes and only interprets complete lines. A complete
//! `data:` line whose JSON fails to parse is pushed back onto the buffer
//! in case later bytes complete it; `flush` makes a final best-effort
//! pass over whatever is left when the stream ends.

use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize, Default)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Deserialize, Default)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

fn delta_content(data: &str) -> Result<Option<String>, serde_json::Error> {
    let chunk: StreamChunk = serde_json::from_str(data)?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty()))
}

/// Stateful SSE decoder
///
/// Feed it raw bytes as they arrive; it returns the content deltas found
/// in each call. The split of input into `feed` calls does not change the
/// concatenated output.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the `[DONE]` sentinel has been seen or `flush` was called
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Consume a network chunk, returning any content deltas it completed
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut deltas = Vec::new();
        if self.done {
            return deltas;
        }
        self.buf.extend_from_slice(chunk);

        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line_bytes: Vec<u8> = self.buf.drain(..=pos).collect();
            line_bytes.pop();

            let Ok(raw) = std::str::from_utf8(&line_bytes) else {
                continue;
            };
            let line = raw.trim();
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            let Some(data) = line.strip_prefix("data: ") else {
                continue;
            };
            if data == "[DONE]" {
                self.done = true;
                return deltas;
            }

            match delta_content(data) {
                Ok(Some(content)) => deltas.push(content),
                Ok(None) => {}
                Err(_) => {
                    // Incomplete JSON; put the line back and wait for more bytes
                    line_bytes.push(b'\n');
                    line_bytes.extend_from_slice(&self.buf);
                    self.buf = line_bytes;
                    return deltas;
                }
            }
        }
        deltas
    }

    /// Final pass over buffered bytes once the stream has ended
    ///
    /// Unparseable leftovers are dropped.
    pub fn flush(&mut self) -> Vec<String> {
        self.done = true;
        let buf = std::mem::take(&mut self.buf);
        let Ok(text) = String::from_utf8(buf) else {
            return Vec::new();
        };

        let mut deltas = Vec::new();
        for raw in text.split('\n') {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            let Some(data) = line.strip_prefix("data: ") else {
                continue;
            };
            if data == "[DONE]" {
                continue;
            }
            if let Ok(Some(content)) = delta_content(data) {
                deltas.push(content);
            }
        }
        deltas
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn event(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"delta": {"content": content}}]})
        )
    }

    fn decode_all(stream: &[u8]) -> String {
        let mut decoder = SseDecoder::new();
        let mut out = decoder.feed(stream).concat();
        out.push_str(&decoder.flush().concat());
        out
    }

    #[test]
    fn test_single_event() {
        let mut decoder = SseDecoder::new();
        let deltas = decoder.feed(event("Hello").as_bytes());
        assert_eq!(deltas, vec!["Hello"]);
    }

    #[test]
    fn test_done_sentinel() {
        let mut decoder = SseDecoder::new();
        let stream = format!("{}data: [DONE]\n\n", event("Hi"));
        let deltas = decoder.feed(stream.as_bytes());
        assert_eq!(deltas, vec!["Hi"]);
        assert!(decoder.is_done());
        // Nothing after the sentinel is decoded
        assert!(decoder.feed(event("late").as_bytes()).is_empty());
    }

    #[test]
    fn test_event_split_mid_line() {
        let full = event("Hello, world");
        let bytes = full.as_bytes();
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(&bytes[..10]).is_empty());
        let deltas = decoder.feed(&bytes[10..]);
        assert_eq!(deltas, vec!["Hello, world"]);
    }

    #[test]
    fn test_crlf_lines() {
        let json = serde_json::json!({"choices": [{"delta": {"content": "ok"}}]});
        let stream = format!("data: {json}\r\n\r\n");
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.feed(stream.as_bytes()), vec!["ok"]);
    }

    #[test]
    fn test_comment_and_event_lines_skipped() {
        let stream = format!(": keep-alive\nevent: message\n{}", event("x"));
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.feed(stream.as_bytes()), vec!["x"]);
    }

    #[test]
    fn test_empty_delta_skipped() {
        let stream = "data: {\"choices\": [{\"delta\": {}}]}\n\n";
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(stream.as_bytes()).is_empty());
    }

    #[test]
    fn test_malformed_line_rebuffered_then_flushed() {
        let mut decoder = SseDecoder::new();
        // A data line with truncated JSON followed by a newline stays buffered
        assert!(decoder.feed(b"data: {\"choices\": [{\"delta\": {\"content\": \"par\n").is_empty());
        // flush drops what never became valid JSON
        assert!(decoder.flush().is_empty());
    }

    #[test]
    fn test_flush_recovers_unterminated_line() {
        let mut decoder = SseDecoder::new();
        let json = serde_json::json!({"choices": [{"delta": {"content": "tail"}}]});
        let stream = format!("data: {json}");
        assert!(decoder.feed(stream.as_bytes()).is_empty());
        assert_eq!(decoder.flush(), vec!["tail"]);
        assert!(decoder.is_done());
    }

    proptest! {
        #[test]
        fn prop_chunk_boundaries_do_not_change_output(
            contents in proptest::collection::vec("[a-zA-Z0-9 éλ🎯]{0,12}", 1..6),
            splits in proptest::collection::vec(0usize..200, 0..8),
        ) {
            let mut stream = String::new();
            for content in &contents {
                stream.push_str(&event(content));
            }
            stream.push_str("data: [DONE]\n\n");
            let bytes = stream.as_bytes();

            let expected = decode_all(bytes);

            let mut cuts: Vec<usize> = splits.iter().map(|s| s % (bytes.len() + 1)).collect();
            cuts.sort_unstable();
            cuts.dedup();

            let mut decoder = SseDecoder::new();
            let mut actual = String::new();
            let mut start = 0;
            for cut in cuts {
                actual.push_str(&decoder.feed(&bytes[start..cut]).concat());
                start = cut;
            }
            actual.push_str(&decoder.feed(&bytes[start..]).concat());
            actual.push_str(&decoder.flush().concat());

            prop_assert_eq!(actual, expected);
        }
    }
}
