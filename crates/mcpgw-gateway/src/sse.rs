//! # SSE Decoder
//!
//! Turns a chunked byte stream from a backend's event endpoint into decoded
//! `data:` payloads. Handles:
//! - Line buffering across chunk boundaries
//! - `\n` and `\r\n` line endings
//! - `data: ` / `data:` prefix extraction
//! - Skipping comments, blank lines, and non-data fields
//! - A trailing unterminated line when the stream ends
//!
//! Transport errors are surfaced as stream items (then the stream ends) so
//! the caller can tell "backend closed" apart from "connection broke".

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};

/// Decode SSE `data:` payloads from a byte stream.
///
/// Yields `Ok(payload)` per data line, in order. A read error is yielded
/// once as `Err` and terminates the stream.
pub fn decode_events<S, E>(byte_stream: S) -> impl Stream<Item = Result<String, E>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send,
    E: Send,
{
    futures::stream::unfold(
        (Box::pin(byte_stream), BytesMut::with_capacity(8192), false),
        |(mut stream, mut buffer, done)| async move {
            if done {
                return None;
            }

            loop {
                if let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                    let mut line_bytes = buffer.split_to(newline_pos + 1);
                    line_bytes.truncate(line_bytes.len() - 1);
                    if line_bytes.last() == Some(&b'\r') {
                        line_bytes.truncate(line_bytes.len() - 1);
                    }

                    // invalid UTF-8 lines are malformed output, skip them
                    let Ok(line) = std::str::from_utf8(&line_bytes) else {
                        continue;
                    };

                    if let Some(data) = extract_data(line) {
                        return Some((Ok(data), (stream, buffer, false)));
                    }
                    continue;
                }

                match stream.next().await {
                    Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                    Some(Err(e)) => return Some((Err(e), (stream, buffer, true))),
                    None => {
                        if buffer.is_empty() {
                            return None;
                        }
                        let data = std::str::from_utf8(&buffer).ok().and_then(extract_data);
                        buffer.clear();
                        return data.map(|d| (Ok(d), (stream, buffer, true)));
                    }
                }
            }
        },
    )
}

/// Extract the payload from one SSE line.
///
/// Returns `None` for comments, blank lines, other fields (`event:`, `id:`,
/// `retry:`), and empty data.
pub fn extract_data(line: &str) -> Option<String> {
    let trimmed = line.trim();

    if trimmed.is_empty() || trimmed.starts_with(':') {
        return None;
    }

    let data = trimmed
        .strip_prefix("data: ")
        .or_else(|| trimmed.strip_prefix("data:"))?
        .trim();

    if data.is_empty() {
        return None;
    }

    Some(data.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
