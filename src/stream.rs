//! Streaming reply assembly over Server-Sent Events
//!
//! Each outgoing chat message opens exactly one SSE connection. Reply
//! fragments are decoded from `data:` payloads and handed to a caller
//! callback in arrival order until the `[DONE]` sentinel, the end of
//! the stream, or a transport failure.

use crate::error::{QaChatError, Result};
use bytes::Bytes;
use futures::Stream;

/// Sentinel payload marking the end of a reply stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// Notice appended in-band to a reply when its stream dies mid-flight
pub const STREAM_ERROR_NOTICE: &str = "\n\n[Error: connection to the server was interrupted]";

/// Outcome of processing a single SSE event block
#[derive(Debug, PartialEq, Eq)]
enum EventOutcome {
    Continue,
    Done,
}

/// Consume an SSE byte stream, feeding decoded reply fragments to `on_fragment`
///
/// Events are framed on blank lines and consumed serially. The stream
/// ends cleanly on the `[DONE]` sentinel or on EOF; a trailing partial
/// event is still processed, since some servers close without a final
/// blank line.
///
/// # Errors
///
/// Returns `QaChatError::Stream` if the transport fails mid-reply. The
/// caller decides how to surface that; fragments delivered before the
/// failure have already been handed out.
pub async fn consume_stream<S, E, F>(byte_stream: S, mut on_fragment: F) -> Result<()>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: std::fmt::Display,
    F: FnMut(&str),
{
    use futures::StreamExt;

    // Byte buffer so multi-byte characters split across chunks survive;
    // frames are only decoded once complete.
    let mut buffer: Vec<u8> = Vec::new();

    tokio::pin!(byte_stream);

    while let Some(chunk_result) = byte_stream.next().await {
        let chunk = chunk_result
            .map_err(|e| QaChatError::Stream(format!("Connection lost mid-reply: {}", e)))?;

        buffer.extend_from_slice(&chunk);

        // SSE events are separated by blank lines (`\n\n`).
        while let Some(pos) = buffer.windows(2).position(|w| w == b"\n\n") {
            let frame: Vec<u8> = buffer.drain(..pos + 2).collect();
            let event_block = String::from_utf8_lossy(&frame[..pos]).into_owned();
            if process_event(&event_block, &mut on_fragment) == EventOutcome::Done {
                return Ok(());
            }
        }
    }

    if !buffer.is_empty() {
        let event_block = String::from_utf8_lossy(&buffer).into_owned();
        process_event(&event_block, &mut on_fragment);
    }

    Ok(())
}

/// Process a single SSE event block (the text between two `\n\n` delimiters)
fn process_event<F: FnMut(&str)>(event_block: &str, on_fragment: &mut F) -> EventOutcome {
    let mut data_lines: Vec<&str> = Vec::new();

    for line in event_block.lines() {
        if let Some(value) = line.strip_prefix("data:") {
            // SSE strips exactly one leading space after the colon.
            let value = value.strip_prefix(' ').unwrap_or(value);
            data_lines.push(value.trim_end_matches('\r'));
        }
        // `id:`, `event:`, `retry:` and `:` comment lines are ignored;
        // the server only speaks in data fields.
    }

    let data = data_lines.join("\n");

    if data.is_empty() {
        return EventOutcome::Continue;
    }

    if data == DONE_SENTINEL {
        return EventOutcome::Done;
    }

    for fragment in decode_fragments(&data) {
        on_fragment(&fragment);
    }

    EventOutcome::Continue
}

/// Decode an event payload into displayable reply fragments
///
/// Decoding falls through three stages:
///
/// 1. Strict JSON: a payload parsing as a JSON object contributes its
///    `content` string, or nothing if the field is absent.
/// 2. Recovery: payloads that fail strict parsing are scanned for
///    balanced `{...}` spans (string- and escape-aware), and every span
///    that parses contributes its `content`. Servers under load have
///    been seen flushing two JSON objects into one event.
/// 3. Raw text: if no JSON object is recoverable the whole payload is
///    one plain-text fragment, so server-side notices like
///    `[ERROR] ...` reach the user instead of disappearing.
pub fn decode_fragments(payload: &str) -> Vec<String> {
    if payload.is_empty() {
        return Vec::new();
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(payload) {
        return content_field(&value).into_iter().collect();
    }

    let mut fragments = Vec::new();
    let mut recovered = false;
    for span in scan_objects(payload) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(span) {
            recovered = true;
            if let Some(content) = content_field(&value) {
                fragments.push(content);
            }
        }
    }

    if recovered {
        return fragments;
    }

    vec![payload.to_string()]
}

/// Extract the `content` string from a decoded payload, if present
fn content_field(value: &serde_json::Value) -> Option<String> {
    value
        .get("content")
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
}

/// Find balanced top-level `{...}` spans in a payload
///
/// Braces inside JSON strings do not count toward nesting; escape
/// sequences inside strings are honored.
fn scan_objects(payload: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let bytes = payload.as_bytes();

    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' if depth > 0 => in_string = true,
            b'{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            b'}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(s) = start.take() {
                            spans.push(&payload[s..=i]);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    spans
}
