//! Newline-delimited JSON processing for streaming chat responses.
//!
//! The model server answers `POST /api/chat` with one JSON object per line.
//! This module turns the raw byte stream into [`StreamChunk`]s, buffering
//! partial lines across network reads.  A line that does not parse is
//! skipped (and logged at debug level); it never ends the stream.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::observability::{STREAM_BYTES, STREAM_CHUNKS, STREAM_SKIPPED_LINES};
use crate::types::{ChatResponseChunk, StreamChunk};
use crate::{Error, Result};

/// Process a stream of bytes into a stream of chat chunks.
///
/// Transport errors are passed through as [`Error::Streaming`]; the caller
/// decides whether to stop.  Bytes are buffered until a full line (or the
/// end of the stream) is available, so multi-byte UTF-8 sequences split
/// across reads decode correctly.
pub fn process_ndjson<S, E>(byte_stream: S) -> impl Stream<Item = Result<StreamChunk>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    let stream = byte_stream.map(|result| {
        result.map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    let buffer: Vec<u8> = Vec::new();

    stream::unfold(
        (stream, buffer, false),
        move |(mut stream, mut buffer, mut finished)| async move {
            loop {
                // Drain complete lines before reading more.
                while let Some(line) = take_line(&mut buffer) {
                    if let Some(chunk) = decode_line(&line) {
                        return Some((Ok(chunk), (stream, buffer, finished)));
                    }
                }

                if finished {
                    return None;
                }

                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        buffer.extend_from_slice(&bytes);
                    }
                    Some(Err(e)) => {
                        return Some((Err(e), (stream, buffer, finished)));
                    }
                    None => {
                        // A trailing line without a newline still counts.
                        finished = true;
                        if !buffer.is_empty() {
                            buffer.push(b'\n');
                        }
                    }
                }
            }
        },
    )
}

/// Removes and returns the first newline-terminated line from `buffer`.
fn take_line(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let newline = buffer.iter().position(|b| *b == b'\n')?;
    let mut line: Vec<u8> = buffer.drain(..=newline).collect();
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Some(line)
}

/// Decodes one line; `None` for blank or unparseable lines.
fn decode_line(line: &[u8]) -> Option<StreamChunk> {
    let text = match std::str::from_utf8(line) {
        Ok(text) => text.trim(),
        Err(e) => {
            STREAM_SKIPPED_LINES.click();
            tracing::debug!(error = %e, "skipping non-UTF-8 stream line");
            return None;
        }
    };
    if text.is_empty() {
        return None;
    }
    match serde_json::from_str::<ChatResponseChunk>(text) {
        Ok(chunk) => {
            STREAM_CHUNKS.click();
            Some(chunk.into())
        }
        Err(e) => {
            STREAM_SKIPPED_LINES.click();
            tracing::debug!(error = %e, line = text, "skipping unparseable stream line");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::io;

    fn ok(data: &'static [u8]) -> std::result::Result<Bytes, io::Error> {
        Ok(Bytes::from_static(data))
    }

    async fn collect<S>(stream: S) -> Vec<Result<StreamChunk>>
    where
        S: Stream<Item = Result<StreamChunk>>,
    {
        stream.collect().await
    }

    #[tokio::test]
    async fn parse_single_line() {
        let data = b"{\"message\":{\"role\":\"assistant\",\"content\":\"Hi\"},\"done\":false}\n";
        let chunks = collect(process_ndjson(stream::iter(vec![ok(data)]))).await;

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap(), &StreamChunk::fragment("Hi"));
    }

    #[tokio::test]
    async fn handle_split_line() {
        let chunks = collect(process_ndjson(stream::iter(vec![
            ok(b"{\"message\":{\"content\":\"Wh"),
            ok(b"y \"},\"done\":false}\n{\"done\":true}\n"),
        ])))
        .await;

        let chunks: Vec<StreamChunk> = chunks.into_iter().map(|c| c.unwrap()).collect();
        assert_eq!(
            chunks,
            vec![StreamChunk::fragment("Why "), StreamChunk::last("")]
        );
    }

    #[tokio::test]
    async fn skip_noise_lines() {
        let chunks = collect(process_ndjson(stream::iter(vec![ok(
            b"not json\n\n{\"message\":{\"content\":\"ok\"}}\r\n{broken\n",
        )])))
        .await;

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap(), &StreamChunk::fragment("ok"));
    }

    #[tokio::test]
    async fn trailing_line_without_newline() {
        let chunks = collect(process_ndjson(stream::iter(vec![ok(
            b"{\"message\":{\"content\":\"a\"}}\n{\"message\":{\"content\":\"b\"},\"done\":true}",
        )])))
        .await;

        let chunks: Vec<StreamChunk> = chunks.into_iter().map(|c| c.unwrap()).collect();
        assert_eq!(
            chunks,
            vec![StreamChunk::fragment("a"), StreamChunk::last("b")]
        );
    }

    #[tokio::test]
    async fn multibyte_character_split_across_reads() {
        let text = "{\"message\":{\"content\":\"caf\u{e9}\"}}\n".as_bytes().to_vec();
        let (head, tail) = text.split_at(text.len() - 5);
        let chunks = collect(process_ndjson(stream::iter(vec![
            Ok::<_, io::Error>(Bytes::from(head.to_vec())),
            Ok(Bytes::from(tail.to_vec())),
        ])))
        .await;

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap().content_fragment, "caf\u{e9}");
    }

    #[tokio::test]
    async fn transport_error_is_surfaced() {
        let chunks = collect(process_ndjson(stream::iter(vec![
            ok(b"{\"message\":{\"content\":\"a\"}}\n"),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ])))
        .await;

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].is_ok());
        let err = chunks[1].as_ref().unwrap_err();
        assert!(err.is_api());
        assert!(err.to_string().contains("reset"));
    }
}
