//! Newline-delimited JSON line splitting.
//!
//! A streaming reply body is one JSON object per line:
//! ```text
//! {"model":"llama2","response":"Hel","done":false}
//! {"model":"llama2","response":"lo","done":false}
//! {"model":"llama2","response":"","done":true,"eval_count":2}
//! ```
//!
//! This module only cuts the byte stream into lines. Decoding, blank-line
//! handling and completion detection belong to [`crate::stream::FragmentReader`].

use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};

use crate::client::ClientError;

/// Extension trait for `reqwest::Response` to read the body as NDJSON lines.
pub trait NdjsonResponseExt {
    /// Convert the response into a stream of raw lines.
    fn ndjson_lines(self) -> impl Stream<Item = Result<Bytes, ClientError>> + Send + 'static;
}

impl NdjsonResponseExt for reqwest::Response {
    fn ndjson_lines(self) -> impl Stream<Item = Result<Bytes, ClientError>> + Send + 'static {
        lines(self.bytes_stream())
    }
}

/// Longest line accepted by [`lines`], in bytes (1MB).
pub const MAX_LINE_SIZE: usize = 1_048_576;

/// Split a chunked byte stream into lines of at most [`MAX_LINE_SIZE`] bytes.
///
/// Lines end at `\n`; a trailing `\r` is dropped. Chunk boundaries may fall
/// anywhere, including inside a multi-byte character. A last line without a
/// terminating newline is still produced when the body ends. The first
/// transport error is forwarded and ends the stream.
pub fn lines<S, E>(byte_stream: S) -> impl Stream<Item = Result<Bytes, ClientError>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<ClientError> + Send + 'static,
{
    lines_with_limit(byte_stream, MAX_LINE_SIZE)
}

/// Like [`lines`], with a custom line length limit.
///
/// A line longer than `max_line` bytes yields [`ClientError::LineTooLong`]
/// and ends the stream without reading further.
pub fn lines_with_limit<S, E>(
    byte_stream: S,
    max_line: usize,
) -> impl Stream<Item = Result<Bytes, ClientError>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<ClientError> + Send + 'static,
{
    let splitter = LineSplitter {
        byte_stream: Box::pin(byte_stream),
        buffer: BytesMut::new(),
        scanned: 0,
        stream_ended: false,
        max_line,
    };

    stream::unfold(splitter, |mut splitter| async move {
        let item = splitter.next_line().await?;
        Some((item, splitter))
    })
}

struct LineSplitter<S> {
    byte_stream: Pin<Box<S>>,
    buffer: BytesMut,
    /// Bytes of `buffer` already known to hold no newline.
    scanned: usize,
    stream_ended: bool,
    max_line: usize,
}

impl<S, E> LineSplitter<S>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<ClientError>,
{
    async fn next_line(&mut self) -> Option<Result<Bytes, ClientError>> {
        loop {
            if let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') {
                let pos = self.scanned + offset;
                if pos > self.max_line {
                    return Some(Err(self.too_long()));
                }
                self.scanned = 0;
                return Some(Ok(strip_line_ending(self.buffer.split_to(pos + 1).freeze())));
            }
            self.scanned = self.buffer.len();

            if self.buffer.len() > self.max_line {
                return Some(Err(self.too_long()));
            }

            if self.stream_ended {
                if self.buffer.is_empty() {
                    return None;
                }
                self.scanned = 0;
                return Some(Ok(strip_line_ending(self.buffer.split().freeze())));
            }

            match self.byte_stream.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    self.finish();
                    return Some(Err(e.into()));
                }
                None => self.stream_ended = true,
            }
        }
    }

    fn too_long(&mut self) -> ClientError {
        self.finish();
        ClientError::LineTooLong {
            limit: self.max_line,
        }
    }

    /// Drop buffered bytes and stop reading from the source.
    fn finish(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
        self.stream_ended = true;
    }
}

fn strip_line_ending(mut line: Bytes) -> Bytes {
    if line.ends_with(b"\n") {
        line.truncate(line.len() - 1);
    }
    if line.ends_with(b"\r") {
        line.truncate(line.len() - 1);
    }
    line
}
