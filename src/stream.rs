//! Streaming reply reader.
//!
//! [`FragmentReader`] turns the lines of a streaming reply into the text
//! fragments they carry and stops at the completion record.
//!
//! ```text
//! Streaming(source) --done=true / end of source / error--> Closed
//! ```
//!
//! The line source (and through it the HTTP response body) is owned by the
//! `Streaming` state, so leaving that state or dropping the reader releases
//! the connection.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::stream::{BoxStream, FusedStream, Stream, StreamExt};
use tracing::{debug, trace, warn};

use crate::client::ClientError;
use crate::model::StreamRecord;
use crate::ndjson::NdjsonResponseExt;

/// Boxed source of raw reply lines.
pub type LineStream = BoxStream<'static, Result<Bytes, ClientError>>;

enum ReaderState<L> {
    Streaming(L),
    Closed,
}

/// Lazy stream of text fragments from one streaming reply.
///
/// Fragments are yielded in arrival order, one per record that carries
/// non-empty text. The stream ends after the record with `done = true`,
/// which stays available through [`FragmentReader::completion`]. Ending
/// without that record yields [`ClientError::TruncatedStream`]. After the
/// first error the reader is closed and yields nothing more.
///
/// # Example
/// ```
/// use bytes::Bytes;
/// use futures::stream;
/// use ollama_stream::stream::FragmentReader;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let lines = stream::iter(vec![
///     Ok(Bytes::from(r#"{"response":"Hel"}"#)),
///     Ok(Bytes::from(r#"{"response":"lo"}"#)),
///     Ok(Bytes::from(r#"{"response":"","done":true}"#)),
/// ]);
///
/// let mut reader = FragmentReader::new(lines);
/// assert_eq!(reader.collect_text().await.unwrap(), "Hello");
/// assert!(reader.is_closed());
/// # });
/// ```
pub struct FragmentReader<L = LineStream> {
    state: ReaderState<L>,
    records: usize,
    completion: Option<StreamRecord>,
}

impl FragmentReader<LineStream> {
    /// Read the body of a streaming HTTP reply.
    pub fn from_response(response: reqwest::Response) -> Self {
        Self::new(response.ndjson_lines().boxed())
    }
}

impl<L> FragmentReader<L>
where
    L: Stream<Item = Result<Bytes, ClientError>> + Unpin,
{
    /// Start a session over a source of raw lines.
    pub fn new(lines: L) -> Self {
        Self {
            state: ReaderState::Streaming(lines),
            records: 0,
            completion: None,
        }
    }

    /// Drain the remaining fragments into one string.
    pub async fn collect_text(&mut self) -> Result<String, ClientError> {
        let mut text = String::new();
        while let Some(fragment) = self.next().await {
            text.push_str(&fragment?);
        }
        Ok(text)
    }
}

impl<L> FragmentReader<L> {
    /// Whether the session has ended and the line source was released.
    pub fn is_closed(&self) -> bool {
        matches!(self.state, ReaderState::Closed)
    }

    /// Number of non-blank records decoded so far.
    pub fn records_read(&self) -> usize {
        self.records
    }

    /// The completion record, once it has been observed.
    pub fn completion(&self) -> Option<&StreamRecord> {
        self.completion.as_ref()
    }

    fn close(&mut self) {
        self.state = ReaderState::Closed;
    }
}

impl<L> Stream for FragmentReader<L>
where
    L: Stream<Item = Result<Bytes, ClientError>> + Unpin,
{
    type Item = Result<String, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            let lines = match &mut this.state {
                ReaderState::Streaming(lines) => lines,
                ReaderState::Closed => return Poll::Ready(None),
            };

            let line = match lines.poll_next_unpin(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(line))) => line,
                Poll::Ready(Some(Err(e))) => {
                    this.close();
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    this.close();
                    warn!(records = this.records, "stream ended without a completion record");
                    return Poll::Ready(Some(Err(ClientError::TruncatedStream {
                        records: this.records,
                    })));
                }
            };

            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let mut record = match StreamRecord::from_line(&line) {
                Ok(record) => record,
                Err(e) => {
                    this.close();
                    warn!(records = this.records, error = %e, "malformed stream record");
                    return Poll::Ready(Some(Err(e)));
                }
            };
            this.records += 1;

            if let Some(message) = record.error.take() {
                this.close();
                warn!(records = this.records, %message, "server aborted the stream");
                return Poll::Ready(Some(Err(ClientError::Server(message))));
            }

            let fragment = record
                .fragment()
                .filter(|fragment| !fragment.is_empty())
                .map(str::to_owned);

            if record.done {
                this.close();
                debug!(
                    records = this.records,
                    done_reason = record.done_reason.as_deref().unwrap_or("unknown"),
                    "stream completed"
                );
                this.completion = Some(record);
            }

            if let Some(fragment) = fragment {
                trace!(len = fragment.len(), "fragment");
                return Poll::Ready(Some(Ok(fragment)));
            }
        }
    }
}

impl<L> FusedStream for FragmentReader<L>
where
    L: Stream<Item = Result<Bytes, ClientError>> + Unpin,
{
    fn is_terminated(&self) -> bool {
        self.is_closed()
    }
}
