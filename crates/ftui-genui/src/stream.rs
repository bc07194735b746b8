//! Stream ingestion loop.
//!
//! One producer ([`ChunkSource`]), one append-only [`TranscriptBuffer`], one
//! [`Pipeline`]. Every delta is appended and the *whole* buffer is run
//! through the pipeline again, strictly in arrival order; the pass is handed
//! to the caller, which replaces whatever it displayed before (keyed by
//! record id). When the source is exhausted one more pass runs so a
//! directive closed by the last delta is never missed.
//!
//! Re-extracting the full buffer per delta is quadratic in response length.
//! Responses are short and extraction is a regex scan, so the loop keeps the
//! simple, obviously-correct form.
//!
//! Cancellation is cooperative: the [`AbortHandle`] is checked before each
//! chunk is awaited. A pass already running finishes, nothing already
//! rendered is withdrawn.

use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::error::TransportError;
use crate::pipeline::{Pipeline, PipelinePass};

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// The transport: yields the next chunk given what has accumulated so far.
///
/// `None` means the response is complete.
pub trait ChunkSource {
    fn next_chunk(&mut self, accumulated: &str) -> Option<Result<String, TransportError>>;
}

impl<S: ChunkSource + ?Sized> ChunkSource for &mut S {
    fn next_chunk(&mut self, accumulated: &str) -> Option<Result<String, TransportError>> {
        (**self).next_chunk(accumulated)
    }
}

impl<S: ChunkSource + ?Sized> ChunkSource for Box<S> {
    fn next_chunk(&mut self, accumulated: &str) -> Option<Result<String, TransportError>> {
        (**self).next_chunk(accumulated)
    }
}

/// Fixture source over pre-split chunks.
#[derive(Debug, Clone)]
pub struct IterSource<I> {
    chunks: I,
}

impl<I> IterSource<I>
where
    I: Iterator,
    I::Item: Into<String>,
{
    #[must_use]
    pub fn new<T>(chunks: T) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self {
            chunks: chunks.into_iter(),
        }
    }
}

impl IterSource<std::vec::IntoIter<String>> {
    /// Split `text` into chunks of at most `size` bytes, never inside a char.
    #[must_use]
    pub fn from_text(text: &str, size: usize) -> Self {
        let size = size.max(1);
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < text.len() {
            let mut end = (start + size).min(text.len());
            while !text.is_char_boundary(end) {
                end += 1;
            }
            chunks.push(text[start..end].to_string());
            start = end;
        }
        Self {
            chunks: chunks.into_iter(),
        }
    }
}

impl<I> ChunkSource for IterSource<I>
where
    I: Iterator,
    I::Item: Into<String>,
{
    fn next_chunk(&mut self, _accumulated: &str) -> Option<Result<String, TransportError>> {
        self.chunks.next().map(|chunk| Ok(chunk.into()))
    }
}

/// Reads UTF-8 text from any [`Read`], never splitting a character across
/// chunks.
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
    chunk_size: usize,
    pending: Vec<u8>,
    consumed: usize,
    finished: bool,
}

impl<R: Read> ReaderSource<R> {
    #[must_use]
    pub fn new(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(1),
            pending: Vec::new(),
            consumed: 0,
            finished: false,
        }
    }

    /// Take the longest valid UTF-8 prefix of the pending bytes. Invalid
    /// bytes are reported only once everything before them was delivered.
    fn take_valid(&mut self) -> Result<Option<String>, TransportError> {
        let valid = match std::str::from_utf8(&self.pending) {
            Ok(text) => text.len(),
            Err(error) if error.error_len().is_some() && error.valid_up_to() == 0 => {
                return Err(TransportError::InvalidUtf8 {
                    offset: self.consumed,
                });
            }
            Err(error) => error.valid_up_to(),
        };
        if valid == 0 {
            return Ok(None);
        }
        let rest = self.pending.split_off(valid);
        let bytes = std::mem::replace(&mut self.pending, rest);
        self.consumed += valid;
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| TransportError::InvalidUtf8 {
                offset: self.consumed,
            })
    }
}

impl<R: Read> ChunkSource for ReaderSource<R> {
    fn next_chunk(&mut self, _accumulated: &str) -> Option<Result<String, TransportError>> {
        if self.finished {
            return None;
        }
        let mut buf = vec![0u8; self.chunk_size];
        loop {
            match self.take_valid() {
                Ok(Some(text)) => return Some(Ok(text)),
                Ok(None) => {}
                Err(error) => {
                    self.finished = true;
                    return Some(Err(error));
                }
            }

            let read = match self.reader.read(&mut buf) {
                Ok(read) => read,
                Err(error) if error.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(error) => {
                    self.finished = true;
                    return Some(Err(error.into()));
                }
            };
            if read == 0 {
                self.finished = true;
                if self.pending.is_empty() {
                    return None;
                }
                // Truncated multi-byte sequence at end of stream.
                return Some(Err(TransportError::InvalidUtf8 {
                    offset: self.consumed,
                }));
            }
            self.pending.extend_from_slice(&buf[..read]);
        }
    }
}

/// Source backed by a closure, e.g. a network client's "read next" call.
pub struct FnSource<F> {
    next: F,
}

impl<F> FnSource<F>
where
    F: FnMut(&str) -> Option<Result<String, TransportError>>,
{
    #[must_use]
    pub fn new(next: F) -> Self {
        Self { next }
    }
}

impl<F> ChunkSource for FnSource<F>
where
    F: FnMut(&str) -> Option<Result<String, TransportError>>,
{
    fn next_chunk(&mut self, accumulated: &str) -> Option<Result<String, TransportError>> {
        (self.next)(accumulated)
    }
}

/// Wraps a source and sleeps between chunks, to replay at a readable pace.
#[derive(Debug)]
pub struct PacedSource<S> {
    inner: S,
    delay: Duration,
    started: bool,
}

impl<S: ChunkSource> PacedSource<S> {
    #[must_use]
    pub fn new(inner: S, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            started: false,
        }
    }
}

impl<S: ChunkSource> ChunkSource for PacedSource<S> {
    fn next_chunk(&mut self, accumulated: &str) -> Option<Result<String, TransportError>> {
        if self.started && !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.started = true;
        self.inner.next_chunk(accumulated)
    }
}

// ---------------------------------------------------------------------------
// Buffer and cancellation
// ---------------------------------------------------------------------------

/// Append-only accumulation of one response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptBuffer {
    text: String,
    deltas: usize,
}

impl TranscriptBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, delta: &str) {
        self.text.push_str(delta);
        self.deltas += 1;
    }

    /// Immutable snapshot for one pipeline pass.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    #[must_use]
    pub fn delta_count(&self) -> usize {
        self.deltas
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }
}

/// Cooperative cancellation flag, cheap to clone across threads.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// What caused a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PassTrigger {
    /// The n-th delta (1-based) was appended.
    Delta(usize),
    /// The source reported completion.
    Final,
}

/// One pass handed to the observer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPass {
    /// 0-based position among all passes of the session.
    pub sequence: usize,
    pub trigger: PassTrigger,
    pub text_len: usize,
    #[serde(flatten)]
    pub pass: PipelinePass,
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StreamStatus {
    Completed,
    Aborted,
    Failed,
}

/// Final state of a session.
#[derive(Debug)]
pub struct StreamOutcome {
    pub status: StreamStatus,
    pub transcript: String,
    /// The most recent pass; what stays on screen.
    pub last_pass: Option<RenderPass>,
    pub passes: usize,
    /// Single user-facing message when the transport failed.
    pub notice: Option<String>,
    pub error: Option<TransportError>,
}

/// Drives one response through the pipeline.
#[derive(Debug)]
pub struct StreamSession {
    pipeline: Pipeline,
    buffer: TranscriptBuffer,
    abort: AbortHandle,
}

impl StreamSession {
    #[must_use]
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            buffer: TranscriptBuffer::new(),
            abort: AbortHandle::new(),
        }
    }

    /// Share an existing abort flag (e.g. a UI "stop" button).
    #[must_use]
    pub fn with_abort(mut self, abort: AbortHandle) -> Self {
        self.abort = abort;
        self
    }

    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Consume `source` until completion, abort or failure.
    pub fn run<S, F>(mut self, mut source: S, mut on_pass: F) -> StreamOutcome
    where
        S: ChunkSource,
        F: FnMut(&RenderPass),
    {
        let mut passes = 0;
        let mut last_pass: Option<RenderPass> = None;

        let (status, error) = loop {
            if self.abort.is_aborted() {
                tracing::debug!(
                    message = "genui.stream.aborted",
                    deltas = self.buffer.delta_count(),
                );
                break (StreamStatus::Aborted, None);
            }

            let trigger = match source.next_chunk(self.buffer.as_str()) {
                Some(Ok(delta)) => {
                    self.buffer.append(&delta);
                    PassTrigger::Delta(self.buffer.delta_count())
                }
                Some(Err(error)) => {
                    tracing::warn!(
                        error = %error,
                        deltas = self.buffer.delta_count(),
                        "response stream failed"
                    );
                    break (StreamStatus::Failed, Some(error));
                }
                None => PassTrigger::Final,
            };

            let pass = RenderPass {
                sequence: passes,
                trigger,
                text_len: self.buffer.len(),
                pass: self.pipeline.run(self.buffer.as_str()),
            };
            passes += 1;
            on_pass(&pass);
            last_pass = Some(pass);

            if trigger == PassTrigger::Final {
                break (StreamStatus::Completed, None);
            }
        };

        StreamOutcome {
            status,
            transcript: self.buffer.into_string(),
            last_pass,
            passes,
            notice: error.as_ref().map(TransportError::user_notice),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenUiConfig;

    fn session() -> StreamSession {
        StreamSession::new(Pipeline::with_epoch(GenUiConfig::default(), 1))
    }

    #[test]
    fn from_text_respects_char_boundaries() {
        let mut source = IterSource::from_text("héllo", 2);
        let mut chunks = Vec::new();
        while let Some(Ok(chunk)) = source.next_chunk("") {
            chunks.push(chunk);
        }
        assert_eq!(chunks.concat(), "héllo");
        assert!(chunks.iter().all(|c| !c.is_empty()));
    }

    #[test]
    fn reader_source_keeps_multibyte_chars_whole() {
        let text = "ab→cd";
        let mut source = ReaderSource::new(text.as_bytes(), 3);
        let mut out = String::new();
        while let Some(chunk) = source.next_chunk(&out) {
            out.push_str(&chunk.expect("valid utf-8"));
        }
        assert_eq!(out, text);
    }

    #[test]
    fn reader_source_reports_invalid_utf8_offset() {
        let bytes: &[u8] = b"ok\xffno";
        let mut source = ReaderSource::new(bytes, 16);
        assert_eq!(
            source.next_chunk("").map(|chunk| chunk.map_err(|e| e.to_string())),
            Some(Ok("ok".to_string()))
        );
        assert!(matches!(
            source.next_chunk(""),
            Some(Err(TransportError::InvalidUtf8 { offset: 2 }))
        ));
        assert!(source.next_chunk("").is_none());
    }

    #[test]
    fn completed_stream_runs_a_final_pass() {
        let source = IterSource::new(["a", "b"]);
        let mut triggers = Vec::new();
        let outcome = session().run(source, |pass| triggers.push(pass.trigger));
        assert_eq!(outcome.status, StreamStatus::Completed);
        assert_eq!(
            triggers,
            vec![PassTrigger::Delta(1), PassTrigger::Delta(2), PassTrigger::Final]
        );
        assert_eq!(outcome.passes, 3);
        assert_eq!(outcome.transcript, "ab");
    }

    #[test]
    fn abort_before_start_consumes_nothing() {
        let session = session();
        session.abort_handle().abort();
        let outcome = session.run(IterSource::new(["a"]), |_| panic!("no pass expected"));
        assert_eq!(outcome.status, StreamStatus::Aborted);
        assert_eq!(outcome.passes, 0);
        assert!(outcome.last_pass.is_none());
    }

    #[test]
    fn fn_source_sees_accumulated_text() {
        let mut seen = Vec::new();
        let source = FnSource::new(|accumulated: &str| {
            seen.push(accumulated.len());
            (accumulated.len() < 3).then(|| Ok("x".to_string()))
        });
        let outcome = session().run(source, |_| {});
        assert_eq!(outcome.transcript, "xxx");
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }
}
