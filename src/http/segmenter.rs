use bytes::{Buf, BytesMut};

use crate::error::StreamError;
use crate::http::event::HttpEvent;
use crate::http::parser::{LineKind, classify_line};
use crate::stream::ByteStream;

/// Size of each read from the underlying stream.
const READ_SIZE: usize = 1024;

/// Lines longer than this are dropped unparsed.
const MAX_LINE_LEN: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    /// Outside any recognised message
    Idle,
    /// A start line was seen; scanning its header block
    InMessage { body_len: usize },
    /// Headers ended; this many body bytes are to be passed over
    SkippingBody(usize),
}

/// Finds HTTP message boundaries in a reconstructed byte stream.
///
/// ```text
///   Idle ──start line──▶ InMessage ──blank line──▶ SkippingBody ──▶ Idle
///                          │   ▲
///                          └───┘ Content-Length / other headers
/// ```
///
/// Only start lines become events. Header values other than
/// `Content-Length` are never stored, and bodies are skipped rather than
/// read.
pub struct HttpSegmenter<S> {
    stream: S,
    state: SegmenterState,
    /// Bytes read but not yet split into lines
    buf: BytesMut,
    chunk: Vec<u8>,
    /// Offset in `buf` where the next CRLF search starts
    scan_from: usize,
    /// Inside an over-long line whose bytes are being thrown away
    discarding: bool,
    eof: bool,
    consumed: u64,
}

impl<S: ByteStream> HttpSegmenter<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            state: SegmenterState::Idle,
            buf: BytesMut::with_capacity(READ_SIZE * 4),
            chunk: vec![0u8; READ_SIZE],
            scan_from: 0,
            discarding: false,
            eof: false,
            consumed: 0,
        }
    }

    pub fn state(&self) -> SegmenterState {
        self.state
    }

    /// Bytes pulled from the stream so far, read or skipped.
    pub fn bytes_consumed(&self) -> u64 {
        self.consumed
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Next event in the stream, or `None` once the stream is exhausted.
    pub async fn next_event(&mut self) -> Result<Option<HttpEvent>, StreamError> {
        loop {
            if let SegmenterState::SkippingBody(len) = self.state {
                self.skip_body(len).await?;
                self.state = SegmenterState::Idle;
            }

            let Some(line) = self.next_line().await? else {
                return Ok(None);
            };

            match (self.state, classify_line(&line)) {
                (SegmenterState::Idle, LineKind::RequestLine(req)) => {
                    self.state = SegmenterState::InMessage { body_len: 0 };
                    return Ok(Some(HttpEvent::Request(req)));
                }
                (SegmenterState::Idle, LineKind::StatusLine(resp)) => {
                    self.state = SegmenterState::InMessage { body_len: 0 };
                    return Ok(Some(HttpEvent::Response(resp)));
                }
                (SegmenterState::InMessage { .. }, LineKind::ContentLength(len)) => {
                    if len.is_none() {
                        tracing::trace!("Malformed Content-Length, assuming empty body");
                    }
                    self.state = SegmenterState::InMessage {
                        body_len: len.unwrap_or(0),
                    };
                }
                (SegmenterState::InMessage { body_len }, LineKind::Blank) => {
                    self.state = if body_len > 0 {
                        SegmenterState::SkippingBody(body_len)
                    } else {
                        SegmenterState::Idle
                    };
                }
                _ => {}
            }
        }
    }

    /// Drains the stream, returning every event in order.
    pub async fn collect(mut self) -> Result<Vec<HttpEvent>, StreamError> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await? {
            events.push(event);
        }
        Ok(events)
    }

    /// Next CRLF-terminated line, without the CRLF. A trailing fragment with
    /// no CRLF before end of stream is not a line.
    async fn next_line(&mut self) -> Result<Option<BytesMut>, StreamError> {
        loop {
            if let Some(pos) = find_crlf(&self.buf[self.scan_from..]) {
                let line = self.buf.split_to(self.scan_from + pos);
                self.buf.advance(2);
                self.scan_from = 0;

                if self.discarding {
                    self.discarding = false;
                    continue;
                }
                return Ok(Some(line));
            }

            // The last byte may be the CR of a CRLF split across reads.
            self.scan_from = self.buf.len().saturating_sub(1);

            if self.buf.len() > MAX_LINE_LEN {
                tracing::debug!(len = self.buf.len(), "Discarding over-long line");
                self.buf.advance(self.scan_from);
                self.scan_from = 0;
                self.discarding = true;
            }

            if self.eof {
                return Ok(None);
            }

            let progress = self.stream.read(&mut self.chunk).await?;
            let n = progress.len();
            self.buf.extend_from_slice(&self.chunk[..n]);
            self.consumed += n as u64;
            if progress.is_end() {
                self.eof = true;
            }
        }
    }

    async fn skip_body(&mut self, len: usize) -> Result<(), StreamError> {
        tracing::trace!(len, "Skipping message body");

        let buffered = len.min(self.buf.len());
        self.buf.advance(buffered);
        self.scan_from = 0;

        let remaining = len - buffered;
        if remaining > 0 && !self.eof {
            let progress = self.stream.skip(remaining).await?;
            self.consumed += progress.len() as u64;
            if progress.is_end() {
                self.eof = true;
            }
        }
        Ok(())
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}
