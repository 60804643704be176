use std::collections::VecDeque;

use bytes::{Buf, Bytes};

use super::{ByteStream, Progress};
use crate::error::StreamError;

/// `ByteStream` over in-memory chunks.
///
/// A single `read` never returns bytes from more than one chunk, so chunk
/// boundaries show up to the reader exactly where they were placed.
#[derive(Debug, Default, Clone)]
pub struct MemoryStream {
    chunks: VecDeque<Bytes>,
}

impl MemoryStream {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self::from_chunks([data])
    }

    pub fn from_chunks<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
        }
    }

    fn drop_empty(&mut self) {
        while self.chunks.front().is_some_and(|c| c.is_empty()) {
            self.chunks.pop_front();
        }
    }
}

impl ByteStream for MemoryStream {
    async fn read(&mut self, buf: &mut [u8]) -> Result<Progress, StreamError> {
        self.drop_empty();
        let Some(front) = self.chunks.front_mut() else {
            return Ok(Progress::EndOfStream(0));
        };

        let n = buf.len().min(front.len());
        buf[..n].copy_from_slice(&front[..n]);
        front.advance(n);
        Ok(Progress::Data(n))
    }

    async fn skip(&mut self, count: usize) -> Result<Progress, StreamError> {
        let mut skipped = 0;
        while skipped < count {
            self.drop_empty();
            let Some(front) = self.chunks.front_mut() else {
                return Ok(Progress::EndOfStream(skipped));
            };
            let n = (count - skipped).min(front.len());
            front.advance(n);
            skipped += n;
        }
        Ok(Progress::Data(skipped))
    }
}
