//! Ordered byte-stream views over a connection's payload.
//!
//! - **`materializer`**: streams the stored fragments of one flow from disk
//! - **`memory`**: the same contract over in-memory chunks

use std::future::Future;

use crate::error::StreamError;

pub mod materializer;
pub mod memory;

pub use materializer::StreamMaterializer;
pub use memory::MemoryStream;

/// Outcome of a successful `read` or `skip`.
///
/// Running out of data is not an error: the final call reports how many
/// bytes it still managed to deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// `n` bytes were delivered and the stream may hold more.
    Data(usize),
    /// `n` bytes were delivered and nothing follows them.
    EndOfStream(usize),
}

impl Progress {
    pub fn len(&self) -> usize {
        match *self {
            Progress::Data(n) | Progress::EndOfStream(n) => n,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Progress::EndOfStream(_))
    }
}

/// A sequential, forward-only byte source.
pub trait ByteStream {
    /// Copies up to `buf.len()` bytes into `buf`.
    fn read(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<Progress, StreamError>> + Send;

    /// Advances past up to `count` bytes, clamped to what is available.
    fn skip(&mut self, count: usize) -> impl Future<Output = Result<Progress, StreamError>> + Send;
}
