//! Reconstructs one flow's byte stream from its stored fragments.

use bytes::Bytes;

use super::{ByteStream, Progress};
use crate::error::StreamError;
use crate::flow::ConnectionId;
use crate::store::{FragmentStore, StoredFragment};

/// Sequential cursor over the concatenation of a flow's fragments.
///
/// Only the fragment under the cursor is held in memory; the next one is
/// loaded when the current one runs out.
#[derive(Debug)]
pub struct StreamMaterializer {
    fragments: Vec<StoredFragment>,
    next_index: usize,
    current: Bytes,
    offset: usize,
    position: u64,
    total_size: u64,
}

impl StreamMaterializer {
    /// `fragments` must already be in sequence-token order.
    pub fn new(fragments: Vec<StoredFragment>) -> Self {
        let total_size = fragments.iter().map(|f| f.len).sum();
        Self {
            fragments,
            next_index: 0,
            current: Bytes::new(),
            offset: 0,
            position: 0,
            total_size,
        }
    }

    pub async fn open(store: &FragmentStore, id: &ConnectionId) -> Result<Self, StreamError> {
        let fragments = store.list_ordered(id).await?;
        tracing::debug!(flow = %id, fragments = fragments.len(), "Materializing stream");
        Ok(Self::new(fragments))
    }

    /// Bytes read or skipped so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Sum of the fragment sizes as listed.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    fn remaining(&self) -> usize {
        self.current.len() - self.offset
    }

    /// Loads the next fragment. Returns `false` once the listing is exhausted.
    async fn advance(&mut self) -> Result<bool, StreamError> {
        let Some(fragment) = self.fragments.get(self.next_index) else {
            self.current = Bytes::new();
            self.offset = 0;
            return Ok(false);
        };

        let data = tokio::fs::read(&fragment.path)
            .await
            .map_err(|source| StreamError::Read {
                path: fragment.path.clone(),
                source,
            })?;

        self.current = Bytes::from(data);
        self.offset = 0;
        self.next_index += 1;
        Ok(true)
    }
}

impl ByteStream for StreamMaterializer {
    async fn read(&mut self, buf: &mut [u8]) -> Result<Progress, StreamError> {
        let mut filled = 0;

        while filled < buf.len() {
            if self.remaining() == 0 {
                if !self.advance().await? {
                    self.position += filled as u64;
                    return Ok(Progress::EndOfStream(filled));
                }
                continue;
            }

            let n = (buf.len() - filled).min(self.remaining());
            buf[filled..filled + n].copy_from_slice(&self.current[self.offset..self.offset + n]);
            self.offset += n;
            filled += n;
        }

        self.position += filled as u64;
        Ok(Progress::Data(filled))
    }

    async fn skip(&mut self, count: usize) -> Result<Progress, StreamError> {
        let mut skipped = 0;

        while skipped < count {
            if self.remaining() == 0 {
                if !self.advance().await? {
                    self.position += skipped as u64;
                    return Ok(Progress::EndOfStream(skipped));
                }
                continue;
            }

            let n = (count - skipped).min(self.remaining());
            self.offset += n;
            skipped += n;
        }

        self.position += skipped as u64;
        Ok(Progress::Data(skipped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SequenceToken;
    use std::path::Path;

    fn write_fragments(dir: &Path, parts: &[&[u8]]) -> Vec<StoredFragment> {
        parts
            .iter()
            .enumerate()
            .map(|(i, part)| {
                let token = SequenceToken(i as u32);
                let path = dir.join(token.file_name());
                std::fs::write(&path, part).unwrap();
                StoredFragment {
                    token,
                    path,
                    len: part.len() as u64,
                }
            })
            .collect()
    }

    #[tokio::test]
    async fn read_spans_fragment_boundaries() {
        let tmp = tempfile::tempdir().unwrap();
        let fragments = write_fragments(tmp.path(), &[b"abc", b"", b"defg", b"h"]);
        let mut stream = StreamMaterializer::new(fragments);
        assert_eq!(stream.total_size(), 8);

        let mut buf = [0u8; 5];
        assert_eq!(stream.read(&mut buf).await.unwrap(), Progress::Data(5));
        assert_eq!(&buf, b"abcde");

        let mut buf = [0u8; 10];
        assert_eq!(stream.read(&mut buf).await.unwrap(), Progress::EndOfStream(3));
        assert_eq!(&buf[..3], b"fgh");
        assert_eq!(stream.position(), 8);
    }

    #[tokio::test]
    async fn skip_clamps_to_available_data() {
        let tmp = tempfile::tempdir().unwrap();
        let fragments = write_fragments(tmp.path(), &[b"0123", b"4567"]);
        let mut stream = StreamMaterializer::new(fragments);

        assert_eq!(stream.skip(6).await.unwrap(), Progress::Data(6));
        assert_eq!(stream.skip(100).await.unwrap(), Progress::EndOfStream(2));
        assert_eq!(stream.position(), 8);

        let mut buf = [0u8; 4];
        assert_eq!(stream.read(&mut buf).await.unwrap(), Progress::EndOfStream(0));
    }

    #[tokio::test]
    async fn missing_fragment_is_a_read_error() {
        let tmp = tempfile::tempdir().unwrap();
        let mut fragments = write_fragments(tmp.path(), &[b"ok"]);
        fragments.push(StoredFragment {
            token: SequenceToken(9),
            path: tmp.path().join("gone"),
            len: 4,
        });
        let mut stream = StreamMaterializer::new(fragments);

        let mut buf = [0u8; 8];
        let err = stream.read(&mut buf).await.unwrap_err();
        assert!(matches!(err, StreamError::Read { .. }));
    }
}
