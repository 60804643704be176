//! Durable per-connection fragment storage.
//!
//! Layout on disk:
//!
//! ```text
//! <storage_root>/inflight/<flow dir name>/<sequence token>
//! ```
//!
//! One file per captured payload. Tokens are rendered as fixed-width,
//! zero-padded decimals so a lexical listing is also numeric order.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::error::StorageError;
use crate::flow::ConnectionId;

const INFLIGHT_DIR: &str = "inflight";

/// Sortable fragment key: the TCP sequence number of the packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceToken(pub u32);

impl SequenceToken {
    /// Width of `u32::MAX` in decimal.
    const WIDTH: usize = 10;

    pub fn file_name(&self) -> String {
        format!("{:0width$}", self.0, width = Self::WIDTH)
    }

    pub fn parse(name: &str) -> Option<Self> {
        if name.len() != Self::WIDTH || !name.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        name.parse().ok().map(SequenceToken)
    }
}

impl fmt::Display for SequenceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Location of one stored fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFragment {
    pub token: SequenceToken,
    pub path: PathBuf,
    pub len: u64,
}

#[derive(Debug, Clone)]
pub struct FragmentStore {
    inflight: PathBuf,
}

impl FragmentStore {
    pub fn new(storage_root: impl AsRef<Path>) -> Self {
        Self {
            inflight: storage_root.as_ref().join(INFLIGHT_DIR),
        }
    }

    pub fn flow_dir(&self, id: &ConnectionId) -> PathBuf {
        self.inflight.join(id.dir_name())
    }

    /// Makes the flow directory ready. Safe to call any number of times,
    /// from any number of tasks.
    pub async fn create(&self, id: &ConnectionId) -> Result<(), StorageError> {
        let path = self.flow_dir(id);
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|source| StorageError::Create { path, source })
    }

    pub async fn append(
        &self,
        id: &ConnectionId,
        token: SequenceToken,
        bytes: &Bytes,
    ) -> Result<(), StorageError> {
        let path = self.flow_dir(id).join(token.file_name());
        tracing::debug!(flow = %id, token = %token, len = bytes.len(), "Writing fragment");
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| StorageError::Write { path, source })
    }

    /// Fragments of `id` ordered by sequence token. A missing directory is
    /// an empty listing.
    pub async fn list_ordered(&self, id: &ConnectionId) -> Result<Vec<StoredFragment>, StorageError> {
        let dir = self.flow_dir(id);
        let list_err = |source| StorageError::List {
            path: dir.clone(),
            source,
        };

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(list_err(e)),
        };

        let mut fragments = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(list_err)? {
            let name = entry.file_name();
            let Some(token) = name.to_str().and_then(SequenceToken::parse) else {
                tracing::warn!(flow = %id, name = ?name, "Ignoring unrecognised file in flow directory");
                continue;
            };
            let len = entry.metadata().await.map_err(list_err)?.len();
            fragments.push(StoredFragment {
                token,
                path: entry.path(),
                len,
            });
        }

        fragments.sort_by_key(|f| f.token);
        Ok(fragments)
    }

    /// Removes every fragment of `id` along with its directory. Nothing to
    /// remove is not an error.
    pub async fn delete_all(&self, id: &ConnectionId) -> Result<(), StorageError> {
        let path = self.flow_dir(id);
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => {
                tracing::debug!(flow = %id, "Removed flow directory");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Delete { path, source }),
        }
    }
}
