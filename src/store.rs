use std::io::ErrorKind;
use std::path::PathBuf;

use tokio::fs;
use tracing::debug;

use crate::error::{Result, StashError};

/// Key-addressed store on the filesystem. Keys shard into
/// `root/aa/bb/<rest>` so directory fan-out stays bounded at 256x256 leaf
/// directories regardless of how many entries accumulate.
///
/// Entries are write-once by convention: the orchestrator's in-flight
/// discipline guarantees no two writers ever race on the same key, so the
/// store itself takes no locks.
#[derive(Clone, Debug)]
pub struct ShardedStore {
    root: PathBuf,
}

impl ShardedStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Maps a key to its leaf path, or `None` for strings that are not
    /// usable as keys (too short, or containing non-hex bytes that could
    /// escape the root). Callers holding a derived key always get `Some`.
    fn entry_path(&self, key: &str) -> Option<PathBuf> {
        if key.len() <= 4 || !key.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(self.root.join(&key[..2]).join(&key[2..4]).join(&key[4..]))
    }

    pub async fn exists(&self, key: &str) -> bool {
        match self.entry_path(key) {
            Some(path) => fs::metadata(path).await.is_ok(),
            None => false,
        }
    }

    /// `Ok(None)` when no entry exists for the key; other I/O failures are
    /// propagated.
    pub async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let Some(path) = self.entry_path(key) else {
            return Ok(None);
        };
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self
            .entry_path(key)
            .ok_or_else(|| StashError::InvalidKey(key.to_string()))?;
        if let Some(dir) = path.parent() {
            // Two writers may race into the same shard directory; that is
            // not an error.
            fs::create_dir_all(dir).await?;
        }
        fs::write(&path, bytes).await?;
        debug!(key, len = bytes.len(), "stored cache entry");
        Ok(())
    }
}
