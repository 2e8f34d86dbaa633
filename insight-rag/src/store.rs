//! Guarded access to the on-disk index file.

use std::io;
use std::path::{Path, PathBuf};

use tokio::sync::RwLock;
use tokio::task;
use tracing::info;

use crate::error::Result;
use crate::index::VectorIndex;

/// Default file name for the persisted index.
pub const DEFAULT_INDEX_PATH: &str = "insight_store.json";

/// Owns the index file location and serializes access to it.
///
/// Writers take an exclusive lock, readers a shared one, so a
/// [`replace`](IndexStore::replace) can never interleave with a
/// [`load`](IndexStore::load) issued through the same store. The file
/// itself is replaced atomically, which covers readers in other processes.
#[derive(Debug)]
pub struct IndexStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl Default for IndexStore {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_PATH)
    }
}

impl IndexStore {
    /// Create a store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: RwLock::new(()) }
    }

    /// Location of the index file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether an index file is currently present.
    pub async fn exists(&self) -> bool {
        let _guard = self.lock.read().await;
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Persist `index`, discarding whatever was stored before.
    ///
    /// The file is written on the blocking thread pool.
    pub async fn replace(&self, index: &VectorIndex) -> Result<()> {
        let _guard = self.lock.write().await;
        let path = self.path.clone();
        let owned = index.clone();
        task::spawn_blocking(move || owned.save(&path)).await.map_err(io::Error::other)??;
        info!(path = %self.path.display(), chunk_count = index.len(), "index replaced");
        Ok(())
    }

    /// Load the current index.
    ///
    /// # Errors
    ///
    /// See [`VectorIndex::load`]; a missing file is reported as
    /// [`RagError::IndexNotFound`](crate::RagError::IndexNotFound).
    pub async fn load(&self) -> Result<VectorIndex> {
        let _guard = self.lock.read().await;
        let path = self.path.clone();
        task::spawn_blocking(move || VectorIndex::load(&path)).await.map_err(io::Error::other)?
    }
}
