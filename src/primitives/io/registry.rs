use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use super::{DiskFile, FileIo, MemoryFile};
use crate::types::{GraphError, Result};

/// Shared positional handle on one backing file.
///
/// Disjoint ranges may be written from different callers; overlapping
/// writes are unspecified. Handles are never closed individually.
pub struct FileAccess {
    name: String,
    io: Arc<dyn FileIo>,
}

impl FileAccess {
    fn new(name: String, io: Arc<dyn FileIo>) -> Self {
        Self { name, io }
    }

    /// Registry name of the file.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Writes `bytes` starting at `offset`, extending the file as needed.
    pub fn write(&self, bytes: &[u8], offset: u64) -> Result<()> {
        self.io.write_at(offset, bytes)
    }

    /// Reads exactly `count` bytes starting at `offset`.
    pub fn read(&self, count: usize, offset: u64) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; count];
        self.io.read_at(offset, &mut buf)?;
        Ok(buf)
    }

    /// Reads into a caller buffer.
    pub fn read_into(&self, dst: &mut [u8], offset: u64) -> Result<()> {
        self.io.read_at(offset, dst)
    }

    /// Current length in bytes.
    pub fn len(&self) -> Result<u64> {
        self.io.len()
    }

    /// Returns true when nothing has been written yet.
    pub fn is_empty(&self) -> Result<bool> {
        self.io.is_empty()
    }

    fn sync(&self) -> Result<()> {
        self.io.sync_all()
    }
}

/// Hands out exactly one [`FileAccess`] per file name.
///
/// The registry belongs to one storage engine. Every handle stays open until
/// [`FileRegistry::shutdown`] (or drop) syncs them all once.
pub struct FileRegistry {
    root: Option<PathBuf>,
    files: Mutex<FxHashMap<String, Arc<FileAccess>>>,
    closed: AtomicBool,
}

impl FileRegistry {
    /// Registry backed by files under `root`, created if missing.
    pub fn on_disk(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root: Some(root),
            files: Mutex::new(FxHashMap::default()),
            closed: AtomicBool::new(false),
        })
    }

    /// Registry whose files live in memory only.
    pub fn in_memory() -> Self {
        Self {
            root: None,
            files: Mutex::new(FxHashMap::default()),
            closed: AtomicBool::new(false),
        }
    }

    /// Directory holding the backing files, if any.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Returns the handle for `name`, opening it on first use.
    pub fn file_access(&self, name: &str) -> Result<Arc<FileAccess>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(GraphError::Invalid("file registry already shut down"));
        }
        let mut files = self.files.lock();
        if let Some(existing) = files.get(name) {
            return Ok(Arc::clone(existing));
        }
        let io: Arc<dyn FileIo> = match &self.root {
            Some(root) => Arc::new(DiskFile::open(root.join(name))?),
            None => Arc::new(MemoryFile::new()),
        };
        debug!(file = name, "io.registry.open");
        let access = Arc::new(FileAccess::new(name.to_owned(), io));
        files.insert(name.to_owned(), Arc::clone(&access));
        Ok(access)
    }

    /// Returns true when a file by that name exists on disk or was opened.
    pub fn exists(&self, name: &str) -> bool {
        if self.files.lock().contains_key(name) {
            return true;
        }
        self.root
            .as_ref()
            .map(|root| root.join(name).exists())
            .unwrap_or(false)
    }

    /// Syncs every handle once. Later calls are no-ops.
    pub fn shutdown(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let files = self.files.lock();
        let mut first_err = None;
        for access in files.values() {
            if let Err(err) = access.sync() {
                warn!(file = access.name(), error = %err, "io.registry.sync_failed");
                first_err.get_or_insert(err);
            }
        }
        debug!(files = files.len(), "io.registry.shutdown");
        first_err.map_or(Ok(()), Err)
    }
}

impl Drop for FileRegistry {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            warn!(error = %err, "io.registry.drop_failed");
        }
    }
}
