//! Shared volume
//!
//! Cloneable handle that serializes every filesystem call behind one lock.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::config::Config;
use crate::error::Result;
use crate::fs::Filesystem;

use super::{FlashFile, OpenMode};

/// A filesystem shared between streams
///
/// ## Concurrency
/// - `fs`: one `Mutex` guards the directory, cursor and medium together
/// - Streams hold a clone and lock only for the duration of a call
#[derive(Clone)]
pub struct Volume {
    fs: Arc<Mutex<Filesystem>>,
    max_file_size: usize,
}

impl Volume {
    /// Open the configured volume (the log is scanned on first use)
    pub fn open(config: &Config) -> Result<Self> {
        let fs = Filesystem::open(config)?;
        Ok(Self::new(fs, config.max_file_size))
    }

    /// Wrap an existing filesystem
    pub fn new(fs: Filesystem, max_file_size: usize) -> Self {
        Self {
            fs: Arc::new(Mutex::new(fs)),
            max_file_size,
        }
    }

    /// Open a stream on `name`
    pub fn open_file(&self, name: &str, mode: OpenMode) -> Result<FlashFile> {
        FlashFile::open(self.clone(), name, mode)
    }

    /// Delete `name` from the volume
    pub fn remove(&self, name: &str) -> Result<()> {
        self.lock().delete_file(name)
    }

    /// All file names, sorted
    pub fn file_names(&self) -> Result<Vec<String>> {
        self.lock().file_names()
    }

    /// Erase the device and start with an empty directory
    pub fn format(&self) -> Result<()> {
        self.lock().format()
    }

    /// Run `f` with exclusive access to the filesystem
    pub fn with_filesystem<R>(&self, f: impl FnOnce(&mut Filesystem) -> R) -> R {
        f(&mut self.lock())
    }

    /// Capacity of a stream buffer
    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    pub(super) fn lock(&self) -> MutexGuard<'_, Filesystem> {
        self.fs.lock()
    }
}
