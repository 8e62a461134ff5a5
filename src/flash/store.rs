//! Flash Store
//!
//! File-backed flash emulator with word access and sector erase.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{FlashError, Result};

use super::{Geometry, ERASED_BYTE, WORD_SIZE};

/// Emulated flash device backed by an image file
///
/// The image is opened (or created) on the first operation and kept open
/// for the lifetime of the store. An image whose length does not match the
/// geometry is treated as absent and recreated fully erased.
pub struct FlashStore {
    /// Backing image file path
    path: PathBuf,
    /// Sector size and count
    geometry: Geometry,
    /// Open image, populated lazily
    file: Option<File>,
}

impl FlashStore {
    /// Create a store for the image at `path`; nothing is touched on disk yet
    pub fn new(path: impl Into<PathBuf>, geometry: Geometry) -> Self {
        Self {
            path: path.into(),
            geometry,
            file: None,
        }
    }

    /// Erase every sector back to 0xFF
    pub fn erase_all(&mut self) -> Result<()> {
        let sector_size = self.geometry.sector_size() as usize;
        let sector_count = self.geometry.sector_count();
        let file = self.medium()?;

        file.seek(SeekFrom::Start(0))?;
        let blank = vec![ERASED_BYTE; sector_size];
        for _ in 0..sector_count {
            file.write_all(&blank)?;
        }
        file.flush()?;

        info!(path = %self.path.display(), sectors = sector_count, "erased flash device");
        Ok(())
    }

    /// Erase sector `n` back to 0xFF
    pub fn erase_sector(&mut self, n: u32) -> Result<()> {
        if n >= self.geometry.sector_count() {
            return Err(FlashError::InvalidSector(n));
        }
        let offset = self.geometry.sector_offset(n);
        let blank = vec![ERASED_BYTE; self.geometry.sector_size() as usize];
        let file = self.medium()?;

        file.seek(SeekFrom::Start(u64::from(offset)))?;
        file.write_all(&blank)?;
        file.flush()?;

        debug!(sector = n, "erased flash sector");
        Ok(())
    }

    /// Read the word at `address`
    pub fn read_word(&mut self, address: u32) -> Result<u16> {
        let mut word = [0u16; 1];
        self.read_words(address, &mut word)?;
        Ok(word[0])
    }

    /// Program the word at `address`
    ///
    /// The stored result is `existing & value`: bits can be cleared but never
    /// set again without an erase of the containing sector.
    pub fn write_word(&mut self, address: u32, value: u16) -> Result<()> {
        self.write_words(address, &[value])
    }

    /// Read `out.len()` consecutive words starting at `address`
    pub fn read_words(&mut self, address: u32, out: &mut [u16]) -> Result<()> {
        self.check_range(address, out.len())?;
        if out.is_empty() {
            return Ok(());
        }

        let mut raw = vec![0u8; out.len() * WORD_SIZE as usize];
        let file = self.medium()?;
        file.seek(SeekFrom::Start(u64::from(address)))?;
        file.read_exact(&mut raw)?;

        for (word, bytes) in out.iter_mut().zip(raw.chunks_exact(WORD_SIZE as usize)) {
            *word = u16::from_le_bytes([bytes[0], bytes[1]]);
        }
        Ok(())
    }

    /// Program consecutive words starting at `address` with AND semantics
    pub fn write_words(&mut self, address: u32, values: &[u16]) -> Result<()> {
        self.check_range(address, values.len())?;
        if values.is_empty() {
            return Ok(());
        }

        // Read-modify-write: the medium can only clear bits.
        let mut existing = vec![0u16; values.len()];
        self.read_words(address, &mut existing)?;

        let mut raw = Vec::with_capacity(values.len() * WORD_SIZE as usize);
        for (old, new) in existing.iter().zip(values) {
            raw.extend_from_slice(&(old & new).to_le_bytes());
        }

        let file = self.medium()?;
        file.seek(SeekFrom::Start(u64::from(address)))?;
        file.write_all(&raw)?;
        file.flush()?;
        Ok(())
    }

    /// Total device size in bytes
    pub fn size(&self) -> u32 {
        self.geometry.total_size()
    }

    /// Device geometry
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Backing image path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the backing image has been opened yet
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Validate an even start address and that `words` words fit the device
    fn check_range(&self, address: u32, words: usize) -> Result<()> {
        let size = u64::from(self.geometry.total_size());
        if address % WORD_SIZE != 0 || u64::from(address) >= size {
            return Err(FlashError::BadAddress(address));
        }
        let end = u64::from(address) + words as u64 * u64::from(WORD_SIZE);
        if end > size {
            return Err(FlashError::BadAddress(address));
        }
        Ok(())
    }

    /// Get the open image, opening or creating it on first use
    fn medium(&mut self) -> Result<&mut File> {
        let file = match self.file.take() {
            Some(file) => file,
            None => self.open_medium()?,
        };
        Ok(self.file.insert(file))
    }

    fn open_medium(&self) -> Result<File> {
        let expected = u64::from(self.geometry.total_size());

        match fs::metadata(&self.path) {
            Ok(meta) if meta.is_file() && meta.len() == expected => {
                debug!(path = %self.path.display(), "opening existing flash image");
                OpenOptions::new()
                    .read(true)
                    .write(true)
                    .open(&self.path)
                    .map_err(|source| self.unavailable(source))
            }
            Ok(meta) => {
                warn!(
                    path = %self.path.display(),
                    found = meta.len(),
                    expected,
                    "flash image has the wrong size, recreating"
                );
                self.create_medium()
            }
            Err(_) => self.create_medium(),
        }
    }

    /// Create a fully erased image of the exact device size
    fn create_medium(&self) -> Result<File> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|source| self.unavailable(source))?;

        let blank = vec![ERASED_BYTE; self.geometry.sector_size() as usize];
        for _ in 0..self.geometry.sector_count() {
            file.write_all(&blank)
                .map_err(|source| self.unavailable(source))?;
        }
        file.sync_all().map_err(|source| self.unavailable(source))?;

        info!(
            path = %self.path.display(),
            size = self.geometry.total_size(),
            "created flash image"
        );
        Ok(file)
    }

    fn unavailable(&self, source: std::io::Error) -> FlashError {
        FlashError::MediumUnavailable {
            path: self.path.clone(),
            source,
        }
    }
}
