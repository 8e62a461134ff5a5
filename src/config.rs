//! Configuration for flashlog
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{FlashError, Result};
use crate::flash::Geometry;
use crate::log::{LogLayout, HEADER_SIZE};

const KIB: u32 = 1024;

/// Main configuration for a flashlog volume
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Medium Configuration
    // -------------------------------------------------------------------------
    /// Backing file that stands in for the raw flash part
    pub image_path: PathBuf,

    /// Smallest erasable unit (bytes)
    pub sector_size: u32,

    /// Number of sectors on the device
    pub sector_count: u32,

    // -------------------------------------------------------------------------
    // Log Configuration
    // -------------------------------------------------------------------------
    /// Size of one log slot including its 10-byte header (bytes)
    pub log_entry_size: u32,

    // -------------------------------------------------------------------------
    // Stream Configuration
    // -------------------------------------------------------------------------
    /// Capacity of a stream's in-memory buffer (bytes)
    pub max_file_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_path: PathBuf::from("flash.img"),
            sector_size: 64 * KIB,
            sector_count: 20,
            log_entry_size: KIB,
            max_file_size: 63 * KIB as usize,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that the geometry and the log layout are usable together
    pub fn validate(&self) -> Result<()> {
        if self.sector_size == 0 || self.sector_size % 2 != 0 {
            return Err(FlashError::Config(format!(
                "sector size must be a positive even number, got {}",
                self.sector_size
            )));
        }
        if self.sector_count == 0 {
            return Err(FlashError::Config("sector count must be positive".to_string()));
        }
        let total = u64::from(self.sector_size) * u64::from(self.sector_count);
        if total > u64::from(u32::MAX) {
            return Err(FlashError::Config(format!(
                "device size {} does not fit a 32-bit address space",
                total
            )));
        }
        if self.log_entry_size % 2 != 0 || self.log_entry_size <= HEADER_SIZE {
            return Err(FlashError::Config(format!(
                "log entry size must be even and larger than {} bytes, got {}",
                HEADER_SIZE, self.log_entry_size
            )));
        }
        if self.log_entry_size - HEADER_SIZE > u32::from(u16::MAX) {
            return Err(FlashError::Config(format!(
                "log entry payload of {} bytes does not fit the 16-bit size field",
                self.log_entry_size - HEADER_SIZE
            )));
        }
        if u64::from(self.log_entry_size) > total {
            return Err(FlashError::Config(format!(
                "log entry size {} exceeds device size {}",
                self.log_entry_size, total
            )));
        }
        // Object and chunk ids are 16-bit; one per slot at most.
        if total / u64::from(self.log_entry_size) >= u64::from(u16::MAX) {
            return Err(FlashError::Config(format!(
                "{} log slots exceed the 16-bit id space",
                total / u64::from(self.log_entry_size)
            )));
        }
        Ok(())
    }

    /// Physical layout of the emulated device
    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.sector_size, self.sector_count)
    }

    /// Slot layout of the log over the whole device
    pub fn log_layout(&self) -> LogLayout {
        LogLayout::new(self.geometry().total_size(), self.log_entry_size)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the backing image file
    pub fn image_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.image_path = path.into();
        self
    }

    /// Set the sector size (in bytes)
    pub fn sector_size(mut self, size: u32) -> Self {
        self.config.sector_size = size;
        self
    }

    /// Set the number of sectors
    pub fn sector_count(mut self, count: u32) -> Self {
        self.config.sector_count = count;
        self
    }

    /// Set the log slot size (in bytes)
    pub fn log_entry_size(mut self, size: u32) -> Self {
        self.config.log_entry_size = size;
        self
    }

    /// Set the stream buffer capacity (in bytes)
    pub fn max_file_size(mut self, size: usize) -> Self {
        self.config.max_file_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
