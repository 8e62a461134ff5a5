//! Flash Module
//!
//! Emulates a raw NOR flash part on top of a regular file.
//!
//! ## Responsibilities
//! - Lazily create the backing image with the exact device size
//! - Word-granular (16-bit, even address) reads and writes
//! - AND-masked writes: a write can only clear bits
//! - Sector and whole-device erase back to 0xFF
//!
//! ## Device Layout
//! ```text
//! ┌──────────────┬──────────────┬─────┬──────────────┐
//! │   Sector 0   │   Sector 1   │ ... │  Sector N-1  │
//! │ sector_size  │ sector_size  │     │ sector_size  │
//! └──────────────┴──────────────┴─────┴──────────────┘
//!   byte 0                            total_size - 1
//! ```
//!
//! Words are stored little-endian.

mod store;

pub use store::FlashStore;

/// Size of one flash word in bytes
pub const WORD_SIZE: u32 = 2;

/// Value every byte holds after an erase
pub const ERASED_BYTE: u8 = 0xFF;

/// Value every word holds after an erase
pub const ERASED_WORD: u16 = 0xFFFF;

/// Physical shape of the emulated device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    sector_size: u32,
    sector_count: u32,
}

impl Geometry {
    pub fn new(sector_size: u32, sector_count: u32) -> Self {
        Self {
            sector_size,
            sector_count,
        }
    }

    pub fn sector_size(&self) -> u32 {
        self.sector_size
    }

    pub fn sector_count(&self) -> u32 {
        self.sector_count
    }

    /// Total device size in bytes
    pub fn total_size(&self) -> u32 {
        self.sector_size.saturating_mul(self.sector_count)
    }

    /// Byte offset of the first byte of sector `n`
    pub fn sector_offset(&self, n: u32) -> u32 {
        n * self.sector_size
    }
}
