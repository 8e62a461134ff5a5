//! Log Module
//!
//! Fixed-size log records laid out over the whole flash device.
//!
//! ## Responsibilities
//! - Define the on-flash record header (status, ids, type, payload size)
//! - Map slot indices to flash addresses
//! - Encode records to words and decode them back
//!
//! ## Slot Format
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Slot i  (at byte i × entry_size)                             │
//! │ ┌────────┬──────────┬─────────┬────────┬─────────┬─────────┐ │
//! │ │Status 2│ObjectId 2│ChunkId 2│ Type 2 │ Size 2  │ Payload │ │
//! │ └────────┴──────────┴─────────┴────────┴─────────┴─────────┘ │
//! │   (payload padded to an even length, filler byte 0xFF)       │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod codec;
mod entry;

pub use codec::{decode_header, decode_payload, encode, invalidate, write_entry};
pub use entry::{EntryStatus, EntryType, LogEntry};

/// Fixed record header: five 16-bit fields
pub const HEADER_SIZE: u32 = 10;

/// Number of words in the record header
pub(crate) const HEADER_WORDS: usize = 5;

/// Slot geometry of the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogLayout {
    entry_size: u32,
    total_entries: u32,
}

impl LogLayout {
    /// Partition a device of `device_size` bytes into `entry_size`-byte slots
    pub fn new(device_size: u32, entry_size: u32) -> Self {
        let total_entries = if entry_size == 0 {
            0
        } else {
            device_size / entry_size
        };
        Self {
            entry_size,
            total_entries,
        }
    }

    /// Bytes per slot (LOG_ENTRY_SIZE)
    pub fn entry_size(&self) -> u32 {
        self.entry_size
    }

    /// Number of slots in the log (LOG_TOTAL_ENTRIES)
    pub fn total_entries(&self) -> u32 {
        self.total_entries
    }

    /// Largest payload one record can carry (LOG_ENTRY_MAX_PAYLOAD)
    pub fn max_payload(&self) -> u32 {
        self.entry_size.saturating_sub(HEADER_SIZE)
    }

    /// Flash address of the first byte of `slot`
    pub fn slot_address(&self, slot: u32) -> u32 {
        slot * self.entry_size
    }

    /// Number of records needed to hold `len` bytes of file data
    pub fn chunks_needed(&self, len: usize) -> usize {
        len.div_ceil(self.max_payload() as usize)
    }
}
