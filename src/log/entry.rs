//! Log Entry definitions
//!
//! Defines the header of an individual log record.

use crate::flash::ERASED_WORD;

/// Status word of a record
///
/// Flash writes can only clear bits, so both flags are active-low from the
/// erased state: bit 0 is the "unused" flag (cleared by the first write to
/// the slot) and bit 1 is the "valid" flag (cleared to invalidate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStatus(u16);

impl EntryStatus {
    const UNUSED_BIT: u16 = 0x0001;
    const VALID_BIT: u16 = 0x0002;

    /// Status of a freshly appended record: used and valid
    pub const LIVE: EntryStatus = EntryStatus(ERASED_WORD & !Self::UNUSED_BIT);

    /// Mask that clears the valid bit when programmed over a status word
    pub const INVALIDATE_MASK: u16 = ERASED_WORD & !Self::VALID_BIT;

    pub fn from_word(word: u16) -> Self {
        Self(word)
    }

    pub fn as_word(&self) -> u16 {
        self.0
    }

    /// The slot has been written since the last erase
    pub fn is_used(&self) -> bool {
        self.0 & Self::UNUSED_BIT == 0
    }

    /// The record has not been superseded
    pub fn is_valid(&self) -> bool {
        self.0 & Self::VALID_BIT != 0
    }
}

/// Kind of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    /// File header; payload is the file name
    Header,

    /// Slice of file content
    DataChunk,

    /// Type word not understood by this version
    Unknown(u16),
}

impl EntryType {
    pub fn from_word(word: u16) -> Self {
        match word {
            0 => EntryType::Header,
            1 => EntryType::DataChunk,
            other => EntryType::Unknown(other),
        }
    }

    pub fn as_word(&self) -> u16 {
        match self {
            EntryType::Header => 0,
            EntryType::DataChunk => 1,
            EntryType::Unknown(word) => *word,
        }
    }
}

/// Decoded header of one log slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogEntry {
    /// Slot index this record lives in
    pub slot: u32,

    /// Used/valid flags
    pub status: EntryStatus,

    /// Shared by a file's header and all of its data chunks
    pub object_id: u16,

    /// Ordinal of a data chunk within its file
    pub chunk_id: u16,

    /// Header or data chunk
    pub entry_type: EntryType,

    /// Payload length in bytes (before padding)
    pub payload_size: u16,
}

impl LogEntry {
    /// A live header record for object `object_id`
    pub fn header(slot: u32, object_id: u16, name_len: u16) -> Self {
        Self {
            slot,
            status: EntryStatus::LIVE,
            object_id,
            chunk_id: 0,
            entry_type: EntryType::Header,
            payload_size: name_len,
        }
    }

    /// A live data chunk record for object `object_id`
    pub fn data_chunk(slot: u32, object_id: u16, chunk_id: u16, payload_size: u16) -> Self {
        Self {
            slot,
            status: EntryStatus::LIVE,
            object_id,
            chunk_id,
            entry_type: EntryType::DataChunk,
            payload_size,
        }
    }
}
