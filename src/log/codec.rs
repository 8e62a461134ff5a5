//! Log codec
//!
//! Encoding and decoding of log records to and from flash words.
//!
//! A record is written as one run of words starting at its slot address:
//! the five header words followed by the payload packed two bytes per word,
//! low byte first. An odd trailing byte is padded with 0xFF so that the
//! filler never clears bits it does not need to.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::error::{FlashError, Result};
use crate::flash::{FlashStore, ERASED_BYTE, WORD_SIZE};

use super::{EntryStatus, EntryType, LogEntry, LogLayout, HEADER_SIZE, HEADER_WORDS};

// =============================================================================
// Encoding
// =============================================================================

/// Encode a record header and its payload to words
///
/// Format: status, object_id, chunk_id, type, payload_size, payload words
pub fn encode(entry: &LogEntry, payload: &[u8]) -> Vec<u16> {
    let mut words = Vec::with_capacity(HEADER_WORDS + payload.len().div_ceil(2));
    words.push(entry.status.as_word());
    words.push(entry.object_id);
    words.push(entry.chunk_id);
    words.push(entry.entry_type.as_word());
    words.push(entry.payload_size);

    for pair in payload.chunks(2) {
        let high = pair.get(1).copied().unwrap_or(ERASED_BYTE);
        words.push(u16::from_le_bytes([pair[0], high]));
    }
    words
}

/// Program a record into its slot
pub fn write_entry(
    store: &mut FlashStore,
    layout: &LogLayout,
    entry: &LogEntry,
    payload: &[u8],
) -> Result<()> {
    let words = encode(entry, payload);
    store.write_words(layout.slot_address(entry.slot), &words)?;

    debug!(
        slot = entry.slot,
        object_id = entry.object_id,
        chunk_id = entry.chunk_id,
        kind = ?entry.entry_type,
        size = entry.payload_size,
        "appended log record"
    );
    Ok(())
}

/// Clear the valid bit of the record in `slot`
pub fn invalidate(store: &mut FlashStore, layout: &LogLayout, slot: u32) -> Result<()> {
    store.write_word(layout.slot_address(slot), EntryStatus::INVALIDATE_MASK)?;
    debug!(slot, "invalidated log record");
    Ok(())
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode the five header words of `slot`
pub fn decode_header(store: &mut FlashStore, layout: &LogLayout, slot: u32) -> Result<LogEntry> {
    let mut words = [0u16; HEADER_WORDS];
    store.read_words(layout.slot_address(slot), &mut words)?;

    Ok(LogEntry {
        slot,
        status: EntryStatus::from_word(words[0]),
        object_id: words[1],
        chunk_id: words[2],
        entry_type: EntryType::from_word(words[3]),
        payload_size: words[4],
    })
}

/// Read back the payload bytes of a decoded record
///
/// Reads `ceil(payload_size / 2)` words right after the header; the final
/// odd byte comes from the low byte of the last word.
pub fn decode_payload(store: &mut FlashStore, layout: &LogLayout, entry: &LogEntry) -> Result<Bytes> {
    let size = usize::from(entry.payload_size);
    let payload_address = layout.slot_address(entry.slot) + HEADER_SIZE;

    if u32::from(entry.payload_size) > layout.max_payload() {
        return Err(FlashError::PayloadRead {
            slot: entry.slot,
            source: Box::new(FlashError::BadAddress(payload_address + u32::from(entry.payload_size))),
        });
    }

    let mut words = vec![0u16; size.div_ceil(WORD_SIZE as usize)];
    store
        .read_words(payload_address, &mut words)
        .map_err(|e| FlashError::PayloadRead {
            slot: entry.slot,
            source: Box::new(e),
        })?;

    let mut buf = BytesMut::with_capacity(words.len() * WORD_SIZE as usize);
    for word in words {
        buf.put_u16_le(word);
    }
    buf.truncate(size);
    Ok(buf.freeze())
}
