//! Tests for the log codec
//!
//! These tests verify:
//! - Word layout produced by encode
//! - Payload packing and odd-length padding
//! - Header/payload decode from flash
//! - Invalidation through a masked status write

use std::path::PathBuf;

use flashlog::flash::{FlashStore, Geometry};
use flashlog::log::{self, EntryStatus, EntryType, LogEntry, LogLayout, HEADER_SIZE};
use flashlog::FlashError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const ENTRY_SIZE: u32 = 64;

fn setup_store() -> (TempDir, FlashStore, LogLayout) {
    let temp_dir = TempDir::new().unwrap();
    let path: PathBuf = temp_dir.path().join("flash.img");
    let geometry = Geometry::new(1024, 4);
    let layout = LogLayout::new(geometry.total_size(), ENTRY_SIZE);
    (temp_dir, FlashStore::new(path, geometry), layout)
}

// =============================================================================
// Layout Tests
// =============================================================================

#[test]
fn test_layout_constants() {
    let layout = LogLayout::new(64 * 1024 * 20, 1024);

    assert_eq!(HEADER_SIZE, 10);
    assert_eq!(layout.total_entries(), 1280);
    assert_eq!(layout.max_payload(), 1014);
    assert_eq!(layout.slot_address(3), 3072);
}

#[test]
fn test_chunks_needed() {
    let layout = LogLayout::new(4096, ENTRY_SIZE);
    let max = layout.max_payload() as usize;

    assert_eq!(layout.chunks_needed(0), 0);
    assert_eq!(layout.chunks_needed(1), 1);
    assert_eq!(layout.chunks_needed(max), 1);
    assert_eq!(layout.chunks_needed(max + 1), 2);
    assert_eq!(layout.chunks_needed(3 * max), 3);
}

// =============================================================================
// Encode Tests
// =============================================================================

#[test]
fn test_encode_header_words() {
    let entry = LogEntry::data_chunk(7, 42, 3, 4);
    let words = log::encode(&entry, b"abcd");

    assert_eq!(words.len(), 7);
    assert_eq!(words[0], EntryStatus::LIVE.as_word());
    assert_eq!(words[1], 42);
    assert_eq!(words[2], 3);
    assert_eq!(words[3], EntryType::DataChunk.as_word());
    assert_eq!(words[4], 4);
}

#[test]
fn test_encode_packs_low_byte_first() {
    let entry = LogEntry::data_chunk(0, 1, 0, 2);
    let words = log::encode(&entry, &[0x34, 0x12]);

    assert_eq!(words[5], 0x1234);
}

#[test]
fn test_encode_pads_odd_payload() {
    let entry = LogEntry::header(0, 1, 3);
    let words = log::encode(&entry, b"abc");

    assert_eq!(words.len(), 7);
    assert_eq!(words[6], u16::from_le_bytes([b'c', 0xFF]));
}

#[test]
fn test_encode_empty_payload() {
    let entry = LogEntry::data_chunk(0, 1, 0, 0);
    assert_eq!(log::encode(&entry, &[]).len(), 5);
}

// =============================================================================
// Decode Tests
// =============================================================================

#[test]
fn test_virgin_slot_decodes_as_unused() {
    let (_temp, mut store, layout) = setup_store();

    let entry = log::decode_header(&mut store, &layout, 0).unwrap();
    assert!(!entry.status.is_used());
    assert_eq!(entry.slot, 0);
}

#[test]
fn test_write_then_decode_header() {
    let (_temp, mut store, layout) = setup_store();
    let entry = LogEntry::header(5, 9, 5);

    log::write_entry(&mut store, &layout, &entry, b"a.txt").unwrap();
    let decoded = log::decode_header(&mut store, &layout, 5).unwrap();

    assert_eq!(decoded, entry);
    assert!(decoded.status.is_used());
    assert!(decoded.status.is_valid());
    assert_eq!(decoded.entry_type, EntryType::Header);
}

#[test]
fn test_record_lands_at_slot_address() {
    let (_temp, mut store, layout) = setup_store();
    let entry = LogEntry::data_chunk(2, 1, 0, 2);

    log::write_entry(&mut store, &layout, &entry, b"hi").unwrap();

    assert_eq!(store.read_word(2 * ENTRY_SIZE).unwrap(), EntryStatus::LIVE.as_word());
    assert_eq!(store.read_word(2 * ENTRY_SIZE + HEADER_SIZE).unwrap(), u16::from_le_bytes(*b"hi"));
    assert!(!log::decode_header(&mut store, &layout, 1).unwrap().status.is_used());
    assert!(!log::decode_header(&mut store, &layout, 3).unwrap().status.is_used());
}

#[test]
fn test_decode_odd_payload() {
    let (_temp, mut store, layout) = setup_store();
    let entry = LogEntry::data_chunk(1, 1, 0, 5);

    log::write_entry(&mut store, &layout, &entry, b"hello").unwrap();
    let payload = log::decode_payload(&mut store, &layout, &entry).unwrap();

    assert_eq!(&payload[..], b"hello");
}

#[test]
fn test_decode_full_payload() {
    let (_temp, mut store, layout) = setup_store();
    let data: Vec<u8> = (0..layout.max_payload()).map(|i| (i * 7) as u8).collect();
    let entry = LogEntry::data_chunk(63, 2, 0, data.len() as u16);

    log::write_entry(&mut store, &layout, &entry, &data).unwrap();
    let payload = log::decode_payload(&mut store, &layout, &entry).unwrap();

    assert_eq!(payload.to_vec(), data);
}

#[test]
fn test_decode_empty_payload() {
    let (_temp, mut store, layout) = setup_store();
    let entry = LogEntry::data_chunk(0, 1, 0, 0);

    log::write_entry(&mut store, &layout, &entry, &[]).unwrap();
    assert!(log::decode_payload(&mut store, &layout, &entry).unwrap().is_empty());
}

#[test]
fn test_decode_oversized_payload_fails() {
    let (_temp, mut store, layout) = setup_store();
    let entry = LogEntry::data_chunk(0, 1, 0, (layout.max_payload() + 2) as u16);

    let result = log::decode_payload(&mut store, &layout, &entry);
    assert!(matches!(result, Err(FlashError::PayloadRead { slot: 0, .. })));
}

#[test]
fn test_unknown_type_is_preserved() {
    let (_temp, mut store, layout) = setup_store();
    let entry = LogEntry {
        entry_type: EntryType::Unknown(9),
        ..LogEntry::data_chunk(0, 1, 0, 0)
    };

    log::write_entry(&mut store, &layout, &entry, &[]).unwrap();
    let decoded = log::decode_header(&mut store, &layout, 0).unwrap();
    assert_eq!(decoded.entry_type, EntryType::Unknown(9));
}

// =============================================================================
// Invalidation Tests
// =============================================================================

#[test]
fn test_invalidate_clears_valid_bit_only() {
    let (_temp, mut store, layout) = setup_store();
    let entry = LogEntry::data_chunk(4, 3, 1, 2);
    log::write_entry(&mut store, &layout, &entry, b"xy").unwrap();

    log::invalidate(&mut store, &layout, 4).unwrap();
    let decoded = log::decode_header(&mut store, &layout, 4).unwrap();

    assert!(decoded.status.is_used());
    assert!(!decoded.status.is_valid());
    assert_eq!(decoded.object_id, 3);
    assert_eq!(decoded.chunk_id, 1);
    assert_eq!(&log::decode_payload(&mut store, &layout, &decoded).unwrap()[..], b"xy");
}

#[test]
fn test_invalidate_is_idempotent() {
    let (_temp, mut store, layout) = setup_store();
    log::write_entry(&mut store, &layout, &LogEntry::header(0, 1, 1), b"f").unwrap();

    log::invalidate(&mut store, &layout, 0).unwrap();
    log::invalidate(&mut store, &layout, 0).unwrap();

    let status = log::decode_header(&mut store, &layout, 0).unwrap().status;
    assert_eq!(status.as_word(), 0xFFFC);
}
