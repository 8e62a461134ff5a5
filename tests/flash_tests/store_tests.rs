//! Tests for FlashStore
//!
//! These tests verify:
//! - Lazy creation of the backing image (all 0xFF, exact size)
//! - AND-masked word writes
//! - Sector and whole-device erase
//! - Address validation
//! - Recreation of a wrong-sized image

use std::fs;
use std::path::PathBuf;

use flashlog::flash::{FlashStore, Geometry, ERASED_WORD};
use flashlog::FlashError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const SECTOR_SIZE: u32 = 1024;
const SECTOR_COUNT: u32 = 4;

fn setup_temp_image() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("flash.img");
    (temp_dir, path)
}

fn open_store(path: &PathBuf) -> FlashStore {
    FlashStore::new(path, Geometry::new(SECTOR_SIZE, SECTOR_COUNT))
}

// =============================================================================
// Lazy Open Tests
// =============================================================================

#[test]
fn test_image_not_created_until_first_access() {
    let (_temp, path) = setup_temp_image();
    let store = open_store(&path);

    assert!(!store.is_open());
    assert!(!path.exists());
}

#[test]
fn test_first_access_creates_erased_image() {
    let (_temp, path) = setup_temp_image();
    let mut store = open_store(&path);

    assert_eq!(store.read_word(0).unwrap(), ERASED_WORD);
    assert!(store.is_open());

    let raw = fs::read(&path).unwrap();
    assert_eq!(raw.len() as u32, SECTOR_SIZE * SECTOR_COUNT);
    assert!(raw.iter().all(|&b| b == 0xFF));
}

#[test]
fn test_existing_image_is_kept() {
    let (_temp, path) = setup_temp_image();

    {
        let mut store = open_store(&path);
        store.write_word(100, 0x1234).unwrap();
    }

    let mut store = open_store(&path);
    assert_eq!(store.read_word(100).unwrap(), 0x1234);
}

#[test]
fn test_wrong_size_image_is_recreated() {
    let (_temp, path) = setup_temp_image();
    fs::write(&path, vec![0u8; 100]).unwrap();

    let mut store = open_store(&path);
    assert_eq!(store.read_word(0).unwrap(), ERASED_WORD);
    assert_eq!(fs::metadata(&path).unwrap().len() as u32, SECTOR_SIZE * SECTOR_COUNT);
}

#[test]
fn test_missing_directory_is_medium_unavailable() {
    let (temp, _) = setup_temp_image();
    let path = temp.path().join("no_such_dir").join("flash.img");

    let mut store = open_store(&path);
    let result = store.read_word(0);
    assert!(matches!(result, Err(FlashError::MediumUnavailable { .. })));
}

// =============================================================================
// Write Semantics Tests
// =============================================================================

#[test]
fn test_write_on_erased_word_stores_value() {
    let (_temp, path) = setup_temp_image();
    let mut store = open_store(&path);

    store.write_word(2, 0xA5A5).unwrap();
    assert_eq!(store.read_word(2).unwrap(), 0xA5A5);
}

#[test]
fn test_write_is_and_masked() {
    let (_temp, path) = setup_temp_image();
    let mut store = open_store(&path);

    store.write_word(10, 0x0F0F).unwrap();
    store.write_word(10, 0xFF00).unwrap();
    assert_eq!(store.read_word(10).unwrap(), 0x0F00);
}

#[test]
fn test_write_never_sets_cleared_bits() {
    let (_temp, path) = setup_temp_image();
    let mut store = open_store(&path);

    store.write_word(0, 0x0000).unwrap();
    store.write_word(0, 0xFFFF).unwrap();
    assert_eq!(store.read_word(0).unwrap(), 0x0000);
}

#[test]
fn test_repeated_write_is_idempotent() {
    let (_temp, path) = setup_temp_image();
    let mut store = open_store(&path);

    store.write_word(64, 0x5A3C).unwrap();
    store.write_word(64, 0x5A3C).unwrap();
    assert_eq!(store.read_word(64).unwrap(), 0x5A3C);
}

#[test]
fn test_and_invariant_over_value_grid() {
    let (_temp, path) = setup_temp_image();
    let mut store = open_store(&path);
    let values = [0xFFFF, 0x8001, 0x00FF, 0xF0F0, 0x1234, 0x0000];

    let mut address = 0;
    for &existing in &values {
        for &value in &values {
            store.write_word(address, existing).unwrap();
            store.write_word(address, value).unwrap();
            assert_eq!(store.read_word(address).unwrap(), existing & value);
            address += 2;
        }
    }
}

#[test]
fn test_write_words_masks_each_word() {
    let (_temp, path) = setup_temp_image();
    let mut store = open_store(&path);

    store.write_words(20, &[0x00FF, 0xFF00, 0x1111]).unwrap();
    store.write_words(20, &[0x0F0F, 0x0F0F, 0xFFFF]).unwrap();

    let mut out = [0u16; 3];
    store.read_words(20, &mut out).unwrap();
    assert_eq!(out, [0x000F, 0x0F00, 0x1111]);
}

#[test]
fn test_words_are_little_endian_on_disk() {
    let (_temp, path) = setup_temp_image();
    {
        let mut store = open_store(&path);
        store.write_word(0, 0x1234).unwrap();
    }
    let raw = fs::read(&path).unwrap();
    assert_eq!(&raw[0..2], &[0x34, 0x12]);
}

// =============================================================================
// Erase Tests
// =============================================================================

#[test]
fn test_erase_all_restores_every_word() {
    let (_temp, path) = setup_temp_image();
    let mut store = open_store(&path);

    for address in (0..SECTOR_SIZE * SECTOR_COUNT).step_by(256) {
        store.write_word(address, 0x0000).unwrap();
    }
    store.erase_all().unwrap();

    for address in (0..SECTOR_SIZE * SECTOR_COUNT).step_by(2) {
        assert_eq!(store.read_word(address).unwrap(), ERASED_WORD);
    }
}

#[test]
fn test_erase_sector_only_touches_that_sector() {
    let (_temp, path) = setup_temp_image();
    let mut store = open_store(&path);

    store.write_word(0, 0x0000).unwrap();
    store.write_word(SECTOR_SIZE, 0x0000).unwrap();
    store.write_word(SECTOR_SIZE * 2 - 2, 0x0000).unwrap();

    store.erase_sector(1).unwrap();

    assert_eq!(store.read_word(0).unwrap(), 0x0000);
    assert_eq!(store.read_word(SECTOR_SIZE).unwrap(), ERASED_WORD);
    assert_eq!(store.read_word(SECTOR_SIZE * 2 - 2).unwrap(), ERASED_WORD);
}

#[test]
fn test_erase_allows_bits_to_be_set_again() {
    let (_temp, path) = setup_temp_image();
    let mut store = open_store(&path);

    store.write_word(8, 0x0000).unwrap();
    store.erase_sector(0).unwrap();
    store.write_word(8, 0xBEEF).unwrap();
    assert_eq!(store.read_word(8).unwrap(), 0xBEEF);
}

#[test]
fn test_erase_invalid_sector() {
    let (_temp, path) = setup_temp_image();
    let mut store = open_store(&path);

    let result = store.erase_sector(SECTOR_COUNT);
    assert!(matches!(result, Err(FlashError::InvalidSector(n)) if n == SECTOR_COUNT));
}

// =============================================================================
// Address Validation Tests
// =============================================================================

#[test]
fn test_odd_address_rejected() {
    let (_temp, path) = setup_temp_image();
    let mut store = open_store(&path);

    assert!(matches!(store.read_word(3), Err(FlashError::BadAddress(3))));
    assert!(matches!(store.write_word(3, 0), Err(FlashError::BadAddress(3))));
}

#[test]
fn test_out_of_range_address_rejected() {
    let (_temp, path) = setup_temp_image();
    let mut store = open_store(&path);
    let size = SECTOR_SIZE * SECTOR_COUNT;

    assert!(matches!(store.read_word(size), Err(FlashError::BadAddress(_))));
    assert!(matches!(store.write_word(size + 2, 0), Err(FlashError::BadAddress(_))));
    assert_eq!(store.read_word(size - 2).unwrap(), ERASED_WORD);
}

#[test]
fn test_multi_word_read_past_end_rejected() {
    let (_temp, path) = setup_temp_image();
    let mut store = open_store(&path);
    let size = SECTOR_SIZE * SECTOR_COUNT;

    let mut out = [0u16; 2];
    assert!(matches!(store.read_words(size - 2, &mut out), Err(FlashError::BadAddress(_))));
}

#[test]
fn test_bad_address_does_not_create_image() {
    let (_temp, path) = setup_temp_image();
    let mut store = open_store(&path);

    let _ = store.read_word(1);
    assert!(!path.exists());
}
